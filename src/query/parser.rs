//! Turning query text into a query.
//!
//! Parsing is deliberately flat: the text is run through the analyzer for
//! the default field and every resulting token becomes a term on that field.
//! There is no field prefix, phrase, or boolean syntax.

use std::sync::Arc;

use ahash::AHashSet;

use crate::analysis::Analyzer;
use crate::error::{PilumError, Result};
use crate::query::term::Term;
use crate::query::{Operator, Query};

/// A set of terms on one field combined with an [`Operator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsQuery {
    terms: Vec<Term>,
    operator: Operator,
}

impl TermsQuery {
    /// Create a query over `terms`, dropping duplicates but keeping order.
    pub fn new(terms: Vec<Term>, operator: Operator) -> Self {
        let mut seen = AHashSet::with_capacity(terms.len());
        let terms = terms
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .collect();
        TermsQuery { terms, operator }
    }
}

impl Query for TermsQuery {
    fn terms(&self) -> &[Term] {
        &self.terms
    }

    fn operator(&self) -> Operator {
        self.operator
    }
}

/// Parses query text against a default field.
#[derive(Debug, Clone)]
pub struct QueryParser {
    default_field: String,
    analyzer: Arc<dyn Analyzer>,
    operator: Operator,
}

impl QueryParser {
    /// Create a parser for `default_field` using `analyzer`.
    pub fn new<S: Into<String>>(default_field: S, analyzer: Arc<dyn Analyzer>) -> Self {
        QueryParser {
            default_field: default_field.into(),
            analyzer,
            operator: Operator::Or,
        }
    }

    /// Combine terms with `operator` instead of [`Operator::Or`].
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    /// Get the default field.
    pub fn default_field(&self) -> &str {
        &self.default_field
    }

    /// Get the operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    /// Parse `text` into a query.
    ///
    /// Fails with `QuerySyntax` if the analyzer produces no searchable token,
    /// for example for empty text, punctuation only, or stop words only.
    pub fn parse(&self, text: &str) -> Result<TermsQuery> {
        let terms: Vec<Term> = self
            .analyzer
            .analyze_field(&self.default_field, text)?
            .filter(|token| !token.is_stopped() && !token.is_empty())
            .map(|token| Term::new(self.default_field.as_str(), token.text))
            .collect();

        if terms.is_empty() {
            return Err(PilumError::query_syntax(format!(
                "no searchable terms in {text:?} for field {}",
                self.default_field
            )));
        }

        Ok(TermsQuery::new(terms, self.operator))
    }
}
