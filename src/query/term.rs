//! Terms and the exact-term query.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::Query;

/// A `(field, text)` pair, the atomic unit of indexing.
///
/// Terms order lexicographically by field, then by text; segment
/// dictionaries are sorted in this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term {
    /// Field name.
    pub field: String,

    /// Normalized token text.
    pub text: String,
}

impl Term {
    /// Create a new term.
    pub fn new<F: Into<String>, T: Into<String>>(field: F, text: T) -> Self {
        Term {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Get the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Get the term text.
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.text)
    }
}

/// A query that matches documents containing a specific term.
///
/// The term is matched as given: it is not analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermQuery {
    term: Term,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new<F, T>(field: F, text: T) -> Self
    where
        F: Into<String>,
        T: Into<String>,
    {
        TermQuery {
            term: Term::new(field, text),
        }
    }

    /// Get the term.
    pub fn term(&self) -> &Term {
        &self.term
    }
}

impl From<Term> for TermQuery {
    fn from(term: Term) -> Self {
        TermQuery { term }
    }
}

impl Query for TermQuery {
    fn terms(&self) -> &[Term] {
        std::slice::from_ref(&self.term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_ordering() {
        let mut terms = vec![
            Term::new("content", "lucene"),
            Term::new("author", "tony"),
            Term::new("content", "hello"),
        ];
        terms.sort();

        let rendered: Vec<_> = terms.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec!["author:tony", "content:hello", "content:lucene"]
        );
    }

    #[test]
    fn test_term_query() {
        let query = TermQuery::new("id", "2");
        assert_eq!(query.terms(), &[Term::new("id", "2")]);
        assert_eq!(query.description(), "id:2");
    }
}
