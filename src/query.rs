//! Query parsing, scoring and top-K collection.
//!
//! Queries are flat: a set of terms on one field combined with
//! [`Operator::Or`] (default) or [`Operator::And`]. Documents are ranked by
//! classic tf-idf, `sum(tf * ln(max_doc / doc_freq))` over the matched terms.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::query::term::Term;

pub mod collector;
pub mod parser;
pub mod scorer;
pub mod searcher;
pub mod term;

/// How the terms of a query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operator {
    /// A document matches if it contains any term.
    #[default]
    Or,

    /// A document matches only if it contains every term.
    And,
}

/// Trait for search queries.
pub trait Query: Send + Sync + Debug {
    /// The distinct terms of the query.
    fn terms(&self) -> &[Term];

    /// How the terms combine.
    fn operator(&self) -> Operator {
        Operator::Or
    }

    /// Get a human-readable description of this query.
    fn description(&self) -> String {
        let separator = match self.operator() {
            Operator::Or => " OR ",
            Operator::And => " AND ",
        };
        self.terms()
            .iter()
            .map(|term| term.to_string())
            .collect::<Vec<_>>()
            .join(separator)
    }
}
