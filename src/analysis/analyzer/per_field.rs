//! Per-field analyzer.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::analyzer::Analyzer;
use crate::analysis::token::TokenStream;
use crate::error::Result;

/// An analyzer that applies different analyzers to different fields.
///
/// Fields without an explicit analyzer use the default one.
///
/// ```
/// use std::sync::Arc;
/// use pilum::analysis::{Analyzer, KeywordAnalyzer, PerFieldAnalyzer, StandardAnalyzer};
///
/// let mut analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()));
/// analyzer.add_analyzer("tag", Arc::new(KeywordAnalyzer::new()));
///
/// let tokens: Vec<_> = analyzer.analyze_field("tag", "Big Data").unwrap().collect();
/// assert_eq!(tokens[0].text, "Big Data");
/// ```
#[derive(Clone)]
pub struct PerFieldAnalyzer {
    default_analyzer: Arc<dyn Analyzer>,
    field_analyzers: AHashMap<String, Arc<dyn Analyzer>>,
}

impl PerFieldAnalyzer {
    /// Create a new per-field analyzer with a default analyzer.
    pub fn new(default_analyzer: Arc<dyn Analyzer>) -> Self {
        Self {
            default_analyzer,
            field_analyzers: AHashMap::new(),
        }
    }

    /// Add a field-specific analyzer.
    pub fn add_analyzer(&mut self, field: impl Into<String>, analyzer: Arc<dyn Analyzer>) {
        self.field_analyzers.insert(field.into(), analyzer);
    }

    /// Get the analyzer for a specific field.
    pub fn get_analyzer(&self, field: &str) -> &Arc<dyn Analyzer> {
        self.field_analyzers
            .get(field)
            .unwrap_or(&self.default_analyzer)
    }

    /// Get the default analyzer.
    pub fn default_analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.default_analyzer
    }
}

impl Analyzer for PerFieldAnalyzer {
    fn analyze(&self, text: &str) -> Result<TokenStream> {
        self.default_analyzer.analyze(text)
    }

    fn analyze_field(&self, field: &str, text: &str) -> Result<TokenStream> {
        self.get_analyzer(field).analyze_field(field, text)
    }

    fn name(&self) -> &'static str {
        "per_field"
    }
}

impl fmt::Debug for PerFieldAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields: Vec<_> = self
            .field_analyzers
            .iter()
            .map(|(field, analyzer)| (field.as_str(), analyzer.name()))
            .collect();
        fields.sort_unstable();

        f.debug_struct("PerFieldAnalyzer")
            .field("default", &self.default_analyzer.name())
            .field("fields", &fields)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{KeywordAnalyzer, StandardAnalyzer};

    #[test]
    fn test_per_field_analyzer() {
        let keyword: Arc<dyn Analyzer> = Arc::new(KeywordAnalyzer::new());
        let mut analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()));
        analyzer.add_analyzer("id", Arc::clone(&keyword));
        analyzer.add_analyzer("category", keyword);

        let tokens: Vec<_> = analyzer
            .analyze_field("title", "Hello World")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["hello", "world"]);

        let tokens: Vec<_> = analyzer
            .analyze_field("id", "Hello World")
            .unwrap()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["Hello World"]);
    }

    #[test]
    fn test_plain_analyze_uses_default() {
        let mut analyzer = PerFieldAnalyzer::new(Arc::new(StandardAnalyzer::new()));
        analyzer.add_analyzer("id", Arc::new(KeywordAnalyzer::new()));

        assert_eq!(analyzer.tokenize("Hello World").unwrap(), vec!["hello", "world"]);
    }
}
