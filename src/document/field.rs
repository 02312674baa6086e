//! Field values and per-field indexing options.

use serde::{Deserialize, Serialize};

use crate::error::{PilumError, Result};

/// How a field is treated by the segment builder.
///
/// `tokenized` implies `indexed`. An indexed, non-tokenized field is indexed
/// as a single keyword term holding its whole value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Keep the original value so it can be returned with search hits.
    pub stored: bool,

    /// Make the field searchable.
    pub indexed: bool,

    /// Run the value through the analyzer before indexing.
    pub tokenized: bool,
}

impl FieldOptions {
    /// Stored and indexed as one keyword term (ids, codes).
    pub const STORED_NOT_ANALYZED: FieldOptions = FieldOptions {
        stored: true,
        indexed: true,
        tokenized: false,
    };

    /// Stored and indexed through the analyzer.
    pub const STORED_ANALYZED: FieldOptions = FieldOptions {
        stored: true,
        indexed: true,
        tokenized: true,
    };

    /// Indexed through the analyzer, not retrievable.
    pub const NOT_STORED_ANALYZED: FieldOptions = FieldOptions {
        stored: false,
        indexed: true,
        tokenized: true,
    };

    /// Same as [`FieldOptions::STORED_NOT_ANALYZED`]; scoring uses no
    /// length norms, so there is nothing to omit.
    pub const STORED_NOT_ANALYZED_NO_NORMS: FieldOptions = Self::STORED_NOT_ANALYZED;

    /// Stored only, not searchable.
    pub const STORED_ONLY: FieldOptions = FieldOptions {
        stored: true,
        indexed: false,
        tokenized: false,
    };

    /// Pack the flags into one byte for the stored-field file.
    pub(crate) fn to_bits(self) -> u8 {
        (self.stored as u8) | ((self.indexed as u8) << 1) | ((self.tokenized as u8) << 2)
    }

    /// Inverse of [`FieldOptions::to_bits`].
    pub(crate) fn from_bits(bits: u8) -> Option<FieldOptions> {
        if bits & !0b111 != 0 {
            return None;
        }
        Some(FieldOptions {
            stored: bits & 0b001 != 0,
            indexed: bits & 0b010 != 0,
            tokenized: bits & 0b100 != 0,
        })
    }
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions::STORED_ANALYZED
    }
}

/// The value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// UTF-8 text; may be indexed.
    Text(String),

    /// Opaque bytes; may only be stored.
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Get the text value, if this is a text field.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            FieldValue::Bytes(_) => None,
        }
    }

    /// Get the raw bytes, if this is a bytes field.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Bytes(bytes) => Some(bytes),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Bytes(value)
    }
}

/// A named value with its indexing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name; must not be empty.
    pub name: String,

    /// Field value.
    pub value: FieldValue,

    /// Indexing options.
    pub options: FieldOptions,
}

impl Field {
    /// Create a new field.
    pub fn new<S: Into<String>, V: Into<FieldValue>>(
        name: S,
        value: V,
        options: FieldOptions,
    ) -> Self {
        Field {
            name: name.into(),
            value: value.into(),
            options,
        }
    }

    /// Create a text field.
    pub fn text<S: Into<String>, T: Into<String>>(name: S, value: T, options: FieldOptions) -> Self {
        Field::new(name, FieldValue::Text(value.into()), options)
    }

    /// Create a stored-only bytes field.
    pub fn bytes<S: Into<String>>(name: S, value: Vec<u8>) -> Self {
        Field::new(name, FieldValue::Bytes(value), FieldOptions::STORED_ONLY)
    }

    /// Check the field's name and flag combination.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PilumError::invalid_document("field name must not be empty"));
        }

        let options = self.options;
        if options.tokenized && !options.indexed {
            return Err(PilumError::invalid_document(format!(
                "field '{}' is tokenized but not indexed",
                self.name
            )));
        }

        if !options.stored && !options.indexed {
            return Err(PilumError::invalid_document(format!(
                "field '{}' is neither stored nor indexed",
                self.name
            )));
        }

        if options.indexed && matches!(self.value, FieldValue::Bytes(_)) {
            return Err(PilumError::invalid_document(format!(
                "bytes field '{}' cannot be indexed",
                self.name
            )));
        }

        Ok(())
    }
}
