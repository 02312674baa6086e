//! Document structure.

use serde::{Deserialize, Serialize};

use crate::document::field::{Field, FieldOptions, FieldValue};
use crate::error::Result;

/// A document represents a single item to be indexed.
///
/// Fields keep the order they were added in; the same name may appear more
/// than once.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document { fields: Vec::new() }
    }

    /// Append a field.
    pub fn add(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Append a field built from its parts.
    pub fn add_field<S: Into<String>, V: Into<FieldValue>>(
        &mut self,
        name: S,
        value: V,
        options: FieldOptions,
    ) {
        self.fields.push(Field::new(name, value, options));
    }

    /// Get the first field with the given name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Get the text value of the first field with the given name.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|field| field.value.as_text())
    }

    /// Check if the document has a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All fields in insertion order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Validate every field. Nothing of a document is indexed unless this
    /// succeeds.
    pub fn validate(&self) -> Result<()> {
        self.fields.iter().try_for_each(Field::validate)
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }
}

impl FromIterator<Field> for Document {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Document {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    /// Add a text field.
    pub fn add_text<S: Into<String>, T: Into<String>>(
        mut self,
        name: S,
        value: T,
        options: FieldOptions,
    ) -> Self {
        self.document.add(Field::text(name, value, options));
        self
    }

    /// Add a stored-only bytes field.
    pub fn add_bytes<S: Into<String>>(mut self, name: S, value: Vec<u8>) -> Self {
        self.document.add(Field::bytes(name, value));
        self
    }

    /// Add a prebuilt field.
    pub fn add_field(mut self, field: Field) -> Self {
        self.document.add(field);
        self
    }

    /// Build the final document.
    pub fn build(self) -> Document {
        self.document
    }
}
