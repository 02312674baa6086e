//! Documents and fields.
//!
//! A [`Document`](document::Document) is an ordered sequence of
//! [`Field`](field::Field)s. Each field carries a small
//! [`FieldOptions`](field::FieldOptions) flag set that decides whether its
//! value is stored, indexed, and run through the analyzer.
//!
//! # Examples
//!
//! ```
//! use pilum::document::document::Document;
//! use pilum::document::field::FieldOptions;
//!
//! let doc = Document::builder()
//!     .add_text("id", "1", FieldOptions::STORED_NOT_ANALYZED)
//!     .add_text("author", "Darren", FieldOptions::STORED_ANALYZED)
//!     .add_text("content", "hello world", FieldOptions::NOT_STORED_ANALYZED)
//!     .build();
//!
//! assert_eq!(doc.len(), 3);
//! assert_eq!(doc.get_text("author"), Some("Darren"));
//! assert!(doc.validate().is_ok());
//! ```

pub mod document;
pub mod field;

pub use document::{Document, DocumentBuilder};
pub use field::{Field, FieldOptions, FieldValue};
