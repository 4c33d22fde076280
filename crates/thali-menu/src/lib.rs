//! Menu ingestion: document text extraction and heuristic item parsing.
//!
//! Provides the [`TextExtractor`] trait for turning an uploaded document into
//! plain text and the [`MenuParser`] that scans that text for priced items.

pub mod extract;
pub mod parser;

pub use extract::{extract_file, MockTextExtractor, PlainTextExtractor, TextExtractor};
pub use parser::MenuParser;
