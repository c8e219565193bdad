//! Metadata parsing
//!
//! Turns the exported metadata document of a dataset into the normalized
//! [`MetadataRecord`](crate::domain::MetadataRecord) the catalog entry is
//! built from.

pub mod parser;
pub mod slug;

pub use parser::{MetadataDefaults, MetadataIssue, MetadataParser, ParsedMetadata};
pub use slug::Slugifier;
