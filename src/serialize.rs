//! Re-emission of a structured document as ORMD text.
//!
//! The inverse of the parser at the structure level: the frontmatter is
//! re-encoded from the typed metadata, so field order and quoting may differ
//! from the original bytes. Round-trip equivalence holds for the decoded
//! metadata, not for the raw text.

use crate::document::StructuredDocument;

/// Version-tag comment written at the top of every emitted document.
pub const VERSION_COMMENT: &str = "<!-- ormd:0.1 -->";

/// Serialize a document back to ORMD text.
pub fn serialize(document: &StructuredDocument) -> String {
    // Metadata is built from plain strings, lists, and YAML values; encoding
    // it cannot fail, so a failure here would be a bug in the model types.
    let frontmatter =
        serde_yaml::to_string(&document.metadata).unwrap_or_else(|_| "{}\n".to_string());

    format!(
        "{VERSION_COMMENT}\n---\n{frontmatter}---\n\n{}\n",
        document.body
    )
}
