//! Semantic validation of an already-parsed document.
//!
//! Re-checks constraints independently of the parse step, for use after a
//! document has potentially been rebuilt with merged fields. Every check is
//! accumulated; the result never carries partial information.

use crate::document::StructuredDocument;

/// Accepted confidence values.
pub const CONFIDENCE_VALUES: &[&str] = &["exploratory", "working", "validated"];

/// Accepted evidence-strength values.
pub const EVIDENCE_STRENGTH_VALUES: &[&str] = &["weak", "moderate", "strong"];

/// Accepted document status values.
pub const STATUS_VALUES: &[&str] = &["draft", "active", "archived", "deprecated"];

/// Outcome of validating a document. `valid` is true exactly when `errors`
/// is empty; warnings are advisory.
#[derive(Debug, Clone)]
pub struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a parsed document's semantic constraints. Never fails: a
/// well-formed but semantically wrong document yields `valid: false`.
pub fn validate(document: &StructuredDocument) -> Validation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let metadata = &document.metadata;

    match metadata.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => {}
        _ => errors.push("Missing required field: title".to_string()),
    }

    if metadata.created().is_none() {
        errors.push("Missing required field: dates.created".to_string());
    }

    if let Some(confidence) = metadata.confidence() {
        if !CONFIDENCE_VALUES.contains(&confidence) {
            errors.push(format!("Invalid confidence value: {confidence}"));
        }
    }

    if let Some(strength) = metadata.evidence_strength() {
        if !EVIDENCE_STRENGTH_VALUES.contains(&strength) {
            errors.push(format!("Invalid evidence_strength value: {strength}"));
        }
    }

    if let Some(status) = metadata.status.as_deref() {
        if !STATUS_VALUES.contains(&status) {
            errors.push(format!("Invalid status value: {status}"));
        }
    }

    if let Some(links) = &metadata.links {
        for (index, link) in links.iter().enumerate() {
            if link.id.is_none() || link.rel.is_none() || link.to.is_none() {
                errors.push(format!(
                    "Link at index {index} is incomplete (requires id, rel, to)"
                ));
            }
        }
    }

    if let Some(authors) = &metadata.authors {
        for (index, author) in authors.iter().enumerate() {
            if author.id.is_none() || author.display.is_none() {
                errors.push(format!(
                    "Author at index {index} is incomplete (requires id, display)"
                ));
            }
        }
    }

    if document.body.trim().is_empty() {
        warnings.push("Document content is empty".to_string());
    }

    Validation {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn doc(text: &str) -> StructuredDocument {
        parse(text).unwrap().document
    }

    #[test]
    fn test_minimal_document_valid() {
        let document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\ndates:\n  created: '2024-01-01T00:00:00Z'\n---\nBody",
        );
        let result = validate(&document);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_title_reported() {
        // Parse succeeds, then the title is blanked by a downstream rebuild.
        let mut document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\ndates:\n  created: '2024-01-01T00:00:00Z'\n---\nBody",
        );
        document.metadata.title = None;
        let result = validate(&document);
        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.contains("title")));
    }

    #[test]
    fn test_invalid_confidence_named() {
        let document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\ndates:\n  created: '2024-01-01T00:00:00Z'\ncontext:\n  resolution:\n    confidence: certain\n---\nBody",
        );
        let result = validate(&document);
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["Invalid confidence value: certain"]);
    }

    #[test]
    fn test_invalid_evidence_strength_named() {
        let document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\ndates:\n  created: '2024-01-01T00:00:00Z'\ncontext:\n  resolution:\n    confidence: working\n    evidence_strength: overwhelming\n---\nBody",
        );
        let result = validate(&document);
        assert_eq!(
            result.errors,
            vec!["Invalid evidence_strength value: overwhelming"]
        );
    }

    #[test]
    fn test_invalid_status_named() {
        let document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\nstatus: published\ndates:\n  created: '2024-01-01T00:00:00Z'\n---\nBody",
        );
        let result = validate(&document);
        assert_eq!(result.errors, vec!["Invalid status value: published"]);
    }

    #[test]
    fn test_incomplete_link_reported_by_index() {
        let document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\ndates:\n  created: '2024-01-01T00:00:00Z'\nlinks:\n  - id: l1\n    rel: supports\n    to: 'doc-a.md'\n  - id: l2\n    rel: refutes\n---\nBody",
        );
        let result = validate(&document);
        assert_eq!(
            result.errors,
            vec!["Link at index 1 is incomplete (requires id, rel, to)"]
        );
    }

    #[test]
    fn test_incomplete_author_reported_by_index() {
        let document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\ndates:\n  created: '2024-01-01T00:00:00Z'\nauthors:\n  - id: a1\n---\nBody",
        );
        let result = validate(&document);
        assert_eq!(
            result.errors,
            vec!["Author at index 0 is incomplete (requires id, display)"]
        );
    }

    #[test]
    fn test_empty_body_is_warning_not_error() {
        let document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\ndates:\n  created: '2024-01-01T00:00:00Z'\n---\n",
        );
        let result = validate(&document);
        assert!(result.valid);
        assert_eq!(result.warnings, vec!["Document content is empty"]);
    }

    #[test]
    fn test_errors_accumulate() {
        let mut document = doc(
            "<!-- ormd:0.1 -->\n---\ntitle: X\nstatus: published\ncontext:\n  resolution:\n    confidence: certain\ndates:\n  created: '2024-01-01T00:00:00Z'\n---\nBody",
        );
        document.metadata.dates = None;
        let result = validate(&document);
        assert_eq!(result.errors.len(), 3);
    }
}
