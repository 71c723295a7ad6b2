//! ORMD document parser.
//!
//! Splits raw text into a structural preamble and a YAML frontmatter block,
//! decodes the frontmatter into typed [`Metadata`], and applies the required
//! field checks. Structural failures (no frontmatter, undecodable YAML) abort
//! immediately; field-level failures are accumulated so the caller sees every
//! violation at once. Warnings are advisory and never block success.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::document::{Metadata, StructuredDocument};
use crate::timestamp;

/// Error emitted when the `---`-delimited frontmatter block is absent.
pub const MISSING_FRONTMATTER: &str = "Invalid ORMD format: missing YAML frontmatter";

/// Warning emitted when the first line is not an `<!-- ormd:M.m -->` comment.
pub const MISSING_VERSION_COMMENT: &str = "Missing ORMD version comment";

static VERSION_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<!--\s*ormd:\d+\.\d+\s*-->\s*$").unwrap());

// Optional leading comment line, then a block delimited by two `---`-only
// lines; group 1 is the frontmatter, group 2 the body tail.
static DOCUMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A(?:<!--.*?-->[ \t]*\r?\n)?---[ \t]*\r?\n(.*?)\r?\n---[ \t]*\r?\n?(.*)\z")
        .unwrap()
});

/// Successful parse: the document plus any advisory warnings.
#[derive(Debug, Clone)]
pub struct Parsed {
    pub document: StructuredDocument,
    pub warnings: Vec<String>,
}

/// Failed parse: every accumulated error, plus warnings collected before the
/// failure. No partial document is ever returned.
#[derive(Debug, Clone, Error)]
#[error("document parse failed: {}", errors.join("; "))]
pub struct ParseFailure {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Parse ORMD text into a [`StructuredDocument`].
pub fn parse(text: &str) -> Result<Parsed, ParseFailure> {
    let mut warnings = Vec::new();

    let first_line = text.lines().next().unwrap_or("");
    if !VERSION_TAG_RE.is_match(first_line) {
        warnings.push(MISSING_VERSION_COMMENT.to_string());
    }

    let caps = match DOCUMENT_RE.captures(text) {
        Some(caps) => caps,
        None => {
            return Err(ParseFailure {
                errors: vec![MISSING_FRONTMATTER.to_string()],
                warnings,
            })
        }
    };
    let frontmatter = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let tail = caps.get(2).map(|m| m.as_str()).unwrap_or("");

    let metadata: Metadata = match serde_yaml::from_str(frontmatter) {
        Ok(metadata) => metadata,
        Err(err) => {
            return Err(ParseFailure {
                errors: vec![format!("Invalid YAML frontmatter: {err}")],
                warnings,
            })
        }
    };

    let mut errors = Vec::new();

    match metadata.title.as_deref().map(str::trim) {
        Some(title) if !title.is_empty() => {}
        _ => errors.push("Missing required field: title".to_string()),
    }

    match &metadata.dates {
        None => errors.push("Missing required field: dates".to_string()),
        Some(dates) => {
            match dates.created.as_deref() {
                None => errors.push("Missing required field: dates.created".to_string()),
                Some(created) if !timestamp::matches_format(created) => {
                    errors.push(format!("Invalid date format for dates.created: {created}"));
                }
                Some(_) => {}
            }
            if let Some(modified) = dates.modified.as_deref() {
                if !timestamp::matches_format(modified) {
                    errors.push(format!("Invalid date format for dates.modified: {modified}"));
                }
            }
        }
    }

    if !errors.is_empty() {
        return Err(ParseFailure { errors, warnings });
    }

    Ok(Parsed {
        document: StructuredDocument {
            metadata,
            body: tail.trim().to_string(),
            raw_text: text.to_string(),
        },
        warnings,
    })
}
