//! Core document model for the ORMD format.
//!
//! A [`StructuredDocument`] is the parsed form of one input text: typed
//! frontmatter metadata, the free-text body, and the verbatim original text.
//! The original text is the only source of truth for lossless re-export;
//! `metadata` and `body` are always derived from it.

use serde::{Deserialize, Serialize};

/// Parsed form of one ORMD input text.
///
/// Never mutated in place: consumers that need an updated document construct
/// a new one and re-run derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub metadata: Metadata,
    /// Text following the metadata block, trimmed.
    pub body: String,
    /// Complete original input, byte-for-byte.
    pub raw_text: String,
}

/// Frontmatter metadata. Known keys are typed; unknown keys are preserved
/// (but never validated) through the flattened `extra` mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Author>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dates: Option<Dates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<Link>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ContextBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_yaml::Mapping,
}

/// Document date pair. `created` is required by the parser; both values are
/// kept as verbatim strings and checked only against the canonical pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Dates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,
}

/// Author entry. Both fields are required once the entry exists; they decode
/// as optional so the validator can report incomplete entries per index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Author {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Link entry: identifier, relationship tag, and target path. The
/// relationship tag is open-ended (suggested set or any custom string).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

/// Optional context block nested under metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ContextBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Lineage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

/// Derivation metadata: where a document came from and how confidence
/// carries over from its parents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Lineage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_documents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_flow: Option<String>,
}

/// Uncertainty qualification for a document's claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Resolution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_strength: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_sources: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_methods: Option<Vec<String>>,
}

impl Metadata {
    /// The confidence value under `context.resolution`, if any.
    pub fn confidence(&self) -> Option<&str> {
        self.context
            .as_ref()?
            .resolution
            .as_ref()?
            .confidence
            .as_deref()
    }

    /// The evidence strength under `context.resolution`, if any.
    pub fn evidence_strength(&self) -> Option<&str> {
        self.context
            .as_ref()?
            .resolution
            .as_ref()?
            .evidence_strength
            .as_deref()
    }

    /// The lineage block under `context`, if any.
    pub fn lineage(&self) -> Option<&Lineage> {
        self.context.as_ref()?.lineage.as_ref()
    }

    /// The `dates.created` value, if any.
    pub fn created(&self) -> Option<&str> {
        self.dates.as_ref()?.created.as_deref()
    }
}
