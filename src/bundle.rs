//! Canonical bundle envelope and the document → bundle projection.
//!
//! A [`Bundle`] is the normalized exchange form a parsed document is
//! projected into before storage. Projection is a pure function: it assumes
//! the document already parsed and applies defaults instead of rejecting.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::StructuredDocument;

static BUNDLE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^urn:cb:[A-Za-z0-9]+$").unwrap());

/// Whether `id` matches the `urn:cb:<opaque>` identifier format.
pub fn is_valid_bundle_id(id: &str) -> bool {
    BUNDLE_ID_RE.is_match(id)
}

/// Generate a fresh bundle id: time-based prefix plus random suffix,
/// upper-cased opaque part. Collision probability is accepted as negligible;
/// this is not a strong uniqueness guarantee.
pub fn generate_bundle_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u128;
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    let opaque = format!("{}{}", base36(millis), &uuid[..8]);
    format!("urn:cb:{}", opaque.to_uppercase())
}

fn base36(mut n: u128) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Canonical context bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    pub content: Content,
    pub frame: Frame,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Lineage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<Policy>,
    pub resolution: Resolution,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<Explain>,
}

/// Bundle payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(rename = "type")]
    pub content_type: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

/// Interpretive frame: what kind of thing the payload is and where it applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub frame_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perspective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Scope>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Global,
    Federated,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Local => "local",
            Scope::Global => "global",
            Scope::Federated => "federated",
        }
    }
}

/// Provenance carried over from the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub source_type: String,
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_bundles: Option<Vec<String>>,
    pub derivation: String,
    pub confidence_flow: String,
}

/// Access and usage policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub access_level: AccessLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_rights: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_constraints: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Private,
    Restricted,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Public => "public",
            AccessLevel::Private => "private",
            AccessLevel::Restricted => "restricted",
        }
    }
}

/// Uncertainty qualification. `confidence` is always present on a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_strength: Option<EvidenceStrength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uncertainty_bounds: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Exploratory,
    Working,
    Validated,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Exploratory => "exploratory",
            Confidence::Working => "working",
            Confidence::Validated => "validated",
        }
    }

    fn from_source(value: &str) -> Option<Self> {
        match value {
            "exploratory" => Some(Confidence::Exploratory),
            "working" => Some(Confidence::Working),
            "validated" => Some(Confidence::Validated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceStrength {
    Weak,
    Moderate,
    Strong,
}

impl EvidenceStrength {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceStrength::Weak => "weak",
            EvidenceStrength::Moderate => "moderate",
            EvidenceStrength::Strong => "strong",
        }
    }

    fn from_source(value: &str) -> Option<Self> {
        match value {
            "weak" => Some(EvidenceStrength::Weak),
            "moderate" => Some(EvidenceStrength::Moderate),
            "strong" => Some(EvidenceStrength::Strong),
            _ => None,
        }
    }
}

/// Optional reasoning annotations attached by producers other than the
/// document projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Explain {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub methodology: Option<String>,
}

/// Project a parsed document into a [`Bundle`].
///
/// Infallible: unknown or absent source values fall back to defaults. The
/// payload is the entire original text, frontmatter included.
pub fn to_bundle(document: &StructuredDocument, explicit_id: Option<&str>) -> Bundle {
    let metadata = &document.metadata;

    let id = match explicit_id {
        Some(id) => id.to_string(),
        None => generate_bundle_id(),
    };

    let confidence = metadata
        .confidence()
        .and_then(Confidence::from_source)
        .unwrap_or(Confidence::Working);

    let lineage = metadata.lineage().map(|lineage| Lineage {
        source_type: "ormd".to_string(),
        source_id: lineage
            .source
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        parent_bundles: lineage.parent_documents.clone(),
        derivation: lineage
            .derivation
            .clone()
            .unwrap_or_else(|| "synthesis".to_string()),
        confidence_flow: lineage
            .confidence_flow
            .clone()
            .unwrap_or_else(|| "preserved".to_string()),
    });

    Bundle {
        id,
        version: metadata.version.clone().unwrap_or_else(|| "1.0".to_string()),
        created: metadata.created().map(str::to_string),
        content: Content {
            content_type: "text/markdown".to_string(),
            data: document.raw_text.clone(),
            encoding: Some("utf-8".to_string()),
        },
        frame: Frame {
            frame_type: "ormd.document".to_string(),
            perspective: None,
            domain: None,
            scope: Some(Scope::Local),
        },
        lineage,
        policy: Some(Policy {
            access_level: AccessLevel::Public,
            usage_rights: Some("cc-by-sa-4.0".to_string()),
            retention_period: None,
            privacy_constraints: None,
        }),
        resolution: Resolution {
            confidence,
            evidence_strength: metadata
                .evidence_strength()
                .and_then(EvidenceStrength::from_source),
            uncertainty_bounds: None,
            validation_status: metadata.status.clone(),
        },
        explain: None,
    }
}
