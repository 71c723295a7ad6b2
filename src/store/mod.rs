//! Storage abstraction for context bundles.
//!
//! The [`BundleStore`] trait defines the capability set the rest of the
//! platform relies on, enabling pluggable backends (SQLite for the CLI,
//! in-memory for tests and ephemeral sessions).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;
pub mod sqlite;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::Serialize;

use crate::bundle::{is_valid_bundle_id, Bundle};

/// A bundle as held by a store: the envelope plus derived index fields.
#[derive(Debug, Clone, Serialize)]
pub struct StoredBundle {
    pub bundle: Bundle,
    /// Unix seconds at which the bundle was indexed.
    pub indexed_at: i64,
    /// Lowercased text the substring search scans.
    pub search_text: String,
    pub tags: Vec<String>,
}

/// A directed, typed, weighted edge between two stored bundle ids.
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub from_id: String,
    pub to_id: String,
    pub rel_type: String,
    /// Edge weight in [0.0, 1.0].
    pub strength: f64,
    pub created_at: i64,
}

/// Filtered listing parameters. All filters are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct BundleQuery {
    pub frame_type: Option<String>,
    pub confidence: Option<String>,
    pub tag: Option<String>,
    pub limit: i64,
    pub offset: i64,
    pub sort: SortOrder,
}

/// Whitelisted sort orders for [`BundleStore::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recently indexed first (the default).
    #[default]
    IndexedDesc,
    /// Document-declared creation time, oldest first.
    CreatedAsc,
    /// Lexicographic id order.
    IdAsc,
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "indexed" => Ok(SortOrder::IndexedDesc),
            "created" => Ok(SortOrder::CreatedAsc),
            "id" => Ok(SortOrder::IdAsc),
            other => bail!("Unknown sort order: {}. Use indexed, created, or id.", other),
        }
    }
}

/// Abstract bundle storage.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`store`](BundleStore::store) | Persist a new bundle |
/// | [`store_batch`](BundleStore::store_batch) | Persist several bundles |
/// | [`get`](BundleStore::get) | Retrieve a stored bundle by id |
/// | [`update`](BundleStore::update) | Replace an existing bundle |
/// | [`delete`](BundleStore::delete) | Remove a bundle and its edges |
/// | [`search`](BundleStore::search) | Substring scan over the search text |
/// | [`query`](BundleStore::query) | Filtered listing with pagination |
/// | [`relate`](BundleStore::relate) | Add or reweight a relationship edge |
/// | [`relationships`](BundleStore::relationships) | List edges touching an id |
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Persist a new bundle. Fails if the id is malformed or already stored.
    async fn store(&self, bundle: &Bundle) -> Result<StoredBundle>;

    /// Persist several bundles; fails on the first rejected bundle.
    async fn store_batch(&self, bundles: &[Bundle]) -> Result<Vec<StoredBundle>>;

    /// Retrieve a stored bundle by id.
    async fn get(&self, id: &str) -> Result<Option<StoredBundle>>;

    /// Replace the stored bundle with the same id. Bundles are immutable
    /// values; callers merge fields into a new bundle and pass it here.
    async fn update(&self, bundle: &Bundle) -> Result<StoredBundle>;

    /// Delete a bundle and any edges touching it. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Case-insensitive substring scan over the derived search text.
    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoredBundle>>;

    /// Filtered listing with pagination and a whitelisted sort order.
    async fn query(&self, query: &BundleQuery) -> Result<Vec<StoredBundle>>;

    /// Add a directed edge between two stored bundles; re-relating the same
    /// triple updates the strength.
    async fn relate(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        strength: f64,
    ) -> Result<Relationship>;

    /// List all edges where `id` is either endpoint.
    async fn relationships(&self, id: &str) -> Result<Vec<Relationship>>;
}

/// Lowercased concatenation of the payload and frame descriptors; the text
/// the substring search scans.
pub fn derive_search_text(bundle: &Bundle) -> String {
    let mut parts: Vec<&str> = vec![&bundle.content.data, &bundle.frame.frame_type];
    if let Some(perspective) = &bundle.frame.perspective {
        parts.push(perspective);
    }
    if let Some(domain) = &bundle.frame.domain {
        parts.push(domain);
    }
    parts.join(" ").to_lowercase()
}

/// Tag set derived from a bundle's envelope fields.
pub fn derive_tags(bundle: &Bundle) -> Vec<String> {
    let mut tags = vec![
        bundle.content.content_type.clone(),
        bundle.frame.frame_type.clone(),
    ];
    if let Some(scope) = bundle.frame.scope {
        tags.push(format!("scope:{}", scope.as_str()));
    }
    tags.push(format!(
        "confidence:{}",
        bundle.resolution.confidence.as_str()
    ));
    if let Some(domain) = &bundle.frame.domain {
        tags.push(format!("domain:{domain}"));
    }
    tags
}

pub(crate) fn check_storable(bundle: &Bundle) -> Result<()> {
    if !is_valid_bundle_id(&bundle.id) {
        bail!("Invalid bundle id: {}", bundle.id);
    }
    Ok(())
}

pub(crate) fn check_strength(strength: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&strength) {
        bail!("Relationship strength must be in [0.0, 1.0], got {strength}");
    }
    Ok(())
}
