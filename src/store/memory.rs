//! In-memory [`BundleStore`] implementation for tests and ephemeral sessions.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock` for thread safety.
//! Search and query are linear scans, matching the SQLite backend's
//! observable behavior.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::bundle::Bundle;

use super::{
    check_storable, check_strength, derive_search_text, derive_tags, BundleQuery, BundleStore,
    Relationship, SortOrder, StoredBundle,
};

/// Ephemeral store; contents are dropped with the value.
pub struct InMemoryStore {
    bundles: RwLock<HashMap<String, StoredBundle>>,
    edges: RwLock<Vec<Relationship>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            bundles: RwLock::new(HashMap::new()),
            edges: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn make_stored(bundle: &Bundle) -> StoredBundle {
    StoredBundle {
        bundle: bundle.clone(),
        indexed_at: chrono::Utc::now().timestamp(),
        search_text: derive_search_text(bundle),
        tags: derive_tags(bundle),
    }
}

fn sort_results(results: &mut [StoredBundle], order: SortOrder) {
    match order {
        SortOrder::IndexedDesc => results.sort_by(|a, b| {
            b.indexed_at
                .cmp(&a.indexed_at)
                .then_with(|| a.bundle.id.cmp(&b.bundle.id))
        }),
        SortOrder::CreatedAsc => results.sort_by(|a, b| {
            a.bundle
                .created
                .cmp(&b.bundle.created)
                .then_with(|| a.bundle.id.cmp(&b.bundle.id))
        }),
        SortOrder::IdAsc => results.sort_by(|a, b| a.bundle.id.cmp(&b.bundle.id)),
    }
}

#[async_trait]
impl BundleStore for InMemoryStore {
    async fn store(&self, bundle: &Bundle) -> Result<StoredBundle> {
        check_storable(bundle)?;
        let mut bundles = self.bundles.write().unwrap();
        if bundles.contains_key(&bundle.id) {
            bail!("Bundle already stored: {}", bundle.id);
        }
        let stored = make_stored(bundle);
        bundles.insert(bundle.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn store_batch(&self, to_store: &[Bundle]) -> Result<Vec<StoredBundle>> {
        let mut out = Vec::with_capacity(to_store.len());
        for bundle in to_store {
            out.push(self.store(bundle).await?);
        }
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredBundle>> {
        let bundles = self.bundles.read().unwrap();
        Ok(bundles.get(id).cloned())
    }

    async fn update(&self, bundle: &Bundle) -> Result<StoredBundle> {
        check_storable(bundle)?;
        let mut bundles = self.bundles.write().unwrap();
        if !bundles.contains_key(&bundle.id) {
            bail!("Bundle not found: {}", bundle.id);
        }
        let stored = make_stored(bundle);
        bundles.insert(bundle.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let existed = self.bundles.write().unwrap().remove(id).is_some();
        if existed {
            self.edges
                .write()
                .unwrap()
                .retain(|edge| edge.from_id != id && edge.to_id != id);
        }
        Ok(existed)
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoredBundle>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        let bundles = self.bundles.read().unwrap();
        let mut results: Vec<StoredBundle> = bundles
            .values()
            .filter(|stored| stored.search_text.contains(&needle))
            .cloned()
            .collect();
        sort_results(&mut results, SortOrder::IndexedDesc);
        results.truncate(limit.max(0) as usize);
        Ok(results)
    }

    async fn query(&self, query: &BundleQuery) -> Result<Vec<StoredBundle>> {
        let bundles = self.bundles.read().unwrap();
        let mut results: Vec<StoredBundle> = bundles
            .values()
            .filter(|stored| {
                if let Some(frame_type) = &query.frame_type {
                    if &stored.bundle.frame.frame_type != frame_type {
                        return false;
                    }
                }
                if let Some(confidence) = &query.confidence {
                    if stored.bundle.resolution.confidence.as_str() != confidence {
                        return false;
                    }
                }
                if let Some(tag) = &query.tag {
                    if !stored.tags.contains(tag) {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        sort_results(&mut results, query.sort);
        let results = results
            .into_iter()
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .collect();
        Ok(results)
    }

    async fn relate(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        strength: f64,
    ) -> Result<Relationship> {
        check_strength(strength)?;
        {
            let bundles = self.bundles.read().unwrap();
            for id in [from_id, to_id] {
                if !bundles.contains_key(id) {
                    bail!("Cannot relate unknown bundle: {id}");
                }
            }
        }
        let edge = Relationship {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            rel_type: rel_type.to_string(),
            strength,
            created_at: chrono::Utc::now().timestamp(),
        };
        let mut edges = self.edges.write().unwrap();
        edges.retain(|e| {
            !(e.from_id == from_id && e.to_id == to_id && e.rel_type == rel_type)
        });
        edges.push(edge.clone());
        Ok(edge)
    }

    async fn relationships(&self, id: &str) -> Result<Vec<Relationship>> {
        let edges = self.edges.read().unwrap();
        let mut results: Vec<Relationship> = edges
            .iter()
            .filter(|edge| edge.from_id == id || edge.to_id == id)
            .cloned()
            .collect();
        results.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.from_id.cmp(&b.from_id))
                .then_with(|| a.to_id.cmp(&b.to_id))
        });
        Ok(results)
    }
}
