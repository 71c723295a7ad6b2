//! SQLite-backed [`BundleStore`].
//!
//! One row per bundle: the full envelope as JSON plus the derived index
//! columns the search and query paths scan. The substring search is a
//! deliberate linear scan (`instr` over the lowercased search text); there is
//! no inverted index.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::bundle::Bundle;

use super::{
    check_storable, check_strength, derive_search_text, derive_tags, BundleQuery, BundleStore,
    Relationship, SortOrder, StoredBundle,
};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &str) -> Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM bundles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn write_row(&self, bundle: &Bundle, replace: bool) -> Result<StoredBundle> {
        let indexed_at = chrono::Utc::now().timestamp();
        let search_text = derive_search_text(bundle);
        let tags = derive_tags(bundle);
        let bundle_json = serde_json::to_string(bundle)?;
        let tags_json = serde_json::to_string(&tags)?;

        let sql = if replace {
            r#"
            UPDATE bundles
            SET version = ?, created = ?, frame_type = ?, confidence = ?,
                bundle_json = ?, search_text = ?, tags_json = ?, indexed_at = ?
            WHERE id = ?
            "#
        } else {
            r#"
            INSERT INTO bundles (version, created, frame_type, confidence,
                bundle_json, search_text, tags_json, indexed_at, id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        };

        sqlx::query(sql)
            .bind(&bundle.version)
            .bind(&bundle.created)
            .bind(&bundle.frame.frame_type)
            .bind(bundle.resolution.confidence.as_str())
            .bind(&bundle_json)
            .bind(&search_text)
            .bind(&tags_json)
            .bind(indexed_at)
            .bind(&bundle.id)
            .execute(&self.pool)
            .await?;

        Ok(StoredBundle {
            bundle: bundle.clone(),
            indexed_at,
            search_text,
            tags,
        })
    }
}

fn row_to_stored(row: &sqlx::sqlite::SqliteRow) -> Result<StoredBundle> {
    let bundle_json: String = row.get("bundle_json");
    let tags_json: String = row.get("tags_json");
    let bundle: Bundle =
        serde_json::from_str(&bundle_json).with_context(|| "Corrupt bundle row")?;
    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    Ok(StoredBundle {
        bundle,
        indexed_at: row.get("indexed_at"),
        search_text: row.get("search_text"),
        tags,
    })
}

fn row_to_relationship(row: &sqlx::sqlite::SqliteRow) -> Relationship {
    Relationship {
        from_id: row.get("from_id"),
        to_id: row.get("to_id"),
        rel_type: row.get("rel_type"),
        strength: row.get("strength"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl BundleStore for SqliteStore {
    async fn store(&self, bundle: &Bundle) -> Result<StoredBundle> {
        check_storable(bundle)?;
        if self.exists(&bundle.id).await? {
            bail!("Bundle already stored: {}", bundle.id);
        }
        self.write_row(bundle, false).await
    }

    async fn store_batch(&self, to_store: &[Bundle]) -> Result<Vec<StoredBundle>> {
        let mut out = Vec::with_capacity(to_store.len());
        for bundle in to_store {
            out.push(self.store(bundle).await?);
        }
        Ok(out)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredBundle>> {
        let row = sqlx::query(
            "SELECT id, bundle_json, search_text, tags_json, indexed_at FROM bundles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_stored(&row)?)),
            None => Ok(None),
        }
    }

    async fn update(&self, bundle: &Bundle) -> Result<StoredBundle> {
        check_storable(bundle)?;
        if !self.exists(&bundle.id).await? {
            bail!("Bundle not found: {}", bundle.id);
        }
        self.write_row(bundle, true).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        sqlx::query("DELETE FROM relationships WHERE from_id = ? OR to_id = ?")
            .bind(id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM bundles WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn search(&self, query: &str, limit: i64) -> Result<Vec<StoredBundle>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            r#"
            SELECT id, bundle_json, search_text, tags_json, indexed_at
            FROM bundles
            WHERE instr(search_text, ?) > 0
            ORDER BY indexed_at DESC, id ASC
            LIMIT ?
            "#,
        )
        .bind(&needle)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_stored).collect()
    }

    async fn query(&self, query: &BundleQuery) -> Result<Vec<StoredBundle>> {
        let mut sql = String::from(
            "SELECT id, bundle_json, search_text, tags_json, indexed_at FROM bundles",
        );

        let mut conditions = Vec::new();
        if query.frame_type.is_some() {
            conditions.push("frame_type = ?");
        }
        if query.confidence.is_some() {
            conditions.push("confidence = ?");
        }
        if query.tag.is_some() {
            conditions.push("instr(tags_json, ?) > 0");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(match query.sort {
            SortOrder::IndexedDesc => " ORDER BY indexed_at DESC, id ASC",
            SortOrder::CreatedAsc => " ORDER BY created ASC, id ASC",
            SortOrder::IdAsc => " ORDER BY id ASC",
        });
        sql.push_str(" LIMIT ? OFFSET ?");

        let mut db_query = sqlx::query(&sql);
        if let Some(frame_type) = &query.frame_type {
            db_query = db_query.bind(frame_type);
        }
        if let Some(confidence) = &query.confidence {
            db_query = db_query.bind(confidence);
        }
        if let Some(tag) = &query.tag {
            // tags_json is a JSON string array; match the quoted element.
            db_query = db_query.bind(format!("\"{tag}\""));
        }
        db_query = db_query.bind(query.limit.max(0)).bind(query.offset.max(0));

        let rows = db_query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_stored).collect()
    }

    async fn relate(
        &self,
        from_id: &str,
        to_id: &str,
        rel_type: &str,
        strength: f64,
    ) -> Result<Relationship> {
        check_strength(strength)?;
        for id in [from_id, to_id] {
            if !self.exists(id).await? {
                bail!("Cannot relate unknown bundle: {id}");
            }
        }

        let created_at = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO relationships (from_id, to_id, rel_type, strength, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(from_id, to_id, rel_type) DO UPDATE SET
                strength = excluded.strength,
                created_at = excluded.created_at
            "#,
        )
        .bind(from_id)
        .bind(to_id)
        .bind(rel_type)
        .bind(strength)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Relationship {
            from_id: from_id.to_string(),
            to_id: to_id.to_string(),
            rel_type: rel_type.to_string(),
            strength,
            created_at,
        })
    }

    async fn relationships(&self, id: &str) -> Result<Vec<Relationship>> {
        let rows = sqlx::query(
            r#"
            SELECT from_id, to_id, rel_type, strength, created_at
            FROM relationships
            WHERE from_id = ? OR to_id = ?
            ORDER BY created_at ASC, from_id ASC, to_id ASC
            "#,
        )
        .bind(id)
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_relationship).collect())
    }
}
