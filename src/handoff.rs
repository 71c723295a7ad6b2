//! Agent handoff document generation.
//!
//! Builds an ORMD document that captures the state of a working session
//! (task, decisions taken, next steps) and pushes it through the standard
//! pipeline: serialize → parse → validate → project → store. The stored
//! bundle is what the next agent picks up.

use anyhow::{anyhow, bail, Result};

use crate::bundle::to_bundle;
use crate::document::{ContextBlock, Dates, Lineage, Metadata, Resolution, StructuredDocument};
use crate::parse::parse;
use crate::serialize::serialize;
use crate::store::{BundleStore, StoredBundle};
use crate::timestamp;
use crate::validate::validate;

/// Source label recorded in the lineage of generated handoff documents.
pub const HANDOFF_SOURCE: &str = "agent-session";

/// Inputs for one handoff document.
#[derive(Debug, Clone, Default)]
pub struct HandoffSpec {
    pub title: String,
    pub task: String,
    pub decisions: Vec<String>,
    pub next_steps: Vec<String>,
    pub notes: Option<String>,
    /// Bundle id of the session this one continues, if any.
    pub parent: Option<String>,
    /// Pin the creation stamp; defaults to the current time.
    pub created_at: Option<String>,
}

/// Build the handoff document. The returned document's `raw_text` is the
/// emitted ORMD text, so projecting it stores exactly what was generated.
pub fn build_document(spec: &HandoffSpec) -> Result<StructuredDocument> {
    if spec.title.trim().is_empty() {
        bail!("Handoff title must not be empty");
    }
    if spec.task.trim().is_empty() {
        bail!("Handoff task summary must not be empty");
    }

    let created = match &spec.created_at {
        Some(created) => {
            if !timestamp::is_calendar_valid(created) {
                bail!("Invalid handoff timestamp: {created}");
            }
            created.clone()
        }
        None => timestamp::now(),
    };

    let metadata = Metadata {
        title: Some(spec.title.clone()),
        dates: Some(Dates {
            created: Some(created),
            modified: None,
        }),
        status: Some("active".to_string()),
        context: Some(ContextBlock {
            lineage: Some(Lineage {
                source: Some(HANDOFF_SOURCE.to_string()),
                parent_documents: spec.parent.clone().map(|parent| vec![parent]),
                derivation: Some("handoff".to_string()),
                confidence_flow: Some("preserved".to_string()),
            }),
            resolution: Some(Resolution {
                confidence: Some("working".to_string()),
                ..Default::default()
            }),
        }),
        ..Default::default()
    };

    let draft = StructuredDocument {
        metadata,
        body: render_body(spec),
        raw_text: String::new(),
    };
    let text = serialize(&draft);

    let parsed = parse(&text)
        .map_err(|failure| anyhow!("Generated handoff failed to parse: {failure}"))?;
    let validation = validate(&parsed.document);
    if !validation.valid {
        bail!(
            "Generated handoff failed validation: {}",
            validation.errors.join("; ")
        );
    }

    Ok(parsed.document)
}

/// Build, project, and persist a handoff document. Returns the stored form.
pub async fn store_handoff(
    store: &dyn BundleStore,
    spec: &HandoffSpec,
) -> Result<StoredBundle> {
    let document = build_document(spec)?;
    let bundle = to_bundle(&document, None);
    store.store(&bundle).await
}

fn render_body(spec: &HandoffSpec) -> String {
    let mut body = format!("## Task\n\n{}\n", spec.task.trim());

    if !spec.decisions.is_empty() {
        body.push_str("\n## Decisions\n\n");
        for decision in &spec.decisions {
            body.push_str(&format!("- {}\n", decision.trim()));
        }
    }

    if !spec.next_steps.is_empty() {
        body.push_str("\n## Next Steps\n\n");
        for step in &spec.next_steps {
            body.push_str(&format!("- {}\n", step.trim()));
        }
    }

    if let Some(notes) = &spec.notes {
        body.push_str(&format!("\n## Notes\n\n{}\n", notes.trim()));
    }

    body
}
