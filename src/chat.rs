//! Terminal chat-session demo.
//!
//! A line-oriented loop with a canned response table. The point is not the
//! conversation: when the session ends, the transcript is captured as an
//! ORMD document, projected, and stored, so the demo exercises the same
//! pipeline as every other producer.

use std::io::{BufRead, Write};

use anyhow::{anyhow, Result};

use crate::bundle::to_bundle;
use crate::document::{ContextBlock, Dates, Lineage, Metadata, Resolution, StructuredDocument};
use crate::parse::parse;
use crate::serialize::serialize;
use crate::store::{BundleStore, StoredBundle};
use crate::timestamp;

/// Pick a canned response for one user line.
pub fn respond(input: &str) -> &'static str {
    let lower = input.to_lowercase();
    if lower.contains("hello") || lower.contains("hi ") || lower == "hi" {
        "Hello. Everything you tell me here is kept for the next session."
    } else if lower.contains("remember") || lower.contains("context") {
        "Noted. This session becomes a bundle when you leave, so nothing is lost."
    } else if lower.contains("search") || lower.contains("find") {
        "Try `cbx search <query>` from the shell to scan stored bundles."
    } else if lower.contains("bundle") {
        "A bundle is the canonical envelope a document is projected into before storage."
    } else if lower.contains("handoff") {
        "Use `cbx handoff` to generate a structured handoff document for the next agent."
    } else {
        "Understood. Anything else? Type 'exit' to end and preserve this session."
    }
}

/// Build the session transcript document.
pub fn session_document(transcript: &[(String, String)]) -> Result<StructuredDocument> {
    let mut body = String::new();
    for (user, reply) in transcript {
        body.push_str(&format!("**you**: {user}\n\n**cbx**: {reply}\n\n"));
    }

    let metadata = Metadata {
        title: Some("Chat session transcript".to_string()),
        dates: Some(Dates {
            created: Some(timestamp::now()),
            modified: None,
        }),
        context: Some(ContextBlock {
            lineage: Some(Lineage {
                source: Some("chat-session".to_string()),
                parent_documents: None,
                derivation: Some("transcript".to_string()),
                confidence_flow: Some("preserved".to_string()),
            }),
            resolution: Some(Resolution {
                confidence: Some("exploratory".to_string()),
                ..Default::default()
            }),
        }),
        ..Default::default()
    };

    let draft = StructuredDocument {
        metadata,
        body,
        raw_text: String::new(),
    };
    let text = serialize(&draft);
    let parsed =
        parse(&text).map_err(|failure| anyhow!("Generated transcript failed to parse: {failure}"))?;
    Ok(parsed.document)
}

/// Run the interactive loop over stdin/stdout, persisting the transcript to
/// `store` when the user leaves.
pub async fn run_chat(store: &dyn BundleStore) -> Result<Option<StoredBundle>> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut transcript: Vec<(String, String)> = Vec::new();

    println!("Chat demo. Type 'exit' to end the session and preserve it.");
    loop {
        print!("you> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let reply = respond(line);
        println!("cbx> {reply}");
        transcript.push((line.to_string(), reply.to_string()));
    }

    if transcript.is_empty() {
        println!("Nothing said; session discarded.");
        return Ok(None);
    }

    let document = session_document(&transcript)?;
    let bundle = to_bundle(&document, None);
    let stored = store.store(&bundle).await?;
    println!("Session preserved as {}", stored.bundle.id);
    Ok(Some(stored))
}
