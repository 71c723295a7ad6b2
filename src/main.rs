//! # Context Bundle CLI (`cbx`)
//!
//! The `cbx` binary is the primary interface for the context preservation
//! platform. It provides commands for parsing and validating ORMD documents,
//! projecting them into canonical bundles, and working with the bundle store
//! (search, filtered queries, relationship edges).
//!
//! ## Usage
//!
//! ```bash
//! cbx --config ./config/cbx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cbx init` | Create the SQLite database and run schema migrations |
//! | `cbx parse <file>` | Parse an ORMD document and print its structure |
//! | `cbx validate <file>` | Parse and semantically validate a document |
//! | `cbx convert <file>` | Project a document into a bundle (JSON) |
//! | `cbx store <files>` | Parse, validate, project, and persist documents |
//! | `cbx update <file>` | Replace a stored bundle with a re-projection |
//! | `cbx get <id>` | Retrieve a stored bundle by id |
//! | `cbx delete <id>` | Delete a stored bundle and its edges |
//! | `cbx search "<query>"` | Substring search over stored bundles |
//! | `cbx query` | Filtered bundle listing with pagination |
//! | `cbx relate <from> <to>` | Add a weighted relationship edge |
//! | `cbx related <id>` | List edges touching a bundle |
//! | `cbx handoff` | Generate and store an agent handoff document |
//! | `cbx chat` | Interactive demo session, preserved on exit |
//!
//! `parse`, `validate`, and `convert` are pure and run without a config
//! file; everything touching the store reads `--config` first.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use context_bundle::bundle::to_bundle;
use context_bundle::chat;
use context_bundle::config::{self, Config};
use context_bundle::db;
use context_bundle::handoff::{self, HandoffSpec};
use context_bundle::migrate;
use context_bundle::parse::{parse, Parsed};
use context_bundle::store::memory::InMemoryStore;
use context_bundle::store::sqlite::SqliteStore;
use context_bundle::store::{BundleQuery, BundleStore, StoredBundle};
use context_bundle::validate::validate;

/// Context Bundle CLI — parse, validate, and preserve ORMD documents as
/// canonical context bundles.
#[derive(Parser)]
#[command(
    name = "cbx",
    about = "Context Bundle — a local-first context preservation platform",
    version,
    long_about = "Context Bundle parses ORMD documents (YAML frontmatter + markdown body), \
    validates them, projects them into canonical bundle envelopes, and persists them in a \
    relationship-aware SQLite store with keyword search."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cbx.toml`. Only commands that touch the store
    /// read it; `parse`, `validate`, and `convert` run without one.
    #[arg(long, global = true, default_value = "./config/cbx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `bundles` and
    /// `relationships` tables. Idempotent — running it again is safe.
    Init,

    /// Parse an ORMD document.
    ///
    /// Prints the decoded metadata and body on success, or every accumulated
    /// error on failure. Warnings (e.g. a missing version comment) are
    /// advisory and never fail the parse.
    Parse {
        /// Path to the ORMD file.
        file: PathBuf,

        /// Emit the parsed document as JSON instead of a readable dump.
        #[arg(long)]
        json: bool,
    },

    /// Parse and semantically validate a document.
    ///
    /// Exit code 1 when the document is invalid; every violation is listed.
    Validate {
        /// Path to the ORMD file.
        file: PathBuf,
    },

    /// Project a document into its canonical bundle (printed as JSON).
    ///
    /// Projection never fails for a parseable document; defaults are applied
    /// for absent fields.
    Convert {
        /// Path to the ORMD file.
        file: PathBuf,

        /// Explicit bundle id (`urn:cb:...`); generated when omitted.
        #[arg(long)]
        id: Option<String>,
    },

    /// Parse, validate, project, and persist one or more documents.
    ///
    /// Several files are stored as a single batch; the batch fails on the
    /// first rejected document.
    Store {
        /// Paths to ORMD files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Explicit bundle id (`urn:cb:...`); generated when omitted.
        /// Only valid with a single input file.
        #[arg(long)]
        id: Option<String>,
    },

    /// Replace a stored bundle with a re-projected document.
    ///
    /// Bundles are immutable values; an update is a new projection stored
    /// under the same id.
    Update {
        /// Path to the ORMD file.
        file: PathBuf,

        /// Id of the stored bundle to replace.
        #[arg(long)]
        id: String,
    },

    /// Retrieve a stored bundle by id.
    Get {
        /// Bundle id (`urn:cb:...`).
        id: String,
    },

    /// Delete a stored bundle and any edges touching it.
    Delete {
        /// Bundle id (`urn:cb:...`).
        id: String,
    },

    /// Search stored bundles.
    ///
    /// Case-insensitive substring scan over each bundle's derived search
    /// text (content plus frame descriptors).
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results (defaults to `search.default_limit`).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// List stored bundles with filters and pagination.
    Query {
        /// Filter by frame type (e.g. `ormd.document`).
        #[arg(long)]
        frame_type: Option<String>,

        /// Filter by resolution confidence (`exploratory`, `working`, `validated`).
        #[arg(long)]
        confidence: Option<String>,

        /// Filter by derived tag (e.g. `scope:local`, `domain:platform`).
        #[arg(long)]
        tag: Option<String>,

        /// Page size (defaults to `search.page_size`).
        #[arg(long)]
        limit: Option<i64>,

        /// Number of results to skip.
        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Sort order: `indexed` (newest first), `created`, or `id`.
        #[arg(long, default_value = "indexed")]
        sort: String,
    },

    /// Add a directed, weighted relationship edge between two bundles.
    Relate {
        /// Source bundle id.
        from: String,

        /// Target bundle id.
        to: String,

        /// Relationship type label (e.g. `supports`, `derives-from`).
        #[arg(long)]
        rel: String,

        /// Edge strength in [0.0, 1.0].
        #[arg(long, default_value_t = 1.0)]
        strength: f64,
    },

    /// List relationship edges touching a bundle.
    Related {
        /// Bundle id (`urn:cb:...`).
        id: String,
    },

    /// Generate an agent handoff document and store it as a bundle.
    ///
    /// The document captures the session's task, decisions, and next steps,
    /// and flows through the same parse → validate → project → store
    /// pipeline as any other document.
    Handoff {
        /// Document title.
        #[arg(long)]
        title: String,

        /// One-paragraph task summary.
        #[arg(long)]
        task: String,

        /// Decision taken during the session (repeatable).
        #[arg(long = "decision")]
        decisions: Vec<String>,

        /// Next step for the receiving agent (repeatable).
        #[arg(long = "next-step")]
        next_steps: Vec<String>,

        /// Free-form notes section.
        #[arg(long)]
        note: Option<String>,

        /// Bundle id of the session this one continues.
        #[arg(long)]
        parent: Option<String>,

        /// Also write the generated ORMD text to this path.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Start the interactive chat demo.
    ///
    /// The transcript is preserved as a bundle when the session ends. Without
    /// a config file the session runs against an in-memory store.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Commands that don't require config
    match &cli.command {
        Commands::Parse { file, json } => {
            run_parse(file, *json)?;
            return Ok(());
        }
        Commands::Validate { file } => {
            run_validate(file)?;
            return Ok(());
        }
        Commands::Convert { file, id } => {
            run_convert(file, id.as_deref())?;
            return Ok(());
        }
        Commands::Chat => {
            match config::load_config(&cli.config) {
                Ok(cfg) => {
                    let pool = db::connect(&cfg).await?;
                    let store = SqliteStore::new(pool.clone());
                    chat::run_chat(&store).await?;
                    pool.close().await;
                }
                Err(_) => {
                    println!("No config found; this session will not outlive the process.");
                    let store = InMemoryStore::new();
                    chat::run_chat(&store).await?;
                }
            }
            return Ok(());
        }
        _ => {}
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Store { files, id } => {
            run_store(&cfg, &files, id.as_deref()).await?;
        }
        Commands::Update { file, id } => {
            run_update(&cfg, &file, &id).await?;
        }
        Commands::Get { id } => {
            run_get(&cfg, &id).await?;
        }
        Commands::Delete { id } => {
            run_delete(&cfg, &id).await?;
        }
        Commands::Search { query, limit } => {
            run_search(&cfg, &query, limit).await?;
        }
        Commands::Query {
            frame_type,
            confidence,
            tag,
            limit,
            offset,
            sort,
        } => {
            let query = BundleQuery {
                frame_type,
                confidence,
                tag,
                limit: limit.unwrap_or(cfg.search.page_size),
                offset,
                sort: sort.parse()?,
            };
            run_query(&cfg, &query).await?;
        }
        Commands::Relate {
            from,
            to,
            rel,
            strength,
        } => {
            run_relate(&cfg, &from, &to, &rel, strength).await?;
        }
        Commands::Related { id } => {
            run_related(&cfg, &id).await?;
        }
        Commands::Handoff {
            title,
            task,
            decisions,
            next_steps,
            note,
            parent,
            out,
        } => {
            let spec = HandoffSpec {
                title,
                task,
                decisions,
                next_steps,
                notes: note,
                parent,
                created_at: None,
            };
            run_handoff(&cfg, &spec, out.as_deref()).await?;
        }
        // Handled above (before config loading)
        Commands::Parse { .. }
        | Commands::Validate { .. }
        | Commands::Convert { .. }
        | Commands::Chat => unreachable!(),
    }

    Ok(())
}

fn read_document(file: &Path) -> Result<String> {
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read document: {}", file.display()))
}

/// Parse the file or print every error and exit. Shared by the commands that
/// start from a document on disk.
fn parse_or_exit(file: &Path) -> Result<Parsed> {
    let text = read_document(file)?;
    match parse(&text) {
        Ok(parsed) => Ok(parsed),
        Err(failure) => {
            for warning in &failure.warnings {
                eprintln!("warning: {warning}");
            }
            for error in &failure.errors {
                eprintln!("error: {error}");
            }
            std::process::exit(1);
        }
    }
}

fn run_parse(file: &Path, json: bool) -> Result<()> {
    let parsed = parse_or_exit(file)?;

    if json {
        let value = serde_json::json!({
            "metadata": parsed.document.metadata,
            "body": parsed.document.body,
            "warnings": parsed.warnings,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for warning in &parsed.warnings {
        println!("warning: {warning}");
    }
    println!("--- Metadata ---");
    print!("{}", serde_yaml::to_string(&parsed.document.metadata)?);
    println!();
    println!("--- Body ---");
    println!("{}", parsed.document.body);
    Ok(())
}

fn run_validate(file: &Path) -> Result<()> {
    let parsed = parse_or_exit(file)?;
    let result = validate(&parsed.document);

    for warning in parsed.warnings.iter().chain(result.warnings.iter()) {
        println!("warning: {warning}");
    }

    if result.valid {
        println!("ok");
        Ok(())
    } else {
        for error in &result.errors {
            eprintln!("error: {error}");
        }
        std::process::exit(1);
    }
}

fn run_convert(file: &Path, id: Option<&str>) -> Result<()> {
    let parsed = parse_or_exit(file)?;
    let bundle = to_bundle(&parsed.document, id);
    println!("{}", serde_json::to_string_pretty(&bundle)?);
    Ok(())
}

async fn run_store(config: &Config, files: &[PathBuf], id: Option<&str>) -> Result<()> {
    if files.len() > 1 && id.is_some() {
        anyhow::bail!("--id requires a single input file");
    }

    let mut bundles = Vec::with_capacity(files.len());
    for file in files {
        let parsed = parse_or_exit(file)?;

        let result = validate(&parsed.document);
        for warning in parsed.warnings.iter().chain(result.warnings.iter()) {
            println!("warning: {}: {warning}", file.display());
        }
        if !result.valid {
            for error in &result.errors {
                eprintln!("error: {}: {error}", file.display());
            }
            std::process::exit(1);
        }

        bundles.push(to_bundle(&parsed.document, id));
    }

    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let stored = store.store_batch(&bundles).await?;

    for item in &stored {
        println!("stored {}", item.bundle.id);
        println!("  tags: {}", item.tags.join(", "));
    }
    pool.close().await;
    Ok(())
}

async fn run_update(config: &Config, file: &Path, id: &str) -> Result<()> {
    let parsed = parse_or_exit(file)?;

    let result = validate(&parsed.document);
    for warning in parsed.warnings.iter().chain(result.warnings.iter()) {
        println!("warning: {warning}");
    }
    if !result.valid {
        for error in &result.errors {
            eprintln!("error: {error}");
        }
        std::process::exit(1);
    }

    let bundle = to_bundle(&parsed.document, Some(id));
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let stored = store.update(&bundle).await?;
    pool.close().await;

    println!("updated {}", stored.bundle.id);
    Ok(())
}

async fn run_get(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let stored = store.get(id).await?;
    pool.close().await;

    let stored = match stored {
        Some(stored) => stored,
        None => {
            eprintln!("Error: bundle not found: {id}");
            std::process::exit(1);
        }
    };

    println!("--- Bundle ---");
    println!("id:         {}", stored.bundle.id);
    println!("version:    {}", stored.bundle.version);
    if let Some(ref created) = stored.bundle.created {
        println!("created:    {created}");
    }
    println!("frame:      {}", stored.bundle.frame.frame_type);
    println!(
        "confidence: {}",
        stored.bundle.resolution.confidence.as_str()
    );
    println!("tags:       {}", stored.tags.join(", "));
    println!("indexed_at: {}", format_ts_iso(stored.indexed_at));
    println!();
    println!("--- Content ---");
    println!("{}", stored.bundle.content.data);
    Ok(())
}

async fn run_delete(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let deleted = store.delete(id).await?;
    pool.close().await;

    if deleted {
        println!("deleted {id}");
        Ok(())
    } else {
        eprintln!("Error: bundle not found: {id}");
        std::process::exit(1);
    }
}

async fn run_search(config: &Config, query: &str, limit: Option<i64>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let limit = limit.unwrap_or(config.search.default_limit);
    let results = store.search(query, limit).await?;
    pool.close().await;

    print_listing(&results);
    Ok(())
}

async fn run_query(config: &Config, query: &BundleQuery) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let results = store.query(query).await?;
    pool.close().await;

    print_listing(&results);
    Ok(())
}

async fn run_relate(
    config: &Config,
    from: &str,
    to: &str,
    rel: &str,
    strength: f64,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let edge = store.relate(from, to, rel, strength).await?;
    pool.close().await;

    println!(
        "related {} -[{} {:.2}]-> {}",
        edge.from_id, edge.rel_type, edge.strength, edge.to_id
    );
    Ok(())
}

async fn run_related(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let edges = store.relationships(id).await?;
    pool.close().await;

    if edges.is_empty() {
        println!("No relationships.");
        return Ok(());
    }
    for edge in &edges {
        println!(
            "{} -[{} {:.2}]-> {}",
            edge.from_id, edge.rel_type, edge.strength, edge.to_id
        );
    }
    Ok(())
}

async fn run_handoff(config: &Config, spec: &HandoffSpec, out: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;
    let store = SqliteStore::new(pool.clone());
    let stored = handoff::store_handoff(&store, spec).await?;
    pool.close().await;

    if let Some(out) = out {
        // The stored payload is the generated ORMD text verbatim.
        std::fs::write(out, &stored.bundle.content.data)
            .with_context(|| format!("Failed to write handoff document: {}", out.display()))?;
        println!("wrote {}", out.display());
    }
    println!("stored {}", stored.bundle.id);
    Ok(())
}

fn print_listing(results: &[StoredBundle]) {
    if results.is_empty() {
        println!("No results.");
        return;
    }
    for (i, stored) in results.iter().enumerate() {
        let excerpt: String = stored
            .bundle
            .content
            .data
            .replace('\n', " ")
            .chars()
            .take(96)
            .collect();
        println!(
            "{}. {} [{}] {}",
            i + 1,
            stored.bundle.id,
            stored.bundle.resolution.confidence.as_str(),
            stored.bundle.frame.frame_type
        );
        println!("    indexed: {}", format_ts_iso(stored.indexed_at));
        println!("    excerpt: \"{}\"", excerpt.trim());
    }
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
