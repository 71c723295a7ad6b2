//! # Context Bundle
//!
//! A local-first context preservation platform.
//!
//! ORMD text documents (frontmatter + markdown body) are parsed into
//! structured records, validated against the format's business rules,
//! projected into canonical bundle envelopes, and persisted in a
//! relationship-aware store with keyword search. An agent-handoff generator
//! and a chat-session demo sit on top, wiring the same primitives into
//! narrative use cases.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐
//! │  ORMD    │──▶│  Parser  │──▶│ Projector │──▶│  SQLite   │
//! │  text    │   │ +Validate│   │  (Bundle) │   │  store    │
//! └──────────┘   └────┬─────┘   └───────────┘   └─────┬─────┘
//!                     │                               │
//!                ┌────▼─────┐                   ┌─────▼─────┐
//!                │Serializer│                   │ search /  │
//!                │(re-emit) │                   │ relate    │
//!                └──────────┘                   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cbx init                        # create database
//! cbx store notes.md              # parse + validate + project + store
//! cbx search "rollback"           # substring scan over stored bundles
//! cbx relate <from> <to> --rel supports
//! cbx handoff --title "..." --task "..."
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`document`] | Structured document and metadata types |
//! | [`parse`] | Frontmatter parsing with accumulated errors |
//! | [`validate`] | Semantic re-validation |
//! | [`bundle`] | Canonical envelope and projection |
//! | [`serialize`] | Document → text re-emission |
//! | [`timestamp`] | Timestamp pattern and calendar checks |
//! | [`store`] | Storage abstraction (SQLite + in-memory) |
//! | [`handoff`] | Agent handoff document generation |
//! | [`chat`] | Chat-session demo |
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod bundle;
pub mod chat;
pub mod config;
pub mod db;
pub mod document;
pub mod handoff;
pub mod migrate;
pub mod parse;
pub mod serialize;
pub mod store;
pub mod timestamp;
pub mod validate;
