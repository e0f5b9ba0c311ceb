//! # picsync
//!
//! Rehost external images referenced from Markdown notes into GitHub-backed
//! image repositories.
//!
//! picsync scans configured directories for Markdown documents, finds image
//! references (Markdown syntax, inline `<img>` tags, and relative paths),
//! uploads the image bytes to a capacity-bounded "image bed" repository, and
//! rewrites the references in place. A persistent JSON ledger records a
//! fingerprint per document and a mapping per original URL, so unchanged
//! documents are skipped outright and a given URL is uploaded at most once
//! across all documents and runs.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────┐   ┌─────────┐   ┌────────┐   ┌────────┐   ┌─────────┐
//! │ scan │──▶│ extract │──▶│ decide │──▶│ upload │──▶│ rewrite │
//! └──────┘   └─────────┘   └───┬────┘   └────────┘   └─────────┘
//!                              │  skip / already-mapped
//!                          ┌───▼────┐
//!                          │ ledger │  (atomic JSON snapshots)
//!                          └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! picsync sync --dry-run        # preview planned uploads
//! picsync sync                  # rehost and rewrite
//! picsync sync --force          # ignore fingerprints
//! picsync status                # store capacity report
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`fingerprint`] | Document change detection |
//! | [`extract`] | Image reference extraction |
//! | [`mapper`] | Skip / already-mapped / upload decision |
//! | [`fetch`] | Resource retrieval (network + local) |
//! | [`store`] | Remote store client and naming |
//! | [`rewrite`] | Span-based document rewriting |
//! | [`ledger`] | Persistent sync state |
//! | [`sync`] | Pipeline orchestration |
//! | [`status`] | Store capacity report |

pub mod config;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod fingerprint;
pub mod ledger;
pub mod mapper;
pub mod models;
pub mod retry;
pub mod rewrite;
pub mod scan;
pub mod status;
pub mod store;
pub mod sync;
