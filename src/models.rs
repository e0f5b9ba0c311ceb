//! Core data models used throughout picsync.
//!
//! These types represent the resource references, rehosting decisions, and
//! ledger records that flow through the scan → extract → upload → rewrite
//! pipeline.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Syntactic form a resource reference was matched as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// Markdown image syntax: `![alt](url)`.
    Markdown,
    /// Inline HTML tag: `<img src="url">`.
    HtmlTag,
    /// Relative or bare local path inside either syntax.
    LocalPath,
}

/// One image reference found in a document.
///
/// `span` is the byte range of the URL itself within the original document
/// text, so the rewriter can substitute the new location without touching
/// the surrounding markup.
#[derive(Debug, Clone)]
pub struct ResourceRef {
    pub span: Range<usize>,
    pub url: String,
    pub kind: RefKind,
}

impl ResourceRef {
    /// Whether the reference points at the local filesystem rather than
    /// an absolute network URL.
    pub fn is_local(&self) -> bool {
        self.kind == RefKind::LocalPath
    }
}

/// Outcome of consulting the ledger and store registry for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RehostDecision {
    /// URL already lives on one of our store repos; leave it alone.
    Skip,
    /// URL was rehosted in an earlier run or document; reuse the mapping.
    AlreadyMapped(String),
    /// Never seen before; fetch and upload.
    NeedsUpload,
}

/// Ledger record for one scanned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Hex SHA-256 of the document bytes at last successful sync.
    pub fingerprint: String,
    pub last_synced_at: DateTime<Utc>,
}

/// Ledger record for one rehosted original URL. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMapping {
    /// Permanent raw URL on the store repo.
    pub new_url: String,
    /// Which store repo holds the bytes (e.g. `user/picbed-01`).
    pub store: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Per-run counters reported in the end-of-run summary.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    /// Documents that went through the full pipeline.
    pub documents_processed: u64,
    /// Documents skipped because their fingerprint was unchanged.
    pub documents_unchanged: u64,
    /// Documents not marked done: read or backup failures, or at least
    /// one resource failed so the document stays dirty for retry.
    pub documents_failed: u64,
    /// Resources uploaded to the active store.
    pub uploaded: u64,
    /// Resources resolved via an existing mapping or store-domain skip.
    pub skipped: u64,
    /// Resources that failed to fetch or upload and were left untouched.
    pub failed: u64,
}
