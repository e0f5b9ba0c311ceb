//! Persistent sync ledger.
//!
//! The ledger is the sole source of truth for skip/process decisions. It
//! holds two typed collections: per-document sync state keyed by path, and
//! per-URL rehost mappings keyed by the original URL. Both use `BTreeMap`
//! so a load → save round-trip reproduces the file exactly.
//!
//! Persistence is one whole-ledger JSON snapshot. Saves write to a sibling
//! temp file and rename into place, so a crash mid-write never corrupts the
//! previously persisted state. A malformed ledger on load fails the whole
//! run — silently resetting would trigger a mass re-upload.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{DocumentRecord, ResourceMapping};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Document path → sync state.
    #[serde(default)]
    pub documents: BTreeMap<String, DocumentRecord>,
    /// Original resource URL → rehost mapping.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceMapping>,
}

impl Ledger {
    /// Load the ledger from `path`. A missing file yields an empty ledger;
    /// a malformed file is a hard error.
    pub fn load(path: &Path) -> Result<Ledger> {
        if !path.exists() {
            return Ok(Ledger::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read ledger: {}", path.display()))?;
        serde_json::from_str(&content).with_context(|| {
            format!(
                "Ledger {} is malformed; refusing to reset it (that would re-upload everything)",
                path.display()
            )
        })
    }

    /// Persist a complete snapshot atomically: write a sibling temp file,
    /// then rename it over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        std::fs::write(&tmp, json.as_bytes())
            .with_context(|| format!("Failed to write ledger snapshot: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to swap ledger into place: {}", path.display()))?;
        Ok(())
    }

    /// Whether `doc_path` must be processed given its current fingerprint.
    pub fn is_dirty(&self, doc_path: &str, fingerprint: &str) -> bool {
        match self.documents.get(doc_path) {
            Some(record) => record.fingerprint != fingerprint,
            None => true,
        }
    }

    /// Look up the rehost mapping for an original URL.
    pub fn mapping(&self, original_url: &str) -> Option<&ResourceMapping> {
        self.resources.get(original_url)
    }

    /// Record a freshly uploaded resource. Mappings are immutable: if the
    /// URL was already mapped the existing entry wins.
    pub fn record_mapping(&mut self, original_url: &str, new_url: &str, store: &str) {
        self.resources
            .entry(original_url.to_string())
            .or_insert_with(|| ResourceMapping {
                new_url: new_url.to_string(),
                store: store.to_string(),
                uploaded_at: Utc::now(),
            });
    }

    /// Record a document's successful sync: fingerprint plus timestamp.
    pub fn record_document(&mut self, doc_path: &str, fingerprint: &str) {
        self.documents.insert(
            doc_path.to_string(),
            DocumentRecord {
                fingerprint: fingerprint.to_string(),
                last_synced_at: Utc::now(),
            },
        );
    }
}
