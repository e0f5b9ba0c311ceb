//! Sync pipeline orchestration.
//!
//! Coordinates the full flow per document: fingerprint check → reference
//! extraction → rehost decision → fetch → upload → rewrite → ledger update.
//! Documents are processed strictly one at a time, and resources within a
//! document one at a time; the ledger has a single owner for the whole run.
//!
//! Error boundaries follow the per-resource / per-document / per-run split:
//! a failed resource leaves its reference unrewritten and the document
//! continues; a failed document leaves its ledger entry untouched so it is
//! retried next run; only a corrupt ledger or a capacity refusal aborts the
//! run.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use tracing::warn;

use crate::config::Config;
use crate::extract::extract;
use crate::fetch::{fetch_resource, http_client};
use crate::fingerprint::fingerprint;
use crate::ledger::Ledger;
use crate::mapper::decide;
use crate::models::{RehostDecision, RunSummary};
use crate::rewrite::{rewrite, write_backup};
use crate::scan::scan_documents;
use crate::store::{
    classify_usage, folder_for_document, original_name_from_url, unique_filename, StoreClient,
    Watermark,
};

/// Run modes and overrides for one sync invocation.
#[derive(Debug, Default, Clone)]
pub struct SyncOptions {
    /// Report planned actions without mutating ledger, documents, or store.
    pub dry_run: bool,
    /// Ignore fingerprints; treat every document as dirty.
    pub force: bool,
    /// Proceed past a full active store without asking.
    pub assume_yes: bool,
}

/// Store client plus the once-per-run capacity gate.
///
/// The client is built (and the active repo's usage queried) only when the
/// run actually needs an upload, so runs that resolve everything from the
/// ledger never touch the store API.
struct UploadGate {
    client: Option<StoreClient>,
    checked: bool,
}

impl UploadGate {
    fn new() -> Self {
        Self {
            client: None,
            checked: false,
        }
    }

    async fn client(&mut self, config: &Config, assume_yes: bool) -> Result<&StoreClient> {
        if self.client.is_none() {
            self.client = Some(StoreClient::from_env(&config.stores)?);
        }
        let client = self.client.as_ref().unwrap();

        if !self.checked {
            let repo = config.stores.active_repo();
            // The gate is advisory: the store's own enforcement point is
            // authoritative, so an unanswerable usage query must not abort
            // the run. Only an actual at-capacity refusal does.
            match client.repo_usage(repo).await {
                Err(e) => {
                    warn!(
                        "could not check capacity of {}, proceeding: {:#}",
                        repo, e
                    );
                }
                Ok(usage) => match classify_usage(usage, &config.limits) {
                    Watermark::Ok => {}
                    Watermark::NearFull => {
                        warn!(
                            "active store {} is near capacity ({:.1} MB used)",
                            repo,
                            usage as f64 / 1024.0 / 1024.0
                        );
                    }
                    Watermark::Full => {
                        if assume_yes {
                            warn!(
                                "active store {} is at capacity; continuing because --yes was given",
                                repo
                            );
                        } else {
                            bail!(
                                "Active store {} is at capacity ({:.1} MB used). \
                                 Switch stores.active to the next repo, or re-run with --yes to force.",
                                repo,
                                usage as f64 / 1024.0 / 1024.0
                            );
                        }
                    }
                },
            }
            self.checked = true;
        }

        Ok(self.client.as_ref().unwrap())
    }
}

pub async fn run_sync(config: &Config, opts: &SyncOptions) -> Result<()> {
    let ledger_path = config.ledger.path.clone();
    let mut ledger = Ledger::load(&ledger_path)?;

    let docs = scan_documents(&config.scan)?;
    let fetcher = http_client()?;
    let mut gate = UploadGate::new();
    let mut summary = RunSummary::default();
    let mut planned_uploads = 0u64;

    for doc in &docs {
        // A run-level failure (capacity refusal, ledger persistence) aborts
        // the remaining documents; everything completed so far is already
        // persisted.
        process_document(
            config,
            &fetcher,
            &mut gate,
            &mut ledger,
            &ledger_path,
            doc,
            opts,
            &mut summary,
            &mut planned_uploads,
        )
        .await?;
    }

    if opts.dry_run {
        println!("sync (dry-run)");
        println!("  documents scanned: {}", docs.len());
        println!("  documents dirty: {}", summary.documents_processed);
        println!("  planned uploads: {}", planned_uploads);
        println!("  already mapped or on store: {}", summary.skipped);
    } else {
        println!("sync");
        println!("  documents scanned: {}", docs.len());
        println!("  documents processed: {}", summary.documents_processed);
        println!("  documents unchanged: {}", summary.documents_unchanged);
        println!("  documents failed: {}", summary.documents_failed);
        println!("  resources uploaded: {}", summary.uploaded);
        println!("  resources skipped: {}", summary.skipped);
        println!("  resources failed: {}", summary.failed);
    }
    println!("ok");

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn process_document(
    config: &Config,
    fetcher: &reqwest::Client,
    gate: &mut UploadGate,
    ledger: &mut Ledger,
    ledger_path: &Path,
    doc: &PathBuf,
    opts: &SyncOptions,
    summary: &mut RunSummary,
    planned_uploads: &mut u64,
) -> Result<()> {
    let doc_key = doc.to_string_lossy().to_string();

    let text = match std::fs::read_to_string(doc) {
        Ok(text) => text,
        Err(e) => {
            warn!("unreadable document, skipping: {} ({})", doc.display(), e);
            summary.documents_failed += 1;
            return Ok(());
        }
    };
    let fp = fingerprint(text.as_bytes());

    if !opts.force && !ledger.is_dirty(&doc_key, &fp) {
        summary.documents_unchanged += 1;
        return Ok(());
    }

    let refs = extract(&text);
    let mut replacements: Vec<(std::ops::Range<usize>, String)> = Vec::new();
    let mut uploaded_any = false;
    let mut any_failed = false;

    for reference in &refs {
        match decide(reference, ledger, &config.stores.repos) {
            RehostDecision::Skip => {
                summary.skipped += 1;
            }
            RehostDecision::AlreadyMapped(new_url) => {
                summary.skipped += 1;
                if opts.dry_run {
                    continue;
                }
                if new_url != reference.url {
                    replacements.push((reference.span.clone(), new_url));
                }
            }
            RehostDecision::NeedsUpload => {
                if opts.dry_run {
                    *planned_uploads += 1;
                    println!(
                        "  [plan] {} <- {}",
                        config.stores.active_repo(),
                        reference.url
                    );
                    continue;
                }

                // The capacity gate runs before the first real upload and
                // aborts the whole run when the active store is full.
                let store = gate.client(config, opts.assume_yes).await?;

                let fetched =
                    match fetch_resource(fetcher, reference, doc, &config.limits).await {
                        Ok(fetched) => fetched,
                        Err(e) => {
                            warn!("{:#}", anyhow::Error::from(e));
                            summary.failed += 1;
                            any_failed = true;
                            continue;
                        }
                    };

                let name =
                    unique_filename(&original_name_from_url(&reference.url), &fetched.ext);
                let dest_path = format!("{}/{}", folder_for_document(doc), name);

                let new_url = match store
                    .upload(
                        config.stores.active_repo(),
                        &config.stores.branch,
                        &dest_path,
                        &fetched.bytes,
                        &config.limits,
                    )
                    .await
                {
                    Ok(url) => url,
                    Err(e) => {
                        warn!("upload failed for {}: {:#}", reference.url, e);
                        summary.failed += 1;
                        any_failed = true;
                        continue;
                    }
                };

                ledger.record_mapping(&reference.url, &new_url, config.stores.active_repo());
                replacements.push((reference.span.clone(), new_url));
                uploaded_any = true;
                summary.uploaded += 1;
            }
        }
    }

    if opts.dry_run {
        summary.documents_processed += 1;
        return Ok(());
    }

    // Persist new mappings before touching the document, so a rewrite
    // failure never costs us an already-paid upload.
    if uploaded_any {
        ledger.save(ledger_path)?;
    }

    if !replacements.is_empty() {
        let new_text = match rewrite(&text, &replacements) {
            Ok(t) => t,
            Err(e) => {
                warn!("rewrite failed for {}: {:#}", doc.display(), e);
                summary.documents_failed += 1;
                return Ok(());
            }
        };

        if config.scan.backup {
            if let Err(e) = write_backup(doc, &text) {
                warn!(
                    "backup failed, leaving {} untouched: {:#}",
                    doc.display(),
                    e
                );
                summary.documents_failed += 1;
                return Ok(());
            }
        }

        if let Err(e) = std::fs::write(doc, new_text.as_bytes()) {
            warn!("write failed for {}: {}", doc.display(), e);
            // Best-effort restore of the original contents.
            let _ = std::fs::write(doc, text.as_bytes());
            summary.documents_failed += 1;
            return Ok(());
        }
    }

    // A document with any failed resource is not done: its ledger entry
    // stays untouched so the whole document is retried next run. Successful
    // uploads are already mapped and persisted, so none are re-paid.
    if any_failed {
        warn!(
            "{}: some resources failed, leaving ledger entry untouched for retry",
            doc.display()
        );
        summary.documents_failed += 1;
        return Ok(());
    }

    // The document completed its full pipeline: update and persist its
    // ledger entry. Fingerprint the bytes as rewritten so an unchanged
    // rerun is a no-op.
    let final_fp = if replacements.is_empty() {
        fp
    } else {
        match std::fs::read(doc) {
            Ok(bytes) => fingerprint(&bytes),
            Err(_) => fp,
        }
    };
    ledger.record_document(&doc_key, &final_fp);
    ledger.save(ledger_path)?;
    summary.documents_processed += 1;

    Ok(())
}
