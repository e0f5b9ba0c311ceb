//! Document rewriting.
//!
//! Replacements carry byte spans computed against the original text, so
//! they are applied right-to-left: splicing from the end keeps every
//! earlier span's offsets valid, with no drift regardless of the order the
//! replacements were collected in.

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Apply all `replacements` (span in the original text → new URL) and
/// return the rewritten text. Overlapping spans are a caller bug and
/// are rejected.
pub fn rewrite(text: &str, replacements: &[(Range<usize>, String)]) -> Result<String> {
    let mut ordered: Vec<&(Range<usize>, String)> = replacements.iter().collect();
    ordered.sort_by_key(|(span, _)| span.start);

    for pair in ordered.windows(2) {
        let (a, _) = pair[0];
        let (b, _) = pair[1];
        if a.end > b.start {
            anyhow::bail!("Overlapping replacement spans: {:?} and {:?}", a, b);
        }
    }
    if let Some((last, _)) = ordered.last() {
        if last.end > text.len() {
            anyhow::bail!("Replacement span {:?} exceeds text length {}", last, text.len());
        }
    }

    let mut out = text.to_string();
    for (span, new_url) in ordered.into_iter().rev() {
        out.replace_range(span.clone(), new_url);
    }
    Ok(out)
}

/// Write a backup copy of the pre-rewrite text next to the document.
///
/// Returns the backup path. Failure here is fatal for the document:
/// when backups are enabled the original is never overwritten without
/// one.
pub fn write_backup(doc_path: &Path, original_text: &str) -> Result<PathBuf> {
    let mut backup = doc_path.as_os_str().to_owned();
    backup.push(".bak");
    let backup = PathBuf::from(backup);
    std::fs::write(&backup, original_text.as_bytes())
        .with_context(|| format!("Failed to write backup: {}", backup.display()))?;
    Ok(backup)
}
