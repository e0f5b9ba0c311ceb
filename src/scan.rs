//! Document discovery.
//!
//! Walks the configured folders and returns every document matching the
//! include globs, sorted for deterministic run order.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use tracing::warn;
use walkdir::WalkDir;

use crate::config::ScanConfig;

pub fn scan_documents(scan: &ScanConfig) -> Result<Vec<PathBuf>> {
    let include_set = build_globset(&scan.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/*.bak".to_string(),
    ];
    default_excludes.extend(scan.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut docs = Vec::new();

    for folder in &scan.folders {
        if !folder.exists() {
            warn!("scan folder does not exist, skipping: {}", folder.display());
            continue;
        }

        for entry in WalkDir::new(folder) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(folder).unwrap_or(path);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) {
                continue;
            }
            if !include_set.is_match(&rel_str) {
                continue;
            }

            docs.push(path.to_path_buf());
        }
    }

    // Sort for deterministic ordering
    docs.sort();

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_config(root: &std::path::Path) -> ScanConfig {
        ScanConfig {
            folders: vec![root.to_path_buf()],
            include_globs: vec!["**/*.md".to_string()],
            exclude_globs: vec![],
            backup: false,
        }
    }

    #[test]
    fn test_finds_markdown_recursively_sorted() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("b.md"), "b").unwrap();
        std::fs::write(tmp.path().join("sub/a.md"), "a").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "txt").unwrap();

        let docs = scan_documents(&scan_config(tmp.path())).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].ends_with("b.md"));
        assert!(docs[1].ends_with("sub/a.md"));
    }

    #[test]
    fn test_backups_excluded() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.md"), "a").unwrap();
        std::fs::write(tmp.path().join("a.md.bak"), "old").unwrap();

        let docs = scan_documents(&scan_config(tmp.path())).unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[test]
    fn test_missing_folder_skipped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cfg = scan_config(tmp.path());
        cfg.folders.push(tmp.path().join("does-not-exist"));
        std::fs::write(tmp.path().join("a.md"), "a").unwrap();

        let docs = scan_documents(&cfg).unwrap();
        assert_eq!(docs.len(), 1);
    }
}
