//! Rehosting decision logic.
//!
//! The three-way decision here is the central de-duplication invariant:
//! the upload cost for a distinct original URL is paid at most once,
//! globally, no matter how many documents reference it or how many runs
//! occur. References already pointing at one of our store repos are skipped
//! before the ledger is even consulted.

use crate::ledger::Ledger;
use crate::models::{RehostDecision, ResourceRef};

/// Decide what to do with one reference: skip it, reuse an existing
/// mapping, or fetch-and-upload.
pub fn decide(reference: &ResourceRef, ledger: &Ledger, store_repos: &[String]) -> RehostDecision {
    if is_store_url(&reference.url, store_repos) {
        return RehostDecision::Skip;
    }
    if let Some(mapping) = ledger.mapping(&reference.url) {
        return RehostDecision::AlreadyMapped(mapping.new_url.clone());
    }
    RehostDecision::NeedsUpload
}

/// Whether `url` already points at any configured store repo, either via
/// the raw content host or the repo page itself.
pub fn is_store_url(url: &str, store_repos: &[String]) -> bool {
    store_repos.iter().any(|repo| {
        url.contains(&format!("raw.githubusercontent.com/{}", repo))
            || url.contains(&format!("github.com/{}", repo))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RefKind;

    fn reference(url: &str) -> ResourceRef {
        ResourceRef {
            span: 0..url.len(),
            url: url.to_string(),
            kind: RefKind::Markdown,
        }
    }

    fn stores() -> Vec<String> {
        vec!["alice/picbed-01".to_string(), "alice/picbed-02".to_string()]
    }

    #[test]
    fn test_store_url_skipped() {
        let ledger = Ledger::default();
        let r = reference("https://raw.githubusercontent.com/alice/picbed-02/main/x/y.png");
        assert_eq!(decide(&r, &ledger, &stores()), RehostDecision::Skip);
    }

    #[test]
    fn test_mapped_url_resolves_without_upload() {
        let mut ledger = Ledger::default();
        ledger.record_mapping(
            "http://ext.test/img1.png",
            "https://raw.githubusercontent.com/alice/picbed-01/main/a/img1_cafe0123.png",
            "alice/picbed-01",
        );
        let r = reference("http://ext.test/img1.png");
        assert_eq!(
            decide(&r, &ledger, &stores()),
            RehostDecision::AlreadyMapped(
                "https://raw.githubusercontent.com/alice/picbed-01/main/a/img1_cafe0123.png"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_unknown_url_needs_upload() {
        let ledger = Ledger::default();
        let r = reference("http://ext.test/new.png");
        assert_eq!(decide(&r, &ledger, &stores()), RehostDecision::NeedsUpload);
    }

    #[test]
    fn test_unrelated_github_url_not_skipped() {
        let r = reference("https://raw.githubusercontent.com/bob/other-repo/main/z.png");
        assert!(!is_store_url(&r.url, &stores()));
    }
}
