//! Image reference extraction.
//!
//! Scans document text for image references in two markup forms — Markdown
//! image syntax and inline HTML `<img>` tags — and classifies bare relative
//! paths found inside either. One matcher per syntactic form, results merged
//! by position so the sequence preserves first-seen order.
//!
//! This is a best-effort scanner, not a Markdown parser: malformed or
//! incomplete spans simply do not match, and the resource they point at is
//! left untouched.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{RefKind, ResourceRef};

/// `![alt](url)` with an optional `"title"` part.
static MD_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"!\[[^\]]*\]\(([^)\s]+)(?:\s+"[^"]*")?\)"#).unwrap());

/// `<img src="url" ...>` in either quote style, case-insensitive.
static HTML_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["'][^>]*>"#).unwrap());

/// Extract all image references from `text`, ordered by position.
///
/// The span on each reference covers only the URL itself, so replacements
/// can be spliced without disturbing alt text or tag attributes. `data:`
/// URIs are never reported.
pub fn extract(text: &str) -> Vec<ResourceRef> {
    let mut refs = Vec::new();

    for caps in MD_IMAGE.captures_iter(text) {
        if let Some(url) = caps.get(1) {
            push_ref(&mut refs, url.start()..url.end(), url.as_str(), false);
        }
    }

    for caps in HTML_IMAGE.captures_iter(text) {
        if let Some(url) = caps.get(1) {
            push_ref(&mut refs, url.start()..url.end(), url.as_str(), true);
        }
    }

    refs.sort_by_key(|r| r.span.start);
    refs.dedup_by_key(|r| r.span.start);
    refs
}

fn push_ref(
    refs: &mut Vec<ResourceRef>,
    span: std::ops::Range<usize>,
    url: &str,
    html: bool,
) {
    if url.starts_with("data:") {
        return;
    }

    let kind = if is_remote(url) {
        if html {
            RefKind::HtmlTag
        } else {
            RefKind::Markdown
        }
    } else {
        RefKind::LocalPath
    };

    refs.push(ResourceRef {
        span,
        url: url.to_string(),
        kind,
    });
}

/// Anything that is not an absolute http(s) URL is treated as a path
/// relative to the referencing document.
fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_image() {
        let refs = extract("intro ![logo](https://ext.test/logo.png) outro");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://ext.test/logo.png");
        assert_eq!(refs[0].kind, RefKind::Markdown);
        assert_eq!(
            &"intro ![logo](https://ext.test/logo.png) outro"[refs[0].span.clone()],
            "https://ext.test/logo.png"
        );
    }

    #[test]
    fn test_markdown_image_with_title() {
        let refs = extract(r#"![x](https://ext.test/a.png "a title")"#);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://ext.test/a.png");
    }

    #[test]
    fn test_html_tag() {
        let refs = extract(r#"<IMG class="wide" SRC='http://ext.test/b.jpg' alt="b">"#);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "http://ext.test/b.jpg");
        assert_eq!(refs[0].kind, RefKind::HtmlTag);
    }

    #[test]
    fn test_relative_path_classified_local() {
        let refs = extract("![z](./img/local.png)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].kind, RefKind::LocalPath);
        assert!(refs[0].is_local());
    }

    #[test]
    fn test_first_seen_order_across_forms() {
        let text = r#"<img src="http://ext.test/one.png"> then ![two](http://ext.test/two.png)"#;
        let refs = extract(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].url, "http://ext.test/one.png");
        assert_eq!(refs[1].url, "http://ext.test/two.png");
        assert!(refs[0].span.end <= refs[1].span.start);
    }

    #[test]
    fn test_data_uri_ignored() {
        let refs = extract("![inline](data:image/png;base64,iVBORw0)");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_malformed_markup_not_matched() {
        let refs = extract("![broken](http://ext.test/a.png\n\n<img src=>");
        assert!(refs.is_empty());
    }

    #[test]
    fn test_duplicate_url_reported_per_occurrence() {
        let text = "![x](http://ext.test/img1.png) ![y](http://ext.test/img1.png)";
        let refs = extract(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].url, refs[1].url);
        assert_ne!(refs[0].span, refs[1].span);
    }
}
