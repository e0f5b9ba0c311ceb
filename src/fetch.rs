//! Resource retrieval.
//!
//! Two retrieval paths behind one contract: network fetch for absolute
//! URLs and a filesystem read (resolved against the referencing document's
//! directory) for relative paths. Both go through the shared bounded-retry
//! helper, and both enforce the configured size limit before the resource
//! ever reaches the uploader.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::LimitsConfig;
use crate::errors::ResourceError;
use crate::models::ResourceRef;
use crate::retry::attempt;

/// Extensions accepted for local image files.
const IMAGE_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".ico",
];

/// Resource bytes plus the file extension to upload under.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub ext: String,
}

/// Build the HTTP client used for resource downloads.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .build()
        .context("Failed to build HTTP client")
}

/// Retrieve a resource's bytes, from the network or from local disk.
///
/// `doc_path` is the referencing document; relative references resolve
/// against its parent directory.
pub async fn fetch_resource(
    client: &reqwest::Client,
    reference: &ResourceRef,
    doc_path: &Path,
    limits: &LimitsConfig,
) -> Result<Fetched, ResourceError> {
    if reference.is_local() {
        fetch_local(reference, doc_path, limits).await
    } else {
        fetch_remote(client, reference, limits).await
    }
}

async fn fetch_remote(
    client: &reqwest::Client,
    reference: &ResourceRef,
    limits: &LimitsConfig,
) -> Result<Fetched, ResourceError> {
    let url = reference.url.clone();
    let delay = Duration::from_millis(limits.retry_delay_ms);

    let what = format!("download {}", url);
    let (bytes, content_type) = attempt(&what, limits.max_attempts, delay, || {
        let client = client.clone();
        let url = url.clone();
        async move {
            let resp = client.get(&url).send().await?.error_for_status()?;
            let content_type = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string());
            let bytes = resp.bytes().await?.to_vec();
            Ok((bytes, content_type))
        }
    })
    .await
    .map_err(|source| ResourceError::Fetch {
        url: url.clone(),
        source,
    })?;

    if bytes.len() as u64 > limits.max_resource_bytes {
        return Err(ResourceError::TooLarge {
            url,
            size: bytes.len() as u64,
            limit: limits.max_resource_bytes,
        });
    }

    let ext = extension_from_url(&reference.url)
        .or_else(|| content_type.as_deref().and_then(extension_from_content_type))
        .unwrap_or_else(|| ".png".to_string());

    Ok(Fetched { bytes, ext })
}

async fn fetch_local(
    reference: &ResourceRef,
    doc_path: &Path,
    limits: &LimitsConfig,
) -> Result<Fetched, ResourceError> {
    let base = doc_path.parent().unwrap_or_else(|| Path::new("."));
    let full_path = base.join(&reference.url);

    let ext = full_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ResourceError::UnsupportedType {
            url: reference.url.clone(),
            ext,
        });
    }

    let what = format!("read {}", full_path.display());
    let delay = Duration::from_millis(limits.retry_delay_ms);
    let bytes = attempt(&what, limits.max_attempts, delay, || {
        let full_path = full_path.clone();
        async move {
            tokio::fs::read(&full_path)
                .await
                .with_context(|| format!("Failed to read {}", full_path.display()))
        }
    })
    .await
    .map_err(|source| ResourceError::Fetch {
        url: reference.url.clone(),
        source,
    })?;

    if bytes.len() as u64 > limits.max_resource_bytes {
        return Err(ResourceError::TooLarge {
            url: reference.url.clone(),
            size: bytes.len() as u64,
            limit: limits.max_resource_bytes,
        });
    }

    Ok(Fetched { bytes, ext })
}

/// Extension from the URL path, ignoring query and fragment. Only known
/// image extensions are accepted.
fn extension_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next()?;
    let dot = name.rfind('.')?;
    let ext = name[dot..].to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Map a Content-Type header to an extension, dropping any parameters.
fn extension_from_content_type(content_type: &str) -> Option<String> {
    let ct = content_type.split(';').next()?.trim().to_lowercase();
    let ext = match ct.as_str() {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/bmp" => ".bmp",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        _ => return None,
    };
    Some(ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RefKind;

    fn local_ref(url: &str) -> ResourceRef {
        ResourceRef {
            span: 0..url.len(),
            url: url.to_string(),
            kind: RefKind::LocalPath,
        }
    }

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("http://ext.test/a/b/photo.JPG?size=big"),
            Some(".jpg".to_string())
        );
        assert_eq!(extension_from_url("http://ext.test/no-extension"), None);
        assert_eq!(extension_from_url("http://ext.test/archive.zip"), None);
    }

    #[test]
    fn test_extension_from_content_type() {
        assert_eq!(
            extension_from_content_type("image/png; charset=binary"),
            Some(".png".to_string())
        );
        assert_eq!(extension_from_content_type("text/html"), None);
    }

    #[tokio::test]
    async fn test_local_read_relative_to_document() {
        let tmp = tempfile::tempdir().unwrap();
        let notes = tmp.path().join("notes");
        std::fs::create_dir_all(notes.join("img")).unwrap();
        std::fs::write(notes.join("img/pic.png"), b"pngbytes").unwrap();

        let doc = notes.join("a.md");
        let limits = LimitsConfig::default();
        let fetched = fetch_resource(
            &http_client().unwrap(),
            &local_ref("./img/pic.png"),
            &doc,
            &limits,
        )
        .await
        .unwrap();
        assert_eq!(fetched.bytes, b"pngbytes");
        assert_eq!(fetched.ext, ".png");
    }

    #[tokio::test]
    async fn test_local_missing_file_is_fetch_error() {
        let tmp = tempfile::tempdir().unwrap();
        let doc = tmp.path().join("a.md");
        let limits = LimitsConfig {
            max_attempts: 1,
            retry_delay_ms: 0,
            ..Default::default()
        };
        let err = fetch_resource(&http_client().unwrap(), &local_ref("gone.png"), &doc, &limits)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::Fetch { .. }));
    }

    #[tokio::test]
    async fn test_local_unsupported_extension() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("doc.pdf"), b"%PDF").unwrap();
        let doc = tmp.path().join("a.md");
        let limits = LimitsConfig::default();
        let err = fetch_resource(&http_client().unwrap(), &local_ref("doc.pdf"), &doc, &limits)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::UnsupportedType { .. }));
    }

    #[tokio::test]
    async fn test_local_size_guard() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("big.png"), vec![0u8; 64]).unwrap();
        let doc = tmp.path().join("a.md");
        let limits = LimitsConfig {
            max_resource_bytes: 16,
            ..Default::default()
        };
        let err = fetch_resource(&http_client().unwrap(), &local_ref("big.png"), &doc, &limits)
            .await
            .unwrap_err();
        assert!(matches!(err, ResourceError::TooLarge { size: 64, .. }));
    }
}
