//! Remote store client.
//!
//! Uploads image bytes to a GitHub "image bed" repository through the
//! contents API and reports aggregate repo usage for the capacity gate.
//! The store registry itself (ordered repo list + active pointer) lives in
//! the config; this module owns the wire interaction and naming rules.
//!
//! Upload semantics are create-file-at-path: a PUT to
//! `/repos/{repo}/contents/{path}`. If the path already exists the API
//! answers 422, in which case the blob SHA is fetched and the PUT retried
//! as an update. Collisions are avoided up front by appending a random
//! suffix to every generated name.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use uuid::Uuid;

use crate::config::{LimitsConfig, StoresConfig};
use crate::retry::attempt;

const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_RAW_BASE: &str = "https://raw.githubusercontent.com";

/// Maximum length of a sanitized base name before the random suffix.
const MAX_BASE_NAME: usize = 50;

/// Capacity classification of a store repo against the configured
/// watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark {
    /// Below the low watermark; proceed silently.
    Ok,
    /// Between low and high; warn but proceed.
    NearFull,
    /// At or above the high watermark; refuse further uploads unless
    /// explicitly overridden.
    Full,
}

/// Classify a repo's usage in bytes against the configured watermarks.
pub fn classify_usage(usage_bytes: u64, limits: &LimitsConfig) -> Watermark {
    if usage_bytes >= limits.full_bytes {
        Watermark::Full
    } else if usage_bytes >= limits.warn_bytes {
        Watermark::NearFull
    } else {
        Watermark::Ok
    }
}

/// Authenticated client for the store's contents API.
pub struct StoreClient {
    client: reqwest::Client,
    token: String,
    api_base: String,
    raw_base: String,
}

impl StoreClient {
    /// Build a client with the token read from the env var named in the
    /// store config, honoring any endpoint overrides from the config.
    pub fn from_env(stores: &StoresConfig) -> Result<Self> {
        let token = std::env::var(&stores.token_env)
            .with_context(|| format!("{} is not set", stores.token_env))?;
        Ok(Self::with_base(
            token,
            stores
                .api_base
                .clone()
                .unwrap_or_else(|| GITHUB_API_BASE.to_string()),
            stores
                .raw_base
                .clone()
                .unwrap_or_else(|| GITHUB_RAW_BASE.to_string()),
        ))
    }

    pub fn new(token: String) -> Self {
        Self::with_base(
            token,
            GITHUB_API_BASE.to_string(),
            GITHUB_RAW_BASE.to_string(),
        )
    }

    /// Client pointed at explicit API and raw-content endpoints, for
    /// self-hosted instances and tests.
    pub fn with_base(token: String, api_base: String, raw_base: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .user_agent("picsync")
                .build()
                .expect("default reqwest client"),
            token,
            api_base,
            raw_base,
        }
    }

    /// Current size of `repo` in bytes.
    ///
    /// The API reports size in kilobytes; this is advisory data for the
    /// capacity gate, the remote's own enforcement stays authoritative.
    pub async fn repo_usage(&self, repo: &str) -> Result<u64> {
        let url = format!("{}/repos/{}", self.api_base, repo);
        let resp = self
            .client
            .get(&url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("Failed to query {}", repo))?;
        let body: serde_json::Value = resp.json().await?;
        let size_kb = body
            .get("size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("Repo response for {} has no size field", repo))?;
        Ok(size_kb * 1024)
    }

    /// Upload `bytes` to `dest_path` inside `repo` on `branch`, returning
    /// the permanent raw URL. Retries per the configured limits.
    pub async fn upload(
        &self,
        repo: &str,
        branch: &str,
        dest_path: &str,
        bytes: &[u8],
        limits: &LimitsConfig,
    ) -> Result<String> {
        let content_b64 = BASE64.encode(bytes);
        let delay = Duration::from_millis(limits.retry_delay_ms);
        let what = format!("upload {}/{}", repo, dest_path);

        attempt(&what, limits.max_attempts, delay, || {
            self.put_contents(repo, branch, dest_path, &content_b64)
        })
        .await
    }

    async fn put_contents(
        &self,
        repo: &str,
        branch: &str,
        dest_path: &str,
        content_b64: &str,
    ) -> Result<String> {
        let url = format!("{}/repos/{}/contents/{}", self.api_base, repo, dest_path);
        let mut body = serde_json::json!({
            "message": format!("Upload image: {}", dest_path),
            "content": content_b64,
            "branch": branch,
        });

        let resp = self.send_put(&url, &body).await?;

        match resp.status().as_u16() {
            200 | 201 => Ok(self.raw_url(repo, branch, dest_path)),
            // Path already exists: fetch its blob SHA and update in place.
            422 => {
                let sha = self.existing_sha(&url, branch).await?;
                body["sha"] = serde_json::Value::String(sha);
                let resp = self.send_put(&url, &body).await?;
                if resp.status().is_success() {
                    Ok(self.raw_url(repo, branch, dest_path))
                } else {
                    Err(anyhow!(
                        "Update of existing path {} rejected: HTTP {}",
                        dest_path,
                        resp.status()
                    ))
                }
            }
            status => {
                let text = resp.text().await.unwrap_or_default();
                Err(anyhow!(
                    "Upload rejected: HTTP {} — {}",
                    status,
                    text.chars().take(200).collect::<String>()
                ))
            }
        }
    }

    async fn send_put(&self, url: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .put(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .json(body)
            .send()
            .await?)
    }

    async fn existing_sha(&self, contents_url: &str, branch: &str) -> Result<String> {
        let resp = self
            .client
            .get(contents_url)
            .query(&[("ref", branch)])
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = resp.json().await?;
        body.get("sha")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Contents response has no sha field"))
    }

    fn raw_url(&self, repo: &str, branch: &str, dest_path: &str) -> String {
        format!("{}/{}/{}/{}", self.raw_base, repo, branch, dest_path)
    }
}

/// Derive a collision-resistant upload name from the resource's original
/// base name: sanitize to `[A-Za-z0-9_-]`, truncate, and append a random
/// 8-hex suffix so repeated or sanitized-to-identical names never collide.
pub fn unique_filename(original_name: &str, ext: &str) -> String {
    let name = original_name.rsplit('/').next().unwrap_or(original_name);
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    };

    let mut clean: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if clean.is_empty() {
        clean.push_str("image");
    }
    clean.truncate(MAX_BASE_NAME);

    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}{}", clean, &suffix[..8], ext)
}

/// Destination folder for a document's resources, derived from the
/// document's own stem so one document's uploads group together.
/// Unicode letters survive; other punctuation becomes `_`.
pub fn folder_for_document(doc_path: &Path) -> String {
    let stem = doc_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "doc".to_string());
    let clean: String = stem
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if clean.is_empty() {
        "doc".to_string()
    } else {
        clean
    }
}

/// Base name of the resource as referenced, for naming the upload.
pub fn original_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        "image".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_watermark_classification() {
        let limits = LimitsConfig {
            warn_bytes: 800,
            full_bytes: 1000,
            ..Default::default()
        };
        assert_eq!(classify_usage(0, &limits), Watermark::Ok);
        assert_eq!(classify_usage(799, &limits), Watermark::Ok);
        assert_eq!(classify_usage(800, &limits), Watermark::NearFull);
        assert_eq!(classify_usage(1000, &limits), Watermark::Full);
        assert_eq!(classify_usage(5000, &limits), Watermark::Full);
    }

    #[test]
    fn test_unique_filename_sanitizes() {
        let name = unique_filename("my photo (1).png", ".png");
        assert!(name.starts_with("my_photo__1_"));
        assert!(name.ends_with(".png"));
        // stem + '_' + 8 hex + ext
        assert_eq!(name.len(), "my_photo__1_".len() + 1 + 8 + 4);
    }

    #[test]
    fn test_unique_filename_truncates_long_names() {
        let long = "x".repeat(200);
        let name = unique_filename(&long, ".jpg");
        assert!(name.len() <= MAX_BASE_NAME + 1 + 8 + 4);
    }

    #[test]
    fn test_unique_filename_never_collides_on_identical_input() {
        let a = unique_filename("pic.png", ".png");
        let b = unique_filename("pic.png", ".png");
        assert_ne!(a, b);
    }

    #[test]
    fn test_unique_filename_empty_stem() {
        let name = unique_filename("....", ".png");
        assert!(name.ends_with(".png"));
        assert!(!name.starts_with('_') || name.len() > 5);
    }

    #[test]
    fn test_folder_for_document_keeps_unicode() {
        assert_eq!(
            folder_for_document(&PathBuf::from("notes/讀書筆記 2024.md")),
            "讀書筆記_2024"
        );
        assert_eq!(folder_for_document(&PathBuf::from("a/b/Weekly Log.md")), "Weekly_Log");
    }

    #[test]
    fn test_original_name_from_url() {
        assert_eq!(
            original_name_from_url("http://ext.test/a/b/photo.png?x=1"),
            "photo.png"
        );
        assert_eq!(original_name_from_url("http://ext.test/"), "image");
    }
}
