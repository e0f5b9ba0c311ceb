use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub stores: StoresConfig,
    pub scan: ScanConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Remote store registry: an ordered list of GitHub repos with an
/// active-index pointer. New uploads always target the active repo.
#[derive(Debug, Deserialize, Clone)]
pub struct StoresConfig {
    /// Repos in `owner/name` form.
    pub repos: Vec<String>,
    #[serde(default)]
    pub active: usize,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Name of the environment variable holding the API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Override the store API endpoint (self-hosted or test instances).
    #[serde(default)]
    pub api_base: Option<String>,
    /// Override the raw-content host used for rewritten URLs.
    #[serde(default)]
    pub raw_base: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}
fn default_token_env() -> String {
    "PICSYNC_TOKEN".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    /// Directories scanned recursively for documents.
    pub folders: Vec<PathBuf>,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    /// Write a `.bak` copy of each document before rewriting it.
    #[serde(default)]
    pub backup: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct LedgerConfig {
    #[serde(default = "default_ledger_path")]
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: default_ledger_path(),
        }
    }
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from(".picsync_ledger.json")
}

#[derive(Debug, Deserialize, Clone)]
pub struct LimitsConfig {
    /// Resources larger than this are skipped with a warning.
    #[serde(default = "default_max_resource_bytes")]
    pub max_resource_bytes: u64,
    /// Active-store usage above this emits a warning.
    #[serde(default = "default_warn_bytes")]
    pub warn_bytes: u64,
    /// Active-store usage at or above this refuses new uploads.
    #[serde(default = "default_full_bytes")]
    pub full_bytes: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_resource_bytes: default_max_resource_bytes(),
            warn_bytes: default_warn_bytes(),
            full_bytes: default_full_bytes(),
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_max_resource_bytes() -> u64 {
    25 * 1024 * 1024
}
fn default_warn_bytes() -> u64 {
    800 * 1024 * 1024
}
fn default_full_bytes() -> u64 {
    1024 * 1024 * 1024
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}

impl StoresConfig {
    /// Repo uploads currently target.
    pub fn active_repo(&self) -> &str {
        &self.repos[self.active]
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate stores
    if config.stores.repos.is_empty() {
        anyhow::bail!("stores.repos must list at least one repository");
    }
    if config.stores.active >= config.stores.repos.len() {
        anyhow::bail!(
            "stores.active ({}) is out of range for {} configured repos",
            config.stores.active,
            config.stores.repos.len()
        );
    }
    for repo in &config.stores.repos {
        if repo.split('/').count() != 2 {
            anyhow::bail!("stores.repos entry '{}' must be in owner/name form", repo);
        }
    }

    // Validate scan roots
    if config.scan.folders.is_empty() {
        anyhow::bail!("scan.folders must list at least one directory");
    }

    // Validate limits
    if config.limits.warn_bytes > config.limits.full_bytes {
        anyhow::bail!("limits.warn_bytes must not exceed limits.full_bytes");
    }
    if config.limits.max_attempts == 0 {
        anyhow::bail!("limits.max_attempts must be >= 1");
    }

    Ok(config)
}
