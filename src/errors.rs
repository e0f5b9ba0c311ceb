//! Per-resource error kinds.
//!
//! These are the failures the orchestrator catches at the resource boundary:
//! the reference is left unrewritten, a warning is logged, and the rest of
//! the document continues. Document- and run-level failures (unreadable
//! files, backup write failures, a corrupt ledger) stay as `anyhow` errors
//! at their respective boundaries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResourceError {
    /// Resource unreachable or unreadable after all retry attempts.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// Fetched resource exceeds the configured size limit.
    #[error("resource too large ({size} bytes, limit {limit}): {url}")]
    TooLarge { url: String, size: u64, limit: u64 },

    /// Local resource has an extension we do not recognize as an image.
    #[error("unsupported image type '{ext}': {url}")]
    UnsupportedType { url: String, ext: String },

    /// Remote store rejected or was unreachable after all retry attempts.
    #[error("failed to upload {url}: {source}")]
    Upload {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}
