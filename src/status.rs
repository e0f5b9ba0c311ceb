//! Per-store capacity report.

use anyhow::Result;

use crate::config::Config;
use crate::store::{classify_usage, StoreClient, Watermark};

/// Print each configured store's usage against the watermarks, marking the
/// active one.
pub async fn run_status(config: &Config) -> Result<()> {
    let client = StoreClient::from_env(&config.stores)?;

    println!(
        "{:<4} {:<32} {:>12} {:>8}  STATUS",
        "IDX", "STORE", "USED", "PCT"
    );

    for (i, repo) in config.stores.repos.iter().enumerate() {
        let marker = if i == config.stores.active {
            "  <- active"
        } else {
            ""
        };

        match client.repo_usage(repo).await {
            Ok(usage) => {
                let pct = usage as f64 / config.limits.full_bytes as f64 * 100.0;
                let status = match classify_usage(usage, &config.limits) {
                    Watermark::Ok => "ok",
                    Watermark::NearFull => "NEAR FULL",
                    Watermark::Full => "FULL",
                };
                println!(
                    "{:<4} {:<32} {:>12} {:>7.1}%  {}{}",
                    i,
                    repo,
                    format_size(usage),
                    pct,
                    status,
                    marker
                );
            }
            Err(e) => {
                println!("{:<4} {:<32} {:>12} {:>8}  unavailable ({}){}", i, repo, "-", "-", e, marker);
            }
        }
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    let mb = bytes as f64 / 1024.0 / 1024.0;
    if mb >= 1024.0 {
        format!("{:.2} GB", mb / 1024.0)
    } else {
        format!("{:.1} MB", mb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512 * 1024 * 1024), "512.0 MB");
        assert_eq!(format_size(2 * 1024 * 1024 * 1024), "2.00 GB");
    }
}
