//! Download-once cache for vocabulary CSVs sourced from a URL.
//!
//! The cache is keyed by the URL's final path segment; a file already present
//! in the cache directory is reused without revalidation.
use std::path::{Path, PathBuf};

use reqwest::Client;

use crate::error::{AppError, AppResult};

/// Cache filename for `url`: its final non-empty path segment, or a fixed
/// fallback when the URL has none.
pub fn cache_key(url: &str) -> String {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("remote.csv")
        .to_string()
}

/// Fetch `url` into the cache directory unless already present, returning
/// the local path.
pub async fn fetch_cached(client: &Client, cache_dir: &Path, url: &str) -> AppResult<PathBuf> {
    let target = cache_dir.join(cache_key(url));
    if target.is_file() {
        return Ok(target);
    }

    tracing::info!("Downloading vocabulary CSV from {}", url);
    let response = client.get(url).send().await.map_err(AppError::HttpClient)?;
    if !response.status().is_success() {
        return Err(AppError::Internal(format!(
            "Failed to download CSV from {}: {}",
            url,
            response.status()
        )));
    }
    let body = response.bytes().await.map_err(AppError::HttpClient)?;

    tokio::fs::create_dir_all(cache_dir).await?;
    tokio::fs::write(&target, &body).await?;
    Ok(target)
}
