//! HTTP retrieval behind a mockable client trait, plus the on-disk sprite
//! cache.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, SpriteError};
use crate::ids;
use crate::output::write_atomic;

/// Minimal HTTP surface so retrieval can be mocked in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Real client backed by `reqwest`.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(30)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| SpriteError::Retrieval(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| SpriteError::Retrieval(format!("request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(SpriteError::Retrieval(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| SpriteError::Retrieval(format!("failed to read response: {e}")))
    }
}

/// IIIF image request for an aspect-preserving resize to `width` pixels.
pub fn sprite_url(image_id: &str, width: u32) -> String {
    format!("{image_id}/full/{width},/0/default.jpg")
}

/// Fetches sprite rasters through an on-disk cache.
///
/// The cache directory is already scoped to one annotation and resolution
/// variant by the caller; files inside it are keyed by the image's derived
/// identifier. A cache hit never touches the network. Cache writes go
/// through a temp-file rename, so a racing reader sees either nothing or the
/// complete file.
pub struct ImageFetcher<'a> {
    client: &'a dyn HttpClient,
    cache_dir: PathBuf,
}

impl<'a> ImageFetcher<'a> {
    pub fn new(client: &'a dyn HttpClient, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn fetch_sprite(&self, image_id: &str, width: u32) -> Result<Vec<u8>> {
        let cache_file = self
            .cache_dir
            .join(format!("{}.jpg", ids::generate_id(image_id)));
        if cache_file.exists() {
            debug!(image = image_id, "sprite cache hit");
            return Ok(fs::read(&cache_file)?);
        }
        let url = sprite_url(image_id, width);
        info!(%url, "downloading image");
        let bytes = self.client.get(&url)?;
        fs::create_dir_all(&self.cache_dir)?;
        write_atomic(&cache_file, &bytes)?;
        Ok(bytes)
    }
}
