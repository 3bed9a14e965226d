//! Temporary binary payload handles and the fetcher collaborator.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use url::Url;

/// A binary payload staged in a named temporary file.
///
/// The file lives until the handle is released (or dropped), so cleanup is
/// guaranteed on every exit path of a field's processing.
#[derive(Debug)]
pub struct MediaHandle {
    file: NamedTempFile,
    file_name: String,
}

impl MediaHandle {
    /// Stages `bytes` in a fresh temp file, named after the source URL's
    /// last path segment for the benefit of the receiving chat.
    pub fn from_bytes(source_url: &str, bytes: &[u8]) -> std::io::Result<Self> {
        let mut file = NamedTempFile::new()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self {
            file,
            file_name: file_name_from_url(source_url),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Upload file name derived from the source URL.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Deletes the temp file now instead of waiting for drop.
    pub fn release(self) -> std::io::Result<()> {
        self.file.close()
    }
}

fn file_name_from_url(source_url: &str) -> String {
    Url::parse(source_url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "attachment".to_string())
}

/// Fetches a remote binary resource into a [`MediaHandle`].
///
/// Kept behind a trait so the dispatcher can be driven without network
/// access in tests.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<MediaHandle>;
}

pub struct HttpMediaFetcher {
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(timeout_secs: u64) -> Self {
        let client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");
        Self { client }
    }
}

impl Default for HttpMediaFetcher {
    fn default() -> Self {
        Self::new(180)
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaHandle> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("media request failed: {}", e))?
            .error_for_status()
            .map_err(|e| anyhow!("media HTTP error: {}", e))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| anyhow!("media body read failed: {}", e))?;

        Ok(MediaHandle::from_bytes(url, &bytes)?)
    }
}
