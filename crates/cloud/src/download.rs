//! Streaming HTTP downloads.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Connection setup timeout. The transfer itself is unbounded: national
/// extracts are several gigabytes.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Download of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches a URL into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `destination`, returning the number of bytes written.
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError>;
}

/// [`Downloader`] streaming the response body chunk by chunk.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> Result<u64, DownloadError> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DownloadError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::info!(url, path = %destination.display(), bytes = written, "Download finished");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_does_not_fail() {
        assert!(HttpDownloader::new().is_ok());
    }

    #[test]
    fn display_http_status() {
        let err = DownloadError::HttpStatus {
            url: "https://download.example.org/x.pbf".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "Download of https://download.example.org/x.pbf returned HTTP 404"
        );
    }
}
