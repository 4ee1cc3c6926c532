//! WebDAV archive storage.

use std::time::Duration;

use async_trait::async_trait;
use fds_core::retention::percent_encode_segment;
use reqwest::{Method, StatusCode, Url};

use crate::multistatus::response_hrefs;

/// Default per-request timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// `PROPFIND` body asking for the resource type only.
const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:"><d:prop><d:resourcetype/></d:prop></d:propfind>"#;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum WebDavError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{method} {url} returned HTTP {status}")]
    HttpStatus {
        method: String,
        url: String,
        status: u16,
    },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

// ---------------------------------------------------------------------------
// WebDavConfig
// ---------------------------------------------------------------------------

/// Location and credentials of the archive share.
#[derive(Clone)]
pub struct WebDavConfig {
    /// Collection all archive folders are created in.
    pub root_url: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for WebDavConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebDavConfig")
            .field("root_url", &self.root_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl WebDavConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` when the share is not configured.
    ///
    /// | Variable                       | Required | Default |
    /// |--------------------------------|----------|---------|
    /// | `FDS_LEGAL_BACKUP_URL`         | yes      | -       |
    /// | `FDS_LEGAL_BACKUP_CREDENTIALS` | yes      | -       |
    /// | `WEBDAV_TIMEOUT_SECS`          | no       | `60`    |
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("FDS_LEGAL_BACKUP_URL").ok()?;
        let credentials = std::env::var("FDS_LEGAL_BACKUP_CREDENTIALS").ok()?;
        let timeout = std::env::var("WEBDAV_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self::from_parts(&url, &credentials, Duration::from_secs(timeout))
    }

    /// Build from a root URL and `user:pass` credentials. Blank values are
    /// treated as unset.
    pub fn from_parts(root_url: &str, credentials: &str, timeout: Duration) -> Option<Self> {
        let root_url = root_url.trim();
        if root_url.is_empty() {
            return None;
        }
        let Some((username, password)) = credentials.trim().split_once(':') else {
            tracing::warn!("FDS_LEGAL_BACKUP_CREDENTIALS must have the form user:pass");
            return None;
        };
        if username.is_empty() {
            return None;
        }
        Some(Self {
            root_url: root_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            timeout,
        })
    }
}

// ---------------------------------------------------------------------------
// ArchiveStorage
// ---------------------------------------------------------------------------

/// Remote folder storage for retention archives.
#[async_trait]
pub trait ArchiveStorage: Send + Sync {
    /// Create a folder below the root. An existing folder is not an error.
    async fn create_folder(&self, name: &str) -> Result<(), WebDavError>;

    /// Store `content` as `folder/file_name`.
    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), WebDavError>;

    /// `href`s of the root's direct members, excluding the root itself.
    async fn list_entries(&self) -> Result<Vec<String>, WebDavError>;

    /// Delete the member at `href` (absolute URL or absolute path).
    async fn delete_entry(&self, href: &str) -> Result<(), WebDavError>;
}

// ---------------------------------------------------------------------------
// WebDavClient
// ---------------------------------------------------------------------------

/// [`ArchiveStorage`] over a WebDAV share with basic auth.
pub struct WebDavClient {
    client: reqwest::Client,
    root: Url,
    username: String,
    password: String,
}

impl WebDavClient {
    pub fn new(config: &WebDavConfig) -> Result<Self, WebDavError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Self::with_client(client, config)
    }

    /// Reuse an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: &WebDavConfig) -> Result<Self, WebDavError> {
        let mut root = Url::parse(&config.root_url)
            .map_err(|e| WebDavError::InvalidUrl(format!("{}: {e}", config.root_url)))?;
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        Ok(Self {
            client,
            root,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    fn folder_url(&self, folder: &str) -> Result<Url, WebDavError> {
        self.join(&format!("./{}/", percent_encode_segment(folder)))
    }

    fn file_url(&self, folder: &str, file_name: &str) -> Result<Url, WebDavError> {
        self.join(&format!(
            "./{}/{}",
            percent_encode_segment(folder),
            percent_encode_segment(file_name)
        ))
    }

    fn join(&self, reference: &str) -> Result<Url, WebDavError> {
        self.root
            .join(reference)
            .map_err(|e| WebDavError::InvalidUrl(format!("{reference}: {e}")))
    }

    fn is_root(&self, url: &Url) -> bool {
        url.path().trim_end_matches('/') == self.root.path().trim_end_matches('/')
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// Fail on any status outside 2xx.
    fn check_status(response: &reqwest::Response, method: &Method) -> Result<(), WebDavError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(WebDavError::HttpStatus {
            method: method.to_string(),
            url: response.url().to_string(),
            status: response.status().as_u16(),
        })
    }
}

fn webdav_method(name: &'static str) -> Result<Method, WebDavError> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| WebDavError::InvalidUrl(format!("method {name}: {e}")))
}

#[async_trait]
impl ArchiveStorage for WebDavClient {
    async fn create_folder(&self, name: &str) -> Result<(), WebDavError> {
        let method = webdav_method("MKCOL")?;
        let url = self.folder_url(name)?;
        let response = self.request(method.clone(), url).send().await?;
        if response.status() == StatusCode::METHOD_NOT_ALLOWED {
            tracing::info!(folder = %name, "Archive folder already exists");
            return Ok(());
        }
        Self::check_status(&response, &method)
    }

    async fn upload(
        &self,
        folder: &str,
        file_name: &str,
        content: Vec<u8>,
        content_type: &str,
    ) -> Result<(), WebDavError> {
        let url = self.file_url(folder, file_name)?;
        let size = content.len();
        let response = self
            .request(Method::PUT, url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(content)
            .send()
            .await?;
        Self::check_status(&response, &Method::PUT)?;
        tracing::debug!(folder, file_name, size, "Uploaded archive file");
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<String>, WebDavError> {
        let method = webdav_method("PROPFIND")?;
        let response = self
            .request(method.clone(), self.root.clone())
            .header("Depth", "1")
            .header(reqwest::header::CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(PROPFIND_BODY)
            .send()
            .await?;
        Self::check_status(&response, &method)?;
        let body = response.text().await?;

        Ok(response_hrefs(&body)
            .into_iter()
            .filter(|href| match self.root.join(href) {
                Ok(url) => !self.is_root(&url),
                Err(_) => false,
            })
            .collect())
    }

    async fn delete_entry(&self, href: &str) -> Result<(), WebDavError> {
        let url = self.join(href)?;
        if self.is_root(&url) {
            return Err(WebDavError::InvalidUrl(format!("refusing to delete the root {url}")));
        }
        let response = self.request(Method::DELETE, url).send().await?;
        Self::check_status(&response, &Method::DELETE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
