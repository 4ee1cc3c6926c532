//! Remote I/O for the pipelines.
//!
//! - [`webdav`]: archive storage on a WebDAV share (`MKCOL`, `PUT`,
//!   `PROPFIND`, `DELETE` under basic auth).
//! - [`multistatus`]: the bits of `207 Multi-Status` bodies we read.
//! - [`download`]: streaming HTTP downloads to local files.
//!
//! Each client owns its `reqwest::Client`; callers construct one per job
//! and pass it down.

pub mod download;
pub mod multistatus;
pub mod webdav;

pub use download::{DownloadError, Downloader, HttpDownloader};
pub use webdav::{ArchiveStorage, WebDavClient, WebDavConfig, WebDavError};
