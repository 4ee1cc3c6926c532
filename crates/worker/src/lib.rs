//! Job entry points of the FragDenStaat integration worker.
//!
//! Each job wires the production collaborators (Postgres stores, WebDAV,
//! `ProcessRunner`) into a pipeline and runs it once. Scheduling and
//! retries belong to whoever invokes the binary.

pub mod config;
pub mod jobs;
