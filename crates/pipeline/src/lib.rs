//! Job orchestration for the FragDenStaat integration layer.
//!
//! - [`georegion`]: administrative boundary ingestion into the region tree.
//! - [`legal_backup`]: retention archives of closed accounts.
//! - [`osm_refresh`]: OSM extract download, filtering and amenity import.
//!
//! Every job talks to the outside world through collaborator traits; the
//! Postgres-, WebDAV- and command-backed implementations live next to the
//! traits and are wired up by the worker.

pub mod georegion;
pub mod legal_backup;
pub mod osm_refresh;
