//! Domain logic for the FragDenStaat site integration layer.
//!
//! Everything in this crate is free of database access so it can be shared
//! by the repository layer, the pipelines and the worker binary:
//!
//! - [`picture`]: responsive `<picture>` descriptors for stored images.
//! - [`region`]: administrative keys, region kinds, boundary features and
//!   materialized tree paths.
//! - [`retention`]: legal retention archive naming and expiry rules.
//! - [`osm`]: OSM boundary tag classification and amenity filter arguments.
//! - [`tooling`]: subprocess execution with timeouts for external tools.

pub mod error;
pub mod osm;
pub mod picture;
pub mod region;
pub mod retention;
pub mod slug;
pub mod tooling;
pub mod types;
