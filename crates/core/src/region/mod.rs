//! Administrative regions.
//!
//! Pure building blocks for the region ingestion pipeline: key handling
//! ([`ars`]), region kinds ([`kind`]), dataset features ([`feature`]) and
//! the materialized-path tree ([`tree`]).

pub mod ars;
pub mod feature;
pub mod kind;
pub mod tree;

pub use ars::{pad_ars, parent_keys, ARS_LENGTH};
pub use feature::{BoundaryFeature, LayerSpec, GOV_SEAT_LAYER, LAYERS};
pub use kind::RegionKind;
