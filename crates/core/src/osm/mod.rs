//! OpenStreetMap helpers for the amenity refresh.
//!
//! - [`boundary`]: mapping of OSM boundary tags to region lookups.
//! - [`filter`]: amenity topic configuration and the `osmconvert` /
//!   `osmosis` command lines built from it.

pub mod boundary;
pub mod filter;

pub use boundary::{
    classify_boundary, get_region_key, region_kind_for_admin_level, BoundaryQuery, BoundaryTagError, OsmTags,
};
pub use filter::{osmconvert_args, osmosis_args, AmenityTopics, TagFilter, TopicTag};
