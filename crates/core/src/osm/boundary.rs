//! Classification of OSM administrative boundaries.

use std::collections::BTreeMap;

use crate::region::ars::{ags_to_ars, is_state_key, pad_ars, ARS_LENGTH};
use crate::region::RegionKind;

/// Tags of an OSM object.
pub type OsmTags = BTreeMap<String, String>;

pub const REGION_KEY_TAG: &str = "de:regionalschluessel";
pub const AGS_TAG: &str = "de:amtlicher_gemeindeschlüssel";
pub const ADMIN_LEVEL_TAG: &str = "admin_level";
pub const NAME_TAG: &str = "name";

/// OSM admin level of German states.
pub const STATE_ADMIN_LEVEL: i32 = 4;

/// From this admin level on, unkeyed boundaries are city boroughs.
pub const BOROUGH_ADMIN_LEVEL: i32 = 9;

/// How a boundary maps onto the region table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundaryQuery {
    /// Existing region with this padded identifier.
    RegionKey {
        region_identifier: String,
        admin_level: i32,
    },
    /// Borough identified by name only.
    Borough { name: String, admin_level: i32 },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoundaryTagError {
    #[error("boundary at admin level {admin_level} carries state key {region_identifier}")]
    StateKeyAtLowerLevel {
        admin_level: i32,
        region_identifier: String,
    },
}

/// Padded region identifier from a boundary's tags.
///
/// `de:regionalschluessel` wins; otherwise the AGS is converted. Values
/// that are not plain digit strings are ignored.
pub fn get_region_key(tags: &OsmTags) -> Option<String> {
    if let Some(key) = tags.get(REGION_KEY_TAG).map(|v| v.trim()) {
        if is_digits(key) && key.len() <= ARS_LENGTH {
            return Some(pad_ars(key));
        }
    }
    tags.get(AGS_TAG).and_then(|ags| ags_to_ars(ags))
}

/// Decide what a boundary relation refers to.
///
/// Returns `Ok(None)` for boundaries that are skipped: unparseable admin
/// level, or neither key nor (at borough level) a name.
pub fn classify_boundary(tags: &OsmTags) -> Result<Option<BoundaryQuery>, BoundaryTagError> {
    let Some(admin_level) = tags
        .get(ADMIN_LEVEL_TAG)
        .and_then(|level| level.trim().parse::<i32>().ok())
    else {
        return Ok(None);
    };

    if let Some(region_identifier) = get_region_key(tags) {
        if admin_level > STATE_ADMIN_LEVEL && is_state_key(&region_identifier) {
            return Err(BoundaryTagError::StateKeyAtLowerLevel {
                admin_level,
                region_identifier,
            });
        }
        return Ok(Some(BoundaryQuery::RegionKey {
            region_identifier,
            admin_level,
        }));
    }

    if admin_level >= BOROUGH_ADMIN_LEVEL {
        if let Some(name) = tags.get(NAME_TAG).map(|n| n.trim()).filter(|n| !n.is_empty()) {
            return Ok(Some(BoundaryQuery::Borough {
                name: name.to_string(),
                admin_level,
            }));
        }
    }
    Ok(None)
}

/// Region kind German boundaries of an OSM admin level usually map to.
/// Independent cities sit at level 6 but are stored as districts too.
pub fn region_kind_for_admin_level(admin_level: i32) -> Option<RegionKind> {
    match admin_level {
        2 => Some(RegionKind::Country),
        4 => Some(RegionKind::State),
        5 => Some(RegionKind::AdminDistrict),
        6 => Some(RegionKind::District),
        7 => Some(RegionKind::AdminCooperation),
        8 => Some(RegionKind::Municipality),
        _ => None,
    }
}

fn is_digits(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
