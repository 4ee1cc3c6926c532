//! Region kinds and their hierarchy levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Kind of an administrative region, stored in the `kind` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Country,
    State,
    AdminDistrict,
    District,
    AdminCooperation,
    Municipality,
    Borough,
    Zipcode,
}

impl RegionKind {
    pub const ALL: [RegionKind; 8] = [
        Self::Country,
        Self::State,
        Self::AdminDistrict,
        Self::District,
        Self::AdminCooperation,
        Self::Municipality,
        Self::Borough,
        Self::Zipcode,
    ];

    /// Database `kind` value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Country => "country",
            Self::State => "state",
            Self::AdminDistrict => "admin_district",
            Self::District => "district",
            Self::AdminCooperation => "admin_cooperation",
            Self::Municipality => "municipality",
            Self::Borough => "borough",
            Self::Zipcode => "zipcode",
        }
    }

    /// Hierarchy level stored alongside the kind.
    pub fn level(self) -> i32 {
        match self {
            Self::Country => 0,
            Self::State => 1,
            Self::AdminDistrict => 2,
            Self::District | Self::Zipcode => 3,
            Self::AdminCooperation => 4,
            Self::Municipality => 5,
            Self::Borough => 6,
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Unknown region kind '{s}'")))
    }
}
