//! Features of the administrative boundary dataset (VG25).

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Europe::Berlin;
use serde::Deserialize;
use serde_json::Value;

use crate::slug::slugify;
use crate::types::JsonMap;

use super::ars::pad_ars;
use super::kind::RegionKind;

/// A dataset layer and the region kind it populates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSpec {
    pub name: &'static str,
    pub kind: RegionKind,
}

/// Boundary layers in ingestion order. Parents are always ingested before
/// their children.
pub const LAYERS: [LayerSpec; 6] = [
    LayerSpec { name: "vg25_sta", kind: RegionKind::Country },
    LayerSpec { name: "vg25_lan", kind: RegionKind::State },
    LayerSpec { name: "vg25_rbz", kind: RegionKind::AdminDistrict },
    LayerSpec { name: "vg25_krs", kind: RegionKind::District },
    LayerSpec { name: "vg25_vwg", kind: RegionKind::AdminCooperation },
    LayerSpec { name: "vg25_gem", kind: RegionKind::Municipality },
];

/// Point layer with the seats of administration.
pub const GOV_SEAT_LAYER: &str = "vg25_pk";

/// Geometry feature flags of land areas (`GF`).
const LAND_GEOMETRY_FLAGS: [i64; 2] = [4, 9];

/// One feature as delivered by a dataset reader: attribute table row plus a
/// GeoJSON geometry in WGS84.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BoundaryFeature {
    #[serde(default, rename = "properties")]
    pub attributes: JsonMap,
    #[serde(default)]
    pub geometry: Value,
}

impl BoundaryFeature {
    pub fn new(attributes: JsonMap, geometry: Value) -> Self {
        Self { attributes, geometry }
    }

    /// Attribute as a trimmed string. Numbers are rendered, null and empty
    /// strings are `None`.
    pub fn text(&self, name: &str) -> Option<String> {
        match self.attributes.get(name)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Attribute as an integer. Numeric strings and whole floats are accepted.
    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.attributes.get(name)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn ars(&self) -> Option<String> {
        self.text("ARS")
    }

    /// Stored identifier: `ARS` right-padded to 12 digits.
    pub fn region_identifier(&self) -> Option<String> {
        self.ars().map(|ars| pad_ars(&ars))
    }

    pub fn nuts(&self) -> String {
        self.text("NUTS").unwrap_or_default()
    }

    pub fn name(&self) -> String {
        self.text("GEN").unwrap_or_default()
    }

    pub fn kind_detail(&self) -> String {
        self.text("BEZ").unwrap_or_default()
    }

    pub fn population(&self) -> Option<i64> {
        self.integer("EWZ")
    }

    pub fn debkg_id(&self) -> Option<String> {
        self.text("DEBKG_ID")
    }

    /// Land area with populated place status (`BSG == 1`, `GF` 4 or 9).
    pub fn is_importable(&self) -> bool {
        self.integer("BSG") == Some(1)
            && self
                .integer("GF")
                .is_some_and(|gf| LAND_GEOMETRY_FLAGS.contains(&gf))
    }

    /// Display name, prefixed with the kind detail when `NBD` is `ja`.
    pub fn full_name(&self) -> String {
        let name = self.name();
        if self.text("NBD").as_deref() == Some("ja") {
            format!("{} {}", self.kind_detail(), name)
        } else {
            name
        }
    }

    pub fn slug(&self) -> String {
        slugify(&self.full_name())
    }

    /// `WSK` at midnight in the area's local time zone, as UTC.
    pub fn valid_on(&self) -> Option<DateTime<Utc>> {
        self.text("WSK").as_deref().and_then(parse_validity_date)
    }
}

/// Parse a dataset date (`2021-01-01`, `2021/01/01`, optionally followed by a
/// time part that is ignored) to local midnight in Europe/Berlin.
pub fn parse_validity_date(value: &str) -> Option<DateTime<Utc>> {
    let normalized = value.trim().replace('/', "-");
    let date_part = normalized.get(..10)?;
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    berlin_midnight(date)
}

/// Midnight of `date` in Europe/Berlin, as UTC.
pub fn berlin_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Berlin
        .from_local_datetime(&midnight)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn feature(attributes: Value) -> BoundaryFeature {
        let Value::Object(map) = attributes else {
            panic!("attributes must be an object");
        };
        BoundaryFeature::new(map, json!({"type": "Point", "coordinates": [13.4, 52.5]}))
    }

    #[test]
    fn importable_filter() {
        assert!(feature(json!({"BSG": 1, "GF": 4})).is_importable());
        assert!(feature(json!({"BSG": 1, "GF": 9})).is_importable());
        assert!(feature(json!({"BSG": "1", "GF": "9"})).is_importable());
        assert!(!feature(json!({"BSG": 2, "GF": 4})).is_importable());
        assert!(!feature(json!({"BSG": 1, "GF": 2})).is_importable());
        assert!(!feature(json!({"GF": 4})).is_importable());
    }

    #[test]
    fn full_name_with_kind_detail_prefix() {
        let f = feature(json!({"GEN": "Fürstenfeldbruck", "BEZ": "Landkreis", "NBD": "ja"}));
        assert_eq!(f.full_name(), "Landkreis Fürstenfeldbruck");
        assert_eq!(f.slug(), "landkreis-furstenfeldbruck");

        let f = feature(json!({"GEN": "Berlin", "BEZ": "Land", "NBD": "nein"}));
        assert_eq!(f.full_name(), "Berlin");
        assert_eq!(f.slug(), "berlin");
    }

    #[test]
    fn identifier_is_padded() {
        let f = feature(json!({"ARS": "110"}));
        assert_eq!(f.region_identifier().as_deref(), Some("110000000000"));
        assert_eq!(feature(json!({})).region_identifier(), None);
    }

    #[test]
    fn population_may_be_missing() {
        assert_eq!(feature(json!({"EWZ": 3664088})).population(), Some(3_664_088));
        assert_eq!(feature(json!({"EWZ": 12.0})).population(), Some(12));
        assert_eq!(feature(json!({"EWZ": null})).population(), None);
    }

    #[test]
    fn validity_is_berlin_midnight() {
        let winter = parse_validity_date("2021-01-01").unwrap();
        assert_eq!(winter.to_rfc3339(), "2020-12-31T23:00:00+00:00");

        let summer = parse_validity_date("2019/07/01 00:00:00").unwrap();
        assert_eq!(summer.to_rfc3339(), "2019-06-30T22:00:00+00:00");
    }

    #[test]
    fn unparseable_validity_is_none() {
        assert_eq!(parse_validity_date("gestern"), None);
        assert_eq!(feature(json!({"WSK": "2021-13-01"})).valid_on(), None);
        assert_eq!(feature(json!({})).valid_on(), None);
    }

    #[test]
    fn deserializes_geojson_features() {
        let f: BoundaryFeature = serde_json::from_str(
            r#"{"type":"Feature","properties":{"ARS":"11","GEN":"Berlin"},"geometry":{"type":"Point","coordinates":[13.4,52.5]}}"#,
        )
        .unwrap();
        assert_eq!(f.name(), "Berlin");
        assert_eq!(f.geometry["type"], "Point");
    }

    #[test]
    fn layers_are_ordered_by_level() {
        let levels: Vec<i32> = LAYERS.iter().map(|l| l.kind.level()).collect();
        assert_eq!(levels, vec![0, 1, 2, 3, 4, 5]);
    }
}
