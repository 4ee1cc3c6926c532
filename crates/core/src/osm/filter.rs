//! Amenity topics and the OSM tag filter built from them.
//!
//! `AMENITY_TOPICS` maps a project to the `[key, value]` tag pairs whose
//! nodes it shows, e.g. `{"klo": [["amenity", "toilets"]], "kita":
//! [["amenity", "kindergarten"], ["childcare", "*"]]}`. A value of `*`
//! accepts any value of the key.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::CoreError;

/// Tag value matching every value of a key.
pub const WILDCARD: &str = "*";

/// One `key=value` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTag {
    pub key: String,
    pub value: String,
}

impl TopicTag {
    pub fn is_wildcard(&self) -> bool {
        self.value == WILDCARD
    }
}

/// Validated topic configuration, keyed by project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmenityTopics {
    topics: BTreeMap<String, Vec<TopicTag>>,
}

impl AmenityTopics {
    /// Parse the JSON configuration value.
    pub fn from_json(raw: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CoreError::Validation(format!("AMENITY_TOPICS is not valid JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Validate the configuration shape. Anything but an object of lists
    /// of two-string lists is rejected, as is a configuration without tags.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        let projects = value.as_object().ok_or_else(|| {
            CoreError::Validation("AMENITY_TOPICS must map projects to tag lists".to_string())
        })?;

        let mut topics = BTreeMap::new();
        for (project, tag_list) in projects {
            let items = tag_list.as_array().ok_or_else(|| {
                CoreError::Validation(format!("Topic '{project}' must be a list of [key, value] pairs"))
            })?;
            let tags = items
                .iter()
                .map(|item| parse_pair(project, item))
                .collect::<Result<Vec<_>, _>>()?;
            topics.insert(project.clone(), tags);
        }

        let parsed = Self { topics };
        if parsed.tags().next().is_none() {
            return Err(CoreError::Validation("AMENITY_TOPICS defines no tags".to_string()));
        }
        Ok(parsed)
    }

    pub fn tags(&self) -> impl Iterator<Item = &TopicTag> {
        self.topics.values().flatten()
    }

    /// Tag filter over all projects, duplicates removed, first seen first.
    pub fn tag_filter(&self) -> TagFilter {
        let mut filter = TagFilter::default();
        for tag in self.tags() {
            if tag.is_wildcard() {
                if !filter.wildcard_keys.contains(&tag.key) {
                    filter.wildcard_keys.push(tag.key.clone());
                }
            } else {
                let pair = format!("{}.{}", tag.key, tag.value);
                if !filter.key_values.contains(&pair) {
                    filter.key_values.push(pair);
                }
            }
        }
        filter
    }
}

fn parse_pair(project: &str, item: &Value) -> Result<TopicTag, CoreError> {
    let invalid = || {
        CoreError::Validation(format!(
            "Topic '{project}' contains {item}, expected a [key, value] pair of strings"
        ))
    };
    let pair = item.as_array().filter(|pair| pair.len() == 2).ok_or_else(invalid)?;
    let (Some(key), Some(value)) = (pair[0].as_str(), pair[1].as_str()) else {
        return Err(invalid());
    };
    let (key, value) = (key.trim(), value.trim());
    // `,` and `.` delimit entries of osmosis' keyValueList.
    if key.is_empty() || value.is_empty() || key.contains([',', '.']) || value.contains(',') {
        return Err(invalid());
    }
    Ok(TopicTag {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Node filter: exact `key.value` pairs plus keys accepted with any value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    pub key_values: Vec<String>,
    pub wildcard_keys: Vec<String>,
}

impl TagFilter {
    /// Number of `--read-pbf` inputs the filter needs.
    pub fn input_count(&self) -> usize {
        usize::from(!self.key_values.is_empty()) + self.wildcard_keys.len()
    }
}

/// `osmconvert` arguments turning every object of `input` into nodes.
pub fn osmconvert_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        input.display().to_string(),
        "--all-to-nodes".to_string(),
        format!("-o={}", output.display()),
        "--max-objects=1000000000".to_string(),
    ]
}

/// `osmosis` arguments filtering `input` to the tagged nodes and writing XML.
///
/// One sub-pipeline reads all exact pairs, one more per wildcard key; the
/// streams are merged `n - 1` times before `--write-xml`.
pub fn osmosis_args(filter: &TagFilter, input: &Path, output: &Path) -> Result<Vec<String>, CoreError> {
    let inputs = filter.input_count();
    if inputs == 0 {
        return Err(CoreError::Validation("Tag filter is empty".to_string()));
    }
    let input = input.display().to_string();
    let mut args = Vec::new();

    if !filter.key_values.is_empty() {
        args.extend([
            "--read-pbf".to_string(),
            input.clone(),
            "--log-progress".to_string(),
            "--node-key-value".to_string(),
            format!("keyValueList={}", filter.key_values.join(",")),
            "--sort".to_string(),
        ]);
    }
    for key in &filter.wildcard_keys {
        args.extend([
            "--read-pbf".to_string(),
            input.clone(),
            "--log-progress".to_string(),
            "--tf".to_string(),
            "accept-nodes".to_string(),
            format!("{key}={WILDCARD}"),
            "--sort".to_string(),
        ]);
    }
    args.extend(std::iter::repeat("--merge".to_string()).take(inputs - 1));
    args.extend(["--write-xml".to_string(), output.display().to_string()]);
    Ok(args)
}
