//! Column inference for image plugins.
//!
//! An image placed in the CMS either declares its layout explicitly through
//! a `data-colsizes` attribute or inherits it from the grid column it sits
//! in.

use std::collections::BTreeMap;

use serde_json::Value;

use super::breakpoints::{full_row, ColumnSizes, BREAKPOINTS};
use crate::types::JsonMap;

/// Attribute carrying an explicit layout, e.g. `"col-12 col-md-6"`.
pub const COLSIZES_ATTRIBUTE: &str = "data-colsizes";

/// Plugin type of a grid column.
pub const GRID_COLUMN_PLUGIN: &str = "GridColumnPlugin";

/// How many ancestors are inspected when inferring a layout.
const PARENT_LEVELS: usize = 2;

/// The slice of a CMS plugin tree needed for layout inference.
#[derive(Debug, Clone, Default)]
pub struct PluginNode {
    pub plugin_type: String,
    /// HTML attributes configured on the plugin.
    pub attributes: BTreeMap<String, String>,
    /// Plugin configuration; grid columns store `{label}_col` counts here.
    pub config: JsonMap,
    pub parent: Option<Box<PluginNode>>,
}

impl PluginNode {
    pub fn new(plugin_type: impl Into<String>) -> Self {
        Self {
            plugin_type: plugin_type.into(),
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: PluginNode) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_config(mut self, key: &str, value: Value) -> Self {
        self.config.insert(key.to_string(), value);
        self
    }

    fn is_container(&self) -> bool {
        self.plugin_type.to_lowercase().contains("container")
    }

    /// Per-breakpoint counts configured on a grid column. Zero and missing
    /// values are left out.
    fn grid_column_sizes(&self) -> ColumnSizes {
        BREAKPOINTS
            .iter()
            .filter_map(|bp| {
                let count = column_count(self.config.get(&format!("{}_col", bp.label))?)?;
                Some((bp.label.to_string(), count))
            })
            .collect()
    }
}

fn column_count(value: &Value) -> Option<u8> {
    let count = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    (count > 0).then_some(count)
}

/// Parse a `data-colsizes` attribute.
///
/// Tokens are `col-{label}-{n}` or `col-{n}` (the latter meaning `xs`).
/// Tokens of any other shape are ignored.
pub fn parse_colsizes(colsizes: &str) -> ColumnSizes {
    let mut result = ColumnSizes::new();
    for token in colsizes.split_whitespace() {
        let parts: Vec<&str> = token.split('-').collect();
        let (label, count) = match parts.as_slice() {
            ["col", count] => ("xs", *count),
            ["col", label, count] => (*label, *count),
            _ => continue,
        };
        if let Ok(count) = count.parse::<u8>() {
            result.insert(label.to_string(), count);
        }
    }
    result
}

/// Look up to two levels up the plugin tree for a layout.
///
/// A grid column ancestor yields its configured counts. A container seen
/// without a grid column means the image spans the full row.
pub fn find_parent_plugin_size(instance: &PluginNode) -> Option<ColumnSizes> {
    let mut has_container = false;
    let mut current = instance;
    for _ in 0..PARENT_LEVELS {
        let Some(parent) = current.parent.as_deref() else {
            break;
        };
        if parent.is_container() {
            has_container = true;
        } else if parent.plugin_type == GRID_COLUMN_PLUGIN {
            return Some(parent.grid_column_sizes());
        }
        current = parent;
    }
    has_container.then(full_row)
}

/// Layout descriptor for an image plugin. Empty when nothing is known.
pub fn picture_column_sizes(instance: &PluginNode) -> ColumnSizes {
    if let Some(colsizes) = instance
        .attributes
        .get(COLSIZES_ATTRIBUTE)
        .filter(|v| !v.trim().is_empty())
    {
        return parse_colsizes(colsizes);
    }
    match find_parent_plugin_size(instance) {
        Some(sizes) if !sizes.is_empty() => sizes,
        _ => ColumnSizes::new(),
    }
}
