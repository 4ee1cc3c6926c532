//! Grid breakpoints and the `sizes` attribute builder.
//!
//! The site uses a Bootstrap-style 12 column grid. A layout descriptor maps
//! breakpoint labels to the number of columns an image spans at that
//! breakpoint; [`get_imgsizes`] turns it into the media-query list browsers
//! use to pick a `srcset` candidate.

use std::collections::BTreeMap;

/// Number of columns in a full grid row.
pub const COL_BASE: u8 = 12;

/// Fallback clause appended to every `sizes` expression.
pub const SIZES_FALLBACK: &str = "100vw";

/// A named viewport threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub label: &'static str,
    /// Minimum viewport width in pixels.
    pub min_width: u32,
    /// Fixed container width at this breakpoint, if the container is fixed.
    pub container_width: Option<u32>,
}

/// Canonical breakpoint table, smallest first.
///
/// `md` uses a 780px container instead of Bootstrap's 720px.
pub const BREAKPOINTS: [Breakpoint; 6] = [
    Breakpoint { label: "xs", min_width: 576, container_width: None },
    Breakpoint { label: "sm", min_width: 576, container_width: Some(540) },
    Breakpoint { label: "md", min_width: 768, container_width: Some(780) },
    Breakpoint { label: "lg", min_width: 992, container_width: Some(960) },
    Breakpoint { label: "xl", min_width: 1200, container_width: Some(1140) },
    Breakpoint { label: "xxl", min_width: 1400, container_width: Some(1320) },
];

/// Layout descriptor: breakpoint label to column count (1–12).
pub type ColumnSizes = BTreeMap<String, u8>;

/// Layout descriptor spanning the full row at every breakpoint.
pub fn full_row() -> ColumnSizes {
    BREAKPOINTS
        .iter()
        .map(|bp| (bp.label.to_string(), COL_BASE))
        .collect()
}

/// Propagate column counts from smaller to larger breakpoints.
///
/// Walks the breakpoints in canonical order; a label without a count
/// inherits the most recently seen one. Labels before the first explicit
/// count stay unset. Applying this twice yields the same result.
pub fn fill_colsizes_upward(mut colsizes: ColumnSizes) -> ColumnSizes {
    let mut last: Option<u8> = None;
    for bp in &BREAKPOINTS {
        match colsizes.get(bp.label) {
            Some(&count) => last = Some(count),
            None => {
                if let Some(count) = last {
                    colsizes.insert(bp.label.to_string(), count);
                }
            }
        }
    }
    colsizes
}

/// Build the `sizes` attribute for a layout descriptor.
///
/// Emits one clause per breakpoint, largest first, then [`SIZES_FALLBACK`]:
///
/// - no column count: `(max-width: {min}px) 100vw`
/// - count, fluid container: `(max-width: {min}px) calc(100vw * {ratio})`
/// - count, fixed container: `(min-width: {min}px) calc(min({container}px, 100vw) * {ratio})`
pub fn get_imgsizes(colsizes: &ColumnSizes) -> String {
    let colsizes = fill_colsizes_upward(colsizes.clone());
    let mut clauses: Vec<String> = BREAKPOINTS
        .iter()
        .rev()
        .map(|bp| match colsizes.get(bp.label) {
            None => format!("(max-width: {}px) 100vw", bp.min_width),
            Some(&count) => {
                let ratio = format!("{:.2}", f64::from(count) / f64::from(COL_BASE));
                match bp.container_width {
                    None => format!("(max-width: {}px) calc(100vw * {ratio})", bp.min_width),
                    Some(container) => format!(
                        "(min-width: {}px) calc(min({container}px, 100vw) * {ratio})",
                        bp.min_width
                    ),
                }
            }
        })
        .collect();
    clauses.push(SIZES_FALLBACK.to_string());
    clauses.join(", ")
}
