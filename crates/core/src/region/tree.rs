//! Materialized-path ordered tree.
//!
//! Each node stores its position as concatenated fixed-width steps of
//! [`STEPLEN`] base-36 digits: the root `0001` has children `00010001`,
//! `00010002`, and so on. `depth` is the number of steps and `numchild`
//! the number of direct children.

use std::collections::{BTreeMap, HashMap};

use crate::error::CoreError;
use crate::types::DbId;

/// Width of one path step.
pub const STEPLEN: usize = 4;

/// Digits used in path steps, in sort order.
pub const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Largest sibling position a step can encode.
pub const MAX_STEP: u64 = 36u64.pow(STEPLEN as u32) - 1;

/// Encode a 1-based sibling position as a path step.
pub fn encode_step(position: u64) -> Result<String, CoreError> {
    if position == 0 || position > MAX_STEP {
        return Err(CoreError::Validation(format!(
            "Tree step {position} is out of range 1..={MAX_STEP}"
        )));
    }
    let base = ALPHABET.len() as u64;
    let mut digits = [b'0'; STEPLEN];
    let mut rest = position;
    for slot in digits.iter_mut().rev() {
        *slot = ALPHABET[(rest % base) as usize];
        rest /= base;
    }
    Ok(digits.iter().map(|&b| b as char).collect())
}

/// Decode a path step. Returns `None` for steps of the wrong width or with
/// characters outside [`ALPHABET`].
pub fn decode_step(step: &str) -> Option<u64> {
    if step.len() != STEPLEN {
        return None;
    }
    step.bytes().try_fold(0u64, |acc, b| {
        let digit = ALPHABET.iter().position(|&c| c == b)? as u64;
        Some(acc * ALPHABET.len() as u64 + digit)
    })
}

/// Number of steps in a path.
pub fn depth_of(path: &str) -> i32 {
    (path.len() / STEPLEN) as i32
}

/// Path of the parent node, `None` for roots.
pub fn parent_path(path: &str) -> Option<&str> {
    (path.len() > STEPLEN).then(|| &path[..path.len() - STEPLEN])
}

/// Position and depth for a node appended after the last existing sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChildParams {
    pub path: String,
    pub depth: i32,
}

/// Allocate the path of a new last child of `parent_path` (a new root when
/// `None`), given the path of the current last sibling if there is one.
pub fn new_child_params(
    parent_path: Option<&str>,
    last_sibling_path: Option<&str>,
) -> Result<NewChildParams, CoreError> {
    let prefix = parent_path.unwrap_or("");
    let position = match last_sibling_path {
        Some(sibling) => {
            let step = sibling
                .strip_prefix(prefix)
                .filter(|step| step.len() == STEPLEN)
                .and_then(decode_step)
                .ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Path '{sibling}' is not a child of '{prefix}'"
                    ))
                })?;
            step + 1
        }
        None => 1,
    };
    let path = format!("{prefix}{}", encode_step(position)?);
    Ok(NewChildParams {
        depth: depth_of(&path),
        path,
    })
}

/// Parent link of a node, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: DbId,
    pub parent_id: Option<DbId>,
    pub name: String,
}

/// Recomputed tree fields of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePlacement {
    pub id: DbId,
    pub path: String,
    pub depth: i32,
    pub numchild: i32,
}

/// Re-issue paths for the whole tree from the parent links.
///
/// Roots and siblings are ordered by name (then id). Placements are
/// returned in path order. Nodes pointing at an unknown parent or caught
/// in a cycle are an error.
pub fn rebuild_tree_paths(nodes: &[TreeNode]) -> Result<Vec<TreePlacement>, CoreError> {
    let known: HashMap<DbId, &TreeNode> = nodes.iter().map(|n| (n.id, n)).collect();
    let mut children: BTreeMap<Option<DbId>, Vec<&TreeNode>> = BTreeMap::new();
    for node in nodes {
        if let Some(parent_id) = node.parent_id {
            if !known.contains_key(&parent_id) {
                return Err(CoreError::Validation(format!(
                    "Region {} points at unknown parent {parent_id}",
                    node.id
                )));
            }
        }
        children.entry(node.parent_id).or_default().push(node);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    }

    let mut placements = Vec::with_capacity(nodes.len());
    // Depth-first, pushing siblings in reverse so they pop in order.
    let mut stack: Vec<(&TreeNode, String)> = Vec::new();
    let roots = children.get(&None).map(Vec::as_slice).unwrap_or_default();
    for (index, root) in roots.iter().enumerate().rev() {
        stack.push((root, encode_step(index as u64 + 1)?));
    }
    while let Some((node, path)) = stack.pop() {
        let kids = children.get(&Some(node.id)).map(Vec::as_slice).unwrap_or_default();
        for (index, child) in kids.iter().enumerate().rev() {
            stack.push((child, format!("{path}{}", encode_step(index as u64 + 1)?)));
        }
        placements.push(TreePlacement {
            id: node.id,
            depth: depth_of(&path),
            numchild: kids.len() as i32,
            path,
        });
    }

    if placements.len() != nodes.len() {
        return Err(CoreError::Validation(format!(
            "{} regions are unreachable from a root (cycle in part_of)",
            nodes.len() - placements.len()
        )));
    }
    Ok(placements)
}
