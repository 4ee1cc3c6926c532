//! Tree position allocation shared by the region pipelines.

use fds_core::region::tree::{new_child_params, rebuild_tree_paths};
use fds_db::models::georegion::{GeoRegion, TreePosition};

use super::store::RegionStore;
use super::IngestError;

/// Recompute path, depth and numchild of every region from the parent links.
pub async fn rebuild_tree(store: &dyn RegionStore) -> Result<usize, IngestError> {
    let nodes = store.list_tree_nodes().await?;
    let placements = rebuild_tree_paths(&nodes)?;
    store.apply_tree_placements(&placements).await?;
    tracing::info!(regions = placements.len(), "Rebuilt region tree");
    Ok(placements.len())
}

/// Path for a new last child of `parent` (a new root when `None`).
///
/// When the allocated path is already taken the stored tree is out of
/// order: it is rebuilt and allocation is retried once against the fresh
/// parent path.
pub async fn allocate_child_position(
    store: &dyn RegionStore,
    parent: Option<&GeoRegion>,
) -> Result<TreePosition, IngestError> {
    let position = next_child_position(store, parent.map(|p| p.path.as_str())).await?;
    if !store.path_exists(&position.path).await? {
        return Ok(position);
    }

    tracing::warn!(path = %position.path, "Tree path collision, rebuilding tree");
    rebuild_tree(store).await?;
    let parent_path = match parent {
        Some(parent) => Some(
            store
                .find_by_id(parent.id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?
                .path,
        ),
        None => None,
    };
    next_child_position(store, parent_path.as_deref()).await
}

async fn next_child_position(
    store: &dyn RegionStore,
    parent_path: Option<&str>,
) -> Result<TreePosition, IngestError> {
    let last = store.last_child_path(parent_path).await?;
    let params = new_child_params(parent_path, last.as_deref())?;
    Ok(TreePosition {
        path: params.path,
        depth: params.depth,
    })
}
