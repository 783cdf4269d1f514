//! Greedy run merging along the z axis
//!
//! Within each branch, the sibling pairs `(i, j, 0)` / `(i, j, 1)` that are
//! both leaves of the same extent are fused: the lower sibling's record is
//! stretched to cover both and the upper sibling is dropped. Pairs never
//! overlap, so the result does not depend on visiting order. The pass is
//! local and single-level; it makes no attempt at an optimal run layout.

use super::node::NodeKind;
use super::octree::Octree;
use crate::voxel::arena::VoxelArena;
use crate::voxel::voxel::VoxelRecord;

/// Merge z-adjacent sibling leaves; returns the number of merges
pub fn compact_runs(octree: &mut Octree, arena: &mut VoxelArena) -> usize {
    let mut merged = 0;

    for branch in octree.branches() {
        let NodeKind::Branch(children) = octree.node(branch).kind else {
            continue;
        };

        for base in (0..8).step_by(2) {
            let (Some(lower), Some(upper)) = (children[base], children[base | 1]) else {
                continue;
            };
            let (Some(lower_handle), Some(upper_handle)) =
                (octree.node(lower).handle(), octree.node(upper).handle())
            else {
                continue;
            };
            let (Some(a), Some(b)) = (
                arena.get(lower_handle).copied(),
                arena.get(upper_handle).copied(),
            ) else {
                continue;
            };
            if !can_merge(&a, &b) {
                continue;
            }

            let [ex, ey, ez] = a.log2_extent();
            let hidden = a.is_hidden() && b.is_hidden();
            arena.update(lower_handle, |record| {
                record.set_log2_extent([ex, ey, ez + 1]);
                record.set_hidden(hidden);
            });
            arena.release(upper_handle);
            octree.set_child(branch, base | 1, None);
            octree.free_node(upper);
            merged += 1;
        }
    }

    log::debug!("Run compaction merged {} leaf pairs", merged);
    merged
}

/// True if `b` sits directly above `a` on z with an identical extent
pub fn can_merge(a: &VoxelRecord, b: &VoxelRecord) -> bool {
    a.log2_extent() == b.log2_extent()
        && a.position.x == b.position.x
        && a.position.y == b.position.y
        && a.max_corner().z == b.position.z
}
