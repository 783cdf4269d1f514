//! Occlusion classification for octree leaves
//!
//! A leaf is hidden when every face is covered: each positive neighbour
//! exists at the leaf's resolution or coarser, and each negative neighbour
//! exists or lies below zero on that axis (the lower volume boundary counts
//! as closed). Positive neighbours past the upper boundary are exposed.
//!
//! Verdicts only read the tree, so they are computed in parallel and
//! written back afterwards.

use rayon::prelude::*;

use super::octree::Octree;
use crate::voxel::arena::{SlotHandle, VoxelArena};
use crate::voxel::voxel::VoxelRecord;

/// Recompute the HIDDEN flag of every leaf; returns the number hidden
pub fn classify_visibility(octree: &Octree, arena: &mut VoxelArena) -> usize {
    let leaves = octree.leaves();

    let verdicts: Vec<(SlotHandle, bool)> = {
        let arena = &*arena;
        leaves
            .par_iter()
            .filter_map(|leaf| {
                let record = arena.get(leaf.handle)?;
                Some((leaf.handle, is_occluded(octree, arena, record, leaf.depth)))
            })
            .collect()
    };

    let mut hidden = 0;
    for (handle, occluded) in verdicts {
        arena.update(handle, |record| record.set_hidden(occluded));
        hidden += occluded as usize;
    }

    log::debug!("Visibility pass: {} of {} leaves hidden", hidden, leaves.len());
    hidden
}

/// True if all six faces of `record` are covered
///
/// Faces are probed in steps of the leaf size, so a stretched run is only
/// hidden when its whole face is covered.
pub fn is_occluded(octree: &Octree, arena: &VoxelArena, record: &VoxelRecord, depth: u8) -> bool {
    let step = 1i64 << depth;
    let min = record.position.as_i64vec3().to_array();
    let max = record.max_corner().as_i64vec3().to_array();

    for axis in 0..3 {
        if !face_covered(octree, arena, depth, axis, max[axis], &min, &max) {
            return false;
        }
        if min[axis] == 0 {
            continue;
        }
        if !face_covered(octree, arena, depth, axis, min[axis] - step, &min, &max) {
            return false;
        }
    }
    true
}

fn face_covered(
    octree: &Octree,
    arena: &VoxelArena,
    depth: u8,
    axis: usize,
    plane: i64,
    min: &[i64; 3],
    max: &[i64; 3],
) -> bool {
    let step = 1i64 << depth;
    let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);

    let mut a = min[u];
    while a < max[u] {
        let mut b = min[v];
        while b < max[v] {
            let mut probe = [0i64; 3];
            probe[axis] = plane;
            probe[u] = a;
            probe[v] = b;
            if !occupied(octree, arena, probe, depth) {
                return false;
            }
            b += step;
        }
        a += step;
    }
    true
}

fn occupied(octree: &Octree, arena: &VoxelArena, probe: [i64; 3], depth: u8) -> bool {
    let in_range = |c: i64| (0..=u32::MAX as i64).contains(&c);
    if !probe.iter().all(|&c| in_range(c)) {
        return false;
    }
    octree
        .find(arena, probe[0] as u32, probe[1] as u32, probe[2] as u32, depth)
        .is_some()
}
