//! Voct - bounded-memory sparse voxel octree
//!
//! Voxels live in a fixed-capacity ring arena; an octree indexes them and
//! collapses full octants into coarser leaves. When the arena runs out of
//! room it reclaims old slots and the octree drops the matching leaves.

pub mod core;
pub mod voxel;
pub mod generation;
