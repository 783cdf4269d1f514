//! Sparse voxel octree indexing the voxel arena

pub mod node;
pub mod octree;
pub mod visibility;
pub mod greedy;

pub use node::{NodeId, NodeKind, OctreeNode};
pub use octree::{DeleteOutcome, InsertOutcome, LeafRef, Octree, Records, MAX_ROOT_DEPTH};
pub use visibility::classify_visibility;
pub use greedy::compact_runs;
