//! Voxel storage: records, the slot arena and the octree that indexes it

pub mod voxel;
pub mod arena;
pub mod svo;
pub mod config;
pub mod volume;
pub mod instance;

pub use voxel::{flags, VoxelRecord};
pub use arena::{Eviction, SlotHandle, VoxelArena, DEFAULT_ARENA_CAPACITY, DEFAULT_PROBE_LIMIT};
pub use svo::{DeleteOutcome, InsertOutcome, Octree, Records, MAX_ROOT_DEPTH};
pub use config::VolumeConfig;
pub use volume::{Volume, VolumeStats};
pub use instance::{instances_from, VoxelInstance};
