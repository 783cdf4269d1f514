//! A voxel volume: one octree paired with the arena that stores its leaves

use super::arena::VoxelArena;
use super::config::VolumeConfig;
use super::svo::{self, InsertOutcome, Octree, Records};
use super::voxel::VoxelRecord;
use crate::core::Result;

/// Running counters for one volume
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VolumeStats {
    /// Unit voxels installed
    pub inserts: u64,
    /// Inserts that hit an already covered coordinate
    pub duplicates: u64,
    /// Leaves removed because their arena slot was reclaimed
    pub evictions: u64,
    /// Evictions whose leaf had already been replaced
    pub superseded: u64,
    /// Branches collapsed into a single leaf
    pub compactions: u64,
    /// Sibling pairs fused by run compaction
    pub run_merges: u64,
    /// Leaves hidden by the last visibility pass
    pub hidden: usize,
}

/// Bounded-memory voxel volume
///
/// Owns the octree and its arena so the two are always mutated together.
#[derive(Clone, Debug)]
pub struct Volume {
    octree: Octree,
    arena: VoxelArena,
    stats: VolumeStats,
}

impl Volume {
    /// Create an empty volume of extent `2^root_depth`
    ///
    /// # Panics
    /// If `root_depth` is 0 or above [`svo::MAX_ROOT_DEPTH`], or if
    /// `arena_capacity` is 0. Use [`Volume::from_config`] to get an error
    /// instead.
    pub fn new(root_depth: u8, arena_capacity: usize) -> Self {
        Self {
            octree: Octree::new(root_depth),
            arena: VoxelArena::new(arena_capacity),
            stats: VolumeStats::default(),
        }
    }

    /// Create a volume from a validated config
    pub fn from_config(config: &VolumeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            octree: Octree::new(config.root_depth),
            arena: VoxelArena::with_probe_limit(config.arena_capacity, config.probe_limit),
            stats: VolumeStats::default(),
        })
    }

    /// Insert a unit voxel
    ///
    /// Out-of-range coordinates return [`crate::core::Error::OutOfBounds`]
    /// and leave the volume untouched.
    pub fn insert(&mut self, x: u32, y: u32, z: u32) -> Result<InsertOutcome> {
        let outcome = self.octree.insert(&mut self.arena, x, y, z)?;
        match outcome {
            InsertOutcome::Inserted {
                evicted,
                superseded,
                compacted,
            } => {
                self.stats.inserts += 1;
                self.stats.evictions += evicted as u64;
                self.stats.superseded += superseded as u64;
                self.stats.compactions += compacted as u64;
            }
            InsertOutcome::AlreadyPresent => self.stats.duplicates += 1,
        }
        Ok(outcome)
    }

    /// Record covering `(x, y, z)` at `max_depth` or coarser
    pub fn find(&self, x: u32, y: u32, z: u32, max_depth: u8) -> Option<&VoxelRecord> {
        self.octree.find(&self.arena, x, y, z, max_depth)
    }

    /// True if any leaf covers `(x, y, z)`
    pub fn contains(&self, x: u32, y: u32, z: u32) -> bool {
        self.find(x, y, z, 0).is_some()
    }

    /// Recompute HIDDEN for every leaf; returns the hidden count
    pub fn classify_visibility(&mut self) -> usize {
        let hidden = svo::classify_visibility(&self.octree, &mut self.arena);
        self.stats.hidden = hidden;
        hidden
    }

    /// Fuse z-adjacent sibling leaves; returns the number of merges
    pub fn compact_runs(&mut self) -> usize {
        let merged = svo::compact_runs(&mut self.octree, &mut self.arena);
        self.stats.run_merges += merged as u64;
        merged
    }

    /// Records of every leaf, hidden ones included
    pub fn visible_records(&self) -> Records<'_> {
        self.octree.records(&self.arena)
    }

    /// Check that tree and arena agree; returns the leaf count
    pub fn validate(&self) -> Result<usize> {
        self.octree.validate(&self.arena)
    }

    /// Indented listing of the tree
    pub fn dump_tree(&self) -> String {
        self.octree.dump(&self.arena)
    }

    pub fn stats(&self) -> &VolumeStats {
        &self.stats
    }

    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    pub fn arena(&self) -> &VoxelArena {
        &self.arena
    }

    pub fn root_depth(&self) -> u8 {
        self.octree.root_depth()
    }

    /// Edge length in voxels
    pub fn extent(&self) -> u32 {
        self.octree.extent()
    }

    /// Number of live leaves
    pub fn len(&self) -> usize {
        self.arena.live_count()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.live_count() == 0
    }
}
