//! Volume configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::arena::{DEFAULT_ARENA_CAPACITY, DEFAULT_PROBE_LIMIT};
use super::svo::MAX_ROOT_DEPTH;
use crate::core::{Error, Result};

/// Size and memory budget of one volume
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Root covers `2^root_depth` voxels per axis
    pub root_depth: u8,
    /// Fixed number of arena slots
    pub arena_capacity: usize,
    /// Free-slot probes before an occupied slot is evicted
    pub probe_limit: usize,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            root_depth: 7,
            arena_capacity: DEFAULT_ARENA_CAPACITY,
            probe_limit: DEFAULT_PROBE_LIMIT,
        }
    }
}

impl VolumeConfig {
    pub fn new(root_depth: u8, arena_capacity: usize) -> Self {
        Self {
            root_depth,
            arena_capacity,
            ..Default::default()
        }
    }

    /// Edge length of the volume in voxels
    pub fn extent(&self) -> u32 {
        1 << self.root_depth.min(MAX_ROOT_DEPTH)
    }

    /// Check the values a volume can be built from
    pub fn validate(&self) -> Result<()> {
        if self.root_depth == 0 || self.root_depth > MAX_ROOT_DEPTH {
            return Err(Error::InvalidConfig(format!(
                "root_depth {} outside 1..={}",
                self.root_depth, MAX_ROOT_DEPTH
            )));
        }
        if self.arena_capacity == 0 {
            return Err(Error::InvalidConfig("arena_capacity must be non-zero".into()));
        }
        if self.arena_capacity > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "arena_capacity {} exceeds slot index range",
                self.arena_capacity
            )));
        }
        if self.arena_capacity < 8 {
            log::warn!(
                "arena_capacity {} cannot hold a full octant; compaction will never trigger",
                self.arena_capacity
            );
        }
        Ok(())
    }

    /// Parse from JSON and validate
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Save as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}
