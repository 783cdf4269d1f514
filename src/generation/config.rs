//! Generation configuration

use std::path::Path;

use glam::IVec3;
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};
use crate::voxel::VolumeConfig;

/// Configuration for the chunk generation driver
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Noise seed
    pub seed: u32,
    /// World-to-noise scale (1/32 samples one noise unit every 32 voxels)
    pub frequency: f64,
    /// Noise value above which a voxel is solid
    pub threshold: f64,
    /// Chunks span `-chunk_radius..chunk_radius` on every axis
    pub chunk_radius: i32,
    /// Per-chunk volume
    pub volume: VolumeConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            frequency: 1.0 / 32.0,
            threshold: 0.0,
            chunk_radius: 2,
            volume: VolumeConfig {
                root_depth: 6,
                arena_capacity: 32 * 1024,
                ..Default::default()
            },
        }
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "frequency must be positive, got {}",
                self.frequency
            )));
        }
        if !self.threshold.is_finite() {
            return Err(Error::InvalidConfig("threshold must be finite".into()));
        }
        if self.chunk_radius <= 0 {
            return Err(Error::InvalidConfig(format!(
                "chunk_radius must be positive, got {}",
                self.chunk_radius
            )));
        }
        self.volume.validate()?;

        // World coordinates of the whole grid must fit in i32
        let span = (self.chunk_radius as i64) << self.volume.root_depth;
        if span > 1i64 << 31 {
            return Err(Error::InvalidConfig(format!(
                "chunk_radius {} at root_depth {} exceeds the i32 world range",
                self.chunk_radius, self.volume.root_depth
            )));
        }
        Ok(())
    }

    /// Chunk coordinates of the grid, x-major
    pub fn chunk_coords(&self) -> Vec<IVec3> {
        let r = self.chunk_radius;
        let mut coords = Vec::with_capacity((2 * r.max(0) as usize).pow(3));
        for x in -r..r {
            for y in -r..r {
                for z in -r..r {
                    coords.push(IVec3::new(x, y, z));
                }
            }
        }
        coords
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
}
