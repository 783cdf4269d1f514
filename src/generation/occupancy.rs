//! Occupancy sources deciding which voxels are solid

use glam::IVec3;
use noise::{NoiseFn, OpenSimplex};

use super::config::GenerationConfig;

/// Decides whether the voxel at a world position is solid
pub trait OccupancySource: Send + Sync {
    fn is_occupied(&self, pos: IVec3) -> bool;
}

impl<F> OccupancySource for F
where
    F: Fn(IVec3) -> bool + Send + Sync,
{
    fn is_occupied(&self, pos: IVec3) -> bool {
        self(pos)
    }
}

/// Thresholded 3D OpenSimplex noise
pub struct NoiseOccupancy {
    noise: OpenSimplex,
    frequency: f64,
    threshold: f64,
}

impl NoiseOccupancy {
    pub fn new(seed: u32, frequency: f64, threshold: f64) -> Self {
        Self {
            noise: OpenSimplex::new(seed),
            frequency,
            threshold,
        }
    }

    pub fn from_config(config: &GenerationConfig) -> Self {
        Self::new(config.seed, config.frequency, config.threshold)
    }

    /// Raw noise value at `pos`, roughly in [-1, 1]
    pub fn sample(&self, pos: IVec3) -> f64 {
        let p = pos.as_dvec3() * self.frequency;
        self.noise.get([p.x, p.y, p.z])
    }
}

impl OccupancySource for NoiseOccupancy {
    fn is_occupied(&self, pos: IVec3) -> bool {
        self.sample(pos) > self.threshold
    }
}
