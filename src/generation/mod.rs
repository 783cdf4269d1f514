//! Chunk generation driver
//!
//! Each chunk is an independent [`Volume`] filled from an
//! [`OccupancySource`], then classified for visibility and run-compacted.
//! Chunks share nothing, so a grid is built in parallel with rayon.

pub mod config;
pub mod occupancy;

pub use config::GenerationConfig;
pub use occupancy::{NoiseOccupancy, OccupancySource};

use glam::IVec3;
use rayon::prelude::*;

use crate::core::{Error, Result};
use crate::voxel::{instances_from, Volume, VolumeConfig, VoxelInstance};

/// One generated chunk
#[derive(Clone, Debug)]
pub struct Chunk {
    /// Chunk grid coordinate
    pub coord: IVec3,
    /// World position of the chunk's local origin
    pub origin: IVec3,
    pub volume: Volume,
}

impl Chunk {
    /// Instances for every leaf, hidden ones included
    pub fn instances(&self) -> Vec<VoxelInstance> {
        instances_from(self.volume.visible_records(), self.origin)
    }

    /// Instances for leaves with an exposed face
    pub fn visible_instances(&self) -> Vec<VoxelInstance> {
        instances_from(
            self.volume.visible_records().filter(|record| !record.is_hidden()),
            self.origin,
        )
    }
}

/// Fill one chunk volume from `source`
///
/// Voxels are visited x-major in local coordinates; the world position is
/// `coord * extent + local`.
pub fn build_chunk<S>(coord: IVec3, source: &S, config: &VolumeConfig) -> Result<Chunk>
where
    S: OccupancySource + ?Sized,
{
    let mut volume = Volume::from_config(config)?;
    let extent = volume.extent();
    let origin = chunk_origin(coord, extent)?;

    for x in 0..extent {
        for y in 0..extent {
            for z in 0..extent {
                let world = origin + IVec3::new(x as i32, y as i32, z as i32);
                if source.is_occupied(world) {
                    volume.insert(x, y, z)?;
                }
            }
        }
    }

    volume.classify_visibility();
    volume.compact_runs();

    let stats = volume.stats();
    log::debug!(
        "Chunk {:?}: {} inserts, {} evictions, {} compactions, {} merges, {} hidden",
        coord,
        stats.inserts,
        stats.evictions,
        stats.compactions,
        stats.run_merges,
        stats.hidden
    );

    Ok(Chunk {
        coord,
        origin,
        volume,
    })
}

/// World position of a chunk's local origin
///
/// Fails if any voxel of the chunk would fall outside the i32 range.
pub fn chunk_origin(coord: IVec3, extent: u32) -> Result<IVec3> {
    let axis = |c: i32| {
        let origin = (c as i64) * extent as i64;
        let last = origin + extent as i64 - 1;
        (origin >= i32::MIN as i64 && last <= i32::MAX as i64).then_some(origin as i32)
    };
    match (axis(coord.x), axis(coord.y), axis(coord.z)) {
        (Some(x), Some(y), Some(z)) => Ok(IVec3::new(x, y, z)),
        _ => Err(Error::InvalidConfig(format!(
            "chunk {:?} of extent {} lies outside the i32 world range",
            coord, extent
        ))),
    }
}

/// Build every chunk in `coords` in parallel
pub fn build_chunks<S>(coords: &[IVec3], source: &S, config: &VolumeConfig) -> Result<Vec<Chunk>>
where
    S: OccupancySource + ?Sized,
{
    config.validate()?;
    let start = std::time::Instant::now();

    let chunks = coords
        .par_iter()
        .map(|&coord| build_chunk(coord, source, config))
        .collect::<Result<Vec<_>>>()?;

    let leaves: usize = chunks.iter().map(|chunk| chunk.volume.len()).sum();
    log::info!(
        "Built {} chunks ({} leaves) in {:.1}ms",
        chunks.len(),
        leaves,
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> VolumeConfig {
        VolumeConfig::new(3, 1024)
    }

    #[test]
    fn test_solid_chunk_collapses_to_root() {
        let chunk = build_chunk(IVec3::ZERO, &|_: IVec3| true, &small_config()).unwrap();
        assert!(chunk.volume.octree().root().is_leaf());
        assert_eq!(chunk.volume.len(), 1);
        assert_eq!(chunk.instances().len(), 1);
        assert_eq!(chunk.instances()[0].scale, [8, 8, 8, 0]);
    }

    #[test]
    fn test_empty_chunk() {
        let chunk = build_chunk(IVec3::new(1, 0, 0), &|_: IVec3| false, &small_config()).unwrap();
        assert!(chunk.volume.is_empty());
        assert!(chunk.instances().is_empty());
    }

    #[test]
    fn test_chunk_origin_offsets_world_positions() {
        // Only the world voxel (9, 2, 3) is solid; it lives in chunk (1, 0, 0)
        let source = |pos: IVec3| pos == IVec3::new(9, 2, 3);
        let chunk = build_chunk(IVec3::new(1, 0, 0), &source, &small_config()).unwrap();
        assert!(chunk.volume.contains(1, 2, 3));

        let instances = chunk.instances();
        assert_eq!(instances.len(), 1);
        assert_eq!(&instances[0].offset[..3], &[9, 2, 3]);
    }

    #[test]
    fn test_enclosed_leaves_counted_hidden() {
        // Everything but the far corner: the origin octant is enclosed
        let source = |pos: IVec3| pos != IVec3::new(7, 7, 7);
        let chunk = build_chunk(IVec3::ZERO, &source, &small_config()).unwrap();
        chunk.volume.validate().unwrap();
        assert!(chunk.volume.stats().hidden >= 1);
        assert!(chunk.volume.stats().run_merges > 0);
        assert!(chunk.visible_instances().len() <= chunk.instances().len());
    }

    #[test]
    fn test_build_chunks_parallel_matches_serial() {
        let source = NoiseOccupancy::new(3, 1.0 / 8.0, 0.0);
        let config = small_config();
        let coords = [IVec3::new(0, 0, 0), IVec3::new(-1, 2, 0), IVec3::new(4, -3, 1)];

        let chunks = build_chunks(&coords, &source, &config).unwrap();
        assert_eq!(chunks.len(), 3);
        for (chunk, &coord) in chunks.iter().zip(&coords) {
            let serial = build_chunk(coord, &source, &config).unwrap();
            assert_eq!(chunk.coord, coord);
            assert_eq!(chunk.instances(), serial.instances());
        }
    }

    #[test]
    fn test_chunk_origin_range() {
        assert_eq!(chunk_origin(IVec3::new(-1, 0, 2), 64).unwrap(), IVec3::new(-64, 0, 128));
        assert_eq!(chunk_origin(IVec3::new(-2, 1, 0), 1 << 30).unwrap().x, i32::MIN);
        assert!(matches!(
            chunk_origin(IVec3::new(0, 2, 0), 1 << 30),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_build_chunk_rejects_out_of_range_coord() {
        let config = VolumeConfig::new(30, 16);
        let err = build_chunk(IVec3::new(2, 0, 0), &|_: IVec3| false, &config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_build_chunks_rejects_invalid_config() {
        let err = build_chunks(&[IVec3::ZERO], &|_: IVec3| true, &VolumeConfig::new(3, 0)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
