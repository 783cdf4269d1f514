//! Voxel record - one axis-aligned cube as stored in the arena

use bytemuck::{Pod, Zeroable};
use glam::IVec3;

/// Status flags packed into the low byte of [`VoxelRecord::scale`]
pub mod flags {
    /// Slot holds a live voxel. Records without it are free storage.
    pub const EXISTS: u32 = 1 << 0;
    /// Voxel is occluded on all six faces
    pub const HIDDEN: u32 = 1 << 1;
    /// All bits reserved for flags
    pub const MASK: u32 = 0xff;
}

const SCALE_X_SHIFT: u32 = 24;
const SCALE_Y_SHIFT: u32 = 16;
const SCALE_Z_SHIFT: u32 = 8;

/// Pack per-axis log2 extents and flags into one word
pub fn pack_scale(log2_x: u8, log2_y: u8, log2_z: u8, flags: u32) -> u32 {
    (log2_x as u32) << SCALE_X_SHIFT
        | (log2_y as u32) << SCALE_Y_SHIFT
        | (log2_z as u32) << SCALE_Z_SHIFT
        | (flags & flags::MASK)
}

/// Packed scale for a cube of edge `2^depth`
pub fn uniform_scale(depth: u8, flags: u32) -> u32 {
    pack_scale(depth, depth, depth, flags)
}

/// Mask a coordinate down to the `2^depth` grid
#[inline]
pub fn align(coord: u32, depth: u8) -> u32 {
    coord & !((1u32 << depth) - 1)
}

/// A single voxel cube - exactly 16 bytes
///
/// `position` is the minimum corner, aligned to the cube's extent.
/// `scale` holds log2 extents for x/y/z in its three high bytes and
/// the status flags in the low byte.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct VoxelRecord {
    pub position: IVec3,
    pub scale: u32,
}

impl VoxelRecord {
    /// Live cube of edge `2^depth` containing `(x, y, z)`
    pub fn at_depth(x: u32, y: u32, z: u32, depth: u8) -> Self {
        Self {
            position: IVec3::new(
                align(x, depth) as i32,
                align(y, depth) as i32,
                align(z, depth) as i32,
            ),
            scale: uniform_scale(depth, flags::EXISTS),
        }
    }

    /// Live unit voxel at `(x, y, z)`
    pub fn unit(x: u32, y: u32, z: u32) -> Self {
        Self::at_depth(x, y, z, 0)
    }

    pub fn flags(&self) -> u32 {
        self.scale & flags::MASK
    }

    pub fn exists(&self) -> bool {
        self.scale & flags::EXISTS != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.scale & flags::HIDDEN != 0
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        if hidden {
            self.scale |= flags::HIDDEN;
        } else {
            self.scale &= !flags::HIDDEN;
        }
    }

    /// Drop the EXISTS and HIDDEN bits, keeping the stale geometry
    pub fn clear_flags(&mut self) {
        self.scale &= !flags::MASK;
    }

    /// Per-axis log2 extents
    pub fn log2_extent(&self) -> [u8; 3] {
        [
            (self.scale >> SCALE_X_SHIFT) as u8,
            (self.scale >> SCALE_Y_SHIFT) as u8,
            (self.scale >> SCALE_Z_SHIFT) as u8,
        ]
    }

    /// Replace the log2 extents, keeping flags
    pub fn set_log2_extent(&mut self, extent: [u8; 3]) {
        self.scale = pack_scale(extent[0], extent[1], extent[2], self.flags());
    }

    /// Edge lengths along each axis
    pub fn extent(&self) -> IVec3 {
        let [x, y, z] = self.log2_extent();
        IVec3::new(1 << x, 1 << y, 1 << z)
    }

    /// Edge length of the smallest side
    pub fn size(&self) -> u32 {
        let [x, y, z] = self.log2_extent();
        1 << x.min(y).min(z)
    }

    /// Exclusive maximum corner
    pub fn max_corner(&self) -> IVec3 {
        self.position + self.extent()
    }

    pub fn contains(&self, point: IVec3) -> bool {
        point.cmpge(self.position).all() && point.cmplt(self.max_corner()).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        assert_eq!(std::mem::size_of::<VoxelRecord>(), 16);
    }

    #[test]
    fn test_free_record_does_not_exist() {
        assert!(!VoxelRecord::default().exists());
    }

    #[test]
    fn test_at_depth_aligns_position() {
        let record = VoxelRecord::at_depth(13, 6, 7, 2);
        assert_eq!(record.position, IVec3::new(12, 4, 4));
        assert_eq!(record.size(), 4);
        assert_eq!(record.extent(), IVec3::splat(4));
        assert!(record.exists());
        assert!(!record.is_hidden());
    }

    #[test]
    fn test_packed_layout() {
        let record = VoxelRecord::at_depth(0, 0, 0, 3);
        assert_eq!(record.scale, 0x0303_0301);
        assert_eq!(record.log2_extent(), [3, 3, 3]);
    }

    #[test]
    fn test_hidden_flag() {
        let mut record = VoxelRecord::unit(1, 2, 3);
        record.set_hidden(true);
        assert!(record.is_hidden());
        assert!(record.exists());
        record.set_hidden(false);
        assert!(!record.is_hidden());
    }

    #[test]
    fn test_clear_flags_keeps_geometry() {
        let mut record = VoxelRecord::at_depth(8, 8, 8, 1);
        record.set_hidden(true);
        record.clear_flags();
        assert!(!record.exists());
        assert!(!record.is_hidden());
        assert_eq!(record.log2_extent(), [1, 1, 1]);
        assert_eq!(record.position, IVec3::splat(8));
    }

    #[test]
    fn test_non_cubic_extent() {
        let mut record = VoxelRecord::at_depth(4, 4, 4, 1);
        record.set_log2_extent([1, 1, 2]);
        assert_eq!(record.size(), 2);
        assert_eq!(record.extent(), IVec3::new(2, 2, 4));
        assert!(record.contains(IVec3::new(5, 5, 7)));
        assert!(!record.contains(IVec3::new(5, 5, 8)));
        assert!(!record.contains(IVec3::new(3, 5, 5)));
    }
}
