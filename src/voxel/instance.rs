//! Per-instance voxel data handed to a renderer

use bytemuck::{Pod, Zeroable};
use glam::IVec3;

use super::voxel::VoxelRecord;

/// Instanced cube attributes (32 bytes, two `ivec4` vertex attributes)
///
/// `offset.xyz` is the world-space minimum corner and `offset.w` the status
/// flags; `scale.xyz` are the edge lengths.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct VoxelInstance {
    pub offset: [i32; 4],
    pub scale: [i32; 4],
}

impl VoxelInstance {
    /// Instance for `record`, translated by the volume's world origin
    pub fn from_record(record: &VoxelRecord, origin: IVec3) -> Self {
        let corner = record.position + origin;
        let extent = record.extent();
        Self {
            offset: [corner.x, corner.y, corner.z, record.flags() as i32],
            scale: [extent.x, extent.y, extent.z, 0],
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.offset[3] as u32 & super::voxel::flags::HIDDEN != 0
    }
}

/// Pack records into an instance buffer; hidden records are kept
pub fn instances_from<I>(records: I, origin: IVec3) -> Vec<VoxelInstance>
where
    I: IntoIterator<Item = VoxelRecord>,
{
    records
        .into_iter()
        .map(|record| VoxelInstance::from_record(&record, origin))
        .collect()
}
