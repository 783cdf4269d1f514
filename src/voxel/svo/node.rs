//! Octree node and child addressing

use crate::voxel::arena::SlotHandle;

/// Index of a node in the octree's node pool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Child index of `(x, y, z)` inside a node of the given depth
///
/// Bit `depth - 1` of each axis selects the octant; the index is laid out
/// as `x_bit << 2 | y_bit << 1 | z_bit`, so z-adjacent siblings differ only
/// in bit 0.
#[inline]
pub fn child_index(x: u32, y: u32, z: u32, depth: u8) -> usize {
    debug_assert!(depth > 0, "depth-0 nodes have no children");
    let shift = depth - 1;
    (((x >> shift) & 1) << 2 | ((y >> shift) & 1) << 1 | ((z >> shift) & 1)) as usize
}

/// Offset of child `index` from its parent's minimum corner, in units of the child size
#[inline]
pub fn child_octant(index: usize) -> [u32; 3] {
    debug_assert!(index < 8);
    [(index as u32 >> 2) & 1, (index as u32 >> 1) & 1, index as u32 & 1]
}

/// What a node holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Subdivided region; `None` children are empty space
    Branch([Option<NodeId>; 8]),
    /// Uniform occupied region backed by one arena slot
    Leaf(SlotHandle),
    /// Pool entry on the free list
    Vacant,
}

/// Octree node covering a cube of edge `2^depth`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OctreeNode {
    pub depth: u8,
    pub kind: NodeKind,
}

impl OctreeNode {
    /// Branch with no children
    pub const fn branch(depth: u8) -> Self {
        Self {
            depth,
            kind: NodeKind::Branch([None; 8]),
        }
    }

    pub const fn leaf(depth: u8, handle: SlotHandle) -> Self {
        Self {
            depth,
            kind: NodeKind::Leaf(handle),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn is_branch(&self) -> bool {
        matches!(self.kind, NodeKind::Branch(_))
    }

    /// Slot handle if this is a leaf
    pub fn handle(&self) -> Option<SlotHandle> {
        match self.kind {
            NodeKind::Leaf(handle) => Some(handle),
            _ => None,
        }
    }

    /// Children if this is a branch
    pub fn children(&self) -> Option<&[Option<NodeId>; 8]> {
        match &self.kind {
            NodeKind::Branch(children) => Some(children),
            _ => None,
        }
    }

    /// Number of present children (0 for leaves)
    pub fn child_count(&self) -> usize {
        self.children()
            .map_or(0, |children| children.iter().flatten().count())
    }

    /// Edge length of the covered cube
    pub fn size(&self) -> u32 {
        1 << self.depth
    }
}
