//! Octree index over a voxel arena
//!
//! Nodes live in a pool indexed by [`NodeId`] (root at index 0) with a free
//! list for reuse. Leaves hold generation-checked [`SlotHandle`]s into the
//! [`VoxelArena`]; they never own the record they point at.
//!
//! Every mutation that obtains arena storage services the arena's
//! [`Eviction`] before writing, so a leaf can never observe its slot being
//! reused under it.

use std::collections::HashSet;
use std::fmt::Write as _;

use glam::IVec3;

use super::node::{child_index, child_octant, NodeId, NodeKind, OctreeNode};
use crate::core::{Error, Result};
use crate::voxel::arena::{Eviction, SlotHandle, VoxelArena};
use crate::voxel::voxel::VoxelRecord;

/// Deepest root supported; keeps every coordinate and extent inside `i32`
pub const MAX_ROOT_DEPTH: u8 = 30;

const ROOT: NodeId = NodeId(0);

/// Result of [`Octree::insert`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new unit leaf was installed
    Inserted {
        /// Leaves removed because their slot was reclaimed
        evicted: usize,
        /// Evictions whose leaf had already been replaced
        superseded: usize,
        /// Branches collapsed into a single leaf
        compacted: usize,
    },
    /// The coordinate was already covered by a leaf
    AlreadyPresent,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted { .. })
    }
}

/// Result of [`Octree::delete`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The leaf holding the evicted handle was removed
    Removed,
    /// A leaf covers the position but refers to newer storage
    Superseded,
    /// Nothing covers the position anymore
    NotFound,
}

/// A leaf reached from the root, with the minimum corner of its cube
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeafRef {
    pub node: NodeId,
    pub depth: u8,
    pub handle: SlotHandle,
    pub origin: [u32; 3],
}

#[derive(Default)]
struct Tally {
    evicted: usize,
    superseded: usize,
}

/// Sparse octree whose leaves reference arena slots
#[derive(Clone, Debug)]
pub struct Octree {
    /// Node pool (root is at index 0)
    nodes: Vec<OctreeNode>,
    /// Vacant pool entries ready for reuse
    free_nodes: Vec<NodeId>,
    /// Root covers `[0, 2^root_depth)` on every axis
    root_depth: u8,
}

impl Octree {
    /// Create an empty octree covering `[0, 2^root_depth)^3`
    pub fn new(root_depth: u8) -> Self {
        assert!(
            (1..=MAX_ROOT_DEPTH).contains(&root_depth),
            "Root depth must be in 1..={}",
            MAX_ROOT_DEPTH
        );
        Self {
            nodes: vec![OctreeNode::branch(root_depth)],
            free_nodes: Vec::new(),
            root_depth,
        }
    }

    pub fn root_depth(&self) -> u8 {
        self.root_depth
    }

    /// Edge length of the root cube
    pub fn extent(&self) -> u32 {
        1 << self.root_depth
    }

    pub fn root(&self) -> &OctreeNode {
        &self.nodes[ROOT.index()]
    }

    pub fn node(&self, id: NodeId) -> &OctreeNode {
        &self.nodes[id.index()]
    }

    /// Number of nodes reachable or allocated (excludes vacant pool entries)
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_nodes.len()
    }

    /// True if the root has no children and is not a leaf
    pub fn is_empty(&self) -> bool {
        self.root().children().is_some_and(|c| c.iter().all(Option::is_none))
    }

    pub fn contains_coord(&self, x: u32, y: u32, z: u32) -> bool {
        let extent = self.extent();
        x < extent && y < extent && z < extent
    }

    fn check_bounds(&self, x: u32, y: u32, z: u32) -> Result<()> {
        if self.contains_coord(x, y, z) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                x,
                y,
                z,
                extent: self.extent(),
            })
        }
    }

    /// Insert a unit voxel, collapsing full branches on the way back up
    ///
    /// Storage comes from `arena`; if that evicts a live voxel its leaf is
    /// removed (and its emptied branches pruned) before the new path is
    /// built. After the leaf is installed, every branch on the path whose 8
    /// children are all leaves becomes a single leaf, from the deepest level
    /// up to the root.
    pub fn insert(&mut self, arena: &mut VoxelArena, x: u32, y: u32, z: u32) -> Result<InsertOutcome> {
        self.check_bounds(x, y, z)?;
        if self.covers(arena, x, y, z)? {
            return Ok(InsertOutcome::AlreadyPresent);
        }

        let mut tally = Tally::default();
        let acquired = arena.acquire();
        if let Some(eviction) = acquired.evicted {
            self.service_eviction(&eviction, &mut tally);
        }

        let mut path = Vec::with_capacity(self.root_depth as usize);
        let mut current = ROOT;
        let leaf_index = loop {
            let node = self.nodes[current.index()];
            let NodeKind::Branch(children) = node.kind else {
                return Err(Error::Inconsistent(format!(
                    "node {} on insert path of ({}, {}, {}) is not a branch",
                    current.index(),
                    x,
                    y,
                    z
                )));
            };
            path.push(current);

            let index = child_index(x, y, z, node.depth);
            if node.depth == 1 {
                break index;
            }
            current = match children[index] {
                Some(child) => child,
                None => {
                    let child = self.alloc(OctreeNode::branch(node.depth - 1));
                    self.set_child(current, index, Some(child));
                    child
                }
            };
        };

        arena.write(acquired.handle, VoxelRecord::unit(x, y, z));
        let leaf = self.alloc(OctreeNode::leaf(0, acquired.handle));
        self.set_child(current, leaf_index, Some(leaf));

        let mut compacted = 0;
        for &branch in path.iter().rev() {
            if !self.has_full_leaf_set(branch) {
                break;
            }
            self.collapse(arena, branch, x, y, z, &mut tally);
            compacted += 1;
        }

        Ok(InsertOutcome::Inserted {
            evicted: tally.evicted,
            superseded: tally.superseded,
            compacted,
        })
    }

    /// True if a leaf or merged run already covers `(x, y, z)`
    fn covers(&self, arena: &VoxelArena, x: u32, y: u32, z: u32) -> Result<bool> {
        let mut current = ROOT;
        loop {
            let node = &self.nodes[current.index()];
            let children = match &node.kind {
                NodeKind::Branch(children) => children,
                NodeKind::Leaf(_) => return Ok(true),
                NodeKind::Vacant => {
                    return Err(Error::Inconsistent(format!(
                        "vacant node {} reachable from root",
                        current.index()
                    )))
                }
            };
            let index = child_index(x, y, z, node.depth);
            match children[index] {
                Some(child) => current = child,
                None => return Ok(self.run_covering(arena, children, index, x, y, z).is_some()),
            }
        }
    }

    /// Remove the leaf that held an evicted slot
    ///
    /// Descends along the evicted position. Only a leaf holding exactly the
    /// evicted handle is removed; anything else means the voxel was already
    /// replaced (by compaction or a previous eviction) and is left alone.
    /// Branches left without children are freed on the way back up, so the
    /// node pool stays proportional to the live leaves.
    pub fn delete(&mut self, eviction: &Eviction) -> DeleteOutcome {
        let position = eviction.position();
        if position.min_element() < 0 {
            return DeleteOutcome::NotFound;
        }
        let (x, y, z) = (position.x as u32, position.y as u32, position.z as u32);
        if !self.contains_coord(x, y, z) {
            return DeleteOutcome::NotFound;
        }

        let target = eviction.handle();
        if let NodeKind::Leaf(handle) = self.root().kind {
            if handle == target {
                self.nodes[ROOT.index()] = OctreeNode::branch(self.root_depth);
                return DeleteOutcome::Removed;
            }
            log::debug!("Evicted voxel at {:?} superseded by root leaf", position);
            return DeleteOutcome::Superseded;
        }

        let mut path = Vec::with_capacity(self.root_depth as usize);
        let mut current = ROOT;
        loop {
            let node = self.nodes[current.index()];
            let NodeKind::Branch(children) = node.kind else {
                return DeleteOutcome::NotFound;
            };
            let index = child_index(x, y, z, node.depth);
            let Some(child) = children[index] else {
                log::debug!("Evicted voxel at {:?} no longer in tree", position);
                return DeleteOutcome::NotFound;
            };

            match self.nodes[child.index()].kind {
                NodeKind::Leaf(handle) if handle == target => {
                    self.set_child(current, index, None);
                    self.free_node(child);
                    self.prune_empty(current, &mut path);
                    return DeleteOutcome::Removed;
                }
                NodeKind::Leaf(_) => {
                    log::debug!(
                        "Evicted voxel at {:?} (size {}) already superseded",
                        position,
                        eviction.size()
                    );
                    return DeleteOutcome::Superseded;
                }
                NodeKind::Branch(_) => {
                    path.push((current, index));
                    current = child;
                }
                NodeKind::Vacant => return DeleteOutcome::NotFound,
            }
        }
    }

    /// Record of the leaf covering `(x, y, z)` at depth `max_depth` or coarser
    ///
    /// Read-only. Returns `None` for coordinates outside the root cube, for
    /// empty space, and when only finer leaves than `max_depth` cover it.
    pub fn find<'a>(
        &self,
        arena: &'a VoxelArena,
        x: u32,
        y: u32,
        z: u32,
        max_depth: u8,
    ) -> Option<&'a VoxelRecord> {
        if !self.contains_coord(x, y, z) {
            return None;
        }

        let mut current = ROOT;
        loop {
            let node = &self.nodes[current.index()];
            match &node.kind {
                NodeKind::Leaf(handle) => return arena.get(*handle),
                NodeKind::Branch(children) => {
                    if node.depth <= max_depth {
                        return None;
                    }
                    let index = child_index(x, y, z, node.depth);
                    match children[index] {
                        Some(child) => current = child,
                        None => return self.run_covering(arena, children, index, x, y, z),
                    }
                }
                NodeKind::Vacant => return None,
            }
        }
    }

    /// Record of a z-merged sibling run covering the empty child `index`
    fn run_covering<'a>(
        &self,
        arena: &'a VoxelArena,
        children: &[Option<NodeId>; 8],
        index: usize,
        x: u32,
        y: u32,
        z: u32,
    ) -> Option<&'a VoxelRecord> {
        if index & 1 == 0 {
            return None;
        }
        let partner = children[index & !1]?;
        let record = arena.get(self.nodes[partner.index()].handle()?)?;
        record
            .contains(IVec3::new(x as i32, y as i32, z as i32))
            .then_some(record)
    }

    /// Free `branch` and its ancestors while they have no children left
    ///
    /// `path` holds `(parent, child index)` pairs from the root down to
    /// `branch`'s parent. The root is never freed.
    fn prune_empty(&mut self, mut branch: NodeId, path: &mut Vec<(NodeId, usize)>) {
        while branch != ROOT && self.nodes[branch.index()].child_count() == 0 {
            let Some((parent, index)) = path.pop() else {
                break;
            };
            self.set_child(parent, index, None);
            self.free_node(branch);
            branch = parent;
        }
    }

    fn has_full_leaf_set(&self, id: NodeId) -> bool {
        self.nodes[id.index()].children().is_some_and(|children| {
            children
                .iter()
                .all(|child| child.is_some_and(|c| self.nodes[c.index()].is_leaf()))
        })
    }

    /// Replace a branch of 8 leaves by one leaf of the branch's size
    fn collapse(
        &mut self,
        arena: &mut VoxelArena,
        branch: NodeId,
        x: u32,
        y: u32,
        z: u32,
        tally: &mut Tally,
    ) {
        let node = self.nodes[branch.index()];
        let NodeKind::Branch(children) = node.kind else {
            return;
        };

        for child in children.into_iter().flatten() {
            if let Some(handle) = self.nodes[child.index()].handle() {
                arena.release(handle);
            }
            self.free_node(child);
        }
        self.nodes[branch.index()] = OctreeNode::branch(node.depth);

        let acquired = arena.acquire();
        if let Some(eviction) = acquired.evicted {
            self.service_eviction(&eviction, tally);
        }
        arena.write(acquired.handle, VoxelRecord::at_depth(x, y, z, node.depth));
        self.nodes[branch.index()] = OctreeNode::leaf(node.depth, acquired.handle);

        log::trace!(
            "Compacted depth-{} branch at {:?}",
            node.depth,
            VoxelRecord::at_depth(x, y, z, node.depth).position
        );
    }

    fn service_eviction(&mut self, eviction: &Eviction, tally: &mut Tally) {
        match self.delete(eviction) {
            DeleteOutcome::Removed => tally.evicted += 1,
            DeleteOutcome::Superseded | DeleteOutcome::NotFound => tally.superseded += 1,
        }
    }

    fn alloc(&mut self, node: OctreeNode) -> NodeId {
        if let Some(id) = self.free_nodes.pop() {
            self.nodes[id.index()] = node;
            id
        } else {
            let id = NodeId(self.nodes.len() as u32);
            self.nodes.push(node);
            id
        }
    }

    /// Return a node to the pool
    pub(crate) fn free_node(&mut self, id: NodeId) {
        debug_assert_ne!(id, ROOT, "root is never freed");
        self.nodes[id.index()].kind = NodeKind::Vacant;
        self.free_nodes.push(id);
    }

    pub(crate) fn set_child(&mut self, parent: NodeId, index: usize, child: Option<NodeId>) {
        if let NodeKind::Branch(children) = &mut self.nodes[parent.index()].kind {
            children[index] = child;
        }
    }

    /// Visit every reachable node in pre-order with its minimum corner
    pub fn visit<F: FnMut(NodeId, &OctreeNode, [u32; 3])>(&self, mut f: F) {
        let mut stack = vec![(ROOT, [0u32; 3])];
        while let Some((id, origin)) = stack.pop() {
            let node = &self.nodes[id.index()];
            f(id, node, origin);

            if let NodeKind::Branch(children) = &node.kind {
                let half = node.size() >> 1;
                for (index, child) in children.iter().enumerate().rev() {
                    if let Some(child) = child {
                        let [ox, oy, oz] = child_octant(index);
                        stack.push((
                            *child,
                            [origin[0] + ox * half, origin[1] + oy * half, origin[2] + oz * half],
                        ));
                    }
                }
            }
        }
    }

    /// All reachable leaves in pre-order
    pub fn leaves(&self) -> Vec<LeafRef> {
        let mut leaves = Vec::new();
        self.visit(|id, node, origin| {
            if let NodeKind::Leaf(handle) = node.kind {
                leaves.push(LeafRef {
                    node: id,
                    depth: node.depth,
                    handle,
                    origin,
                });
            }
        });
        leaves
    }

    /// All reachable branches in pre-order
    pub fn branches(&self) -> Vec<NodeId> {
        let mut branches = Vec::new();
        self.visit(|id, node, _| {
            if node.is_branch() {
                branches.push(id);
            }
        });
        branches
    }

    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        self.visit(|_, node, _| count += node.is_leaf() as usize);
        count
    }

    /// Snapshot iterator over the records of all leaves, hidden ones included
    pub fn records<'a>(&'a self, arena: &'a VoxelArena) -> Records<'a> {
        Records {
            octree: self,
            arena,
            stack: vec![ROOT],
        }
    }

    /// Check that every leaf agrees with the arena
    ///
    /// Each reachable leaf must hold a current handle whose record sits at the
    /// leaf's corner with the leaf's size, no branch may hold 8 leaves, only
    /// the root may be an empty branch, and
    /// the arena's live count must equal the leaf count. Returns the number
    /// of leaves.
    pub fn validate(&self, arena: &VoxelArena) -> Result<usize> {
        let mut seen = HashSet::new();
        let mut problem = None;

        self.visit(|id, node, origin| {
            if problem.is_some() {
                return;
            }
            match &node.kind {
                NodeKind::Vacant => {
                    problem = Some(format!("vacant node {} reachable at {:?}", id.index(), origin));
                }
                NodeKind::Branch(children) => {
                    if id != ROOT && node.child_count() == 0 {
                        problem = Some(format!("empty branch left at {:?}", origin));
                    }
                    let mut leaf_children = 0;
                    for child in children.iter().flatten() {
                        let child_node = &self.nodes[child.index()];
                        if child_node.depth + 1 != node.depth {
                            problem = Some(format!(
                                "depth-{} node under depth-{} branch at {:?}",
                                child_node.depth, node.depth, origin
                            ));
                        }
                        leaf_children += child_node.is_leaf() as usize;
                    }
                    if leaf_children == 8 {
                        problem = Some(format!("uncompacted branch at {:?}", origin));
                    }
                }
                NodeKind::Leaf(handle) => {
                    let Some(record) = arena.get(*handle) else {
                        problem = Some(format!(
                            "leaf at {:?} references reclaimed slot {}",
                            origin,
                            handle.index()
                        ));
                        return;
                    };
                    if !seen.insert(*handle) {
                        problem = Some(format!("slot {} shared by two leaves", handle.index()));
                        return;
                    }
                    let expected = IVec3::new(origin[0] as i32, origin[1] as i32, origin[2] as i32);
                    if record.position != expected {
                        problem = Some(format!(
                            "leaf at {:?} holds record at {:?}",
                            origin, record.position
                        ));
                        return;
                    }
                    let d = node.depth;
                    let extent = record.log2_extent();
                    let merged_run = extent == [d, d, d + 1] && origin[2] % (2 << d) == 0;
                    if extent != [d, d, d] && !merged_run {
                        problem = Some(format!(
                            "depth-{} leaf at {:?} holds extent {:?}",
                            d, origin, extent
                        ));
                    }
                }
            }
        });

        if let Some(problem) = problem {
            return Err(Error::Inconsistent(problem));
        }
        if seen.len() != arena.live_count() {
            return Err(Error::Inconsistent(format!(
                "arena holds {} live records but tree has {} leaves",
                arena.live_count(),
                seen.len()
            )));
        }
        Ok(seen.len())
    }

    /// Indented listing of the tree, one node per line
    pub fn dump(&self, arena: &VoxelArena) -> String {
        let mut out = String::new();
        self.visit(|_, node, origin| {
            let indent = (self.root_depth - node.depth) as usize;
            let _ = match &node.kind {
                NodeKind::Branch(_) => writeln!(out, "{:indent$}node: {}", "", node.depth),
                NodeKind::Leaf(handle) => match arena.get(*handle) {
                    Some(record) => writeln!(
                        out,
                        "{:indent$}leaf: {}, {:#010x} ({}, {}, {})",
                        "",
                        node.depth,
                        record.scale,
                        record.position.x,
                        record.position.y,
                        record.position.z
                    ),
                    None => writeln!(out, "{:indent$}leaf: {}, stale {:?}", "", node.depth, origin),
                },
                NodeKind::Vacant => writeln!(out, "{:indent$}(vacant)", ""),
            };
        });
        out
    }
}

/// Iterator over leaf records, see [`Octree::records`]
pub struct Records<'a> {
    octree: &'a Octree,
    arena: &'a VoxelArena,
    stack: Vec<NodeId>,
}

impl Iterator for Records<'_> {
    type Item = VoxelRecord;

    fn next(&mut self) -> Option<VoxelRecord> {
        while let Some(id) = self.stack.pop() {
            match &self.octree.nodes[id.index()].kind {
                NodeKind::Leaf(handle) => {
                    if let Some(record) = self.arena.get(*handle) {
                        return Some(*record);
                    }
                }
                NodeKind::Branch(children) => self.stack.extend(children.iter().rev().flatten()),
                NodeKind::Vacant => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(root_depth: u8, capacity: usize) -> (Octree, VoxelArena) {
        (Octree::new(root_depth), VoxelArena::new(capacity))
    }

    #[test]
    fn test_new() {
        let octree = Octree::new(4);
        assert_eq!(octree.root_depth(), 4);
        assert_eq!(octree.extent(), 16);
        assert_eq!(octree.node_count(), 1);
        assert!(octree.is_empty());
    }

    #[test]
    #[should_panic(expected = "Root depth")]
    fn test_zero_root_depth_panics() {
        Octree::new(0);
    }

    #[test]
    fn test_insert_then_find_unit() {
        let (mut octree, mut arena) = setup(4, 64);
        let outcome = octree.insert(&mut arena, 5, 9, 14).unwrap();
        assert_eq!(
            outcome,
            InsertOutcome::Inserted { evicted: 0, superseded: 0, compacted: 0 }
        );

        let record = octree.find(&arena, 5, 9, 14, 0).expect("inserted voxel");
        assert_eq!(record.position, IVec3::new(5, 9, 14));
        assert_eq!(record.size(), 1);
        assert!(octree.find(&arena, 5, 9, 13, 0).is_none());

        // Root, 3 lazily created branches, 1 leaf
        assert_eq!(octree.node_count(), 5);
        assert_eq!(octree.validate(&arena).unwrap(), 1);
    }

    #[test]
    fn test_insert_duplicate_is_noop() {
        let (mut octree, mut arena) = setup(3, 64);
        octree.insert(&mut arena, 1, 1, 1).unwrap();
        let nodes = octree.node_count();
        assert_eq!(octree.insert(&mut arena, 1, 1, 1).unwrap(), InsertOutcome::AlreadyPresent);
        assert_eq!(octree.node_count(), nodes);
        assert_eq!(arena.live_count(), 1);
    }

    #[test]
    fn test_insert_out_of_bounds_leaves_tree_untouched() {
        let (mut octree, mut arena) = setup(3, 64);
        let err = octree.insert(&mut arena, 8, 0, 0).unwrap_err();
        assert!(matches!(err, Error::OutOfBounds { x: 8, extent: 8, .. }));
        assert!(octree.is_empty());
        assert_eq!(octree.node_count(), 1);
        assert_eq!(arena.live_count(), 0);
    }

    #[test]
    fn test_find_respects_max_depth() {
        let (mut octree, mut arena) = setup(3, 64);
        octree.insert(&mut arena, 2, 2, 2).unwrap();
        assert!(octree.find(&arena, 2, 2, 2, 0).is_some());
        // Only a depth-0 leaf covers it, so coarser lookups miss
        assert!(octree.find(&arena, 2, 2, 2, 1).is_none());
        assert!(octree.find(&arena, 2, 2, 2, 3).is_none());
    }

    #[test]
    fn test_find_does_not_mutate() {
        let (mut octree, mut arena) = setup(5, 64);
        octree.insert(&mut arena, 0, 0, 0).unwrap();
        let nodes = octree.node_count();
        for x in 0..32 {
            octree.find(&arena, x, 31 - x, x / 2, 0);
        }
        assert!(octree.find(&arena, 40, 0, 0, 0).is_none());
        assert_eq!(octree.node_count(), nodes);
    }

    #[test]
    fn test_eight_leaves_collapse() {
        let (mut octree, mut arena) = setup(3, 64);
        let mut compacted = 0;
        for i in 0..8u32 {
            let (x, y, z) = (2 + (i >> 2 & 1), 4 + (i >> 1 & 1), 6 + (i & 1));
            if let InsertOutcome::Inserted { compacted: c, .. } = octree.insert(&mut arena, x, y, z).unwrap() {
                compacted += c;
            }
        }
        assert_eq!(compacted, 1);
        assert_eq!(arena.live_count(), 1);

        let record = octree.find(&arena, 3, 5, 7, 0).expect("merged leaf");
        assert_eq!(record.position, IVec3::new(2, 4, 6));
        assert_eq!(record.size(), 2);
        // Visible at the merged depth too
        assert_eq!(octree.find(&arena, 2, 4, 6, 1), Some(record));
        assert_eq!(octree.insert(&mut arena, 2, 5, 7).unwrap(), InsertOutcome::AlreadyPresent);
        octree.validate(&arena).unwrap();
    }

    #[test]
    fn test_compaction_cascades_to_root() {
        let (mut octree, mut arena) = setup(2, 256);
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    octree.insert(&mut arena, x, y, z).unwrap();
                }
            }
        }
        assert!(octree.root().is_leaf());
        assert_eq!(octree.node_count(), 1);
        assert_eq!(arena.live_count(), 1);

        let record = octree.find(&arena, 3, 0, 2, 0).unwrap();
        assert_eq!(record.size(), 4);
        assert_eq!(record.position, IVec3::ZERO);
        assert_eq!(octree.validate(&arena).unwrap(), 1);
    }

    #[test]
    fn test_cascade_after_coarse_siblings() {
        let (mut octree, mut arena) = setup(3, 1024);
        // Fill seven 2x2x2 octants of the lower 4x4x4 cube, then the last one
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    octree.insert(&mut arena, x, y, z).unwrap();
                }
            }
        }
        let record = octree.find(&arena, 1, 2, 3, 0).unwrap();
        assert_eq!(record.size(), 4);
        assert_eq!(octree.find(&arena, 0, 0, 0, 2), Some(record));
        assert!(!octree.root().is_leaf());
    }

    #[test]
    fn test_eviction_removes_oldest_leaf() {
        let (mut octree, mut arena) = setup(4, 4);
        let coords = [(0, 0, 0), (2, 0, 0), (4, 0, 0), (6, 0, 0)];
        for &(x, y, z) in &coords {
            octree.insert(&mut arena, x, y, z).unwrap();
        }

        let outcome = octree.insert(&mut arena, 8, 0, 0).unwrap();
        assert_eq!(
            outcome,
            InsertOutcome::Inserted { evicted: 1, superseded: 0, compacted: 0 }
        );
        assert!(octree.find(&arena, 0, 0, 0, 0).is_none());
        assert!(octree.find(&arena, 8, 0, 0, 0).is_some());
        for &(x, y, z) in &coords[1..] {
            assert!(octree.find(&arena, x, y, z, 0).is_some());
        }
        assert_eq!(octree.validate(&arena).unwrap(), 4);
    }

    #[test]
    fn test_eviction_inside_filling_octant_blocks_collapse() {
        // Seven slots: the eighth voxel of the cube evicts one of the others
        let (mut octree, mut arena) = setup(1, 7);
        for i in 0..8u32 {
            octree.insert(&mut arena, i >> 2 & 1, i >> 1 & 1, i & 1).unwrap();
        }
        assert!(!octree.root().is_leaf());
        let found = (0..8u32)
            .filter(|i| octree.find(&arena, i >> 2 & 1, i >> 1 & 1, i & 1, 0).is_some())
            .count();
        assert_eq!(found, 7);
        assert!(octree.find(&arena, 1, 1, 1, 0).is_some());
        assert_eq!(octree.validate(&arena).unwrap(), 7);
    }

    #[test]
    fn test_delete_removes_evicted_leaf_once() {
        let (mut octree, mut arena) = setup(2, 1);
        octree.insert(&mut arena, 0, 0, 0).unwrap();

        // Reclaim the only slot by hand; the tree still holds the old handle
        let acquired = arena.acquire();
        let eviction = acquired.evicted.unwrap();
        arena.write(acquired.handle, VoxelRecord::unit(0, 0, 0));

        assert_eq!(octree.delete(&eviction), DeleteOutcome::Removed);
        assert_eq!(octree.delete(&eviction), DeleteOutcome::NotFound);
    }

    #[test]
    fn test_eviction_prunes_emptied_branches() {
        let (mut octree, mut arena) = setup(3, 1);
        octree.insert(&mut arena, 0, 0, 0).unwrap();
        // Root, two branches and the leaf
        assert_eq!(octree.node_count(), 4);

        // The only slot is reclaimed; the old path is freed before the new one is built
        let outcome = octree.insert(&mut arena, 7, 7, 7).unwrap();
        assert_eq!(
            outcome,
            InsertOutcome::Inserted { evicted: 1, superseded: 0, compacted: 0 }
        );
        assert_eq!(octree.node_count(), 4);
        assert!(octree.find(&arena, 0, 0, 0, 0).is_none());
        assert_eq!(octree.root().child_count(), 1);
        assert_eq!(octree.validate(&arena).unwrap(), 1);
    }

    #[test]
    fn test_eviction_keeps_shared_ancestors() {
        let (mut octree, mut arena) = setup(3, 2);
        octree.insert(&mut arena, 0, 0, 0).unwrap();
        octree.insert(&mut arena, 2, 0, 0).unwrap();
        // Evicts (0, 0, 0); its depth-1 branch goes, the depth-2 branch stays
        octree.insert(&mut arena, 1, 1, 0).unwrap();

        assert!(octree.find(&arena, 2, 0, 0, 0).is_some());
        assert!(octree.find(&arena, 1, 1, 0, 0).is_some());
        assert_eq!(octree.validate(&arena).unwrap(), 2);
        // Root, depth-2 branch, two depth-1 branches, two leaves
        assert_eq!(octree.node_count(), 6);
    }

    #[test]
    fn test_delete_does_not_touch_newer_leaf() {
        let (mut octree, mut arena) = setup(2, 2);
        octree.insert(&mut arena, 1, 1, 1).unwrap();
        let first = octree.leaves()[0].handle;

        // Evict and reinsert the same coordinate through the tree
        let acquired = arena.acquire();
        arena.write(acquired.handle, VoxelRecord::unit(3, 3, 3));
        let stale = arena.acquire().evicted.expect("slot 0 reclaimed");
        assert_eq!(stale.handle(), first);
        assert_eq!(octree.delete(&stale), DeleteOutcome::Removed);
        arena.release(acquired.handle);

        octree.insert(&mut arena, 1, 1, 1).unwrap();
        assert_eq!(octree.delete(&stale), DeleteOutcome::Superseded);
        assert!(octree.find(&arena, 1, 1, 1, 0).is_some());
    }

    #[test]
    fn test_root_leaf_eviction_resets_root() {
        let mut octree = Octree::new(1);
        let mut arena = VoxelArena::with_probe_limit(9, 0);
        for i in 0..8u32 {
            octree.insert(&mut arena, i >> 2 & 1, i >> 1 & 1, i & 1).unwrap();
        }
        assert!(octree.root().is_leaf());

        let root_handle = octree.root().handle().unwrap();
        // Without probing, the cursor walks every slot in turn
        let eviction = loop {
            let acquired = arena.acquire();
            arena.write(acquired.handle, VoxelRecord::unit(0, 0, 0));
            if let Some(eviction) = acquired.evicted {
                if eviction.handle() == root_handle {
                    break eviction;
                }
            }
        };
        assert_eq!(octree.delete(&eviction), DeleteOutcome::Removed);
        assert!(octree.is_empty());
    }

    #[test]
    fn test_records_iterates_all_leaves() {
        let (mut octree, mut arena) = setup(3, 64);
        octree.insert(&mut arena, 7, 0, 0).unwrap();
        octree.insert(&mut arena, 0, 7, 0).unwrap();
        octree.insert(&mut arena, 0, 0, 7).unwrap();

        let records: Vec<_> = octree.records(&arena).collect();
        assert_eq!(records.len(), 3);
        // Pre-order follows child index order: z bit, then y, then x
        assert_eq!(records[0].position, IVec3::new(0, 0, 7));
        assert_eq!(records[2].position, IVec3::new(7, 0, 0));

        // Restartable
        assert_eq!(octree.records(&arena).count(), 3);
    }

    #[test]
    fn test_dump_lists_nodes() {
        let (mut octree, mut arena) = setup(1, 8);
        octree.insert(&mut arena, 1, 0, 1).unwrap();
        let dump = octree.dump(&arena);
        assert_eq!(dump, "node: 1\n leaf: 0, 0x00000001 (1, 0, 1)\n");
    }
}
