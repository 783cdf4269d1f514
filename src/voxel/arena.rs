//! Voxel arena - fixed-capacity ring buffer of voxel records
//!
//! The arena owns all voxel storage for a volume:
//! - Capacity is fixed at construction and never grows
//! - Slots are handed out by scanning forward from a cursor for free entries
//! - When the probe window finds nothing free, the slot under the cursor is
//!   taken anyway and its previous owner is reported as an [`Eviction`]
//!
//! Every hand-out bumps the slot's generation, so a [`SlotHandle`] kept by an
//! octree leaf goes stale the moment its slot is reused.

use glam::IVec3;

use super::voxel::VoxelRecord;

/// Free-slot probes before the cursor slot is taken regardless
pub const DEFAULT_PROBE_LIMIT: usize = 128;

/// Arena capacity used when none is configured (128^3 slots)
pub const DEFAULT_ARENA_CAPACITY: usize = 128 * 128 * 128;

/// Generation-checked reference to an arena slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    index: u32,
    generation: u32,
}

impl SlotHandle {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A live voxel that was reclaimed to satisfy an acquisition
///
/// Only the arena creates these. The owner of the octree must remove the
/// leaf holding [`Eviction::handle`] before it writes into the new slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Eviction {
    handle: SlotHandle,
    record: VoxelRecord,
}

impl Eviction {
    /// Handle the evicted leaf was holding (now stale)
    pub fn handle(&self) -> SlotHandle {
        self.handle
    }

    /// Record contents at the moment of eviction
    pub fn record(&self) -> &VoxelRecord {
        &self.record
    }

    pub fn position(&self) -> IVec3 {
        self.record.position
    }

    pub fn size(&self) -> u32 {
        self.record.size()
    }
}

/// Result of [`VoxelArena::acquire`]
#[derive(Clone, Copy, Debug)]
pub struct Acquired {
    pub handle: SlotHandle,
    pub evicted: Option<Eviction>,
}

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    record: VoxelRecord,
    generation: u32,
}

/// Fixed-capacity circular voxel storage
#[derive(Clone, Debug)]
pub struct VoxelArena {
    slots: Vec<Slot>,
    /// Next slot to probe
    cursor: usize,
    /// Maximum free-slot probes per acquisition
    probe_limit: usize,
    /// Number of slots with EXISTS set
    live: usize,
}

impl VoxelArena {
    /// Create an arena with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self::with_probe_limit(capacity, DEFAULT_PROBE_LIMIT)
    }

    /// Create an arena with a custom probe window
    pub fn with_probe_limit(capacity: usize, probe_limit: usize) -> Self {
        assert!(capacity > 0, "Arena capacity must be non-zero");
        assert!(capacity <= u32::MAX as usize, "Arena capacity exceeds slot index range");

        log::debug!(
            "Created voxel arena: {} slots, {}KB",
            capacity,
            capacity * std::mem::size_of::<VoxelRecord>() / 1024
        );

        Self {
            slots: vec![Slot::default(); capacity],
            cursor: 0,
            probe_limit,
            live: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn probe_limit(&self) -> usize {
        self.probe_limit
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of slots currently holding a live voxel
    pub fn live_count(&self) -> usize {
        self.live
    }

    pub fn is_full(&self) -> bool {
        self.live == self.slots.len()
    }

    /// Hand out a slot, evicting its occupant if no free slot is in reach
    ///
    /// Never fails. The returned slot is reserved but empty (EXISTS clear)
    /// until [`VoxelArena::write`] fills it.
    pub fn acquire(&mut self) -> Acquired {
        let capacity = self.slots.len();
        let mut index = self.cursor;
        let mut attempts = 0;

        while self.slots[index].record.exists() && attempts < self.probe_limit {
            index = (index + 1) % capacity;
            attempts += 1;
        }

        let slot = &mut self.slots[index];
        let evicted = if slot.record.exists() {
            let eviction = Eviction {
                handle: SlotHandle {
                    index: index as u32,
                    generation: slot.generation,
                },
                record: slot.record,
            };
            slot.record.clear_flags();
            Some(eviction)
        } else {
            None
        };

        slot.generation = slot.generation.wrapping_add(1);
        let handle = SlotHandle {
            index: index as u32,
            generation: slot.generation,
        };

        if let Some(eviction) = &evicted {
            self.live -= 1;
            log::trace!(
                "Evicted voxel at {:?} (size {}) from slot {}",
                eviction.position(),
                eviction.size(),
                index
            );
        }

        self.cursor = (index + 1) % capacity;
        Acquired { handle, evicted }
    }

    /// Overwrite the slot behind `handle`
    ///
    /// Returns false and leaves the slot untouched if the handle is stale.
    pub fn write(&mut self, handle: SlotHandle, record: VoxelRecord) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        let was_live = slot.record.exists();
        slot.record = record;
        let is_live = record.exists();
        self.adjust_live(was_live, is_live);
        true
    }

    /// Mark the slot free, keeping its stale geometry
    pub fn release(&mut self, handle: SlotHandle) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        if !slot.record.exists() {
            return false;
        }
        slot.record.clear_flags();
        self.live -= 1;
        true
    }

    /// Live record behind `handle`, if the handle is current
    pub fn get(&self, handle: SlotHandle) -> Option<&VoxelRecord> {
        let slot = self.slots.get(handle.index())?;
        (slot.generation == handle.generation && slot.record.exists()).then_some(&slot.record)
    }

    /// Edit a live record in place
    pub fn update<F: FnOnce(&mut VoxelRecord)>(&mut self, handle: SlotHandle, f: F) -> bool {
        let Some(slot) = self.slot_mut(handle) else {
            return false;
        };
        if !slot.record.exists() {
            return false;
        }
        f(&mut slot.record);
        let is_live = slot.record.exists();
        self.adjust_live(true, is_live);
        true
    }

    fn slot_mut(&mut self, handle: SlotHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index())
            .filter(|slot| slot.generation == handle.generation)
    }

    fn adjust_live(&mut self, was_live: bool, is_live: bool) {
        match (was_live, is_live) {
            (false, true) => self.live += 1,
            (true, false) => self.live -= 1,
            _ => {}
        }
    }
}
