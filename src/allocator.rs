use std::collections::VecDeque;

/// Outcome of asking a pool for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Allocation {
    Granted(u32),
    Exhausted,
}

/// FIFO pool of free identifiers.
#[derive(Debug, Clone, Default)]
pub struct FreeList {
    free: VecDeque<u32>,
}

impl FreeList {
    /// A pool holding `0..count` in ascending order.
    pub fn with_range(count: usize) -> Self {
        FreeList {
            free: (0..count as u32).collect(),
        }
    }

    pub fn pop(&mut self) -> Allocation {
        match self.free.pop_front() {
            Some(id) => Allocation::Granted(id),
            None => Allocation::Exhausted,
        }
    }

    pub fn push(&mut self, id: u32) {
        debug_assert!(!self.free.contains(&id), "id {id} released twice");
        self.free.push_back(id);
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.free.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.free.iter().copied()
    }
}

/// The process-wide pools of free physical frames and free swap sectors.
#[derive(Debug, Clone)]
pub struct ResourceAllocator {
    frames: FreeList,
    sectors: FreeList,
}

impl ResourceAllocator {
    pub fn new(num_frames: usize, num_sectors: usize) -> Self {
        ResourceAllocator {
            frames: FreeList::with_range(num_frames),
            sectors: FreeList::with_range(num_sectors),
        }
    }

    pub fn pop_free_frame(&mut self) -> Allocation {
        self.frames.pop()
    }

    pub fn push_free_frame(&mut self, frame: u32) {
        self.frames.push(frame);
    }

    pub fn pop_free_sector(&mut self) -> Allocation {
        self.sectors.pop()
    }

    pub fn push_free_sector(&mut self, sector: u32) {
        self.sectors.push(sector);
    }

    pub fn free_frames(&self) -> &FreeList {
        &self.frames
    }

    pub fn free_sectors(&self) -> &FreeList {
        &self.sectors
    }
}
