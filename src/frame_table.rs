use crate::entry::EntryRef;

/// Reverse mapping from physical frame to the entry occupying it.
#[derive(Debug, Clone)]
pub struct ReverseFrameTable {
    slots: Vec<Option<EntryRef>>,
}

impl ReverseFrameTable {
    pub fn new(num_frames: usize) -> Self {
        ReverseFrameTable {
            slots: vec![None; num_frames],
        }
    }

    pub fn get(&self, frame: u32) -> Option<EntryRef> {
        self.slots[frame as usize]
    }

    /// Record `owner` as the occupant of `frame`. The slot must be empty.
    pub fn register(&mut self, frame: u32, owner: EntryRef) {
        let slot = &mut self.slots[frame as usize];
        assert!(
            slot.is_none(),
            "frame {frame} already owned by {}",
            slot.map(|o| o.to_string()).unwrap_or_default()
        );
        *slot = Some(owner);
    }

    pub fn clear(&mut self, frame: u32) -> Option<EntryRef> {
        self.slots[frame as usize].take()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn resident_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Occupied slots in ascending frame order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, EntryRef)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(frame, slot)| slot.map(|owner| (frame as u32, owner)))
    }
}
