use crate::entry::TranslationEntry;

/// Small fully-associative translation cache.
///
/// Refills are software-managed: the translator only looks entries up and
/// reports a miss, it never loads a slot itself.
#[derive(Debug, Clone)]
pub struct Lookaside {
    slots: Vec<TranslationEntry>,
}

impl Lookaside {
    pub fn new(size: usize) -> Self {
        Lookaside {
            slots: vec![TranslationEntry::default(); size],
        }
    }

    /// Index of the first valid slot mapping `virtual_page`.
    pub fn lookup(&self, virtual_page: u32) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.valid && slot.virtual_page == virtual_page)
    }

    /// Overwrite `slot` with `entry`.
    pub fn load(&mut self, slot: usize, entry: TranslationEntry) {
        self.slots[slot] = entry;
    }

    /// Drop every valid mapping of `virtual_page`; returns how many were dropped.
    pub fn invalidate(&mut self, virtual_page: u32) -> usize {
        let mut dropped = 0;
        for slot in self.slots.iter_mut() {
            if slot.valid && slot.virtual_page == virtual_page {
                slot.valid = false;
                dropped += 1;
            }
        }
        dropped
    }

    /// Invalidate every slot, e.g. on a context switch.
    pub fn flush(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.valid = false;
        }
    }

    pub fn get(&self, slot: usize) -> &TranslationEntry {
        &self.slots[slot]
    }

    pub fn get_mut(&mut self, slot: usize) -> &mut TranslationEntry {
        &mut self.slots[slot]
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
