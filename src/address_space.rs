use std::fmt;

use crate::config::SpaceConfig;
use crate::entry::{EntryRef, TranslationEntry};
use crate::tlb::Lookaside;

/// Handle to an address space held by a `VmManager`. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(pub u32);

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "space {}", self.0)
    }
}

/// The translation structure of an address space. Exactly one is present.
#[derive(Debug, Clone)]
pub enum Translation {
    PageTable(Vec<TranslationEntry>),
    Lookaside(Lookaside),
}

/// Where a translation found its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySlot {
    Page(u32),
    Cache(usize),
}

#[derive(Debug, Clone)]
pub struct AddressSpace {
    translation: Translation,
}

impl AddressSpace {
    pub fn new(config: SpaceConfig) -> Self {
        let translation = match config {
            SpaceConfig::PageTable { pages } => {
                Translation::PageTable((0..pages as u32).map(TranslationEntry::new).collect())
            }
            SpaceConfig::Lookaside { size } => Translation::Lookaside(Lookaside::new(size)),
        };
        AddressSpace { translation }
    }

    pub fn translation(&self) -> &Translation {
        &self.translation
    }

    pub fn page_table(&self) -> Option<&[TranslationEntry]> {
        match &self.translation {
            Translation::PageTable(table) => Some(table.as_slice()),
            Translation::Lookaside(_) => None,
        }
    }

    pub fn page_table_mut(&mut self) -> Option<&mut [TranslationEntry]> {
        match &mut self.translation {
            Translation::PageTable(table) => Some(table.as_mut_slice()),
            Translation::Lookaside(_) => None,
        }
    }

    pub fn lookaside(&self) -> Option<&Lookaside> {
        match &self.translation {
            Translation::Lookaside(tlb) => Some(tlb),
            Translation::PageTable(_) => None,
        }
    }

    pub fn lookaside_mut(&mut self) -> Option<&mut Lookaside> {
        match &mut self.translation {
            Translation::Lookaside(tlb) => Some(tlb),
            Translation::PageTable(_) => None,
        }
    }

    pub fn entry(&self, slot: EntrySlot) -> &TranslationEntry {
        match (&self.translation, slot) {
            (Translation::PageTable(table), EntrySlot::Page(vpn)) => &table[vpn as usize],
            (Translation::Lookaside(tlb), EntrySlot::Cache(i)) => tlb.get(i),
            (_, slot) => panic!("{slot:?} does not match the address space's translation mode"),
        }
    }

    pub fn entry_mut(&mut self, slot: EntrySlot) -> &mut TranslationEntry {
        match (&mut self.translation, slot) {
            (Translation::PageTable(table), EntrySlot::Page(vpn)) => &mut table[vpn as usize],
            (Translation::Lookaside(tlb), EntrySlot::Cache(i)) => tlb.get_mut(i),
            (_, slot) => panic!("{slot:?} does not match the address space's translation mode"),
        }
    }
}

/// Owner of every live address space; page-table entries are reached
/// through `EntryRef` handles rather than references.
#[derive(Debug, Default)]
pub struct SpaceArena {
    spaces: Vec<Option<AddressSpace>>,
}

impl SpaceArena {
    pub fn insert(&mut self, space: AddressSpace) -> SpaceId {
        self.spaces.push(Some(space));
        SpaceId(self.spaces.len() as u32 - 1)
    }

    pub fn remove(&mut self, id: SpaceId) -> Option<AddressSpace> {
        self.spaces.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn get(&self, id: SpaceId) -> Option<&AddressSpace> {
        self.spaces.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SpaceId) -> Option<&mut AddressSpace> {
        self.spaces.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Live spaces in id order.
    pub fn iter(&self) -> impl Iterator<Item = (SpaceId, &AddressSpace)> + '_ {
        self.spaces
            .iter()
            .enumerate()
            .filter_map(|(i, space)| space.as_ref().map(|s| (SpaceId(i as u32), s)))
    }

    /// # Panics
    ///
    /// If the handle names a destroyed space or a page outside its table.
    pub fn entry(&self, owner: EntryRef) -> &TranslationEntry {
        self.get(owner.space)
            .and_then(AddressSpace::page_table)
            .and_then(|table| table.get(owner.virtual_page as usize))
            .unwrap_or_else(|| panic!("stale entry handle {owner}"))
    }

    pub fn entry_mut(&mut self, owner: EntryRef) -> &mut TranslationEntry {
        self.get_mut(owner.space)
            .and_then(AddressSpace::page_table_mut)
            .and_then(|table| table.get_mut(owner.virtual_page as usize))
            .unwrap_or_else(|| panic!("stale entry handle {owner}"))
    }
}
