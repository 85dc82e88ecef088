use std::fmt;

use crate::address_space::SpaceId;

/// One virtual-to-physical mapping: a page-table row or a lookaside slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationEntry {
    /// Page this entry maps. Only consulted in lookaside mode; in a page
    /// table it mirrors the row index.
    pub virtual_page: u32,
    /// Meaningful only while `valid`.
    pub physical_frame: u32,
    pub valid: bool,
    pub read_only: bool,
    pub dirty: bool,
    pub referenced: bool,
    /// Successful translations since the last swap-in.
    pub reference_count: u64,
    /// Admission order of the current residency; 0 when not resident.
    pub allocation_id: u64,
    /// Sector holding the page's contents while it is swapped out.
    pub disk_sector: Option<u32>,
}

impl TranslationEntry {
    /// An inert entry for `virtual_page`: not resident, nothing on disk.
    pub fn new(virtual_page: u32) -> Self {
        TranslationEntry {
            virtual_page,
            ..Default::default()
        }
    }

    /// A resident mapping, as written by a software lookaside refill.
    pub fn mapped(virtual_page: u32, physical_frame: u32, read_only: bool) -> Self {
        TranslationEntry {
            virtual_page,
            physical_frame,
            valid: true,
            read_only,
            ..Default::default()
        }
    }

    /// Record a successful translation.
    pub(crate) fn touch(&mut self, writing: bool) {
        if writing {
            self.dirty = true;
        }
        self.referenced = true;
        self.reference_count += 1;
    }
}

/// Handle naming a page-table entry: which address space, which row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryRef {
    pub space: SpaceId,
    pub virtual_page: u32,
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:vpn {:#x}", self.space, self.virtual_page)
    }
}
