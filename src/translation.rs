use std::fmt;

use log::debug;

use crate::address_space::EntrySlot;
use crate::allocator::Allocation;
use crate::entry::EntryRef;
use crate::error::Exception;
use crate::eviction::find_victim;
use crate::swap;
use crate::vm_manager::VmManager;

/// Represents the decomposed components of a Virtual Address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: u32,
    pub page: u32,
    pub offset: u32,
}

impl VirtualAddress {
    /// Split a raw address into page number and offset for `page_size`.
    pub fn new(va: u32, page_size: usize) -> Self {
        let page_size = page_size as u32;
        VirtualAddress {
            va,
            page: va / page_size,
            offset: va % page_size,
        }
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA({:#x}) = (page={}, offset={})", self.va, self.page, self.offset)
    }
}

/// Width of a memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessSize {
    Byte = 1,
    Half = 2,
    Word = 4,
}

impl AccessSize {
    pub fn bytes(self) -> usize {
        self as usize
    }

    /// Words must sit on a 4-byte boundary, halves on a 2-byte one.
    pub fn is_aligned(self, va: u32) -> bool {
        va & (self as u32 - 1) == 0
    }
}

impl TryFrom<u32> for AccessSize {
    type Error = u32;

    fn try_from(size: u32) -> Result<Self, Self::Error> {
        match size {
            1 => Ok(AccessSize::Byte),
            2 => Ok(AccessSize::Half),
            4 => Ok(AccessSize::Word),
            other => Err(other),
        }
    }
}

impl VmManager {
    /// Translate `va` in the current address space into a physical address.
    ///
    /// In page-table mode an invalid page is faulted in on the spot, evicting
    /// a victim if physical memory is full. In lookaside mode a miss is
    /// reported as [`Exception::LookasideMiss`] and nothing is refilled.
    ///
    /// # Panics
    ///
    /// If no address space is installed, or if the resulting physical range
    /// falls outside main memory.
    pub fn translate(
        &mut self,
        va: u32,
        size: AccessSize,
        writing: bool,
    ) -> Result<u32, Exception> {
        debug!("translate {va:#x}, {}", if writing { "write" } else { "read" });

        if !size.is_aligned(va) {
            debug!("alignment problem at {va:#x}, size {}", size.bytes());
            return Err(Exception::AddressError);
        }

        let id = self.current_space_id();
        let vaddr = VirtualAddress::new(va, self.config().page_size);
        self.stats.translations += 1;

        let slot = match self.locate(vaddr) {
            Ok(slot) => slot,
            Err(exception) => {
                if exception == Exception::LookasideMiss {
                    self.stats.lookaside_misses += 1;
                }
                return Err(exception);
            }
        };

        if let EntrySlot::Page(page) = slot {
            let owner = EntryRef {
                space: id,
                virtual_page: page,
            };
            if !self.spaces.entry(owner).valid {
                debug!("invalid virtual page {page:#x} at {va:#x}");
                self.handle_page_fault(owner);
            }
        }

        let page_size = self.config().page_size;
        let num_frames = self.config().num_phys_pages;
        let memory_size = self.config().memory_size();

        let entry = self.current_space_mut().entry_mut(slot);
        if entry.read_only && writing {
            debug!("write to read-only page at {va:#x}");
            return Err(Exception::ReadOnly);
        }

        let frame = entry.physical_frame;
        if frame as usize >= num_frames {
            debug!("illegal page frame {frame:#x}");
            return Err(Exception::BusError);
        }
        entry.touch(writing);

        let physical = frame as usize * page_size + vaddr.offset as usize;
        assert!(
            physical + size.bytes() <= memory_size,
            "physical address {physical:#x} + {} escapes main memory",
            size.bytes()
        );
        debug!("phys addr = {physical:#x}, frame = {frame:#x}");

        Ok(physical as u32)
    }

    /// Find the entry mapping `vaddr` without side effects.
    fn locate(&self, vaddr: VirtualAddress) -> Result<EntrySlot, Exception> {
        let space = self.current_space();
        if let Some(table) = space.page_table() {
            if vaddr.page as usize >= table.len() {
                debug!("illegal virtual page {:#x} at {:#x}", vaddr.page, vaddr.va);
                return Err(Exception::AddressError);
            }
            return Ok(EntrySlot::Page(vaddr.page));
        }

        let tlb = space
            .lookaside()
            .unwrap_or_else(|| unreachable!("address space has neither page table nor lookaside"));
        match tlb.lookup(vaddr.page) {
            Some(index) => Ok(EntrySlot::Cache(index)),
            None => {
                debug!("lookaside miss for virtual page {:#x}", vaddr.page);
                Err(Exception::LookasideMiss)
            }
        }
    }

    /// Bring `owner` into a frame, evicting a victim when none is free.
    fn handle_page_fault(&mut self, owner: EntryRef) {
        self.stats.page_faults += 1;

        let frame = match self.allocator.pop_free_frame() {
            Allocation::Granted(frame) => frame,
            Allocation::Exhausted => {
                let (victim_frame, victim) =
                    find_victim(self.config().swap_policy, &self.frames, |r| self.spaces.entry(r))
                        .unwrap_or_else(|| panic!("no free frame and no resident page to evict"));
                debug!("no free frame, evicting {victim} from frame {victim_frame:#x}");
                self.stats.evictions += 1;

                let (mut ctx, spaces) = self.split();
                swap::swap_out(&mut ctx, spaces.entry_mut(victim))
            }
        };

        let (mut ctx, spaces) = self.split();
        swap::swap_in(&mut ctx, owner, spaces.entry_mut(owner), frame);
    }
}
