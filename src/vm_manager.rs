use log::{debug, info, trace};

use crate::address_space::{AddressSpace, SpaceArena, SpaceId};
use crate::allocator::{Allocation, ResourceAllocator};
use crate::config::{MachineConfig, SpaceConfig};
use crate::constants::FIRST_ALLOCATION_ID;
use crate::entry::{EntryRef, TranslationEntry};
use crate::error::{ConfigError, Exception};
use crate::frame_table::ReverseFrameTable;
use crate::memory::{
    short_to_host, short_to_machine, word_to_host, word_to_machine, BackingStore, PhysicalMemory,
    SwapDisk,
};
use crate::swap::SwapContext;
use crate::translation::AccessSize;

/// Running counters of paging activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagingStats {
    pub translations: u64,
    pub page_faults: u64,
    pub lookaside_misses: u64,
    pub evictions: u64,
    pub swap_ins: u64,
    pub swap_outs: u64,
    pub last_swap_in: Option<u32>,
    pub last_swap_out: Option<u32>,
}

/// The machine's memory system.
///
/// Owns main memory, the paging disk, the free frame and sector pools, the
/// reverse frame table and every address space. Translation happens in the
/// address space installed with [`VmManager::switch_to`].
pub struct VmManager {
    config: MachineConfig,
    pub(crate) memory: PhysicalMemory,
    pub(crate) disk: Box<dyn BackingStore>,
    pub(crate) allocator: ResourceAllocator,
    pub(crate) frames: ReverseFrameTable,
    pub(crate) spaces: SpaceArena,
    current: Option<SpaceId>,
    next_allocation_id: u64,
    pub(crate) stats: PagingStats,
}

impl VmManager {
    /// Build a machine with an in-memory paging disk.
    pub fn new(config: MachineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let disk = SwapDisk::new(config.num_sectors, config.page_size);
        Self::with_backing_store(config, Box::new(disk))
    }

    /// Build a machine paging to `disk`; its geometry overrides `num_sectors`.
    pub fn with_backing_store(
        mut config: MachineConfig,
        disk: Box<dyn BackingStore>,
    ) -> Result<Self, ConfigError> {
        if disk.sector_size() != config.page_size {
            return Err(ConfigError::SectorSizeMismatch {
                sector: disk.sector_size(),
                page: config.page_size,
            });
        }
        // sector geometry is only meaningful once the size is known good
        config.validate_page_size()?;
        config.num_sectors = disk.num_sectors();
        config.validate()?;

        debug!(
            "machine: {} frames of {} bytes, {} swap sectors, {:?} eviction",
            config.num_phys_pages, config.page_size, config.num_sectors, config.swap_policy
        );
        Ok(VmManager {
            memory: PhysicalMemory::new(config.num_phys_pages, config.page_size),
            disk,
            allocator: ResourceAllocator::new(config.num_phys_pages, config.num_sectors),
            frames: ReverseFrameTable::new(config.num_phys_pages),
            spaces: SpaceArena::default(),
            current: None,
            next_allocation_id: FIRST_ALLOCATION_ID,
            stats: PagingStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn stats(&self) -> &PagingStats {
        &self.stats
    }

    pub fn allocator(&self) -> &ResourceAllocator {
        &self.allocator
    }

    pub fn frames(&self) -> &ReverseFrameTable {
        &self.frames
    }

    pub fn memory(&self) -> &PhysicalMemory {
        &self.memory
    }

    pub fn disk(&self) -> &dyn BackingStore {
        self.disk.as_ref()
    }

    /// Create an address space; it is not installed until `switch_to`.
    pub fn create_space(&mut self, config: SpaceConfig) -> Result<SpaceId, ConfigError> {
        config.validate()?;
        let id = self.spaces.insert(AddressSpace::new(config));
        debug!("created {id}: {config:?}");
        Ok(id)
    }

    /// Install `id` as the translation context.
    pub fn switch_to(&mut self, id: SpaceId) {
        assert!(self.spaces.get(id).is_some(), "cannot switch to destroyed {id}");
        self.current = Some(id);
    }

    pub fn current_space_id(&self) -> SpaceId {
        self.current.unwrap_or_else(|| panic!("no address space installed"))
    }

    pub fn space(&self, id: SpaceId) -> &AddressSpace {
        self.spaces.get(id).unwrap_or_else(|| panic!("unknown {id}"))
    }

    pub fn current_space(&self) -> &AddressSpace {
        self.space(self.current_space_id())
    }

    pub fn current_space_mut(&mut self) -> &mut AddressSpace {
        let id = self.current_space_id();
        self.spaces.get_mut(id).unwrap_or_else(|| panic!("unknown {id}"))
    }

    /// Page-table entry `virtual_page` of space `id`.
    pub fn entry(&self, id: SpaceId, virtual_page: u32) -> &TranslationEntry {
        self.spaces.entry(EntryRef {
            space: id,
            virtual_page,
        })
    }

    /// Destroy `id`, returning its frames and sectors to the free pools.
    pub fn destroy_space(&mut self, id: SpaceId) {
        let space = self
            .spaces
            .remove(id)
            .unwrap_or_else(|| panic!("unknown {id}"));
        if self.current == Some(id) {
            self.current = None;
        }

        let mut frames = 0;
        let mut sectors = 0;
        if let Some(table) = space.page_table() {
            let zeroes = vec![0u8; self.disk.sector_size()];
            for entry in table {
                if entry.valid {
                    let frame = entry.physical_frame;
                    self.memory.frame_mut(frame).fill(0);
                    self.frames.clear(frame);
                    self.allocator.push_free_frame(frame);
                    frames += 1;
                }
                if let Some(sector) = entry.disk_sector {
                    self.disk.write_sector(sector, &zeroes);
                    self.allocator.push_free_sector(sector);
                    sectors += 1;
                }
            }
        }
        info!("destroyed {id}: reclaimed {frames} frames, {sectors} sectors");
    }

    /// Write `entry` into lookaside slot `slot` of the current space.
    ///
    /// # Panics
    ///
    /// If the current space translates through a page table, or if `slot` is
    /// not below the cache size.
    pub fn refill_lookaside(&mut self, slot: usize, entry: TranslationEntry) {
        debug!(
            "lookaside refill: slot {slot} <- page {:#x} frame {:#x}",
            entry.virtual_page, entry.physical_frame
        );
        let tlb = self
            .current_space_mut()
            .lookaside_mut()
            .unwrap_or_else(|| panic!("current address space has no lookaside cache"));
        assert!(
            slot < tlb.len(),
            "lookaside slot {slot} out of range for a {}-slot cache",
            tlb.len()
        );
        tlb.load(slot, entry);
    }

    /// Stage a program image into space `id` for demand paging.
    ///
    /// Non-resident pages receive a swap sector holding their share of the
    /// image, so the first touch faults them in. Resident pages are
    /// overwritten in place.
    pub fn load_image(&mut self, id: SpaceId, image: &[u8]) -> Result<(), ConfigError> {
        let page_size = self.config.page_size;
        let table_len = self
            .space(id)
            .page_table()
            .ok_or(ConfigError::NotPaged)?
            .len();
        if image.len().div_ceil(page_size) > table_len {
            return Err(ConfigError::ImageTooLarge {
                image: image.len(),
                pages: table_len,
            });
        }

        let mut page = vec![0u8; page_size];
        for (vpn, chunk) in image.chunks(page_size).enumerate() {
            page.fill(0);
            page[..chunk.len()].copy_from_slice(chunk);

            let entry = self.spaces.entry_mut(EntryRef {
                space: id,
                virtual_page: vpn as u32,
            });
            if entry.valid {
                entry.dirty = true;
                self.memory.frame_mut(entry.physical_frame).copy_from_slice(&page);
                continue;
            }
            let sector = match entry.disk_sector {
                Some(sector) => sector,
                None => match self.allocator.pop_free_sector() {
                    Allocation::Granted(sector) => sector,
                    Allocation::Exhausted => return Err(ConfigError::SwapFull),
                },
            };
            self.disk.write_sector(sector, &page);
            entry.disk_sector = Some(sector);
        }
        debug!("staged {} bytes into {id}", image.len());
        Ok(())
    }

    /// Read `size` bytes of virtual memory at `addr`.
    pub fn read_mem(&mut self, addr: u32, size: AccessSize) -> Result<u32, Exception> {
        trace!("reading VA {addr:#x}, size {}", size.bytes());
        let pa = self.translate(addr, size, false)? as usize;

        let value = match size {
            AccessSize::Byte => u32::from(self.memory.read(pa)),
            AccessSize::Half => {
                let mut raw = [0u8; 2];
                raw.copy_from_slice(self.memory.bytes(pa, 2));
                u32::from(short_to_host(u16::from_ne_bytes(raw)))
            }
            AccessSize::Word => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(self.memory.bytes(pa, 4));
                word_to_host(u32::from_ne_bytes(raw))
            }
        };
        trace!("value read = {value:#x}");
        Ok(value)
    }

    /// Write the low `size` bytes of `value` to virtual memory at `addr`.
    pub fn write_mem(&mut self, addr: u32, size: AccessSize, value: u32) -> Result<(), Exception> {
        trace!("writing VA {addr:#x}, size {}, value {value:#x}", size.bytes());
        let pa = self.translate(addr, size, true)? as usize;

        match size {
            AccessSize::Byte => self.memory.write(pa, value as u8),
            AccessSize::Half => {
                let raw = short_to_machine(value as u16).to_ne_bytes();
                self.memory.bytes_mut(pa, 2).copy_from_slice(&raw);
            }
            AccessSize::Word => {
                let raw = word_to_machine(value).to_ne_bytes();
                self.memory.bytes_mut(pa, 4).copy_from_slice(&raw);
            }
        }
        Ok(())
    }

    /// Borrow the swap state and the address spaces side by side.
    pub(crate) fn split(&mut self) -> (SwapContext<'_>, &mut SpaceArena) {
        (
            SwapContext {
                memory: &mut self.memory,
                disk: self.disk.as_mut(),
                allocator: &mut self.allocator,
                frames: &mut self.frames,
                stats: &mut self.stats,
                next_allocation_id: &mut self.next_allocation_id,
            },
            &mut self.spaces,
        )
    }

    /// Check frame ownership and pool accounting.
    ///
    /// # Panics
    ///
    /// On the first violated invariant.
    pub fn assert_invariants(&self) {
        for (frame, owner) in self.frames.iter() {
            let entry = self.spaces.entry(owner);
            assert!(entry.valid, "frame {frame} owned by non-resident {owner}");
            assert_eq!(entry.physical_frame, frame, "frame {frame} owner {owner} disagrees");
            assert!(
                !self.allocator.free_frames().contains(frame),
                "frame {frame} both resident and free"
            );
        }

        let mut resident = 0;
        let mut assigned_sectors = 0;
        for (id, space) in self.spaces.iter() {
            let Some(table) = space.page_table() else {
                continue;
            };
            for (vpn, entry) in table.iter().enumerate() {
                let owner = EntryRef {
                    space: id,
                    virtual_page: vpn as u32,
                };
                if entry.valid {
                    resident += 1;
                    assert_eq!(
                        self.frames.get(entry.physical_frame),
                        Some(owner),
                        "{owner} maps frame {} it does not own",
                        entry.physical_frame
                    );
                    assert!(entry.allocation_id >= FIRST_ALLOCATION_ID);
                } else {
                    assert_eq!(entry.allocation_id, 0, "{owner} not resident but has an id");
                }
                if let Some(sector) = entry.disk_sector {
                    assigned_sectors += 1;
                    assert!(
                        !self.allocator.free_sectors().contains(sector),
                        "sector {sector} both assigned and free"
                    );
                }
            }
        }

        assert_eq!(
            self.allocator.free_frames().len() + resident,
            self.config.num_phys_pages,
            "frames leaked or double counted"
        );
        assert_eq!(
            self.allocator.free_sectors().len() + assigned_sectors,
            self.config.num_sectors,
            "sectors leaked or double counted"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::SwapPolicy;

    fn config(frames: usize, sectors: usize) -> MachineConfig {
        MachineConfig {
            num_phys_pages: frames,
            page_size: 16,
            num_sectors: sectors,
            swap_policy: SwapPolicy::Fifo,
        }
    }

    fn installed(frames: usize, pages: usize) -> (VmManager, SpaceId) {
        let mut vm = VmManager::new(config(frames, 32)).unwrap();
        let id = vm.create_space(SpaceConfig::PageTable { pages }).unwrap();
        vm.switch_to(id);
        (vm, id)
    }

    #[test]
    fn test_zero_frames_rejected() {
        assert!(matches!(VmManager::new(config(0, 8)), Err(ConfigError::NoFrames)));
    }

    #[test]
    fn test_sector_size_must_match_page_size() {
        let err = VmManager::with_backing_store(config(2, 8), Box::new(SwapDisk::new(8, 32)));
        assert!(matches!(err, Err(ConfigError::SectorSizeMismatch { sector: 32, page: 16 })));
    }

    #[test]
    fn test_zero_sector_disk_rejected() {
        let err = VmManager::with_backing_store(config(2, 8), Box::new(SwapDisk::new(8, 0)));
        assert!(matches!(err, Err(ConfigError::SectorSizeMismatch { sector: 0, page: 16 })));

        let zero_pages = MachineConfig {
            page_size: 0,
            ..config(2, 8)
        };
        let err = VmManager::with_backing_store(zero_pages, Box::new(SwapDisk::new(8, 0)));
        assert!(matches!(err, Err(ConfigError::ZeroPageSize)));
    }

    #[test]
    fn test_word_access_stays_in_its_frame() {
        let narrow = MachineConfig {
            page_size: 2,
            ..config(2, 8)
        };
        assert!(matches!(VmManager::new(narrow), Err(ConfigError::UnalignedPageSize(2))));

        let mut vm = VmManager::new(MachineConfig {
            page_size: 4,
            ..config(2, 8)
        })
        .unwrap();
        let id = vm.create_space(SpaceConfig::PageTable { pages: 2 }).unwrap();
        vm.switch_to(id);
        vm.write_mem(0, AccessSize::Byte, 0x11).unwrap();
        vm.write_mem(4, AccessSize::Byte, 0xaa).unwrap();
        assert_eq!(vm.read_mem(0, AccessSize::Word), Ok(0x11));
        assert_eq!(vm.read_mem(4, AccessSize::Word), Ok(0xaa));
    }

    #[test]
    fn test_backing_store_sets_sector_count() {
        let disk = Box::new(SwapDisk::new(40, 16));
        let vm = VmManager::with_backing_store(config(2, 1), disk).unwrap();
        assert_eq!(vm.config().num_sectors, 40);
        assert_eq!(vm.allocator().free_sectors().len(), 40);
    }

    #[test]
    fn test_word_round_trip() {
        let (mut vm, _) = installed(2, 4);
        vm.write_mem(8, AccessSize::Word, 0xdead_beef).unwrap();
        assert_eq!(vm.read_mem(8, AccessSize::Word), Ok(0xdead_beef));
        assert_eq!(vm.read_mem(8, AccessSize::Half), Ok(0xbeef));
        assert_eq!(vm.read_mem(10, AccessSize::Half), Ok(0xdead));
        assert_eq!(vm.read_mem(8, AccessSize::Byte), Ok(0xef));
    }

    #[test]
    fn test_memory_is_little_endian() {
        let (mut vm, _) = installed(2, 4);
        vm.write_mem(0, AccessSize::Word, 0x1234_5678).unwrap();
        let pa = vm.entry(vm.current_space_id(), 0).physical_frame as usize * 16;
        assert_eq!(vm.memory().bytes(pa, 4), &[0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_narrow_writes_truncate() {
        let (mut vm, _) = installed(2, 4);
        vm.write_mem(4, AccessSize::Byte, 0x1ff).unwrap();
        vm.write_mem(6, AccessSize::Half, 0xabcd_1234).unwrap();
        assert_eq!(vm.read_mem(4, AccessSize::Word), Ok(0x1234_00ff));
    }

    #[test]
    fn test_failed_write_leaves_memory_untouched() {
        let (mut vm, id) = installed(2, 4);
        vm.write_mem(0, AccessSize::Word, 7).unwrap();
        vm.current_space_mut().page_table_mut().unwrap()[0].read_only = true;

        assert_eq!(vm.write_mem(0, AccessSize::Word, 9), Err(Exception::ReadOnly));
        assert_eq!(vm.write_mem(1, AccessSize::Word, 9), Err(Exception::AddressError));
        assert_eq!(vm.read_mem(0, AccessSize::Word), Ok(7));
        assert!(vm.entry(id, 0).valid);
    }

    #[test]
    fn test_contents_survive_eviction() {
        let (mut vm, id) = installed(2, 4);
        for page in 0..4u32 {
            vm.write_mem(page * 16, AccessSize::Word, 0x100 + page).unwrap();
        }
        assert_eq!(vm.stats().evictions, 2);
        assert!(!vm.entry(id, 0).valid);

        for page in 0..4u32 {
            assert_eq!(vm.read_mem(page * 16, AccessSize::Word), Ok(0x100 + page));
        }
        vm.assert_invariants();
    }

    #[test]
    fn test_two_spaces_share_frames() {
        let mut vm = VmManager::new(config(2, 32)).unwrap();
        let a = vm.create_space(SpaceConfig::PageTable { pages: 2 }).unwrap();
        let b = vm.create_space(SpaceConfig::PageTable { pages: 2 }).unwrap();

        vm.switch_to(a);
        vm.write_mem(0, AccessSize::Word, 1).unwrap();
        vm.write_mem(16, AccessSize::Word, 2).unwrap();

        vm.switch_to(b);
        vm.write_mem(0, AccessSize::Word, 3).unwrap();
        // b's first page pushed a's oldest page out
        assert!(!vm.entry(a, 0).valid);
        vm.assert_invariants();

        vm.switch_to(a);
        assert_eq!(vm.read_mem(0, AccessSize::Word), Ok(1));
        vm.switch_to(b);
        assert_eq!(vm.read_mem(0, AccessSize::Word), Ok(3));
        vm.assert_invariants();
    }

    #[test]
    fn test_destroy_reclaims_frames_and_sectors() {
        let (mut vm, id) = installed(2, 4);
        for page in 0..4u32 {
            vm.write_mem(page * 16, AccessSize::Byte, 1).unwrap();
        }
        assert_eq!(vm.allocator().free_frames().len(), 0);
        assert_eq!(vm.allocator().free_sectors().len(), 30);

        vm.destroy_space(id);

        assert_eq!(vm.allocator().free_frames().len(), 2);
        assert_eq!(vm.allocator().free_sectors().len(), 32);
        assert_eq!(vm.frames().resident_count(), 0);
        assert!(vm.memory().bytes(0, 32).iter().all(|&b| b == 0));
        vm.assert_invariants();
    }

    #[test]
    fn test_destroy_uninstalls_current() {
        let (mut vm, id) = installed(2, 1);
        vm.destroy_space(id);
        let other = vm.create_space(SpaceConfig::PageTable { pages: 1 }).unwrap();
        assert_ne!(other, id);
        vm.switch_to(other);
        assert_eq!(vm.current_space_id(), other);
    }

    #[test]
    fn test_load_image_demand_pages() {
        let (mut vm, id) = installed(2, 4);
        let image: Vec<u8> = (0..40u8).collect();
        vm.load_image(id, &image).unwrap();

        assert_eq!(vm.allocator().free_sectors().len(), 29);
        assert!(vm.entry(id, 2).disk_sector.is_some());
        assert!(vm.entry(id, 3).disk_sector.is_none());
        vm.assert_invariants();

        for (addr, &byte) in image.iter().enumerate() {
            assert_eq!(vm.read_mem(addr as u32, AccessSize::Byte), Ok(u32::from(byte)));
        }
        // tail of the last staged page is zero-padded
        assert_eq!(vm.read_mem(44, AccessSize::Word), Ok(0));
        vm.assert_invariants();
    }

    #[test]
    fn test_load_image_over_resident_page() {
        let (mut vm, id) = installed(2, 2);
        vm.write_mem(0, AccessSize::Word, 0xffff_ffff).unwrap();
        vm.load_image(id, &[1, 2, 3, 4]).unwrap();
        assert_eq!(vm.read_mem(0, AccessSize::Word), Ok(0x0403_0201));
        assert!(vm.entry(id, 0).dirty);
    }

    #[test]
    fn test_load_image_errors() {
        let (mut vm, id) = installed(2, 1);
        assert!(matches!(
            vm.load_image(id, &[0u8; 17]),
            Err(ConfigError::ImageTooLarge { image: 17, pages: 1 })
        ));

        let tlb = vm.create_space(SpaceConfig::Lookaside { size: 2 }).unwrap();
        assert!(matches!(vm.load_image(tlb, &[0u8; 4]), Err(ConfigError::NotPaged)));
    }

    #[test]
    fn test_load_image_swap_full() {
        let mut vm = VmManager::new(config(1, 1)).unwrap();
        let id = vm.create_space(SpaceConfig::PageTable { pages: 2 }).unwrap();
        assert!(matches!(vm.load_image(id, &[0u8; 32]), Err(ConfigError::SwapFull)));
    }

    #[test]
    fn test_lookaside_read_write() {
        let mut vm = VmManager::new(config(4, 8)).unwrap();
        let id = vm.create_space(SpaceConfig::Lookaside { size: 2 }).unwrap();
        vm.switch_to(id);

        assert_eq!(vm.read_mem(32, AccessSize::Word), Err(Exception::LookasideMiss));
        vm.refill_lookaside(0, TranslationEntry::mapped(2, 3, false));
        vm.write_mem(36, AccessSize::Word, 77).unwrap();
        assert_eq!(vm.read_mem(36, AccessSize::Word), Ok(77));
        assert_eq!(vm.memory().read(3 * 16 + 4), 77);
    }

    #[test]
    #[should_panic(expected = "lookaside slot 2 out of range")]
    fn test_refill_slot_out_of_range_panics() {
        let mut vm = VmManager::new(config(4, 8)).unwrap();
        let id = vm.create_space(SpaceConfig::Lookaside { size: 2 }).unwrap();
        vm.switch_to(id);
        vm.refill_lookaside(2, TranslationEntry::mapped(0, 0, false));
    }

    #[test]
    #[should_panic(expected = "no lookaside cache")]
    fn test_refill_page_table_space_panics() {
        let (mut vm, _) = installed(2, 2);
        vm.refill_lookaside(0, TranslationEntry::mapped(0, 0, false));
    }
}
