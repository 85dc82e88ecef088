//! Moving pages between physical frames and the paging disk.
//!
//! Both directions run to completion; a transfer never fails part-way.

use log::info;

use crate::allocator::{Allocation, ResourceAllocator};
use crate::entry::{EntryRef, TranslationEntry};
use crate::frame_table::ReverseFrameTable;
use crate::memory::{BackingStore, PhysicalMemory};
use crate::vm_manager::PagingStats;

/// The process-wide state a swap touches, borrowed from the manager.
pub struct SwapContext<'a> {
    pub memory: &'a mut PhysicalMemory,
    pub disk: &'a mut dyn BackingStore,
    pub allocator: &'a mut ResourceAllocator,
    pub frames: &'a mut ReverseFrameTable,
    pub stats: &'a mut PagingStats,
    pub next_allocation_id: &'a mut u64,
}

impl SwapContext<'_> {
    fn assign_allocation_id(&mut self) -> u64 {
        let id = *self.next_allocation_id;
        *self.next_allocation_id += 1;
        id
    }
}

/// Install `entry` (owned by `owner`) into `frame`.
///
/// The page's sector, if it has one, is copied into the frame, then zeroed
/// and returned to the sector pool. A page with no sector starts zero-filled.
pub fn swap_in(
    ctx: &mut SwapContext<'_>,
    owner: EntryRef,
    entry: &mut TranslationEntry,
    frame: u32,
) {
    entry.physical_frame = frame;
    match entry.disk_sector.take() {
        Some(sector) => {
            info!("swapping in: frame {frame:#x} from sector {sector:#x} ({owner})");
            ctx.disk.read_sector(sector, ctx.memory.frame_mut(frame));

            let zeroes = vec![0u8; ctx.disk.sector_size()];
            ctx.disk.write_sector(sector, &zeroes);
            ctx.allocator.push_free_sector(sector);
        }
        None => {
            info!("swapping in: frame {frame:#x} zero-filled ({owner})");
            ctx.memory.frame_mut(frame).fill(0);
        }
    }
    ctx.frames.register(frame, owner);

    entry.dirty = false;
    entry.valid = true;
    entry.referenced = true;
    entry.allocation_id = ctx.assign_allocation_id();
    entry.reference_count = 1;

    ctx.stats.swap_ins += 1;
    ctx.stats.last_swap_in = Some(frame);
}

/// Evict `entry` to a fresh sector and release its frame.
///
/// Returns the frame the caller should use next, taken from the free pool
/// after the evicted frame was pushed onto it.
///
/// # Panics
///
/// If the paging disk has no free sector.
pub fn swap_out(ctx: &mut SwapContext<'_>, entry: &mut TranslationEntry) -> u32 {
    let frame = entry.physical_frame;
    let sector = match ctx.allocator.pop_free_sector() {
        Allocation::Granted(sector) => sector,
        Allocation::Exhausted => panic!("paging disk full: no sector to swap frame {frame} out to"),
    };
    info!("swapping out: frame {frame:#x} to sector {sector:#x}");

    ctx.disk.write_sector(sector, ctx.memory.frame(frame));
    ctx.memory.frame_mut(frame).fill(0);
    ctx.frames.clear(frame);
    ctx.allocator.push_free_frame(frame);

    entry.disk_sector = Some(sector);
    entry.physical_frame = 0;
    entry.dirty = false;
    entry.valid = false;
    entry.referenced = false;
    entry.allocation_id = 0;
    entry.reference_count = 0;

    ctx.stats.swap_outs += 1;
    ctx.stats.last_swap_out = Some(frame);

    match ctx.allocator.pop_free_frame() {
        Allocation::Granted(next) => next,
        Allocation::Exhausted => unreachable!("frame {frame} was just released"),
    }
}
