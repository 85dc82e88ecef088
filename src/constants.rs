// Default machine geometry. Every value can be overridden through `MachineConfig`.

pub const SECTOR_SIZE: usize = 128;
pub const PAGE_SIZE: usize = SECTOR_SIZE;

pub const NUM_PHYS_PAGES: usize = 32;
pub const MEMORY_SIZE: usize = NUM_PHYS_PAGES * PAGE_SIZE;

pub const SECTORS_PER_TRACK: usize = 32;
pub const NUM_TRACKS: usize = 32;
pub const NUM_SECTORS: usize = SECTORS_PER_TRACK * NUM_TRACKS;

pub const TLB_SIZE: usize = 4;

/// First allocation id handed out on swap-in; 0 means "not resident".
pub const FIRST_ALLOCATION_ID: u64 = 1;
