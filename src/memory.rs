/// Simulated main memory: `num_frames` frames of `page_size` bytes each.
pub struct PhysicalMemory {
    data: Box<[u8]>,
    page_size: usize,
}

impl PhysicalMemory {
    /// Create a new physical memory initialized to all zeros
    pub fn new(num_frames: usize, page_size: usize) -> Self {
        PhysicalMemory {
            data: vec![0u8; num_frames * page_size].into_boxed_slice(),
            page_size,
        }
    }

    /// Read a byte from physical memory
    #[inline]
    pub fn read(&self, address: usize) -> u8 {
        self.data[address]
    }

    /// Write a byte to physical memory
    #[inline]
    pub fn write(&mut self, address: usize, value: u8) {
        self.data[address] = value;
    }

    /// Raw bytes starting at `address`, in machine byte order.
    pub fn bytes(&self, address: usize, len: usize) -> &[u8] {
        &self.data[address..address + len]
    }

    pub fn bytes_mut(&mut self, address: usize, len: usize) -> &mut [u8] {
        &mut self.data[address..address + len]
    }

    /// Calculate the starting address of a frame
    #[inline]
    pub fn frame_to_address(&self, frame: u32) -> usize {
        frame as usize * self.page_size
    }

    /// The bytes backing one frame.
    pub fn frame(&self, frame: u32) -> &[u8] {
        let start = self.frame_to_address(frame);
        &self.data[start..start + self.page_size]
    }

    pub fn frame_mut(&mut self, frame: u32) -> &mut [u8] {
        let start = self.frame_to_address(frame);
        &mut self.data[start..start + self.page_size]
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn num_frames(&self) -> usize {
        self.data.len() / self.page_size
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

/// Sector-addressed secondary storage used for paging.
///
/// Transfers always move a whole sector and are assumed to succeed; an
/// out-of-range sector id is a caller bug.
pub trait BackingStore {
    fn sector_size(&self) -> usize;
    fn num_sectors(&self) -> usize;
    fn read_sector(&self, sector: u32, dest: &mut [u8]);
    fn write_sector(&mut self, sector: u32, src: &[u8]);
}

/// In-memory paging disk.
pub struct SwapDisk {
    data: Box<[u8]>,
    sector_size: usize,
}

impl SwapDisk {
    /// Create a new disk initialized to all zeros
    pub fn new(num_sectors: usize, sector_size: usize) -> Self {
        SwapDisk {
            data: vec![0u8; num_sectors * sector_size].into_boxed_slice(),
            sector_size,
        }
    }

    /// Read a single byte of a sector
    #[inline]
    pub fn read(&self, sector: u32, offset: usize) -> u8 {
        self.data[sector as usize * self.sector_size + offset]
    }

    fn range(&self, sector: u32) -> std::ops::Range<usize> {
        let start = sector as usize * self.sector_size;
        start..start + self.sector_size
    }
}

impl BackingStore for SwapDisk {
    fn sector_size(&self) -> usize {
        self.sector_size
    }

    fn num_sectors(&self) -> usize {
        self.data.len() / self.sector_size
    }

    fn read_sector(&self, sector: u32, dest: &mut [u8]) {
        let range = self.range(sector);
        dest.copy_from_slice(&self.data[range]);
    }

    fn write_sector(&mut self, sector: u32, src: &[u8]) {
        let range = self.range(sector);
        self.data[range].copy_from_slice(src);
    }
}

// Conversions between the simulated machine's byte order (little endian) and
// the host's. They compile to nothing on little-endian hosts.

#[inline]
pub fn word_to_host(word: u32) -> u32 {
    u32::from_le(word)
}

#[inline]
pub fn short_to_host(short: u16) -> u16 {
    u16::from_le(short)
}

#[inline]
pub fn word_to_machine(word: u32) -> u32 {
    word.to_le()
}

#[inline]
pub fn short_to_machine(short: u16) -> u16 {
    short.to_le()
}
