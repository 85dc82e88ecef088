use thiserror::Error;

/// Exceptions raised by a failed address translation.
///
/// The translator only reports the kind; delivering it to the faulting
/// program (together with the faulting address) is the caller's job.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exception {
    /// Misaligned access, or a virtual page beyond the end of the page table.
    #[error("address error")]
    AddressError,
    /// No valid lookaside slot maps the virtual page.
    #[error("lookaside miss")]
    LookasideMiss,
    /// Write through a read-only mapping.
    #[error("write to read-only page")]
    ReadOnly,
    /// The mapping names a physical frame the machine does not have.
    #[error("bus error")]
    BusError,
}

impl Exception {
    /// Short name used in trace output.
    pub fn name(&self) -> &'static str {
        match self {
            Exception::AddressError => "AddressError",
            Exception::LookasideMiss => "LookasideMiss",
            Exception::ReadOnly => "ReadOnly",
            Exception::BusError => "BusError",
        }
    }
}

/// Errors produced while building or provisioning a machine.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("machine needs at least one physical frame")]
    NoFrames,
    #[error("page size must be non-zero")]
    ZeroPageSize,
    #[error("page size {0} is not a multiple of the word size")]
    UnalignedPageSize(usize),
    #[error("swap disk needs at least one sector")]
    NoSectors,
    #[error("sector size {sector} differs from page size {page}")]
    SectorSizeMismatch { sector: usize, page: usize },
    #[error("{0} size must be non-zero")]
    EmptyTranslation(&'static str),
    #[error("image of {image} bytes does not fit in {pages} pages")]
    ImageTooLarge { image: usize, pages: usize },
    #[error("images can only be staged into page-table address spaces")]
    NotPaged,
    #[error("swap disk has no free sector left for staging")]
    SwapFull,
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors produced while reading an access trace.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceError {
    #[error("line {line}: expected `R <addr> <size>` or `W <addr> <size> <value>`")]
    Malformed { line: usize },
    #[error("line {line}: unknown access kind `{kind}`")]
    UnknownKind { line: usize, kind: String },
    #[error("line {line}: invalid number `{token}`")]
    InvalidNumber { line: usize, token: String },
    #[error("line {line}: access size must be 1, 2 or 4, got {size}")]
    InvalidSize { line: usize, size: u32 },
}
