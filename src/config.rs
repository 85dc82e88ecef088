//! Machine and address-space configuration.
//!
//! Both halves load from a single TOML file:
//!
//! ```toml
//! [machine]
//! num_phys_pages = 2
//! page_size = 128
//! num_sectors = 64
//! swap_policy = "fifo"
//!
//! [space]
//! mode = "page-table"
//! pages = 3
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::constants::*;
use crate::error::ConfigError;
use crate::eviction::SwapPolicy;
use crate::translation::AccessSize;

/// Process-wide machine geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    pub num_phys_pages: usize,
    /// Bytes per page; also the swap disk's sector size.
    pub page_size: usize,
    pub num_sectors: usize,
    pub swap_policy: SwapPolicy,
}

impl Default for MachineConfig {
    fn default() -> Self {
        MachineConfig {
            num_phys_pages: NUM_PHYS_PAGES,
            page_size: PAGE_SIZE,
            num_sectors: NUM_SECTORS,
            swap_policy: SwapPolicy::default(),
        }
    }
}

impl MachineConfig {
    pub fn memory_size(&self) -> usize {
        self.num_phys_pages * self.page_size
    }

    /// Reject geometries that would make paging impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_phys_pages == 0 {
            return Err(ConfigError::NoFrames);
        }
        self.validate_page_size()?;
        if self.num_sectors == 0 {
            return Err(ConfigError::NoSectors);
        }
        Ok(())
    }

    /// Pages must hold whole words, so an aligned word never straddles two
    /// frames.
    pub fn validate_page_size(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.page_size % AccessSize::Word.bytes() != 0 {
            return Err(ConfigError::UnalignedPageSize(self.page_size));
        }
        Ok(())
    }
}

/// How an address space translates: exactly one of the two structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum SpaceConfig {
    /// Linear page table with `pages` entries, demand paged.
    PageTable { pages: usize },
    /// Software-refilled lookaside cache with `size` slots.
    Lookaside {
        #[serde(default = "default_lookaside_size")]
        size: usize,
    },
}

fn default_lookaside_size() -> usize {
    TLB_SIZE
}

impl Default for SpaceConfig {
    fn default() -> Self {
        SpaceConfig::PageTable {
            pages: NUM_PHYS_PAGES,
        }
    }
}

impl SpaceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            SpaceConfig::PageTable { pages: 0 } => Err(ConfigError::EmptyTranslation("page table")),
            SpaceConfig::Lookaside { size: 0 } => Err(ConfigError::EmptyTranslation("lookaside")),
            _ => Ok(()),
        }
    }
}

/// Contents of a configuration file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub machine: MachineConfig,
    pub space: SpaceConfig,
}

impl ConfigFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ConfigFile = toml::from_str(content)?;
        config.machine.validate()?;
        config.space.validate()?;
        Ok(config)
    }
}
