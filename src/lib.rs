//! Virtual memory for a single-CPU emulated machine: page-table or lookaside
//! translation, with demand paging to a swap disk when main memory runs out.

pub mod address_space;
pub mod allocator;
pub mod config;
pub mod constants;
pub mod entry;
pub mod error;
pub mod eviction;
pub mod frame_table;
pub mod io;
pub mod memory;
pub mod swap;
pub mod tlb;
pub mod translation;
pub mod vm_manager;

#[cfg(test)]
mod tests_prop;

// Re-export commonly used items for convenience
pub use address_space::SpaceId;
pub use config::{ConfigFile, MachineConfig, SpaceConfig};
pub use entry::TranslationEntry;
pub use error::{ConfigError, Exception};
pub use eviction::SwapPolicy;
pub use translation::{AccessSize, VirtualAddress};
pub use vm_manager::{PagingStats, VmManager};
