use serde::Deserialize;

use crate::entry::{EntryRef, TranslationEntry};
use crate::frame_table::ReverseFrameTable;

/// Victim ordering used when no free frame remains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SwapPolicy {
    /// Oldest admission first: smallest allocation id.
    #[default]
    #[serde(alias = "oldest-first")]
    Fifo,
    /// Fewest references first: smallest reference count.
    #[serde(alias = "count-based")]
    Lru,
}

impl SwapPolicy {
    fn key(self, entry: &TranslationEntry) -> u64 {
        match self {
            SwapPolicy::Fifo => entry.allocation_id,
            SwapPolicy::Lru => entry.reference_count,
        }
    }
}

/// Pick the resident entry to evict, scanning frames in ascending order.
///
/// Ties go to the lowest frame. Dirty and read-only state are ignored.
/// Returns `None` only when no frame is occupied.
pub fn find_victim<'a, F>(
    policy: SwapPolicy,
    frames: &ReverseFrameTable,
    resolve: F,
) -> Option<(u32, EntryRef)>
where
    F: Fn(EntryRef) -> &'a TranslationEntry,
{
    frames
        .iter()
        .min_by_key(|&(_, owner)| policy.key(resolve(owner)))
}
