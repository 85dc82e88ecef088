use proptest::prelude::*;

use crate::config::{MachineConfig, SpaceConfig};
use crate::error::Exception;
use crate::eviction::SwapPolicy;
use crate::translation::AccessSize;
use crate::vm_manager::VmManager;
use crate::TranslationEntry;

const PAGE: u32 = 16;

fn arb_policy() -> impl Strategy<Value = SwapPolicy> {
    prop_oneof![Just(SwapPolicy::Fifo), Just(SwapPolicy::Lru)]
}

fn arb_size() -> impl Strategy<Value = AccessSize> {
    prop_oneof![Just(AccessSize::Byte), Just(AccessSize::Half), Just(AccessSize::Word)]
}

/// Geometries where cycling three other pages always evicts page 0. A
/// heavily used page survives count-based eviction unless it is alone.
fn arb_evicting_geometry() -> impl Strategy<Value = (usize, SwapPolicy)> {
    prop_oneof![
        (1usize..3).prop_map(|frames| (frames, SwapPolicy::Fifo)),
        Just((1, SwapPolicy::Lru)),
    ]
}

fn paged(frames: usize, pages: usize, policy: SwapPolicy) -> VmManager {
    let config = MachineConfig {
        num_phys_pages: frames,
        page_size: PAGE as usize,
        num_sectors: 64,
        swap_policy: policy,
    };
    let mut vm = VmManager::new(config).unwrap();
    let id = vm.create_space(SpaceConfig::PageTable { pages }).unwrap();
    vm.switch_to(id);
    vm
}

proptest! {
    #[test]
    fn frames_unique_and_conserved(
        frames in 1usize..5,
        policy in arb_policy(),
        touches in prop::collection::vec((0u32..8, any::<bool>()), 1..64),
    ) {
        let mut vm = paged(frames, 8, policy);
        for (page, writing) in touches {
            let result = if writing {
                vm.write_mem(page * PAGE, AccessSize::Word, page)
            } else {
                vm.read_mem(page * PAGE, AccessSize::Word).map(|_| ())
            };
            prop_assert!(result.is_ok());

            let id = vm.current_space_id();
            let resident: Vec<u32> = (0..8)
                .map(|vpn| vm.entry(id, vpn))
                .filter(|e| e.valid)
                .map(|e| e.physical_frame)
                .collect();
            let mut sorted = resident.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), resident.len());
            prop_assert_eq!(vm.allocator().free_frames().len() + resident.len(), frames);
            vm.assert_invariants();
        }
    }

    #[test]
    fn misaligned_words_always_rejected(
        addr in any::<u32>(),
        writing in any::<bool>(),
        lookaside in any::<bool>(),
    ) {
        prop_assume!(addr % 4 != 0);
        let mut vm = if lookaside {
            let mut vm = VmManager::new(MachineConfig::default()).unwrap();
            let id = vm.create_space(SpaceConfig::Lookaside { size: 4 }).unwrap();
            vm.switch_to(id);
            vm
        } else {
            paged(2, 8, SwapPolicy::Fifo)
        };
        let result = vm.translate(addr, AccessSize::Word, writing);
        prop_assert_eq!(result, Err(Exception::AddressError));
    }

    #[test]
    fn read_only_pages_reject_writes(
        page in 0u32..4,
        size in arb_size(),
        resident in any::<bool>(),
    ) {
        let mut vm = paged(2, 4, SwapPolicy::Fifo);
        if resident {
            vm.read_mem(page * PAGE, AccessSize::Byte).unwrap();
        }
        vm.current_space_mut().page_table_mut().unwrap()[page as usize].read_only = true;
        prop_assert_eq!(vm.translate(page * PAGE, size, true), Err(Exception::ReadOnly));

        let mut vm = VmManager::new(MachineConfig::default()).unwrap();
        let id = vm.create_space(SpaceConfig::Lookaside { size: 1 }).unwrap();
        vm.switch_to(id);
        vm.refill_lookaside(0, TranslationEntry::mapped(page, 0, true));
        prop_assert_eq!(vm.translate(page * 128, size, true), Err(Exception::ReadOnly));
    }

    #[test]
    fn bytes_survive_swap_round_trip(
        (frames, policy) in arb_evicting_geometry(),
        data in prop::collection::vec(any::<u8>(), PAGE as usize),
    ) {
        let mut vm = paged(frames, 4, policy);
        for (offset, &byte) in data.iter().enumerate() {
            vm.write_mem(offset as u32, AccessSize::Byte, u32::from(byte)).unwrap();
        }
        // cycle through the other pages until page 0 has been pushed out
        for _ in 0..2 {
            for page in 1..4u32 {
                vm.read_mem(page * PAGE, AccessSize::Byte).unwrap();
            }
        }
        let id = vm.current_space_id();
        prop_assert!(!vm.entry(id, 0).valid);

        for (offset, &byte) in data.iter().enumerate() {
            prop_assert_eq!(vm.read_mem(offset as u32, AccessSize::Byte), Ok(u32::from(byte)));
        }
        vm.assert_invariants();
    }
}
