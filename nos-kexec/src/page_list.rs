//! Page-description table passed to the relocation routine
//!
//! Slot numbers are part of the routine's ABI and must not move.

use static_assertions::const_assert_eq;

use crate::physical::{PhysAddr, VirtAddr};
use crate::pgtable::TableAddresses;

pub const PA_CONTROL_PAGE: usize = 0;
pub const VA_CONTROL_PAGE: usize = 1;
pub const PA_PGD: usize = 2;
pub const VA_PGD: usize = 3;
pub const PA_PTE_0: usize = 4;
pub const VA_PTE_0: usize = 5;
pub const PA_PTE_1: usize = 6;
pub const VA_PTE_1: usize = 7;
pub const PA_SWAP_PAGE: usize = 8;
pub const PA_PMD_0: usize = 9;
pub const VA_PMD_0: usize = 10;
pub const PA_PMD_1: usize = 11;
pub const VA_PMD_1: usize = 12;
pub const PAGES_NR: usize = 13;

const_assert_eq!(VA_PMD_1 + 1, PAGES_NR);

/// Control page and translation tables as physical/virtual pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct PageList {
    slots: [usize; PAGES_NR],
}

impl PageList {
    pub const fn empty() -> Self {
        Self {
            slots: [0; PAGES_NR],
        }
    }

    /// Fill every slot the routine reads. The PMD slots are only written for
    /// PAE tables and the swap slot only when `swap_page` is given.
    pub fn build(
        control: PhysAddr,
        control_va: VirtAddr,
        tables: &TableAddresses,
        swap_page: Option<PhysAddr>,
        pae: bool,
    ) -> Self {
        let mut list = Self::empty();
        list.slots[PA_CONTROL_PAGE] = control.as_usize();
        list.slots[VA_CONTROL_PAGE] = control_va.as_usize();
        list.slots[PA_PGD] = tables.pgd.phys.as_usize();
        list.slots[VA_PGD] = tables.pgd.virt.as_usize();
        if pae {
            list.slots[PA_PMD_0] = tables.pmd0.phys.as_usize();
            list.slots[VA_PMD_0] = tables.pmd0.virt.as_usize();
            list.slots[PA_PMD_1] = tables.pmd1.phys.as_usize();
            list.slots[VA_PMD_1] = tables.pmd1.virt.as_usize();
        }
        list.slots[PA_PTE_0] = tables.pte0.phys.as_usize();
        list.slots[VA_PTE_0] = tables.pte0.virt.as_usize();
        list.slots[PA_PTE_1] = tables.pte1.phys.as_usize();
        list.slots[VA_PTE_1] = tables.pte1.virt.as_usize();
        if let Some(swap) = swap_page {
            list.slots[PA_SWAP_PAGE] = swap.as_usize();
        }
        list
    }

    /// Raw slot value; zero for slots that were not filled.
    pub fn get(&self, slot: usize) -> usize {
        self.slots.get(slot).copied().unwrap_or(0)
    }

    pub fn swap_page(&self) -> Option<PhysAddr> {
        match self.slots[PA_SWAP_PAGE] {
            0 => None,
            pa => Some(PhysAddr::new(pa)),
        }
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.slots
    }

    /// Address handed to the routine.
    pub fn as_ptr(&self) -> *const usize {
        self.slots.as_ptr()
    }
}

impl Default for PageList {
    fn default() -> Self {
        Self::empty()
    }
}
