//! Address-space builder
//!
//! The relocation routine switches CR3 to a private page directory while it
//! is still executing from the control page. That directory is built here,
//! in statically reserved storage, because nothing can be allocated once the
//! transition has started. Two translations are installed: the control
//! page at its kernel virtual address (so the instruction after the CR3
//! write still fetches) and at its physical address (so the routine can
//! turn paging off from an identity-mapped page).

use core::cell::UnsafeCell;
use core::mem::{align_of, size_of};
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, Ordering};

use bitflags::bitflags;
use static_assertions::{assert_eq_size, const_assert_eq};

use crate::error::{KexecError, Result};
use crate::image::KexecImage;
use crate::physical::{DirectMap, PhysAddr, VirtAddr, PAGE_SIZE};

bitflags! {
    /// x86 page table entry attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PageFlags: u64 {
        const PRESENT = 1 << 0;
        const WRITABLE = 1 << 1;
        const USER = 1 << 2;
        const ACCESSED = 1 << 5;
        const DIRTY = 1 << 6;
    }
}

/// Attributes of every non-root entry: kernel, writable, pre-set A/D bits so
/// the walker never writes back into the tables.
pub const PAGE_ATTR: PageFlags = PageFlags::PRESENT
    .union(PageFlags::WRITABLE)
    .union(PageFlags::ACCESSED)
    .union(PageFlags::DIRTY);

const FRAME_MASK_32: u64 = 0xFFFF_F000;
const FRAME_MASK_PAE: u64 = 0x000F_FFFF_FFFF_F000;

/// One page-aligned translation table.
///
/// Stored as 1024 words; PAE tables view the same storage as 512 64-bit
/// entries, low word first.
#[repr(C, align(4096))]
pub struct TablePage {
    words: [u32; 1024],
}

assert_eq_size!(TablePage, [u8; PAGE_SIZE]);
const_assert_eq!(align_of::<TablePage>(), PAGE_SIZE);

impl TablePage {
    pub const fn zeroed() -> Self {
        Self { words: [0; 1024] }
    }

    pub fn clear(&mut self) {
        self.words = [0; 1024];
    }

    pub fn is_clear(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Entry `index`, 32-bit or 64-bit wide depending on `pae`.
    pub fn entry(&self, index: usize, pae: bool) -> u64 {
        if pae {
            let lo = self.words[2 * index] as u64;
            let hi = self.words[2 * index + 1] as u64;
            lo | (hi << 32)
        } else {
            self.words[index] as u64
        }
    }

    pub fn set_entry(&mut self, index: usize, value: u64, pae: bool) {
        if pae {
            self.words[2 * index] = value as u32;
            self.words[2 * index + 1] = (value >> 32) as u32;
        } else {
            self.words[index] = value as u32;
        }
    }
}

/// Physical and virtual location of one reserved table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableAddress {
    pub phys: PhysAddr,
    pub virt: VirtAddr,
}

/// Locations of all reserved tables, as published in the page list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableAddresses {
    pub pgd: TableAddress,
    pub pmd0: TableAddress,
    pub pmd1: TableAddress,
    pub pte0: TableAddress,
    pub pte1: TableAddress,
}

impl TableAddresses {
    /// Every table in page-list order, PAE middle tables last.
    pub fn all(&self) -> [TableAddress; 5] {
        [self.pgd, self.pte0, self.pte1, self.pmd0, self.pmd1]
    }
}

/// Which of the two translation chains an address goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    Virtual,
    Identity,
}

impl Chain {
    fn pick<T>(self, for_virtual: T, for_identity: T) -> T {
        match self {
            Chain::Virtual => for_virtual,
            Chain::Identity => for_identity,
        }
    }
}

/// The translation tables handed to the relocation routine.
#[repr(C)]
pub struct KexecPageTables {
    pgd: TablePage,
    pmd0: TablePage,
    pmd1: TablePage,
    pte0: TablePage,
    pte1: TablePage,
}

impl KexecPageTables {
    pub const fn new() -> Self {
        Self {
            pgd: TablePage::zeroed(),
            pmd0: TablePage::zeroed(),
            pmd1: TablePage::zeroed(),
            pte0: TablePage::zeroed(),
            pte1: TablePage::zeroed(),
        }
    }

    pub fn addresses(&self, dm: &DirectMap) -> TableAddresses {
        let at = |table: &TablePage| {
            let virt = VirtAddr::of(table);
            TableAddress {
                phys: dm.pa(virt),
                virt,
            }
        };
        TableAddresses {
            pgd: at(&self.pgd),
            pmd0: at(&self.pmd0),
            pmd1: at(&self.pmd1),
            pte0: at(&self.pte0),
            pte1: at(&self.pte1),
        }
    }

    pub fn clear(&mut self) {
        self.pgd.clear();
        self.pmd0.clear();
        self.pmd1.clear();
        self.pte0.clear();
        self.pte1.clear();
    }

    pub fn is_clear(&self) -> bool {
        self.pgd.is_clear()
            && self.pmd0.is_clear()
            && self.pmd1.is_clear()
            && self.pte0.is_clear()
            && self.pte1.is_clear()
    }

    /// Rebuild the tables so that both `control_va` and `control` itself
    /// translate to `control`.
    ///
    /// Never allocates and never fails; safe to call with interrupts off.
    pub fn map_control_page(
        &mut self,
        control: PhysAddr,
        control_va: VirtAddr,
        dm: &DirectMap,
        pae: bool,
    ) {
        let addrs = self.addresses(dm);
        self.clear();
        self.map_page(control_va.as_usize(), control, Chain::Virtual, &addrs, pae);
        self.map_page(control.as_usize(), control, Chain::Identity, &addrs, pae);
    }

    /// Map `addr` to `target`. Links already present in the upper levels are
    /// followed instead of replaced, so the two chains can share a directory
    /// slot when the direct map offset is small.
    fn map_page(
        &mut self,
        addr: usize,
        target: PhysAddr,
        chain: Chain,
        addrs: &TableAddresses,
        pae: bool,
    ) {
        let attr = PAGE_ATTR.bits();
        let pte_pa = chain.pick(addrs.pte0.phys, addrs.pte1.phys);

        let pte_chain = if pae {
            // PDPT entries only accept the present bit.
            let pmd_pa = chain.pick(addrs.pmd0.phys, addrs.pmd1.phys);
            let pmd_chain = link(
                &mut self.pgd,
                pdpt_index(addr),
                (addrs.pmd0.phys, addrs.pmd1.phys),
                frame(pmd_pa, pae) | PageFlags::PRESENT.bits(),
                chain,
                pae,
            );
            let pmd = match pmd_chain {
                Chain::Virtual => &mut self.pmd0,
                Chain::Identity => &mut self.pmd1,
            };
            link(
                pmd,
                pmd_index(addr),
                (addrs.pte0.phys, addrs.pte1.phys),
                frame(pte_pa, pae) | attr,
                chain,
                pae,
            )
        } else {
            link(
                &mut self.pgd,
                pgd_index(addr),
                (addrs.pte0.phys, addrs.pte1.phys),
                frame(pte_pa, pae) | attr,
                chain,
                pae,
            )
        };

        let pte = match pte_chain {
            Chain::Virtual => &mut self.pte0,
            Chain::Identity => &mut self.pte1,
        };
        pte.set_entry(pte_index(addr, pae), frame(target, pae) | attr, pae);
    }

    /// Walk the tables the way the MMU would, following only links into the
    /// reserved tables themselves.
    pub fn translate(&self, addr: usize, dm: &DirectMap, pae: bool) -> Option<PhysAddr> {
        let addrs = self.addresses(dm);
        let present = PageFlags::PRESENT.bits();

        let pte = if pae {
            let pdpte = self.pgd.entry(pdpt_index(addr), pae);
            if pdpte & present == 0 {
                return None;
            }
            let pmd = lookup(pdpte, &[(addrs.pmd0, &self.pmd0), (addrs.pmd1, &self.pmd1)], pae)?;
            let pde = pmd.entry(pmd_index(addr), pae);
            if pde & present == 0 {
                return None;
            }
            lookup(pde, &[(addrs.pte0, &self.pte0), (addrs.pte1, &self.pte1)], pae)?
        } else {
            let pde = self.pgd.entry(pgd_index(addr), pae);
            if pde & present == 0 {
                return None;
            }
            lookup(pde, &[(addrs.pte0, &self.pte0), (addrs.pte1, &self.pte1)], pae)?
        };

        let leaf = pte.entry(pte_index(addr, pae), pae);
        if leaf & present == 0 {
            return None;
        }
        let mask = if pae { FRAME_MASK_PAE } else { FRAME_MASK_32 };
        Some(PhysAddr::new((leaf & mask) as usize | (addr & (PAGE_SIZE - 1))))
    }

}

impl Default for KexecPageTables {
    fn default() -> Self {
        Self::new()
    }
}

/// The reserved table an entry links to, if it links to one at all.
fn lookup<'t>(
    entry: u64,
    candidates: &[(TableAddress, &'t TablePage)],
    pae: bool,
) -> Option<&'t TablePage> {
    let mask = if pae { FRAME_MASK_PAE } else { FRAME_MASK_32 };
    candidates
        .iter()
        .find(|(addr, _)| frame(addr.phys, pae) == entry & mask)
        .map(|(_, table)| *table)
}

/// Chain the entry at `index` of `table` leads into. An empty slot is
/// filled with `entry`, which links into `chain`.
fn link(
    table: &mut TablePage,
    index: usize,
    (for_virtual, for_identity): (PhysAddr, PhysAddr),
    entry: u64,
    chain: Chain,
    pae: bool,
) -> Chain {
    let mask = if pae { FRAME_MASK_PAE } else { FRAME_MASK_32 };
    let current = table.entry(index, pae);
    if current & PageFlags::PRESENT.bits() != 0 {
        if current & mask == frame(for_virtual, pae) {
            return Chain::Virtual;
        }
        if current & mask == frame(for_identity, pae) {
            return Chain::Identity;
        }
    }
    table.set_entry(index, entry, pae);
    chain
}

fn frame(pa: PhysAddr, pae: bool) -> u64 {
    let mask = if pae { FRAME_MASK_PAE } else { FRAME_MASK_32 };
    pa.as_usize() as u64 & mask
}

fn pgd_index(addr: usize) -> usize {
    (addr >> 22) & 0x3FF
}

fn pdpt_index(addr: usize) -> usize {
    (addr >> 30) & 0x3
}

fn pmd_index(addr: usize) -> usize {
    (addr >> 21) & 0x1FF
}

fn pte_index(addr: usize, pae: bool) -> usize {
    if pae {
        (addr >> 12) & 0x1FF
    } else {
        (addr >> 12) & 0x3FF
    }
}

/// Statically reserved tables with an armed/idle lifecycle.
///
/// At most one transition may hold the tables at a time. `arm` rejects a
/// second claimant instead of waiting for it: serializing transitions is
/// the caller's job, the kexec path never blocks.
pub struct ReservedTables {
    armed: AtomicBool,
    tables: UnsafeCell<KexecPageTables>,
}

// SAFETY: `tables` is only reachable through an `ArmedTables`, and `armed`
// guarantees there is at most one of those alive.
unsafe impl Sync for ReservedTables {}

impl ReservedTables {
    pub const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            tables: UnsafeCell::new(KexecPageTables::new()),
        }
    }

    /// Claim the tables for one transition.
    pub fn arm(&self) -> Result<ArmedTables<'_>> {
        self.armed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| KexecError::TablesBusy)?;
        Ok(ArmedTables { owner: self })
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }
}

impl Default for ReservedTables {
    fn default() -> Self {
        Self::new()
    }
}

/// The kernel-wide kexec tables.
pub static KEXEC_TABLES: ReservedTables = ReservedTables::new();

/// Exclusive access to the reserved tables for the duration of a transition.
/// Dropping it returns the tables to idle.
pub struct ArmedTables<'a> {
    owner: &'a ReservedTables,
}

impl Deref for ArmedTables<'_> {
    type Target = KexecPageTables;

    fn deref(&self) -> &KexecPageTables {
        // SAFETY: the armed flag makes this the only handle to the tables.
        unsafe { &*self.owner.tables.get() }
    }
}

impl DerefMut for ArmedTables<'_> {
    fn deref_mut(&mut self) -> &mut KexecPageTables {
        // SAFETY: as above; `&mut self` makes the borrow unique.
        unsafe { &mut *self.owner.tables.get() }
    }
}

impl Drop for ArmedTables<'_> {
    fn drop(&mut self) {
        self.owner.armed.store(false, Ordering::Release);
    }
}

/// Validate the image and prepare the control page ahead of the transition.
///
/// Would mark the control page executable once the platform enforces NX;
/// until then there is nothing to do and it cannot fail.
pub fn machine_kexec_prepare(image: &KexecImage) -> Result<()> {
    log::debug!(
        "kexec: prepare image, control page {:#x}",
        image.control_code_page.as_usize()
    );
    Ok(())
}

/// Undo anything left over by `machine_kexec_prepare` when an image is freed.
pub fn machine_kexec_cleanup(image: &KexecImage) {
    log::debug!(
        "kexec: cleanup image, control page {:#x}",
        image.control_code_page.as_usize()
    );
}

/// Bytes of static storage reserved for the tables.
pub const RESERVED_TABLE_BYTES: usize = size_of::<KexecPageTables>();
