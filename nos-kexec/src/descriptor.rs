//! Descriptor neutralizer
//!
//! Segment registers have a visible selector and a hidden descriptor cache.
//! The cache is only refilled from the GDT when a selector is loaded, so the
//! transition force-loads every segment first and only then zaps the GDT and
//! IDT. Doing it the other way round faults on the reload.

use crate::config::KexecConfig;
use crate::physical::{DirectMap, PhysAddr};
use crate::processor::Processor;

/// Segment selector: descriptor index, table indicator, requested privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Selector(u16);

impl Selector {
    /// Selector for GDT entry `index` at privilege `rpl`.
    pub const fn new(index: u16, rpl: u8) -> Self {
        Self((index << 3) | (rpl & 0x3) as u16)
    }

    pub const fn from_raw(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn index(self) -> u16 {
        self.0 >> 3
    }

    /// Table indicator set: the selector refers to the LDT.
    pub const fn is_local(self) -> bool {
        self.0 & 0x4 != 0
    }

    /// The null selector (GDT entry 0, any RPL).
    pub const fn is_null(self) -> bool {
        self.index() == 0 && !self.is_local()
    }
}

/// Operand of `lgdt`/`lidt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TablePointer {
    pub base: usize,
    pub limit: u16,
}

impl TablePointer {
    pub const fn new(base: usize, limit: u16) -> Self {
        Self { base, limit }
    }

    /// `phys_to_virt(0)` with a zero limit. Any descriptor lookup through it
    /// faults, and with the IDT gone that fault is fatal.
    pub const fn invalid(dm: &DirectMap) -> Self {
        Self {
            base: dm.va(PhysAddr::new(0)).as_usize(),
            limit: 0,
        }
    }

    /// No descriptor fits below the limit.
    pub const fn is_empty(&self) -> bool {
        self.limit == 0
    }
}

/// Far-jump through the kernel code selector, then load the flat data
/// selector into DS, ES, FS, GS and SS.
pub fn flatten_segments<P: Processor + ?Sized>(cpu: &mut P, config: &KexecConfig) {
    cpu.load_segments(config.kernel_cs, config.kernel_ds);
}

/// Install invalid placeholder tables: GDT first, then IDT.
///
/// The caller must have flattened the segments already.
pub fn invalidate_tables<P: Processor + ?Sized>(cpu: &mut P, dm: &DirectMap) {
    let invalid = TablePointer::invalid(dm);
    cpu.load_gdt(invalid);
    cpu.load_idt(invalid);
}
