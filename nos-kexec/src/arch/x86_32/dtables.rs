//! x86 descriptor tables and segment registers

use core::arch::asm;

use x86::dtables::{self, DescriptorTablePointer};
use x86::segmentation::{self, SegmentSelector};

use crate::descriptor::{Selector, TablePointer};

/// Busy bit in the access byte of a TSS descriptor.
const TSS_BUSY: u8 = 0x02;

fn to_raw(table: TablePointer) -> DescriptorTablePointer<u64> {
    DescriptorTablePointer {
        limit: table.limit,
        base: table.base as *const u64,
    }
}

fn from_raw(raw: &DescriptorTablePointer<u64>) -> TablePointer {
    let limit = raw.limit;
    let base = raw.base;
    TablePointer::new(base as usize, limit)
}

pub unsafe fn set_gdt(table: TablePointer) {
    unsafe { dtables::lgdt(&to_raw(table)) };
}

pub unsafe fn set_idt(table: TablePointer) {
    unsafe { dtables::lidt(&to_raw(table)) };
}

pub fn store_gdt() -> TablePointer {
    let mut raw = to_raw(TablePointer::default());
    unsafe { dtables::sgdt(&mut raw) };
    from_raw(&raw)
}

pub fn store_idt() -> TablePointer {
    let mut raw = to_raw(TablePointer::default());
    unsafe { dtables::sidt(&mut raw) };
    from_raw(&raw)
}

/// Reload CS with a far return to the next instruction.
pub unsafe fn reload_cs(code: Selector) {
    unsafe {
        asm!(
            "pushl {sel}",
            "pushl $2f",
            "lretl",
            "2:",
            sel = in(reg) code.bits() as u32,
            options(att_syntax)
        );
    }
}

/// Reload DS, ES, FS, GS and SS with `data`.
pub unsafe fn reload_data_segments(data: Selector) {
    let sel = SegmentSelector::from_raw(data.bits());
    unsafe {
        segmentation::load_ds(sel);
        segmentation::load_es(sel);
        segmentation::load_fs(sel);
        segmentation::load_gs(sel);
        segmentation::load_ss(sel);
    }
}

pub struct Segments {
    pub cs: u16,
    pub ds: u16,
    pub es: u16,
    pub fs: u16,
    pub gs: u16,
    pub ss: u16,
}

pub fn store_segments() -> Segments {
    Segments {
        cs: segmentation::cs().bits(),
        ds: segmentation::ds().bits(),
        es: segmentation::es().bits(),
        fs: segmentation::fs().bits(),
        gs: segmentation::gs().bits(),
        ss: segmentation::ss().bits(),
    }
}

pub fn store_ldt() -> u16 {
    let sel: u16;
    unsafe { asm!("sldt {0:x}", out(reg) sel, options(nomem, nostack, preserves_flags)) };
    sel
}

pub unsafe fn load_ldt(sel: u16) {
    unsafe { asm!("lldt {0:x}", in(reg) sel, options(nostack, preserves_flags)) };
}

pub fn store_tr() -> u16 {
    let sel: u16;
    unsafe { asm!("str {0:x}", out(reg) sel, options(nomem, nostack, preserves_flags)) };
    sel
}

/// Reload the task register. `ltr` faults on a busy TSS descriptor, so the
/// busy bit is cleared in `gdt` first.
pub unsafe fn load_tr(gdt: TablePointer, sel: u16) {
    let access = (gdt.base + (sel as usize & !0x7) + 5) as *mut u8;
    unsafe {
        *access &= !TSS_BUSY;
        asm!("ltr {0:x}", in(reg) sel, options(nostack, preserves_flags));
    }
}
