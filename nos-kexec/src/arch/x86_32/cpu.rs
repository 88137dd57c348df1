//! `Processor` for 32-bit x86

use core::arch::asm;

use x86::cpuid::CpuId;

use super::dtables;
use crate::context::ProcessorContext;
use crate::descriptor::{Selector, TablePointer};
use crate::processor::Processor;

/// The CPU this code is running on.
#[derive(Debug, Default, Clone, Copy)]
pub struct X86Processor;

impl X86Processor {
    pub const fn new() -> Self {
        Self
    }
}

macro_rules! read_cr {
    ($cr:literal) => {{
        let value: usize;
        unsafe {
            asm!(concat!("mov {}, ", $cr), out(reg) value, options(nomem, nostack, preserves_flags))
        };
        value
    }};
}

macro_rules! write_cr {
    ($cr:literal, $value:expr) => {
        unsafe {
            asm!(concat!("mov ", $cr, ", {}"), in(reg) $value, options(nostack, preserves_flags))
        }
    };
}

fn read_eflags() -> usize {
    let flags: usize;
    unsafe { asm!("pushfd", "pop {}", out(reg) flags, options(nomem, preserves_flags)) };
    flags
}

unsafe fn write_eflags(flags: usize) {
    unsafe { asm!("push {}", "popfd", in(reg) flags, options(nomem)) };
}

impl Processor for X86Processor {
    fn has_pae(&self) -> bool {
        CpuId::new()
            .get_feature_info()
            .is_some_and(|info| info.has_pae())
    }

    fn disable_interrupts(&mut self) {
        unsafe { x86::irq::disable() };
    }

    fn load_segments(&mut self, code: Selector, data: Selector) {
        unsafe {
            dtables::reload_cs(code);
            dtables::reload_data_segments(data);
        }
    }

    fn load_gdt(&mut self, table: TablePointer) {
        unsafe { dtables::set_gdt(table) };
    }

    fn load_idt(&mut self, table: TablePointer) {
        unsafe { dtables::set_idt(table) };
    }

    fn save_context(&mut self) -> ProcessorContext {
        let segments = dtables::store_segments();
        ProcessorContext {
            cr0: read_cr!("cr0"),
            cr2: read_cr!("cr2"),
            cr3: read_cr!("cr3"),
            cr4: read_cr!("cr4"),
            eflags: read_eflags(),
            gdt: dtables::store_gdt(),
            idt: dtables::store_idt(),
            ldt: dtables::store_ldt(),
            tr: dtables::store_tr(),
            cs: segments.cs,
            ds: segments.ds,
            es: segments.es,
            fs: segments.fs,
            gs: segments.gs,
            ss: segments.ss,
        }
    }

    fn halt(&mut self) {
        unsafe { x86::halt() };
    }

    fn restore_context(&mut self, context: &ProcessorContext) {
        // Paging state first so the descriptor tables are reachable again.
        write_cr!("cr4", context.cr4);
        write_cr!("cr3", context.cr3);
        write_cr!("cr2", context.cr2);
        write_cr!("cr0", context.cr0);

        unsafe {
            dtables::set_gdt(context.gdt);
            dtables::set_idt(context.idt);
            dtables::reload_cs(Selector::from_raw(context.cs));

            let load = |sel: u16| x86::segmentation::SegmentSelector::from_raw(sel);
            x86::segmentation::load_ss(load(context.ss));
            x86::segmentation::load_ds(load(context.ds));
            x86::segmentation::load_es(load(context.es));
            x86::segmentation::load_fs(load(context.fs));
            x86::segmentation::load_gs(load(context.gs));

            if context.tr != 0 {
                dtables::load_tr(context.gdt, context.tr);
            }
            dtables::load_ldt(context.ldt);

            write_eflags(context.eflags);
        }
    }
}
