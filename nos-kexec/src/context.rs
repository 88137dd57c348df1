//! Context preservation around a transition
//!
//! A preserve-context transition may come back: the relocation routine
//! returns into the original kernel, which then has to look exactly as it
//! did before. This module owns the snapshot taken on the way out, the
//! tracing flag that is parked for the whole window, and the quiesce of the
//! interrupt controller into legacy delivery mode.

use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(test)]
use mockall::automock;

use crate::descriptor::TablePointer;
use crate::processor::Processor;

/// Full processor state as seen by the kernel that is handing off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessorContext {
    pub cr0: usize,
    pub cr2: usize,
    pub cr3: usize,
    pub cr4: usize,
    pub eflags: usize,
    pub gdt: TablePointer,
    pub idt: TablePointer,
    pub ldt: u16,
    pub tr: u16,
    pub cs: u16,
    pub ds: u16,
    pub es: u16,
    pub fs: u16,
    pub gs: u16,
    pub ss: u16,
}

/// Global enable switch of the function tracer.
#[cfg_attr(test, automock)]
pub trait TraceSwitch {
    /// Disable tracing and return whether it was enabled.
    fn save_and_disable(&mut self) -> bool;

    /// Put back a value returned by `save_and_disable`.
    fn restore(&mut self, enabled: bool);
}

static TRACING_ENABLED: AtomicBool = AtomicBool::new(true);

/// Whether instrumentation currently records.
pub fn tracing_enabled() -> bool {
    TRACING_ENABLED.load(Ordering::Acquire)
}

pub fn set_tracing_enabled(enabled: bool) {
    TRACING_ENABLED.store(enabled, Ordering::Release);
}

/// `TraceSwitch` over the kernel-wide tracing flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct GlobalTrace;

impl TraceSwitch for GlobalTrace {
    fn save_and_disable(&mut self) -> bool {
        TRACING_ENABLED.swap(false, Ordering::AcqRel)
    }

    fn restore(&mut self, enabled: bool) {
        set_tracing_enabled(enabled);
    }
}

/// Switches the interrupt controller into legacy delivery so the next
/// kernel gets timer interrupts without programming an I/O APIC.
#[cfg_attr(test, automock)]
pub trait IrqQuiesce {
    fn enter_legacy_mode(&mut self);
}

/// Quiesce through a plain function, e.g. the kernel's `disable_io_apic`.
#[derive(Clone, Copy)]
pub struct QuiesceFn(pub fn());

impl IrqQuiesce for QuiesceFn {
    fn enter_legacy_mode(&mut self) {
        (self.0)()
    }
}

/// State captured on the way out of the original kernel.
#[must_use = "a saved context has to be restored on resume"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedContext {
    processor: Option<ProcessorContext>,
    tracing: bool,
}

impl SavedContext {
    /// Snapshot the processor when `preserve` is set, then park tracing.
    pub fn capture<P, T>(cpu: &mut P, trace: &mut T, preserve: bool) -> Self
    where
        P: Processor + ?Sized,
        T: TraceSwitch + ?Sized,
    {
        let processor = preserve.then(|| cpu.save_context());
        let tracing = trace.save_and_disable();
        Self { processor, tracing }
    }

    pub fn processor(&self) -> Option<&ProcessorContext> {
        self.processor.as_ref()
    }

    pub fn tracing_was_enabled(&self) -> bool {
        self.tracing
    }

    /// Undo `capture` in reverse order: tracing flag, then processor state.
    pub fn restore<P, T>(self, cpu: &mut P, trace: &mut T)
    where
        P: Processor + ?Sized,
        T: TraceSwitch + ?Sized,
    {
        trace.restore(self.tracing);
        if let Some(context) = self.processor.as_ref() {
            cpu.restore_context(context);
        }
    }
}

/// Force legacy interrupt delivery ahead of a preserve-context handoff.
pub fn quiesce_interrupts<Q: IrqQuiesce + ?Sized>(quiesce: &mut Q) {
    quiesce.enter_legacy_mode();
}
