//! Privileged processor operations used by the transition
//!
//! Everything here touches CPU state that the rest of the kernel relies on.
//! `arch::x86_32::X86Processor` is the real implementation; tests substitute
//! fakes to observe ordering.

#[cfg(test)]
use mockall::automock;

use crate::context::ProcessorContext;
use crate::descriptor::{Selector, TablePointer};

#[cfg_attr(test, automock)]
pub trait Processor {
    /// The CPU supports PAE; passed through to the relocation routine.
    fn has_pae(&self) -> bool;

    /// Mask local interrupt delivery.
    fn disable_interrupts(&mut self);

    /// Reload CS through a far jump to `code`, then every data segment
    /// register with `data`.
    fn load_segments(&mut self, code: Selector, data: Selector);

    fn load_gdt(&mut self, table: TablePointer);

    fn load_idt(&mut self, table: TablePointer);

    /// Snapshot the full processor state.
    fn save_context(&mut self) -> ProcessorContext;

    /// Put back a snapshot taken by `save_context`.
    fn restore_context(&mut self, context: &ProcessorContext);

    /// Stop until the next event that gets through with interrupts masked.
    /// Callers that must never continue loop on it.
    fn halt(&mut self);
}
