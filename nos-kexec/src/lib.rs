//! NOS Kexec
//!
//! Warm handoff from the running kernel to a loaded kernel image on 32-bit
//! x86. The crate builds the identity-mapped page tables the relocation
//! routine runs on, neutralizes segment and descriptor-table state, and for
//! preserve-context images saves and restores enough of the CPU to come
//! back after the other kernel jumps back.
//!
//! Loading the image (segments, indirection list, control page allocation)
//! happens elsewhere; this crate starts once a [`KexecImage`] is complete.

#![cfg_attr(not(test), no_std)]
#![warn(clippy::all)]

pub mod error;
pub mod physical;
pub mod config;
pub mod descriptor;
pub mod processor;
pub mod context;
pub mod pgtable;
pub mod image;
pub mod page_list;
pub mod relocate;
pub mod machine;
pub mod arch;

// Re-export commonly used types and functions
pub use error::{KexecError, Result};
pub use physical::{DirectMap, PhysAddr, VirtAddr, PAGE_SIZE};
pub use config::KexecConfig;
pub use descriptor::{Selector, TablePointer};
pub use processor::Processor;
pub use context::{GlobalTrace, IrqQuiesce, ProcessorContext, QuiesceFn, TraceSwitch};
pub use pgtable::{machine_kexec_cleanup, machine_kexec_prepare, ReservedTables, KEXEC_TABLES};
pub use image::{ImageType, KexecImage};
pub use page_list::PageList;
pub use relocate::{CopiedRelocator, RelocationArgs, RelocationEntry};
pub use machine::{
    KexecMachine, ReplaceTransition, ResumeToken, Stage, StageObserver, SuspendTransition,
};
