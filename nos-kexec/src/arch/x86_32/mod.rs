//! 32-bit x86 backend

pub mod cpu;
pub mod dtables;

pub use cpu::X86Processor;
