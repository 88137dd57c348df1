//! Architecture backends
//!
//! Only the 32-bit x86 backend exists; on other targets the crate still
//! builds so the orchestration can be exercised against fakes.

#[cfg(target_arch = "x86")]
pub mod x86_32;
