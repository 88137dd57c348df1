//! Kexec error handling
//!
//! Only pre-flight conditions are representable here. Once a transition has
//! masked interrupts there is no channel left to report anything, so every
//! variant below is produced before that point.

use core::fmt;

/// Kexec error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KexecError {
    /// Image errors
    NullControlPage,
    MisalignedControlPage,
    MissingSwapPage,

    /// The reserved translation tables already belong to another transition
    TablesBusy,

    /// Preserve-context transition requested without a quiesce capability
    QuiesceUnavailable,

    /// Transition kind does not match the image
    ContextNotPreserved,
    ContextPreserved,

    /// Configuration errors
    InvalidConfig(&'static str),
}

impl KexecError {
    /// Convert to an error code suitable for returning to the caller's ABI
    pub fn as_error_code(&self) -> u32 {
        match self {
            KexecError::NullControlPage => 0x1000,
            KexecError::MisalignedControlPage => 0x1001,
            KexecError::MissingSwapPage => 0x1002,
            KexecError::TablesBusy => 0x2000,
            KexecError::QuiesceUnavailable => 0x3000,
            KexecError::ContextNotPreserved => 0x4000,
            KexecError::ContextPreserved => 0x4001,
            KexecError::InvalidConfig(_) => 0x5000,
        }
    }
}

impl fmt::Display for KexecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KexecError::NullControlPage => write!(f, "Control page is null"),
            KexecError::MisalignedControlPage => write!(f, "Control page is not page-aligned"),
            KexecError::MissingSwapPage => write!(f, "Replace image has no swap page"),
            KexecError::TablesBusy => write!(f, "Kexec page tables are already armed"),
            KexecError::QuiesceUnavailable => {
                write!(f, "No interrupt controller quiesce routine for preserve-context image")
            }
            KexecError::ContextNotPreserved => write!(f, "Image does not preserve context"),
            KexecError::ContextPreserved => write!(f, "Image preserves context"),
            KexecError::InvalidConfig(msg) => write!(f, "Invalid kexec configuration: {}", msg),
        }
    }
}

/// Result type for kexec operations
pub type Result<T> = core::result::Result<T, KexecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            KexecError::NullControlPage,
            KexecError::MisalignedControlPage,
            KexecError::MissingSwapPage,
            KexecError::TablesBusy,
            KexecError::QuiesceUnavailable,
            KexecError::ContextNotPreserved,
            KexecError::ContextPreserved,
            KexecError::InvalidConfig("x"),
        ];
        for (i, a) in errors.iter().enumerate() {
            for b in &errors[i + 1..] {
                assert_ne!(a.as_error_code(), b.as_error_code());
            }
        }
    }

    #[test]
    fn test_display_includes_config_reason() {
        let msg = KexecError::InvalidConfig("page_offset").to_string();
        assert!(msg.contains("page_offset"));
    }
}
