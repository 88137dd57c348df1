//! Kexec configuration

use crate::descriptor::Selector;
use crate::error::{KexecError, Result};
use crate::physical::{DirectMap, PAGE_SIZE};

/// Start of the kernel direct map on a 3G/1G split.
pub const DEFAULT_PAGE_OFFSET: usize = 0xC000_0000;

/// Upper bound on the relocation routine copied into the control page.
pub const KEXEC_CONTROL_CODE_MAX_SIZE: usize = 2048;

/// `__KERNEL_CS`: GDT entry 12.
pub const KERNEL_CS: Selector = Selector::new(12, 0);
/// `__KERNEL_DS`: GDT entry 13.
pub const KERNEL_DS: Selector = Selector::new(13, 0);

/// Per-kernel parameters of the handoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KexecConfig {
    /// Base of the direct map used for `__pa`/`__va`.
    pub page_offset: usize,
    /// Reserved tables use the three-level PAE layout.
    pub pae: bool,
    /// Code selector used for the far jump that refreshes CS.
    pub kernel_cs: Selector,
    /// Flat data selector loaded into every data segment register.
    pub kernel_ds: Selector,
    /// Bytes of relocation routine copied into the control page.
    pub control_code_max_size: usize,
    /// Report each transition stage through `log::trace!`.
    pub trace_stages: bool,
}

impl Default for KexecConfig {
    fn default() -> Self {
        Self {
            page_offset: DEFAULT_PAGE_OFFSET,
            pae: cfg!(feature = "pae"),
            kernel_cs: KERNEL_CS,
            kernel_ds: KERNEL_DS,
            control_code_max_size: KEXEC_CONTROL_CODE_MAX_SIZE,
            trace_stages: cfg!(feature = "debug"),
        }
    }
}

impl KexecConfig {
    /// Direct map described by `page_offset`.
    pub fn direct_map(&self) -> DirectMap {
        DirectMap::new(self.page_offset)
    }

    /// Reject values the transition cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.page_offset % PAGE_SIZE != 0 {
            return Err(KexecError::InvalidConfig("page_offset not page-aligned"));
        }
        if self.control_code_max_size == 0 || self.control_code_max_size > PAGE_SIZE {
            return Err(KexecError::InvalidConfig("control code must fit one page"));
        }
        if self.kernel_cs.is_null() || self.kernel_ds.is_null() {
            return Err(KexecError::InvalidConfig("null kernel selector"));
        }
        if self.kernel_cs.is_local() || self.kernel_ds.is_local() {
            return Err(KexecError::InvalidConfig("kernel selector points into the LDT"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = KexecConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.kernel_cs.bits(), 0x60);
        assert_eq!(config.kernel_ds.bits(), 0x68);
    }

    #[test]
    fn test_rejects_oversized_control_code() {
        let config = KexecConfig {
            control_code_max_size: PAGE_SIZE + 1,
            ..KexecConfig::default()
        };
        assert!(matches!(config.validate(), Err(KexecError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_unaligned_page_offset() {
        let config = KexecConfig {
            page_offset: 0xC000_0800,
            ..KexecConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_null_selector() {
        let config = KexecConfig {
            kernel_ds: Selector::from_raw(0),
            ..KexecConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
