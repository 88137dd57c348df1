//! Loaded kexec image as seen by the handoff
//!
//! The loader owns the image and the pages behind it; the handoff only reads
//! what it needs and, after a resumed transition, writes back the entry
//! address the relocation routine handed out.

use crate::error::{KexecError, Result};
use crate::physical::PhysAddr;

/// Kind of image being jumped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum ImageType {
    /// Replace the running kernel (`KEXEC_TYPE_DEFAULT`).
    #[default]
    Default = 0,
    /// Crash-capture kernel loaded into reserved memory (`KEXEC_TYPE_CRASH`).
    Crash = 1,
}

impl ImageType {
    /// Images of this type are copied into place through a swap page.
    pub fn uses_swap_page(&self) -> bool {
        matches!(self, ImageType::Default)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KexecImage {
    /// Entry point of the destination kernel. After a resumed transition,
    /// the address to re-enter it through.
    pub start: usize,
    /// Head of the indirection list describing source/destination pages.
    pub head: usize,
    pub image_type: ImageType,
    /// Come back to this kernel once the destination jumps back.
    pub preserve_context: bool,
    /// Page the relocation routine is copied into and executed from.
    pub control_code_page: PhysAddr,
    /// Scratch page used while swapping pages into place.
    pub swap_page: Option<PhysAddr>,
}

impl KexecImage {
    pub fn new(start: usize, head: usize, control_code_page: PhysAddr) -> Self {
        Self {
            start,
            head,
            image_type: ImageType::Default,
            preserve_context: false,
            control_code_page,
            swap_page: None,
        }
    }

    pub fn with_type(mut self, image_type: ImageType) -> Self {
        self.image_type = image_type;
        self
    }

    pub fn with_swap_page(mut self, swap_page: PhysAddr) -> Self {
        self.swap_page = Some(swap_page);
        self
    }

    pub fn preserving_context(mut self) -> Self {
        self.preserve_context = true;
        self
    }

    /// Checks that have to pass before the transition is armed.
    pub fn validate(&self) -> Result<()> {
        if self.control_code_page.is_null() {
            return Err(KexecError::NullControlPage);
        }
        if !self.control_code_page.is_page_aligned() {
            return Err(KexecError::MisalignedControlPage);
        }
        if self.image_type.uses_swap_page() {
            match self.swap_page {
                Some(page) if page.is_page_aligned() && !page.is_null() => {}
                _ => return Err(KexecError::MissingSwapPage),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_image_needs_swap_page() {
        let image = KexecImage::new(0x0100_0000, 0x0200_0000, PhysAddr::new(0x0300_0000));
        assert_eq!(image.validate(), Err(KexecError::MissingSwapPage));

        let image = image.with_swap_page(PhysAddr::new(0x0300_1000));
        assert!(image.validate().is_ok());
    }

    #[test]
    fn test_crash_image_ignores_swap_page() {
        let image = KexecImage::new(0x0100_0000, 0x0200_0000, PhysAddr::new(0x0300_0000))
            .with_type(ImageType::Crash);
        assert!(image.validate().is_ok());
    }

    #[test]
    fn test_control_page_checks() {
        let null = KexecImage::new(0x0100_0000, 0, PhysAddr::new(0)).with_type(ImageType::Crash);
        assert_eq!(null.validate(), Err(KexecError::NullControlPage));

        let odd = KexecImage::new(0x0100_0000, 0, PhysAddr::new(0x0300_0010))
            .with_type(ImageType::Crash);
        assert_eq!(odd.validate(), Err(KexecError::MisalignedControlPage));
    }
}
