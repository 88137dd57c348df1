//! Physical and direct-mapped virtual addresses

/// Page size (4KB)
pub const PAGE_SIZE: usize = 4096;

/// A physical address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct PhysAddr(pub usize);

impl PhysAddr {
    /// Creates a new physical address from a raw usize value.
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Returns the physical address as a raw usize value.
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Returns the offset within the current page.
    pub const fn page_offset(self) -> usize {
        self.0 & (PAGE_SIZE - 1)
    }

    /// Checks if the physical address is page-aligned.
    pub const fn is_page_aligned(self) -> bool {
        self.page_offset() == 0
    }

    /// Checks for the null address.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// A kernel virtual address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct VirtAddr(pub usize);

impl VirtAddr {
    /// Creates a new virtual address from a raw usize value.
    pub const fn new(addr: usize) -> Self {
        Self(addr)
    }

    /// Virtual address of a kernel object.
    pub fn of<T>(object: &T) -> Self {
        Self(object as *const T as usize)
    }

    /// Returns the virtual address as a raw usize value.
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Returns the address as a mutable byte pointer.
    pub const fn as_mut_ptr(self) -> *mut u8 {
        self.0 as *mut u8
    }
}

/// Linear direct map of low physical memory into the kernel half.
///
/// Mirrors the kernel's `__pa`/`__va` pair: `va = pa + page_offset`. Only
/// valid for lowmem; the control page and the reserved tables always are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectMap {
    page_offset: usize,
}

impl DirectMap {
    /// Direct map starting at `page_offset`.
    pub const fn new(page_offset: usize) -> Self {
        Self { page_offset }
    }

    /// Physical address behind a direct-mapped virtual address.
    #[inline]
    pub const fn pa(&self, va: VirtAddr) -> PhysAddr {
        PhysAddr(va.0.wrapping_sub(self.page_offset))
    }

    /// Direct-mapped virtual address of a physical address.
    #[inline]
    pub const fn va(&self, pa: PhysAddr) -> VirtAddr {
        VirtAddr(pa.0.wrapping_add(self.page_offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alignment_and_null() {
        assert!(PhysAddr::new(0x3000).is_page_aligned());
        assert!(!PhysAddr::new(0x3004).is_page_aligned());
        assert_eq!(PhysAddr::new(0x3004).page_offset(), 4);
        assert!(PhysAddr::default().is_null());
    }

    #[test]
    fn test_direct_map_round_trip() {
        let dm = DirectMap::new(0xC000_0000);
        let pa = PhysAddr::new(0x0123_4000);
        assert_eq!(dm.va(pa), VirtAddr::new(0xC123_4000));
        assert_eq!(dm.pa(dm.va(pa)), pa);
        // phys_to_virt(0) is the base of the map
        assert_eq!(dm.va(PhysAddr::new(0)).as_usize(), 0xC000_0000);
    }
}
