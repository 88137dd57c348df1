//! Relocation entry point
//!
//! The routine that copies the new kernel into place and jumps to it is not
//! part of this crate. It is copied into the control page and entered
//! exactly once per transition. The same physical call has two meanings:
//! for a replace transition it never comes back, for a preserve-context
//! transition it may return with the entry address of the kernel that
//! jumped back. The trait keeps those as two operations.

use crate::page_list::PageList;
use crate::physical::VirtAddr;

/// Arguments of one relocation call.
#[derive(Debug, Clone, Copy)]
pub struct RelocationArgs<'a> {
    /// Head of the image's indirection list.
    pub indirection_head: usize,
    pub page_list: &'a PageList,
    /// Where the routine was installed; also published in the page list.
    pub control_page: VirtAddr,
    /// Entry address of the destination kernel.
    pub start: usize,
    /// CPU supports PAE.
    pub has_pae: bool,
    pub preserve_context: bool,
}

pub trait RelocationEntry {
    /// Copy at most `max_len` bytes of the routine to `control_page`.
    ///
    /// # Safety
    ///
    /// `control_page` must be a mapped, writable page owned by the image.
    unsafe fn install(&mut self, control_page: VirtAddr, max_len: usize);

    /// Enter the installed routine for good.
    ///
    /// Returning at all means the routine was missing or misbehaved; the
    /// caller halts the CPU.
    ///
    /// # Safety
    ///
    /// Interrupts masked, descriptor tables invalidated, and `args` fully
    /// describing an installed routine and its tables.
    unsafe fn jump(&mut self, args: &RelocationArgs<'_>);

    /// Enter the installed routine and come back when the destination
    /// kernel jumps back. Returns the entry address to re-enter it through,
    /// or `None` if no routine was installed.
    ///
    /// # Safety
    ///
    /// As for [`RelocationEntry::jump`].
    unsafe fn call(&mut self, args: &RelocationArgs<'_>) -> Option<usize>;
}

/// Calling convention of the relocation routine: cdecl, all arguments on
/// the stack.
pub type RelocateKernelFn = unsafe extern "C" fn(
    indirection_page: usize,
    page_list: usize,
    start_address: usize,
    has_pae: u32,
    preserve_context: u32,
) -> usize;

/// Relocation routine given as position-independent machine code.
pub struct CopiedRelocator {
    code: &'static [u8],
    entry: Option<RelocateKernelFn>,
}

impl CopiedRelocator {
    pub const fn new(code: &'static [u8]) -> Self {
        Self { code, entry: None }
    }

    /// Routine delimited by two linker symbols.
    ///
    /// # Safety
    ///
    /// `start..end` must be the routine's code in the kernel image.
    pub unsafe fn from_symbols(start: *const u8, end: *const u8) -> Self {
        let len = (end as usize).saturating_sub(start as usize);
        Self::new(unsafe { core::slice::from_raw_parts(start, len) })
    }

    pub fn is_installed(&self) -> bool {
        self.entry.is_some()
    }

    unsafe fn enter(&self, args: &RelocationArgs<'_>) -> Option<usize> {
        let entry = self.entry?;
        Some(unsafe {
            entry(
                args.indirection_head,
                args.page_list.as_ptr() as usize,
                args.start,
                args.has_pae as u32,
                args.preserve_context as u32,
            )
        })
    }
}

impl RelocationEntry for CopiedRelocator {
    unsafe fn install(&mut self, control_page: VirtAddr, max_len: usize) {
        let len = self.code.len().min(max_len);
        unsafe {
            core::ptr::copy_nonoverlapping(self.code.as_ptr(), control_page.as_mut_ptr(), len);
            self.entry = Some(core::mem::transmute::<*mut u8, RelocateKernelFn>(
                control_page.as_mut_ptr(),
            ));
        }
    }

    unsafe fn jump(&mut self, args: &RelocationArgs<'_>) {
        unsafe { self.enter(args) };
    }

    unsafe fn call(&mut self, args: &RelocationArgs<'_>) -> Option<usize> {
        unsafe { self.enter(args) }
    }
}
