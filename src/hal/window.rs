//! Register window abstraction
//!
//! A register window is a mapped PCIe BAR seen as an array of 32-bit words.
//! Every register block of the endpoint (bridge, DMA engine, descriptor
//! memory) is addressed by its byte offset inside the window.

/// 32-bit access into a mapped BAR.
///
/// Offsets are byte offsets from the start of the BAR and must be 4-byte
/// aligned. Implementations perform volatile, non-reordered accesses.
pub trait RegisterWindow {
    /// Read the 32-bit word at `offset`
    fn read32(&self, offset: usize) -> u32;

    /// Write the 32-bit word at `offset`
    fn write32(&mut self, offset: usize, value: u32);

    /// Size of the window in bytes
    fn size(&self) -> usize;

    /// Read-modify-write the word at `offset`
    #[inline]
    fn modify32<F>(&mut self, offset: usize, f: F)
    where
        F: FnOnce(u32) -> u32,
        Self: Sized,
    {
        let value = self.read32(offset);
        self.write32(offset, f(value));
    }

    /// Set bits in the word at `offset` (read-modify-write)
    #[inline]
    fn set_bits32(&mut self, offset: usize, bits: u32)
    where
        Self: Sized,
    {
        self.modify32(offset, |v| v | bits);
    }

    /// Clear bits in the word at `offset` (read-modify-write)
    #[inline]
    fn clear_bits32(&mut self, offset: usize, bits: u32)
    where
        Self: Sized,
    {
        self.modify32(offset, |v| v & !bits);
    }
}

impl<W: RegisterWindow> RegisterWindow for &mut W {
    #[inline]
    fn read32(&self, offset: usize) -> u32 {
        (**self).read32(offset)
    }

    #[inline]
    fn write32(&mut self, offset: usize, value: u32) {
        (**self).write32(offset, value);
    }

    #[inline]
    fn size(&self) -> usize {
        (**self).size()
    }
}

// =============================================================================
// Memory-Mapped Window
// =============================================================================

/// Register window over a memory-mapped BAR (e.g. an `mmap` of a sysfs
/// `resourceN` file or a UIO map).
#[derive(Debug)]
pub struct MmioWindow {
    base: *mut u8,
    len: usize,
}

impl MmioWindow {
    /// Wrap a mapped BAR.
    ///
    /// # Safety
    ///
    /// `base` must point to a live mapping of at least `len` bytes that
    /// stays valid, and is not accessed through other aliases, for the
    /// lifetime of the returned window.
    pub const unsafe fn new(base: *mut u8, len: usize) -> Self {
        Self { base, len }
    }

    /// Base pointer of the mapping
    pub const fn as_ptr(&self) -> *mut u8 {
        self.base
    }

    #[inline(always)]
    fn word_ptr(&self, offset: usize) -> *mut u32 {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.len,
            "register offset outside BAR window"
        );
        // SAFETY: bounds checked above; base is valid for len bytes per new()
        unsafe { self.base.add(offset).cast::<u32>() }
    }
}

impl RegisterWindow for MmioWindow {
    #[inline(always)]
    fn read32(&self, offset: usize) -> u32 {
        // SAFETY: word_ptr yields an aligned pointer inside the mapping
        unsafe { core::ptr::read_volatile(self.word_ptr(offset)) }
    }

    #[inline(always)]
    fn write32(&mut self, offset: usize, value: u32) {
        // SAFETY: word_ptr yields an aligned pointer inside the mapping
        unsafe { core::ptr::write_volatile(self.word_ptr(offset), value) }
    }

    #[inline(always)]
    fn size(&self) -> usize {
        self.len
    }
}

// SAFETY: the window exclusively owns its mapping per the contract of new()
unsafe impl Send for MmioWindow {}
