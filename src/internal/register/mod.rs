//! Register definitions for the AXI-PCIe bridge and AXI DMA engine
//!
//! All registers live inside one mapped BAR and are reached through a
//! [`RegisterWindow`](crate::hal::RegisterWindow). Each register block is a
//! small `Copy` handle holding the block's BAR offset; accessors take the
//! window explicitly so the handles can be stored next to the window that
//! owns the mapping.

pub mod bridge;
pub mod dma;

// =============================================================================
// Register Access Macros
// =============================================================================

/// Generate read/write accessor methods for a register.
///
/// The enclosing type must have a `base: usize` field holding the block's
/// BAR offset.
///
/// # Example
/// ```ignore
/// impl ChannelRegs {
///     reg_rw!(control, set_control, DMACR_OFFSET, "DMA Control register");
/// }
/// ```
macro_rules! reg_rw {
    ($read_fn:ident, $write_fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Read ", $doc)]
        #[inline(always)]
        pub fn $read_fn<W: $crate::hal::RegisterWindow>(&self, window: &W) -> u32 {
            window.read32(self.base + $offset)
        }

        #[doc = concat!("Write ", $doc)]
        #[inline(always)]
        pub fn $write_fn<W: $crate::hal::RegisterWindow>(&self, window: &mut W, value: u32) {
            window.write32(self.base + $offset, value);
        }
    };
}

/// Generate set/clear bit operation methods for a register.
///
/// # Example
/// ```ignore
/// impl ChannelRegs {
///     reg_bit_ops!(run, halt, DMACR_OFFSET, DMACR_RS, "the channel", "Run", "Stop");
/// }
/// ```
macro_rules! reg_bit_ops {
    ($set_fn:ident, $clear_fn:ident, $offset:expr, $bit:expr, $what:expr, $set_verb:expr, $clear_verb:expr) => {
        #[doc = concat!($set_verb, " ", $what)]
        #[inline(always)]
        pub fn $set_fn<W: $crate::hal::RegisterWindow>(&self, window: &mut W) {
            window.set_bits32(self.base + $offset, $bit);
        }

        #[doc = concat!($clear_verb, " ", $what)]
        #[inline(always)]
        pub fn $clear_fn<W: $crate::hal::RegisterWindow>(&self, window: &mut W) {
            window.clear_bits32(self.base + $offset, $bit);
        }
    };
}

/// Generate a bit check method (true when the bit is set).
macro_rules! reg_bit_check {
    ($fn:ident, $offset:expr, $bit:expr, $doc:expr) => {
        #[doc = $doc]
        #[inline(always)]
        pub fn $fn<W: $crate::hal::RegisterWindow>(&self, window: &W) -> bool {
            (window.read32(self.base + $offset) & $bit) != 0
        }
    };
}

// Export macros for use in submodules
pub(crate) use reg_bit_check;
pub(crate) use reg_bit_ops;
pub(crate) use reg_rw;
