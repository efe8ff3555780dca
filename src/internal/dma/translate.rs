//! Translation window management.
//!
//! The engine's AXI master has a 32-bit address space; host buffers are
//! reached through one AXI-to-PCIe window whose PCIe base is programmed in
//! the bridge aperture register. All segments of a transfer must fall in the
//! same window; their descriptor addresses are then offsets into it.

use crate::driver::error::{ConfigError, DmaError, Result};
use crate::hal::{RegisterWindow, Segment};
use crate::internal::register::bridge::BridgeRegs;

/// Buffer segments rebased onto a translation window
#[derive(Debug, Clone, Copy)]
pub struct TranslatedMapping<'a> {
    window_base: u32,
    aperture_mask: u32,
    segments: &'a [Segment],
}

impl<'a> TranslatedMapping<'a> {
    /// Compute the window for `segments` and check they all share it.
    ///
    /// The window base is the first segment's address masked by
    /// `aperture_mask`; every segment must mask to the same base.
    pub fn new(segments: &'a [Segment], aperture_mask: u32) -> Result<Self> {
        let first = segments.first().ok_or(ConfigError::EmptyMapping)?;
        let window_base = first.bus_address & aperture_mask;

        if let Some(index) = segments
            .iter()
            .position(|s| (s.bus_address & aperture_mask) != window_base)
        {
            warn!(
                "segment {} at {:#010x} outside window {:#010x}",
                index,
                segments[index].bus_address,
                window_base
            );
            return Err(DmaError::UnreachableSegment.into());
        }

        Ok(Self {
            window_base,
            aperture_mask,
            segments,
        })
    }

    /// PCIe base of the translation window
    #[inline(always)]
    pub const fn window_base(&self) -> u32 {
        self.window_base
    }

    /// Number of segments
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check if there are no segments (never true after `new`)
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Check whether `address` is reachable through this window
    #[inline(always)]
    pub const fn covers(&self, address: u32) -> bool {
        (address & self.aperture_mask) == self.window_base
    }

    /// Segments with their addresses rebased onto the window
    pub fn iter(&self) -> impl Iterator<Item = Segment> + 'a {
        let base = self.window_base;
        self.segments
            .iter()
            .map(move |s| Segment::new(s.bus_address - base, s.size))
    }

    /// Total length of all segments in bytes
    pub fn total_len(&self) -> usize {
        self.segments.iter().map(|s| s.size as usize).sum()
    }
}

/// Program the aperture register with `base`.
///
/// Returns `Ok(false)` without writing when the register already holds
/// `base`. After a write the register is read back and must match.
pub fn program_aperture<W: RegisterWindow>(
    window: &mut W,
    bridge: BridgeRegs,
    base: u32,
) -> Result<bool> {
    let previous = bridge.aperture(window);
    debug!("aperture was {:#010x}", previous);
    if previous == base {
        return Ok(false);
    }

    debug!("setting aperture to {:#010x}", base);
    bridge.set_aperture(window, base);

    let readback = bridge.aperture(window);
    if readback != base {
        error!(
            "aperture readback {:#010x}, expected {:#010x}",
            readback,
            base
        );
        return Err(DmaError::ApertureWriteFailed.into());
    }
    Ok(true)
}
