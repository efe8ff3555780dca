//! AXI-PCIe Bridge Register Definitions
//!
//! Only the AXI-to-PCIe address translation is used: the engine's 32-bit AXI
//! master reaches host memory through BAR window 0, whose PCIe-side base is
//! held in the AXIBAR2PCIEBAR_0 register pair.

use super::reg_rw;

// =============================================================================
// Register Offsets
// =============================================================================

/// AXIBAR2PCIEBAR_0U offset (upper 32 bits of the translation, unused on 32-bit buses)
pub const AXIBAR2PCIEBAR_0U_OFFSET: usize = 0x208;
/// AXIBAR2PCIEBAR_0L offset (lower 32 bits of the translation, the aperture)
pub const AXIBAR2PCIEBAR_0L_OFFSET: usize = 0x20C;

// =============================================================================
// Register Block
// =============================================================================

/// Bridge register block at a BAR offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeRegs {
    base: usize,
}

impl BridgeRegs {
    /// Bridge register block at BAR offset `base`
    pub const fn new(base: usize) -> Self {
        Self { base }
    }

    /// BAR offset of the aperture register
    pub const fn aperture_offset(&self) -> usize {
        self.base + AXIBAR2PCIEBAR_0L_OFFSET
    }

    reg_rw!(
        aperture,
        set_aperture,
        AXIBAR2PCIEBAR_0L_OFFSET,
        "AXIBAR2PCIEBAR_0L (aperture base)"
    );
    reg_rw!(
        aperture_high,
        set_aperture_high,
        AXIBAR2PCIEBAR_0U_OFFSET,
        "AXIBAR2PCIEBAR_0U"
    );
}
