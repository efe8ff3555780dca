//! AXI DMA Register Definitions
//!
//! The engine has one register block per channel: MM2S (memory to stream,
//! host-to-device) and S2MM (stream to memory, device-to-host). Both blocks
//! share the same layout. In scatter-gather mode the channel fetches
//! descriptors starting at CURDESC and runs until it processes TAILDESC.

use super::{reg_bit_check, reg_bit_ops, reg_rw};

// =============================================================================
// Channel Block Offsets
// =============================================================================

/// MM2S channel block offset from the DMA register base
pub const MM2S_CHANNEL_OFFSET: usize = 0x00;
/// S2MM channel block offset from the DMA register base
pub const S2MM_CHANNEL_OFFSET: usize = 0x30;

// =============================================================================
// Register Offsets (relative to a channel block)
// =============================================================================

/// DMA Control Register offset
pub const DMACR_OFFSET: usize = 0x00;
/// DMA Status Register offset
pub const DMASR_OFFSET: usize = 0x04;
/// Current Descriptor Pointer offset
pub const CURDESC_OFFSET: usize = 0x08;
/// Current Descriptor Pointer (upper 32 bits) offset
pub const CURDESC_MSB_OFFSET: usize = 0x0C;
/// Tail Descriptor Pointer offset
pub const TAILDESC_OFFSET: usize = 0x10;
/// Tail Descriptor Pointer (upper 32 bits) offset
pub const TAILDESC_MSB_OFFSET: usize = 0x14;

// =============================================================================
// Control Register (DMACR) Bits
// =============================================================================

/// Run/Stop: 1 = run, 0 = stop after the current descriptor
pub const DMACR_RS: u32 = 1 << 0;
/// Soft reset of the channel, cleared by hardware when complete
pub const DMACR_RESET: u32 = 1 << 2;
/// Keyhole read/write
pub const DMACR_KEYHOLE: u32 = 1 << 3;
/// Cyclic buffer descriptor mode
pub const DMACR_CYCLIC_BD: u32 = 1 << 4;
/// Interrupt on Complete enable
pub const DMACR_IOC_IRQ_EN: u32 = 1 << 12;
/// Delay timer interrupt enable
pub const DMACR_DLY_IRQ_EN: u32 = 1 << 13;
/// Error interrupt enable
pub const DMACR_ERR_IRQ_EN: u32 = 1 << 14;
/// All interrupt enables
pub const DMACR_ALL_IRQ_EN: u32 = DMACR_IOC_IRQ_EN | DMACR_DLY_IRQ_EN | DMACR_ERR_IRQ_EN;
/// Interrupt threshold shift
pub const DMACR_IRQ_THRESHOLD_SHIFT: u32 = 16;
/// Interrupt threshold mask (completed descriptors per IOC interrupt)
pub const DMACR_IRQ_THRESHOLD_MASK: u32 = 0xFF << 16;
/// Interrupt delay timeout shift
pub const DMACR_IRQ_DELAY_SHIFT: u32 = 24;
/// Interrupt delay timeout mask
pub const DMACR_IRQ_DELAY_MASK: u32 = 0xFF << 24;
/// DMACR value after reset (threshold 1, everything else clear)
pub const DMACR_RESET_VALUE: u32 = 1 << DMACR_IRQ_THRESHOLD_SHIFT;

// =============================================================================
// Status Register (DMASR) Bits
// =============================================================================

/// Channel halted (RS clear and outstanding transfers finished, or fault)
pub const DMASR_HALTED: u32 = 1 << 0;
/// Channel idle: the tail descriptor has been processed
pub const DMASR_IDLE: u32 = 1 << 1;
/// Scatter-gather engine included in the build
pub const DMASR_SG_INCLD: u32 = 1 << 3;
/// DMA internal error
pub const DMASR_DMA_INT_ERR: u32 = 1 << 4;
/// DMA slave error
pub const DMASR_DMA_SLV_ERR: u32 = 1 << 5;
/// DMA decode error
pub const DMASR_DMA_DEC_ERR: u32 = 1 << 6;
/// Scatter-gather internal error
pub const DMASR_SG_INT_ERR: u32 = 1 << 8;
/// Scatter-gather slave error
pub const DMASR_SG_SLV_ERR: u32 = 1 << 9;
/// Scatter-gather decode error
pub const DMASR_SG_DEC_ERR: u32 = 1 << 10;
/// Interrupt on Complete (write 1 to clear)
pub const DMASR_IOC_IRQ: u32 = 1 << 12;
/// Delay interrupt (write 1 to clear)
pub const DMASR_DLY_IRQ: u32 = 1 << 13;
/// Error interrupt (write 1 to clear)
pub const DMASR_ERR_IRQ: u32 = 1 << 14;

/// All engine fault bits
pub const DMASR_ALL_ERRORS: u32 = DMASR_DMA_INT_ERR
    | DMASR_DMA_SLV_ERR
    | DMASR_DMA_DEC_ERR
    | DMASR_SG_INT_ERR
    | DMASR_SG_SLV_ERR
    | DMASR_SG_DEC_ERR;

/// All write-1-to-clear interrupt bits
pub const DMASR_ALL_IRQ: u32 = DMASR_IOC_IRQ | DMASR_DLY_IRQ | DMASR_ERR_IRQ;

// =============================================================================
// Channel Register Block
// =============================================================================

/// Register block of one DMA channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelRegs {
    base: usize,
}

impl ChannelRegs {
    /// Channel block at BAR offset `base`
    pub const fn new(base: usize) -> Self {
        Self { base }
    }

    /// BAR offset of the channel block
    pub const fn base(&self) -> usize {
        self.base
    }

    reg_rw!(control, set_control, DMACR_OFFSET, "DMA Control register");
    reg_rw!(status, set_status, DMASR_OFFSET, "DMA Status register");
    reg_rw!(
        current_desc,
        set_current_desc,
        CURDESC_OFFSET,
        "Current Descriptor Pointer"
    );
    reg_rw!(
        current_desc_msb,
        set_current_desc_msb,
        CURDESC_MSB_OFFSET,
        "Current Descriptor Pointer (MSB)"
    );
    reg_rw!(
        tail_desc,
        set_tail_desc,
        TAILDESC_OFFSET,
        "Tail Descriptor Pointer"
    );

    reg_bit_ops!(
        run,
        stop,
        DMACR_OFFSET,
        DMACR_RS,
        "the channel (RS bit)",
        "Start",
        "Stop"
    );

    reg_bit_check!(is_running, DMACR_OFFSET, DMACR_RS, "Check if RS is set");
    reg_bit_check!(
        is_reset_in_progress,
        DMACR_OFFSET,
        DMACR_RESET,
        "Check if a soft reset is still in progress"
    );
    reg_bit_check!(is_halted, DMASR_OFFSET, DMASR_HALTED, "Check if the channel is halted");
    reg_bit_check!(is_idle, DMASR_OFFSET, DMASR_IDLE, "Check if the channel is idle");

    /// Request a channel soft reset
    #[inline(always)]
    pub fn request_reset<W: crate::hal::RegisterWindow>(&self, window: &mut W) {
        window.set_bits32(self.base + DMACR_OFFSET, DMACR_RESET);
    }

    /// Write-1-to-clear the given interrupt bits
    #[inline(always)]
    pub fn clear_irqs<W: crate::hal::RegisterWindow>(&self, window: &mut W, bits: u32) {
        window.write32(self.base + DMASR_OFFSET, bits & DMASR_ALL_IRQ);
    }
}
