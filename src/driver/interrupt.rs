//! Interrupt status handling for the DMA channels.
//!
//! This module provides the [`InterruptStatus`] structure decoded from the
//! MM2S and S2MM status registers after an interrupt wait.

use crate::internal::register::dma::{DMASR_DLY_IRQ, DMASR_ERR_IRQ, DMASR_IOC_IRQ};

// =============================================================================
// Interrupt Status
// =============================================================================

/// Interrupt flags of both channels.
///
/// # Example
///
/// ```ignore
/// let status = dma.wait_for_interrupt()?;
/// if status.receive_complete {
///     let bytes = dma.check_receive()?;
/// }
/// if status.has_error() {
///     // check_* will report the fault and reset the channel
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptStatus {
    /// MM2S interrupt on complete
    pub send_complete: bool,
    /// MM2S delay timer interrupt
    pub send_delay: bool,
    /// MM2S error interrupt
    pub send_error: bool,
    /// S2MM interrupt on complete
    pub receive_complete: bool,
    /// S2MM delay timer interrupt
    pub receive_delay: bool,
    /// S2MM error interrupt
    pub receive_error: bool,
}

impl InterruptStatus {
    /// Create from raw MM2S and S2MM status register values
    #[inline]
    pub fn from_raw(send_status: u32, receive_status: u32) -> Self {
        Self {
            send_complete: (send_status & DMASR_IOC_IRQ) != 0,
            send_delay: (send_status & DMASR_DLY_IRQ) != 0,
            send_error: (send_status & DMASR_ERR_IRQ) != 0,
            receive_complete: (receive_status & DMASR_IOC_IRQ) != 0,
            receive_delay: (receive_status & DMASR_DLY_IRQ) != 0,
            receive_error: (receive_status & DMASR_ERR_IRQ) != 0,
        }
    }

    /// MM2S write-1-to-clear value for the flags that are set
    #[inline]
    pub fn send_raw(&self) -> u32 {
        Self::to_raw(self.send_complete, self.send_delay, self.send_error)
    }

    /// S2MM write-1-to-clear value for the flags that are set
    #[inline]
    pub fn receive_raw(&self) -> u32 {
        Self::to_raw(self.receive_complete, self.receive_delay, self.receive_error)
    }

    fn to_raw(complete: bool, delay: bool, error: bool) -> u32 {
        let mut val = 0u32;
        if complete {
            val |= DMASR_IOC_IRQ;
        }
        if delay {
            val |= DMASR_DLY_IRQ;
        }
        if error {
            val |= DMASR_ERR_IRQ;
        }
        val
    }

    /// Check if any interrupt occurred
    #[inline]
    pub fn any(&self) -> bool {
        self.send_complete
            || self.send_delay
            || self.send_error
            || self.receive_complete
            || self.receive_delay
            || self.receive_error
    }

    /// Check if either channel raised its error interrupt
    #[inline]
    pub fn has_error(&self) -> bool {
        self.send_error || self.receive_error
    }
}
