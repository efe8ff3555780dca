//! Scatter-gather descriptor image.
//!
//! Descriptors live in the on-device descriptor memory, not in host RAM, so
//! they are built as a plain value and written word by word through the
//! register window. The engine updates only the STATUS word.

pub mod bits;

use bits::{control, mc_ctl, status, stride_ctl, word};

use crate::hal::RegisterWindow;
use crate::internal::constants::DESCRIPTOR_STRIDE;

/// Value image of one scatter-gather descriptor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SgDescriptor {
    next_desc: u32,
    buffer_addr: u32,
    mc_ctl: u32,
    stride_ctl: u32,
    control: u32,
    status: u32,
}

impl SgDescriptor {
    /// Size of the descriptor in bytes (also its alignment)
    pub const SIZE: usize = DESCRIPTOR_STRIDE;

    /// Create a zeroed descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_desc: 0,
            buffer_addr: 0,
            mc_ctl: 0,
            stride_ctl: 0,
            control: 0,
            status: 0,
        }
    }

    /// Prepare a single-line descriptor for one buffer segment.
    ///
    /// `len` must already be checked against the 23-bit limit.
    pub fn prepare(&mut self, next_desc: u32, buffer_addr: u32, len: u32, sof: bool, eof: bool) {
        self.next_desc = next_desc;
        self.buffer_addr = buffer_addr;
        self.stride_ctl = stride_ctl::SINGLE_LINE;
        self.control = len & control::LEN_MASK;
        if sof {
            self.control |= control::TXSOF;
        }
        if eof {
            self.control |= control::TXEOF;
        }
        self.status = 0;
    }

    /// Multichannel word for the MM2S direction: TDEST and TID carry the
    /// stream destination, ARCACHE carries the cache attribute.
    pub fn set_send_channel(&mut self, stream_dest: u8, cache: u8) {
        let dest = u32::from(stream_dest);
        self.mc_ctl = (dest & mc_ctl::TDEST_MASK)
            | ((dest << mc_ctl::TID_SHIFT) & mc_ctl::TID_MASK)
            | ((u32::from(cache) << mc_ctl::CACHE_SHIFT) & mc_ctl::CACHE_MASK);
    }

    /// Multichannel word for the S2MM direction: AWCACHE only.
    pub fn set_receive_channel(&mut self, cache: u8) {
        self.mc_ctl = (u32::from(cache) << mc_ctl::CACHE_SHIFT) & mc_ctl::CACHE_MASK;
    }

    /// Next descriptor pointer
    #[inline(always)]
    pub const fn next_desc(&self) -> u32 {
        self.next_desc
    }

    /// Buffer address
    #[inline(always)]
    pub const fn buffer_addr(&self) -> u32 {
        self.buffer_addr
    }

    /// Raw CONTROL word
    #[inline(always)]
    pub const fn control(&self) -> u32 {
        self.control
    }

    /// Raw multichannel control word
    #[inline(always)]
    pub const fn mc_ctl(&self) -> u32 {
        self.mc_ctl
    }

    /// Raw stride control word
    #[inline(always)]
    pub const fn stride_ctl(&self) -> u32 {
        self.stride_ctl
    }

    /// Raw STATUS word
    #[inline(always)]
    pub const fn status(&self) -> u32 {
        self.status
    }

    /// Programmed buffer length
    #[inline(always)]
    pub const fn buffer_len(&self) -> u32 {
        self.control & control::LEN_MASK
    }

    /// Check the start-of-frame flag
    #[inline(always)]
    pub const fn is_first(&self) -> bool {
        (self.control & control::TXSOF) != 0
    }

    /// Check the end-of-frame flag
    #[inline(always)]
    pub const fn is_last(&self) -> bool {
        (self.control & control::TXEOF) != 0
    }

    /// Check if the engine marked the descriptor complete
    #[inline(always)]
    pub const fn is_complete(&self) -> bool {
        (self.status & status::CMPLT) != 0
    }

    /// Bytes the engine reports as transferred
    #[inline(always)]
    pub const fn transferred(&self) -> u32 {
        self.status & status::TRANSFERRED_MASK
    }

    /// Check the received start-of-frame flag
    #[inline(always)]
    pub const fn rx_sof(&self) -> bool {
        (self.status & status::RXSOF) != 0
    }

    /// Check the received end-of-frame flag
    #[inline(always)]
    pub const fn rx_eof(&self) -> bool {
        (self.status & status::RXEOF) != 0
    }

    /// Stream destination reported for a received packet
    #[inline(always)]
    pub const fn rx_tdest(&self) -> u8 {
        (self.status & status::TDEST_MASK) as u8
    }

    /// Stream id reported for a received packet
    #[inline(always)]
    pub const fn rx_tid(&self) -> u8 {
        ((self.status & status::TID_MASK) >> status::TID_SHIFT) as u8
    }

    /// Check the per-descriptor error bits
    #[inline(always)]
    pub const fn has_error(&self) -> bool {
        (self.status & status::ALL_ERRORS) != 0
    }

    /// Write the descriptor to the window at BAR offset `offset`.
    ///
    /// The STATUS word is written as zero so stale completions from a
    /// previous transfer cannot be mistaken for new ones.
    pub fn write_to<W: RegisterWindow>(&self, window: &mut W, offset: usize) {
        window.write32(offset + word::NXTDESC, self.next_desc);
        window.write32(offset + word::NXTDESC_MSB, 0);
        window.write32(offset + word::BUFFER_ADDRESS, self.buffer_addr);
        window.write32(offset + word::BUFFER_ADDRESS_MSB, 0);
        window.write32(offset + word::MC_CTL, self.mc_ctl);
        window.write32(offset + word::STRIDE_CTL, self.stride_ctl);
        window.write32(offset + word::CONTROL, self.control);
        window.write32(offset + word::STATUS, 0);
    }

    /// Read a descriptor image back from the window
    pub fn read_from<W: RegisterWindow>(window: &W, offset: usize) -> Self {
        Self {
            next_desc: window.read32(offset + word::NXTDESC),
            buffer_addr: window.read32(offset + word::BUFFER_ADDRESS),
            mc_ctl: window.read32(offset + word::MC_CTL),
            stride_ctl: window.read32(offset + word::STRIDE_CTL),
            control: window.read32(offset + word::CONTROL),
            status: window.read32(offset + word::STATUS),
        }
    }

    /// Clear the STATUS word of the descriptor at `offset`
    pub fn clear_status_at<W: RegisterWindow>(window: &mut W, offset: usize) {
        window.write32(offset + word::STATUS, 0);
    }
}
