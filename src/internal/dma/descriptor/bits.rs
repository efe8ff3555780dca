//! Scatter-gather descriptor bit field constants.
//!
//! Based on the AXI DMA SG descriptor format (PG021): sixteen 32-bit words,
//! of which the first eight carry pointers, control and status and the rest
//! are user application fields.

// =============================================================================
// Word Offsets
// =============================================================================

/// Byte offsets of descriptor words from the descriptor start
pub mod word {
    /// Next descriptor pointer
    pub const NXTDESC: usize = 0x00;
    /// Next descriptor pointer (upper 32 bits)
    pub const NXTDESC_MSB: usize = 0x04;
    /// Buffer address
    pub const BUFFER_ADDRESS: usize = 0x08;
    /// Buffer address (upper 32 bits)
    pub const BUFFER_ADDRESS_MSB: usize = 0x0C;
    /// Multichannel control (TDEST, TID, cache attributes)
    pub const MC_CTL: usize = 0x10;
    /// Stride control (2D transfers)
    pub const STRIDE_CTL: usize = 0x14;
    /// Buffer length and frame flags
    pub const CONTROL: usize = 0x18;
    /// Hardware written completion status
    pub const STATUS: usize = 0x1C;
}

// =============================================================================
// CONTROL Word
// =============================================================================

/// CONTROL word bit field constants
pub mod control {
    /// Buffer length mask (23 bits)
    pub const LEN_MASK: u32 = 0x007F_FFFF;
    /// End of frame: last descriptor of a packet (MM2S)
    pub const TXEOF: u32 = 1 << 26;
    /// Start of frame: first descriptor of a packet (MM2S)
    pub const TXSOF: u32 = 1 << 27;
}

// =============================================================================
// STATUS Word
// =============================================================================

/// STATUS word bit field constants
pub mod status {
    /// Transferred byte count mask (23 bits)
    pub const TRANSFERRED_MASK: u32 = 0x007F_FFFF;
    /// Stream TDEST reported by S2MM in multichannel mode (app field view)
    pub const TDEST_MASK: u32 = 0x1F;
    /// Stream TID shift (app field view)
    pub const TID_SHIFT: u32 = 8;
    /// Stream TID mask (app field view)
    pub const TID_MASK: u32 = 0x1F << 8;
    /// Last descriptor of a received packet (S2MM)
    pub const RXEOF: u32 = 1 << 26;
    /// First descriptor of a received packet (S2MM)
    pub const RXSOF: u32 = 1 << 27;
    /// DMA internal error while processing this descriptor
    pub const INT_ERR: u32 = 1 << 28;
    /// DMA slave error while processing this descriptor
    pub const SLV_ERR: u32 = 1 << 29;
    /// DMA decode error while processing this descriptor
    pub const DEC_ERR: u32 = 1 << 30;
    /// Descriptor completed
    pub const CMPLT: u32 = 1 << 31;

    /// All per-descriptor error bits
    pub const ALL_ERRORS: u32 = INT_ERR | SLV_ERR | DEC_ERR;
}

// =============================================================================
// MC_CTL Word
// =============================================================================

/// Multichannel control word bit field constants
pub mod mc_ctl {
    /// Stream destination (TDEST) mask
    pub const TDEST_MASK: u32 = 0x0F;
    /// Stream id (TID) shift
    pub const TID_SHIFT: u32 = 8;
    /// Stream id (TID) mask
    pub const TID_MASK: u32 = 0x1F << 8;
    /// ARCACHE (MM2S) / AWCACHE (S2MM) shift
    pub const CACHE_SHIFT: u32 = 24;
    /// ARCACHE (MM2S) / AWCACHE (S2MM) mask
    pub const CACHE_MASK: u32 = 0x0F << 24;
}

// =============================================================================
// STRIDE_CTL Word
// =============================================================================

/// Stride control word bit field constants
pub mod stride_ctl {
    /// Stride mask
    pub const STRIDE_MASK: u32 = 0xFFFF;
    /// Vertical size shift
    pub const VSIZE_SHIFT: u32 = 19;
    /// Vertical size mask
    pub const VSIZE_MASK: u32 = 0x1FFF << 19;
    /// Single-line transfer: VSIZE = 1, stride 0
    pub const SINGLE_LINE: u32 = 1 << VSIZE_SHIFT;
}
