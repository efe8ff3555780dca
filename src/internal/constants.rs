//! Centralized Constants
//!
//! This module provides a single source of truth for the default layout,
//! timing and descriptor limits used throughout the controller.
//!
//! # Note
//!
//! Hardware register bit definitions remain in their respective modules
//! (`register/dma.rs`, `register/bridge.rs`, `dma/descriptor/bits.rs`) as
//! they are specific to those hardware blocks.

// =============================================================================
// BAR Layout Defaults
// =============================================================================

/// BAR exposing the bridge, the DMA engine and the descriptor memory
pub const DEFAULT_BAR_INDEX: u32 = 0;

/// Size of that BAR in bytes
pub const DEFAULT_BAR_SIZE: usize = 0x4000;

/// BAR offset of the AXI-PCIe bridge register block
pub const DEFAULT_BRIDGE_BASE: usize = 0x0000;

/// BAR offset of the AXI DMA register block
pub const DEFAULT_DMA_BASE: usize = 0x1000;

/// BAR offset of the on-device descriptor memory (BRAM)
pub const DEFAULT_DESC_MEM_BASE: usize = 0x2000;

/// Size of the on-device descriptor memory in bytes
pub const DEFAULT_DESC_MEM_SIZE: usize = 0x1000;

/// AXI address at which the BAR is visible to the engine
pub const DEFAULT_BAR_AXI_BASE: u32 = 0x8000_0000;

// =============================================================================
// Address Translation
// =============================================================================

/// Default aperture mask: the high bits selecting a 1 GiB window
pub const DEFAULT_APERTURE_MASK: u32 = 0xC000_0000;

// =============================================================================
// Descriptor Limits
// =============================================================================

/// Descriptor stride and required alignment in bytes
pub const DESCRIPTOR_STRIDE: usize = 0x40;

/// Largest length the 23-bit buffer length field can hold
pub const MAX_SEGMENT_LEN: u32 = (1 << 23) - 1;

/// Largest stream destination carried in the TDEST field
pub const MAX_STREAM_DEST: u8 = 0x0F;

/// Default AXI cache attribute for descriptor and data fetches
pub const DEFAULT_CACHE_ATTR: u8 = 0b0011;

// =============================================================================
// Interrupts
// =============================================================================

/// Default interrupt line waited on by the platform
pub const DEFAULT_INTERRUPT_LINE: u32 = 0;

/// Default completed-descriptor count per IOC interrupt
pub const DEFAULT_IRQ_THRESHOLD: u8 = 1;

// =============================================================================
// Timing Constants
// =============================================================================

/// Interval between register polls in microseconds
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;

/// Timeout for a channel soft reset to self-clear
pub const DEFAULT_RESET_TIMEOUT_US: u32 = 100_000;

/// Timeout for the halted bit to deassert after RS is set
pub const DEFAULT_START_TIMEOUT_US: u32 = 100_000;

/// Timeout for the idle bit to assert after the tail is written
pub const DEFAULT_IDLE_TIMEOUT_US: u32 = 5_000_000;
