//! Configuration types for the scatter-gather DMA controller.
//!
//! [`BarLayout`] describes where the bridge, the DMA engine and the
//! descriptor memory sit inside the mapped BAR. [`DmaConfig`] adds the
//! address translation mask, interrupt settings and poll timing.

use crate::driver::error::{ConfigError, ConfigResult};
use crate::hal::SyncDirection;
use crate::internal::constants::{
    DEFAULT_APERTURE_MASK, DEFAULT_BAR_AXI_BASE, DEFAULT_BAR_INDEX, DEFAULT_BAR_SIZE,
    DEFAULT_BRIDGE_BASE, DEFAULT_CACHE_ATTR, DEFAULT_DESC_MEM_BASE, DEFAULT_DESC_MEM_SIZE,
    DEFAULT_DMA_BASE, DEFAULT_IDLE_TIMEOUT_US, DEFAULT_INTERRUPT_LINE, DEFAULT_IRQ_THRESHOLD,
    DEFAULT_POLL_INTERVAL_US, DEFAULT_RESET_TIMEOUT_US, DEFAULT_START_TIMEOUT_US,
    DESCRIPTOR_STRIDE,
};
use crate::internal::register::bridge::AXIBAR2PCIEBAR_0L_OFFSET;
use crate::internal::register::dma::{
    MM2S_CHANNEL_OFFSET, S2MM_CHANNEL_OFFSET, TAILDESC_MSB_OFFSET,
};

// =============================================================================
// Direction and Wait Mode
// =============================================================================

/// Transfer direction, one DMA channel each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host to device (MM2S channel)
    Send,
    /// Device to host (S2MM channel)
    Receive,
}

impl Direction {
    /// Both directions
    pub const ALL: [Direction; 2] = [Direction::Send, Direction::Receive];

    /// Short name used in log messages
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Receive => "receive",
        }
    }

    /// Engine channel name
    #[must_use]
    pub const fn channel_name(&self) -> &'static str {
        match self {
            Direction::Send => "MM2S",
            Direction::Receive => "S2MM",
        }
    }

    /// Cache synchronization needed before the device touches the buffer
    #[must_use]
    pub const fn sync_direction(&self) -> SyncDirection {
        match self {
            Direction::Send => SyncDirection::ToDevice,
            Direction::Receive => SyncDirection::FromDevice,
        }
    }

    /// The other direction
    #[must_use]
    pub const fn opposite(&self) -> Direction {
        match self {
            Direction::Send => Direction::Receive,
            Direction::Receive => Direction::Send,
        }
    }
}

/// How `start_*` waits for the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WaitMode {
    /// Return right after the tail pointer is written; completion is
    /// detected by the idle poll in `check_*`
    #[default]
    Poll,
    /// Block on the platform interrupt after the tail pointer is written
    Interrupt,
}

// =============================================================================
// BAR Layout
// =============================================================================

/// A sub-region of the descriptor memory holding one ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RingRegion {
    /// BAR offset of the first descriptor
    pub base: usize,
    /// Size in bytes
    pub size: usize,
}

impl RingRegion {
    /// Create a ring region
    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    /// Number of descriptors that fit in the region
    #[inline(always)]
    pub const fn capacity(&self) -> usize {
        self.size / DESCRIPTOR_STRIDE
    }

    /// One past the last byte of the region
    #[inline(always)]
    pub const fn end(&self) -> usize {
        self.base + self.size
    }

    const fn overlaps(&self, other: &RingRegion) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

/// Placement of the device's register blocks inside the mapped BAR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BarLayout {
    /// BAR index to map
    pub bar_index: u32,
    /// Size of the BAR in bytes
    pub bar_size: usize,
    /// BAR offset of the AXI-PCIe bridge registers
    pub bridge_base: usize,
    /// BAR offset of the AXI DMA registers
    pub dma_base: usize,
    /// BAR offset of the descriptor memory
    pub desc_mem_base: usize,
    /// Size of the descriptor memory in bytes
    pub desc_mem_size: usize,
    /// AXI address at which BAR offset 0 is seen by the engine
    pub bar_axi_base: u32,
    /// Descriptor ring region for the send direction
    pub send_ring: RingRegion,
    /// Descriptor ring region for the receive direction
    pub receive_ring: RingRegion,
}

impl Default for BarLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl BarLayout {
    /// Default layout: bridge at 0x0000, DMA at 0x1000, 4 KiB descriptor
    /// memory at 0x2000 split evenly between the two rings.
    pub const fn new() -> Self {
        let half = DEFAULT_DESC_MEM_SIZE / 2;
        Self {
            bar_index: DEFAULT_BAR_INDEX,
            bar_size: DEFAULT_BAR_SIZE,
            bridge_base: DEFAULT_BRIDGE_BASE,
            dma_base: DEFAULT_DMA_BASE,
            desc_mem_base: DEFAULT_DESC_MEM_BASE,
            desc_mem_size: DEFAULT_DESC_MEM_SIZE,
            bar_axi_base: DEFAULT_BAR_AXI_BASE,
            send_ring: RingRegion::new(DEFAULT_DESC_MEM_BASE, half),
            receive_ring: RingRegion::new(DEFAULT_DESC_MEM_BASE + half, half),
        }
    }

    /// Set the descriptor memory and split it evenly between the rings
    pub const fn with_desc_mem(mut self, base: usize, size: usize) -> Self {
        let half = (size / 2) & !(DESCRIPTOR_STRIDE - 1);
        self.desc_mem_base = base;
        self.desc_mem_size = size;
        self.send_ring = RingRegion::new(base, half);
        self.receive_ring = RingRegion::new(base + half, half);
        self
    }

    /// Set explicit ring regions
    pub const fn with_rings(mut self, send: RingRegion, receive: RingRegion) -> Self {
        self.send_ring = send;
        self.receive_ring = receive;
        self
    }

    /// Set the AXI address of BAR offset 0
    pub const fn with_bar_axi_base(mut self, base: u32) -> Self {
        self.bar_axi_base = base;
        self
    }

    /// Set the BAR index and size
    pub const fn with_bar(mut self, index: u32, size: usize) -> Self {
        self.bar_index = index;
        self.bar_size = size;
        self
    }

    /// BAR offset of the aperture register
    #[inline(always)]
    pub const fn aperture_offset(&self) -> usize {
        self.bridge_base + AXIBAR2PCIEBAR_0L_OFFSET
    }

    /// BAR offset of a channel's register block
    #[inline(always)]
    pub const fn channel_base(&self, direction: Direction) -> usize {
        match direction {
            Direction::Send => self.dma_base + MM2S_CHANNEL_OFFSET,
            Direction::Receive => self.dma_base + S2MM_CHANNEL_OFFSET,
        }
    }

    /// Ring region of a direction
    #[inline(always)]
    pub const fn ring_region(&self, direction: Direction) -> RingRegion {
        match direction {
            Direction::Send => self.send_ring,
            Direction::Receive => self.receive_ring,
        }
    }

    /// Check whether `[offset, offset + len)` lies in descriptor memory
    pub const fn in_desc_mem(&self, offset: usize, len: usize) -> bool {
        offset >= self.desc_mem_base
            && len <= self.desc_mem_size
            && offset - self.desc_mem_base <= self.desc_mem_size - len
    }

    /// Engine (AXI) view of a BAR offset
    #[inline(always)]
    pub const fn to_bus(&self, offset: usize) -> u32 {
        self.bar_axi_base.wrapping_add(offset as u32)
    }

    /// BAR offset of an engine (AXI) address, if it falls inside the BAR
    pub const fn from_bus(&self, address: u32) -> Option<usize> {
        match address.checked_sub(self.bar_axi_base) {
            Some(offset) if (offset as usize) < self.bar_size => Some(offset as usize),
            _ => None,
        }
    }

    /// Validate the layout
    pub fn validate(&self) -> ConfigResult<()> {
        let stride = DESCRIPTOR_STRIDE;
        let bridge_end = self.aperture_offset() + 4;
        let dma_end = self.dma_base + S2MM_CHANNEL_OFFSET + TAILDESC_MSB_OFFSET + 4;
        let mem = RingRegion::new(self.desc_mem_base, self.desc_mem_size);

        let aligned = self.bridge_base % 4 == 0 && self.dma_base % 4 == 0;
        let in_bar = bridge_end <= self.bar_size
            && dma_end <= self.bar_size
            && mem.end() <= self.bar_size;
        if !aligned || !in_bar {
            return Err(ConfigError::InvalidLayout);
        }

        let bridge = RingRegion::new(self.bridge_base, bridge_end - self.bridge_base);
        let dma = RingRegion::new(self.dma_base, dma_end - self.dma_base);
        if bridge.overlaps(&dma) || bridge.overlaps(&mem) || dma.overlaps(&mem) {
            return Err(ConfigError::InvalidLayout);
        }

        if self.desc_mem_size == 0 || self.desc_mem_base % stride != 0 {
            return Err(ConfigError::InvalidLayout);
        }

        for ring in [self.send_ring, self.receive_ring] {
            if ring.base % stride != 0
                || ring.capacity() == 0
                || !self.in_desc_mem(ring.base, ring.size)
            {
                return Err(ConfigError::InvalidLayout);
            }
        }
        if self.send_ring.overlaps(&self.receive_ring) {
            return Err(ConfigError::InvalidLayout);
        }

        if u32::try_from(self.bar_size)
            .ok()
            .and_then(|size| self.bar_axi_base.checked_add(size - 1))
            .is_none()
        {
            return Err(ConfigError::InvalidLayout);
        }

        Ok(())
    }
}

// =============================================================================
// Controller Configuration
// =============================================================================

/// Controller configuration
///
/// # Example
///
/// ```ignore
/// let config = DmaConfig::new()
///     .with_aperture_mask(0xC000_0000)
///     .with_interrupt_line(0)
///     .with_idle_timeout_us(1_000_000);
/// config.validate()?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaConfig {
    /// BAR layout
    pub layout: BarLayout,
    /// High address bits selecting the translation window
    pub aperture_mask: u32,
    /// Interrupt line waited on in [`WaitMode::Interrupt`]
    pub interrupt_line: u32,
    /// Completed descriptors per IOC interrupt
    pub irq_threshold: u8,
    /// Also enable IOC/Err interrupts on the send channel
    pub send_interrupts: bool,
    /// AXI cache attribute placed in the multichannel word
    pub cache_attr: u8,
    /// Interval between register polls
    pub poll_interval_us: u32,
    /// Timeout for a channel soft reset
    pub reset_timeout_us: u32,
    /// Timeout for the channel to leave the halted state after RS is set
    pub start_timeout_us: u32,
    /// Timeout for the channel to report idle after the tail is written
    pub idle_timeout_us: u32,
}

impl Default for DmaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaConfig {
    /// Create a configuration with default values
    pub const fn new() -> Self {
        Self {
            layout: BarLayout::new(),
            aperture_mask: DEFAULT_APERTURE_MASK,
            interrupt_line: DEFAULT_INTERRUPT_LINE,
            irq_threshold: DEFAULT_IRQ_THRESHOLD,
            send_interrupts: false,
            cache_attr: DEFAULT_CACHE_ATTR,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            reset_timeout_us: DEFAULT_RESET_TIMEOUT_US,
            start_timeout_us: DEFAULT_START_TIMEOUT_US,
            idle_timeout_us: DEFAULT_IDLE_TIMEOUT_US,
        }
    }

    /// Set the BAR layout
    pub const fn with_layout(mut self, layout: BarLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the aperture mask
    pub const fn with_aperture_mask(mut self, mask: u32) -> Self {
        self.aperture_mask = mask;
        self
    }

    /// Set the interrupt line
    pub const fn with_interrupt_line(mut self, line: u32) -> Self {
        self.interrupt_line = line;
        self
    }

    /// Set the IRQ threshold
    pub const fn with_irq_threshold(mut self, threshold: u8) -> Self {
        self.irq_threshold = threshold;
        self
    }

    /// Enable or disable interrupts on the send channel
    pub const fn with_send_interrupts(mut self, enabled: bool) -> Self {
        self.send_interrupts = enabled;
        self
    }

    /// Set the AXI cache attribute
    pub const fn with_cache_attr(mut self, cache: u8) -> Self {
        self.cache_attr = cache;
        self
    }

    /// Set the poll interval
    pub const fn with_poll_interval_us(mut self, interval_us: u32) -> Self {
        self.poll_interval_us = interval_us;
        self
    }

    /// Set the channel reset timeout
    pub const fn with_reset_timeout_us(mut self, timeout_us: u32) -> Self {
        self.reset_timeout_us = timeout_us;
        self
    }

    /// Set the channel start timeout
    pub const fn with_start_timeout_us(mut self, timeout_us: u32) -> Self {
        self.start_timeout_us = timeout_us;
        self
    }

    /// Set the idle timeout
    pub const fn with_idle_timeout_us(mut self, timeout_us: u32) -> Self {
        self.idle_timeout_us = timeout_us;
        self
    }

    /// Number of poll iterations a timeout allows
    #[inline(always)]
    pub const fn poll_iterations(&self, timeout_us: u32) -> u32 {
        let n = timeout_us / self.poll_interval_us;
        if n == 0 { 1 } else { n }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.layout.validate()?;

        let window = !self.aperture_mask;
        let contiguous = self.aperture_mask != 0 && window & window.wrapping_add(1) == 0;
        if !contiguous
            || self.irq_threshold == 0
            || self.cache_attr > 0x0F
            || self.poll_interval_us == 0
            || self.reset_timeout_us == 0
            || self.start_timeout_us == 0
            || self.idle_timeout_us == 0
        {
            return Err(ConfigError::InvalidConfig);
        }
        Ok(())
    }
}
