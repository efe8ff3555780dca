//! Descriptor ring construction and traversal.
//!
//! A ring is a run of stride-aligned descriptors inside one region of the
//! on-device descriptor memory. Entry `i` lives at `base + i * stride`; each
//! entry's next pointer holds the engine (bus) address of entry `i + 1` and
//! the last entry points at itself. The engine stops at the tail pointer, so
//! the chain never wraps.

use crate::driver::config::{BarLayout, Direction, RingRegion};
use crate::driver::error::{ConfigError, Result};
use crate::hal::RegisterWindow;
use crate::internal::constants::{DESCRIPTOR_STRIDE, MAX_SEGMENT_LEN};
use crate::internal::dma::descriptor::SgDescriptor;
use crate::internal::dma::translate::TranslatedMapping;

/// A built descriptor ring with its tail index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorRing {
    /// BAR offset of entry 0
    base: usize,
    /// Number of entries
    len: usize,
    /// Engine view of BAR offset 0
    bar_axi_base: u32,
}

impl DescriptorRing {
    /// Check that `translated` can be laid out at `region.base`.
    ///
    /// Touches no hardware: the ring base must lie in descriptor memory and
    /// be stride aligned, the segments must fit the region and every length
    /// must fit 23 bits.
    pub fn validate(
        layout: &BarLayout,
        region: RingRegion,
        translated: &TranslatedMapping<'_>,
    ) -> Result<()> {
        if region.base % DESCRIPTOR_STRIDE != 0
            || !layout.in_desc_mem(region.base, DESCRIPTOR_STRIDE)
        {
            return Err(ConfigError::InvalidRingBase.into());
        }
        let len = translated.len();
        if len == 0 {
            return Err(ConfigError::EmptyMapping.into());
        }
        let capacity = region.capacity().min(
            (layout.desc_mem_base + layout.desc_mem_size - region.base) / DESCRIPTOR_STRIDE,
        );
        if len > capacity {
            return Err(ConfigError::RingCapacityExceeded.into());
        }
        if translated.iter().any(|s| s.size > MAX_SEGMENT_LEN) {
            return Err(ConfigError::SegmentTooLarge.into());
        }
        Ok(())
    }

    /// Build one descriptor per translated segment at `region.base`.
    ///
    /// Runs [`DescriptorRing::validate`] before the first word is written.
    pub fn build<W: RegisterWindow>(
        window: &mut W,
        layout: &BarLayout,
        region: RingRegion,
        translated: &TranslatedMapping<'_>,
        direction: Direction,
        stream_dest: u8,
        cache: u8,
    ) -> Result<Self> {
        Self::validate(layout, region, translated)?;
        let len = translated.len();

        let ring = Self {
            base: region.base,
            len,
            bar_axi_base: layout.bar_axi_base,
        };

        for (i, segment) in translated.iter().enumerate() {
            let last = i + 1 == len;
            let next = if last { i } else { i + 1 };

            let mut desc = SgDescriptor::new();
            desc.prepare(
                ring.entry_bus(next),
                segment.bus_address,
                segment.size,
                i == 0,
                last,
            );
            match direction {
                Direction::Send => desc.set_send_channel(stream_dest, cache),
                Direction::Receive => desc.set_receive_channel(cache),
            }
            desc.write_to(window, ring.entry_offset(i));

            trace!(
                "{} desc {}: next {:#010x} buf {:#010x} ctrl {:#010x}",
                direction.channel_name(),
                i,
                desc.next_desc(),
                desc.buffer_addr(),
                desc.control()
            );
        }

        debug!(
            "{} ring: {} descriptors at {:#010x}, tail {:#010x}",
            direction.channel_name(),
            len,
            ring.base_bus(),
            ring.tail_bus()
        );
        Ok(ring)
    }

    /// Number of entries
    #[inline(always)]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Check if the ring has no entries (never true after `build`)
    #[inline(always)]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the tail entry
    #[inline(always)]
    pub const fn tail_index(&self) -> usize {
        self.len - 1
    }

    /// BAR offset of entry `index`
    #[inline(always)]
    pub const fn entry_offset(&self, index: usize) -> usize {
        self.base + index * DESCRIPTOR_STRIDE
    }

    /// Engine address of entry `index`
    #[inline(always)]
    pub const fn entry_bus(&self, index: usize) -> u32 {
        self.bar_axi_base
            .wrapping_add(self.entry_offset(index) as u32)
    }

    /// Engine address of entry 0 (the CURDESC value)
    #[inline(always)]
    pub const fn base_bus(&self) -> u32 {
        self.entry_bus(0)
    }

    /// Engine address of the tail entry (the TAILDESC value)
    #[inline(always)]
    pub const fn tail_bus(&self) -> u32 {
        self.entry_bus(self.tail_index())
    }

    /// Read entry `index` back from descriptor memory
    pub fn read_entry<W: RegisterWindow>(&self, window: &W, index: usize) -> SgDescriptor {
        SgDescriptor::read_from(window, self.entry_offset(index))
    }

    /// Clear the STATUS word of entry `index`
    pub fn clear_status<W: RegisterWindow>(&self, window: &mut W, index: usize) {
        SgDescriptor::clear_status_at(window, self.entry_offset(index));
    }
}

/// Zero a region of descriptor memory
pub fn clear_region<W: RegisterWindow>(window: &mut W, region: RingRegion) {
    for offset in (region.base..region.end()).step_by(4) {
        window.write32(offset, 0);
    }
}
