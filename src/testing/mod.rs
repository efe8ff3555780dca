//! Testing utilities and mock implementations
//!
//! This module provides a simulated endpoint BAR and a mock platform for
//! testing the controller on the host without hardware access.
//!
//! Only available when running `cargo test`.

// Note: The #[cfg(test)] attribute is applied in lib.rs where this module is declared
#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::RefCell;
use std::collections::VecDeque;
use std::vec;
use std::vec::Vec;

use crate::driver::config::{BarLayout, Direction};
use crate::driver::error::{IoError, Result};
use crate::hal::{DmaPlatform, RegisterWindow, Segment, SyncDirection, UserMapping};
use crate::internal::dma::descriptor::bits::{control, status, word};
use crate::internal::register::dma::{
    CURDESC_OFFSET, DMACR_OFFSET, DMACR_RESET, DMACR_RESET_VALUE, DMACR_RS, DMASR_ALL_IRQ,
    DMASR_ERR_IRQ, DMASR_HALTED, DMASR_IDLE, DMASR_IOC_IRQ, DMASR_OFFSET, TAILDESC_OFFSET,
};

/// Upper bound on descriptors followed per tail write
const MAX_WALK: usize = 256;

const fn channel_index(direction: Direction) -> usize {
    match direction {
        Direction::Send => 0,
        Direction::Receive => 1,
    }
}

// =============================================================================
// Mock Window
// =============================================================================

/// Simulated BAR of an AXI-PCIe bridge with an AXI DMA engine
///
/// Models the register behavior the controller relies on:
/// - DMACR reset bit self-clears and leaves the channel halted
/// - setting RS clears halted, clearing RS sets it
/// - DMASR IRQ bits are write-1-to-clear
/// - writing TAILDESC walks the ring from CURDESC, marks every descriptor
///   complete, sets idle and IOC
///
/// Faults, stuck bits and partial transfers can be injected.
///
/// # Example
///
/// ```ignore
/// let mut window = MockWindow::new();
/// window.inject_fault(Direction::Send, DMASR_DMA_SLV_ERR);
/// ```
#[derive(Debug)]
pub struct MockWindow {
    layout: BarLayout,
    words: Vec<u32>,
    write_log: Vec<(usize, u32)>,
    resets: [usize; 2],
    reset_stuck: [bool; 2],
    halt_stuck: [bool; 2],
    pending_fault: [u32; 2],
    auto_complete: bool,
    never_idle: bool,
    transfer_cap: Option<u32>,
    aperture_stuck: bool,
}

impl Default for MockWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl MockWindow {
    /// Window for the default layout
    pub fn new() -> Self {
        Self::with_layout(BarLayout::new())
    }

    /// Window for a custom layout
    pub fn with_layout(layout: BarLayout) -> Self {
        let mut window = Self {
            layout,
            words: vec![0; layout.bar_size / 4],
            write_log: Vec::new(),
            resets: [0; 2],
            reset_stuck: [false; 2],
            halt_stuck: [false; 2],
            pending_fault: [0; 2],
            auto_complete: true,
            never_idle: false,
            transfer_cap: None,
            aperture_stuck: false,
        };
        for direction in Direction::ALL {
            let base = layout.channel_base(direction);
            window.set_word(base + DMACR_OFFSET, DMACR_RESET_VALUE);
            window.set_word(base + DMASR_OFFSET, DMASR_HALTED);
        }
        window
    }

    /// Current value of the word at `offset`
    pub fn word(&self, offset: usize) -> u32 {
        self.words[offset / 4]
    }

    /// Set a word directly, bypassing register behavior and the write log
    pub fn set_word(&mut self, offset: usize, value: u32) {
        self.words[offset / 4] = value;
    }

    /// All writes in order
    pub fn write_log(&self) -> &[(usize, u32)] {
        &self.write_log
    }

    /// Number of writes to `offset`
    pub fn writes_to(&self, offset: usize) -> usize {
        self.write_log.iter().filter(|(o, _)| *o == offset).count()
    }

    /// Clear the write log
    pub fn clear_writes(&mut self) {
        self.write_log.clear();
    }

    /// Number of channel soft resets requested
    pub fn reset_count(&self, direction: Direction) -> usize {
        self.resets[channel_index(direction)]
    }

    /// Keep the reset bit set after a reset request
    pub fn set_reset_stuck(&mut self, direction: Direction, stuck: bool) {
        self.reset_stuck[channel_index(direction)] = stuck;
    }

    /// Keep the halted bit set after RS is written
    pub fn set_halt_stuck(&mut self, direction: Direction, stuck: bool) {
        self.halt_stuck[channel_index(direction)] = stuck;
    }

    /// Raise `fault_bits` on the next tail write instead of completing
    pub fn inject_fault(&mut self, direction: Direction, fault_bits: u32) {
        self.pending_fault[channel_index(direction)] = fault_bits;
    }

    /// Complete descriptors on tail writes (default on)
    pub fn set_auto_complete(&mut self, enabled: bool) {
        self.auto_complete = enabled;
    }

    /// Never report idle
    pub fn set_never_idle(&mut self, never: bool) {
        self.never_idle = never;
    }

    /// Cap the bytes reported per descriptor
    pub fn set_transfer_cap(&mut self, cap: Option<u32>) {
        self.transfer_cap = cap;
    }

    /// Ignore writes to the aperture register
    pub fn set_aperture_stuck(&mut self, stuck: bool) {
        self.aperture_stuck = stuck;
    }

    fn channel_at(&self, offset: usize) -> Option<(Direction, usize)> {
        Direction::ALL.into_iter().find_map(|direction| {
            let base = self.layout.channel_base(direction);
            (base..base + 0x30)
                .contains(&offset)
                .then(|| (direction, offset - base))
        })
    }

    fn write_control(&mut self, direction: Direction, value: u32) {
        let i = channel_index(direction);
        let base = self.layout.channel_base(direction);
        let cr = base + DMACR_OFFSET;
        let sr = base + DMASR_OFFSET;

        if value & DMACR_RESET != 0 {
            self.resets[i] += 1;
            if self.reset_stuck[i] {
                self.set_word(cr, value);
            } else {
                self.set_word(cr, DMACR_RESET_VALUE);
                self.set_word(sr, DMASR_HALTED);
                self.pending_fault[i] = 0;
            }
            return;
        }

        let previous = self.word(cr);
        self.set_word(cr, value);
        let status = self.word(sr);
        if value & DMACR_RS == 0 {
            self.set_word(sr, status | DMASR_HALTED);
        } else if previous & DMACR_RS == 0 && !self.halt_stuck[i] {
            self.set_word(sr, status & !(DMASR_HALTED | DMASR_IDLE));
        }
    }

    fn write_tail(&mut self, direction: Direction, tail: u32) {
        let i = channel_index(direction);
        let base = self.layout.channel_base(direction);
        let sr = base + DMASR_OFFSET;

        let running = self.word(base + DMACR_OFFSET) & DMACR_RS != 0
            && self.word(sr) & DMASR_HALTED == 0;
        if !running {
            return;
        }

        if self.pending_fault[i] != 0 {
            let status = self.word(sr) | self.pending_fault[i] | DMASR_ERR_IRQ | DMASR_HALTED;
            self.set_word(sr, status);
            self.pending_fault[i] = 0;
            return;
        }
        if !self.auto_complete {
            return;
        }

        let mut address = self.word(base + CURDESC_OFFSET);
        for hop in 0..MAX_WALK {
            let Some(offset) = self.layout.from_bus(address) else {
                break;
            };
            let len = self.word(offset + word::CONTROL) & control::LEN_MASK;
            let moved = self.transfer_cap.map_or(len, |cap| cap.min(len));
            let mut desc_status = status::CMPLT | moved;
            if direction == Direction::Receive {
                if hop == 0 {
                    desc_status |= status::RXSOF;
                }
                if address == tail {
                    desc_status |= status::RXEOF;
                }
            }
            self.set_word(offset + word::STATUS, desc_status);

            if address == tail {
                break;
            }
            address = self.word(offset + word::NXTDESC);
        }

        self.set_word(base + CURDESC_OFFSET, tail);
        let mut status = self.word(sr) | DMASR_IOC_IRQ;
        if !self.never_idle {
            status |= DMASR_IDLE;
        }
        self.set_word(sr, status);
    }
}

impl RegisterWindow for MockWindow {
    fn read32(&self, offset: usize) -> u32 {
        self.word(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.write_log.push((offset, value));

        if offset == self.layout.aperture_offset() {
            if !self.aperture_stuck {
                self.set_word(offset, value);
            }
            return;
        }

        match self.channel_at(offset) {
            Some((direction, DMACR_OFFSET)) => self.write_control(direction, value),
            Some((_, DMASR_OFFSET)) => {
                let status = self.word(offset) & !(value & DMASR_ALL_IRQ);
                self.set_word(offset, status);
            }
            Some((direction, TAILDESC_OFFSET)) => {
                self.set_word(offset, value);
                self.write_tail(direction, value);
            }
            _ => self.set_word(offset, value),
        }
    }

    fn size(&self) -> usize {
        self.words.len() * 4
    }
}

// =============================================================================
// Mock Platform
// =============================================================================

/// Collaborator call recorded by [`MockPlatform`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    MapBar(u32),
    UnmapBar(u32),
    Map { id: usize, len: usize },
    Sync { id: usize, direction: SyncDirection },
    Unmap { id: usize },
    WaitInterrupt(u32),
}

/// Mapping handle produced by [`MockPlatform`]
#[derive(Debug)]
pub struct MockMapping {
    pub id: usize,
    segments: Vec<Segment>,
}

impl UserMapping for MockMapping {
    fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

/// Mock platform handing out a [`MockWindow`] and page-split mappings
///
/// By default a buffer of `len` bytes is split into 4 KiB segments placed
/// at non-contiguous bus addresses inside one 1 GiB window. Explicit
/// segment lists can be queued with [`MockPlatform::push_segments`].
#[derive(Debug)]
pub struct MockPlatform {
    window: Option<MockWindow>,
    returned_window: Option<MockWindow>,
    plans: VecDeque<Vec<Segment>>,
    bus_base: u32,
    next_id: usize,
    live: usize,
    events: RefCell<Vec<PlatformEvent>>,
    pub fail_map_bar: bool,
    pub fail_map: bool,
    pub fail_sync: bool,
    pub fail_unmap: bool,
    pub fail_interrupt: bool,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatform {
    /// Platform with a default [`MockWindow`]
    pub fn new() -> Self {
        Self::with_window(MockWindow::new())
    }

    /// Platform handing out `window` on the first `map_bar`
    pub fn with_window(window: MockWindow) -> Self {
        Self {
            window: Some(window),
            returned_window: None,
            plans: VecDeque::new(),
            bus_base: 0x4000_0000,
            next_id: 0,
            live: 0,
            events: RefCell::new(Vec::new()),
            fail_map_bar: false,
            fail_map: false,
            fail_sync: false,
            fail_unmap: false,
            fail_interrupt: false,
        }
    }

    /// Use `segments` for the next mapping instead of the default split
    pub fn push_segments(&mut self, segments: &[Segment]) {
        self.plans.push_back(segments.to_vec());
    }

    /// Set the bus address region used for default splits
    pub fn set_bus_base(&mut self, base: u32) {
        self.bus_base = base;
    }

    /// Recorded collaborator calls
    pub fn events(&self) -> Vec<PlatformEvent> {
        self.events.borrow().clone()
    }

    /// Number of mappings not yet unmapped
    pub fn live_mappings(&self) -> usize {
        self.live
    }

    /// Window handed back through `unmap_bar`
    pub fn returned_window(&self) -> Option<&MockWindow> {
        self.returned_window.as_ref()
    }

    fn record(&self, event: PlatformEvent) {
        self.events.borrow_mut().push(event);
    }

    fn default_split(&self, id: usize, len: usize) -> Vec<Segment> {
        let page = 0x1000usize;
        let region = self.bus_base + (id as u32) * 0x0010_0000;
        (0..len.div_ceil(page))
            .map(|i| {
                let size = page.min(len - i * page) as u32;
                Segment::new(region + (i as u32) * 0x2000, size)
            })
            .collect()
    }
}

impl DmaPlatform for MockPlatform {
    type Window = MockWindow;
    type Mapping = MockMapping;

    fn map_bar(&mut self, index: u32) -> Result<MockWindow> {
        self.record(PlatformEvent::MapBar(index));
        if self.fail_map_bar {
            return Err(IoError::BarMapFailed.into());
        }
        self.window.take().ok_or(IoError::BarMapFailed.into())
    }

    fn unmap_bar(&mut self, index: u32, window: MockWindow) -> Result<()> {
        self.record(PlatformEvent::UnmapBar(index));
        self.returned_window = Some(window);
        Ok(())
    }

    unsafe fn map_user_memory(
        &mut self,
        _ptr: *const u8,
        len: usize,
        _direction: SyncDirection,
    ) -> Result<MockMapping> {
        let id = self.next_id;
        self.next_id += 1;
        self.record(PlatformEvent::Map { id, len });
        if self.fail_map {
            return Err(IoError::MapFailed.into());
        }
        let segments = self
            .plans
            .pop_front()
            .unwrap_or_else(|| self.default_split(id, len));
        self.live += 1;
        Ok(MockMapping { id, segments })
    }

    fn sync_user_memory(&mut self, mapping: &MockMapping, direction: SyncDirection) -> Result<()> {
        self.record(PlatformEvent::Sync {
            id: mapping.id,
            direction,
        });
        if self.fail_sync {
            return Err(IoError::SyncFailed.into());
        }
        Ok(())
    }

    fn unmap_user_memory(&mut self, mapping: MockMapping) -> Result<()> {
        self.record(PlatformEvent::Unmap { id: mapping.id });
        self.live -= 1;
        if self.fail_unmap {
            return Err(IoError::UnmapFailed.into());
        }
        Ok(())
    }

    fn wait_for_interrupt(&mut self, line: u32) -> Result<()> {
        self.record(PlatformEvent::WaitInterrupt(line));
        if self.fail_interrupt {
            return Err(IoError::InterruptFailed.into());
        }
        Ok(())
    }
}

// =============================================================================
// Mock Delay
// =============================================================================

/// Mock delay implementation for testing
#[derive(Debug, Default)]
pub struct MockDelay {
    /// Total nanoseconds delayed
    total_ns: RefCell<u64>,
}

impl MockDelay {
    /// Create a new mock delay
    pub fn new() -> Self {
        Self::default()
    }

    /// Get total nanoseconds that were "delayed"
    pub fn total_ns(&self) -> u64 {
        *self.total_ns.borrow()
    }

    /// Get total microseconds that were "delayed"
    pub fn total_us(&self) -> u64 {
        self.total_ns() / 1_000
    }
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        *self.total_ns.borrow_mut() += u64::from(ns);
    }
}

// =============================================================================
// Self Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::internal::register::dma::DMASR_DMA_SLV_ERR;

    #[test]
    fn mock_window_starts_halted() {
        let window = MockWindow::new();
        assert_eq!(window.word(0x1004), DMASR_HALTED);
        assert_eq!(window.word(0x1034), DMASR_HALTED);
        assert_eq!(window.size(), 0x4000);
    }

    #[test]
    fn mock_window_reset_self_clears() {
        let mut window = MockWindow::new();
        window.write32(0x1000, DMACR_RESET);
        assert_eq!(window.word(0x1000) & DMACR_RESET, 0);
        assert_eq!(window.reset_count(Direction::Send), 1);
        assert_eq!(window.reset_count(Direction::Receive), 0);
    }

    #[test]
    fn mock_window_run_clears_halted() {
        let mut window = MockWindow::new();
        window.write32(0x1030, DMACR_RS);
        assert_eq!(window.word(0x1034) & DMASR_HALTED, 0);
        window.write32(0x1030, 0);
        assert_ne!(window.word(0x1034) & DMASR_HALTED, 0);
    }

    #[test]
    fn mock_window_tail_with_fault_halts() {
        let mut window = MockWindow::new();
        window.inject_fault(Direction::Send, DMASR_DMA_SLV_ERR);
        window.write32(0x1000, DMACR_RS);
        window.write32(0x1010, 0x8000_2000);
        let sr = window.word(0x1004);
        assert_ne!(sr & DMASR_DMA_SLV_ERR, 0);
        assert_ne!(sr & DMASR_HALTED, 0);
    }

    #[test]
    fn mock_platform_default_split() {
        let mut platform = MockPlatform::new();
        let mapping = unsafe {
            platform
                .map_user_memory(core::ptr::null(), 0x2100, SyncDirection::ToDevice)
                .unwrap()
        };
        let sizes: Vec<u32> = mapping.segments().iter().map(|s| s.size).collect();
        assert_eq!(sizes, vec![0x1000, 0x1000, 0x100]);
        assert_eq!(mapping.total_len(), 0x2100);
        assert_eq!(platform.live_mappings(), 1);
    }
}
