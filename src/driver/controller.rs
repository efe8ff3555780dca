//! Scatter-gather DMA transfer orchestrator.
//!
//! [`SgDma`] owns the mapped BAR, the two channel controllers and the
//! single aperture register, and runs each transfer through
//! setup → start → check → free.
//!
//! # Transfer lifecycle
//!
//! ```text
//!            setup_*            start_*            check_* (ok)
//!   Idle ────────────► Configured ──────► Started ─────────────► Completed
//!    ▲                     │                 │ check_* (err)          │
//!    │                     │                 ▼                        │
//!    └──────── free_* ─────┴──────────── Failed ◄─────────────────────┘
//! ```
//!
//! Each direction holds at most one transfer between setup and free.

use embedded_hal::delay::DelayNs;

use crate::driver::config::{Direction, DmaConfig, RingRegion, WaitMode};
use crate::driver::error::{ConfigError, DmaError, IoError, Result};
use crate::driver::interrupt::InterruptStatus;
use crate::hal::{DmaPlatform, RegisterWindow, SyncDirection, UserMapping};
use crate::internal::constants::MAX_STREAM_DEST;
use crate::internal::dma::monitor;
use crate::internal::dma::ring::clear_region;
use crate::internal::dma::translate::program_aperture;
use crate::internal::dma::{ChannelController, DescriptorRing, SgDescriptor, TranslatedMapping};
use crate::internal::register::bridge::BridgeRegs;

// =============================================================================
// Transfer State
// =============================================================================

/// Lifecycle state of one direction's transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferState {
    /// No transfer configured
    #[default]
    Idle,
    /// Buffer mapped, ring built, channel running and waiting for the tail
    Configured,
    /// Tail written, engine processing the ring
    Started,
    /// Completion checked successfully; buffer still mapped
    Completed,
    /// Check failed; buffer still mapped
    Failed,
}

impl TransferState {
    /// Check whether a transfer holds a buffer mapping
    #[inline(always)]
    pub const fn is_active(&self) -> bool {
        !matches!(self, TransferState::Idle)
    }
}

/// A configured transfer and the resources it holds
#[derive(Debug)]
struct ActiveTransfer<M> {
    mapping: M,
    ring: DescriptorRing,
    window_base: u32,
    expected: usize,
}

/// Per-direction state
#[derive(Debug)]
struct ChannelSlot<M> {
    controller: ChannelController,
    transfer: Option<ActiveTransfer<M>>,
    state: TransferState,
}

impl<M> ChannelSlot<M> {
    const fn new(controller: ChannelController) -> Self {
        Self {
            controller,
            transfer: None,
            state: TransferState::Idle,
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Scatter-gather DMA controller for one PCIe endpoint
///
/// # Example
///
/// ```ignore
/// let mut dma = SgDma::init(platform, delay, DmaConfig::new())?;
///
/// let sent = dma.send(&payload, 2, WaitMode::Poll)?;
/// let received = dma.receive(&mut buffer, WaitMode::Interrupt)?;
///
/// let platform = dma.shutdown()?;
/// ```
pub struct SgDma<P: DmaPlatform, D: DelayNs> {
    platform: P,
    window: P::Window,
    delay: D,
    config: DmaConfig,
    bridge: BridgeRegs,
    send: ChannelSlot<P::Mapping>,
    receive: ChannelSlot<P::Mapping>,
}

impl<P: DmaPlatform, D: DelayNs> SgDma<P, D> {
    /// Map the BAR and bring the engine to a known state.
    ///
    /// The configuration is validated first. After mapping, the descriptor
    /// memory is cleared and both channels are soft-reset. On failure the
    /// BAR is unmapped again.
    pub fn init(mut platform: P, delay: D, config: DmaConfig) -> Result<Self> {
        config.validate()?;
        let layout = config.layout;

        let window = platform.map_bar(layout.bar_index)?;
        if window.size() < layout.bar_size {
            error!(
                "BAR {} maps {} bytes, layout needs {}",
                layout.bar_index,
                window.size(),
                layout.bar_size
            );
            if let Err(_e) = platform.unmap_bar(layout.bar_index, window) {
                warn!("BAR unmap after failed init failed");
            }
            return Err(ConfigError::InvalidLayout.into());
        }

        let mut dma = Self {
            platform,
            window,
            delay,
            config,
            bridge: BridgeRegs::new(layout.bridge_base),
            send: ChannelSlot::new(ChannelController::new(&layout, Direction::Send)),
            receive: ChannelSlot::new(ChannelController::new(&layout, Direction::Receive)),
        };

        clear_region(
            &mut dma.window,
            RingRegion::new(layout.desc_mem_base, layout.desc_mem_size),
        );
        let reset = dma
            .send
            .controller
            .reset(&mut dma.window, &mut dma.delay, &dma.config)
            .and_then(|()| {
                dma.receive
                    .controller
                    .reset(&mut dma.window, &mut dma.delay, &dma.config)
            });
        if let Err(e) = reset {
            let Self {
                mut platform,
                window,
                ..
            } = dma;
            if let Err(_e) = platform.unmap_bar(layout.bar_index, window) {
                warn!("BAR unmap after failed init failed");
            }
            return Err(e);
        }

        info!(
            "SG DMA ready: BAR {}, aperture {:#010x}",
            layout.bar_index,
            dma.bridge.aperture(&dma.window)
        );
        Ok(dma)
    }

    /// Release any unreleased transfers, stop both channels and unmap the
    /// BAR. Returns the platform.
    pub fn shutdown(mut self) -> Result<P> {
        let mut first_error = None;
        for direction in Direction::ALL {
            if self.state(direction).is_active()
                && let Err(e) = self.free(direction)
            {
                first_error.get_or_insert(e);
            }
        }
        self.send.controller.stop(&mut self.window);
        self.receive.controller.stop(&mut self.window);

        let Self {
            mut platform,
            window,
            config,
            ..
        } = self;
        platform.unmap_bar(config.layout.bar_index, window)?;
        info!("SG DMA shut down");

        match first_error {
            Some(e) => Err(e),
            None => Ok(platform),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Active configuration
    pub fn config(&self) -> &DmaConfig {
        &self.config
    }

    /// Platform collaborator
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Mutable platform collaborator
    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    /// Mapped register window
    pub fn window(&self) -> &P::Window {
        &self.window
    }

    #[cfg(test)]
    pub(crate) fn window_mut(&mut self) -> &mut P::Window {
        &mut self.window
    }

    /// Transfer state of a direction
    pub fn state(&self, direction: Direction) -> TransferState {
        self.slot(direction).state
    }

    /// Transfer state of the send direction
    pub fn send_state(&self) -> TransferState {
        self.send.state
    }

    /// Transfer state of the receive direction
    pub fn receive_state(&self) -> TransferState {
        self.receive.state
    }

    /// Current aperture register value
    pub fn aperture(&self) -> u32 {
        self.bridge.aperture(&self.window)
    }

    fn slot(&self, direction: Direction) -> &ChannelSlot<P::Mapping> {
        match direction {
            Direction::Send => &self.send,
            Direction::Receive => &self.receive,
        }
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Prepare a host-to-device transfer of `len` bytes at `buffer`.
    ///
    /// The buffer is pinned and mapped, synchronized for the device, the
    /// aperture is programmed, the send ring is built and the MM2S channel
    /// is started waiting for its tail pointer.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for reads of `len` bytes and must stay valid
    /// and unmodified until [`SgDma::free_send`] returns.
    pub unsafe fn setup_send(
        &mut self,
        buffer: *const u8,
        len: usize,
        stream_dest: u8,
    ) -> Result<()> {
        if stream_dest > MAX_STREAM_DEST {
            return Err(ConfigError::InvalidStreamDest.into());
        }
        // SAFETY: forwarded from the caller
        unsafe { self.setup(Direction::Send, buffer, len, stream_dest) }
    }

    /// Prepare a device-to-host transfer into `len` bytes at `buffer`.
    ///
    /// # Safety
    ///
    /// `buffer` must be valid for writes of `len` bytes, must not be read or
    /// written by the CPU, and must stay valid until [`SgDma::free_receive`]
    /// returns.
    pub unsafe fn setup_receive(&mut self, buffer: *mut u8, len: usize) -> Result<()> {
        // SAFETY: forwarded from the caller
        unsafe { self.setup(Direction::Receive, buffer.cast_const(), len, 0) }
    }

    unsafe fn setup(
        &mut self,
        direction: Direction,
        buffer: *const u8,
        len: usize,
        stream_dest: u8,
    ) -> Result<()> {
        if len == 0 || u32::try_from(len).is_err() {
            return Err(ConfigError::InvalidBufferLength.into());
        }
        if self.slot(direction).state.is_active() {
            return Err(DmaError::TransferPending.into());
        }

        // SAFETY: the caller keeps the buffer alive until free
        let mapping = unsafe {
            self.platform
                .map_user_memory(buffer, len, direction.sync_direction())?
        };

        match self.configure(direction, &mapping, stream_dest) {
            Ok((ring, window_base)) => {
                let expected = mapping.total_len();
                let slot = match direction {
                    Direction::Send => &mut self.send,
                    Direction::Receive => &mut self.receive,
                };
                slot.transfer = Some(ActiveTransfer {
                    mapping,
                    ring,
                    window_base,
                    expected,
                });
                slot.state = TransferState::Configured;
                debug!(
                    "{} configured: {} bytes in {} segments",
                    direction.as_str(),
                    expected,
                    ring.len()
                );
                Ok(())
            }
            Err(e) => {
                if let Err(_unmap) = self.platform.unmap_user_memory(mapping) {
                    warn!("{} unmap after failed setup failed", direction.as_str());
                }
                Err(e)
            }
        }
    }

    fn configure(
        &mut self,
        direction: Direction,
        mapping: &P::Mapping,
        stream_dest: u8,
    ) -> Result<(DescriptorRing, u32)> {
        let layout = self.config.layout;
        let region = layout.ring_region(direction);
        let translated = TranslatedMapping::new(mapping.segments(), self.config.aperture_mask)?;
        DescriptorRing::validate(&layout, region, &translated)?;
        let window_base = translated.window_base();

        if let Some(other) = &self.slot(direction.opposite()).transfer
            && other.window_base != window_base
        {
            error!(
                "{} needs aperture {:#010x}, {} holds {:#010x}",
                direction.as_str(),
                window_base,
                direction.opposite().as_str(),
                other.window_base
            );
            return Err(DmaError::ApertureInUse.into());
        }

        if direction == Direction::Send {
            self.platform
                .sync_user_memory(mapping, SyncDirection::ToDevice)?;
        }
        program_aperture(&mut self.window, self.bridge, window_base)?;

        let ring = DescriptorRing::build(
            &mut self.window,
            &layout,
            region,
            &translated,
            direction,
            stream_dest,
            self.config.cache_attr,
        )?;

        let interrupts = direction == Direction::Receive || self.config.send_interrupts;
        let slot = match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.receive,
        };
        slot.controller.arm_and_start(
            &mut self.window,
            &mut self.delay,
            &self.config,
            ring.base_bus(),
            interrupts,
        )?;

        Ok((ring, window_base))
    }

    // =========================================================================
    // Start
    // =========================================================================

    /// Write the send tail pointer; with [`WaitMode::Interrupt`] also wait
    /// for the interrupt and return the decoded status.
    pub fn start_send(&mut self, mode: WaitMode) -> Result<Option<InterruptStatus>> {
        self.start(Direction::Send, mode)
    }

    /// Write the receive tail pointer; with [`WaitMode::Interrupt`] also
    /// wait for the interrupt and return the decoded status.
    pub fn start_receive(&mut self, mode: WaitMode) -> Result<Option<InterruptStatus>> {
        self.start(Direction::Receive, mode)
    }

    fn start(&mut self, direction: Direction, mode: WaitMode) -> Result<Option<InterruptStatus>> {
        if mode == WaitMode::Interrupt
            && direction == Direction::Send
            && !self.config.send_interrupts
        {
            return Err(ConfigError::InvalidConfig.into());
        }

        let slot = match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.receive,
        };
        let tail = match (slot.state, &slot.transfer) {
            (TransferState::Configured, Some(transfer)) => transfer.ring.tail_bus(),
            (TransferState::Idle, _) => return Err(DmaError::NoTransfer.into()),
            _ => return Err(IoError::InvalidState.into()),
        };
        slot.controller.write_tail(&mut self.window, tail);
        slot.state = TransferState::Started;

        match mode {
            WaitMode::Poll => Ok(None),
            WaitMode::Interrupt => self.wait_for_interrupt().map(Some),
        }
    }

    /// Block on the platform interrupt, then decode and acknowledge the IRQ
    /// bits of both channels.
    pub fn wait_for_interrupt(&mut self) -> Result<InterruptStatus> {
        self.platform.wait_for_interrupt(self.config.interrupt_line)?;

        let send_status = self.send.controller.status(&self.window);
        let receive_status = self.receive.controller.status(&self.window);
        let status = InterruptStatus::from_raw(send_status, receive_status);
        debug!(
            "interrupt: MM2S {:#010x} ioc {} err {}, S2MM {:#010x} ioc {} err {}",
            send_status,
            status.send_complete,
            status.send_error,
            receive_status,
            status.receive_complete,
            status.receive_error
        );

        self.send
            .controller
            .acknowledge_irqs(&mut self.window, status.send_raw());
        self.receive
            .controller
            .acknowledge_irqs(&mut self.window, status.receive_raw());
        Ok(status)
    }

    // =========================================================================
    // Check
    // =========================================================================

    /// Wait for the send transfer to finish and return the bytes sent.
    ///
    /// The engine must report exactly the configured length.
    pub fn check_send(&mut self) -> Result<usize> {
        self.check(Direction::Send)
    }

    /// Wait for the receive transfer to finish and return the bytes received.
    ///
    /// A packet shorter than the buffer is accepted. The buffer is
    /// synchronized for the CPU after completion.
    pub fn check_receive(&mut self) -> Result<usize> {
        self.check(Direction::Receive)
    }

    fn check(&mut self, direction: Direction) -> Result<usize> {
        let region = self.config.layout.ring_region(direction);
        let slot = match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.receive,
        };
        let transfer = match (slot.state, &slot.transfer) {
            (TransferState::Started, Some(transfer)) => transfer,
            (TransferState::Idle, _) => return Err(DmaError::NoTransfer.into()),
            _ => return Err(IoError::InvalidState.into()),
        };

        let result = monitor::check_transfer(
            &mut self.window,
            &mut self.delay,
            &self.config,
            &mut slot.controller,
            &transfer.ring,
            region,
        )
        .and_then(|total| {
            let matches = match direction {
                Direction::Send => total == transfer.expected,
                Direction::Receive => total <= transfer.expected,
            };
            if matches {
                Ok(total)
            } else {
                error!(
                    "{} transferred {} bytes, expected {}",
                    direction.as_str(),
                    total,
                    transfer.expected
                );
                Err(DmaError::LengthMismatch.into())
            }
        })
        .and_then(|total| {
            if direction == Direction::Receive {
                self.platform
                    .sync_user_memory(&transfer.mapping, SyncDirection::FromDevice)?;
            }
            Ok(total)
        });

        slot.state = match result {
            Ok(_) => TransferState::Completed,
            Err(_) => TransferState::Failed,
        };
        result
    }

    // =========================================================================
    // Free
    // =========================================================================

    /// Release the send transfer and unmap its buffer
    pub fn free_send(&mut self) -> Result<()> {
        self.free(Direction::Send)
    }

    /// Release the receive transfer and unmap its buffer
    pub fn free_receive(&mut self) -> Result<()> {
        self.free(Direction::Receive)
    }

    fn free(&mut self, direction: Direction) -> Result<()> {
        let slot = match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.receive,
        };
        let Some(transfer) = slot.transfer.take() else {
            return Err(DmaError::NoTransfer.into());
        };

        let halted = match slot.state {
            TransferState::Started => {
                warn!("{} freed while started, resetting channel", direction.as_str());
                slot.controller
                    .reset(&mut self.window, &mut self.delay, &self.config)
            }
            TransferState::Configured | TransferState::Failed => {
                slot.controller.stop(&mut self.window);
                Ok(())
            }
            TransferState::Idle | TransferState::Completed => Ok(()),
        };
        slot.state = TransferState::Idle;

        let unmapped = self.platform.unmap_user_memory(transfer.mapping);
        debug!("{} released", direction.as_str());
        halted.and(unmapped)
    }

    // =========================================================================
    // One-shot Transfers
    // =========================================================================

    /// Send `data` to stream destination `stream_dest` and return the
    /// number of bytes sent. The transfer is released before returning,
    /// also when it fails.
    pub fn send(&mut self, data: &[u8], stream_dest: u8, mode: WaitMode) -> Result<usize> {
        // SAFETY: `data` is borrowed for the whole call and the transfer is
        // released before returning
        unsafe { self.setup_send(data.as_ptr(), data.len(), stream_dest)? };
        let result = self
            .start_send(mode)
            .and_then(|_| self.check_send());
        let freed = self.free_send();
        let total = result?;
        freed?;
        Ok(total)
    }

    /// Receive into `buffer` and return the number of bytes received. The
    /// transfer is released before returning, also when it fails.
    pub fn receive(&mut self, buffer: &mut [u8], mode: WaitMode) -> Result<usize> {
        // SAFETY: `buffer` is exclusively borrowed for the whole call and the
        // transfer is released before returning
        unsafe { self.setup_receive(buffer.as_mut_ptr(), buffer.len())? };
        let result = self
            .start_receive(mode)
            .and_then(|_| self.check_receive());
        let freed = self.free_receive();
        let total = result?;
        freed?;
        Ok(total)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Soft-reset one channel. An active transfer on it is marked failed.
    pub fn reset_channel(&mut self, direction: Direction) -> Result<()> {
        let slot = match direction {
            Direction::Send => &mut self.send,
            Direction::Receive => &mut self.receive,
        };
        if slot.state.is_active() {
            slot.state = TransferState::Failed;
        }
        slot.controller
            .reset(&mut self.window, &mut self.delay, &self.config)
    }

    /// Zero the whole descriptor memory.
    ///
    /// Refused while either direction holds a transfer.
    pub fn clear_descriptor_memory(&mut self) -> Result<()> {
        if self.send.state.is_active() || self.receive.state.is_active() {
            return Err(DmaError::TransferPending.into());
        }
        let layout = self.config.layout;
        debug!("clearing descriptor memory");
        clear_region(
            &mut self.window,
            RingRegion::new(layout.desc_mem_base, layout.desc_mem_size),
        );
        Ok(())
    }

    /// Words of the descriptor memory in address order
    pub fn descriptor_memory(&self) -> impl Iterator<Item = u32> + '_ {
        let layout = self.config.layout;
        (layout.desc_mem_base..layout.desc_mem_base + layout.desc_mem_size)
            .step_by(4)
            .map(move |offset| self.window.read32(offset))
    }

    /// Log the descriptor memory at debug level, one descriptor per line
    pub fn dump_descriptor_memory(&self) {
        let layout = self.config.layout;
        debug!("descriptor memory at {:#010x}", layout.to_bus(layout.desc_mem_base));
        let stride = SgDescriptor::SIZE;
        for offset in (layout.desc_mem_base..layout.desc_mem_base + layout.desc_mem_size)
            .step_by(stride)
        {
            let w = |i: usize| self.window.read32(offset + i * 4);
            debug!(
                "{:#010x}: {:#010x} {:#010x} {:#010x} {:#010x} {:#010x} {:#010x} {:#010x} {:#010x}",
                layout.to_bus(offset),
                w(0),
                w(1),
                w(2),
                w(3),
                w(4),
                w(5),
                w(6),
                w(7)
            );
        }
    }
}

impl<P: DmaPlatform, D: DelayNs> core::fmt::Debug for SgDma<P, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SgDma")
            .field("config", &self.config)
            .field("send", &self.send.state)
            .field("receive", &self.receive.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec;
    use std::vec::Vec;

    use super::*;
    use crate::driver::error::{EngineFault, Error};
    use crate::hal::Segment;
    use crate::internal::register::dma::{DMASR_IOC_IRQ, DMASR_SG_DEC_ERR};
    use crate::testing::{MockDelay, MockPlatform, MockWindow, PlatformEvent};

    type TestDma = SgDma<MockPlatform, MockDelay>;

    const SCENARIO: [Segment; 3] = [
        Segment::new(0x4000_1000, 100),
        Segment::new(0x4000_3000, 4096),
        Segment::new(0x4000_5000, 23),
    ];

    fn init_with(platform: MockPlatform, config: DmaConfig) -> TestDma {
        SgDma::init(platform, MockDelay::new(), config).unwrap()
    }

    fn init() -> TestDma {
        init_with(MockPlatform::new(), DmaConfig::new())
    }

    // =========================================================================
    // Init / Shutdown Tests
    // =========================================================================

    #[test]
    fn init_clears_memory_and_resets_both_channels() {
        let mut window = MockWindow::new();
        window.set_word(0x2000, 0xDEAD_BEEF);
        window.set_word(0x2FFC, 0xDEAD_BEEF);
        let dma = init_with(MockPlatform::with_window(window), DmaConfig::new());

        assert_eq!(dma.window().word(0x2000), 0);
        assert_eq!(dma.window().word(0x2FFC), 0);
        assert_eq!(dma.window().reset_count(Direction::Send), 1);
        assert_eq!(dma.window().reset_count(Direction::Receive), 1);
        assert_eq!(dma.platform().events(), vec![PlatformEvent::MapBar(0)]);
        assert_eq!(dma.send_state(), TransferState::Idle);
        assert_eq!(dma.receive_state(), TransferState::Idle);
    }

    #[test]
    fn init_rejects_invalid_config_before_mapping() {
        let config = DmaConfig::new().with_irq_threshold(0);
        let result = SgDma::init(MockPlatform::new(), MockDelay::new(), config);
        assert_eq!(result.err(), Some(Error::Config(ConfigError::InvalidConfig)));
    }

    #[test]
    fn init_rejects_small_bar() {
        let layout = crate::driver::config::BarLayout::new().with_bar(0, 0x2000);
        let window = MockWindow::with_layout(layout);
        let result = SgDma::init(
            MockPlatform::with_window(window),
            MockDelay::new(),
            DmaConfig::new(),
        );
        assert_eq!(result.err(), Some(Error::Config(ConfigError::InvalidLayout)));
    }

    #[test]
    fn init_reports_bar_map_failure() {
        let mut platform = MockPlatform::new();
        platform.fail_map_bar = true;
        let result = SgDma::init(platform, MockDelay::new(), DmaConfig::new());
        assert_eq!(result.err(), Some(Error::Io(IoError::BarMapFailed)));
    }

    #[test]
    fn init_reports_reset_timeout() {
        let mut window = MockWindow::new();
        window.set_reset_stuck(Direction::Send, true);
        let result = SgDma::init(
            MockPlatform::with_window(window),
            MockDelay::new(),
            DmaConfig::new().with_reset_timeout_us(100),
        );
        assert_eq!(result.err(), Some(Error::Io(IoError::Timeout)));
    }

    #[test]
    fn shutdown_releases_transfers_and_unmaps_bar() {
        let mut dma = init();
        let data = [0u8; 256];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };

        let platform = dma.shutdown().unwrap();
        assert_eq!(platform.live_mappings(), 0);
        assert_eq!(platform.events().last(), Some(&PlatformEvent::UnmapBar(0)));
        assert!(platform.returned_window().is_some());
    }

    // =========================================================================
    // Full Cycle Tests
    // =========================================================================

    #[test]
    fn three_segment_send_scenario() {
        let mut platform = MockPlatform::new();
        platform.push_segments(&SCENARIO);
        let mut dma = init_with(platform, DmaConfig::new());
        let data = [0xA5u8; 4219];

        unsafe { dma.setup_send(data.as_ptr(), data.len(), 2).unwrap() };
        assert_eq!(dma.send_state(), TransferState::Configured);
        assert_eq!(dma.aperture(), 0x4000_0000);

        // Tail sits two strides past the ring base.
        let tail = dma.send.transfer.as_ref().unwrap().ring.tail_bus();
        assert_eq!(tail, 0x8000_2000 + 2 * 0x40);

        assert_eq!(dma.start_send(WaitMode::Poll), Ok(None));
        assert_eq!(dma.send_state(), TransferState::Started);
        assert_eq!(dma.window().word(0x1010), tail);

        assert_eq!(dma.check_send(), Ok(4219));
        assert_eq!(dma.send_state(), TransferState::Completed);

        dma.free_send().unwrap();
        assert_eq!(dma.send_state(), TransferState::Idle);
        assert_eq!(dma.platform().live_mappings(), 0);
        assert!(
            dma.platform()
                .events()
                .contains(&PlatformEvent::Sync {
                    id: 0,
                    direction: SyncDirection::ToDevice
                })
        );
    }

    #[test]
    fn receive_with_interrupt_acknowledges_and_syncs() {
        let mut dma = init();
        let mut buffer = vec![0u8; 0x3000];

        unsafe { dma.setup_receive(buffer.as_mut_ptr(), buffer.len()).unwrap() };
        let status = dma.start_receive(WaitMode::Interrupt).unwrap().unwrap();
        assert!(status.receive_complete);
        assert!(!status.has_error());
        assert_eq!(dma.window().word(0x1034) & DMASR_IOC_IRQ, 0);

        assert_eq!(dma.check_receive(), Ok(0x3000));
        let events = dma.platform().events();
        assert!(events.contains(&PlatformEvent::WaitInterrupt(0)));
        assert_eq!(
            events.last(),
            Some(&PlatformEvent::Sync {
                id: 0,
                direction: SyncDirection::FromDevice
            })
        );
        dma.free_receive().unwrap();
    }

    #[test]
    fn short_receive_is_accepted() {
        let mut dma = init();
        dma.window_mut().set_transfer_cap(Some(0x800));
        let mut buffer = vec![0u8; 0x2000];

        assert_eq!(dma.receive(&mut buffer, WaitMode::Poll), Ok(0x1000));
        assert_eq!(dma.receive_state(), TransferState::Idle);
    }

    #[test]
    fn short_send_is_length_mismatch() {
        let mut dma = init();
        dma.window_mut().set_transfer_cap(Some(0x800));
        let data = vec![0u8; 0x2000];

        assert_eq!(
            dma.send(&data, 0, WaitMode::Poll),
            Err(Error::Dma(DmaError::LengthMismatch))
        );
        assert_eq!(dma.send_state(), TransferState::Idle);
        assert_eq!(dma.platform().live_mappings(), 0);
    }

    #[test]
    fn one_shot_send_and_receive() {
        let mut dma = init();
        let data = vec![1u8; 5000];
        let mut buffer = vec![0u8; 5000];

        assert_eq!(dma.send(&data, 3, WaitMode::Poll), Ok(5000));
        assert_eq!(dma.receive(&mut buffer, WaitMode::Interrupt), Ok(5000));
        assert_eq!(dma.platform().live_mappings(), 0);
    }

    #[test]
    fn back_to_back_transfers_reuse_channel() {
        let mut dma = init();
        let data = vec![7u8; 300];
        for _ in 0..3 {
            assert_eq!(dma.send(&data, 0, WaitMode::Poll), Ok(300));
        }
        assert_eq!(dma.window().reset_count(Direction::Send), 1);
    }

    // =========================================================================
    // Setup Validation Tests
    // =========================================================================

    #[test]
    fn second_setup_is_rejected() {
        let mut dma = init();
        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };
        let again = unsafe { dma.setup_send(data.as_ptr(), data.len(), 0) };

        assert_eq!(again, Err(Error::Dma(DmaError::TransferPending)));
        assert_eq!(dma.platform().live_mappings(), 1);
    }

    #[test]
    fn invalid_inputs_rejected_before_mapping() {
        let mut dma = init();
        let data = [0u8; 64];

        let empty = unsafe { dma.setup_send(data.as_ptr(), 0, 0) };
        assert_eq!(empty, Err(Error::Config(ConfigError::InvalidBufferLength)));
        let dest = unsafe { dma.setup_send(data.as_ptr(), data.len(), 16) };
        assert_eq!(dest, Err(Error::Config(ConfigError::InvalidStreamDest)));
        assert_eq!(dma.platform().events(), vec![PlatformEvent::MapBar(0)]);
    }

    #[test]
    fn unreachable_segments_unmap_buffer() {
        let mut platform = MockPlatform::new();
        platform.push_segments(&[Segment::new(0x4000_0000, 64), Segment::new(0xC000_0000, 64)]);
        let mut dma = init_with(platform, DmaConfig::new());
        let data = [0u8; 128];

        let result = unsafe { dma.setup_send(data.as_ptr(), data.len(), 0) };
        assert_eq!(result, Err(Error::Dma(DmaError::UnreachableSegment)));
        assert_eq!(dma.send_state(), TransferState::Idle);
        assert_eq!(dma.platform().live_mappings(), 0);
        assert_eq!(dma.window().writes_to(0x20C), 0);
    }

    #[test]
    fn segment_length_boundary() {
        let len = 1usize << 23;
        let mut platform = MockPlatform::new();
        platform.push_segments(&[Segment::new(0x4000_0000, (1 << 23) - 1)]);
        platform.push_segments(&[Segment::new(0x8000_0000, 1 << 23)]);
        let mut dma = init_with(platform, DmaConfig::new());
        let mut buffer = vec![0u8; len];

        let ok = unsafe { dma.setup_receive(buffer.as_mut_ptr(), len - 1) };
        assert_eq!(ok, Ok(()));
        dma.free_receive().unwrap();

        let too_large = unsafe { dma.setup_receive(buffer.as_mut_ptr(), len) };
        assert_eq!(too_large, Err(Error::Config(ConfigError::SegmentTooLarge)));
        assert_eq!(dma.platform().live_mappings(), 0);
        // Rejected before the aperture moves to the new window.
        assert_eq!(dma.window().writes_to(0x20C), 1);
        assert_eq!(dma.aperture(), 0x4000_0000);
    }

    #[test]
    fn too_many_segments_rejected_before_hardware() {
        let segments: Vec<Segment> = (0..33)
            .map(|i| Segment::new(0x4000_0000 + i * 0x2000, 64))
            .collect();
        let mut platform = MockPlatform::new();
        platform.push_segments(&segments);
        let mut dma = init_with(platform, DmaConfig::new());
        let data = vec![0u8; 33 * 64];

        let result = unsafe { dma.setup_send(data.as_ptr(), data.len(), 0) };
        assert_eq!(result, Err(Error::Config(ConfigError::RingCapacityExceeded)));
        assert_eq!(dma.window().writes_to(0x20C), 0);
        assert_eq!(dma.window().word(0x2000), 0);
        assert!(
            !dma.platform()
                .events()
                .iter()
                .any(|e| matches!(e, PlatformEvent::Sync { .. }))
        );
        assert_eq!(dma.platform().live_mappings(), 0);
    }

    #[test]
    fn aperture_conflict_with_other_direction() {
        let mut platform = MockPlatform::new();
        platform.push_segments(&[Segment::new(0x4000_0000, 64)]);
        platform.push_segments(&[Segment::new(0x8000_0000, 64)]);
        platform.push_segments(&[Segment::new(0x4100_0000, 64)]);
        let mut dma = init_with(platform, DmaConfig::new());
        let data = [0u8; 64];
        let mut buffer = [0u8; 64];

        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };
        let conflict = unsafe { dma.setup_receive(buffer.as_mut_ptr(), buffer.len()) };
        assert_eq!(conflict, Err(Error::Dma(DmaError::ApertureInUse)));
        assert_eq!(dma.aperture(), 0x4000_0000);

        let same_window = unsafe { dma.setup_receive(buffer.as_mut_ptr(), buffer.len()) };
        assert_eq!(same_window, Ok(()));
        assert_eq!(dma.window().writes_to(0x20C), 1);
    }

    #[test]
    fn aperture_write_failure_reported() {
        let mut dma = init();
        dma.window_mut().set_aperture_stuck(true);
        let data = [0u8; 64];

        let result = unsafe { dma.setup_send(data.as_ptr(), data.len(), 0) };
        assert_eq!(result, Err(Error::Dma(DmaError::ApertureWriteFailed)));
        assert_eq!(dma.platform().live_mappings(), 0);
    }

    #[test]
    fn sync_failure_unmaps_buffer() {
        let mut dma = init();
        dma.platform_mut().fail_sync = true;
        let data = [0u8; 64];

        let result = unsafe { dma.setup_send(data.as_ptr(), data.len(), 0) };
        assert_eq!(result, Err(Error::Io(IoError::SyncFailed)));
        assert_eq!(dma.platform().live_mappings(), 0);
    }

    // =========================================================================
    // State Machine Tests
    // =========================================================================

    #[test]
    fn operations_out_of_order() {
        let mut dma = init();
        assert_eq!(dma.start_send(WaitMode::Poll), Err(Error::Dma(DmaError::NoTransfer)));
        assert_eq!(dma.check_receive(), Err(Error::Dma(DmaError::NoTransfer)));
        assert_eq!(dma.free_send(), Err(Error::Dma(DmaError::NoTransfer)));

        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };
        assert_eq!(dma.check_send(), Err(Error::Io(IoError::InvalidState)));
        dma.start_send(WaitMode::Poll).unwrap();
        assert_eq!(dma.start_send(WaitMode::Poll), Err(Error::Io(IoError::InvalidState)));
    }

    #[test]
    fn send_interrupt_wait_requires_send_interrupts() {
        let mut dma = init();
        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };
        assert_eq!(
            dma.start_send(WaitMode::Interrupt),
            Err(Error::Config(ConfigError::InvalidConfig))
        );
        assert_eq!(dma.send_state(), TransferState::Configured);
    }

    #[test]
    fn send_interrupts_when_enabled() {
        let config = DmaConfig::new().with_send_interrupts(true).with_interrupt_line(5);
        let mut dma = init_with(MockPlatform::new(), config);
        let data = vec![0u8; 100];

        assert_eq!(dma.send(&data, 0, WaitMode::Interrupt), Ok(100));
        assert!(dma.platform().events().contains(&PlatformEvent::WaitInterrupt(5)));
    }

    #[test]
    fn engine_fault_fails_transfer_and_resets_channel() {
        let mut dma = init();
        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };
        dma.window_mut().inject_fault(Direction::Send, DMASR_SG_DEC_ERR);
        dma.start_send(WaitMode::Poll).unwrap();

        assert_eq!(
            dma.check_send(),
            Err(Error::Dma(DmaError::Engine(EngineFault::SgDecode)))
        );
        assert_eq!(dma.send_state(), TransferState::Failed);
        assert_eq!(dma.window().reset_count(Direction::Send), 2);

        dma.free_send().unwrap();
        assert_eq!(dma.send_state(), TransferState::Idle);
        // Channel is usable again after recovery.
        assert_eq!(dma.send(&data, 0, WaitMode::Poll), Ok(64));
    }

    #[test]
    fn interrupt_reports_error_flag() {
        let mut dma = init();
        let mut buffer = [0u8; 64];
        unsafe { dma.setup_receive(buffer.as_mut_ptr(), buffer.len()).unwrap() };
        dma.window_mut()
            .inject_fault(Direction::Receive, EngineFault::DmaSlave.status_bit());

        let status = dma.start_receive(WaitMode::Interrupt).unwrap().unwrap();
        assert!(status.receive_error);
        assert_eq!(
            dma.check_receive(),
            Err(Error::Dma(DmaError::Engine(EngineFault::DmaSlave)))
        );
        // The buffer is only synchronized for the CPU after a good check.
        assert!(!dma.platform().events().contains(&PlatformEvent::Sync {
            id: 0,
            direction: SyncDirection::FromDevice
        }));
        dma.free_receive().unwrap();
    }

    #[test]
    fn interrupt_wait_failure_leaves_transfer_started() {
        let mut dma = init();
        dma.platform_mut().fail_interrupt = true;
        let mut buffer = [0u8; 64];
        unsafe { dma.setup_receive(buffer.as_mut_ptr(), buffer.len()).unwrap() };

        assert_eq!(
            dma.start_receive(WaitMode::Interrupt),
            Err(Error::Io(IoError::InterruptFailed))
        );
        assert_eq!(dma.receive_state(), TransferState::Started);
        assert_eq!(dma.check_receive(), Ok(64));
    }

    #[test]
    fn free_started_transfer_resets_channel() {
        let mut dma = init();
        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };
        dma.start_send(WaitMode::Poll).unwrap();

        dma.free_send().unwrap();
        assert_eq!(dma.window().reset_count(Direction::Send), 2);
        assert_eq!(dma.platform().live_mappings(), 0);
    }

    #[test]
    fn unmap_failure_still_releases_slot() {
        let mut dma = init();
        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };
        dma.platform_mut().fail_unmap = true;

        assert_eq!(dma.free_send(), Err(Error::Io(IoError::UnmapFailed)));
        assert_eq!(dma.send_state(), TransferState::Idle);
    }

    #[test]
    fn reset_channel_marks_active_transfer_failed() {
        let mut dma = init();
        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };

        dma.reset_channel(Direction::Send).unwrap();
        assert_eq!(dma.send_state(), TransferState::Failed);
        assert_eq!(dma.check_send(), Err(Error::Io(IoError::InvalidState)));
        dma.free_send().unwrap();
    }

    // =========================================================================
    // Descriptor Memory Tests
    // =========================================================================

    #[test]
    fn clear_descriptor_memory_refused_while_active() {
        let mut dma = init();
        let data = [0u8; 64];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 0).unwrap() };

        assert_eq!(
            dma.clear_descriptor_memory(),
            Err(Error::Dma(DmaError::TransferPending))
        );
        dma.free_send().unwrap();
        assert_eq!(dma.clear_descriptor_memory(), Ok(()));
        assert!(dma.descriptor_memory().all(|w| w == 0));
    }

    #[test]
    fn descriptor_memory_shows_built_ring() {
        let mut platform = MockPlatform::new();
        platform.push_segments(&SCENARIO);
        let mut dma = init_with(platform, DmaConfig::new());
        let data = [0u8; 4219];
        unsafe { dma.setup_send(data.as_ptr(), data.len(), 2).unwrap() };

        let words: Vec<u32> = dma.descriptor_memory().collect();
        assert_eq!(words.len(), 0x1000 / 4);
        // Entry 0: next pointer, then buffer address.
        assert_eq!(words[0], 0x8000_2040);
        assert_eq!(words[2], 0x1000);
        dma.dump_descriptor_memory();
    }
}
