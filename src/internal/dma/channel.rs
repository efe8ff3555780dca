//! Per-direction channel control.
//!
//! Drives one channel's DMACR/DMASR/CURDESC/TAILDESC registers through the
//! reset, arm, start, tail-write and stop steps. Every wait on a hardware
//! bit is a bounded poll that reports [`IoError::Timeout`].

use embedded_hal::delay::DelayNs;

use crate::driver::config::{BarLayout, Direction, DmaConfig};
use crate::driver::error::{EngineFault, IoError, IoResult, Result};
use crate::hal::RegisterWindow;
use crate::internal::register::dma::{
    ChannelRegs, DMACR_ERR_IRQ_EN, DMACR_IOC_IRQ_EN, DMACR_IRQ_THRESHOLD_MASK,
    DMACR_IRQ_THRESHOLD_SHIFT, DMASR_ALL_IRQ,
};

/// Poll `done` every `interval_us` until it returns true, at most
/// `iterations` times.
pub fn poll_until<W, D, F>(
    window: &W,
    delay: &mut D,
    iterations: u32,
    interval_us: u32,
    mut done: F,
) -> IoResult<()>
where
    W: RegisterWindow,
    D: DelayNs,
    F: FnMut(&W) -> bool,
{
    for _ in 0..iterations {
        if done(window) {
            return Ok(());
        }
        delay.delay_us(interval_us);
    }
    if done(window) {
        return Ok(());
    }
    Err(IoError::Timeout)
}

/// Controller for one DMA channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelController {
    direction: Direction,
    regs: ChannelRegs,
    /// Last value this controller wrote to DMACR
    control: u32,
    /// Last tail descriptor address written
    tail: Option<u32>,
}

impl ChannelController {
    /// Controller for `direction` in the given layout
    pub const fn new(layout: &BarLayout, direction: Direction) -> Self {
        Self {
            direction,
            regs: ChannelRegs::new(layout.channel_base(direction)),
            control: 0,
            tail: None,
        }
    }

    /// Direction driven by this channel
    #[inline(always)]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Channel register block
    #[inline(always)]
    pub const fn regs(&self) -> ChannelRegs {
        self.regs
    }

    /// Mirror of the last DMACR value written
    #[inline(always)]
    pub const fn control_mirror(&self) -> u32 {
        self.control
    }

    /// Last tail descriptor address written, if any since the last reset
    #[inline(always)]
    pub const fn tail(&self) -> Option<u32> {
        self.tail
    }

    /// Raw DMASR value
    #[inline(always)]
    pub fn status<W: RegisterWindow>(&self, window: &W) -> u32 {
        self.regs.status(window)
    }

    /// Engine fault currently flagged in DMASR
    #[inline(always)]
    pub fn fault<W: RegisterWindow>(&self, window: &W) -> Option<EngineFault> {
        EngineFault::from_status(self.regs.status(window))
    }

    /// Check the idle bit
    #[inline(always)]
    pub fn is_idle<W: RegisterWindow>(&self, window: &W) -> bool {
        self.regs.is_idle(window)
    }

    /// Check the halted bit
    #[inline(always)]
    pub fn is_halted<W: RegisterWindow>(&self, window: &W) -> bool {
        self.regs.is_halted(window)
    }

    /// Soft-reset the channel and wait for the reset bit to self-clear.
    ///
    /// A reset clears every control bit, the error flags and the IRQ bits
    /// and leaves the channel halted.
    pub fn reset<W: RegisterWindow, D: DelayNs>(
        &mut self,
        window: &mut W,
        delay: &mut D,
        config: &DmaConfig,
    ) -> Result<()> {
        debug!("{} reset", self.direction.channel_name());
        self.regs.request_reset(window);

        let regs = self.regs;
        let result = poll_until(
            window,
            delay,
            config.poll_iterations(config.reset_timeout_us),
            config.poll_interval_us,
            |w| !regs.is_reset_in_progress(w),
        );
        if result.is_err() {
            error!(
                "{} reset timed out, control {:#010x}",
                self.direction.channel_name(),
                self.regs.control(window)
            );
        }
        result?;

        self.control = self.regs.control(window);
        self.tail = None;
        Ok(())
    }

    /// Point the channel at its first descriptor and start it.
    ///
    /// The channel is expected to be halted; if it is not, a warning is
    /// logged and the sequence proceeds. RS is cleared, CURDESC written,
    /// RS set, then the halted bit must deassert. With `interrupts` the
    /// IOC and error interrupts are enabled with the configured threshold.
    pub fn arm_and_start<W: RegisterWindow, D: DelayNs>(
        &mut self,
        window: &mut W,
        delay: &mut D,
        config: &DmaConfig,
        current_desc: u32,
        interrupts: bool,
    ) -> Result<()> {
        let name = self.direction.channel_name();
        if !self.regs.is_halted(window) {
            warn!(
                "{} not halted before start, status {:#010x}",
                name,
                self.regs.status(window)
            );
        }

        self.regs.stop(window);
        self.regs.set_current_desc(window, current_desc);
        self.regs.set_current_desc_msb(window, 0);
        self.regs.run(window);

        let regs = self.regs;
        let result = poll_until(
            window,
            delay,
            config.poll_iterations(config.start_timeout_us),
            config.poll_interval_us,
            |w| !regs.is_halted(w),
        );
        if result.is_err() {
            error!(
                "{} did not leave halted, status {:#010x}",
                name,
                self.regs.status(window)
            );
        }
        result?;

        if interrupts {
            let threshold = u32::from(config.irq_threshold) << DMACR_IRQ_THRESHOLD_SHIFT;
            let control = self.regs.control(window);
            self.regs.set_control(
                window,
                (control & !DMACR_IRQ_THRESHOLD_MASK)
                    | (threshold & DMACR_IRQ_THRESHOLD_MASK)
                    | DMACR_IOC_IRQ_EN
                    | DMACR_ERR_IRQ_EN,
            );
        }
        self.control = self.regs.control(window);

        debug!(
            "{} started at {:#010x}, control {:#010x}",
            name,
            current_desc,
            self.control
        );
        Ok(())
    }

    /// Write the tail descriptor address, which lets the engine run
    pub fn write_tail<W: RegisterWindow>(&mut self, window: &mut W, tail: u32) {
        debug!("{} tail {:#010x}", self.direction.channel_name(), tail);
        self.regs.set_tail_desc(window, tail);
        self.tail = Some(tail);
    }

    /// Clear RS
    pub fn stop<W: RegisterWindow>(&mut self, window: &mut W) {
        self.regs.stop(window);
        self.control = self.regs.control(window);
    }

    /// Write-1-to-clear the IRQ bits set in `status`
    pub fn acknowledge_irqs<W: RegisterWindow>(&self, window: &mut W, status: u32) {
        if status & DMASR_ALL_IRQ != 0 {
            self.regs.clear_irqs(window, status);
        }
    }
}
