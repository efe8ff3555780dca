//! Completion and error monitoring.
//!
//! After a transfer has been started the channel is checked for engine
//! faults, then polled until idle, then its ring is walked up to the tail to
//! collect the transferred byte count.

use embedded_hal::delay::DelayNs;

use crate::driver::config::{Direction, DmaConfig, RingRegion};
use crate::driver::error::{DmaError, EngineFault, Error, Result};
use crate::hal::RegisterWindow;
use crate::internal::dma::channel::{ChannelController, poll_until};
use crate::internal::dma::ring::{DescriptorRing, clear_region};

/// Reset a faulted channel and wipe its ring region.
///
/// Returns the error to report: the engine fault, or the reset failure if
/// the channel could not be reset.
pub fn recover<W: RegisterWindow, D: DelayNs>(
    window: &mut W,
    delay: &mut D,
    config: &DmaConfig,
    channel: &mut ChannelController,
    region: RingRegion,
    fault: EngineFault,
) -> Error {
    error!(
        "{} engine fault: {}, status {:#010x}",
        channel.direction().channel_name(),
        fault.as_str(),
        channel.status(window)
    );
    if let Err(e) = channel.reset(window, delay, config) {
        return e;
    }
    clear_region(window, region);
    DmaError::Engine(fault).into()
}

/// Check a started transfer and return the number of bytes moved.
///
/// 1. A fault already flagged resets the channel and fails.
/// 2. Otherwise wait for idle, watching for faults while waiting.
/// 3. Walk the ring up to the tail; every entry must be complete. Byte
///    counts are summed and status words cleared.
/// 4. Stop the channel.
pub fn check_transfer<W: RegisterWindow, D: DelayNs>(
    window: &mut W,
    delay: &mut D,
    config: &DmaConfig,
    channel: &mut ChannelController,
    ring: &DescriptorRing,
    region: RingRegion,
) -> Result<usize> {
    let direction = channel.direction();
    let name = direction.channel_name();

    if let Some(fault) = channel.fault(window) {
        return Err(recover(window, delay, config, channel, region, fault));
    }

    let mut observed = None;
    let watched = *channel;
    let waited = poll_until(
        window,
        delay,
        config.poll_iterations(config.idle_timeout_us),
        config.poll_interval_us,
        |w| match watched.fault(w) {
            Some(fault) => {
                observed = Some(fault);
                true
            }
            None => watched.is_idle(w),
        },
    );
    if waited.is_err() {
        error!(
            "{} did not go idle, status {:#010x}",
            name,
            channel.status(window)
        );
    }
    waited?;

    if let Some(fault) = observed {
        return Err(recover(window, delay, config, channel, region, fault));
    }

    let mut total = 0usize;
    for index in 0..=ring.tail_index() {
        let desc = ring.read_entry(window, index);
        if !desc.is_complete() {
            error!(
                "{} descriptor {} not completed, status {:#010x}",
                name,
                index,
                desc.status()
            );
            channel.stop(window);
            return Err(DmaError::IncompleteDescriptor.into());
        }

        if direction == Direction::Receive {
            debug!(
                "S2MM desc {}: {} bytes, sof {}, eof {}, tdest {}, tid {}",
                index,
                desc.transferred(),
                desc.rx_sof(),
                desc.rx_eof(),
                desc.rx_tdest(),
                desc.rx_tid()
            );
        } else {
            trace!("MM2S desc {}: {} bytes", index, desc.transferred());
        }

        total += desc.transferred() as usize;
        ring.clear_status(window, index);
    }

    channel.stop(window);
    debug!("{} transferred {} bytes", name, total);
    Ok(total)
}
