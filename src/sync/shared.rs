//! Critical-section protected controller slot.

use embedded_hal::delay::DelayNs;

use super::primitives::CriticalSectionCell;
use crate::driver::controller::SgDma;
use crate::hal::DmaPlatform;

/// ISR-safe slot holding the one controller of an endpoint.
///
/// Starts empty so it can live in a `static`; the controller is installed
/// after [`SgDma::init`] succeeds. All access goes through
/// `critical_section::with()`.
///
/// Closures passed to [`SharedSgDma::with`] run with the critical section
/// held, so keep them short (state queries, `setup_*`, `start_*` in poll
/// mode, `free_*`). `check_*`, the one-shot transfers and interrupt waits
/// block for up to the idle timeout; [`SharedSgDma::take`] the controller
/// for those and install it again afterwards.
///
/// # Example
///
/// ```ignore
/// static DMA: SharedSgDma<MyPlatform, MyDelay> = SharedSgDma::new();
///
/// DMA.install(SgDma::init(platform, delay, config)?);
/// let idle = DMA.with(|dma| dma.receive_state() == TransferState::Idle);
///
/// if let Some(mut dma) = DMA.take() {
///     let received = dma.receive(&mut buffer, WaitMode::Interrupt);
///     DMA.install(dma);
/// }
/// ```
pub struct SharedSgDma<P: DmaPlatform, D: DelayNs> {
    inner: CriticalSectionCell<Option<SgDma<P, D>>>,
}

impl<P: DmaPlatform, D: DelayNs> SharedSgDma<P, D> {
    /// Create an empty slot (const, suitable for static initialization).
    pub const fn new() -> Self {
        Self {
            inner: CriticalSectionCell::new(None),
        }
    }

    /// Install a controller, returning the one it replaces.
    pub fn install(&self, dma: SgDma<P, D>) -> Option<SgDma<P, D>> {
        let previous = self.inner.replace(Some(dma));
        if previous.is_some() {
            warn!("replacing installed SG DMA controller");
        }
        previous
    }

    /// Remove the installed controller.
    pub fn take(&self) -> Option<SgDma<P, D>> {
        self.inner.replace(None)
    }

    /// Check whether a controller is installed
    pub fn is_installed(&self) -> bool {
        self.inner.with(|slot| slot.is_some())
    }

    /// Execute a closure with exclusive access to the controller.
    ///
    /// Returns `None` if no controller is installed. The critical section is
    /// held for the whole closure.
    #[inline]
    pub fn with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut SgDma<P, D>) -> R,
    {
        self.inner.with(|slot| slot.as_mut().map(f))
    }

    /// Try to execute a closure, returning `None` if the slot is already
    /// borrowed or empty.
    #[inline]
    pub fn try_with<R, F>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut SgDma<P, D>) -> R,
    {
        self.inner.try_with(|slot| slot.as_mut().map(f)).flatten()
    }
}

impl<P: DmaPlatform, D: DelayNs> Default for SharedSgDma<P, D> {
    fn default() -> Self {
        Self::new()
    }
}
