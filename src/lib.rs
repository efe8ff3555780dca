//! AXI SG DMA Controller
//!
//! A `no_std`, `no_alloc` userspace controller for a Xilinx AXI DMA engine in
//! scatter-gather mode, reached through the BAR of a PCIe endpoint.
//!
//! The FPGA behind the endpoint exposes four blocks in one BAR:
//!
//! - the AXI-PCIe bridge, whose single address translation register (the
//!   *aperture*) decides which 1 GiB window of host bus space the engine can
//!   reach;
//! - the AXI DMA register file with an MM2S (memory to stream) and an S2MM
//!   (stream to memory) channel;
//! - a block RAM holding the scatter-gather descriptor rings;
//! - the AXI side view of the BAR itself, used for descriptor pointers.
//!
//! # Architecture
//!
//! 1. **Driver Layer** ([`driver`]): [`SgDma`] runs each transfer through
//!    setup, start, check and free
//! 2. **Internal Layer**: aperture translation, descriptor ring building,
//!    channel control and completion monitoring
//! 3. **HAL Layer** ([`hal`]): [`RegisterWindow`] and [`DmaPlatform`] seams to
//!    the host kernel interface (BAR mapping, page pinning, cache sync,
//!    interrupt waits)
//!
//! # Features
//!
//! - `log` (default): Diagnostics through the `log` facade
//! - `defmt`: Diagnostics through `defmt` and `defmt::Format` on public types
//! - `critical-section`: Enable the ISR-safe [`SharedSgDma`] wrapper
//!
//! # Example
//!
//! ```ignore
//! use axi_sg_dma::{DmaConfig, SgDma, WaitMode};
//!
//! // Your platform binding (BAR mapping, pinning, interrupts)
//! let platform = /* your DmaPlatform implementation */;
//! let delay = /* your DelayNs implementation */;
//!
//! let mut dma = SgDma::init(platform, delay, DmaConfig::new())?;
//!
//! // One-shot transfers release their mapping before returning
//! let sent = dma.send(&payload, 2, WaitMode::Poll)?;
//! let received = dma.receive(&mut buffer, WaitMode::Interrupt)?;
//!
//! // Or drive the lifecycle explicitly
//! unsafe { dma.setup_receive(buffer.as_mut_ptr(), buffer.len())? };
//! dma.start_receive(WaitMode::Poll)?;
//! let received = dma.check_receive()?;
//! dma.free_receive()?;
//!
//! let platform = dma.shutdown()?;
//! ```
//!
//! # Memory Requirements
//!
//! With the default layout the descriptor memory is 4 KiB, split evenly
//! between the two rings: 32 descriptors of 64 bytes per direction. A
//! transfer needs one descriptor per mapped segment.

#![no_std]
#![warn(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in Cargo.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// Logging macros must be declared before the modules that use them
#[macro_use]
mod fmt;

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod hal;

// Internal implementation details (pub(crate) only)
mod internal;

#[cfg(feature = "critical-section")]
#[cfg_attr(docsrs, doc(cfg(feature = "critical-section")))]
pub mod sync;

// Test utilities (only available during testing)
#[cfg(test)]
#[allow(missing_docs)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{BarLayout, Direction, DmaConfig, RingRegion, WaitMode};
pub use driver::controller::{SgDma, TransferState};
pub use driver::error::{
    ConfigError, ConfigResult, DmaError, DmaResult, EngineFault, Error, IoError, IoResult, Result,
};
pub use driver::interrupt::InterruptStatus;
pub use hal::{DmaPlatform, MmioWindow, RegisterWindow, Segment, SyncDirection, UserMapping};

#[cfg(feature = "critical-section")]
pub use sync::SharedSgDma;

/// Low-level register accessors for advanced use.
///
/// These are intentionally separated from the primary facade. Most users should
/// prefer [`SgDma`] instead of touching registers directly.
///
/// # Safety
///
/// Direct register access bypasses driver invariants. Writing the aperture
/// or a channel's control register while a transfer is configured corrupts
/// that transfer.
pub mod unsafe_registers {
    pub use crate::internal::register::{bridge, dma};

    pub use crate::internal::register::bridge::BridgeRegs;
    pub use crate::internal::register::dma::ChannelRegs;
}

/// Shared driver constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on driver types.
pub mod constants {
    pub use crate::internal::constants::{
        // BAR layout
        DEFAULT_BAR_AXI_BASE,
        DEFAULT_BAR_INDEX,
        DEFAULT_BAR_SIZE,
        DEFAULT_BRIDGE_BASE,
        DEFAULT_DESC_MEM_BASE,
        DEFAULT_DESC_MEM_SIZE,
        DEFAULT_DMA_BASE,
        // Translation and descriptors
        DEFAULT_APERTURE_MASK,
        DEFAULT_CACHE_ATTR,
        DESCRIPTOR_STRIDE,
        MAX_SEGMENT_LEN,
        MAX_STREAM_DEST,
        // Interrupts
        DEFAULT_INTERRUPT_LINE,
        DEFAULT_IRQ_THRESHOLD,
        // Timing
        DEFAULT_IDLE_TIMEOUT_US,
        DEFAULT_POLL_INTERVAL_US,
        DEFAULT_RESET_TIMEOUT_US,
        DEFAULT_START_TIMEOUT_US,
    };
}

// =============================================================================
// Macro Helpers
// =============================================================================

/// Declare a static, ISR-safe controller slot.
///
/// # Examples
///
/// ```ignore
/// axi_sg_dma::sg_dma_static!(DMA, MyPlatform, MyDelay);
///
/// DMA.install(SgDma::init(platform, delay, DmaConfig::new())?);
/// let state = DMA.with(|dma| dma.receive_state());
/// ```
#[cfg(feature = "critical-section")]
#[macro_export]
macro_rules! sg_dma_static {
    ($name:ident, $platform:ty, $delay:ty) => {
        static $name: $crate::sync::SharedSgDma<$platform, $delay> =
            $crate::sync::SharedSgDma::new();
    };
}
