//! Shared access to the controller.
//!
//! The aperture register is device-wide, so one [`SgDma`](crate::SgDma)
//! instance must own the endpoint. [`SharedSgDma`] parks that instance in a
//! critical-section protected cell so that several tasks (or an interrupt
//! handler) can reach it without racing on the aperture.
//!
//! - [`CriticalSectionCell`] - ISR-safe interior mutability
//! - [`SharedSgDma`] - Critical-section protected controller slot
//!
//! # Example
//!
//! ```ignore
//! use axi_sg_dma::sync::SharedSgDma;
//!
//! static DMA: SharedSgDma<MyPlatform, MyDelay> = SharedSgDma::new();
//!
//! DMA.install(SgDma::init(platform, delay, DmaConfig::new())?);
//!
//! // Short steps run inside the critical section
//! let state = DMA.with(|dma| dma.send_state());
//!
//! // Blocking transfers take the controller out of the slot
//! if let Some(mut dma) = DMA.take() {
//!     let sent = dma.send(&payload, 0, WaitMode::Poll);
//!     DMA.install(dma);
//! }
//! ```

mod primitives;

pub use primitives::CriticalSectionCell;

mod shared;

pub use shared::SharedSgDma;
