//! Core driver components for the AXI SG DMA engine.
//!
//! - [`config`] - BAR layout, configuration and builder methods
//! - [`controller`] - The [`SgDma`] transfer orchestrator
//! - [`error`] - Error types and result aliases
//! - [`interrupt`] - Decoded interrupt status
//!
//! # Example
//!
//! ```ignore
//! use axi_sg_dma::driver::{BarLayout, DmaConfig};
//!
//! let config = DmaConfig::new()
//!     .with_layout(BarLayout::new().with_bar(0, 0x4000))
//!     .with_irq_threshold(1);
//! config.validate()?;
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod interrupt;

pub use config::{BarLayout, Direction, DmaConfig, RingRegion, WaitMode};
pub use controller::{SgDma, TransferState};
pub use error::{
    ConfigError, ConfigResult, DmaError, DmaResult, EngineFault, Error, IoError, IoResult, Result,
};
pub use interrupt::InterruptStatus;
