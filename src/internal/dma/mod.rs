//! Scatter-gather DMA engine internals
//!
//! The pieces the transfer orchestrator is built from:
//! - [`translate`]: translation window computation and aperture programming
//! - [`descriptor`]: scatter-gather descriptor image and bit fields
//! - [`ring`]: descriptor ring construction and traversal
//! - [`channel`]: per-direction channel control (reset, start, tail, stop)
//! - [`monitor`]: completion detection and engine fault recovery

pub mod channel;
pub mod descriptor;
pub mod monitor;
pub mod ring;
pub mod translate;

pub use channel::ChannelController;
pub use descriptor::SgDescriptor;
pub use ring::DescriptorRing;
pub use translate::TranslatedMapping;
