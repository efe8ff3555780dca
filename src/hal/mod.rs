//! Hardware Abstraction Layer
//!
//! This module defines the seams between the controller and the host
//! environment, so the same controller logic drives a real PCIe endpoint or
//! a host-side mock.
//!
//! # Modules
//!
//! - [`window`]: 32-bit register access into a mapped BAR
//! - [`platform`]: BAR mapping, user-buffer pinning, cache sync and interrupt waits
//!
//! # Delay Integration
//!
//! All bounded hardware polls use `embedded_hal::delay::DelayNs` directly.
//! Pass any delay implementation from your HAL or OS layer.

pub mod platform;
pub mod window;

// Re-export commonly used types
pub use platform::{DmaPlatform, Segment, SyncDirection, UserMapping};
pub use window::{MmioWindow, RegisterWindow};
