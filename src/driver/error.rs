//! Error types for the AXI SG DMA controller
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Bad configuration or caller input, detected before the
//!   hardware is touched
//! - [`DmaError`]: Address translation, descriptor and engine failures
//! - [`IoError`]: Timeouts, lifecycle misuse and platform collaborator failures
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most controller methods.

use crate::internal::register::dma::{
    DMASR_DMA_DEC_ERR, DMASR_DMA_INT_ERR, DMASR_DMA_SLV_ERR, DMASR_SG_DEC_ERR, DMASR_SG_INT_ERR,
    DMASR_SG_SLV_ERR,
};

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration and input validation errors
///
/// These errors are raised before any device register or descriptor word
/// is written. The caller has to fix its input and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Invalid configuration parameter
    InvalidConfig,
    /// BAR layout is inconsistent (overlapping blocks, misaligned, out of BAR)
    InvalidLayout,
    /// Buffer length is zero or does not fit the 32-bit bus
    InvalidBufferLength,
    /// Stream destination does not fit the TDEST field
    InvalidStreamDest,
    /// The buffer mapping has no segments
    EmptyMapping,
    /// A segment length reaches the 23-bit hardware length limit
    SegmentTooLarge,
    /// Ring base outside descriptor memory or not aligned to the descriptor stride
    InvalidRingBase,
    /// More segments than descriptors fit in the ring region
    RingCapacityExceeded,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidConfig => "invalid configuration",
            ConfigError::InvalidLayout => "invalid BAR layout",
            ConfigError::InvalidBufferLength => "invalid buffer length",
            ConfigError::InvalidStreamDest => "stream destination out of range",
            ConfigError::EmptyMapping => "buffer mapping has no segments",
            ConfigError::SegmentTooLarge => "segment exceeds 23-bit length field",
            ConfigError::InvalidRingBase => "invalid descriptor ring base",
            ConfigError::RingCapacityExceeded => "too many segments for descriptor ring",
        }
    }
}

// =============================================================================
// Engine Faults
// =============================================================================

/// Fault class reported by the engine in a channel status register
///
/// The data-mover faults and their scatter-gather equivalents are distinct
/// bits in DMASR. When several are set at once the first one in declaration
/// order is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineFault {
    /// Internal error in the data mover (e.g. zero-length descriptor)
    DmaInternal,
    /// Slave error response on a data transfer
    DmaSlave,
    /// Decode error on a data transfer (address not mapped)
    DmaDecode,
    /// Internal error in the scatter-gather engine (e.g. completed descriptor fetched)
    SgInternal,
    /// Slave error while fetching or updating a descriptor
    SgSlave,
    /// Decode error while fetching or updating a descriptor
    SgDecode,
}

impl EngineFault {
    /// All fault classes in reporting priority order
    pub const ALL: [EngineFault; 6] = [
        EngineFault::DmaInternal,
        EngineFault::DmaSlave,
        EngineFault::DmaDecode,
        EngineFault::SgInternal,
        EngineFault::SgSlave,
        EngineFault::SgDecode,
    ];

    /// DMASR bit that signals this fault
    #[must_use]
    pub const fn status_bit(&self) -> u32 {
        match self {
            EngineFault::DmaInternal => DMASR_DMA_INT_ERR,
            EngineFault::DmaSlave => DMASR_DMA_SLV_ERR,
            EngineFault::DmaDecode => DMASR_DMA_DEC_ERR,
            EngineFault::SgInternal => DMASR_SG_INT_ERR,
            EngineFault::SgSlave => DMASR_SG_SLV_ERR,
            EngineFault::SgDecode => DMASR_SG_DEC_ERR,
        }
    }

    /// Decode the highest-priority fault from a raw DMASR value
    #[must_use]
    pub fn from_status(status: u32) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|fault| status & fault.status_bit() != 0)
    }

    /// Returns a human-readable description of the fault
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EngineFault::DmaInternal => "DMA internal error",
            EngineFault::DmaSlave => "DMA slave error",
            EngineFault::DmaDecode => "DMA decode error",
            EngineFault::SgInternal => "scatter-gather internal error",
            EngineFault::SgSlave => "scatter-gather slave error",
            EngineFault::SgDecode => "scatter-gather decode error",
        }
    }
}

impl core::fmt::Display for EngineFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Address translation, descriptor and engine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Segments do not share one aperture window; split the transfer
    UnreachableSegment,
    /// Aperture register did not read back the value just written
    ApertureWriteFailed,
    /// Reprogramming the aperture would move the window under the other
    /// direction's unreleased transfer
    ApertureInUse,
    /// A descriptor in the chain was not marked complete
    IncompleteDescriptor,
    /// Byte count reported by the engine differs from the requested length
    LengthMismatch,
    /// The engine reported a fault; the channel has been reset
    Engine(EngineFault),
    /// A transfer is already configured on this direction
    TransferPending,
    /// No transfer is configured on this direction
    NoTransfer,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DmaError::Engine(fault) => write!(f, "engine fault: {}", fault.as_str()),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::UnreachableSegment => "segments not reachable through one aperture",
            DmaError::ApertureWriteFailed => "aperture register write did not take",
            DmaError::ApertureInUse => "aperture in use by other direction",
            DmaError::IncompleteDescriptor => "descriptor not completed",
            DmaError::LengthMismatch => "transferred length mismatch",
            DmaError::Engine(fault) => fault.as_str(),
            DmaError::TransferPending => "transfer already configured",
            DmaError::NoTransfer => "no transfer configured",
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Runtime and collaborator errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// A hardware poll did not observe the expected bit in time
    Timeout,
    /// Operation not valid in the current transfer state
    InvalidState,
    /// BAR could not be mapped
    BarMapFailed,
    /// BAR could not be unmapped
    BarUnmapFailed,
    /// User buffer could not be pinned and mapped
    MapFailed,
    /// User buffer mapping could not be released
    UnmapFailed,
    /// Cache synchronization of a mapping failed
    SyncFailed,
    /// Waiting for the device interrupt failed
    InterruptFailed,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::Timeout => "operation timed out",
            IoError::InvalidState => "invalid state for operation",
            IoError::BarMapFailed => "BAR mapping failed",
            IoError::BarUnmapFailed => "BAR unmapping failed",
            IoError::MapFailed => "user memory mapping failed",
            IoError::UnmapFailed => "user memory unmapping failed",
            IoError::SyncFailed => "user memory sync failed",
            IoError::InterruptFailed => "interrupt wait failed",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match dma.check_send() {
///     Err(Error::Dma(DmaError::Engine(fault))) => { /* channel was reset */ }
///     Err(Error::Dma(DmaError::UnreachableSegment)) => { /* split buffer */ }
///     Err(Error::Io(IoError::Timeout)) => { /* device not responding */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// I/O error
    Io(IoError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {e}"),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

impl From<EngineFault> for Error {
    fn from(fault: EngineFault) -> Self {
        Error::Dma(DmaError::Engine(fault))
    }
}

/// Result type alias for controller operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for DMA operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;

// =============================================================================
// Unit Tests
// =============================================================================
