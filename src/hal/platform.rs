//! Platform collaborator interface
//!
//! The controller never talks to the operating system directly. BAR mapping,
//! user-buffer pinning with per-segment bus addresses, cache synchronization
//! and interrupt waits are all provided by a [`DmaPlatform`] implementation
//! (a kernel helper module, VFIO, or a test mock).

use crate::driver::error::Result;
use crate::hal::window::RegisterWindow;

/// One physically contiguous piece of a pinned user buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Bus address of the first byte, as seen by the PCIe root complex
    pub bus_address: u32,
    /// Length in bytes
    pub size: u32,
}

impl Segment {
    /// Create a segment
    pub const fn new(bus_address: u32, size: u32) -> Self {
        Self { bus_address, size }
    }
}

/// Direction of a cache synchronization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SyncDirection {
    /// CPU writes must become visible to the device
    ToDevice,
    /// Device writes must become visible to the CPU
    FromDevice,
}

/// A pinned and bus-mapped user buffer
pub trait UserMapping {
    /// Segments in buffer order
    fn segments(&self) -> &[Segment];

    /// Total mapped length in bytes
    fn total_len(&self) -> usize {
        self.segments().iter().map(|s| s.size as usize).sum()
    }
}

/// Host services required by the controller.
///
/// Every method reports failure through [`crate::Error`]; implementations
/// should use the `IoError` variant that names the failing service.
pub trait DmaPlatform {
    /// Register window produced by [`DmaPlatform::map_bar`]
    type Window: RegisterWindow;
    /// Handle produced by [`DmaPlatform::map_user_memory`]
    type Mapping: UserMapping;

    /// Map BAR `index` of the endpoint
    fn map_bar(&mut self, index: u32) -> Result<Self::Window>;

    /// Release a BAR mapping obtained from [`DmaPlatform::map_bar`]
    fn unmap_bar(&mut self, index: u32, window: Self::Window) -> Result<()>;

    /// Pin `len` bytes at `ptr` and map them for device access.
    ///
    /// # Safety
    ///
    /// The buffer must stay valid, and must not be moved or freed, until the
    /// mapping is released with [`DmaPlatform::unmap_user_memory`].
    unsafe fn map_user_memory(
        &mut self,
        ptr: *const u8,
        len: usize,
        direction: SyncDirection,
    ) -> Result<Self::Mapping>;

    /// Make the buffer contents coherent for the given direction
    fn sync_user_memory(&mut self, mapping: &Self::Mapping, direction: SyncDirection)
    -> Result<()>;

    /// Unpin and unmap a user buffer
    fn unmap_user_memory(&mut self, mapping: Self::Mapping) -> Result<()>;

    /// Block until the device raises interrupt `line`
    fn wait_for_interrupt(&mut self, line: u32) -> Result<()>;
}
