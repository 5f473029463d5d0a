/// Device collaborator trait and the identifiers it hands out.

use std::fmt;
use std::num::NonZeroU64;
use crate::error::Result;
use crate::graphics_device::PixelFormat;

/// Opaque id of a GPU texture resource, assigned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GpuResourceId(NonZeroU64);

impl GpuResourceId {
    /// Wrap a raw device id; zero is not a valid id
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for GpuResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpu#{}", self.0)
    }
}

/// Shader-visible handle of a resident texture
///
/// Wraps a bindless descriptor array slot. The handle value is the slot plus
/// one so that it is never zero; shading code indexes with `shader_index()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindlessHandle(NonZeroU64);

impl BindlessHandle {
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Handle for descriptor array slot `index`
    pub fn from_descriptor_index(index: u32) -> Self {
        Self(NonZeroU64::MIN.saturating_add(u64::from(index)))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Index into the bindless descriptor array
    pub fn shader_index(self) -> u32 {
        // Handles built from u32 slots always fit
        u32::try_from(self.0.get() - 1).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for BindlessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bindless#{}", self.shader_index())
    }
}

/// What a successful upload yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAllocation {
    pub gpu_id: GpuResourceId,
    pub handle: BindlessHandle,
}

/// Upload request handed to the device
#[derive(Debug, Clone, Copy)]
pub struct UploadDesc<'a> {
    /// Debug label ("brick [Albedo]")
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// Tightly packed texels, `width * height * format.bytes_per_pixel()` bytes
    pub data: &'a [u8],
}

impl UploadDesc<'_> {
    /// Byte count `data` must have for the declared size and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// GPU device collaborator
///
/// Implementations synchronize internally: the registry calls them from
/// several worker threads at once, for different textures.
pub trait TextureDevice: Send + Sync {
    /// Allocate device memory for a 2D sampled texture, upload `desc.data`
    /// and register the texture in the bindless table
    ///
    /// Out of memory, an unsupported format or a full bindless table must be
    /// reported as `Error::AllocationFailure` with nothing left allocated.
    fn allocate_and_upload(&self, desc: &UploadDesc<'_>) -> Result<DeviceAllocation>;

    /// Free everything `allocate_and_upload` created for `id`
    fn release(&self, id: GpuResourceId) -> Result<()>;

    /// Whether textures of `format` can be sampled on this device
    fn supports_format(&self, _format: PixelFormat) -> bool {
        true
    }
}
