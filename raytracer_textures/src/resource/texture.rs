/// Texture records.
///
/// A texture exists in two distinct shapes:
///
/// - **StagedTexture**: CPU pixels plus identity, produced by the loader or
///   the packer. Has no GPU fields at all.
/// - **Texture**: the resident record handed out by the registry. Its GPU id
///   and bindless handle are non-zero by construction.
///
/// The upload pipeline is the only way from the first to the second.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use glam::UVec2;
use crate::error::{Error, Result};
use crate::graphics_device::{BindlessHandle, DeviceAllocation, GpuResourceId, PixelFormat};
use crate::resource::packer::{self, PackSource};
use crate::resource::pixel_buffer::{PixelBuffer, SampleType};
use crate::resource::role::{PrimitiveRole, TextureRole};

// ===== IDENTITY =====

/// Identity of a texture: logical name plus role
///
/// The same image name may back several roles ("brick" albedo and "brick"
/// roughness are different textures).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureKey {
    pub name: String,
    pub role: TextureRole,
}

impl TextureKey {
    pub fn new(name: impl Into<String>, role: impl Into<TextureRole>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> TextureRole {
        self.role
    }
}

impl fmt::Display for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.role)
    }
}

// ===== STAGED =====

/// Texture whose pixels are ready on the CPU but not yet on the GPU
#[derive(Debug, Clone)]
pub struct StagedTexture {
    key: TextureKey,
    pixels: PixelBuffer,
}

impl StagedTexture {
    /// Stage pixels produced by the loader for a primitive role
    pub fn loaded(key: TextureKey, pixels: PixelBuffer) -> Result<Self> {
        if key.role.is_composite() {
            return Err(Error::InvalidResource(format!(
                "{} holds packed data and cannot be staged from a single image",
                key
            )));
        }
        Ok(Self { key, pixels })
    }

    /// Pack constituent images into a staged composite texture
    pub fn packed(key: TextureKey, sources: &[PackSource<'_>]) -> Result<Self> {
        let Some(kind) = key.role.as_composite() else {
            return Err(Error::InvalidResource(format!(
                "{} is not a packed role",
                key
            )));
        };
        let pixels = packer::pack(kind, sources)?;
        Ok(Self { key, pixels })
    }

    pub fn key(&self) -> &TextureKey {
        &self.key
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn into_parts(self) -> (TextureKey, PixelBuffer) {
        (self.key, self.pixels)
    }
}

// ===== RESIDENT =====

/// Texture resident on the GPU and addressable through its bindless handle
///
/// Shared as `Arc<Texture>`. After the registry releases it, `gpu_id` and
/// `bindless_handle` return `None`; clones held elsewhere observe that.
pub struct Texture {
    key: TextureKey,
    size: UVec2,
    channels: u32,
    sample_type: SampleType,
    format: PixelFormat,
    pixels: Mutex<Option<Arc<PixelBuffer>>>,
    gpu_id: GpuResourceId,
    handle: BindlessHandle,
    released: AtomicBool,
}

impl Texture {
    pub(crate) fn resident(
        staged: StagedTexture,
        format: PixelFormat,
        allocation: DeviceAllocation,
    ) -> Self {
        let (key, pixels) = staged.into_parts();
        Self {
            key,
            size: pixels.size(),
            channels: pixels.channels(),
            sample_type: pixels.sample_type(),
            format,
            pixels: Mutex::new(Some(Arc::new(pixels))),
            gpu_id: allocation.gpu_id,
            handle: allocation.handle,
            released: AtomicBool::new(false),
        }
    }

    pub fn key(&self) -> &TextureKey {
        &self.key
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn role(&self) -> TextureRole {
        self.key.role
    }

    /// Primitive role, or `None` for packed textures
    pub fn primitive_role(&self) -> Option<PrimitiveRole> {
        self.key.role.as_primitive()
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.x
    }

    pub fn height(&self) -> u32 {
        self.size.y
    }

    /// Channel count as loaded (before any RGB to RGBA expansion)
    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    /// GPU format the pixels were uploaded with
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Device resource id, `None` once released
    pub fn gpu_id(&self) -> Option<GpuResourceId> {
        (!self.is_released()).then_some(self.gpu_id)
    }

    /// Shader-visible handle, `None` once released
    pub fn bindless_handle(&self) -> Option<BindlessHandle> {
        (!self.is_released()).then_some(self.handle)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// CPU pixels, if still held
    pub fn pixels(&self) -> Option<Arc<PixelBuffer>> {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_pixels(&self) -> bool {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Drop the CPU copy of the pixels; the GPU copy is unaffected
    ///
    /// Returns false if the pixels were already released.
    pub fn release_pixels(&self) -> bool {
        self.pixels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    /// Id the device knows this texture by, regardless of release state
    pub(crate) fn device_id(&self) -> GpuResourceId {
        self.gpu_id
    }

    /// Invalidate the handle and drop the CPU pixels
    pub(crate) fn mark_released(&self) {
        self.released.store(true, Ordering::Release);
        self.release_pixels();
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("key", &self.key)
            .field("size", &self.size)
            .field("channels", &self.channels)
            .field("format", &self.format)
            .field("gpu_id", &self.gpu_id())
            .field("handle", &self.bindless_handle())
            .field("has_pixels", &self.has_pixels())
            .finish()
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
