/// Loader collaborator.
///
/// Decoding image files is not this crate's job. The registry asks a
/// `TextureLoader` for the pixels of one primitive texture and receives a
/// validated `PixelBuffer` or a failure.

use std::sync::{PoisonError, RwLock};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::resource::pixel_buffer::PixelBuffer;
use crate::resource::texture::TextureKey;

/// Source of decoded pixels
///
/// Called from registry worker threads without any registry lock held, and
/// only for primitive roles. Implementations are free to ignore the role.
pub trait TextureLoader: Send + Sync {
    fn load(&self, key: &TextureKey) -> Result<PixelBuffer>;
}

impl<F> TextureLoader for F
where
    F: Fn(&TextureKey) -> Result<PixelBuffer> + Send + Sync,
{
    fn load(&self, key: &TextureKey) -> Result<PixelBuffer> {
        self(key)
    }
}

/// Loader serving pre-decoded buffers from memory
///
/// Useful for procedurally generated textures and for tests.
#[derive(Default)]
pub struct MemoryLoader {
    images: RwLock<FxHashMap<TextureKey, PixelBuffer>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register pixels for a key, returning the previous entry if any
    pub fn insert(&self, key: TextureKey, pixels: PixelBuffer) -> Option<PixelBuffer> {
        self.images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, pixels)
    }

    pub fn remove(&self, key: &TextureKey) -> Option<PixelBuffer> {
        self.images
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn len(&self) -> usize {
        self.images.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TextureLoader for MemoryLoader {
    fn load(&self, key: &TextureKey) -> Result<PixelBuffer> {
        self.images
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| Error::LoadFailure {
                name: key.name.clone(),
                message: format!("no {} image registered", key.role),
            })
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
