/// CPU to GPU upload step.
///
/// Turns a `StagedTexture` into a resident `Texture`: picks the GPU format
/// from the role and sample type, widens RGB to RGBA, and hands the bytes to
/// the device collaborator. On failure nothing is returned and nothing stays
/// allocated.

use std::borrow::Cow;
use std::sync::Arc;
use crate::error::{Error, Result};
use crate::graphics_device::{PixelFormat, TextureDevice, UploadDesc};
use crate::resource::texture::{StagedTexture, Texture};
use crate::utils::{pending, Pending, Spawner};
use crate::{tex_debug, tex_warn};

const SOURCE: &str = "raytracer::UploadPipeline";

/// Upload front-end over a shared device
#[derive(Clone)]
pub struct UploadPipeline {
    device: Arc<dyn TextureDevice>,
    spawner: Spawner,
}

impl UploadPipeline {
    pub fn new(device: Arc<dyn TextureDevice>) -> Self {
        Self {
            device,
            spawner: Spawner::default(),
        }
    }

    /// Run `submit` jobs on `spawner` instead of one thread per upload
    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn device(&self) -> &Arc<dyn TextureDevice> {
        &self.device
    }

    /// Upload synchronously
    pub fn upload(&self, staged: StagedTexture) -> Result<Texture> {
        let key = staged.key().clone();
        let pixels = staged.pixels();

        let payload = if pixels.channels() == 3 {
            Cow::Owned(pixels.to_rgba())
        } else {
            Cow::Borrowed(pixels)
        };

        let format = PixelFormat::select(key.role, payload.channels(), payload.sample_type())
            .map_err(|e| e.logged(SOURCE))?;
        if !self.device.supports_format(format) {
            return Err(Error::AllocationFailure(format!(
                "{:?} is not supported by the device (needed for {})",
                format, key
            ))
            .logged(SOURCE));
        }

        let label = key.to_string();
        let desc = UploadDesc {
            label: &label,
            width: payload.width(),
            height: payload.height(),
            format,
            data: payload.as_bytes(),
        };

        let allocation = match self.device.allocate_and_upload(&desc) {
            Ok(allocation) => allocation,
            Err(e) => {
                tex_warn!(SOURCE, "Upload of {} failed: {}", key, e);
                return Err(e);
            }
        };

        tex_debug!(
            SOURCE,
            "Uploaded {} ({}x{} {:?}) as {} / {}",
            key,
            desc.width,
            desc.height,
            format,
            allocation.gpu_id,
            allocation.handle
        );

        drop(payload);
        Ok(Texture::resident(staged, format, allocation))
    }

    /// Upload as a job on the pipeline's spawner
    ///
    /// The returned handle can be waited on with `wait()` or `.await`ed.
    /// If the spawner drops the job, the handle resolves to an error.
    pub fn submit(&self, staged: StagedTexture) -> Pending<Arc<Texture>> {
        let (completer, waiter) = pending();
        let pipeline = self.clone();
        self.spawner.spawn(move || {
            let outcome = pipeline.upload(staged).map(Arc::new);
            completer.complete(outcome);
        });
        waiter
    }

    /// Free a resident texture and invalidate its handle
    ///
    /// The record is marked released even if the device reports an error, so
    /// its handle is never reused from the CPU side.
    pub fn release(&self, texture: &Texture) -> Result<()> {
        if texture.is_released() {
            return Err(Error::InvalidResource(format!(
                "{} was already released",
                texture.key()
            )));
        }
        let outcome = self.device.release(texture.device_id());
        texture.mark_released();
        outcome
    }
}

#[cfg(test)]
#[path = "upload_pipeline_tests.rs"]
mod tests;
