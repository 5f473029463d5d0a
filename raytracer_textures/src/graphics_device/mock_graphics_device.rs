/// Mock texture device for unit tests (no GPU required)
///
/// Hands out sequential GPU ids and recycles bindless slots through a
/// `SlotAllocator`, like the Vulkan backend does. Every upload and release is
/// recorded so tests can assert on call counts, and failures can be injected.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};
use crate::graphics_device::{
    BindlessHandle, DeviceAllocation, GpuResourceId, PixelFormat, TextureDevice, UploadDesc,
};
use crate::utils::SlotAllocator;

// ============================================================================
// Recorded calls
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct MockUpload {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
    pub gpu_id: GpuResourceId,
}

// ============================================================================
// Mock device
// ============================================================================

struct MockState {
    slots: SlotAllocator,
    next_id: u64,
    live: FxHashMap<GpuResourceId, u32>,
    uploads: Vec<MockUpload>,
    releases: Vec<GpuResourceId>,
    attempts: usize,
    fail_next: u32,
    unsupported: FxHashSet<PixelFormat>,
}

pub struct MockTextureDevice {
    state: Mutex<MockState>,
    upload_delay: Duration,
}

impl MockTextureDevice {
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Device with a bindless table of `capacity` slots
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            state: Mutex::new(MockState {
                slots: SlotAllocator::with_capacity(capacity),
                next_id: 1,
                live: FxHashMap::default(),
                uploads: Vec::new(),
                releases: Vec::new(),
                attempts: 0,
                fail_next: 0,
                unsupported: FxHashSet::default(),
            }),
            upload_delay: Duration::ZERO,
        }
    }

    /// Sleep inside every upload (widens race windows in concurrency tests)
    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` uploads fail with `AllocationFailure`
    pub fn fail_next_uploads(&self, count: u32) {
        self.lock().fail_next = count;
    }

    pub fn mark_unsupported(&self, format: PixelFormat) {
        self.lock().unsupported.insert(format);
    }

    /// Successful uploads
    pub fn upload_count(&self) -> usize {
        self.lock().uploads.len()
    }

    /// Upload calls, including failed ones
    pub fn attempt_count(&self) -> usize {
        self.lock().attempts
    }

    pub fn release_count(&self) -> usize {
        self.lock().releases.len()
    }

    pub fn uploads(&self) -> Vec<MockUpload> {
        self.lock().uploads.clone()
    }

    pub fn releases(&self) -> Vec<GpuResourceId> {
        self.lock().releases.clone()
    }

    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    pub fn is_live(&self, id: GpuResourceId) -> bool {
        self.lock().live.contains_key(&id)
    }
}

impl Default for MockTextureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureDevice for MockTextureDevice {
    fn allocate_and_upload(&self, desc: &UploadDesc<'_>) -> Result<DeviceAllocation> {
        if !self.upload_delay.is_zero() {
            thread::sleep(self.upload_delay);
        }

        let mut state = self.lock();
        state.attempts += 1;

        if desc.data.len() != desc.expected_len() {
            return Err(Error::InvalidResource(format!(
                "{}: {} bytes for {}x{} {:?}",
                desc.label,
                desc.data.len(),
                desc.width,
                desc.height,
                desc.format
            )));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(Error::AllocationFailure(format!("{}: simulated out of memory", desc.label)));
        }
        if state.unsupported.contains(&desc.format) {
            return Err(Error::AllocationFailure(format!("{:?} unsupported", desc.format)));
        }
        let Some(slot) = state.slots.alloc() else {
            return Err(Error::AllocationFailure("bindless table full".to_string()));
        };

        let raw = state.next_id;
        state.next_id += 1;
        let gpu_id = GpuResourceId::new(raw)
            .ok_or_else(|| Error::BackendError("mock id overflow".to_string()))?;

        state.live.insert(gpu_id, slot);
        state.uploads.push(MockUpload {
            label: desc.label.to_string(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            data: desc.data.to_vec(),
            gpu_id,
        });

        Ok(DeviceAllocation {
            gpu_id,
            handle: BindlessHandle::from_descriptor_index(slot),
        })
    }

    fn release(&self, id: GpuResourceId) -> Result<()> {
        let mut state = self.lock();
        let Some(slot) = state.live.remove(&id) else {
            return Err(Error::InvalidResource(format!("{} is not live", id)));
        };
        state.slots.free(slot);
        state.releases.push(id);
        Ok(())
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        !self.lock().unsupported.contains(&format)
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
