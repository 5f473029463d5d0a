/// Authoritative table of textures, keyed by `(name, role)`.
///
/// The registry drives each texture through its lifecycle:
///
/// ```text
/// Unrequested -> Loading  (primitive) -> Uploading -> Resident -> (released)
///             -> Packing  (composite) ->
/// ```
///
/// Concurrent requests for one identity are coalesced: the first caller
/// becomes the leader and runs load/pack and upload, later callers wait on
/// the leader's `Pending` and receive the same `Arc<Texture>` or the same
/// error. The table lock only guards state transitions and is never held
/// while loading, packing or uploading.
///
/// A composite only needs the pixels of its constituents. Those are loaded
/// through a separate pixel-only path, coalesced on the constituent's own
/// identity, and are never uploaded: packing RMAO costs one device
/// allocation. A constituent that is already resident and still holds its
/// pixels is reused without reloading.
///
/// A failed request leaves no entry behind, so the next request for that
/// identity starts over from Unrequested.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{TextureDevice, UploadPipeline};
use crate::resource::loader::TextureLoader;
use crate::resource::packer::PackSource;
use crate::resource::pixel_buffer::PixelBuffer;
use crate::resource::role::{CompositeKind, RoleMask, TextureRole};
use crate::resource::texture::{StagedTexture, Texture, TextureKey};
use crate::utils::{pending, Completer, Pending, Spawner};
use crate::{tex_debug, tex_info, tex_trace, tex_warn};

const SOURCE: &str = "raytracer::TextureRegistry";

// ===== CONFIG / REPORTING TYPES =====

/// Registry behavior switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Drop each texture's CPU pixels once it is resident
    pub release_pixels_after_upload: bool,
    /// Channel read from each constituent image when packing composites
    pub composite_source_channel: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            release_pixels_after_upload: false,
            composite_source_channel: 0,
        }
    }
}

/// Lifecycle state of one identity
///
/// Released identities report `Unrequested`: nothing is kept for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureState {
    Unrequested,
    Loading,
    Packing,
    Uploading,
    Resident,
}

/// Cumulative counters since the registry was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Loader invocations
    pub loads: u64,
    /// Composite packs
    pub packs: u64,
    /// Successful uploads
    pub uploads: u64,
    /// Textures released
    pub releases: u64,
    /// Top-level requests that ended in an error, once per leader
    ///
    /// A composite that fails because a constituent failed to load counts
    /// once; constituent loads are not requests of their own.
    pub failures: u64,
    /// Requests and constituent loads that joined an in-flight leader
    pub coalesced: u64,
}

// ===== TABLE =====

enum Slot {
    InFlight {
        stage: TextureState,
        pending: Pending<Arc<Texture>>,
    },
    Resident(Arc<Texture>),
}

type Table = Mutex<FxHashMap<TextureKey, Slot>>;

/// Constituent pixel loads in flight, keyed by the constituent's identity
type Sources = Mutex<FxHashMap<TextureKey, Pending<Arc<PixelBuffer>>>>;

fn lock_table<T>(table: &Mutex<T>) -> MutexGuard<'_, T> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of looking an identity up for a request
enum Claim {
    Resident(Arc<Texture>),
    Waiter(Pending<Arc<Texture>>),
    Leader(Leader, Pending<Arc<Texture>>),
}

/// Ownership of an in-flight entry
///
/// `finish` publishes the outcome. Dropping an unfinished leader (the build
/// panicked, or its thread never started) removes the entry and fails every
/// waiter, so nobody blocks forever and the next request retries.
struct Leader {
    table: Arc<Table>,
    key: TextureKey,
    completer: Option<Completer<Arc<Texture>>>,
}

impl Leader {
    fn finish(mut self, outcome: &Result<Arc<Texture>>) {
        {
            let mut table = lock_table(&self.table);
            match outcome {
                Ok(texture) => {
                    table.insert(self.key.clone(), Slot::Resident(Arc::clone(texture)));
                }
                Err(_) => {
                    table.remove(&self.key);
                }
            }
        }
        // Table first: a waiter that wakes up and re-queries must see the result
        if let Some(completer) = self.completer.take() {
            completer.complete(outcome.clone());
        }
    }
}

impl Drop for Leader {
    fn drop(&mut self) {
        if self.completer.is_some() {
            tex_warn!(SOURCE, "Request for {} abandoned", self.key);
            lock_table(&self.table).remove(&self.key);
        }
    }
}

/// Ownership of an in-flight constituent load
///
/// The entry is removed once the load ends either way: loaded pixels are
/// handed to the waiting packers and not cached.
struct SourceLoad {
    sources: Arc<Sources>,
    key: TextureKey,
    completer: Option<Completer<Arc<PixelBuffer>>>,
}

impl SourceLoad {
    fn finish(mut self, outcome: &Result<Arc<PixelBuffer>>) {
        lock_table(&self.sources).remove(&self.key);
        if let Some(completer) = self.completer.take() {
            completer.complete(outcome.clone());
        }
    }
}

impl Drop for SourceLoad {
    fn drop(&mut self) {
        if self.completer.is_some() {
            tex_warn!(SOURCE, "Load of {} abandoned", self.key);
            lock_table(&self.sources).remove(&self.key);
        }
    }
}

// ===== REGISTRY =====

/// Texture registry
///
/// Shared between worker threads by reference or `Arc`. Dropping the
/// registry releases every resident texture on the device.
pub struct TextureRegistry {
    loader: Arc<dyn TextureLoader>,
    pipeline: UploadPipeline,
    config: RegistryConfig,
    spawner: Spawner,
    table: Arc<Table>,
    sources: Arc<Sources>,
    stats: Mutex<RegistryStats>,
}

impl TextureRegistry {
    pub fn new(
        loader: Arc<dyn TextureLoader>,
        device: Arc<dyn TextureDevice>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            loader,
            pipeline: UploadPipeline::new(device),
            config,
            spawner: Spawner::default(),
            table: Arc::new(Mutex::new(FxHashMap::default())),
            sources: Arc::new(Mutex::new(FxHashMap::default())),
            stats: Mutex::new(RegistryStats::default()),
        }
    }

    /// Run `request_async` leaders on `spawner`
    ///
    /// The default starts one thread per leader; hosts with many concurrent
    /// requests should pass a bounded executor. The upload pipeline's
    /// `submit` uses the same spawner.
    pub fn with_spawner(mut self, spawner: Spawner) -> Self {
        self.pipeline = self.pipeline.clone().with_spawner(spawner.clone());
        self.spawner = spawner;
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ===== REQUESTS =====

    /// Return the resident texture, loading and uploading it first if needed
    ///
    /// Blocks until the texture is resident or the request failed.
    pub fn request(&self, name: &str, role: impl Into<TextureRole>) -> Result<Arc<Texture>> {
        match self.claim(TextureKey::new(name, role)) {
            Claim::Resident(texture) => Ok(texture),
            Claim::Waiter(pending) => pending.wait(),
            Claim::Leader(leader, _) => self.lead(leader),
        }
    }

    /// Like `request`, for a raw role mask
    ///
    /// Invalid masks fail with `Error::Classification` before anything is
    /// loaded.
    pub fn request_mask(&self, name: &str, mask: RoleMask) -> Result<Arc<Texture>> {
        let role = TextureRole::from_mask(mask).map_err(|e| e.logged(SOURCE))?;
        self.request(name, role)
    }

    /// Start a request without blocking
    ///
    /// A new leader runs as a job on the registry's spawner; requests that
    /// are resident or already in flight spawn nothing. The returned handle
    /// can be waited on or `.await`ed.
    pub fn request_async(
        self: &Arc<Self>,
        name: &str,
        role: impl Into<TextureRole>,
    ) -> Pending<Arc<Texture>> {
        match self.claim(TextureKey::new(name, role)) {
            Claim::Resident(texture) => Pending::ready(Ok(texture)),
            Claim::Waiter(pending) => pending,
            Claim::Leader(leader, pending) => {
                let registry = Arc::clone(self);
                self.spawner.spawn(move || {
                    let _ = registry.lead(leader);
                });
                pending
            }
        }
    }

    fn claim(&self, key: TextureKey) -> Claim {
        let mut table = lock_table(&self.table);

        let existing = match table.get(&key) {
            Some(Slot::Resident(texture)) => Some(Claim::Resident(Arc::clone(texture))),
            Some(Slot::InFlight { pending, .. }) => Some(Claim::Waiter(pending.clone())),
            None => None,
        };
        if let Some(claim) = existing {
            drop(table);
            if matches!(claim, Claim::Waiter(_)) {
                tex_trace!(SOURCE, "{} joins in-flight request", key);
                self.bump(|stats| stats.coalesced += 1);
            }
            return claim;
        }

        let (completer, waiter) = pending();
        let stage = if key.role.is_composite() {
            TextureState::Packing
        } else {
            TextureState::Loading
        };
        table.insert(
            key.clone(),
            Slot::InFlight {
                stage,
                pending: waiter.clone(),
            },
        );
        drop(table);

        let leader = Leader {
            table: Arc::clone(&self.table),
            key,
            completer: Some(completer),
        };
        Claim::Leader(leader, waiter)
    }

    fn lead(&self, leader: Leader) -> Result<Arc<Texture>> {
        let outcome = self.build(&leader.key);
        match &outcome {
            Ok(texture) => {
                if let Some(handle) = texture.bindless_handle() {
                    tex_info!(SOURCE, "{} resident as {}", leader.key, handle);
                }
            }
            Err(e) => {
                self.bump(|stats| stats.failures += 1);
                tex_warn!(SOURCE, "Request for {} failed: {}", leader.key, e);
            }
        }
        leader.finish(&outcome);
        outcome
    }

    fn build(&self, key: &TextureKey) -> Result<Arc<Texture>> {
        let staged = match key.role {
            TextureRole::Primitive(_) => StagedTexture::loaded(key.clone(), self.load(key)?)?,
            TextureRole::Composite(kind) => self.pack(key, kind)?,
        };

        self.set_stage(key, TextureState::Uploading);
        tex_debug!(SOURCE, "{} -> Uploading", key);
        let texture = self.pipeline.upload(staged)?;
        self.bump(|stats| stats.uploads += 1);

        if self.config.release_pixels_after_upload {
            texture.release_pixels();
        }
        Ok(Arc::new(texture))
    }

    fn load(&self, key: &TextureKey) -> Result<PixelBuffer> {
        tex_debug!(SOURCE, "{} -> Loading", key);
        self.bump(|stats| stats.loads += 1);
        self.loader.load(key).map_err(|e| match e {
            Error::LoadFailure { .. } => e,
            other => Error::LoadFailure {
                name: key.name.clone(),
                message: other.to_string(),
            },
        })
    }

    /// Pack a composite from the pixels of its constituents
    fn pack(&self, key: &TextureKey, kind: CompositeKind) -> Result<StagedTexture> {
        tex_debug!(SOURCE, "{} -> Packing", key);

        let mut images = Vec::with_capacity(kind.constituents().len());
        for &role in kind.constituents() {
            let pixels = self.load_pixels(&TextureKey::new(key.name.clone(), role))?;
            images.push((role, pixels));
        }

        let channel = self.config.composite_source_channel;
        let sources: Vec<PackSource<'_>> = images
            .iter()
            .map(|(role, pixels)| PackSource::new(*role, pixels).with_channel(channel))
            .collect();

        self.bump(|stats| stats.packs += 1);
        StagedTexture::packed(key.clone(), &sources)
    }

    /// Pixels of a constituent, without uploading it
    ///
    /// Reuses a resident or in-flight top-level request for the same
    /// identity when it yields pixels, and otherwise joins or leads a
    /// pixel-only load.
    fn load_pixels(&self, key: &TextureKey) -> Result<Arc<PixelBuffer>> {
        let in_flight = match lock_table(&self.table).get(key) {
            Some(Slot::Resident(texture)) => match texture.pixels() {
                Some(pixels) => return Ok(pixels),
                None => None,
            },
            Some(Slot::InFlight { pending, .. }) => Some(pending.clone()),
            None => None,
        };
        if let Some(pending) = in_flight {
            tex_trace!(SOURCE, "{} pixels wait on in-flight request", key);
            self.bump(|stats| stats.coalesced += 1);
            match pending.wait() {
                Ok(texture) => {
                    if let Some(pixels) = texture.pixels() {
                        return Ok(pixels);
                    }
                }
                // The loader already failed for this identity
                Err(e @ Error::LoadFailure { .. }) => return Err(e),
                // Upload failures leave the pixels loadable
                Err(_) => {}
            }
        }

        let claim = {
            let mut sources = lock_table(&self.sources);
            match sources.get(key) {
                Some(pending) => Err(pending.clone()),
                None => {
                    let (completer, waiter) = pending();
                    sources.insert(key.clone(), waiter);
                    Ok(SourceLoad {
                        sources: Arc::clone(&self.sources),
                        key: key.clone(),
                        completer: Some(completer),
                    })
                }
            }
        };

        match claim {
            Err(pending) => {
                tex_trace!(SOURCE, "{} joins in-flight pixel load", key);
                self.bump(|stats| stats.coalesced += 1);
                pending.wait()
            }
            Ok(load) => {
                let outcome = self.load(key).map(Arc::new);
                load.finish(&outcome);
                outcome
            }
        }
    }

    fn set_stage(&self, key: &TextureKey, next: TextureState) {
        if let Some(Slot::InFlight { stage, .. }) = lock_table(&self.table).get_mut(key) {
            *stage = next;
        }
    }

    // ===== QUERIES =====

    /// Resident texture, without ever loading
    pub fn get(&self, name: &str, role: impl Into<TextureRole>) -> Option<Arc<Texture>> {
        match lock_table(&self.table).get(&TextureKey::new(name, role)) {
            Some(Slot::Resident(texture)) => Some(Arc::clone(texture)),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str, role: impl Into<TextureRole>) -> bool {
        self.get(name, role).is_some()
    }

    /// Lifecycle state of one identity
    ///
    /// A constituent whose pixels are being loaded for a composite reports
    /// `Loading` until the load ends, then `Unrequested` again.
    pub fn state(&self, name: &str, role: impl Into<TextureRole>) -> TextureState {
        let key = TextureKey::new(name, role);
        match lock_table(&self.table).get(&key) {
            Some(Slot::Resident(_)) => return TextureState::Resident,
            Some(Slot::InFlight { stage, .. }) => return *stage,
            None => {}
        }
        if lock_table(&self.sources).contains_key(&key) {
            TextureState::Loading
        } else {
            TextureState::Unrequested
        }
    }

    pub fn resident_count(&self) -> usize {
        lock_table(&self.table)
            .values()
            .filter(|slot| matches!(slot, Slot::Resident(_)))
            .count()
    }

    /// Keys of every resident texture, sorted
    pub fn keys(&self) -> Vec<TextureKey> {
        let mut keys: Vec<TextureKey> = lock_table(&self.table)
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Resident(_)))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> RegistryStats {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self, update: impl FnOnce(&mut RegistryStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }

    // ===== RELEASE =====

    /// Free a resident texture
    ///
    /// Removes the record, frees device memory and drops the CPU pixels.
    /// Outstanding `Arc<Texture>` clones report no handle afterwards.
    /// Fails with `Error::InvalidResource` if the identity is not resident.
    pub fn release(&self, name: &str, role: impl Into<TextureRole>) -> Result<()> {
        let key = TextureKey::new(name, role);
        let texture = {
            let mut table = lock_table(&self.table);
            match table.remove(&key) {
                Some(Slot::Resident(texture)) => texture,
                Some(in_flight) => {
                    table.insert(key.clone(), in_flight);
                    return Err(Error::InvalidResource(format!(
                        "{} is still being loaded",
                        key
                    ))
                    .logged(SOURCE));
                }
                None => {
                    return Err(Error::InvalidResource(format!("{} is not resident", key))
                        .logged(SOURCE));
                }
            }
        };
        self.release_texture(&texture)
    }

    /// Release every resident texture; in-flight requests are left alone
    ///
    /// Every texture is released even if some device releases fail; the
    /// first failure is returned.
    pub fn release_all(&self) -> Result<()> {
        let mut residents = Vec::new();
        lock_table(&self.table).retain(|_, slot| match slot {
            Slot::Resident(texture) => {
                residents.push(Arc::clone(texture));
                false
            }
            Slot::InFlight { .. } => true,
        });

        let mut first_error = None;
        for texture in &residents {
            if let Err(e) = self.release_texture(texture) {
                first_error.get_or_insert(e);
            }
        }
        if !residents.is_empty() {
            tex_info!(SOURCE, "Released {} textures", residents.len());
        }
        first_error.map_or(Ok(()), Err)
    }

    fn release_texture(&self, texture: &Texture) -> Result<()> {
        tex_debug!(SOURCE, "{} -> Released", texture.key());
        self.bump(|stats| stats.releases += 1);
        self.pipeline.release(texture)
    }
}

impl Drop for TextureRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            tex_warn!(SOURCE, "Release on drop failed: {}", e);
        }
    }
}

#[cfg(test)]
#[path = "texture_registry_tests.rs"]
mod tests;
