/// Spawner - where background requests and uploads run
///
/// Async requests and `UploadPipeline::submit` hand their work to a
/// `Spawner` instead of starting threads themselves, so the host decides how
/// much runs at once (its own pool, a fixed set of workers, inline).
///
/// A job owns the completer of the request it serves. A spawner that drops a
/// job without running it fails that request's waiters rather than leaving
/// them blocked.

use std::fmt;
use std::sync::Arc;
use std::thread;
use crate::tex_warn;

const SOURCE: &str = "raytracer::Spawner";

/// Unit of background work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Shared handle to a job executor
#[derive(Clone)]
pub struct Spawner {
    run: Arc<dyn Fn(Job) + Send + Sync>,
    label: &'static str,
}

impl Spawner {
    /// Wrap a custom executor
    pub fn new(run: impl Fn(Job) + Send + Sync + 'static) -> Self {
        Self {
            run: Arc::new(run),
            label: "custom",
        }
    }

    /// Start one named OS thread per job
    pub fn thread(name: &'static str) -> Self {
        Self {
            run: Arc::new(move |job: Job| {
                // On failure the job is dropped with the builder's closure
                if let Err(e) = thread::Builder::new().name(name.to_string()).spawn(job) {
                    tex_warn!(SOURCE, "Failed to spawn {} thread: {}", name, e);
                }
            }),
            label: "thread",
        }
    }

    /// Run each job on the calling thread before `spawn` returns
    pub fn inline() -> Self {
        Self {
            run: Arc::new(|job: Job| job()),
            label: "inline",
        }
    }

    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        (self.run)(Box::new(job));
    }
}

impl Default for Spawner {
    fn default() -> Self {
        Self::thread("tex-worker")
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner").field("kind", &self.label).finish()
    }
}

#[cfg(test)]
#[path = "spawner_tests.rs"]
mod tests;
