//! Error types for the texture subsystem
//!
//! One error enum covers classification, packing, loading and device
//! allocation failures. It is `Clone` because coalesced requesters of the
//! same texture all receive the same failure.

use std::fmt;
use std::panic::Location;
use crate::log::{self, LogSeverity};

/// Result type for texture subsystem operations
pub type Result<T> = std::result::Result<T, Error>;

/// Texture subsystem errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Role bitmask is not one primitive role, RM or RMAO
    Classification(u8),

    /// Composite pack inputs disagree on size, or a required channel is missing
    SourceMismatch(String),

    /// The loader collaborator could not produce pixels for a texture
    LoadFailure {
        /// Logical texture name passed to the loader
        name: String,
        /// Loader-provided reason
        message: String,
    },

    /// Device out of memory, unsupported format, or bindless table exhausted
    AllocationFailure(String),

    /// Malformed pixel buffer, or an operation on a texture that is not resident
    InvalidResource(String),

    /// Backend-specific error (Vulkan, driver, internal invariant)
    BackendError(String),
}

impl Error {
    /// Log this error at ERROR severity and hand it back
    ///
    /// Keeps the `return Err(Error::X(..).logged(SOURCE))` call sites on one
    /// line while still reporting the caller's file:line.
    #[track_caller]
    pub fn logged(self, source: &str) -> Self {
        let location = Location::caller();
        log::log_detailed(
            LogSeverity::Error,
            source,
            self.to_string(),
            location.file(),
            location.line(),
        );
        self
    }

    /// True for failures of the device allocation step
    pub fn is_allocation_failure(&self) -> bool {
        matches!(self, Error::AllocationFailure(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Classification(mask) => write!(f, "Invalid texture role mask: {:#010b}", mask),
            Error::SourceMismatch(msg) => write!(f, "Pack source mismatch: {}", msg),
            Error::LoadFailure { name, message } => {
                write!(f, "Failed to load texture '{}': {}", name, message)
            }
            Error::AllocationFailure(msg) => write!(f, "GPU allocation failed: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
