//! Errors surfaced by the tracking driver.

use ringtrack_core::{CompileError, ConfigError};
use ringtrack_element::SequenceError;
use ringtrack_kernel::LaunchError;

/// Everything [`Tracker`](crate::Tracker) operations can fail with.
///
/// Particle losses are not errors; they show up in the particles' `state`.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum TrackError {
    /// The request or configuration is invalid. Raised before launch.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The kernel could not be built.
    #[error(transparent)]
    Compile(#[from] CompileError),
    /// The line could not be placed in an arena.
    #[error(transparent)]
    Sequence(#[from] SequenceError),
    /// The device failed while running the kernel.
    #[error("device launch on {backend} failed: {reason}")]
    Device {
        /// Backend of the kernel.
        backend: ringtrack_core::Backend,
        /// Runtime diagnostic.
        reason: String,
    },
}

impl From<LaunchError> for TrackError {
    fn from(e: LaunchError) -> Self {
        match e {
            LaunchError::Config(e) => Self::Config(e),
            LaunchError::Device { backend, reason } => Self::Device { backend, reason },
        }
    }
}
