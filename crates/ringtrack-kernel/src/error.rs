//! Launch errors.

use ringtrack_core::{Backend, ConfigError};

/// A kernel launch was refused or the device reported a failure.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LaunchError {
    /// Arguments rejected before any particle was touched.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The device module failed to run the kernel.
    #[error("device launch on {backend} failed: {reason}")]
    Device {
        /// Backend of the kernel.
        backend: Backend,
        /// Runtime diagnostic.
        reason: String,
    },
}
