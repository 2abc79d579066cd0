//! Error taxonomy for tracking.
//!
//! Two classes of failure reach the caller, always before or after a
//! kernel launch and never during one:
//!
//! - [`ConfigError`]: an invalid request (element range, backend, monitor
//!   mode, particle arrays). Raised synchronously before any launch.
//! - [`CompileError`]: the synthesized kernel could not be built for its
//!   backend. Carries the generated source for inspection.
//!
//! Particle losses are not errors; they are recorded in each particle's
//! `state`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::{Backend, Placement};

/// A tracking request or configuration that cannot be executed.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// `ele_start + num_elements` exceeds the sequence length.
    #[error("element range {start}..{start}+{count} exceeds sequence length {len}")]
    ElementRange {
        /// First element requested.
        start: usize,
        /// Number of elements requested.
        count: usize,
        /// Length of the element sequence.
        len: usize,
    },
    /// The operation is not available on this backend.
    #[error("{operation} is not supported on backend {backend}")]
    UnsupportedBackend {
        /// The backend the kernel was built for.
        backend: Backend,
        /// What was attempted.
        operation: &'static str,
    },
    /// A reserved feature that has no implementation yet.
    #[error("not implemented: {feature}")]
    NotImplemented {
        /// The requested feature.
        feature: &'static str,
    },
    /// Memory handed to a kernel lives on a different backend.
    #[error("kernel built for {kernel} cannot use memory placed on {placement}")]
    BackendMismatch {
        /// The backend the kernel was built for.
        kernel: Backend,
        /// Where the memory actually lives.
        placement: Placement,
    },
    /// Particle arrays are inconsistent.
    #[error("invalid particles: {reason}")]
    InvalidParticles {
        /// What is wrong.
        reason: String,
    },
    /// The offset or type-id tables do not describe the arena.
    #[error("element tables inconsistent with arena: {reason}")]
    TableMismatch {
        /// What is wrong.
        reason: String,
    },
    /// A configuration value is out of range or unparsable.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong.
        reason: String,
    },
}

/// The synthesized kernel could not be built.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// A shape's source does not define its required entry point.
    #[error("entry point `{symbol}` is not defined by the generated source")]
    MissingEntryPoint {
        /// The missing symbol.
        symbol: String,
        /// Full generated source.
        generated: Arc<str>,
    },
    /// Two shapes ship different text under one shared fragment name.
    #[error("shared source fragment `{name}` has conflicting definitions")]
    ConflictingFragment {
        /// Fragment name.
        name: String,
    },
    /// The kernel IR is not lowerable.
    #[error("malformed kernel IR: {reason}")]
    MalformedIr {
        /// What is wrong.
        reason: String,
    },
    /// No device toolchain is registered for this backend.
    #[error("no device toolchain registered for backend {backend}")]
    ToolchainUnavailable {
        /// The requested backend.
        backend: Backend,
    },
    /// The device toolchain rejected the generated source.
    #[error("device toolchain for {backend} failed: {reason}")]
    Toolchain {
        /// The requested backend.
        backend: Backend,
        /// Toolchain diagnostic.
        reason: String,
        /// Full generated source.
        generated: Arc<str>,
    },
    /// Writing the generated source to disk failed.
    #[error("could not save kernel source to {}: {reason}", path.display())]
    PersistSource {
        /// Requested output path.
        path: PathBuf,
        /// I/O diagnostic.
        reason: String,
    },
}

impl CompileError {
    /// The generated source attached to this error, if any.
    pub fn generated_source(&self) -> Option<&str> {
        match self {
            Self::MissingEntryPoint { generated, .. } | Self::Toolchain { generated, .. } => {
                Some(generated)
            }
            _ => None,
        }
    }
}
