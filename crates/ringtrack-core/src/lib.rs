//! Core types for the ringtrack particle tracker.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace:
//! identifiers, execution backends and memory placements, the per-thread
//! [`LocalParticle`] working copy, loss codes, and the configuration and
//! compilation error taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod error;
pub mod id;
pub mod particle;

pub use backend::{ApertureCheckPolicy, Backend, DeviceTarget, Placement};
pub use error::{CompileError, ConfigError};
pub use id::{ArenaId, KernelId, ParticleId, ShapeId};
pub use particle::{delta_derived, LocalParticle, LossCode, STATE_ALIVE};
