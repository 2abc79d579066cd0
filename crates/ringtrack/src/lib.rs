//! ringtrack: multi-turn tracking of charged particles through a ring.
//!
//! This is the facade crate that re-exports the public API of every
//! ringtrack sub-crate. For most users, adding `ringtrack` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use ringtrack::prelude::*;
//! use ringtrack::elements::{Drift, LimitRect};
//!
//! let line = Line::new()
//!     .with("d1", Drift::new(5.0))
//!     .with("wall", LimitRect::new(-0.01, 0.01, -0.01, 0.01))
//!     .with("d2", Drift::new(5.0));
//! let mut tracker = Tracker::new(line, TrackerConfig::default()).unwrap();
//!
//! let mut particles = Particles::builder().px(vec![0.0, 0.004]).build().unwrap();
//! let outcome = tracker
//!     .track(&mut particles, TrackRequest::turns(1).monitor(MonitorRequest::On))
//!     .unwrap();
//!
//! // The second particle hits the wall after the first drift.
//! assert_eq!(particles.s(), &[10.0, 5.0]);
//! assert_eq!(outcome.metrics.lost_after, 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `ringtrack-core` | ids, backends, `LocalParticle`, error taxonomy |
//! | [`arena`] | `ringtrack-arena` | contiguous element arena and handles |
//! | [`element`] | `ringtrack-element` | `Element` trait, shapes, registry, sequences |
//! | [`elements`] | `ringtrack-elements` | reference elements |
//! | [`kernel`] | `ringtrack-kernel` | synthesis, compilation cache, dispatch |
//! | [`engine`] | `ringtrack-engine` | tracker, particles, monitor, configuration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, ids and errors (`ringtrack-core`).
pub use ringtrack_core as types;

/// Element arena (`ringtrack-arena`).
pub use ringtrack_arena as arena;

/// Element shapes, registry and placed sequences (`ringtrack-element`).
///
/// Implement [`element::Element`] and describe it with a static
/// [`element::Shape`] to add an element type.
pub use ringtrack_element as element;

/// Reference elements (`ringtrack-elements`).
pub use ringtrack_elements as elements;

/// Kernel synthesis, caching and dispatch (`ringtrack-kernel`).
///
/// Register a [`kernel::DeviceToolchain`] on a [`kernel::KernelCache`] to
/// run on CUDA or OpenCL backends.
pub use ringtrack_kernel as kernel;

/// Tracking driver (`ringtrack-engine`).
pub use ringtrack_engine as engine;

/// Common imports for typical tracking code.
///
/// ```rust
/// use ringtrack::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use ringtrack_core::{
        ApertureCheckPolicy, Backend, CompileError, ConfigError, LocalParticle, LossCode,
        ParticleId,
    };

    // Elements
    pub use ringtrack_element::{Element, ElementView, Shape, ShapeKind};

    // Kernel
    pub use ringtrack_kernel::{CacheStats, KernelCache};

    // Engine
    pub use ringtrack_engine::{
        Line, MonitorRequest, Particles, TrackError, TrackMetrics, TrackOutcome, TrackRequest,
        Tracker, TrackerConfig, TurnByTurnMonitor,
    };
}
