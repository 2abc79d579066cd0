//! Tracking driver for the ringtrack particle tracker.
//!
//! Provides the [`Tracker`], which places a [`Line`] in an arena, obtains
//! a fused kernel for its element shapes from the compilation cache, and
//! tracks [`Particles`] through it for many turns, optionally recording a
//! [`TurnByTurnMonitor`].
//!
//! ```no_run
//! # use ringtrack_engine::{Line, Particles, Tracker, TrackerConfig, TrackRequest, MonitorRequest};
//! # fn demo(line: Line) -> Result<(), Box<dyn std::error::Error>> {
//! let mut tracker = Tracker::new(line, TrackerConfig::default())?;
//! let mut particles = Particles::builder().x(vec![1e-3, 2e-3]).build()?;
//! let outcome = tracker.track(
//!     &mut particles,
//!     TrackRequest::turns(100).monitor(MonitorRequest::On),
//! )?;
//! println!("{} lost", outcome.metrics.lost_after);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod line;
pub mod metrics;
pub mod monitor;
pub mod particles;
pub mod tracker;

pub use config::TrackerConfig;
pub use error::TrackError;
pub use line::Line;
pub use metrics::TrackMetrics;
pub use monitor::{MonitorRequest, TurnByTurnMonitor};
pub use particles::{Column, Particles, ParticlesBuilder, ELECTRON_MASS_EV, PROTON_MASS_EV};
pub use tracker::{TrackOutcome, TrackRequest, Tracker};
