//! Test utilities for ringtrack development.
//!
//! - [`fixtures`]: reference lines built from the stock elements.
//! - [`reference`]: a slow element-by-element tracker used as the oracle
//!   for kernel results.
//! - [`sample`]: seeded particle coordinates.
//! - [`toolchain`]: a device toolchain that checks generated device source
//!   and then runs the kernel on the host.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod reference;
pub mod sample;
pub mod toolchain;

pub use fixtures::{drift_wall_drift, fodo_cell, names_for, RefLine};
pub use reference::{assert_close, track_reference, ReferenceRun};
pub use sample::{sample_coordinates, Coordinates};
pub use toolchain::EmulatedDeviceToolchain;
