//! Reference elements for the ringtrack particle tracker.
//!
//! A small set of elements that exercise every part of the kernel
//! pipeline: a field-free drift (the only shape preceded by the global
//! aperture check under the default policy), a thin multipole kick, a
//! rectangular aperture, and two frame transforms.
//!
//! Each element ships a host transform and the equivalent device source.
//! Both read fields through the accessor layout of the element's shape.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod drift;
pub mod fragments;
pub mod limit_rect;
pub mod multipole;
pub mod srotation;
pub mod xyshift;

pub use drift::{Drift, DRIFT};
pub use limit_rect::{LimitRect, LIMIT_RECT};
pub use multipole::{Multipole, MultipoleBuilder, MultipoleError, MULTIPOLE};
pub use srotation::{SRotation, SROTATION};
pub use xyshift::{XYShift, XYSHIFT};
