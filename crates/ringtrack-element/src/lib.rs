//! Element shapes and the element type registry.
//!
//! An element's *shape* is its structural type: a name plus an ordered
//! field layout, a host transform and the device source implementing the
//! same transform. The registry scans an element sequence once, numbers
//! the distinct shapes in order of first appearance, and those numbers
//! become the runtime type tags the fused kernel switches on.
//!
//! # Transform contract
//!
//! A shape's [`TrackFn`] mutates one particle based solely on the
//! element's own fields and that particle's current state. It may mark
//! the particle lost; it must not read or write anything else.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod element;
pub mod record;
pub mod registry;
pub mod sequence;
pub mod shape;

pub use element::{Element, ElementView};
pub use record::ElementRecord;
pub use registry::{BuiltinShape, RegistryError, ShapeRegistry};
pub use sequence::{ElementDescriptor, ElementSequence, SequenceError};
pub use shape::{Shape, ShapeKey, ShapeKind, SourceFragment, TrackFn};
