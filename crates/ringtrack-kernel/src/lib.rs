//! Kernel assembly and dispatch for the ringtrack particle tracker.
//!
//! Turns a [`ShapeRegistry`](ringtrack_element::ShapeRegistry) into one
//! fused tracking kernel and caches the result.
//!
//! # Pipeline
//!
//! ```text
//! ShapeRegistry ──► KernelIr ──► emit (per backend) ──► source text
//!                      │                                     │
//!                      ▼                                     ▼
//!               DispatchTable ──► HostProgram     DeviceToolchain::compile
//!                                      │                     │
//!                                      └──► CompiledKernel ◄─┘
//!                                                 │
//!                                   KernelCache (keyed by KernelKey)
//! ```
//!
//! Host backends execute the IR directly against a pre-resolved dispatch
//! table; the generated source is still produced and kept for inspection.
//! Device backends hand the source to a registered toolchain.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod args;
pub mod cache;
pub mod compiled;
pub mod device;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod host;
pub mod ir;
pub mod synth;

pub use args::{ArgSlot, KernelArgs, KernelSignature, MonitorArg, SlotType};
pub use cache::{CacheOutcome, CacheStats, KernelCache};
pub use compiled::{CompiledKernel, KernelKey, KernelRequest};
pub use device::{DeviceCompileRequest, DeviceModule, DeviceToolchain};
pub use dispatch::{DispatchEntry, DispatchTable};
pub use error::LaunchError;
pub use host::HostProgram;
pub use ir::{DispatchCase, Instr, KernelIr};
pub use synth::{synthesize, SymbolTable, Synthesized, TRACK_LINE};
