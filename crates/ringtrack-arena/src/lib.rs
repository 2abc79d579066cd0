//! Contiguous byte arena for element and particle structs.
//!
//! Everything a tracking kernel dereferences lives in one growable,
//! 8-byte-aligned buffer addressed by byte offsets. A single pointer plus
//! an offset table is enough to reach every element in a sequence.
//!
//! # Architecture
//!
//! ```text
//! Arena
//! ├── Vec<u64> backing words (8-byte alignment for every allocation)
//! ├── bump cursor (monotonic, no reuse within a build cycle)
//! ├── Placement (host RAM or a device target)
//! └── ArenaConfig (initial and maximum capacity)
//! ```
//!
//! Allocations hand out typed [`Handle`]s (offset + type) rather than raw
//! pointers. Checked accessors return [`ArenaError`]; the kernel hot path
//! uses [`Arena::f64s_fast`], which only asserts in debug builds and relies
//! on the offset table having been validated before launch.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod handle;
pub mod record;

pub use buffer::Arena;
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use handle::{Handle, SliceHandle};
pub use record::ArenaRecord;
