//! The [`Arena`]: one growable, aligned, offset-addressed buffer.

use bytemuck::Pod;
use ringtrack_core::{ArenaId, DeviceTarget, Placement};

use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::handle::{Handle, SliceHandle};

const ALIGN: usize = ArenaConfig::ALIGNMENT;

fn round_up(size: usize) -> Option<usize> {
    size.checked_add(ALIGN - 1).map(|s| s / ALIGN * ALIGN)
}

/// A contiguous memory region holding serialized structs.
///
/// Backed by a `Vec<u64>`, so every allocation (always a multiple of 8
/// bytes) starts 8-byte aligned and can be viewed as `f64` without
/// copying. Offsets handed out are stable for the arena's lifetime:
/// growth reallocates the backing vector but never moves data relative
/// to its start.
///
/// An arena copied to a device placement (see [`to_device`](Self::to_device))
/// is a read-only mirror: allocation and writes require host placement.
#[derive(Clone, Debug)]
pub struct Arena {
    id: ArenaId,
    words: Vec<u64>,
    /// Bytes handed out so far. Always a multiple of 8.
    used: usize,
    placement: Placement,
    config: ArenaConfig,
}

impl Arena {
    /// Create an empty host arena.
    pub fn new(config: ArenaConfig) -> Result<Self, ArenaError> {
        config
            .validate()
            .map_err(|reason| ArenaError::InvalidConfig { reason })?;
        let words = config.initial_capacity / ALIGN;
        Ok(Self {
            id: ArenaId::next(),
            words: Vec::with_capacity(words),
            used: 0,
            placement: Placement::Host,
            config,
        })
    }

    /// Unique id of this arena instance.
    pub fn id(&self) -> ArenaId {
        self.id
    }

    /// Where the bytes currently live.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// The configuration this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Bytes allocated so far.
    pub fn used_bytes(&self) -> usize {
        self.used
    }

    /// Whether nothing has been allocated.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    fn ensure_host(&self) -> Result<(), ArenaError> {
        match self.placement {
            Placement::Host => Ok(()),
            placement => Err(ArenaError::NotOnHost { placement }),
        }
    }

    /// Bump-allocate `size` bytes (rounded up to 8) and return the offset.
    ///
    /// Offsets increase monotonically; nothing is reused until
    /// [`reset`](Self::reset). The new region is zeroed.
    pub fn allocate(&mut self, size: usize) -> Result<u64, ArenaError> {
        self.ensure_host()?;
        let exceeded = ArenaError::CapacityExceeded {
            requested: size,
            capacity: self.config.max_capacity,
        };
        let padded = round_up(size).ok_or_else(|| exceeded.clone())?;
        let new_used = self.used.checked_add(padded).ok_or_else(|| exceeded.clone())?;
        if new_used > self.config.max_capacity {
            return Err(exceeded);
        }
        let needed_words = new_used / ALIGN;
        if needed_words > self.words.len() {
            self.words.resize(needed_words, 0);
        }
        let offset = self.used as u64;
        self.used = new_used;
        Ok(offset)
    }

    /// Copy a plain-old-data value into the arena.
    pub fn place<T: Pod>(&mut self, value: &T) -> Result<Handle<T>, ArenaError> {
        if std::mem::align_of::<T>() > ALIGN {
            return Err(ArenaError::Misaligned {
                offset: self.used as u64,
                align: std::mem::align_of::<T>(),
            });
        }
        let size = std::mem::size_of::<T>();
        let offset = self.allocate(size)?;
        let start = offset as usize;
        self.bytes_mut()[start..start + size].copy_from_slice(bytemuck::bytes_of(value));
        Ok(Handle::new(offset))
    }

    /// Copy a run of `f64` values into the arena.
    pub fn place_f64s(&mut self, values: &[f64]) -> Result<SliceHandle, ArenaError> {
        let offset = self.allocate(std::mem::size_of_val(values))?;
        let first = offset as usize / ALIGN;
        for (word, value) in self.words[first..first + values.len()].iter_mut().zip(values) {
            *word = value.to_bits();
        }
        Ok(SliceHandle::new(offset, values.len()))
    }

    /// Read a value back by handle.
    pub fn read_at<T: Pod>(&self, handle: Handle<T>) -> Result<T, ArenaError> {
        let bytes = self.checked_bytes(handle.offset, std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }

    /// Overwrite a previously placed value.
    pub fn write_at<T: Pod>(&mut self, handle: Handle<T>, value: &T) -> Result<(), ArenaError> {
        self.ensure_host()?;
        let size = std::mem::size_of::<T>();
        self.checked_bytes(handle.offset, size)?;
        let start = handle.offset as usize;
        self.bytes_mut()[start..start + size].copy_from_slice(bytemuck::bytes_of(value));
        Ok(())
    }

    /// Checked view of `len` `f64` values starting at byte `offset`.
    pub fn f64s(&self, offset: u64, len: usize) -> Result<&[f64], ArenaError> {
        if offset % ALIGN as u64 != 0 {
            return Err(ArenaError::Misaligned {
                offset,
                align: ALIGN,
            });
        }
        let byte_len = len
            .checked_mul(ALIGN)
            .ok_or(ArenaError::OutOfBounds {
                offset,
                len: usize::MAX,
                used: self.used,
            })?;
        self.checked_bytes(offset, byte_len)?;
        Ok(self.f64s_fast(offset, len))
    }

    /// View of a placed `f64` run.
    pub fn slice(&self, handle: SliceHandle) -> Result<&[f64], ArenaError> {
        self.f64s(handle.offset, handle.len)
    }

    /// Hot-path view of `len` `f64` values at byte `offset`.
    ///
    /// Alignment and bounds are only asserted in debug builds; callers
    /// validate their offset tables with [`f64s`](Self::f64s) before a
    /// launch. Out-of-range access still panics through slice indexing.
    #[inline]
    pub fn f64s_fast(&self, offset: u64, len: usize) -> &[f64] {
        debug_assert!(offset % ALIGN as u64 == 0, "misaligned offset {offset}");
        debug_assert!(
            offset as usize + len * ALIGN <= self.used,
            "access {offset}+{len} past {} bytes",
            self.used
        );
        let first = offset as usize / ALIGN;
        bytemuck::cast_slice(&self.words[first..first + len])
    }

    /// The allocated bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u64, u8>(&self.words)[..self.used]
    }

    fn bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut::<u64, u8>(&mut self.words)
    }

    fn checked_bytes(&self, offset: u64, len: usize) -> Result<&[u8], ArenaError> {
        let oob = ArenaError::OutOfBounds {
            offset,
            len,
            used: self.used,
        };
        let start = usize::try_from(offset).map_err(|_| oob.clone())?;
        let end = start.checked_add(len).ok_or_else(|| oob.clone())?;
        if end > self.used {
            return Err(oob);
        }
        Ok(&self.as_bytes()[start..end])
    }

    /// Copy this arena to a device placement.
    ///
    /// The copy gets a fresh [`ArenaId`]; offsets are unchanged.
    pub fn to_device(&self, target: DeviceTarget) -> Arena {
        Arena {
            id: ArenaId::next(),
            words: self.words.clone(),
            used: self.used,
            placement: Placement::Device(target),
            config: self.config.clone(),
        }
    }

    /// Copy this arena back to host placement.
    pub fn to_host(&self) -> Arena {
        Arena {
            id: ArenaId::next(),
            words: self.words.clone(),
            used: self.used,
            placement: Placement::Host,
            config: self.config.clone(),
        }
    }

    /// Copy this arena to whatever placement `placement` names.
    pub fn to_placement(&self, placement: Placement) -> Arena {
        match placement {
            Placement::Host => self.to_host(),
            Placement::Device(target) => self.to_device(target),
        }
    }

    /// Start a new build cycle: forget every allocation and zero the memory.
    ///
    /// All outstanding handles become invalid.
    pub fn reset(&mut self) -> Result<(), ArenaError> {
        self.ensure_host()?;
        self.words.clear();
        self.used = 0;
        Ok(())
    }

    pub(crate) fn from_parts(
        words: Vec<u64>,
        used: usize,
        placement: Placement,
        config: ArenaConfig,
    ) -> Self {
        Self {
            id: ArenaId::next(),
            words,
            used,
            placement,
            config,
        }
    }

    pub(crate) fn words(&self) -> &[u64] {
        &self.words[..self.used / ALIGN]
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            id: ArenaId::next(),
            words: Vec::new(),
            used: 0,
            placement: Placement::Host,
            config: ArenaConfig::default(),
        }
    }
}
