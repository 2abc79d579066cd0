//! Pre-resolved `ShapeId -> transform` table used by host execution.

use ringtrack_arena::Arena;
use ringtrack_core::{CompileError, ConfigError, LocalParticle, ShapeId};
use ringtrack_element::{ElementView, Shape, TrackFn};

use crate::ir::KernelIr;

/// One resolved arm of the type switch.
#[derive(Clone, Copy, Debug)]
pub struct DispatchEntry {
    /// Shape of the arm.
    pub shape: &'static Shape,
    /// Host transform.
    pub track: TrackFn,
    /// Field count read from the arena.
    pub n_fields: usize,
    /// Global aperture check before the transform.
    pub aperture_check: bool,
}

/// Dispatch table indexed by [`ShapeId`].
#[derive(Clone, Debug, Default)]
pub struct DispatchTable {
    entries: Vec<DispatchEntry>,
}

impl DispatchTable {
    /// Resolve every dispatch arm of `ir`.
    pub fn from_ir(ir: &KernelIr) -> Result<Self, CompileError> {
        let cases = ir.cases().ok_or_else(|| CompileError::MalformedIr {
            reason: "kernel has no dispatch".to_string(),
        })?;
        Ok(Self {
            entries: cases
                .iter()
                .map(|c| DispatchEntry {
                    shape: c.shape,
                    track: c.shape.track,
                    n_fields: c.shape.fields.len(),
                    aperture_check: c.aperture_check,
                })
                .collect(),
        })
    }

    /// Entry for `id`.
    #[inline]
    pub fn get(&self, id: ShapeId) -> Option<&DispatchEntry> {
        self.entries.get(id.index())
    }

    /// Number of arms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no arms.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check every element in `[start, start + count)` against the table
    /// and the arena, so the hot loop can use unchecked reads.
    pub fn validate_tables(
        &self,
        arena: &Arena,
        offsets: &[u64],
        type_ids: &[ShapeId],
        start: usize,
        count: usize,
    ) -> Result<(), ConfigError> {
        for ee in start..start + count {
            let (offset, id) = (offsets[ee], type_ids[ee]);
            let entry = self.get(id).ok_or_else(|| ConfigError::TableMismatch {
                reason: format!("element {ee} has unknown type id {id}"),
            })?;
            arena
                .f64s(offset, entry.n_fields)
                .map_err(|e| ConfigError::TableMismatch {
                    reason: format!("element {ee} ({}): {e}", entry.shape.name),
                })?;
        }
        Ok(())
    }

    /// Run one element on one particle: aperture check, then the
    /// transform unless the check just lost the particle.
    ///
    /// Tables must have passed [`validate_tables`](Self::validate_tables).
    #[inline]
    pub fn apply(
        &self,
        arena: &Arena,
        offset: u64,
        id: ShapeId,
        global_xy_limit: f64,
        p: &mut LocalParticle,
    ) {
        let Some(entry) = self.get(id) else {
            debug_assert!(false, "type id {id} passed validation but has no entry");
            return;
        };
        if entry.aperture_check {
            p.global_aperture_check(global_xy_limit);
            if !p.is_alive() {
                return;
            }
        }
        let view = ElementView::new(entry.shape, arena.f64s_fast(offset, entry.n_fields));
        (entry.track)(&view, p);
    }
}
