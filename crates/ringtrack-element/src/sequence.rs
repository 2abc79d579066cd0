//! An element sequence placed in one arena.

use ringtrack_arena::{Arena, ArenaConfig, ArenaError};
use ringtrack_core::{ConfigError, ShapeId};
use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementView};
use crate::record::ElementRecord;
use crate::registry::{RegistryError, ShapeRegistry};

/// Errors raised while placing a sequence or reading it back.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SequenceError {
    /// Registry construction failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Arena allocation or access failed.
    #[error(transparent)]
    Arena(#[from] ArenaError),
    /// Element and name lists differ in length.
    #[error("{elements} elements but {names} names")]
    NameCount {
        /// Element count.
        elements: usize,
        /// Name count.
        names: usize,
    },
    /// Element index past the end of the sequence.
    #[error("element index {index} out of range for sequence of {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Sequence length.
        len: usize,
    },
}

/// Where one element lives and how to dispatch on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    /// Dispatch tag.
    pub type_id: ShapeId,
    /// Byte offset of the first field in the arena.
    pub offset: u64,
    /// Number of `f64` fields.
    pub n_fields: usize,
}

/// Ordered element descriptors, their names, and the arena holding them.
///
/// Traversal order is fixed at construction. Changing the line means
/// placing a new sequence.
#[derive(Clone, Debug)]
pub struct ElementSequence {
    registry: ShapeRegistry,
    descriptors: Vec<ElementDescriptor>,
    names: Vec<String>,
    lengths: Vec<f64>,
    arena: Arena,
}

impl ElementSequence {
    /// Register shapes and serialize every element into a fresh arena.
    pub fn place(
        elements: &[&dyn Element],
        names: &[String],
        config: ArenaConfig,
    ) -> Result<Self, SequenceError> {
        if elements.len() != names.len() {
            return Err(SequenceError::NameCount {
                elements: elements.len(),
                names: names.len(),
            });
        }
        let (registry, ids) = ShapeRegistry::from_elements(elements.iter().copied())?;
        let mut arena = Arena::new(config)?;
        let mut descriptors = Vec::with_capacity(elements.len());
        for (element, type_id) in elements.iter().zip(ids) {
            let values = element.field_values();
            let handle = arena.place_f64s(&values)?;
            descriptors.push(ElementDescriptor {
                type_id,
                offset: handle.offset(),
                n_fields: handle.len(),
            });
        }
        Ok(Self {
            registry,
            descriptors,
            names: names.to_vec(),
            lengths: elements.iter().map(|e| e.length()).collect(),
            arena,
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the sequence has no elements.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// The shapes present, in id order.
    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Descriptors in traversal order.
    pub fn descriptors(&self) -> &[ElementDescriptor] {
        &self.descriptors
    }

    /// Element names in traversal order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The arena holding every element's fields.
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Per-element byte offsets.
    pub fn offsets(&self) -> Vec<u64> {
        self.descriptors.iter().map(|d| d.offset).collect()
    }

    /// Per-element dispatch tags.
    pub fn type_ids(&self) -> Vec<ShapeId> {
        self.descriptors.iter().map(|d| d.type_id).collect()
    }

    /// Physical length of element `index`.
    pub fn length(&self, index: usize) -> Option<f64> {
        self.lengths.get(index).copied()
    }

    /// Summed physical length of a range of elements.
    pub fn range_length(&self, start: usize, count: usize) -> f64 {
        self.lengths.iter().skip(start).take(count).sum()
    }

    /// Check `start + count <= len`.
    pub fn check_range(&self, start: usize, count: usize) -> Result<(), ConfigError> {
        match start.checked_add(count) {
            Some(end) if end <= self.len() => Ok(()),
            _ => Err(ConfigError::ElementRange {
                start,
                count,
                len: self.len(),
            }),
        }
    }

    /// Checked view of element `index` in the arena.
    pub fn view(&self, index: usize) -> Result<ElementView<'_>, SequenceError> {
        let d = self
            .descriptors
            .get(index)
            .ok_or(SequenceError::IndexOutOfRange {
                index,
                len: self.len(),
            })?;
        let shape = self
            .registry
            .get(d.type_id)
            .ok_or(SequenceError::IndexOutOfRange {
                index: d.type_id.index(),
                len: self.registry.len(),
            })?;
        Ok(ElementView::new(shape, self.arena.f64s(d.offset, d.n_fields)?))
    }

    /// Reconstruct the record of element `index` from the arena.
    pub fn record(&self, index: usize) -> Result<ElementRecord, SequenceError> {
        Ok(ElementRecord::from_view(&self.view(index)?))
    }
}
