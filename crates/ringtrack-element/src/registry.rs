//! The element type registry: shapes discovered from a line, numbered.

use indexmap::IndexMap;
use ringtrack_core::ShapeId;

use crate::element::Element;
use crate::shape::{Shape, ShapeKey};

/// Errors raised while building a registry or decoding element records.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// An element serialized a different number of values than its
    /// shape declares.
    #[error("element {index} ({shape}) has {found} field values, layout declares {expected}")]
    LayoutMismatch {
        /// Position in the sequence.
        index: usize,
        /// Shape name.
        shape: &'static str,
        /// Declared field count.
        expected: usize,
        /// Serialized value count.
        found: usize,
    },
    /// Two different layouts share one shape name. Emitted symbols would
    /// clash.
    #[error("shape name '{name}' registered with two different field layouts")]
    NameCollision {
        /// The contested name.
        name: &'static str,
    },
    /// A shape uses the name of a builtin shape.
    #[error("shape name '{name}' is reserved")]
    ReservedName {
        /// The reserved name.
        name: &'static str,
    },
    /// A record names a shape the registry does not know.
    #[error("unknown shape '{name}'")]
    UnknownShape {
        /// The requested name.
        name: String,
    },
    /// A record lacks a field its shape declares.
    #[error("record for {shape} is missing field '{field}'")]
    MissingField {
        /// Shape name.
        shape: &'static str,
        /// Missing field name.
        field: &'static str,
    },
}

/// Shapes every kernel carries regardless of the line.
///
/// They contribute declarations to generated source but are not
/// elements and never receive a dispatch id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinShape {
    /// Particle batch state.
    Particles,
    /// Turn-by-turn monitor record.
    Monitor,
}

impl BuiltinShape {
    /// Both builtins, in emission order.
    pub const ALL: [BuiltinShape; 2] = [BuiltinShape::Particles, BuiltinShape::Monitor];

    /// Symbol prefix in generated source.
    pub fn name(self) -> &'static str {
        match self {
            Self::Particles => "Particles",
            Self::Monitor => "ParticlesMonitor",
        }
    }

    fn is_reserved(name: &str) -> bool {
        Self::ALL.iter().any(|b| b.name() == name)
    }
}

/// Closed, ordered set of element shapes.
///
/// The position of a shape in insertion order is its [`ShapeId`]. Built
/// from the same sequence, a registry always assigns the same ids.
#[derive(Clone, Debug, Default)]
pub struct ShapeRegistry {
    shapes: IndexMap<ShapeKey, &'static Shape>,
}

impl ShapeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shape, returning its id. Registering a known shape
    /// returns the existing id.
    pub fn register(&mut self, shape: &'static Shape) -> Result<ShapeId, RegistryError> {
        let key = shape.key();
        if let Some(index) = self.shapes.get_index_of(&key) {
            return Ok(ShapeId(index as u32));
        }
        if BuiltinShape::is_reserved(shape.name) {
            return Err(RegistryError::ReservedName { name: shape.name });
        }
        if self.shapes.keys().any(|k| k.name == shape.name) {
            return Err(RegistryError::NameCollision { name: shape.name });
        }
        let (index, _) = self.shapes.insert_full(key, shape);
        Ok(ShapeId(index as u32))
    }

    /// Scan a sequence once, registering shapes in order of first
    /// appearance. Returns the registry and each element's id.
    ///
    /// Every element's serialized values are checked against its shape's
    /// layout.
    pub fn from_elements<'a, I>(elements: I) -> Result<(Self, Vec<ShapeId>), RegistryError>
    where
        I: IntoIterator<Item = &'a dyn Element>,
    {
        let mut registry = Self::new();
        let mut ids = Vec::new();
        for (index, element) in elements.into_iter().enumerate() {
            let shape = element.shape();
            let found = element.field_values().len();
            if found != shape.fields.len() {
                return Err(RegistryError::LayoutMismatch {
                    index,
                    shape: shape.name,
                    expected: shape.fields.len(),
                    found,
                });
            }
            ids.push(registry.register(shape)?);
        }
        Ok((registry, ids))
    }

    /// Shape by id.
    pub fn get(&self, id: ShapeId) -> Option<&'static Shape> {
        self.shapes.get_index(id.index()).map(|(_, s)| *s)
    }

    /// Id of a registered shape.
    pub fn id_of(&self, shape: &Shape) -> Option<ShapeId> {
        self.shapes
            .get_index_of(&shape.key())
            .map(|i| ShapeId(i as u32))
    }

    /// Shape by name.
    pub fn by_name(&self, name: &str) -> Option<&'static Shape> {
        self.shapes.values().find(|s| s.name == name).copied()
    }

    /// Number of element shapes (builtins excluded).
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether no element shapes are registered.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Shapes in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &'static Shape)> + '_ {
        self.shapes
            .values()
            .enumerate()
            .map(|(i, s)| (ShapeId(i as u32), *s))
    }

    /// Shape keys in id order.
    pub fn keys(&self) -> Vec<ShapeKey> {
        self.shapes.keys().copied().collect()
    }

    /// Builtin shapes every kernel declares.
    pub fn builtins(&self) -> &'static [BuiltinShape] {
        &BuiltinShape::ALL
    }
}
