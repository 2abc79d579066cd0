//! The element trait and the read-only view handed to transforms.

use std::fmt;

use crate::shape::Shape;

/// One physical device in an accelerator line.
///
/// Implementors describe their structural [`Shape`] and serialize their
/// parameters into the shape's field order. Lines hold elements as
/// `Box<dyn Element>`, so implementations must be `Send + Sync`.
pub trait Element: fmt::Debug + Send + Sync + 'static {
    /// The element's structural type.
    fn shape(&self) -> &'static Shape;

    /// Field values in the order of [`Shape::fields`].
    fn field_values(&self) -> Vec<f64>;

    /// Physical length in metres. Thin elements are zero-length.
    fn length(&self) -> f64 {
        0.0
    }
}

/// Borrowed field values of one placed element.
///
/// Transforms read their parameters through this view; it never exposes
/// any other element or the arena around it.
#[derive(Clone, Copy)]
pub struct ElementView<'a> {
    shape: &'static Shape,
    values: &'a [f64],
}

impl<'a> ElementView<'a> {
    /// Wrap `values` laid out per `shape`.
    ///
    /// Panics in debug builds when the value count does not match the
    /// layout; the registry rejects such elements before they are placed.
    pub fn new(shape: &'static Shape, values: &'a [f64]) -> Self {
        debug_assert_eq!(
            shape.fields.len(),
            values.len(),
            "{} expects {} fields",
            shape.name,
            shape.fields.len()
        );
        Self { shape, values }
    }

    /// The element's shape.
    pub fn shape(&self) -> &'static Shape {
        self.shape
    }

    /// Field `i` in placement order.
    #[inline]
    pub fn field(&self, i: usize) -> f64 {
        self.values[i]
    }

    /// Field by name, if the shape declares it.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.shape.field_index(name).map(|i| self.values[i])
    }

    /// All field values.
    pub fn values(&self) -> &'a [f64] {
        self.values
    }
}

impl fmt::Debug for ElementView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.shape.fields.iter().zip(self.values) {
            map.entry(name, value);
        }
        map.finish()
    }
}
