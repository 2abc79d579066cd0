//! An ordered, named list of elements.

use std::sync::Arc;

use ringtrack_core::ConfigError;
use ringtrack_element::Element;

/// The beamline a [`Tracker`](crate::Tracker) runs over.
///
/// Elements are shared, so cloning a line is cheap. Order is the
/// traversal order.
#[derive(Clone, Debug, Default)]
pub struct Line {
    elements: Vec<Arc<dyn Element>>,
    names: Vec<String>,
}

impl Line {
    /// An empty line.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel element and name lists.
    pub fn from_parts(
        elements: Vec<Arc<dyn Element>>,
        names: Vec<String>,
    ) -> Result<Self, ConfigError> {
        if elements.len() != names.len() {
            return Err(ConfigError::InvalidConfig {
                reason: format!("{} elements but {} names", elements.len(), names.len()),
            });
        }
        Ok(Self { elements, names })
    }

    /// Append an element.
    pub fn push(&mut self, name: impl Into<String>, element: impl Element) {
        self.names.push(name.into());
        self.elements.push(Arc::new(element));
    }

    /// Builder-style [`push`](Self::push).
    pub fn with(mut self, name: impl Into<String>, element: impl Element) -> Self {
        self.push(name, element);
        self
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the line has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element names in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Elements in order.
    pub fn elements(&self) -> &[Arc<dyn Element>] {
        &self.elements
    }

    /// Borrowed elements, the form sequence placement takes.
    pub fn element_refs(&self) -> Vec<&dyn Element> {
        self.elements.iter().map(|e| e.as_ref()).collect()
    }

    /// Index of the first element called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Sum of element lengths \[m\].
    pub fn total_length(&self) -> f64 {
        self.elements.iter().map(|e| e.length()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ringtrack_core::LocalParticle;
    use ringtrack_element::{ElementView, Shape, ShapeKind};

    fn advance(el: &ElementView<'_>, p: &mut LocalParticle) {
        p.add_to_s(el.field(0));
    }

    static GAP: Shape = Shape {
        name: "Gap",
        fields: &["length"],
        kind: ShapeKind::Drift,
        track: advance,
        source: "",
        fragments: &[],
    };

    #[derive(Debug)]
    struct Gap(f64);

    impl Element for Gap {
        fn shape(&self) -> &'static Shape {
            &GAP
        }
        fn field_values(&self) -> Vec<f64> {
            vec![self.0]
        }
        fn length(&self) -> f64 {
            self.0
        }
    }

    #[test]
    fn builds_in_order() {
        let line = Line::new().with("a", Gap(1.0)).with("b", Gap(2.5));
        assert_eq!(line.len(), 2);
        assert_eq!(line.names(), ["a", "b"]);
        assert_eq!(line.index_of("b"), Some(1));
        assert_eq!(line.total_length(), 3.5);
    }

    #[test]
    fn from_parts_checks_names() {
        let elements: Vec<Arc<dyn Element>> = vec![Arc::new(Gap(1.0))];
        assert!(Line::from_parts(elements.clone(), vec![]).is_err());
        assert!(Line::from_parts(elements, vec!["g".into()]).is_ok());
    }
}
