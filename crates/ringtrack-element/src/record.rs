//! Structured, serializable element records.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::element::{Element, ElementView};
use crate::registry::{RegistryError, ShapeRegistry};
use crate::shape::Shape;

/// Shape name plus named field values, in layout order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Shape name.
    pub shape: String,
    /// Field values keyed by field name.
    pub fields: IndexMap<String, f64>,
}

impl ElementRecord {
    /// Record of a live element.
    pub fn from_element(element: &dyn Element) -> Self {
        Self::build(element.shape(), &element.field_values())
    }

    /// Record of an arena-resident element.
    pub fn from_view(view: &ElementView<'_>) -> Self {
        Self::build(view.shape(), view.values())
    }

    fn build(shape: &Shape, values: &[f64]) -> Self {
        Self {
            shape: shape.name.to_string(),
            fields: shape
                .fields
                .iter()
                .zip(values)
                .map(|(name, v)| (name.to_string(), *v))
                .collect(),
        }
    }

    /// Resolve the record against a registry, returning the shape and
    /// the values in layout order. Extra fields are ignored.
    pub fn resolve(
        &self,
        registry: &ShapeRegistry,
    ) -> Result<(&'static Shape, Vec<f64>), RegistryError> {
        let shape = registry
            .by_name(&self.shape)
            .ok_or_else(|| RegistryError::UnknownShape {
                name: self.shape.clone(),
            })?;
        let values = shape
            .fields
            .iter()
            .map(|field| {
                self.fields
                    .get(*field)
                    .copied()
                    .ok_or(RegistryError::MissingField {
                        shape: shape.name,
                        field: *field,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((shape, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;
    use ringtrack_core::LocalParticle;

    fn noop(_: &ElementView<'_>, _: &mut LocalParticle) {}

    static BOX: Shape = Shape {
        name: "Box",
        fields: &["half_x", "half_y"],
        kind: ShapeKind::Aperture,
        track: noop,
        source: "",
        fragments: &[],
    };

    #[test]
    fn record_from_view_keeps_layout_order() {
        let values = [0.3, 0.1];
        let rec = ElementRecord::from_view(&ElementView::new(&BOX, &values));
        let keys: Vec<_> = rec.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["half_x", "half_y"]);

        let json = serde_json::to_string(&rec).unwrap();
        assert_eq!(json, r#"{"shape":"Box","fields":{"half_x":0.3,"half_y":0.1}}"#);
    }

    #[test]
    fn resolve_reports_missing_field() {
        let mut reg = ShapeRegistry::new();
        reg.register(&BOX).unwrap();
        let rec: ElementRecord =
            serde_json::from_str(r#"{"shape":"Box","fields":{"half_y":0.1}}"#).unwrap();
        assert_eq!(
            rec.resolve(&reg).unwrap_err(),
            RegistryError::MissingField {
                shape: "Box",
                field: "half_x"
            }
        );
    }

    #[test]
    fn resolve_unknown_shape() {
        let reg = ShapeRegistry::new();
        let rec = ElementRecord {
            shape: "Nope".into(),
            fields: IndexMap::new(),
        };
        assert!(matches!(
            rec.resolve(&reg),
            Err(RegistryError::UnknownShape { .. })
        ));
    }
}
