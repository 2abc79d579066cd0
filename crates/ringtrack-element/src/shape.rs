//! Static shape descriptors.

use std::fmt;

use ringtrack_core::LocalParticle;

use crate::element::ElementView;

/// Host transform of one element shape applied to one particle.
pub type TrackFn = fn(&ElementView<'_>, &mut LocalParticle);

/// Broad category of a shape, used by cross-cutting kernel policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Field-free transport over a length. Candidates for the global
    /// aperture check.
    Drift,
    /// Thin-lens momentum kick.
    Kick,
    /// Loss boundary; marks particles lost, never moves them.
    Aperture,
    /// Change of reference frame.
    Transform,
}

/// A named piece of device source shared between shapes.
///
/// The synthesizer emits each distinct name once per compiled unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SourceFragment {
    /// Unique fragment name.
    pub name: &'static str,
    /// C-family source text.
    pub text: &'static str,
}

/// Structural type of an element.
///
/// Shapes are `'static` descriptors owned by the crate that implements
/// the element. Every element of one shape serializes the same ordered
/// `f64` field layout.
pub struct Shape {
    /// Shape name. Also the prefix of emitted symbols, so it must be a
    /// valid C identifier.
    pub name: &'static str,
    /// Field names in placement order.
    pub fields: &'static [&'static str],
    /// Category.
    pub kind: ShapeKind,
    /// Host transform.
    pub track: TrackFn,
    /// Device source defining `<name>_track_local_particle`. May use the
    /// `/*gpufun*/` and `/*gpuglmem*/` qualifier markers and the
    /// generated `<name>Data_get_<field>` accessors.
    pub source: &'static str,
    /// Shared declarations this shape's source depends on.
    pub fragments: &'static [SourceFragment],
}

impl Shape {
    /// Cache and registry identity.
    pub fn key(&self) -> ShapeKey {
        ShapeKey {
            name: self.name,
            fields: self.fields,
        }
    }

    /// Symbol of the per-particle transform in generated source.
    pub fn entry_point(&self) -> String {
        format!("{}_track_local_particle", self.name)
    }

    /// Name of the element data pointer type in generated source.
    pub fn data_type(&self) -> String {
        format!("{}Data", self.name)
    }

    /// Index of a field by name.
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Structural identity of a shape: name plus field layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey {
    /// Shape name.
    pub name: &'static str,
    /// Field names in placement order.
    pub fields: &'static [&'static str],
}

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.fields.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &ElementView<'_>, _: &mut LocalParticle) {}

    static MARKER: Shape = Shape {
        name: "Marker",
        fields: &["tag", "weight"],
        kind: ShapeKind::Transform,
        track: noop,
        source: "",
        fragments: &[],
    };

    #[test]
    fn symbols_follow_naming_contract() {
        assert_eq!(MARKER.entry_point(), "Marker_track_local_particle");
        assert_eq!(MARKER.data_type(), "MarkerData");
    }

    #[test]
    fn key_includes_layout() {
        assert_eq!(MARKER.key().to_string(), "Marker(tag,weight)");
        assert_eq!(MARKER.field_index("weight"), Some(1));
        assert_eq!(MARKER.field_index("missing"), None);
    }
}
