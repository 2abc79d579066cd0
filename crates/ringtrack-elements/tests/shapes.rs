//! Contract checks shared by every reference element.

use ringtrack_element::{Element, ElementRecord, Shape, ShapeRegistry};
use ringtrack_elements::{Drift, LimitRect, Multipole, SRotation, XYShift};
use ringtrack_elements::{DRIFT, LIMIT_RECT, MULTIPOLE, SROTATION, XYSHIFT};

fn all() -> [&'static Shape; 5] {
    [&DRIFT, &MULTIPOLE, &LIMIT_RECT, &SROTATION, &XYSHIFT]
}

#[test]
fn every_source_defines_its_entry_point() {
    for shape in all() {
        let signature = format!("void {}(", shape.entry_point());
        assert!(shape.source.contains(&signature), "{} missing", shape.name);
        assert!(shape.source.contains(&shape.data_type()));
    }
}

#[test]
fn every_source_uses_declared_accessors_only() {
    for shape in all() {
        let prefix = format!("{}_get_", shape.data_type());
        for (pos, _) in shape.source.match_indices(&prefix) {
            let rest = &shape.source[pos + prefix.len()..];
            let field: String = rest
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
                .collect();
            let known = shape.fields.contains(&field.as_str()) || field == "bal";
            assert!(known, "{} reads undeclared field {field}", shape.name);
        }
    }
}

#[test]
fn reference_line_registers_five_shapes() {
    let quad = Multipole::builder().knl(&[0.0, 0.1]).build().unwrap();
    let elements: Vec<Box<dyn Element>> = vec![
        Box::new(Drift::new(1.0)),
        Box::new(quad),
        Box::new(Drift::new(1.0)),
        Box::new(LimitRect::new(-0.1, 0.1, -0.1, 0.1)),
        Box::new(SRotation::from_degrees(15.0)),
        Box::new(XYShift { dx: 1e-3, dy: 0.0 }),
    ];
    let (registry, ids) =
        ShapeRegistry::from_elements(elements.iter().map(|e| e.as_ref())).unwrap();
    assert_eq!(registry.len(), 5);
    assert_eq!(ids[0], ids[2]);
    let names: Vec<_> = registry.iter().map(|(_, s)| s.name).collect();
    assert_eq!(
        names,
        ["Drift", "Multipole", "LimitRect", "SRotation", "XYShift"]
    );
}

#[test]
fn element_parameters_survive_json() {
    let drift: Drift = serde_json::from_str(&serde_json::to_string(&Drift::new(2.5)).unwrap()).unwrap();
    assert_eq!(drift, Drift::new(2.5));

    let rect = LimitRect::new(-0.1, 0.2, 0.2, 0.3);
    let back: LimitRect = serde_json::from_str(&serde_json::to_string(&rect).unwrap()).unwrap();
    assert_eq!(back.field_values(), rect.field_values());

    let rot = SRotation::from_degrees(30.0);
    let back: SRotation = serde_json::from_value(serde_json::to_value(rot).unwrap()).unwrap();
    assert_eq!(back, rot);

    let shift: XYShift = serde_json::from_str(r#"{"dx": 1e-3, "dy": -2e-3}"#).unwrap();
    assert_eq!(shift, XYShift { dx: 1e-3, dy: -2e-3 });
}

#[test]
fn multipole_record_resolves_after_json() {
    let sext = Multipole::builder()
        .knl(&[0.0, 0.0, 0.3])
        .ksl(&[0.0, 1e-3])
        .build()
        .unwrap();
    let record = ElementRecord::from_element(&sext);
    let json = serde_json::to_string(&record).unwrap();
    let back: ElementRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);

    let mut registry = ShapeRegistry::new();
    registry.register(&MULTIPOLE).unwrap();
    let (shape, values) = back.resolve(&registry).unwrap();
    assert_eq!(shape.name, "Multipole");
    assert_eq!(values, sext.field_values());
}
