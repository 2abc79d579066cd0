//! Device source shared by more than one element.

use ringtrack_element::SourceFragment;

/// Transverse translation of a local particle.
pub const TRANSVERSE_SHIFT: SourceFragment = SourceFragment {
    name: "transverse_shift",
    text: r#"
/*gpufun*/
void LocalParticle_shift_xy(LocalParticle* part, double dx, double dy){
    LocalParticle_add_to_x(part, dx);
    LocalParticle_add_to_y(part, dy);
}
"#,
};
