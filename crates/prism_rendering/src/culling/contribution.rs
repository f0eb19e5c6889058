//! Screen-space contribution of a bounding box.

use prism_core::math::{transform_point, Mat4};
use prism_core::Aabb;

/// Fraction of the viewport covered by the projection of `bounds`, in [0, 1].
///
/// The eight corners are projected to NDC and their bounding rectangle is
/// clamped to the viewport. A box with any corner on or behind the eye
/// plane cannot be projected reliably and counts as covering everything.
#[must_use]
pub fn contribution_area(view_projection: &Mat4, bounds: &Aabb) -> f32 {
    let mut min = [f32::INFINITY; 2];
    let mut max = [f32::NEG_INFINITY; 2];

    for corner in bounds.corners() {
        let clip = transform_point(view_projection, corner);
        if !(clip[3] > 0.0) {
            return 1.0;
        }
        for axis in 0..2 {
            let ndc = clip[axis] / clip[3];
            min[axis] = min[axis].min(ndc);
            max[axis] = max[axis].max(ndc);
        }
    }

    let width = (max[0].min(1.0) - min[0].max(-1.0)).max(0.0);
    let height = (max[1].min(1.0) - min[1].max(-1.0)).max(0.0);

    // NDC spans 2 x 2
    width * height * 0.25
}
