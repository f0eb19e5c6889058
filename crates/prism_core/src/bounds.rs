//! Planes, bounding boxes and view frustums.
//!
//! Extracts frustum planes from a view-projection matrix and provides
//! the bounding-box primitives the culling kernel tests against them.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::math::Mat4;

/// A plane in 3D space (Ax + By + Cz + D = 0).
///
/// Points with a positive signed distance are on the inside.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Plane {
    /// Normal X component.
    pub a: f32,
    /// Normal Y component.
    pub b: f32,
    /// Normal Z component.
    pub c: f32,
    /// Distance from origin.
    pub d: f32,
}

impl Plane {
    /// A plane every point lies inside of. Used to encode a disabled clip plane.
    pub const ALWAYS_INSIDE: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    /// Creates a new plane.
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Plane through `point` whose inside faces along `normal`.
    #[must_use]
    pub fn from_point_normal(point: [f32; 3], normal: [f32; 3]) -> Self {
        let n = crate::math::normalize(normal);
        Self::new(n[0], n[1], n[2], -crate::math::dot(n, point))
    }

    /// Normalizes the plane.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > 0.0 {
            Self {
                a: self.a / len,
                b: self.b / len,
                c: self.c / len,
                d: self.d / len,
            }
        } else {
            self
        }
    }

    /// True if the plane has no usable normal.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.a * self.a + self.b * self.b + self.c * self.c > 0.0)
    }

    /// Returns the signed distance from a point to the plane.
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, p: [f32; 3]) -> f32 {
        self.a * p[0] + self.b * p[1] + self.c * p[2] + self.d
    }

    /// True if the box lies entirely on the negative side of the plane.
    #[inline]
    #[must_use]
    pub fn excludes(&self, aabb: &Aabb) -> bool {
        let center = aabb.center();
        let half = aabb.half_extents();

        // Projection interval radius of the box onto the plane normal
        let r = half[0] * self.a.abs() + half[1] * self.b.abs() + half[2] * self.c.abs();

        self.distance_to_point(center) < -r
    }

    /// Converts to array format.
    #[must_use]
    pub const fn as_array(&self) -> [f32; 4] {
        [self.a, self.b, self.c, self.d]
    }
}

/// View frustum for culling.
///
/// The default frustum has six zero planes and is degenerate: nothing is
/// inside it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Plane indices.
    pub const LEFT: usize = 0;
    /// Right plane index.
    pub const RIGHT: usize = 1;
    /// Bottom plane index.
    pub const BOTTOM: usize = 2;
    /// Top plane index.
    pub const TOP: usize = 3;
    /// Near plane index.
    pub const NEAR: usize = 4;
    /// Far plane index.
    pub const FAR: usize = 5;

    /// Extracts frustum planes from a view-projection matrix.
    ///
    /// The matrix is column-major with zero-to-one clip depth, so the near
    /// plane is row 2 alone rather than row 3 + row 2.
    #[must_use]
    pub fn from_view_projection(m: &Mat4) -> Self {
        let row = |r: usize| [m[0][r], m[1][r], m[2][r], m[3][r]];
        let combine = |x: [f32; 4], y: [f32; 4], sign: f32| {
            Plane::new(
                x[0] + sign * y[0],
                x[1] + sign * y[1],
                x[2] + sign * y[2],
                x[3] + sign * y[3],
            )
            .normalized()
        };

        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let mut planes = [Plane::default(); 6];
        planes[Self::LEFT] = combine(r3, r0, 1.0);
        planes[Self::RIGHT] = combine(r3, r0, -1.0);
        planes[Self::BOTTOM] = combine(r3, r1, 1.0);
        planes[Self::TOP] = combine(r3, r1, -1.0);
        planes[Self::NEAR] = Plane::new(r2[0], r2[1], r2[2], r2[3]).normalized();
        planes[Self::FAR] = combine(r3, r2, -1.0);

        Self { planes }
    }

    /// True if any plane has no normal; such a frustum contains nothing.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.planes.iter().any(Plane::is_degenerate)
    }

    /// Converts planes to array format for GPU upload.
    #[must_use]
    pub fn as_arrays(&self) -> [[f32; 4]; 6] {
        self.planes.map(|p| p.as_array())
    }
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner.
    pub min: [f32; 3],
    /// Maximum corner.
    pub max: [f32; 3],
}

impl Aabb {
    /// Creates a new AABB.
    #[must_use]
    pub const fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// A box of the given half size around `center`.
    #[must_use]
    pub fn from_center(center: [f32; 3], half: [f32; 3]) -> Self {
        Self {
            min: [center[0] - half[0], center[1] - half[1], center[2] - half[2]],
            max: [center[0] + half[0], center[1] + half[1], center[2] + half[2]],
        }
    }

    /// True if `min > max` on any axis, or any coordinate is NaN.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        (0..3).any(|i| !(self.min[i] <= self.max[i]))
    }

    /// Returns the center of the AABB.
    #[must_use]
    pub fn center(&self) -> [f32; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    /// Returns the half-extents of the AABB.
    #[must_use]
    pub fn half_extents(&self) -> [f32; 3] {
        [
            (self.max[0] - self.min[0]) * 0.5,
            (self.max[1] - self.min[1]) * 0.5,
            (self.max[2] - self.min[2]) * 0.5,
        ]
    }

    /// The eight corners.
    #[must_use]
    pub fn corners(&self) -> [[f32; 3]; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            [lo[0], lo[1], lo[2]],
            [hi[0], lo[1], lo[2]],
            [lo[0], hi[1], lo[2]],
            [hi[0], hi[1], lo[2]],
            [lo[0], lo[1], hi[2]],
            [hi[0], lo[1], hi[2]],
            [lo[0], hi[1], hi[2]],
            [hi[0], hi[1], hi[2]],
        ]
    }
}
