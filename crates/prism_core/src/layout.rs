//! GPU-shared data layouts.
//!
//! Every struct here is `#[repr(C)]` and `Pod`, byte-compatible with the
//! shader-side declarations. Vectors are padded to 16 bytes where the
//! shader expects it.
//!
//! "Index or none" is encoded as a signed 32-bit index with
//! [`NONE_INDEX`] (`-1`) meaning none. [`crate::SceneSnapshot`] guarantees
//! every table fits this encoding.

use bytemuck::{Pod, Zeroable};

use crate::bounds::Plane;
use crate::scene::{Instance, Light, Material, Mesh, Submesh};

/// GPU encoding of an absent index.
pub const NONE_INDEX: i32 = -1;

/// Encodes an optional index for the GPU.
#[inline]
#[must_use]
pub fn encode_index(index: Option<u32>) -> i32 {
    match index {
        Some(i) => {
            debug_assert!(i32::try_from(i).is_ok(), "index {i} exceeds GPU encoding");
            i as i32
        }
        None => NONE_INDEX,
    }
}

/// Decodes a GPU index; any negative value is none.
#[inline]
#[must_use]
pub fn decode_index(index: i32) -> Option<u32> {
    u32::try_from(index).ok()
}

/// Per-camera uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUniforms {
    /// Camera position (w unused).
    pub camera_position: [f32; 4],
    /// View matrix.
    pub view_matrix: [[f32; 4]; 4],
    /// Projection matrix.
    pub projection_matrix: [[f32; 4]; 4],
    /// Scene placement transform.
    pub scene_transform: [[f32; 4]; 4],
    /// Frustum planes (ABCD each).
    pub frustum_planes: [[f32; 4]; 6],
    /// Clip planes; a disabled plane is `(0, 0, 0, 1)`.
    pub clip_planes: [[f32; 4]; 6],
}

/// Per-frame uniforms, two camera slots for stereo.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// Camera slots; slot 1 is zeroed for mono frames.
    pub cameras: [CameraUniforms; 2],
    /// Viewport size in points.
    pub viewport_size: [f32; 2],
    /// Drawable size in pixels.
    pub physical_resolution: [u32; 2],
    /// Number of lights to shade with.
    pub light_count: u32,
    /// Depth testing enabled (0/1).
    pub enable_depth_testing: u32,
    /// Contribution culling enabled (0/1).
    pub enable_contribution_testing: u32,
    /// Contribution threshold as a viewport fraction.
    pub min_contribution_area: f32,
    /// X-ray mode (0/1).
    pub xray: u32,
    /// Number of populated camera slots.
    pub camera_count: u32,
    /// Padding.
    pub _pad: [u32; 2],
}

/// Per-instance record, used both for the scene table and the compacted
/// per-frame instance buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuInstance {
    /// World transform.
    pub matrix: [[f32; 4]; 4],
    /// Bounds minimum.
    pub min_bounds: [f32; 3],
    /// Stable instance identity.
    pub index: u32,
    /// Bounds maximum.
    pub max_bounds: [f32; 3],
    /// Color override row, or `-1`.
    pub color_index: i32,
    /// `InstanceState` discriminant.
    pub state: i32,
    /// Parent position, or `-1`.
    pub parent: i32,
    /// Mesh index, or `-1`.
    pub mesh: i32,
    /// `InstanceFlags` bits.
    pub flags: u32,
    /// Transparent (0/1).
    pub transparent: u32,
    /// Padding.
    pub _pad: [u32; 3],
}

impl From<&Instance> for GpuInstance {
    fn from(instance: &Instance) -> Self {
        Self {
            matrix: instance.matrix,
            min_bounds: instance.bounds.min,
            index: instance.index,
            max_bounds: instance.bounds.max,
            color_index: encode_index(instance.color_index),
            state: instance.state as i32,
            parent: encode_index(instance.parent),
            mesh: encode_index(instance.mesh),
            flags: instance.flags.bits(),
            transparent: u32::from(instance.transparent),
            _pad: [0; 3],
        }
    }
}

/// Per-material uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuMaterial {
    /// RGBA diffuse color.
    pub diffuse_color: [f32; 4],
    /// Glossiness.
    pub glossiness: f32,
    /// Smoothness.
    pub smoothness: f32,
    /// Padding.
    pub _pad: [f32; 2],
}

impl From<&Material> for GpuMaterial {
    fn from(material: &Material) -> Self {
        Self {
            diffuse_color: material.diffuse_color,
            glossiness: material.glossiness,
            smoothness: material.smoothness,
            _pad: [0.0; 2],
        }
    }
}

/// Mesh record: submesh range.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuMesh {
    /// First submesh.
    pub submeshes_lower: u32,
    /// One past the last submesh.
    pub submeshes_upper: u32,
}

impl From<&Mesh> for GpuMesh {
    fn from(mesh: &Mesh) -> Self {
        Self {
            submeshes_lower: mesh.submeshes.lower_bound,
            submeshes_upper: mesh.submeshes.upper_bound,
        }
    }
}

/// Submesh record: material and face range.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuSubmesh {
    /// Material index, or `-1`.
    pub material: i32,
    /// First index.
    pub indices_lower: u32,
    /// One past the last index.
    pub indices_upper: u32,
    /// Padding.
    pub _pad: u32,
}

impl From<&Submesh> for GpuSubmesh {
    fn from(submesh: &Submesh) -> Self {
        Self {
            material: encode_index(submesh.material),
            indices_lower: submesh.indices.lower_bound,
            indices_upper: submesh.indices.upper_bound,
            _pad: 0,
        }
    }
}

/// Light record.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// Position (w unused).
    pub position: [f32; 4],
    /// Diffuse color (w unused).
    pub color: [f32; 4],
    /// Specular color (w unused).
    pub specular_color: [f32; 4],
    /// Attenuation (w unused).
    pub attenuation: [f32; 4],
    /// `LightKind` discriminant.
    pub kind: i32,
    /// Range of influence.
    pub radius: f32,
    /// Inner cone angle.
    pub cone_inner_angle: f32,
    /// Outer cone angle.
    pub cone_outer_angle: f32,
}

impl From<&Light> for GpuLight {
    fn from(light: &Light) -> Self {
        let pad = |v: [f32; 3]| [v[0], v[1], v[2], 0.0];
        Self {
            position: pad(light.position),
            color: pad(light.color),
            specular_color: pad(light.specular_color),
            attenuation: pad(light.attenuation),
            kind: light.kind as i32,
            radius: light.radius,
            cone_inner_angle: light.cone_inner_angle,
            cone_outer_angle: light.cone_outer_angle,
        }
    }
}

/// One instanced draw: `instance_count` instances of `mesh` starting at
/// `base_instance` in the compacted instance buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GpuInstancedMesh {
    /// Mesh index.
    pub mesh: u32,
    /// Transparent (0/1).
    pub transparent: u32,
    /// Number of instances.
    pub instance_count: u32,
    /// Offset into the compacted instance buffer.
    pub base_instance: u32,
}

/// Encodes a clip plane slot.
#[must_use]
pub fn encode_clip_plane(plane: Option<Plane>) -> [f32; 4] {
    plane.unwrap_or(Plane::ALWAYS_INSIDE).as_array()
}
