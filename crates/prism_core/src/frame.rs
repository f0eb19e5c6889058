//! Per-frame camera state.
//!
//! A [`Frame`] holds one camera, or two for stereo, sharing a single
//! viewport and one set of render options. Frames are rebuilt every frame
//! and never mutated after construction.

use crate::bounds::{Frustum, Plane};
use crate::config::RenderOptions;
use crate::error::FrameError;
use crate::layout::{encode_clip_plane, CameraUniforms, FrameUniforms};
use crate::math::{mul, Mat4, IDENTITY};

/// Maximum cameras per frame.
pub const MAX_CAMERAS: usize = 2;

/// Number of clip plane slots per camera.
pub const CLIP_PLANE_COUNT: usize = 6;

/// A camera as seen by culling and shading.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// World position.
    pub position: [f32; 3],
    /// View matrix.
    pub view_matrix: Mat4,
    /// Projection matrix.
    pub projection_matrix: Mat4,
    /// Scene placement transform, applied before the view.
    pub scene_transform: Mat4,
    view_projection: Mat4,
    frustum: Frustum,
    clip_planes: [Option<Plane>; CLIP_PLANE_COUNT],
}

impl Camera {
    /// Builds a camera and derives its frustum from
    /// `projection * view * scene_transform`.
    #[must_use]
    pub fn new(position: [f32; 3], view_matrix: Mat4, projection_matrix: Mat4, scene_transform: Mat4) -> Self {
        let view_projection = mul(&mul(&projection_matrix, &view_matrix), &scene_transform);
        Self {
            position,
            view_matrix,
            projection_matrix,
            scene_transform,
            view_projection,
            frustum: Frustum::from_view_projection(&view_projection),
            clip_planes: [None; CLIP_PLANE_COUNT],
        }
    }

    /// A camera with no scene transform.
    #[must_use]
    pub fn from_view(position: [f32; 3], view_matrix: Mat4, projection_matrix: Mat4) -> Self {
        Self::new(position, view_matrix, projection_matrix, IDENTITY)
    }

    /// Replaces the frustum planes, e.g. with planes computed elsewhere.
    #[must_use]
    pub fn with_frustum(mut self, frustum: Frustum) -> Self {
        self.frustum = frustum;
        self
    }

    /// Enables clip plane `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ClipPlaneSlot`] if `slot >= CLIP_PLANE_COUNT`.
    pub fn with_clip_plane(mut self, slot: usize, plane: Plane) -> Result<Self, FrameError> {
        self.set_clip_plane(slot, Some(plane))?;
        Ok(self)
    }

    /// Enables or disables clip plane `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ClipPlaneSlot`] if `slot >= CLIP_PLANE_COUNT`.
    pub fn set_clip_plane(&mut self, slot: usize, plane: Option<Plane>) -> Result<(), FrameError> {
        let entry = self
            .clip_planes
            .get_mut(slot)
            .ok_or(FrameError::ClipPlaneSlot(slot))?;
        *entry = plane;
        Ok(())
    }

    /// Disables clip plane `slot`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::ClipPlaneSlot`] if `slot >= CLIP_PLANE_COUNT`.
    pub fn clear_clip_plane(&mut self, slot: usize) -> Result<(), FrameError> {
        self.set_clip_plane(slot, None)
    }

    /// Combined `projection * view * scene_transform`.
    #[must_use]
    pub fn view_projection(&self) -> &Mat4 {
        &self.view_projection
    }

    /// Frustum planes, in the same space as instance bounds.
    #[must_use]
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Clip plane slots; `None` is disabled.
    #[must_use]
    pub fn clip_planes(&self) -> &[Option<Plane>; CLIP_PLANE_COUNT] {
        &self.clip_planes
    }

    /// Enabled clip planes.
    pub fn active_clip_planes(&self) -> impl Iterator<Item = &Plane> {
        self.clip_planes.iter().flatten()
    }

    /// GPU uniforms for this camera.
    #[must_use]
    pub fn to_uniforms(&self) -> CameraUniforms {
        CameraUniforms {
            camera_position: [self.position[0], self.position[1], self.position[2], 1.0],
            view_matrix: self.view_matrix,
            projection_matrix: self.projection_matrix,
            scene_transform: self.scene_transform,
            frustum_planes: self.frustum.as_arrays(),
            clip_planes: self.clip_planes.map(encode_clip_plane),
        }
    }
}

/// Viewport shared by every camera of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Size in points.
    pub size: [f32; 2],
    /// Drawable size in pixels.
    pub physical_resolution: [u32; 2],
}

impl Viewport {
    /// A viewport whose point and pixel sizes match.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: [width as f32, height as f32],
            physical_resolution: [width, height],
        }
    }
}

/// Everything culling needs to know about one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    number: u64,
    cameras: Vec<Camera>,
    viewport: Viewport,
    light_count: u32,
    options: RenderOptions,
}

impl Frame {
    /// Builds and validates a frame.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] for a camera count other than 1 or 2, a
    /// non-positive viewport, or an unusable contribution threshold.
    pub fn new(
        number: u64,
        cameras: Vec<Camera>,
        viewport: Viewport,
        light_count: u32,
        options: RenderOptions,
    ) -> Result<Self, FrameError> {
        if cameras.is_empty() || cameras.len() > MAX_CAMERAS {
            return Err(FrameError::CameraCount(cameras.len()));
        }
        let [width, height] = viewport.size;
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(FrameError::InvalidViewport { width, height });
        }
        if options.validate().is_err() {
            return Err(FrameError::InvalidContributionArea(options.min_contribution_area));
        }
        Ok(Self {
            number,
            cameras,
            viewport,
            light_count,
            options,
        })
    }

    /// Frame number.
    #[must_use]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// The one or two cameras.
    #[must_use]
    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    /// True for two-camera frames.
    #[must_use]
    pub fn is_stereo(&self) -> bool {
        self.cameras.len() == 2
    }

    /// Shared viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Number of lights to shade with.
    #[must_use]
    pub fn light_count(&self) -> u32 {
        self.light_count
    }

    /// Render-mode options.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// GPU uniforms for this frame.
    #[must_use]
    pub fn to_uniforms(&self) -> FrameUniforms {
        let mut cameras = [CameraUniforms::default(); MAX_CAMERAS];
        for (slot, camera) in cameras.iter_mut().zip(&self.cameras) {
            *slot = camera.to_uniforms();
        }
        FrameUniforms {
            cameras,
            viewport_size: self.viewport.size,
            physical_resolution: self.viewport.physical_resolution,
            light_count: self.light_count,
            enable_depth_testing: u32::from(self.options.enable_depth_testing),
            enable_contribution_testing: u32::from(self.options.enable_contribution_testing),
            min_contribution_area: self.options.min_contribution_area,
            xray: u32::from(self.options.xray),
            camera_count: self.cameras.len() as u32,
            _pad: [0; 2],
        }
    }
}
