//! # Frame/Camera State
//!
//! Builds each frame's [`Frame`] record from the current camera(s),
//! viewport and render options, and publishes its uniforms into
//! multi-slot storage so the GPU can read frame N while frame N+1 is
//! written.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLockReadGuard;
use prism_core::math::{mul, translation, Mat4, IDENTITY};
use prism_core::{
    Camera, CompletionHandle, Frame, FrameError, FrameSlots, FrameTicket, FrameUniforms,
    RenderOptions, Viewport,
};

/// A head pose with two eyes.
///
/// Each eye sits half the interpupillary distance from the head along the
/// view-space x axis and shares the head's orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoRig {
    /// Head position in world space.
    pub head_position: [f32; 3],
    /// Head view matrix.
    pub head_view: Mat4,
    /// Left eye projection.
    pub left_projection: Mat4,
    /// Right eye projection.
    pub right_projection: Mat4,
    /// Distance between the eyes.
    pub interpupillary_distance: f32,
    /// Scene placement transform shared by both eyes.
    pub scene_transform: Mat4,
}

impl StereoRig {
    /// A rig with the same projection for both eyes.
    #[must_use]
    pub fn new(head_position: [f32; 3], head_view: Mat4, projection: Mat4, interpupillary_distance: f32) -> Self {
        Self {
            head_position,
            head_view,
            left_projection: projection,
            right_projection: projection,
            interpupillary_distance,
            scene_transform: IDENTITY,
        }
    }

    /// Left and right eye cameras.
    #[must_use]
    pub fn eye_cameras(&self) -> [Camera; 2] {
        let half = self.interpupillary_distance * 0.5;
        // Row 0 of the view rotation is the head's right axis in world space
        let right = [self.head_view[0][0], self.head_view[1][0], self.head_view[2][0]];
        let eye = |offset: f32, projection: Mat4| {
            let position = [
                self.head_position[0] + right[0] * offset,
                self.head_position[1] + right[1] * offset,
                self.head_position[2] + right[2] * offset,
            ];
            let view = mul(&translation(-offset, 0.0, 0.0), &self.head_view);
            Camera::new(position, view, projection, self.scene_transform)
        };
        [eye(-half, self.left_projection), eye(half, self.right_projection)]
    }
}

/// A published frame and the slot holding its uniforms.
#[derive(Debug, Clone)]
pub struct PublishedFrame {
    /// The frame record, shared with culling.
    pub frame: Arc<Frame>,
    /// Uniform slot ticket; signal it once the GPU is done.
    pub ticket: FrameTicket,
}

/// Owns the viewport and render options and publishes per-frame state.
pub struct FrameStateManager {
    slots: FrameSlots<FrameUniforms>,
    viewport: Viewport,
    options: RenderOptions,
    acquire_timeout: Duration,
}

impl FrameStateManager {
    /// Default wait for a free uniform slot.
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(100);

    /// Creates a manager with `slot_count` uniform slots.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Sync`] if `slot_count < 2`.
    pub fn new(slot_count: usize, viewport: Viewport, options: RenderOptions) -> Result<Self, FrameError> {
        Ok(Self {
            slots: FrameSlots::new(slot_count, FrameUniforms::default)?,
            viewport,
            options,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        })
    }

    /// Sets how long publishing waits for a free slot.
    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replaces the viewport used by later frames.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Current render options.
    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Replaces the render options used by later frames.
    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    /// Publishes a single-camera frame.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] if the frame is invalid or no uniform slot
    /// frees up in time. The frame is dropped and its number reused.
    pub fn publish_mono(&self, camera: Camera, light_count: u32) -> Result<PublishedFrame, FrameError> {
        self.publish(vec![camera], light_count)
    }

    /// Publishes a two-camera frame sharing one viewport and option set.
    ///
    /// # Errors
    ///
    /// As [`FrameStateManager::publish_mono`].
    pub fn publish_stereo(&self, left: Camera, right: Camera, light_count: u32) -> Result<PublishedFrame, FrameError> {
        self.publish(vec![left, right], light_count)
    }

    /// Publishes a stereo frame derived from a head pose.
    ///
    /// # Errors
    ///
    /// As [`FrameStateManager::publish_mono`].
    pub fn publish_rig(&self, rig: &StereoRig, light_count: u32) -> Result<PublishedFrame, FrameError> {
        let [left, right] = rig.eye_cameras();
        self.publish_stereo(left, right, light_count)
    }

    fn publish(&self, cameras: Vec<Camera>, light_count: u32) -> Result<PublishedFrame, FrameError> {
        let mut writer = self.slots.begin_frame(self.acquire_timeout)?;
        let frame = match Frame::new(writer.frame(), cameras, self.viewport, light_count, self.options) {
            Ok(frame) => frame,
            Err(err) => {
                tracing::warn!(frame = writer.frame(), %err, "frame rejected");
                return Err(err);
            }
        };

        *writer = frame.to_uniforms();
        let ticket = writer.submit();

        tracing::debug!(
            frame = ticket.frame,
            slot = ticket.slot,
            stereo = frame.is_stereo(),
            "frame published"
        );

        Ok(PublishedFrame {
            frame: Arc::new(frame),
            ticket,
        })
    }

    /// Uniforms of a published frame the GPU has not yet completed.
    #[must_use]
    pub fn uniforms(&self, ticket: FrameTicket) -> Option<RwLockReadGuard<'_, FrameUniforms>> {
        self.slots.read(ticket)
    }

    /// Handle the GPU side uses to signal frame completion.
    #[must_use]
    pub fn completion_handle(&self) -> CompletionHandle {
        self.slots.completion_handle()
    }

    /// Frames published but not yet completed.
    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.slots.frames_in_flight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::math::{look_at_rh, perspective_rh_zo, transform_point};
    use prism_core::SyncError;

    fn projection() -> Mat4 {
        perspective_rh_zo(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0)
    }

    fn camera() -> Camera {
        Camera::from_view([0.0; 3], look_at_rh([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]), projection())
    }

    fn manager(slots: usize) -> FrameStateManager {
        FrameStateManager::new(slots, Viewport::new(800, 600), RenderOptions::default())
            .unwrap()
            .with_acquire_timeout(Duration::from_millis(5))
    }

    #[test]
    fn test_single_slot_rejected() {
        assert!(matches!(
            FrameStateManager::new(1, Viewport::new(8, 8), RenderOptions::default()),
            Err(FrameError::Sync(SyncError::TooFewSlots(1)))
        ));
    }

    #[test]
    fn test_publish_mono() {
        let manager = manager(2);
        let published = manager.publish_mono(camera(), 3).unwrap();

        assert_eq!(published.frame.number(), 0);
        assert!(!published.frame.is_stereo());
        let uniforms = manager.uniforms(published.ticket).unwrap();
        assert_eq!(uniforms.camera_count, 1);
        assert_eq!(uniforms.light_count, 3);
        assert_eq!(uniforms.viewport_size, [800.0, 600.0]);
    }

    #[test]
    fn test_stereo_shares_viewport_and_options() {
        let mut manager = manager(2);
        manager.set_options(RenderOptions { xray: true, ..RenderOptions::default() });
        let published = manager.publish_stereo(camera(), camera(), 0).unwrap();

        assert!(published.frame.is_stereo());
        let uniforms = manager.uniforms(published.ticket).unwrap();
        assert_eq!(uniforms.camera_count, 2);
        assert_eq!(uniforms.xray, 1);
        assert_eq!(uniforms.cameras[0], uniforms.cameras[1]);
    }

    #[test]
    fn test_slots_rotate_on_completion() {
        let manager = manager(2);
        let completions = manager.completion_handle();

        let first = manager.publish_mono(camera(), 0).unwrap();
        let _second = manager.publish_mono(camera(), 0).unwrap();
        assert_eq!(manager.frames_in_flight(), 2);

        // Slot 0 is still being read
        assert!(matches!(
            manager.publish_mono(camera(), 0),
            Err(FrameError::Sync(SyncError::Timeout))
        ));

        completions.signal(first.ticket);
        let third = manager.publish_mono(camera(), 0).unwrap();
        assert_eq!(third.ticket.slot, 0);
        assert_eq!(third.frame.number(), 2);
    }

    #[test]
    fn test_invalid_frame_reuses_number() {
        let mut manager = manager(2);
        manager.set_viewport(Viewport { size: [0.0, 0.0], physical_resolution: [0, 0] });
        assert!(matches!(
            manager.publish_mono(camera(), 0),
            Err(FrameError::InvalidViewport { .. })
        ));

        manager.set_viewport(Viewport::new(64, 64));
        assert_eq!(manager.publish_mono(camera(), 0).unwrap().frame.number(), 0);
    }

    #[test]
    fn test_rig_offsets_eyes_along_right_axis() {
        let view = look_at_rh([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]);
        let rig = StereoRig::new([0.0; 3], view, projection(), 0.064);
        let [left, right] = rig.eye_cameras();

        assert!((left.position[0] + 0.032).abs() < 1e-6);
        assert!((right.position[0] - 0.032).abs() < 1e-6);

        // Each eye sees its own position at the view-space origin
        let origin = transform_point(&left.view_matrix, left.position);
        assert!(origin[0].abs() < 1e-6 && origin[2].abs() < 1e-6);

        let published = manager(2).publish_rig(&rig, 0).unwrap();
        assert!(published.frame.is_stereo());
    }
}
