//! Culling pipeline orchestration.
//!
//! Chains, per camera: cull → group → assemble. The two cameras of a
//! stereo frame run concurrently; they share only the read-only scene and
//! the hidden-state resolution.

mod frame;
mod stats;

pub use frame::{CameraOutput, FrameOutput};
pub use stats::RenderStats;

use std::time::Instant;

use parking_lot::{Mutex, RwLockReadGuard};
use prism_core::{Camera, CompletionHandle, Frame, FrameError, FrameSlots, FrameTicket, SceneSnapshot, Viewport};

use crate::assembly::assemble_into;
use crate::bindings::BindingTable;
use crate::config::PipelineConfig;
use crate::culling::{HiddenResolver, VisibilityKernel};
use crate::error::{AssemblyError, PipelineError, PipelineResult};
use crate::frame_state::FrameStateManager;
use crate::grouping::MeshGroups;

/// Per-frame culling and indirect draw assembly.
///
/// ## Usage
///
/// ```rust,ignore
/// let pipeline = CullingPipeline::new(PipelineConfig::default())?;
/// let completions = pipeline.completion_handle();
///
/// let ticket = pipeline.run(&scene, &frame)?;
/// if let Some(output) = pipeline.read(ticket) {
///     upload(&output);
/// }
/// completions.signal(ticket); // once the GPU is done with the slot
/// ```
pub struct CullingPipeline {
    config: PipelineConfig,
    kernel: VisibilityKernel,
    bindings: BindingTable,
    /// Double-buffered outputs.
    outputs: FrameSlots<FrameOutput>,
    /// Statistics of the last prepared frame.
    stats: Mutex<RenderStats>,
}

impl CullingPipeline {
    /// Creates a pipeline against [`BindingTable::CURRENT`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for an invalid configuration.
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        Self::with_bindings(config, BindingTable::CURRENT)
    }

    /// Creates a pipeline against a specific binding table.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for an invalid configuration or
    /// [`PipelineError::Binding`] for a malformed binding table.
    pub fn with_bindings(config: PipelineConfig, bindings: BindingTable) -> PipelineResult<Self> {
        config.validate()?;
        bindings.validate()?;
        Ok(Self {
            config,
            kernel: VisibilityKernel::new().with_parallel_threshold(config.parallel_threshold),
            bindings,
            outputs: FrameSlots::new(config.frame_slots, FrameOutput::default)?,
            stats: Mutex::new(RenderStats::default()),
        })
    }

    /// A frame state manager using this pipeline's slot count, options and
    /// acquire timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::Sync`] if the slot count is below 2.
    pub fn frame_state_manager(&self, viewport: Viewport) -> Result<FrameStateManager, FrameError> {
        Ok(FrameStateManager::new(self.config.frame_slots, viewport, self.config.options)?
            .with_acquire_timeout(self.config.acquire_timeout()))
    }

    /// Pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Binding table outputs are laid out against.
    #[must_use]
    pub fn bindings(&self) -> BindingTable {
        self.bindings
    }

    /// Statistics of the last successfully prepared frame.
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        *self.stats.lock()
    }

    /// Culls, groups and assembles every camera of `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightCountOutOfRange`] if the frame shades
    /// with more lights than the scene holds, or
    /// [`PipelineError::Assembly`] if the assembled draws fail verification.
    pub fn prepare(&self, scene: &SceneSnapshot, frame: &Frame) -> PipelineResult<FrameOutput> {
        let mut output = FrameOutput::default();
        self.prepare_into(scene, frame, &mut output)?;
        Ok(output)
    }

    /// Like [`CullingPipeline::prepare`], writing into the next free output
    /// slot. A rejected frame leaves no slot in flight.
    ///
    /// # Errors
    ///
    /// As [`CullingPipeline::prepare`], plus [`PipelineError::Sync`] if no
    /// slot frees up within the acquire timeout.
    pub fn run(&self, scene: &SceneSnapshot, frame: &Frame) -> PipelineResult<FrameTicket> {
        let mut writer = self.outputs.begin_frame(self.config.acquire_timeout())?;
        self.prepare_into(scene, frame, &mut writer)?;
        Ok(writer.submit())
    }

    /// Output of a submitted frame the GPU has not yet completed.
    #[must_use]
    pub fn read(&self, ticket: FrameTicket) -> Option<RwLockReadGuard<'_, FrameOutput>> {
        self.outputs.read(ticket)
    }

    /// Handle the GPU side uses to release output slots.
    #[must_use]
    pub fn completion_handle(&self) -> CompletionHandle {
        self.outputs.completion_handle()
    }

    /// Outputs submitted but not yet completed.
    #[must_use]
    pub fn frames_in_flight(&self) -> usize {
        self.outputs.frames_in_flight()
    }

    fn prepare_into(&self, scene: &SceneSnapshot, frame: &Frame, out: &mut FrameOutput) -> PipelineResult<()> {
        let started = Instant::now();

        let available = scene.lights().len();
        if frame.light_count() as usize > available {
            tracing::warn!(
                frame = frame.number(),
                requested = frame.light_count(),
                available,
                "frame rejected: light count out of range"
            );
            return Err(PipelineError::LightCountOutOfRange {
                requested: frame.light_count(),
                available,
            });
        }

        let hidden = HiddenResolver::resolve(scene.instances());
        let process = |camera: &Camera, output: &mut CameraOutput| -> Result<(), AssemblyError> {
            let camera_started = Instant::now();
            output.survivors = self.kernel.evaluate_with(scene, &hidden, frame, camera);
            let groups = MeshGroups::build(
                scene,
                output.survivors.positions(),
                camera,
                self.config.transparent_order,
            );
            assemble_into(scene, &groups, frame.options(), &mut output.draws);
            output.draws.verify()?;
            output.stats = RenderStats::for_camera(output.survivors.stats(), &output.draws);
            output.stats.prepare_time_ms = camera_started.elapsed().as_secs_f32() * 1000.0;
            Ok(())
        };

        out.frame_number = frame.number();
        out.bindings = self.bindings;
        out.color_count = scene.colors().len() as u32;
        out.cameras.resize_with(frame.cameras().len(), CameraOutput::default);

        match (frame.cameras(), out.cameras.as_mut_slice()) {
            ([left, right], [left_out, right_out]) if self.config.parallel_cameras => {
                let (left_result, right_result) = rayon::join(
                    || process(left, left_out),
                    || process(right, right_out),
                );
                left_result?;
                right_result?;
            }
            (cameras, outputs) => {
                for (camera, output) in cameras.iter().zip(outputs.iter_mut()) {
                    process(camera, output)?;
                }
            }
        }

        let mut stats = out.stats();
        stats.prepare_time_ms = started.elapsed().as_secs_f32() * 1000.0;
        *self.stats.lock() = stats;

        tracing::debug!(
            frame = out.frame_number,
            cameras = stats.cameras,
            survivors = stats.cull.visible,
            draws = stats.full_draws,
            depth_only = stats.depth_only_draws,
            "frame prepared"
        );
        Ok(())
    }
}
