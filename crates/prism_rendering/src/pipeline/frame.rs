//! Per-frame pipeline output.
//!
//! Produced by `CullingPipeline::prepare` (or written into an output slot
//! by `CullingPipeline::run`) and consumed by the rasterization stage.

use super::RenderStats;
use crate::assembly::DrawOutput;
use crate::bindings::BindingTable;
use crate::culling::SurvivorList;

/// Culling and draw data for one camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CameraOutput {
    /// Surviving instance positions.
    pub survivors: SurvivorList,
    /// Compacted instances and command streams.
    pub draws: DrawOutput,
    /// Statistics for this camera.
    pub stats: RenderStats,
}

/// Everything needed to render one frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameOutput {
    /// Number of the frame this output was built for.
    pub frame_number: u64,
    /// Binding table the buffers are laid out against.
    pub bindings: BindingTable,
    /// Rows in the color override table bound at `LogicalBuffer::Colors`;
    /// every non-negative `GpuInstance::color_index` is below it.
    pub color_count: u32,
    /// One entry per camera, in frame order.
    pub cameras: Vec<CameraOutput>,
}

impl FrameOutput {
    /// Aggregated statistics over all cameras.
    #[must_use]
    pub fn stats(&self) -> RenderStats {
        let mut total = RenderStats::default();
        for camera in &self.cameras {
            total.merge(&camera.stats);
            total.prepare_time_ms = total.prepare_time_ms.max(camera.stats.prepare_time_ms);
        }
        total
    }

    /// Returns true if any camera has draws.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.cameras.iter().any(|c| c.draws.has_content())
    }
}
