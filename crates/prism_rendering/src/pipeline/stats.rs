//! Rendering statistics.

use crate::assembly::DrawOutput;
use crate::culling::CullStats;

/// Statistics from one camera, or aggregated over a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    /// Cameras covered.
    pub cameras: u32,
    /// Per-reason cull counters.
    pub cull: CullStats,
    /// Full-stream draws.
    pub full_draws: u32,
    /// Depth-only draws.
    pub depth_only_draws: u32,
    /// Transparent groups.
    pub transparent_groups: u32,
    /// Instances written to the compacted buffer.
    pub instances: u32,
    /// Instances shading from the color override table.
    pub color_overrides: u32,
    /// CPU time spent preparing, in milliseconds.
    pub prepare_time_ms: f32,
}

impl RenderStats {
    /// Statistics for one camera's cull and assembly.
    #[must_use]
    pub fn for_camera(cull: &CullStats, draws: &DrawOutput) -> Self {
        Self {
            cameras: 1,
            cull: *cull,
            full_draws: draws.full.len() as u32,
            depth_only_draws: draws.depth_only.len() as u32,
            transparent_groups: draws
                .instanced_meshes
                .iter()
                .filter(|m| m.transparent != 0)
                .count() as u32,
            instances: draws.instance_count(),
            color_overrides: draws.color_override_count,
            prepare_time_ms: 0.0,
        }
    }

    /// Adds another camera's statistics.
    pub fn merge(&mut self, other: &Self) {
        self.cameras += other.cameras;
        self.cull.merge(&other.cull);
        self.full_draws += other.full_draws;
        self.depth_only_draws += other.depth_only_draws;
        self.transparent_groups += other.transparent_groups;
        self.instances += other.instances;
        self.color_overrides += other.color_overrides;
    }

    /// Fraction of tested instances that were culled.
    #[must_use]
    pub fn cull_rate(&self) -> f32 {
        if self.cull.tested > 0 {
            self.cull.culled() as f32 / self.cull.tested as f32
        } else {
            0.0
        }
    }

    /// Returns true if anything was drawn.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.full_draws > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cull_rate() {
        let stats = RenderStats {
            cull: CullStats { tested: 4, visible: 1, frustum: 3, ..CullStats::default() },
            ..RenderStats::default()
        };
        assert!((stats.cull_rate() - 0.75).abs() < f32::EPSILON);
        assert!(RenderStats::default().cull_rate().abs() < f32::EPSILON);
    }

    #[test]
    fn test_merge() {
        let eye = RenderStats {
            cameras: 1,
            full_draws: 2,
            instances: 5,
            cull: CullStats { tested: 6, visible: 5, hidden: 1, ..CullStats::default() },
            ..RenderStats::default()
        };
        let mut total = RenderStats::default();
        total.merge(&eye);
        total.merge(&eye);
        assert_eq!(total.cameras, 2);
        assert_eq!(total.full_draws, 4);
        assert_eq!(total.instances, 10);
        assert_eq!(total.cull.hidden, 2);
        assert!(total.has_content());
    }
}
