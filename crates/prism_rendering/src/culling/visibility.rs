//! Per-camera visibility kernel.

use prism_core::{Camera, Frame, InstanceState, SceneSnapshot};
use rayon::prelude::*;

use super::contribution::contribution_area;
use super::hidden::HiddenResolver;

/// Outcome of testing one instance against one camera.
///
/// Checks run in declaration order; the first failing check decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// Drawn.
    Visible,
    /// No mesh to draw.
    NoGeometry,
    /// Hidden itself or through a hidden ancestor.
    Hidden,
    /// Isolation mode is active and the instance is not isolated.
    NotIsolated,
    /// Inverted/NaN bounds, or a frustum with a zero-normal plane.
    Degenerate,
    /// Entirely outside a frustum plane.
    Frustum,
    /// Entirely outside an enabled clip plane.
    ClipPlane,
    /// Projected area below the contribution threshold.
    Contribution,
}

/// Per-reason cull counters for one camera.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    /// Instances tested.
    pub tested: u32,
    /// Instances that survived.
    pub visible: u32,
    /// Skipped for having no mesh.
    pub no_geometry: u32,
    /// Culled as hidden.
    pub hidden: u32,
    /// Culled by isolation mode.
    pub not_isolated: u32,
    /// Culled for degenerate bounds or frustum.
    pub degenerate: u32,
    /// Culled by the frustum.
    pub frustum: u32,
    /// Culled by a clip plane.
    pub clip_plane: u32,
    /// Culled by the contribution test.
    pub contribution: u32,
}

impl CullStats {
    /// Counts one verdict.
    pub fn record(&mut self, verdict: Verdict) {
        self.tested += 1;
        let counter = match verdict {
            Verdict::Visible => &mut self.visible,
            Verdict::NoGeometry => &mut self.no_geometry,
            Verdict::Hidden => &mut self.hidden,
            Verdict::NotIsolated => &mut self.not_isolated,
            Verdict::Degenerate => &mut self.degenerate,
            Verdict::Frustum => &mut self.frustum,
            Verdict::ClipPlane => &mut self.clip_plane,
            Verdict::Contribution => &mut self.contribution,
        };
        *counter += 1;
    }

    /// Instances that did not survive.
    #[must_use]
    pub fn culled(&self) -> u32 {
        self.tested - self.visible
    }

    /// Adds another camera's counters.
    pub fn merge(&mut self, other: &Self) {
        self.tested += other.tested;
        self.visible += other.visible;
        self.no_geometry += other.no_geometry;
        self.hidden += other.hidden;
        self.not_isolated += other.not_isolated;
        self.degenerate += other.degenerate;
        self.frustum += other.frustum;
        self.clip_plane += other.clip_plane;
        self.contribution += other.contribution;
    }
}

/// Surviving instance positions for one camera, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurvivorList {
    positions: Vec<u32>,
    stats: CullStats,
}

impl SurvivorList {
    /// Positions into the scene's instance table.
    #[must_use]
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Number of survivors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True if nothing survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// True if the instance at `position` survived.
    #[must_use]
    pub fn contains(&self, position: u32) -> bool {
        self.positions.binary_search(&position).is_ok()
    }

    /// Cull counters.
    #[must_use]
    pub fn stats(&self) -> &CullStats {
        &self.stats
    }
}

/// Visibility kernel: a pure function of scene, frame and camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityKernel {
    parallel_threshold: usize,
}

impl VisibilityKernel {
    /// Instance count from which evaluation runs data-parallel by default.
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4096;

    /// Creates a kernel with the default parallel threshold.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            parallel_threshold: Self::DEFAULT_PARALLEL_THRESHOLD,
        }
    }

    /// Sets the instance count from which evaluation runs data-parallel.
    #[must_use]
    pub const fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    /// Evaluates every instance against `camera`.
    ///
    /// Resolves hierarchical hiding on each call; use
    /// [`VisibilityKernel::evaluate_with`] to share one resolution between
    /// cameras.
    #[must_use]
    pub fn evaluate(&self, scene: &SceneSnapshot, frame: &Frame, camera: &Camera) -> SurvivorList {
        let hidden = HiddenResolver::resolve(scene.instances());
        self.evaluate_with(scene, &hidden, frame, camera)
    }

    /// Evaluates every instance against `camera` with pre-resolved hiding.
    #[must_use]
    pub fn evaluate_with(
        &self,
        scene: &SceneSnapshot,
        hidden: &HiddenResolver,
        frame: &Frame,
        camera: &Camera,
    ) -> SurvivorList {
        let count = scene.instances().len();
        let verdict_of = |position: usize| classify(scene, hidden, frame, camera, position);

        // Indexed collect keeps instance order
        let verdicts: Vec<Verdict> = if count >= self.parallel_threshold {
            (0..count).into_par_iter().map(verdict_of).collect()
        } else {
            (0..count).map(verdict_of).collect()
        };

        let mut stats = CullStats::default();
        let mut positions = Vec::with_capacity(count);
        for (position, verdict) in verdicts.into_iter().enumerate() {
            stats.record(verdict);
            if verdict == Verdict::Visible {
                positions.push(position as u32);
            }
        }

        tracing::trace!(
            tested = stats.tested,
            visible = stats.visible,
            frustum = stats.frustum,
            hidden = stats.hidden,
            "camera culled"
        );

        SurvivorList { positions, stats }
    }
}

impl Default for VisibilityKernel {
    fn default() -> Self {
        Self::new()
    }
}

/// Tests the instance at `position` against `camera`.
///
/// # Panics
///
/// Panics if `position` is not a valid instance position.
#[must_use]
pub fn classify(
    scene: &SceneSnapshot,
    hidden: &HiddenResolver,
    frame: &Frame,
    camera: &Camera,
    position: usize,
) -> Verdict {
    let instance = &scene.instances()[position];

    if instance.mesh.is_none() {
        return Verdict::NoGeometry;
    }
    if hidden.is_hidden(position) {
        return Verdict::Hidden;
    }
    if scene.isolation_active() && instance.state != InstanceState::Isolated {
        return Verdict::NotIsolated;
    }

    let bounds = &instance.bounds;
    let frustum = camera.frustum();
    if bounds.is_degenerate() || frustum.is_degenerate() {
        return Verdict::Degenerate;
    }
    if frustum.planes.iter().any(|plane| plane.excludes(bounds)) {
        return Verdict::Frustum;
    }
    if camera.active_clip_planes().any(|plane| plane.excludes(bounds)) {
        return Verdict::ClipPlane;
    }

    let options = frame.options();
    if options.enable_contribution_testing
        && contribution_area(camera.view_projection(), bounds) < options.min_contribution_area
    {
        return Verdict::Contribution;
    }

    Verdict::Visible
}

/// Culls every camera of `frame`, resolving hiding once.
///
/// The two cameras of a stereo frame share no mutable state and are
/// evaluated concurrently.
#[must_use]
pub fn cull_frame(kernel: &VisibilityKernel, scene: &SceneSnapshot, frame: &Frame) -> Vec<SurvivorList> {
    let hidden = HiddenResolver::resolve(scene.instances());
    match frame.cameras() {
        [left, right] => {
            let (left, right) = rayon::join(
                || kernel.evaluate_with(scene, &hidden, frame, left),
                || kernel.evaluate_with(scene, &hidden, frame, right),
            );
            vec![left, right]
        }
        cameras => cameras
            .iter()
            .map(|camera| kernel.evaluate_with(scene, &hidden, frame, camera))
            .collect(),
    }
}
