//! # Culling Scenario Tests
//!
//! Hand-built scenes covering each culling rule: frustum, hidden state,
//! opaque/transparent splitting, contribution culling, isolation, parent
//! hiding, clip planes, stereo, and double-buffered outputs.

use std::thread;

use prism_core::math::{look_at_rh, perspective_rh_zo, translation};
use prism_core::{
    Aabb, BoundedRange, Camera, Frame, Instance, InstanceFlags, InstanceState, Material, Mesh, Plane,
    RenderOptions, SceneError, SceneSnapshot, SceneTables, Submesh, SyncError, Viewport,
};
use prism_rendering::{
    contribution_area, CullingPipeline, DrawCommand, DrawStream, FrameOutput, PipelineConfig,
    PipelineError, StereoRig, VisibilityKernel,
};

fn projection() -> [[f32; 4]; 4] {
    perspective_rh_zo(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0)
}

/// Camera at the origin looking down -z.
fn forward_camera() -> Camera {
    Camera::from_view(
        [0.0; 3],
        look_at_rh([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        projection(),
    )
}

/// Camera at the origin looking down +z.
fn backward_camera() -> Camera {
    Camera::from_view(
        [0.0; 3],
        look_at_rh([0.0; 3], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        projection(),
    )
}

/// Four single-submesh meshes; mesh 2 blends through its material.
fn scene(instances: Vec<Instance>) -> SceneSnapshot {
    SceneSnapshot::new(SceneTables {
        instances,
        meshes: (0..4).map(|m| Mesh { submeshes: BoundedRange::new(m, m + 1) }).collect(),
        submeshes: (0..4)
            .map(|s| Submesh {
                material: Some(u32::from(s == 2)),
                indices: BoundedRange::new(s * 3, s * 3 + 3),
            })
            .collect(),
        materials: vec![
            Material::default(),
            Material { diffuse_color: [1.0, 1.0, 1.0, 0.3], ..Material::default() },
        ],
        colors: vec![[1.0, 0.5, 0.0, 1.0]],
        index_count: 12,
        ..SceneTables::default()
    })
    .unwrap()
}

fn boxed(index: u32, mesh: Option<u32>, center: [f32; 3], half: f32) -> Instance {
    Instance::new(index, mesh, Aabb::from_center(center, [half; 3]))
}

fn mono(options: RenderOptions) -> Frame {
    Frame::new(0, vec![forward_camera()], Viewport::new(1024, 1024), 0, options).unwrap()
}

fn prepare(scene: &SceneSnapshot, frame: &Frame) -> FrameOutput {
    CullingPipeline::new(PipelineConfig::default())
        .unwrap()
        .prepare(scene, frame)
        .unwrap()
}

fn survivors(scene: &SceneSnapshot, frame: &Frame) -> Vec<u32> {
    prepare(scene, frame).cameras[0].survivors.positions().to_vec()
}

/// Test: Outside the frustum is culled, straddling the near plane is kept,
/// and a hidden copy of a visible instance is culled.
#[test]
fn test_frustum_and_hidden_scenario() {
    let outside = boxed(0, Some(0), [0.0, 0.0, 60.0], 1.0);
    let straddling = boxed(1, Some(0), [0.0, 0.0, -0.1], 0.5);
    let mut hidden = straddling.clone();
    hidden.index = 2;
    hidden.state = InstanceState::Hidden;

    let scene = scene(vec![outside, straddling, hidden]);
    let output = prepare(&scene, &mono(RenderOptions::default()));
    let camera = &output.cameras[0];

    assert_eq!(camera.survivors.positions(), &[1]);
    assert_eq!(camera.stats.cull.frustum, 1);
    assert_eq!(camera.stats.cull.hidden, 1);
}

/// Test: Hidden wins over Selected and Isolated.
#[test]
fn test_hidden_wins() {
    let mut selected_hidden = boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5);
    selected_hidden.state = InstanceState::Hidden;
    let mut isolated = boxed(1, Some(0), [0.0, 0.0, -5.0], 0.5);
    isolated.state = InstanceState::Isolated;
    let mut isolated_child = boxed(2, Some(0), [0.0, 0.0, -5.0], 0.5);
    isolated_child.state = InstanceState::Isolated;
    isolated_child.parent = Some(0);

    let scene = scene(vec![selected_hidden, isolated, isolated_child]);
    assert_eq!(survivors(&scene, &mono(RenderOptions::default())), vec![1]);
}

/// Test: An opaque and a flagged-transparent instance of one mesh form two
/// groups, opaque first.
#[test]
fn test_mesh_split_by_transparency() {
    let opaque = boxed(0, Some(3), [1.0, 0.0, -5.0], 0.5);
    let mut blended = boxed(1, Some(3), [-1.0, 0.0, -5.0], 0.5);
    blended.transparent = true;

    let scene = scene(vec![blended, opaque]);
    let output = prepare(&scene, &mono(RenderOptions::default()));
    let draws = &output.cameras[0].draws;

    assert_eq!(
        draws.full,
        vec![
            DrawCommand { mesh: 3, base_instance: 0, instance_count: 1 },
            DrawCommand { mesh: 3, base_instance: 1, instance_count: 1 },
        ]
    );
    assert_eq!(draws.instanced_meshes[0].transparent, 0);
    assert_eq!(draws.instanced_meshes[1].transparent, 1);
    assert_eq!(draws.instances[0].index, 0);
    assert_eq!(draws.depth_only, vec![draws.full[0]]);
}

/// Test: Material transparency puts a whole mesh in the blended pass.
#[test]
fn test_material_transparency() {
    let scene = scene(vec![boxed(0, Some(2), [0.0, 0.0, -5.0], 0.5)]);
    let output = prepare(&scene, &mono(RenderOptions::default()));
    let draws = &output.cameras[0].draws;
    assert_eq!(draws.instanced_meshes[0].transparent, 1);
    assert!(draws.depth_only.is_empty());
}

/// Test: A box covering ~0.1% of the screen is culled at a 1% threshold
/// and kept at zero.
#[test]
fn test_contribution_threshold() {
    let scene = scene(vec![boxed(0, Some(0), [0.0, 0.0, -10.0], 0.3)]);
    let area = contribution_area(forward_camera().view_projection(), &scene.instances()[0].bounds);
    assert!(area > 0.0005 && area < 0.002, "area {area}");

    let culling = RenderOptions {
        enable_contribution_testing: true,
        min_contribution_area: 0.01,
        ..RenderOptions::default()
    };
    let output = prepare(&scene, &mono(culling));
    assert!(output.cameras[0].survivors.is_empty());
    assert_eq!(output.cameras[0].stats.cull.contribution, 1);

    let keeping = RenderOptions { min_contribution_area: 0.0, ..culling };
    assert_eq!(survivors(&scene, &mono(keeping)), vec![0]);

    // Disabled testing ignores the threshold
    let disabled = RenderOptions { enable_contribution_testing: false, ..culling };
    assert_eq!(survivors(&scene, &mono(disabled)), vec![0]);
}

/// Test: Any isolated instance restricts drawing to isolated instances.
#[test]
fn test_isolation_mode() {
    let mut isolated = boxed(1, Some(1), [0.0, 0.0, -5.0], 0.5);
    isolated.state = InstanceState::Isolated;
    let scene = scene(vec![
        boxed(0, Some(0), [1.0, 0.0, -5.0], 0.5),
        isolated,
        boxed(2, Some(0), [-1.0, 0.0, -5.0], 0.5),
    ]);

    let output = prepare(&scene, &mono(RenderOptions::default()));
    assert_eq!(output.cameras[0].survivors.positions(), &[1]);
    assert_eq!(output.cameras[0].stats.cull.not_isolated, 2);
}

/// Test: A hidden transform node hides its subtree unless a child opts out.
#[test]
fn test_parent_hiding() {
    let mut root = boxed(0, None, [0.0; 3], 1.0);
    root.state = InstanceState::Hidden;
    let mut child = boxed(1, Some(0), [0.0, 0.0, -5.0], 0.5);
    child.parent = Some(0);
    let mut grandchild = boxed(2, Some(0), [0.0, 0.0, -6.0], 0.5);
    grandchild.parent = Some(1);
    let mut exempt = boxed(3, Some(0), [0.0, 0.0, -7.0], 0.5);
    exempt.parent = Some(0);
    exempt.flags = InstanceFlags::PARENT_VISIBILITY_EXEMPT;

    let scene = scene(vec![root, child, grandchild, exempt]);
    assert_eq!(survivors(&scene, &mono(RenderOptions::default())), vec![3]);
}

/// Test: An initially-hidden instance shows once its state changes.
#[test]
fn test_initially_hidden() {
    let mut instance = boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5);
    instance.flags = InstanceFlags::HIDDEN_BY_DEFAULT;
    let frame = mono(RenderOptions::default());

    assert!(survivors(&scene(vec![instance.clone()]), &frame).is_empty());
    instance.state = InstanceState::Selected;
    assert_eq!(survivors(&scene(vec![instance]), &frame), vec![0]);
}

/// Test: Clip planes cull independently of depth testing.
#[test]
fn test_clip_planes() {
    let scene = scene(vec![
        boxed(0, Some(0), [-3.0, 0.0, -8.0], 0.5),
        boxed(1, Some(0), [3.0, 0.0, -8.0], 0.5),
        boxed(2, Some(0), [0.0, 0.0, -8.0], 0.5),
    ]);
    // Section plane keeping x <= 0
    let section = Plane::from_point_normal([0.0; 3], [-1.0, 0.0, 0.0]);
    let camera = forward_camera().with_clip_plane(3, section).unwrap();

    for enable_depth_testing in [true, false] {
        let options = RenderOptions { enable_depth_testing, ..RenderOptions::default() };
        let frame = Frame::new(0, vec![camera.clone()], Viewport::new(256, 256), 0, options).unwrap();
        let output = prepare(&scene, &frame);
        assert_eq!(output.cameras[0].survivors.positions(), &[0, 2]);
        assert_eq!(output.cameras[0].stats.cull.clip_plane, 1);
    }
}

/// Test: Degenerate bounds are culled, not rejected.
#[test]
fn test_degenerate_bounds_are_culled() {
    let mut inverted = boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5);
    std::mem::swap(&mut inverted.bounds.min, &mut inverted.bounds.max);
    let mut nan = boxed(1, Some(0), [0.0, 0.0, -5.0], 0.5);
    nan.bounds.max[1] = f32::NAN;

    let scene = scene(vec![inverted, nan]);
    let output = prepare(&scene, &mono(RenderOptions::default()));
    assert!(output.cameras[0].survivors.is_empty());
    assert_eq!(output.cameras[0].stats.cull.degenerate, 2);
}

/// Test: Stereo cameras cull independently and share frame options.
#[test]
fn test_stereo_cameras_are_independent() {
    let scene = scene(vec![
        boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5),
        boxed(1, Some(1), [0.0, 0.0, 5.0], 0.5),
    ]);
    let frame = Frame::new(
        0,
        vec![forward_camera(), backward_camera()],
        Viewport::new(512, 512),
        0,
        RenderOptions::default(),
    )
    .unwrap();

    let output = prepare(&scene, &frame);
    assert_eq!(output.cameras.len(), 2);
    assert_eq!(output.cameras[0].survivors.positions(), &[0]);
    assert_eq!(output.cameras[1].survivors.positions(), &[1]);
    assert_eq!(output.cameras[0].draws.full[0].mesh, 0);
    assert_eq!(output.cameras[1].draws.full[0].mesh, 1);
    assert_eq!(output.stats().cameras, 2);

    // Each camera on its own gives the same answer
    let kernel = VisibilityKernel::new();
    assert_eq!(kernel.evaluate(&scene, &frame, &frame.cameras()[1]), output.cameras[1].survivors);
}

/// Test: A stereo rig's eyes see slightly different sets near the edge.
#[test]
fn test_stereo_rig_eye_offset() {
    // Just inside the left eye's left frustum edge, just outside the right eye's
    let scene = scene(vec![boxed(0, Some(0), [-5.3, 0.0, -5.0], 0.1)]);
    let rig = StereoRig::new(
        [0.0; 3],
        look_at_rh([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        projection(),
        0.8,
    );
    let [left, right] = rig.eye_cameras();
    let frame = Frame::new(0, vec![left, right], Viewport::new(512, 512), 0, RenderOptions::default()).unwrap();

    let output = prepare(&scene, &frame);
    assert_eq!(output.cameras[0].survivors.len(), 1);
    assert_eq!(output.cameras[1].survivors.len(), 0);
}

/// Test: The scene transform moves instances relative to the frustum.
#[test]
fn test_scene_transform() {
    let scene = scene(vec![boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5)]);
    let placed = Camera::new(
        [0.0; 3],
        look_at_rh([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        projection(),
        translation(0.0, 0.0, 20.0),
    );
    let frame = Frame::new(0, vec![placed], Viewport::new(64, 64), 0, RenderOptions::default()).unwrap();
    assert!(survivors(&scene, &frame).is_empty());
}

/// Test: Blended groups draw back-to-front in the space the frustum tests,
/// after the scene transform.
#[test]
fn test_back_to_front_with_scene_transform() {
    // Pushed 20 units away: z = +12 lands at -8, z = -5 at -25
    let near = boxed(0, Some(2), [0.0, 0.0, 12.0], 0.5);
    let mut far = boxed(1, Some(3), [0.0, 0.0, -5.0], 0.5);
    far.transparent = true;
    let scene = scene(vec![near, far]);

    let placed = Camera::new(
        [0.0; 3],
        look_at_rh([0.0; 3], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        projection(),
        translation(0.0, 0.0, -20.0),
    );
    let frame = Frame::new(0, vec![placed], Viewport::new(64, 64), 0, RenderOptions::default()).unwrap();
    let output = prepare(&scene, &frame);
    let draws = &output.cameras[0].draws;

    assert_eq!(output.cameras[0].survivors.len(), 2);
    assert!(draws.instanced_meshes.iter().all(|m| m.transparent == 1));
    let order: Vec<u32> = draws.instances.iter().map(|i| i.index).collect();
    assert_eq!(order, vec![1, 0]);
}

/// Test: Color overrides ride along on the compacted instance.
#[test]
fn test_color_override_routing() {
    let mut tinted = boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5);
    tinted.color_index = Some(0);
    let scene = scene(vec![tinted, boxed(1, Some(0), [1.0, 0.0, -5.0], 0.5)]);

    let output = prepare(&scene, &mono(RenderOptions::default()));
    assert_eq!(output.color_count, 1);
    let draws = &output.cameras[0].draws;
    assert_eq!(draws.color_override_count, 1);
    assert!(draws.instances.iter().all(|i| i.color_index < output.color_count as i32));
    assert_eq!(draws.instances[0].color_index, 0);
    assert_eq!(draws.instances[1].color_index, -1);
    assert_eq!(draws.full.len(), 1);
}

/// Test: Indexed indirect args start at each draw's base instance.
#[test]
fn test_indexed_args() {
    let scene = scene(vec![
        boxed(0, Some(1), [0.0, 0.0, -5.0], 0.5),
        boxed(1, Some(0), [1.0, 0.0, -5.0], 0.5),
        boxed(2, Some(1), [-1.0, 0.0, -5.0], 0.5),
    ]);
    let output = prepare(&scene, &mono(RenderOptions::default()));
    let args = output.cameras[0].draws.indexed_args(&scene, DrawStream::Full);

    assert_eq!(args.len(), 2);
    assert_eq!((args[0].first_index, args[0].instance_count, args[0].first_instance), (3, 2, 0));
    assert_eq!((args[1].first_index, args[1].instance_count, args[1].first_instance), (0, 1, 2));
    assert!(args.iter().all(|a| a.index_count == 3 && a.base_vertex == 0));
}

/// Test: Out-of-range indices reject the snapshot instead of being clamped.
#[test]
fn test_out_of_range_indices_rejected() {
    let mut tables = SceneTables {
        instances: vec![boxed(0, Some(4), [0.0; 3], 1.0)],
        meshes: vec![Mesh { submeshes: BoundedRange::new(0, 0) }],
        ..SceneTables::default()
    };
    assert!(matches!(
        SceneSnapshot::new(tables.clone()),
        Err(SceneError::IndexOutOfRange { field: "mesh", index: 4, .. })
    ));

    tables.instances[0].mesh = Some(0);
    tables.instances[0].color_index = Some(0);
    assert!(matches!(
        SceneSnapshot::new(tables),
        Err(SceneError::IndexOutOfRange { field: "color_index", .. })
    ));
}

/// Test: A frame shading with more lights than exist is rejected.
#[test]
fn test_light_count_rejected() {
    let scene = scene(vec![boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5)]);
    let frame = Frame::new(0, vec![forward_camera()], Viewport::new(64, 64), 3, RenderOptions::default()).unwrap();
    let pipeline = CullingPipeline::new(PipelineConfig::default()).unwrap();

    assert!(matches!(
        pipeline.prepare(&scene, &frame),
        Err(PipelineError::LightCountOutOfRange { requested: 3, available: 0 })
    ));
}

/// Test: Output slots are not rewritten while the consumer holds them.
#[test]
fn test_double_buffered_outputs() {
    let scene = scene(vec![boxed(0, Some(0), [0.0, 0.0, -5.0], 0.5)]);
    let config = PipelineConfig {
        frame_slots: 2,
        acquire_timeout_ms: 10,
        ..PipelineConfig::default()
    };
    let pipeline = CullingPipeline::new(config).unwrap();
    let frame = mono(RenderOptions::default());

    let first = pipeline.run(&scene, &frame).unwrap();
    let second = pipeline.run(&scene, &frame).unwrap();
    assert_ne!(first.slot, second.slot);

    // Both slots in flight
    assert!(matches!(
        pipeline.run(&scene, &frame),
        Err(PipelineError::Sync(SyncError::Timeout))
    ));
    assert_eq!(pipeline.read(first).unwrap().cameras[0].survivors.len(), 1);

    // The GPU side releases the first slot from its own thread
    let completions = pipeline.completion_handle();
    thread::spawn(move || completions.signal(first)).join().unwrap();

    let third = pipeline.run(&scene, &frame).unwrap();
    assert_eq!(third.slot, first.slot);
    assert!(pipeline.read(first).is_none());
    assert!(pipeline.read(third).is_some());
}

/// Test: Pipeline configuration loads from a TOML file.
#[test]
fn test_config_from_file() {
    let path = std::env::temp_dir().join(format!("prism_pipeline_{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "frame_slots = 4\nparallel_cameras = false\n\n[options]\nxray = true\n",
    )
    .unwrap();

    let config = PipelineConfig::from_toml_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.frame_slots, 4);
    assert!(!config.parallel_cameras);
    assert!(config.options.xray);
    assert!(CullingPipeline::new(config).is_ok());
}
