//! Instance grouping and render-order sort.
//!
//! Collects one camera's survivors into per-mesh groups so each group can
//! be issued as a single instanced draw. Opaque groups come first; they
//! write depth and do not blend. Transparent groups follow in a stable
//! order, optionally back-to-front by view depth.

use std::collections::HashMap;

use prism_core::math::{mul, transform_point};
use prism_core::{Camera, SceneSnapshot};

use crate::config::TransparentOrder;

/// Survivors sharing one mesh and one blend mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceGroup {
    /// Mesh drawn by every instance of the group.
    pub mesh: u32,
    /// Drawn in the blended pass.
    pub transparent: bool,
    /// Instance positions, in draw order.
    pub instances: Vec<u32>,
}

impl InstanceGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new(mesh: u32, transparent: bool) -> Self {
        Self {
            mesh,
            transparent,
            instances: Vec::new(),
        }
    }

    /// Number of instances.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }
}

/// Ordered mesh groups for one camera: every opaque group, then every
/// transparent group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshGroups {
    groups: Vec<InstanceGroup>,
    opaque_count: usize,
}

impl MeshGroups {
    /// Groups `survivors` by `(mesh, transparent)`.
    ///
    /// An instance is transparent if any material of its mesh blends or its
    /// own `transparent` flag is set. Instances without a mesh are dropped.
    /// `camera` is only used for [`TransparentOrder::BackToFront`].
    ///
    /// # Panics
    ///
    /// Panics if a survivor is not a valid instance position of `scene`.
    #[must_use]
    pub fn build(
        scene: &SceneSnapshot,
        survivors: &[u32],
        camera: &Camera,
        order: TransparentOrder,
    ) -> Self {
        let instances = scene.instances();
        let mut lookup: HashMap<(u32, bool), usize> = HashMap::new();
        let mut opaque = Vec::new();
        let mut transparent = Vec::new();

        for &position in survivors {
            let instance = &instances[position as usize];
            let Some(mesh) = instance.mesh else {
                continue;
            };
            let blends = instance.transparent || scene.is_mesh_transparent(mesh);
            let target = if blends { &mut transparent } else { &mut opaque };

            let slot = *lookup.entry((mesh, blends)).or_insert_with(|| {
                target.push(InstanceGroup::new(mesh, blends));
                target.len() - 1
            });
            target[slot].instances.push(position);
        }

        if order == TransparentOrder::BackToFront {
            sort_back_to_front(scene, &mut transparent, camera);
        }

        tracing::trace!(
            opaque = opaque.len(),
            transparent = transparent.len(),
            ?order,
            "instances grouped"
        );

        let opaque_count = opaque.len();
        opaque.append(&mut transparent);
        Self {
            groups: opaque,
            opaque_count,
        }
    }

    /// All groups in draw order.
    #[must_use]
    pub fn groups(&self) -> &[InstanceGroup] {
        &self.groups
    }

    /// Opaque groups.
    #[must_use]
    pub fn opaque(&self) -> &[InstanceGroup] {
        &self.groups[..self.opaque_count]
    }

    /// Transparent groups.
    #[must_use]
    pub fn transparent(&self) -> &[InstanceGroup] {
        &self.groups[self.opaque_count..]
    }

    /// Total instances across groups.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.groups.iter().map(InstanceGroup::instance_count).sum()
    }

    /// True if there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Sorts instances inside each group, then groups by their farthest
/// instance. Depth is measured along the view axis after the scene
/// transform, the space the frustum tests in. Both sorts are stable; NaN
/// depths order via `total_cmp`.
fn sort_back_to_front(scene: &SceneSnapshot, groups: &mut [InstanceGroup], camera: &Camera) {
    let instances = scene.instances();
    let scene_view = mul(&camera.view_matrix, &camera.scene_transform);
    // Right-handed view space looks down -z
    let distance = |position: u32| -transform_point(&scene_view, instances[position as usize].bounds.center())[2];

    let mut keyed: Vec<(f32, InstanceGroup)> = groups
        .iter_mut()
        .map(|group| {
            group
                .instances
                .sort_by(|&a, &b| distance(b).total_cmp(&distance(a)));
            let farthest = group.instances.first().map_or(f32::NEG_INFINITY, |&p| distance(p));
            (farthest, std::mem::replace(group, InstanceGroup::new(0, true)))
        })
        .collect();

    keyed.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (slot, (_, group)) in groups.iter_mut().zip(keyed) {
        *slot = group;
    }
}
