//! # Scene Snapshot
//!
//! The immutable-per-frame view of the scene consumed by culling, grouping
//! and assembly. Produced upstream (asset / scene-graph layer), validated
//! once here, then read concurrently by every camera's pipeline.
//!
//! ## Index Policy
//!
//! Every "index or none" field is an `Option<u32>`. [`SceneSnapshot::new`]
//! rejects any index that points outside its table, so downstream stages
//! index tables directly.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::error::{SceneError, SceneResult};
use crate::math::{Mat4, IDENTITY};

/// Half-open range `[lower_bound, upper_bound)` into a shared buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundedRange {
    /// First element.
    pub lower_bound: u32,
    /// One past the last element.
    pub upper_bound: u32,
}

impl BoundedRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(lower_bound: u32, upper_bound: u32) -> Self {
        Self { lower_bound, upper_bound }
    }

    /// Number of elements; zero for an inverted range.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.upper_bound.saturating_sub(self.lower_bound)
    }

    /// True if the range holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `value` lies in the range.
    #[must_use]
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.lower_bound && value < self.upper_bound
    }

    /// True if `upper_bound < lower_bound`.
    #[must_use]
    pub const fn is_inverted(&self) -> bool {
        self.upper_bound < self.lower_bound
    }
}

/// A drawable mesh: a contiguous run of submeshes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mesh {
    /// Range into the submesh table.
    pub submeshes: BoundedRange,
}

/// A run of triangle faces sharing one material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submesh {
    /// Material index, if any.
    pub material: Option<u32>,
    /// Range into the global index buffer.
    pub indices: BoundedRange,
}

/// Surface parameters. Components are nominally in [0, 1] but are not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Glossiness.
    pub glossiness: f32,
    /// Smoothness.
    pub smoothness: f32,
    /// RGBA diffuse color.
    pub diffuse_color: [f32; 4],
}

impl Material {
    /// True if the material blends (alpha below 1).
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.diffuse_color[3] < 1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            glossiness: 0.5,
            smoothness: 0.5,
            diffuse_color: [1.0; 4],
        }
    }
}

/// Visibility-affecting state of an instance.
#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceState {
    /// Drawn normally.
    #[default]
    Default = 0,
    /// Never drawn. Wins over every other state.
    Hidden = 1,
    /// Drawn with selection highlight.
    Selected = 2,
    /// Drawn; while any instance is isolated, only isolated instances draw.
    Isolated = 3,
}

bitflags! {
    /// Per-instance flag bits.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InstanceFlags: u32 {
        /// Initially hidden: behaves as hidden while the state is `Default`.
        const HIDDEN_BY_DEFAULT = 1 << 0;
        /// Not hidden by a hidden ancestor.
        const PARENT_VISIBILITY_EXEMPT = 1 << 1;
    }
}

/// A placed node of the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Stable identity, written to the pick buffer.
    pub index: u32,
    /// Row of the color override table, if any.
    pub color_index: Option<u32>,
    /// World transform.
    pub matrix: Mat4,
    /// Visibility state.
    pub state: InstanceState,
    /// World-space bounds.
    pub bounds: Aabb,
    /// Position of the parent instance, if any.
    pub parent: Option<u32>,
    /// Mesh to draw; `None` for pure transform nodes.
    pub mesh: Option<u32>,
    /// Flag bits.
    pub flags: InstanceFlags,
    /// Forces the instance into the transparent pass.
    pub transparent: bool,
}

impl Instance {
    /// A visible, opaque instance of `mesh` with the given bounds.
    #[must_use]
    pub fn new(index: u32, mesh: Option<u32>, bounds: Aabb) -> Self {
        Self {
            index,
            color_index: None,
            matrix: IDENTITY,
            state: InstanceState::Default,
            bounds,
            parent: None,
            mesh,
            flags: InstanceFlags::empty(),
            transparent: false,
        }
    }

    /// True if the instance hides itself, regardless of ancestors.
    #[must_use]
    pub fn is_self_hidden(&self) -> bool {
        self.state == InstanceState::Hidden
            || (self.state == InstanceState::Default
                && self.flags.contains(InstanceFlags::HIDDEN_BY_DEFAULT))
    }
}

/// Kind of light source.
#[repr(i32)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    /// Directional light.
    #[default]
    Sun = 0,
    /// Cone light.
    Spot = 1,
    /// Omnidirectional light.
    Point = 2,
    /// Uniform fill light.
    Ambient = 3,
}

/// A light. Read by shading only, never by culling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Light {
    /// Kind.
    pub kind: LightKind,
    /// World position (direction for sun lights).
    pub position: [f32; 3],
    /// Diffuse color.
    pub color: [f32; 3],
    /// Specular color.
    pub specular_color: [f32; 3],
    /// Range of influence.
    pub radius: f32,
    /// Constant, linear and quadratic attenuation.
    pub attenuation: [f32; 3],
    /// Inner cone angle in radians (spot lights).
    pub cone_inner_angle: f32,
    /// Outer cone angle in radians (spot lights).
    pub cone_outer_angle: f32,
}

/// Raw, unvalidated scene tables as handed over by the scene layer.
#[derive(Debug, Clone, Default)]
pub struct SceneTables {
    /// Instances; `parent` fields index this table.
    pub instances: Vec<Instance>,
    /// Meshes.
    pub meshes: Vec<Mesh>,
    /// Submeshes.
    pub submeshes: Vec<Submesh>,
    /// Materials.
    pub materials: Vec<Material>,
    /// Lights.
    pub lights: Vec<Light>,
    /// Color override table (RGBA).
    pub colors: Vec<[f32; 4]>,
    /// Length of the global index buffer.
    pub index_count: u32,
}

/// A validated, read-only scene.
#[derive(Debug, Clone)]
pub struct SceneSnapshot {
    tables: SceneTables,
    /// Per mesh: any submesh material blends.
    mesh_transparent: Vec<bool>,
    /// At least one instance is isolated.
    isolation: bool,
}

impl SceneSnapshot {
    /// Validates `tables` and freezes them.
    ///
    /// # Errors
    ///
    /// Returns a [`SceneError`] for any out-of-range index, malformed range,
    /// parent cycle, or table too large for the GPU index encoding.
    pub fn new(tables: SceneTables) -> SceneResult<Self> {
        check_table_len("instance", tables.instances.len())?;
        check_table_len("mesh", tables.meshes.len())?;
        check_table_len("submesh", tables.submeshes.len())?;
        check_table_len("material", tables.materials.len())?;
        check_table_len("color", tables.colors.len())?;

        validate_submeshes(&tables)?;
        validate_meshes(&tables)?;
        validate_instances(&tables)?;
        validate_parent_chains(&tables.instances)?;

        let mesh_transparent = tables
            .meshes
            .iter()
            .map(|mesh| {
                tables.submeshes[range(mesh.submeshes)].iter().any(|submesh| {
                    submesh
                        .material
                        .is_some_and(|m| tables.materials[m as usize].is_transparent())
                })
            })
            .collect();

        let isolation = tables
            .instances
            .iter()
            .any(|i| i.state == InstanceState::Isolated);

        tracing::trace!(
            instances = tables.instances.len(),
            meshes = tables.meshes.len(),
            isolation,
            "scene snapshot validated"
        );

        Ok(Self {
            tables,
            mesh_transparent,
            isolation,
        })
    }

    /// All instances.
    #[must_use]
    pub fn instances(&self) -> &[Instance] {
        &self.tables.instances
    }

    /// All meshes.
    #[must_use]
    pub fn meshes(&self) -> &[Mesh] {
        &self.tables.meshes
    }

    /// All submeshes.
    #[must_use]
    pub fn submeshes(&self) -> &[Submesh] {
        &self.tables.submeshes
    }

    /// All materials.
    #[must_use]
    pub fn materials(&self) -> &[Material] {
        &self.tables.materials
    }

    /// All lights.
    #[must_use]
    pub fn lights(&self) -> &[Light] {
        &self.tables.lights
    }

    /// The color override table.
    #[must_use]
    pub fn colors(&self) -> &[[f32; 4]] {
        &self.tables.colors
    }

    /// Length of the global index buffer.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.tables.index_count
    }

    /// Submeshes of `mesh`.
    ///
    /// # Panics
    ///
    /// Panics if `mesh` is not a valid mesh index.
    #[must_use]
    pub fn submeshes_of(&self, mesh: u32) -> &[Submesh] {
        &self.tables.submeshes[range(self.tables.meshes[mesh as usize].submeshes)]
    }

    /// True if any submesh of `mesh` uses a blending material.
    #[must_use]
    pub fn is_mesh_transparent(&self, mesh: u32) -> bool {
        self.mesh_transparent
            .get(mesh as usize)
            .copied()
            .unwrap_or(false)
    }

    /// True if at least one instance is isolated.
    #[must_use]
    pub fn isolation_active(&self) -> bool {
        self.isolation
    }

    /// Releases the underlying tables.
    #[must_use]
    pub fn into_tables(self) -> SceneTables {
        self.tables
    }
}

fn range(r: BoundedRange) -> std::ops::Range<usize> {
    r.lower_bound as usize..r.upper_bound as usize
}

fn check_table_len(table: &'static str, len: usize) -> SceneResult<()> {
    if i32::try_from(len).is_err() {
        return Err(SceneError::TableTooLarge { table, len });
    }
    Ok(())
}

fn check_index(
    owner: &'static str,
    position: usize,
    field: &'static str,
    table: &'static str,
    index: Option<u32>,
    len: usize,
) -> SceneResult<()> {
    match index {
        Some(index) if index as usize >= len => Err(SceneError::IndexOutOfRange {
            owner,
            position: position as u32,
            field,
            table,
            index,
            len,
        }),
        _ => Ok(()),
    }
}

fn validate_submeshes(tables: &SceneTables) -> SceneResult<()> {
    for (position, submesh) in tables.submeshes.iter().enumerate() {
        check_index(
            "submesh",
            position,
            "material",
            "material",
            submesh.material,
            tables.materials.len(),
        )?;
        let r = submesh.indices;
        if r.is_inverted() || r.upper_bound > tables.index_count {
            return Err(SceneError::SubmeshRangeInvalid {
                submesh: position as u32,
                lower: r.lower_bound,
                upper: r.upper_bound,
                index_count: tables.index_count,
            });
        }
    }
    Ok(())
}

fn validate_meshes(tables: &SceneTables) -> SceneResult<()> {
    let mut previous_upper = 0;
    for (position, mesh) in tables.meshes.iter().enumerate() {
        let r = mesh.submeshes;
        if r.is_inverted() || r.upper_bound as usize > tables.submeshes.len() {
            return Err(SceneError::MeshRangeInvalid {
                mesh: position as u32,
                lower: r.lower_bound,
                upper: r.upper_bound,
                len: tables.submeshes.len(),
            });
        }
        if r.is_empty() {
            continue;
        }
        if r.lower_bound < previous_upper {
            return Err(SceneError::MeshRangesOverlap {
                mesh: position as u32,
                lower: r.lower_bound,
                previous_upper,
            });
        }
        previous_upper = r.upper_bound;
    }
    Ok(())
}

fn validate_instances(tables: &SceneTables) -> SceneResult<()> {
    for (position, instance) in tables.instances.iter().enumerate() {
        check_index(
            "instance",
            position,
            "mesh",
            "mesh",
            instance.mesh,
            tables.meshes.len(),
        )?;
        check_index(
            "instance",
            position,
            "parent",
            "instance",
            instance.parent,
            tables.instances.len(),
        )?;
        check_index(
            "instance",
            position,
            "color_index",
            "color",
            instance.color_index,
            tables.colors.len(),
        )?;
    }
    Ok(())
}

/// Rejects parent cycles. Parents are already known to be in range.
fn validate_parent_chains(instances: &[Instance]) -> SceneResult<()> {
    const UNVISITED: u8 = 0;
    const ON_PATH: u8 = 1;
    const DONE: u8 = 2;

    let mut marks = vec![UNVISITED; instances.len()];
    let mut path = Vec::new();

    for start in 0..instances.len() {
        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                DONE => break,
                ON_PATH => {
                    return Err(SceneError::ParentCycle { instance: i as u32 });
                }
                _ => {
                    marks[i] = ON_PATH;
                    path.push(i);
                    current = instances[i].parent.map(|p| p as usize);
                }
            }
        }
        for i in path.drain(..) {
            marks[i] = DONE;
        }
    }
    Ok(())
}
