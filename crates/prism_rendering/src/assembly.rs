//! # Indirect Draw Assembly
//!
//! Turns ordered mesh groups into GPU-ready draw data:
//!
//! ```text
//! groups:        [mesh 0 ×3] [mesh 2 ×1] [mesh 1 ×2, transparent]
//!                     │           │               │
//! instances:     [a b c]     [d]          [e f]          ← compacted buffer
//! full:          (0, 0, 3)   (2, 3, 1)    (1, 4, 2)      ← (mesh, base, count)
//! depth_only:    (0, 0, 3)   (2, 3, 1)                   ← opaque only
//! ```
//!
//! Base instances are the prefix sums of instance counts in emission
//! order. Every output buffer is rewritten in full each frame.

use bytemuck::{Pod, Zeroable};
use prism_core::{GpuInstance, GpuInstancedMesh, RenderOptions, SceneSnapshot};

use crate::error::AssemblyError;
use crate::grouping::MeshGroups;

/// One instanced draw: `instance_count` instances of `mesh`, read from the
/// compacted instance buffer starting at `base_instance`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct DrawCommand {
    /// Mesh index.
    pub mesh: u32,
    /// Offset into the compacted instance buffer.
    pub base_instance: u32,
    /// Number of instances.
    pub instance_count: u32,
}

/// Indexed indirect draw arguments, as read by `drawIndexedIndirect`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedIndirectArgs {
    /// Indices per instance.
    pub index_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
    /// First index.
    pub first_index: u32,
    /// Base vertex.
    pub base_vertex: i32,
    /// First instance.
    pub first_instance: u32,
}

/// Which command stream to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawStream {
    /// Shaded, depth-tested pass.
    Full,
    /// Depth pre-pass.
    DepthOnly,
}

/// Everything the rasterization stage needs for one camera.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawOutput {
    /// Survivors, laid out in group order.
    pub instances: Vec<GpuInstance>,
    /// One record per group, parallel to `full`.
    pub instanced_meshes: Vec<GpuInstancedMesh>,
    /// Every group, opaque first.
    pub full: Vec<DrawCommand>,
    /// Opaque groups, when the depth pre-pass is enabled.
    pub depth_only: Vec<DrawCommand>,
    /// Compacted instances that shade from the color override table.
    pub color_override_count: u32,
}

impl DrawOutput {
    /// Creates an empty output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties every buffer, keeping allocations.
    pub fn clear(&mut self) {
        self.instances.clear();
        self.instanced_meshes.clear();
        self.full.clear();
        self.depth_only.clear();
        self.color_override_count = 0;
    }

    /// Number of compacted instances.
    #[must_use]
    pub fn instance_count(&self) -> u32 {
        self.instances.len() as u32
    }

    /// Returns true if there's anything to draw.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.full.is_empty()
    }

    /// The requested command stream.
    #[must_use]
    pub fn stream(&self, stream: DrawStream) -> &[DrawCommand] {
        match stream {
            DrawStream::Full => &self.full,
            DrawStream::DepthOnly => &self.depth_only,
        }
    }

    /// Compacted instance buffer as bytes for GPU upload.
    #[must_use]
    pub fn instance_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Instanced mesh records as bytes for GPU upload.
    #[must_use]
    pub fn instanced_mesh_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instanced_meshes)
    }

    /// A command stream as bytes for GPU upload.
    #[must_use]
    pub fn command_bytes(&self, stream: DrawStream) -> &[u8] {
        bytemuck::cast_slice(self.stream(stream))
    }

    /// Expands a command stream to one indexed indirect draw per non-empty
    /// submesh. Empty meshes and submeshes emit nothing.
    #[must_use]
    pub fn indexed_args(&self, scene: &SceneSnapshot, stream: DrawStream) -> Vec<DrawIndexedIndirectArgs> {
        let mut args = Vec::new();
        for command in self.stream(stream) {
            if command.mesh as usize >= scene.meshes().len() {
                continue;
            }
            for submesh in scene.submeshes_of(command.mesh) {
                if submesh.indices.is_empty() {
                    continue;
                }
                args.push(DrawIndexedIndirectArgs {
                    index_count: submesh.indices.len(),
                    instance_count: command.instance_count,
                    first_index: submesh.indices.lower_bound,
                    base_vertex: 0,
                    first_instance: command.base_instance,
                });
            }
        }
        args
    }

    /// Checks the base-instance bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns an [`AssemblyError`] if base instances are not gapless
    /// prefix sums, the full stream does not cover the compacted buffer,
    /// the instanced mesh records disagree with the full stream, or the
    /// depth-only stream is not an ordered subsequence of the opaque full
    /// draws. Runs in time linear in the stream lengths.
    pub fn verify(&self) -> Result<(), AssemblyError> {
        if self.instanced_meshes.len() != self.full.len() {
            return Err(AssemblyError::RecordMismatch {
                records: self.instanced_meshes.len(),
                draws: self.full.len(),
            });
        }

        let mut expected: u64 = 0;
        for (draw, command) in self.full.iter().enumerate() {
            if u64::from(command.base_instance) != expected {
                return Err(AssemblyError::BaseInstanceGap {
                    draw,
                    base_instance: command.base_instance,
                    expected: expected as u32,
                });
            }
            let record = &self.instanced_meshes[draw];
            if record.mesh != command.mesh
                || record.base_instance != command.base_instance
                || record.instance_count != command.instance_count
            {
                return Err(AssemblyError::RecordMismatch {
                    records: self.instanced_meshes.len(),
                    draws: self.full.len(),
                });
            }
            expected += u64::from(command.instance_count);
        }
        if expected != self.instances.len() as u64 {
            return Err(AssemblyError::CountMismatch {
                covered: expected,
                instances: self.instances.len(),
            });
        }

        // Depth-only draws are an ordered subsequence of the opaque full draws
        let mut opaque = self
            .full
            .iter()
            .zip(&self.instanced_meshes)
            .filter(|(_, record)| record.transparent == 0)
            .map(|(full, _)| full);
        for (draw, command) in self.depth_only.iter().enumerate() {
            if !opaque.any(|full| full == command) {
                return Err(AssemblyError::DepthOnlyNotOpaque {
                    draw,
                    mesh: command.mesh,
                });
            }
        }
        Ok(())
    }
}

/// Rewrites `out` from `groups`.
///
/// Groups are emitted in order; each gets `base_instance` equal to the
/// number of instances emitted before it. Opaque groups also go to the
/// depth-only stream when depth testing is on and x-ray is off.
pub fn assemble_into(scene: &SceneSnapshot, groups: &MeshGroups, options: &RenderOptions, out: &mut DrawOutput) {
    out.clear();
    let instances = scene.instances();
    let depth_prepass = options.depth_prepass_enabled();

    for group in groups.groups() {
        let command = DrawCommand {
            mesh: group.mesh,
            base_instance: out.instance_count(),
            instance_count: group.instance_count(),
        };

        for &position in &group.instances {
            let instance = &instances[position as usize];
            if instance.color_index.is_some() {
                out.color_override_count += 1;
            }
            out.instances.push(GpuInstance::from(instance));
        }

        out.instanced_meshes.push(GpuInstancedMesh {
            mesh: command.mesh,
            transparent: u32::from(group.transparent),
            instance_count: command.instance_count,
            base_instance: command.base_instance,
        });
        out.full.push(command);
        if depth_prepass && !group.transparent {
            out.depth_only.push(command);
        }
    }

    tracing::trace!(
        instances = out.instances.len(),
        full = out.full.len(),
        depth_only = out.depth_only.len(),
        "draws assembled"
    );
}

/// Assembles `groups` into a fresh [`DrawOutput`].
#[must_use]
pub fn assemble(scene: &SceneSnapshot, groups: &MeshGroups, options: &RenderOptions) -> DrawOutput {
    let mut out = DrawOutput::new();
    assemble_into(scene, groups, options, &mut out);
    out
}
