//! # PRISM Core
//!
//! The read-only half of the culling pipeline:
//! - A validated scene snapshot (instances, meshes, submeshes, materials, lights)
//! - GPU-shared data layouts, byte-compatible with the shader side
//! - Bounds, plane and matrix math used by culling
//! - The per-frame camera record and render options
//! - Multi-slot frame synchronisation between producer and GPU consumer
//!
//! ## Architecture Rules
//!
//! 1. **Validate once** - a `SceneSnapshot` cannot exist with an out-of-range index
//! 2. **No sentinels in Rust** - "index or none" is `Option<u32>`; `-1` exists only in GPU layouts
//! 3. **No partial updates** - every per-frame buffer is rewritten in full
//!
//! ## Example
//!
//! ```rust,ignore
//! use prism_core::{SceneSnapshot, SceneTables};
//!
//! let scene = SceneSnapshot::new(tables)?; // rejects index faults
//! for instance in scene.instances() {
//!     // every mesh / parent / color index is known to be in range
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bounds;
pub mod config;
pub mod error;
pub mod frame;
pub mod layout;
pub mod math;
pub mod scene;
pub mod sync;

pub use bounds::{Aabb, Frustum, Plane};
pub use config::RenderOptions;
pub use error::{ConfigError, FrameError, SceneError, SyncError};
pub use frame::{Camera, Frame, Viewport, CLIP_PLANE_COUNT, MAX_CAMERAS};
pub use layout::{
    decode_index, encode_index, CameraUniforms, FrameUniforms, GpuInstance, GpuInstancedMesh,
    GpuLight, GpuMaterial, GpuMesh, GpuSubmesh, NONE_INDEX,
};
pub use scene::{
    BoundedRange, Instance, InstanceFlags, InstanceState, Light, LightKind, Material, Mesh,
    SceneSnapshot, SceneTables, Submesh,
};
pub use sync::{CompletionHandle, FrameSlots, FrameTicket, SlotWriter};
