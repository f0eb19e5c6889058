//! # PRISM Rendering
//!
//! Visibility culling and indirect draw assembly, per frame and per camera.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     PER-FRAME PIPELINE                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  FrameStateManager ──► Frame (1-2 cameras) + FrameUniforms    │
//! │        │                                                      │
//! │        ▼            (per camera, cameras in parallel)         │
//! │  VisibilityKernel ──► MeshGroups ──► assemble_into            │
//! │   survivors           opaque first    compacted instances     │
//! │                       then blended    full + depth-only draws │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - Culling is a pure function of scene snapshot and frame
//! - Base instances are exact prefix sums of instance counts
//! - The depth-only stream only ever holds opaque draws
//! - An output slot is never written while the GPU reads it

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod assembly;
pub mod bindings;
pub mod config;
pub mod culling;
pub mod error;
pub mod frame_state;
pub mod grouping;
pub mod pipeline;

pub use assembly::{assemble, assemble_into, DrawCommand, DrawIndexedIndirectArgs, DrawOutput, DrawStream};
pub use bindings::{BindingTable, LogicalBuffer, VertexAttribute};
pub use config::{PipelineConfig, TransparentOrder};
pub use culling::{
    contribution_area, cull_frame, CullStats, HiddenResolver, SurvivorList, Verdict, VisibilityKernel,
};
pub use error::{AssemblyError, BindingError, PipelineError, PipelineResult};
pub use frame_state::{FrameStateManager, PublishedFrame, StereoRig};
pub use grouping::{InstanceGroup, MeshGroups};
pub use pipeline::{CameraOutput, CullingPipeline, FrameOutput, RenderStats};
