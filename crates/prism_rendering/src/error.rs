//! # Rendering Error Types
//!
//! Assembly invariant violations, binding table faults and the per-frame
//! pipeline error that wraps them.

use prism_core::{ConfigError, SyncError};
use thiserror::Error;

use crate::bindings::LogicalBuffer;

/// A draw output that breaks the base-instance bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// Base instances are not the prefix sums of instance counts.
    #[error("draw {draw} starts at base instance {base_instance}, expected {expected}")]
    BaseInstanceGap {
        /// Position in the full stream.
        draw: usize,
        /// Base instance found.
        base_instance: u32,
        /// Running total of preceding instance counts.
        expected: u32,
    },

    /// The full stream does not cover the compacted instance buffer exactly.
    #[error("full stream covers {covered} instances, compacted buffer holds {instances}")]
    CountMismatch {
        /// Sum of full-stream instance counts.
        covered: u64,
        /// Length of the compacted instance buffer.
        instances: usize,
    },

    /// Instanced mesh records and full-stream entries disagree.
    #[error("{records} instanced mesh records for {draws} full-stream draws")]
    RecordMismatch {
        /// Number of instanced mesh records.
        records: usize,
        /// Number of full-stream draws.
        draws: usize,
    },

    /// A depth-only entry has no matching opaque entry in the full stream,
    /// at or after the previous depth-only entry's match.
    #[error("depth-only draw {draw} (mesh {mesh}) has no matching opaque full-stream draw in order")]
    DepthOnlyNotOpaque {
        /// Position in the depth-only stream.
        draw: usize,
        /// Mesh of the offending draw.
        mesh: u32,
    },
}

/// A buffer binding table that does not bind every logical buffer once.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingError {
    /// A logical buffer has no slot.
    #[error("{0:?} buffer is not bound")]
    Unbound(LogicalBuffer),

    /// A logical buffer appears more than once.
    #[error("{0:?} buffer is bound more than once")]
    BoundTwice(LogicalBuffer),

    /// Two logical buffers share one slot.
    #[error("slot {slot} is shared by {first:?} and {second:?}")]
    SlotShared {
        /// The contested slot.
        slot: u32,
        /// First buffer bound there.
        first: LogicalBuffer,
        /// Second buffer bound there.
        second: LogicalBuffer,
    },
}

/// A rejected frame or an unusable pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The frame shades with more lights than the scene holds.
    #[error("frame requests {requested} lights, scene has {available}")]
    LightCountOutOfRange {
        /// Light count on the frame.
        requested: u32,
        /// Length of the scene's light table.
        available: usize,
    },

    /// Assembled draws failed verification.
    #[error(transparent)]
    Assembly(#[from] AssemblyError),

    /// The binding table is malformed.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// No output slot was free.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The pipeline configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
