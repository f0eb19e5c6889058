//! # Core Error Types
//!
//! Index faults, frame assembly faults, configuration faults and
//! slot synchronisation faults.

use thiserror::Error;

/// Data-integrity faults found while validating a scene snapshot.
///
/// These indices are also consumed by shader code, where an out-of-range
/// read is undefined behaviour, so a faulty snapshot is rejected outright.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// An index field points outside the table it refers to.
    #[error("{field} of {owner} {position} is {index}, but the {table} table has {len} entries")]
    IndexOutOfRange {
        /// Kind of record holding the bad index ("instance", "submesh").
        owner: &'static str,
        /// Position of that record in its table.
        position: u32,
        /// Name of the offending field.
        field: &'static str,
        /// Table the field indexes into.
        table: &'static str,
        /// The bad index.
        index: u32,
        /// Length of the target table.
        len: usize,
    },

    /// A mesh's submesh range is inverted or runs past the submesh table.
    #[error("mesh {mesh} has submesh range {lower}..{upper}, submesh table has {len} entries")]
    MeshRangeInvalid {
        /// Mesh position.
        mesh: u32,
        /// Range start.
        lower: u32,
        /// Range end (exclusive).
        upper: u32,
        /// Length of the submesh table.
        len: usize,
    },

    /// Submesh ranges are not assigned monotonically without overlap.
    #[error("mesh {mesh} submesh range starts at {lower}, before the previous mesh ends at {previous_upper}")]
    MeshRangesOverlap {
        /// Mesh position.
        mesh: u32,
        /// Range start of this mesh.
        lower: u32,
        /// Range end of the preceding non-empty mesh.
        previous_upper: u32,
    },

    /// A submesh's face range is inverted or runs past the index buffer.
    #[error("submesh {submesh} has index range {lower}..{upper}, index buffer has {index_count} indices")]
    SubmeshRangeInvalid {
        /// Submesh position.
        submesh: u32,
        /// Range start.
        lower: u32,
        /// Range end (exclusive).
        upper: u32,
        /// Length of the index buffer.
        index_count: u32,
    },

    /// The parent chain of an instance loops back on itself.
    #[error("parent chain of instance {instance} contains a cycle")]
    ParentCycle {
        /// An instance on the cycle.
        instance: u32,
    },

    /// A table cannot be addressed by the signed 32-bit GPU index encoding.
    #[error("{table} table has {len} entries, more than the GPU index encoding allows")]
    TableTooLarge {
        /// Table name.
        table: &'static str,
        /// Table length.
        len: usize,
    },
}

/// Faults while assembling a frame record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    /// A frame carries one camera, or two for stereo.
    #[error("a frame needs 1 or 2 cameras, got {0}")]
    CameraCount(usize),

    /// Viewport size must be positive and finite.
    #[error("invalid viewport size {width}x{height}")]
    InvalidViewport {
        /// Width in points.
        width: f32,
        /// Height in points.
        height: f32,
    },

    /// The contribution threshold must be finite and non-negative.
    #[error("invalid minimum contribution area {0}")]
    InvalidContributionArea(f32),

    /// Cameras have `CLIP_PLANE_COUNT` clip plane slots.
    #[error("clip plane slot {0} out of range")]
    ClipPlaneSlot(usize),

    /// No free slot to publish the frame's uniforms into.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Faults while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for the expected schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Faults from the multi-slot frame synchroniser.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// Double buffering needs at least two physical slots.
    #[error("frame slots need at least 2 slots, got {0}")]
    TooFewSlots(usize),

    /// The next slot still holds a frame the consumer has not finished.
    #[error("slot {slot} still holds in-flight frame {frame}")]
    SlotInFlight {
        /// Slot index.
        slot: usize,
        /// Frame the consumer is still reading.
        frame: u64,
    },

    /// Only one writer may exist at a time.
    #[error("a slot writer is already active")]
    WriterActive,

    /// No slot became free before the deadline.
    #[error("timed out waiting for a free frame slot")]
    Timeout,
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
