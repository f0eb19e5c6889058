//! Buffer binding slots.
//!
//! Shader code addresses buffers by slot number, so the mapping from
//! logical buffer to slot is a fixed, versioned table. Re-numbering means
//! a new version of [`BindingTable::CURRENT`], never a scattered literal.
//!
//! | Slot | Buffer    |
//! |------|-----------|
//! | 0    | Positions |
//! | 1    | Normals   |
//! | 2    | Frames    |
//! | 3    | Instances |
//! | 4    | Meshes    |
//! | 5    | Submeshes |
//! | 6    | Materials |
//! | 7    | Colors    |
//! | 8    | Lights    |

use crate::error::BindingError;

/// A buffer the shaders read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalBuffer {
    /// Vertex positions.
    Positions,
    /// Vertex normals.
    Normals,
    /// `FrameUniforms`.
    Frames,
    /// Compacted per-frame instances.
    Instances,
    /// Mesh records.
    Meshes,
    /// Submesh records.
    Submeshes,
    /// Material records.
    Materials,
    /// Color override table.
    Colors,
    /// Light records.
    Lights,
}

impl LogicalBuffer {
    /// Every logical buffer.
    pub const ALL: [Self; 9] = [
        Self::Positions,
        Self::Normals,
        Self::Frames,
        Self::Instances,
        Self::Meshes,
        Self::Submeshes,
        Self::Materials,
        Self::Colors,
        Self::Lights,
    ];
}

/// Vertex attribute locations.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Position.
    Position = 0,
    /// Normal.
    Normal = 1,
    /// Texture coordinate.
    Uv = 2,
}

impl VertexAttribute {
    /// Shader location.
    #[must_use]
    pub const fn location(self) -> u32 {
        self as u32
    }
}

/// Versioned mapping from logical buffer to binding slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingTable {
    /// Layout version; bumped on any re-numbering.
    pub version: u32,
    /// `(buffer, slot)` pairs.
    pub slots: &'static [(LogicalBuffer, u32)],
}

impl BindingTable {
    /// The binding table the shaders are compiled against.
    pub const CURRENT: Self = Self {
        version: 1,
        slots: &[
            (LogicalBuffer::Positions, 0),
            (LogicalBuffer::Normals, 1),
            (LogicalBuffer::Frames, 2),
            (LogicalBuffer::Instances, 3),
            (LogicalBuffer::Meshes, 4),
            (LogicalBuffer::Submeshes, 5),
            (LogicalBuffer::Materials, 6),
            (LogicalBuffer::Colors, 7),
            (LogicalBuffer::Lights, 8),
        ],
    };

    /// Slot of `buffer`.
    #[must_use]
    pub fn slot(&self, buffer: LogicalBuffer) -> Option<u32> {
        self.slots
            .iter()
            .find(|(b, _)| *b == buffer)
            .map(|&(_, slot)| slot)
    }

    /// Buffer bound at `slot`.
    #[must_use]
    pub fn buffer_at(&self, slot: u32) -> Option<LogicalBuffer> {
        self.slots
            .iter()
            .find(|(_, s)| *s == slot)
            .map(|&(buffer, _)| buffer)
    }

    /// Checks that every logical buffer is bound to exactly one slot of
    /// its own.
    ///
    /// # Errors
    ///
    /// Returns the first [`BindingError`] found.
    pub fn validate(&self) -> Result<(), BindingError> {
        for buffer in LogicalBuffer::ALL {
            match self.slots.iter().filter(|(b, _)| *b == buffer).count() {
                0 => return Err(BindingError::Unbound(buffer)),
                1 => {}
                _ => return Err(BindingError::BoundTwice(buffer)),
            }
        }
        for (i, &(first, slot)) in self.slots.iter().enumerate() {
            if let Some(&(second, _)) = self.slots[i + 1..].iter().find(|(_, s)| *s == slot) {
                return Err(BindingError::SlotShared { slot, first, second });
            }
        }
        Ok(())
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::CURRENT
    }
}
