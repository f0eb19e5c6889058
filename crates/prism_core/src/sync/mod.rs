//! # Frame Synchronisation
//!
//! The producer (culling + assembly) and the consumer (GPU rasterisation)
//! run a frame apart:
//!
//! ```text
//! Frame N:
//!   Producer writes slot N % K
//!   GPU reads slot (N-1) % K
//!
//! Frame N+1:
//!   Producer may only write slot (N+1) % K once the GPU has
//!   signalled completion of the frame last written there.
//! ```
//!
//! Writing into a slot the GPU is still reading is impossible by
//! construction: a slot is handed out only after its completion signal.

mod frame_slots;

pub use frame_slots::{CompletionHandle, FrameSlots, FrameTicket, SlotWriter};
