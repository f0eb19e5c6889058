//! Visibility culling.
//!
//! Decides, per camera, which instances survive: state overrides first
//! (hidden, isolation), then frustum planes, clip planes and the optional
//! screen-space contribution test.

mod contribution;
mod hidden;
mod visibility;

pub use contribution::contribution_area;
pub use hidden::HiddenResolver;
pub use visibility::{classify, cull_frame, CullStats, SurvivorList, Verdict, VisibilityKernel};
