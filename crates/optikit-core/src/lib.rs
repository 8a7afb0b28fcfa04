//! # OptiKit Core
//!
//! Foundational model types for OptiKit: the sequence model of ordered
//! optical interfaces and gaps, the media that fill gaps, and the rigid
//! transforms carried by the path traversal. The assembly layer
//! (`optikit-assembly`) builds its part grouping and tree synchronization
//! on top of these types.

pub mod error;
pub mod medium;
pub mod sequence;
pub mod transform;

pub use error::{Result, SequenceError};
pub use medium::Medium;
pub use sequence::{
    Gap, GapId, IfcId, Interface, InteractMode, InterfaceKind, PathSegment, Profile,
    SequenceModel, ZDir,
};
pub use transform::Transform3;
