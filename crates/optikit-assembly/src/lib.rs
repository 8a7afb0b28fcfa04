//! # OptiKit Assembly
//!
//! Grouping and tree synchronization for optical assemblies. Converts
//! the flat surface/gap sequence of `optikit-core` into a hierarchy of
//! physical parts (lenses, cemented groups, mirrors, thin-lens markers,
//! dummy planes, air gaps) and keeps that hierarchy consistent with the
//! sequence across edits, save, and reload.
//!
//! The pieces:
//! - [`parts::Part`]: the closed set of part variants and their
//!   canonical tree fragments
//! - [`catalog::PartCatalog`]: ownership and label lookup for parts
//! - [`tree::PartTree`]: the arena-backed tree of named, tagged nodes
//! - [`grouping::parts_from_sequence`]: the single-pass grouping engine
//! - [`sync`]: restore (name → referent) and update (referent → name)
//! - [`serialization::TreeFile`]: the flat name/tag/parent file schema
//! - [`model::OpticalModel`]: a façade bundling all of the above

pub mod catalog;
pub mod error;
pub mod grouping;
pub mod model;
pub mod parts;
pub mod serialization;
pub mod sync;
pub mod tree;

pub use catalog::PartCatalog;
pub use error::{AssemblyError, Result};
pub use grouping::parts_from_sequence;
pub use model::OpticalModel;
pub use parts::{
    AirGap, CementedElement, DummyInterface, ElementId, Lens, Mirror, Part, ThinElement,
};
pub use serialization::{NodeRecord, TreeFile, TreeMetadata};
pub use sync::{sync_on_restore, sync_on_update};
pub use tree::{FragmentNode, NodeId, NodeName, NodeTag, PartTree, Referent};
