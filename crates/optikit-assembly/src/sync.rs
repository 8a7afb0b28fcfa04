//! The sync engine: keeps tree nodes and the sequence model consistent
//! across serialization and edits.
//!
//! Two directions with an asymmetric contract. Restore runs after a tree
//! has been deserialized: only names exist, so each name kind is parsed
//! and resolved to a live referent against the current sequence model
//! and catalog. Update runs after the sequence has been edited: the
//! referents are live but their indices (and therefore the index-bearing
//! names) may have shifted, so names are regenerated from current
//! positions.

use optikit_core::SequenceModel;
use tracing::debug;

use crate::catalog::PartCatalog;
use crate::error::{AssemblyError, Result};
use crate::parts::{ElementId, Part};
use crate::tree::{NodeId, NodeName, PartTree, Referent};

/// Resolve every node name to a live referent after deserialization.
///
/// Must run exactly once on a freshly loaded skeleton tree, before any
/// lookup operation is used.
pub fn sync_on_restore(
    tree: &mut PartTree,
    catalog: &PartCatalog,
    seq: &SequenceModel,
) -> Result<()> {
    let order = tree.preorder();
    for id in order {
        match tree.name(id).clone() {
            NodeName::Root => {}
            NodeName::Label(label) => {
                let eid = catalog
                    .id_by_label(&label)
                    .ok_or(AssemblyError::UnknownLabel { label })?;
                tree.set_referent(id, Referent::Element(eid));
            }
            NodeName::Ifc(idx) => {
                let ifc = seq.interface(idx)?;
                tree.set_referent(id, Referent::Interface(ifc.id()));
            }
            NodeName::Gap(idx) => {
                let gap = seq.gap(idx)?;
                tree.set_referent(id, Referent::Gap(gap.id()));
            }
            NodeName::Profile(n) => {
                let part = parent_part(tree, catalog, id)?;
                let list = part.interface_list();
                let ifc = list.get(n - 1).ok_or_else(|| AssemblyError::OrphanName {
                    name: tree.name(id).to_string(),
                })?;
                tree.set_referent(id, Referent::Profile(*ifc));
            }
            NodeName::DummyRef(_) | NodeName::ThinRef(_) => {
                let part = parent_part(tree, catalog, id)?;
                let ifc = part.ref_ifc().ok_or_else(|| AssemblyError::OrphanName {
                    name: tree.name(id).to_string(),
                })?;
                tree.set_referent(id, Referent::Interface(ifc));
            }
        }
    }
    debug!("restored part tree references");
    Ok(())
}

/// Regenerate every index-bearing name from the referent's current
/// position, after the sequence model has been edited.
///
/// Idempotent: a second run with no intervening edit changes nothing.
pub fn sync_on_update(
    tree: &mut PartTree,
    catalog: &PartCatalog,
    seq: &SequenceModel,
) -> Result<()> {
    let order = tree.preorder();
    for id in order {
        match tree.name(id).clone() {
            NodeName::Root => {}
            NodeName::Ifc(_) => {
                let ifc_id = match tree.referent(id) {
                    Some(Referent::Interface(i)) => i,
                    _ => continue,
                };
                let idx = seq
                    .index_of(ifc_id)
                    .ok_or_else(|| AssemblyError::DanglingReferent {
                        name: tree.name(id).to_string(),
                    })?;
                tree.set_name(id, NodeName::Ifc(idx));
            }
            NodeName::Gap(_) => {
                let gap_id = match tree.referent(id) {
                    Some(Referent::Gap(g)) => g,
                    _ => continue,
                };
                let idx = seq
                    .gap_index_of(gap_id)
                    .ok_or_else(|| AssemblyError::DanglingReferent {
                        name: tree.name(id).to_string(),
                    })?;
                tree.set_name(id, NodeName::Gap(idx));
            }
            NodeName::Profile(n) => {
                // re-resolve against the parent's current interface list
                let part = parent_part(tree, catalog, id)?;
                let list = part.interface_list();
                if let Some(ifc) = list.get(n - 1) {
                    tree.set_referent(id, Referent::Profile(*ifc));
                }
            }
            NodeName::DummyRef(_) => {
                let idx = refresh_ref_ifc(tree, catalog, seq, id)?;
                tree.set_name(id, NodeName::DummyRef(idx));
            }
            NodeName::ThinRef(_) => {
                let idx = refresh_ref_ifc(tree, catalog, seq, id)?;
                tree.set_name(id, NodeName::ThinRef(idx));
            }
            NodeName::Label(_) => {
                // element nodes track their part's current label
                if let Some(Referent::Element(eid)) = tree.referent(id) {
                    if let Some(part) = catalog.get(eid) {
                        tree.set_name(id, NodeName::Label(part.label().to_string()));
                    }
                }
            }
        }
    }
    debug!("refreshed part tree names");
    Ok(())
}

/// Re-point a `di`/`tl` node at its parent part's reference interface
/// and return that interface's current sequence index.
fn refresh_ref_ifc(
    tree: &mut PartTree,
    catalog: &PartCatalog,
    seq: &SequenceModel,
    id: NodeId,
) -> Result<usize> {
    let part = parent_part(tree, catalog, id)?;
    let ifc = part.ref_ifc().ok_or_else(|| AssemblyError::OrphanName {
        name: tree.name(id).to_string(),
    })?;
    let idx = seq
        .index_of(ifc)
        .ok_or_else(|| AssemblyError::DanglingReferent {
            name: tree.name(id).to_string(),
        })?;
    tree.set_referent(id, Referent::Interface(ifc));
    Ok(idx)
}

/// The catalog part of the nearest ancestor element node.
fn parent_part<'a>(
    tree: &PartTree,
    catalog: &'a PartCatalog,
    id: NodeId,
) -> Result<&'a Part> {
    let mut cur = tree.parent(id);
    while let Some(p) = cur {
        if let Some(Referent::Element(eid)) = tree.referent(p) {
            return element(catalog, eid, tree, id);
        }
        // skeleton trees have unresolved ancestors; fall back to the
        // label the node carries
        if let NodeName::Label(label) = tree.name(p) {
            if let Some(eid) = catalog.id_by_label(label) {
                return element(catalog, eid, tree, id);
            }
        }
        cur = tree.parent(p);
    }
    Err(AssemblyError::OrphanName {
        name: tree.name(id).to_string(),
    })
}

fn element<'a>(
    catalog: &'a PartCatalog,
    eid: ElementId,
    tree: &PartTree,
    id: NodeId,
) -> Result<&'a Part> {
    catalog.get(eid).ok_or_else(|| AssemblyError::OrphanName {
        name: tree.name(id).to_string(),
    })
}
