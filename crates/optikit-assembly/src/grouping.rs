//! The grouping engine: a single forward pass over the sequence path
//! that assembles physical parts and places them in the part tree.
//!
//! Surfaces followed by a non-air gap accumulate in a pending run; the
//! air gap that closes the run decides whether it becomes a single lens
//! or a cemented group. A surface bounded by air on both sides is
//! classified directly as mirror, thin element, or dummy plane. A
//! reflecting surface found *inside* a run (a Mangin mirror or an
//! internal prism face) folds the path back on itself; the fold is
//! resolved when the run closes: the effective surface count halves and
//! the far-side leaves are re-threaded onto the front profile slots.
//!
//! The engine assumes a well-formed sequence: transmitting dummy
//! surfaces at both ends with air gaps inside them. Malformed input
//! produces a malformed tree; it is not detected here.

use optikit_core::{Gap, GapId, IfcId, Interface, SequenceModel, Transform3};
use tracing::{debug, trace};

use crate::catalog::PartCatalog;
use crate::error::{AssemblyError, Result};
use crate::parts::{
    AirGap, CementedElement, DummyInterface, ElementId, Lens, Mirror, Part, ThinElement,
};
use crate::tree::{NodeId, NodeName, NodeTag, PartTree, Referent};

/// Label counters: lenses, cemented groups, mirrors and thin elements
/// share the element counter; dummies and air gaps run independently.
#[derive(Debug, Default)]
struct LabelCounters {
    elements: usize,
    dummies: usize,
    air_gaps: usize,
}

/// One surface of the pending non-air run.
#[derive(Debug, Clone)]
struct PendingSurface {
    idx: usize,
    ifc: IfcId,
    gap: GapId,
    tfrm: Transform3,
}

/// Group the sequence into parts, rebuilding the catalog population and
/// placing every part in the tree.
///
/// The tree is initialized from the sequence first when it is empty.
pub fn parts_from_sequence(
    seq: &SequenceModel,
    catalog: &mut PartCatalog,
    tree: &mut PartTree,
) -> Result<()> {
    if tree.is_empty() {
        tree.init_from_sequence(seq);
    }
    let g_tfrms = seq.compute_global_coords(1);
    let mut counters = LabelCounters::default();
    let mut pending: Vec<PendingSurface> = Vec::new();
    let mut buried_reflector = false;

    for seg in seq.path() {
        let g_tfrm = g_tfrms[seg.idx].clone();
        let Some(gap) = seg.gap else {
            // final surface: classify it if no run is open
            if pending.is_empty() {
                classify_airgap_surface(
                    seq,
                    catalog,
                    tree,
                    seg.idx,
                    None,
                    seg.ifc,
                    &g_tfrm,
                    &mut counters,
                )?;
            }
            continue;
        };

        if !gap.is_air() {
            // a non-air medium: absorb into the pending run
            if seg.ifc.is_reflecting() {
                if buried_reflector {
                    return Err(AssemblyError::MultipleBuriedReflectors { index: seg.idx });
                }
                buried_reflector = true;
            }
            pending.push(PendingSurface {
                idx: seg.idx,
                ifc: seg.ifc.id(),
                gap: gap.id(),
                tfrm: g_tfrm,
            });
            continue;
        }

        if pending.is_empty() {
            classify_airgap_surface(
                seq,
                catalog,
                tree,
                seg.idx,
                Some(gap),
                seg.ifc,
                &g_tfrm,
                &mut counters,
            )?;
            continue;
        }

        let mut num_eles = pending.len();
        if buried_reflector {
            // the run folds back through itself; only the front half
            // is distinct glass
            num_eles /= 2;
            pending.push(PendingSurface {
                idx: seg.idx,
                ifc: seg.ifc.id(),
                gap: gap.id(),
                tfrm: g_tfrm.clone(),
            });
        }
        // far boundary of the part: the current surface, or the
        // pre-buried boundary when the path folds back
        let (far_idx, far_ifc) = if buried_reflector {
            (pending[1].idx, pending[1].ifc)
        } else {
            (seg.idx, seg.ifc.id())
        };

        if num_eles == 1 {
            emit_lens(
                seq,
                catalog,
                tree,
                &pending,
                far_idx,
                far_ifc,
                buried_reflector,
                &mut counters,
            )?;
        } else if num_eles > 1 {
            if !buried_reflector {
                pending.push(PendingSurface {
                    idx: seg.idx,
                    ifc: seg.ifc.id(),
                    gap: gap.id(),
                    tfrm: g_tfrm.clone(),
                });
            }
            emit_cemented(
                seq,
                catalog,
                tree,
                &pending,
                num_eles,
                buried_reflector,
                &mut counters,
            )?;
        }
        // num_eles == 0: a buried reflector with no transmitting surface
        // in front of it; the run assembles no element

        emit_air_gap(catalog, tree, seg.idx, gap, &g_tfrm, &mut counters);
        pending.clear();
        buried_reflector = false;
    }

    debug!(parts = catalog.len(), "grouped sequence into parts");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn emit_lens(
    seq: &SequenceModel,
    catalog: &mut PartCatalog,
    tree: &mut PartTree,
    pending: &[PendingSurface],
    far_idx: usize,
    far_ifc: IfcId,
    buried_reflector: bool,
    counters: &mut LabelCounters,
) -> Result<()> {
    let first = &pending[0];
    let s1 = seq.interface(first.idx)?;
    let s2 = seq.interface(far_idx)?;
    let sd = s1.surface_od().max(s2.surface_od());

    let mut part = Part::Lens(Lens {
        id: ElementId(0),
        label: String::new(),
        s1: first.ifc,
        s2: far_ifc,
        gap: first.gap,
        idx: first.idx,
        idx2: far_idx,
        sd,
        tfrm: first.tfrm.clone(),
    });
    counters.elements += 1;
    let label = part.format_label(counters.elements);
    part.set_label(label);
    let id = catalog.add(part);
    let part = catalog.get(id).expect("part was just added");
    trace!(label = part.label(), idx = first.idx, idx2 = far_idx, "emitting lens");
    let e_node = tree.attach_fragment(&part.fragment());

    if buried_reflector {
        // the surface beyond the reflector is a second pass over the
        // front profile; pull its leaf, and the reflected-side glass
        // gap, into the lens
        let folded = pending.last().expect("run is non-empty");
        fold_leaf(tree, e_node, 1, folded.ifc);
        if let Some(n) = tree.find_node(Referent::Gap(pending[1].gap)) {
            tree.reparent(n, e_node);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn emit_cemented(
    seq: &SequenceModel,
    catalog: &mut PartCatalog,
    tree: &mut PartTree,
    pending: &[PendingSurface],
    num_eles: usize,
    buried_reflector: bool,
    counters: &mut LabelCounters,
) -> Result<()> {
    let kept = &pending[..num_eles + 1];
    let ifcs: Vec<IfcId> = kept.iter().map(|p| p.ifc).collect();
    let gaps: Vec<GapId> = kept[..num_eles].iter().map(|p| p.gap).collect();
    let idxs: Vec<usize> = kept.iter().map(|p| p.idx).collect();
    let mut sd = 0.0f64;
    for p in kept {
        sd = sd.max(seq.interface(p.idx)?.surface_od());
    }

    let mut part = Part::Cemented(CementedElement {
        id: ElementId(0),
        label: String::new(),
        ifcs,
        gaps,
        idxs,
        sd,
        tfrm: kept[0].tfrm.clone(),
    });
    counters.elements += 1;
    let label = part.format_label(counters.elements);
    part.set_label(label);
    let id = catalog.add(part);
    let part = catalog.get(id).expect("part was just added");
    trace!(label = part.label(), surfaces = num_eles + 1, "emitting cemented group");
    let e_node = tree.attach_fragment(&part.fragment());

    if buried_reflector {
        // far-side surfaces fold onto the front profile slots in
        // reverse order, each with the glass gap behind it
        for (slot, entry) in (1..=num_eles).zip(pending.iter().rev()) {
            fold_leaf(tree, e_node, slot, entry.ifc);
            let behind = &pending[pending.len() - slot - 1];
            if let Some(n) = tree.find_node(Referent::Gap(behind.gap)) {
                tree.reparent(n, e_node);
            }
        }
    }
    Ok(())
}

/// Hand a finished part to the catalog and splice its fragment in
/// under the tree root.
fn register_and_attach(catalog: &mut PartCatalog, tree: &mut PartTree, part: Part) -> NodeId {
    let id = catalog.add(part);
    let part = catalog.get(id).expect("part was just added");
    trace!(label = part.label(), "attaching part");
    tree.attach_part(part)
}

/// Move the leaf tracking `ifc` under profile slot `p<slot>` of `e_node`.
fn fold_leaf(tree: &mut PartTree, e_node: NodeId, slot: usize, ifc: IfcId) {
    if let Some(n) = tree.find_node(Referent::Interface(ifc)) {
        if let Some(p) = tree.find_child_by_name(e_node, &NodeName::Profile(slot)) {
            tree.reparent(n, p);
        }
    }
}

/// Classify a surface bounded by air on both sides (or the final
/// surface, when `gap` is absent): mirror, thin element, or dummy
/// plane; then emit the air-gap part for the following gap.
#[allow(clippy::too_many_arguments)]
fn classify_airgap_surface(
    seq: &SequenceModel,
    catalog: &mut PartCatalog,
    tree: &mut PartTree,
    idx: usize,
    gap: Option<&Gap>,
    ifc: &Interface,
    g_tfrm: &Transform3,
    counters: &mut LabelCounters,
) -> Result<()> {
    if ifc.is_reflecting() {
        let z_dir = seq.z_dir()[idx];
        let mut part = Part::Mirror(Mirror {
            id: ElementId(0),
            label: String::new(),
            s: ifc.id(),
            idx,
            sd: ifc.surface_od(),
            z_dir,
            tfrm: g_tfrm.clone(),
        });
        counters.elements += 1;
        let label = part.format_label(counters.elements);
        part.set_label(label);
        register_and_attach(catalog, tree, part);
    } else if ifc.is_thin_lens() {
        let mut part = Part::Thin(ThinElement {
            id: ElementId(0),
            label: String::new(),
            ifc: ifc.id(),
            idx,
            tfrm: g_tfrm.clone(),
        });
        counters.elements += 1;
        let label = part.format_label(counters.elements);
        part.set_label(label);
        register_and_attach(catalog, tree, part);
    } else {
        // transmit-only plane: object plane, stop plane, plain dummy
        let dummy = if idx == 0 {
            Some(("Object".to_string(), NodeTag::OBJECT))
        } else if seq.gap(idx - 1)?.is_air() {
            if seq.stop_surface == Some(idx) {
                Some(("Stop".to_string(), NodeTag::STOP))
            } else {
                counters.dummies += 1;
                Some((format!("D{}", counters.dummies), NodeTag::empty()))
            }
        } else {
            None
        };

        if let Some((label, extra_tag)) = dummy {
            let mut part = Part::Dummy(DummyInterface {
                id: ElementId(0),
                label: String::new(),
                ifc: ifc.id(),
                idx,
                sd: ifc.surface_od(),
                tfrm: g_tfrm.clone(),
            });
            part.set_label(label);
            let e_node = register_and_attach(catalog, tree, part);
            if !extra_tag.is_empty() {
                tree.add_tag(e_node, extra_tag);
            }
        }
    }

    if let Some(gap) = gap {
        emit_air_gap(catalog, tree, idx, gap, g_tfrm, counters);
    }
    Ok(())
}

fn emit_air_gap(
    catalog: &mut PartCatalog,
    tree: &mut PartTree,
    idx: usize,
    gap: &Gap,
    g_tfrm: &Transform3,
    counters: &mut LabelCounters,
) {
    let mut part = Part::AirGap(AirGap {
        id: ElementId(0),
        label: String::new(),
        gap: gap.id(),
        idx,
        tfrm: g_tfrm.clone(),
    });
    counters.air_gaps += 1;
    let label = part.format_label(counters.air_gaps);
    part.set_label(label);
    register_and_attach(catalog, tree, part);
}
