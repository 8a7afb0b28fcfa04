//! Physical part variants assembled from runs of sequence surfaces.
//!
//! Each variant records the stable ids of the interfaces and gaps it
//! subsumes, the sequence indices they occupied when the part was built,
//! and can produce its canonical part-tree fragment. Labels are assigned
//! by the grouping engine from per-variant templates; lenses, cemented
//! groups, mirrors and thin elements share one running element counter,
//! dummy interfaces and air gaps each keep their own.

use optikit_core::{GapId, IfcId, Transform3, ZDir};
use serde::{Deserialize, Serialize};

use crate::tree::{FragmentNode, NodeName, NodeTag, Referent};

/// Stable identity of a part, assigned by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub u64);

/// A singlet lens: two interfaces around one non-air gap.
#[derive(Debug, Clone)]
pub struct Lens {
    pub(crate) id: ElementId,
    pub(crate) label: String,
    /// Front interface.
    pub s1: IfcId,
    /// Back interface.
    pub s2: IfcId,
    /// The glass gap between them.
    pub gap: GapId,
    /// Sequence index of `s1` at build time.
    pub idx: usize,
    /// Sequence index of `s2` at build time.
    pub idx2: usize,
    /// Clear-aperture diameter.
    pub sd: f64,
    /// Global transform of the front interface.
    pub tfrm: Transform3,
}

/// A cemented group: N interfaces joined by N-1 non-air gaps.
#[derive(Debug, Clone)]
pub struct CementedElement {
    pub(crate) id: ElementId,
    pub(crate) label: String,
    /// Constituent interfaces, in physical order.
    pub ifcs: Vec<IfcId>,
    /// The cement gaps between them.
    pub gaps: Vec<GapId>,
    /// Sequence indices of the interfaces at build time.
    pub idxs: Vec<usize>,
    /// Clear-aperture diameter.
    pub sd: f64,
    /// Global transform of the first interface.
    pub tfrm: Transform3,
}

/// A mirror: one reflecting interface.
#[derive(Debug, Clone)]
pub struct Mirror {
    pub(crate) id: ElementId,
    pub(crate) label: String,
    /// The reflecting interface.
    pub s: IfcId,
    /// Sequence index at build time.
    pub idx: usize,
    /// Clear-aperture diameter.
    pub sd: f64,
    /// Propagation direction leaving the mirror.
    pub z_dir: ZDir,
    /// Global transform of the interface.
    pub tfrm: Transform3,
}

/// A thin-lens marker surface.
#[derive(Debug, Clone)]
pub struct ThinElement {
    pub(crate) id: ElementId,
    pub(crate) label: String,
    /// The marker interface.
    pub ifc: IfcId,
    /// Sequence index at build time.
    pub idx: usize,
    /// Global transform of the interface.
    pub tfrm: Transform3,
}

/// A non-refracting, non-reflecting reference plane: object plane, stop
/// plane, or a plain dummy.
#[derive(Debug, Clone)]
pub struct DummyInterface {
    pub(crate) id: ElementId,
    pub(crate) label: String,
    /// The reference interface.
    pub ifc: IfcId,
    /// Sequence index at build time.
    pub idx: usize,
    /// Clear-aperture diameter.
    pub sd: f64,
    /// Global transform of the interface.
    pub tfrm: Transform3,
}

/// An air gap between parts.
#[derive(Debug, Clone)]
pub struct AirGap {
    pub(crate) id: ElementId,
    pub(crate) label: String,
    /// The air gap.
    pub gap: GapId,
    /// Sequence index of the gap at build time.
    pub idx: usize,
    /// Global transform at the gap's leading surface.
    pub tfrm: Transform3,
}

/// An assembled part, one of the closed set of variants.
#[derive(Debug, Clone)]
pub enum Part {
    /// Singlet lens.
    Lens(Lens),
    /// Cemented multi-surface group.
    Cemented(CementedElement),
    /// Mirror.
    Mirror(Mirror),
    /// Thin-lens marker.
    Thin(ThinElement),
    /// Dummy reference plane.
    Dummy(DummyInterface),
    /// Air gap.
    AirGap(AirGap),
}

impl Part {
    /// Catalog-assigned id of this part.
    pub fn id(&self) -> ElementId {
        match self {
            Part::Lens(p) => p.id,
            Part::Cemented(p) => p.id,
            Part::Mirror(p) => p.id,
            Part::Thin(p) => p.id,
            Part::Dummy(p) => p.id,
            Part::AirGap(p) => p.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: ElementId) {
        match self {
            Part::Lens(p) => p.id = id,
            Part::Cemented(p) => p.id = id,
            Part::Mirror(p) => p.id = id,
            Part::Thin(p) => p.id = id,
            Part::Dummy(p) => p.id = id,
            Part::AirGap(p) => p.id = id,
        }
    }

    pub(crate) fn set_label(&mut self, label: String) {
        match self {
            Part::Lens(p) => p.label = label,
            Part::Cemented(p) => p.label = label,
            Part::Mirror(p) => p.label = label,
            Part::Thin(p) => p.label = label,
            Part::Dummy(p) => p.label = label,
            Part::AirGap(p) => p.label = label,
        }
    }

    /// Unique label of this part.
    pub fn label(&self) -> &str {
        match self {
            Part::Lens(p) => &p.label,
            Part::Cemented(p) => &p.label,
            Part::Mirror(p) => &p.label,
            Part::Thin(p) => &p.label,
            Part::Dummy(p) => &p.label,
            Part::AirGap(p) => &p.label,
        }
    }

    /// The label template for this variant, `{}` standing for the
    /// counter value.
    pub fn label_template(&self) -> &'static str {
        match self {
            Part::Lens(_) => "E{}",
            Part::Cemented(_) => "CE{}",
            Part::Mirror(_) => "M{}",
            Part::Thin(_) => "TL{}",
            Part::Dummy(_) => "D{}",
            Part::AirGap(_) => "AG{}",
        }
    }

    /// Instantiate the variant's label template with a counter value.
    pub fn format_label(&self, n: usize) -> String {
        self.label_template().replace("{}", &n.to_string())
    }

    /// Ordered constituent interfaces, where applicable.
    pub fn interface_list(&self) -> Vec<IfcId> {
        match self {
            Part::Lens(p) => vec![p.s1, p.s2],
            Part::Cemented(p) => p.ifcs.clone(),
            Part::Mirror(p) => vec![p.s],
            Part::Thin(p) => vec![p.ifc],
            Part::Dummy(p) => vec![p.ifc],
            Part::AirGap(_) => Vec::new(),
        }
    }

    /// The single designated reference interface of dummy and thin-lens
    /// parts.
    pub fn ref_ifc(&self) -> Option<IfcId> {
        match self {
            Part::Dummy(p) => Some(p.ifc),
            Part::Thin(p) => Some(p.ifc),
            _ => None,
        }
    }

    /// Tags of the part's tree node.
    pub fn tag(&self) -> NodeTag {
        match self {
            Part::Lens(_) => NodeTag::ELEMENT | NodeTag::LENS,
            Part::Cemented(_) => NodeTag::ELEMENT | NodeTag::CEMENTED,
            Part::Mirror(_) => NodeTag::ELEMENT | NodeTag::MIRROR,
            Part::Thin(_) => NodeTag::ELEMENT | NodeTag::THIN_LENS,
            Part::Dummy(_) => NodeTag::ELEMENT | NodeTag::DUMMY_IFC,
            Part::AirGap(_) => NodeTag::AIR_GAP,
        }
    }

    /// The canonical part-tree fragment for this part, fully detached.
    ///
    /// Leaves reference exactly the raw interfaces and gaps the part
    /// subsumes; profile slots `p1..` reference interface profiles in
    /// `interface_list()` order.
    pub fn fragment(&self) -> FragmentNode {
        let top_name = NodeName::Label(self.label().to_string());
        let referent = Referent::Element(self.id());
        match self {
            Part::Lens(p) => FragmentNode::branch(
                top_name,
                self.tag(),
                referent,
                vec![
                    profile_slot(1, p.s1, p.idx),
                    FragmentNode::leaf(NodeName::Gap(p.idx), NodeTag::GAP, Referent::Gap(p.gap)),
                    profile_slot(2, p.s2, p.idx2),
                ],
            ),
            Part::Cemented(p) => {
                let n = p.ifcs.len();
                let mut children = Vec::with_capacity(2 * n - 1);
                for j in 0..n {
                    if j < n - 1 {
                        children.push(profile_slot(j + 1, p.ifcs[j], p.idxs[j]));
                        children.push(FragmentNode::leaf(
                            NodeName::Gap(p.idxs[j]),
                            NodeTag::GAP,
                            Referent::Gap(p.gaps[j]),
                        ));
                    } else {
                        // final interface hangs directly under the part
                        children.push(FragmentNode::leaf(
                            NodeName::Ifc(p.idxs[j]),
                            NodeTag::IFC,
                            Referent::Interface(p.ifcs[j]),
                        ));
                    }
                }
                FragmentNode::branch(top_name, self.tag(), referent, children)
            }
            Part::Mirror(p) => FragmentNode::branch(
                top_name,
                self.tag(),
                referent,
                vec![profile_slot(1, p.s, p.idx)],
            ),
            Part::Thin(p) => FragmentNode::branch(
                top_name,
                self.tag(),
                referent,
                vec![FragmentNode::leaf(
                    NodeName::ThinRef(p.idx),
                    NodeTag::IFC,
                    Referent::Interface(p.ifc),
                )],
            ),
            Part::Dummy(p) => FragmentNode::branch(
                top_name,
                self.tag(),
                referent,
                vec![FragmentNode::leaf(
                    NodeName::DummyRef(p.idx),
                    NodeTag::IFC,
                    Referent::Interface(p.ifc),
                )],
            ),
            Part::AirGap(p) => FragmentNode::branch(
                top_name,
                self.tag(),
                referent,
                vec![FragmentNode::leaf(
                    NodeName::Gap(p.idx),
                    NodeTag::GAP,
                    Referent::Gap(p.gap),
                )],
            ),
        }
    }
}

/// A `p<n>` profile slot holding its interface leaf.
fn profile_slot(n: usize, ifc: IfcId, idx: usize) -> FragmentNode {
    FragmentNode::branch(
        NodeName::Profile(n),
        NodeTag::PROFILE,
        Referent::Profile(ifc),
        vec![FragmentNode::leaf(
            NodeName::Ifc(idx),
            NodeTag::IFC,
            Referent::Interface(ifc),
        )],
    )
}
