//! The part tree: a rooted hierarchy of named, tagged nodes over the
//! sequence model and the part catalog.
//!
//! Nodes live in a dense arena addressed by [`NodeId`]; parent/child
//! relations are arena handles and a referent→node map gives O(1)
//! identity lookup. The tree never owns the objects its nodes reference:
//! interfaces and gaps belong to the sequence model, parts to the
//! catalog. Each referent appears as a node in the tree at most once;
//! attaching a part fragment detaches any previous owner of the
//! referents the fragment claims.

use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;
use optikit_core::{GapId, IfcId, SequenceModel};
use tracing::trace;

use crate::parts::{ElementId, Part};

bitflags! {
    /// Category markers carried by each node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NodeTag: u32 {
        /// Grouping node (currently only the root).
        const GROUP = 1 << 0;
        /// The synthetic root node.
        const ROOT = 1 << 1;
        /// An assembled physical part.
        const ELEMENT = 1 << 2;
        /// Lens part.
        const LENS = 1 << 3;
        /// Cemented multi-surface part.
        const CEMENTED = 1 << 4;
        /// Mirror part.
        const MIRROR = 1 << 5;
        /// Thin-lens part.
        const THIN_LENS = 1 << 6;
        /// Dummy-interface part.
        const DUMMY_IFC = 1 << 7;
        /// Air-gap part.
        const AIR_GAP = 1 << 8;
        /// Raw interface leaf.
        const IFC = 1 << 9;
        /// Raw gap leaf.
        const GAP = 1 << 10;
        /// Profile slot of a multi-surface part.
        const PROFILE = 1 << 11;
        /// The object-plane dummy.
        const OBJECT = 1 << 12;
        /// The aperture-stop dummy.
        const STOP = 1 << 13;
    }
}

/// Table driving the `#`-joined string form used by the tree file schema.
const TAG_NAMES: &[(NodeTag, &str)] = &[
    (NodeTag::GROUP, "group"),
    (NodeTag::ROOT, "root"),
    (NodeTag::ELEMENT, "element"),
    (NodeTag::LENS, "lens"),
    (NodeTag::CEMENTED, "cemented"),
    (NodeTag::MIRROR, "mirror"),
    (NodeTag::THIN_LENS, "thinlens"),
    (NodeTag::DUMMY_IFC, "dummyifc"),
    (NodeTag::AIR_GAP, "airgap"),
    (NodeTag::IFC, "ifc"),
    (NodeTag::GAP, "gap"),
    (NodeTag::PROFILE, "profile"),
    (NodeTag::OBJECT, "object"),
    (NodeTag::STOP, "stop"),
];

impl NodeTag {
    /// Default filter for [`PartTree::find_enclosing`]: the part-level
    /// ancestors a leaf can belong to.
    pub const PART_FILTER: NodeTag = NodeTag::ELEMENT
        .union(NodeTag::AIR_GAP)
        .union(NodeTag::DUMMY_IFC);

    /// The `#`-joined string form, e.g. `#element#lens`.
    pub fn tag_string(self) -> String {
        let mut s = String::new();
        for (flag, name) in TAG_NAMES {
            if self.contains(*flag) {
                s.push('#');
                s.push_str(name);
            }
        }
        s
    }

    /// Parse the `#`-joined string form; `None` on an unknown marker.
    pub fn parse_tag_string(s: &str) -> Option<NodeTag> {
        let mut tag = NodeTag::empty();
        for token in s.split('#').filter(|t| !t.is_empty()) {
            let (flag, _) = TAG_NAMES.iter().find(|(_, name)| *name == token)?;
            tag |= *flag;
        }
        Some(tag)
    }
}

/// A node name, parsed into its schema kind.
///
/// The string forms are the serialized schema: `i<idx>`/`g<idx>` for raw
/// sequence entries, `p<n>` for profile slots, `di<idx>`/`tl<idx>` for a
/// part's designated reference interface, `root` for the root, and
/// anything else is an element label resolved through the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeName {
    /// The synthetic root.
    Root,
    /// Raw interface at a sequence index.
    Ifc(usize),
    /// Raw gap at a sequence index.
    Gap(usize),
    /// The n-th profile slot of the parent element (1-based).
    Profile(usize),
    /// Reference interface of a dummy-interface part, index embedded.
    DummyRef(usize),
    /// Reference interface of a thin-lens part, index embedded.
    ThinRef(usize),
    /// An element label, resolved through the catalog.
    Label(String),
}

impl NodeName {
    /// Parse a serialized name into its kind. Never fails: anything that
    /// does not match a prefix form is a label.
    pub fn parse(s: &str) -> NodeName {
        fn digits(s: &str) -> Option<usize> {
            if s.is_empty() {
                return None;
            }
            s.parse().ok()
        }

        if s == "root" {
            return NodeName::Root;
        }
        if let Some(rest) = s.strip_prefix("di") {
            if let Some(n) = digits(rest) {
                return NodeName::DummyRef(n);
            }
        }
        if let Some(rest) = s.strip_prefix("tl") {
            if let Some(n) = digits(rest) {
                return NodeName::ThinRef(n);
            }
        }
        if let Some(rest) = s.strip_prefix('i') {
            if let Some(n) = digits(rest) {
                return NodeName::Ifc(n);
            }
        }
        if let Some(rest) = s.strip_prefix('g') {
            if let Some(n) = digits(rest) {
                return NodeName::Gap(n);
            }
        }
        if let Some(rest) = s.strip_prefix('p') {
            if let Some(n) = digits(rest) {
                return NodeName::Profile(n);
            }
        }
        NodeName::Label(s.to_string())
    }
}

impl fmt::Display for NodeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeName::Root => write!(f, "root"),
            NodeName::Ifc(i) => write!(f, "i{i}"),
            NodeName::Gap(i) => write!(f, "g{i}"),
            NodeName::Profile(n) => write!(f, "p{n}"),
            NodeName::DummyRef(i) => write!(f, "di{i}"),
            NodeName::ThinRef(i) => write!(f, "tl{i}"),
            NodeName::Label(s) => write!(f, "{s}"),
        }
    }
}

/// Identity of the externally owned object a node references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Referent {
    /// An interface owned by the sequence model.
    Interface(IfcId),
    /// A gap owned by the sequence model.
    Gap(GapId),
    /// The profile of an interface.
    Profile(IfcId),
    /// A part owned by the catalog.
    Element(ElementId),
}

/// A detached subtree description, produced by a part and spliced into
/// the tree by [`PartTree::attach_part`].
#[derive(Debug, Clone)]
pub struct FragmentNode {
    /// Node name.
    pub name: NodeName,
    /// Node tags.
    pub tag: NodeTag,
    /// Referent the node will track.
    pub referent: Option<Referent>,
    /// Child fragments, in order.
    pub children: Vec<FragmentNode>,
}

impl FragmentNode {
    /// A leaf fragment node.
    pub fn leaf(name: NodeName, tag: NodeTag, referent: Referent) -> Self {
        Self {
            name,
            tag,
            referent: Some(referent),
            children: Vec::new(),
        }
    }

    /// An interior fragment node with children.
    pub fn branch(
        name: NodeName,
        tag: NodeTag,
        referent: Referent,
        children: Vec<FragmentNode>,
    ) -> Self {
        Self {
            name,
            tag,
            referent: Some(referent),
            children,
        }
    }

    fn collect_referents(&self, out: &mut Vec<Referent>) {
        if let Some(r) = self.referent {
            out.push(r);
        }
        for c in &self.children {
            c.collect_referents(out);
        }
    }
}

/// Stable handle of a node in the tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone)]
struct Node {
    name: NodeName,
    tag: NodeTag,
    referent: Option<Referent>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The part tree.
#[derive(Debug, Clone)]
pub struct PartTree {
    nodes: Vec<Node>,
    root: NodeId,
    by_referent: HashMap<Referent, NodeId>,
}

impl PartTree {
    /// A tree holding only the synthetic root.
    pub fn new() -> Self {
        let root = Node {
            name: NodeName::Root,
            tag: NodeTag::GROUP | NodeTag::ROOT,
            referent: None,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            by_referent: HashMap::new(),
        }
    }

    /// Handle of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Whether the root has no children yet.
    pub fn is_empty(&self) -> bool {
        self.nodes[self.root.0 as usize].children.is_empty()
    }

    /// Name of a node.
    pub fn name(&self, id: NodeId) -> &NodeName {
        &self.nodes[id.0 as usize].name
    }

    /// Tags of a node.
    pub fn tag(&self, id: NodeId) -> NodeTag {
        self.nodes[id.0 as usize].tag
    }

    /// Referent of a node; the root (and unresolved skeleton nodes) have
    /// none.
    pub fn referent(&self, id: NodeId) -> Option<Referent> {
        self.nodes[id.0 as usize].referent
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0 as usize].parent
    }

    /// Children of a node, in order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0 as usize].children
    }

    pub(crate) fn set_name(&mut self, id: NodeId, name: NodeName) {
        self.nodes[id.0 as usize].name = name;
    }

    pub(crate) fn add_tag(&mut self, id: NodeId, tag: NodeTag) {
        self.nodes[id.0 as usize].tag |= tag;
    }

    /// Point a node at a (possibly different) referent, keeping the
    /// identity map consistent.
    pub(crate) fn set_referent(&mut self, id: NodeId, referent: Referent) {
        if let Some(old) = self.nodes[id.0 as usize].referent {
            if self.by_referent.get(&old) == Some(&id) {
                self.by_referent.remove(&old);
            }
        }
        self.nodes[id.0 as usize].referent = Some(referent);
        self.by_referent.insert(referent, id);
    }

    fn new_node(
        &mut self,
        name: NodeName,
        tag: NodeTag,
        referent: Option<Referent>,
        parent: NodeId,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name,
            tag,
            referent,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0 as usize].children.push(id);
        if let Some(r) = referent {
            self.by_referent.insert(r, id);
        }
        id
    }

    /// Populate an empty tree with one node per surface and per gap of
    /// the sequence, in order, directly under the root. A no-op guard
    /// applies when the tree already has children.
    pub fn init_from_sequence(&mut self, seq: &SequenceModel) {
        if !self.is_empty() {
            return;
        }
        let root = self.root;
        for (i, ifc) in seq.ifcs().iter().enumerate() {
            self.new_node(
                NodeName::Ifc(i),
                NodeTag::IFC,
                Some(Referent::Interface(ifc.id())),
                root,
            );
            if let Ok(gap) = seq.gap(i) {
                self.new_node(
                    NodeName::Gap(i),
                    NodeTag::GAP,
                    Some(Referent::Gap(gap.id())),
                    root,
                );
            }
        }
        trace!(surfaces = seq.ifcs().len(), "initialized part tree from sequence");
    }

    /// Identity lookup of the node tracking `referent`.
    pub fn find_node(&self, referent: Referent) -> Option<NodeId> {
        self.by_referent.get(&referent).copied()
    }

    /// First ancestor of `referent`'s node whose tags intersect `filter`.
    pub fn find_enclosing(&self, referent: Referent, filter: NodeTag) -> Option<NodeId> {
        let mut cur = self.parent(self.find_node(referent)?);
        while let Some(id) = cur {
            if self.tag(id).intersects(filter) {
                return Some(id);
            }
            cur = self.parent(id);
        }
        None
    }

    /// Referent of the enclosing part of `referent`, if any.
    pub fn find_enclosing_part(&self, referent: Referent, filter: NodeTag) -> Option<Referent> {
        self.find_enclosing(referent, filter)
            .and_then(|id| self.referent(id))
    }

    /// Every node whose tags intersect `filter`, in pre-order.
    pub fn nodes_matching(&self, filter: NodeTag) -> Vec<NodeId> {
        self.preorder()
            .into_iter()
            .filter(|id| self.tag(*id).intersects(filter))
            .collect()
    }

    /// All reachable nodes in pre-order, root first.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            for child in self.children(id).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Direct child of `parent` with the given name.
    pub fn find_child_by_name(&self, parent: NodeId, name: &NodeName) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|id| self.name(*id) == name)
    }

    /// Detach a node and its subtree from the tree; subtree referents
    /// drop out of the identity map.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0 as usize].parent.take() {
            self.nodes[parent.0 as usize].children.retain(|c| *c != id);
        }
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            if let Some(r) = self.nodes[n.0 as usize].referent {
                if self.by_referent.get(&r) == Some(&n) {
                    self.by_referent.remove(&r);
                }
            }
            stack.extend(self.nodes[n.0 as usize].children.iter().copied());
        }
    }

    /// Move a node (with its subtree) under a new parent, appended after
    /// the parent's existing children.
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) {
        if let Some(parent) = self.nodes[id.0 as usize].parent.take() {
            self.nodes[parent.0 as usize].children.retain(|c| *c != id);
        }
        self.nodes[id.0 as usize].parent = Some(new_parent);
        self.nodes[new_parent.0 as usize].children.push(id);
    }

    /// Build a part's canonical fragment and splice it in under the
    /// root, evicting previous owners of the referents it claims.
    pub fn attach_part(&mut self, part: &Part) -> NodeId {
        self.attach_fragment(&part.fragment())
    }

    /// Splice a part's canonical fragment in under the root.
    ///
    /// Two phases: first every referent the fragment claims evicts its
    /// current owning node (with subtree), then the fragment is built and
    /// attached. Returns the fragment's top node.
    pub fn attach_fragment(&mut self, fragment: &FragmentNode) -> NodeId {
        let mut claimed = Vec::new();
        fragment.collect_referents(&mut claimed);
        for referent in claimed {
            if let Some(old) = self.find_node(referent) {
                self.detach(old);
            }
        }
        let root = self.root;
        self.splice(fragment, root)
    }

    fn splice(&mut self, fragment: &FragmentNode, parent: NodeId) -> NodeId {
        let id = self.new_node(
            fragment.name.clone(),
            fragment.tag,
            fragment.referent,
            parent,
        );
        for child in &fragment.children {
            self.splice(child, id);
        }
        id
    }

    /// Recreate a node from its serialized skeleton form (name + tag,
    /// referent unresolved). Used by the tree-file loader.
    pub(crate) fn add_skeleton_node(
        &mut self,
        name: NodeName,
        tag: NodeTag,
        parent: NodeId,
    ) -> NodeId {
        self.new_node(name, tag, None, parent)
    }

    /// Indented rendering of the tree, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root, 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(&format!("{} {}\n", self.name(id), self.tag(id).tag_string()));
        for child in self.children(id) {
            self.render_node(*child, depth + 1, out);
        }
    }
}

impl Default for PartTree {
    fn default() -> Self {
        Self::new()
    }
}
