//! Serialization for part trees.
//!
//! A tree serializes to a flat, pre-ordered list of (name, tag, parent)
//! records in JSON; referents are never written. Loading rebuilds a
//! skeleton tree whose referents must be resolved with
//! [`crate::sync::sync_on_restore`] before any lookup is used.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::AssemblyError;
use crate::tree::{NodeId, NodeName, NodeTag, PartTree};

/// Tree file format version
const FILE_FORMAT_VERSION: &str = "1.0";

/// Complete tree file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeFile {
    pub version: String,
    pub metadata: TreeMetadata,
    pub nodes: Vec<NodeRecord>,
}

/// Tree file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeMetadata {
    pub name: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// One serialized node: name, tag string, and the record index of its
/// parent (`None` only for the root, which must come first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub tag: String,
    pub parent: Option<u32>,
}

impl TreeFile {
    /// Snapshot a tree into its serialized form.
    pub fn from_tree(name: impl Into<String>, tree: &PartTree) -> Self {
        let now = Utc::now();
        let order = tree.preorder();
        let mut record_index: HashMap<NodeId, u32> = HashMap::with_capacity(order.len());
        let mut nodes = Vec::with_capacity(order.len());
        for id in order {
            record_index.insert(id, nodes.len() as u32);
            nodes.push(NodeRecord {
                name: tree.name(id).to_string(),
                tag: tree.tag(id).tag_string(),
                parent: tree.parent(id).map(|p| record_index[&p]),
            });
        }
        Self {
            version: FILE_FORMAT_VERSION.to_string(),
            metadata: TreeMetadata {
                name: name.into(),
                created: now,
                modified: now,
            },
            nodes,
        }
    }

    /// Rebuild the skeleton tree: shape and names only, no referents.
    ///
    /// Validates the record list before constructing anything: the root
    /// must be first with no parent, every other record's parent must
    /// point at an earlier record, no record past the first may reuse
    /// the root name, and tag strings must parse.
    pub fn to_tree(&self) -> std::result::Result<PartTree, AssemblyError> {
        let malformed = |reason: String| AssemblyError::MalformedTreeFile { reason };

        let first = self
            .nodes
            .first()
            .ok_or_else(|| malformed("empty node list".to_string()))?;
        if first.parent.is_some() || NodeName::parse(&first.name) != NodeName::Root {
            return Err(malformed("first record must be the root".to_string()));
        }
        for (i, record) in self.nodes.iter().enumerate().skip(1) {
            match record.parent {
                Some(p) if (p as usize) < i => {}
                Some(p) => {
                    return Err(malformed(format!(
                        "record {i} has forward parent reference {p}"
                    )))
                }
                None => return Err(malformed(format!("record {i} has no parent"))),
            }
        }

        let mut tree = PartTree::new();
        let mut ids: Vec<NodeId> = Vec::with_capacity(self.nodes.len());
        ids.push(tree.root());
        for (i, record) in self.nodes.iter().enumerate().skip(1) {
            let tag = NodeTag::parse_tag_string(&record.tag).ok_or_else(|| {
                malformed(format!("record {i} has unknown tag '{}'", record.tag))
            })?;
            let name = NodeName::parse(&record.name);
            if name == NodeName::Root {
                return Err(malformed(format!("record {i} reuses the root name")));
            }
            let parent = ids[record.parent.expect("validated above") as usize];
            ids.push(tree.add_skeleton_node(name, tag, parent));
        }
        Ok(tree)
    }

    /// Save the tree file as JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("Failed to serialize part tree")?;
        std::fs::write(path.as_ref(), json).context("Failed to write tree file")?;
        Ok(())
    }

    /// Load a tree file from JSON.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read tree file")?;
        let mut file: TreeFile =
            serde_json::from_str(&content).context("Failed to parse tree file")?;
        file.metadata.modified = Utc::now();
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, tag: &str, parent: Option<u32>) -> NodeRecord {
        NodeRecord {
            name: name.to_string(),
            tag: tag.to_string(),
            parent,
        }
    }

    fn file_with(nodes: Vec<NodeRecord>) -> TreeFile {
        let now = Utc::now();
        TreeFile {
            version: FILE_FORMAT_VERSION.to_string(),
            metadata: TreeMetadata {
                name: "test".to_string(),
                created: now,
                modified: now,
            },
            nodes,
        }
    }

    #[test]
    fn test_to_tree_builds_skeleton() {
        let file = file_with(vec![
            record("root", "#group#root", None),
            record("E1", "#element#lens", Some(0)),
            record("p1", "#profile", Some(1)),
            record("i1", "#ifc", Some(2)),
        ]);
        let tree = file.to_tree().unwrap();
        let kids = tree.children(tree.root());
        assert_eq!(kids.len(), 1);
        let e1 = kids[0];
        assert_eq!(tree.name(e1).to_string(), "E1");
        assert!(tree.referent(e1).is_none());
        assert_eq!(tree.tag(e1), NodeTag::ELEMENT | NodeTag::LENS);
    }

    #[test]
    fn test_to_tree_rejects_forward_parent() {
        let file = file_with(vec![
            record("root", "#group#root", None),
            record("i1", "#ifc", Some(2)),
            record("E1", "#element#lens", Some(0)),
        ]);
        let err = file.to_tree().unwrap_err();
        assert!(matches!(err, AssemblyError::MalformedTreeFile { .. }));
    }

    #[test]
    fn test_to_tree_rejects_missing_root() {
        let file = file_with(vec![record("E1", "#element#lens", None)]);
        assert!(matches!(
            file.to_tree().unwrap_err(),
            AssemblyError::MalformedTreeFile { .. }
        ));
    }

    #[test]
    fn test_to_tree_rejects_second_root_record() {
        let file = file_with(vec![
            record("root", "#group#root", None),
            record("root", "#group#root", Some(0)),
        ]);
        assert!(matches!(
            file.to_tree().unwrap_err(),
            AssemblyError::MalformedTreeFile { .. }
        ));
    }

    #[test]
    fn test_to_tree_rejects_unknown_tag() {
        let file = file_with(vec![
            record("root", "#group#root", None),
            record("i1", "#widget", Some(0)),
        ]);
        assert!(matches!(
            file.to_tree().unwrap_err(),
            AssemblyError::MalformedTreeFile { .. }
        ));
    }

    #[test]
    fn test_round_trip_preserves_shape() {
        let file = file_with(vec![
            record("root", "#group#root", None),
            record("E1", "#element#lens", Some(0)),
            record("p1", "#profile", Some(1)),
            record("i1", "#ifc", Some(2)),
            record("g1", "#gap", Some(1)),
        ]);
        let tree = file.to_tree().unwrap();
        let out = TreeFile::from_tree("test", &tree);
        let names: Vec<&str> = out.nodes.iter().map(|r| r.name.as_str()).collect();
        let parents: Vec<Option<u32>> = out.nodes.iter().map(|r| r.parent).collect();
        assert_eq!(names, vec!["root", "E1", "p1", "i1", "g1"]);
        assert_eq!(parents, vec![None, Some(0), Some(1), Some(2), Some(1)]);
    }
}
