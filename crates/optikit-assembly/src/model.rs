//! The optical model façade: one sequence model, its part catalog, and
//! the part tree kept in sync with both.
//!
//! A full rebuild is the unit of atomicity. Callers edit the sequence,
//! then either rebuild the assembly wholesale or refresh the existing
//! tree's names; a tree built before an edit is stale until one of the
//! two runs.

use optikit_core::SequenceModel;
use tracing::debug;

use crate::catalog::PartCatalog;
use crate::error::Result;
use crate::grouping::parts_from_sequence;
use crate::serialization::TreeFile;
use crate::sync::{sync_on_restore, sync_on_update};
use crate::tree::PartTree;

/// A single optical model: sequence, catalog, and part tree.
#[derive(Debug, Clone, Default)]
pub struct OpticalModel {
    /// The ordered surface/gap sequence.
    pub seq: SequenceModel,
    /// Parts produced by the last grouping run.
    pub catalog: PartCatalog,
    /// The part tree over both.
    pub tree: PartTree,
}

impl OpticalModel {
    /// A model over an existing sequence, with no assembly built yet.
    pub fn new(seq: SequenceModel) -> Self {
        Self {
            seq,
            catalog: PartCatalog::new(),
            tree: PartTree::new(),
        }
    }

    /// Discard any previous grouping and rebuild catalog and tree from
    /// the current sequence.
    pub fn rebuild_assembly(&mut self) -> Result<()> {
        self.catalog = PartCatalog::new();
        self.tree = PartTree::new();
        parts_from_sequence(&self.seq, &mut self.catalog, &mut self.tree)?;
        debug!(parts = self.catalog.len(), "rebuilt assembly");
        Ok(())
    }

    /// Refresh tree names after a sequence edit, keeping the existing
    /// grouping.
    pub fn update_model(&mut self) -> Result<()> {
        sync_on_update(&mut self.tree, &self.catalog, &self.seq)
    }

    /// Snapshot the current tree for persistence.
    pub fn export_tree(&self, name: impl Into<String>) -> TreeFile {
        TreeFile::from_tree(name, &self.tree)
    }

    /// Adopt a deserialized skeleton tree, resolving every node against
    /// the current sequence and catalog.
    pub fn restore_tree(&mut self, file: &TreeFile) -> Result<()> {
        let mut tree = file.to_tree()?;
        sync_on_restore(&mut tree, &self.catalog, &self.seq)?;
        self.tree = tree;
        Ok(())
    }
}
