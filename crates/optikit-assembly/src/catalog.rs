//! The part catalog: ownership and label lookup for assembled parts.
//!
//! The grouping engine repopulates the catalog wholesale on every run;
//! ids are stable within one population and label lookup backs the
//! restore direction of the sync engine.

use std::collections::HashMap;

use tracing::trace;

use crate::parts::{ElementId, Part};

/// Owns the parts produced by the grouping engine.
#[derive(Debug, Clone, Default)]
pub struct PartCatalog {
    parts: Vec<Part>,
    by_id: HashMap<ElementId, usize>,
    by_label: HashMap<String, ElementId>,
    next_id: u64,
}

impl PartCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a part, assigning its stable id and registering
    /// its label.
    pub fn add(&mut self, mut part: Part) -> ElementId {
        self.next_id += 1;
        let id = ElementId(self.next_id);
        part.set_id(id);
        trace!(label = part.label(), "registered part");
        self.by_id.insert(id, self.parts.len());
        self.by_label.insert(part.label().to_string(), id);
        self.parts.push(part);
        id
    }

    /// The part with the given id.
    pub fn get(&self, id: ElementId) -> Option<&Part> {
        self.by_id.get(&id).map(|i| &self.parts[*i])
    }

    /// The part with the given label.
    pub fn by_label(&self, label: &str) -> Option<&Part> {
        self.by_label.get(label).and_then(|id| self.get(*id))
    }

    /// Id of the part with the given label.
    pub fn id_by_label(&self, label: &str) -> Option<ElementId> {
        self.by_label.get(label).copied()
    }

    /// All parts, in registration order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the catalog holds no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Discard every part; the next grouping run starts fresh.
    pub fn clear(&mut self) {
        self.parts.clear();
        self.by_id.clear();
        self.by_label.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parts::AirGap;
    use optikit_core::{GapId, Transform3};

    fn air_gap(label: &str) -> Part {
        Part::AirGap(AirGap {
            id: ElementId(0),
            label: label.to_string(),
            gap: GapId(1),
            idx: 0,
            tfrm: Transform3::identity(),
        })
    }

    #[test]
    fn test_add_assigns_distinct_ids() {
        let mut catalog = PartCatalog::new();
        let a = catalog.add(air_gap("AG1"));
        let b = catalog.add(air_gap("AG2"));
        assert_ne!(a, b);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get(a).unwrap().label(), "AG1");
    }

    #[test]
    fn test_label_lookup() {
        let mut catalog = PartCatalog::new();
        let id = catalog.add(air_gap("AG1"));
        assert_eq!(catalog.id_by_label("AG1"), Some(id));
        assert!(catalog.by_label("AG9").is_none());
    }

    #[test]
    fn test_clear_discards_stale_parts() {
        let mut catalog = PartCatalog::new();
        catalog.add(air_gap("AG1"));
        catalog.clear();
        assert!(catalog.is_empty());
        assert!(catalog.by_label("AG1").is_none());
    }
}
