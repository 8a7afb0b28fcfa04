//! The sequence model: an ordered list of optical interfaces and the gaps
//! between them.
//!
//! Interfaces and gaps carry stable numeric ids assigned when they enter
//! the model. Ids survive insert/remove edits; positional indices do not,
//! which is why the assembly layer tracks ids and re-derives indices when
//! it refreshes node names.
//!
//! Layout convention: `gaps[i]` follows `ifcs[i]`, so a well-formed model
//! has one fewer gap than interfaces.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SequenceError};
use crate::medium::Medium;
use crate::transform::Transform3;

/// Stable identity of an interface, independent of its current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IfcId(pub u64);

/// Stable identity of a gap, independent of its current index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GapId(pub u64);

/// How light interacts with an interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractMode {
    /// Refracting or plain transmitting surface.
    Transmit,
    /// Reflecting surface.
    Reflect,
}

/// What kind of interface this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceKind {
    /// An ordinary surface with a profile.
    Standard,
    /// An idealized thin-lens marker surface.
    ThinLens,
}

/// Propagation direction along the local z axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZDir {
    /// Travelling in +z.
    Forward,
    /// Travelling in -z, after an odd number of reflections.
    Reverse,
}

impl ZDir {
    /// Signed direction multiplier.
    pub fn sign(self) -> f64 {
        match self {
            ZDir::Forward => 1.0,
            ZDir::Reverse => -1.0,
        }
    }

    /// The opposite direction.
    pub fn flip(self) -> Self {
        match self {
            ZDir::Forward => ZDir::Reverse,
            ZDir::Reverse => ZDir::Forward,
        }
    }
}

/// The geometric shape of an interface. Identity follows the owning
/// interface's id.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Curvature (1/radius); 0.0 is planar.
    pub cv: f64,
}

/// A single optical boundary in the sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    id: IfcId,
    /// Transmit or reflect.
    pub interact_mode: InteractMode,
    /// Standard surface or thin-lens marker.
    pub kind: InterfaceKind,
    /// Clear semi-diameter.
    pub semi_diameter: f64,
    /// Surface shape.
    pub profile: Profile,
}

impl Interface {
    /// A transmitting standard surface. The id is assigned when the
    /// interface enters a [`SequenceModel`].
    pub fn transmit(cv: f64, semi_diameter: f64) -> Self {
        Self {
            id: IfcId(0),
            interact_mode: InteractMode::Transmit,
            kind: InterfaceKind::Standard,
            semi_diameter,
            profile: Profile { cv },
        }
    }

    /// A reflecting standard surface.
    pub fn reflect(cv: f64, semi_diameter: f64) -> Self {
        Self {
            interact_mode: InteractMode::Reflect,
            ..Self::transmit(cv, semi_diameter)
        }
    }

    /// A thin-lens marker surface.
    pub fn thin_lens(semi_diameter: f64) -> Self {
        Self {
            kind: InterfaceKind::ThinLens,
            ..Self::transmit(0.0, semi_diameter)
        }
    }

    /// A planar, non-refracting, non-reflecting reference surface.
    pub fn dummy(semi_diameter: f64) -> Self {
        Self::transmit(0.0, semi_diameter)
    }

    /// Stable id of this interface.
    pub fn id(&self) -> IfcId {
        self.id
    }

    /// Whether this interface reflects.
    pub fn is_reflecting(&self) -> bool {
        self.interact_mode == InteractMode::Reflect
    }

    /// Whether this is a thin-lens marker.
    pub fn is_thin_lens(&self) -> bool {
        self.kind == InterfaceKind::ThinLens
    }

    /// Clear-aperture diameter of the surface.
    pub fn surface_od(&self) -> f64 {
        2.0 * self.semi_diameter
    }
}

/// The medium and spacing between two consecutive interfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    id: GapId,
    /// Axial thickness.
    pub thickness: f64,
    /// Filling medium.
    pub medium: Medium,
}

impl Gap {
    /// An air gap of the given thickness.
    pub fn air(thickness: f64) -> Self {
        Self {
            id: GapId(0),
            thickness,
            medium: Medium::Air,
        }
    }

    /// A gap filled with a named material.
    pub fn material(thickness: f64, medium: Medium) -> Self {
        Self {
            id: GapId(0),
            thickness,
            medium,
        }
    }

    /// Stable id of this gap.
    pub fn id(&self) -> GapId {
        self.id
    }

    /// Whether the gap medium is air.
    pub fn is_air(&self) -> bool {
        self.medium.is_air()
    }
}

/// One step of the path traversal: a surface, the gap that follows it
/// (absent at the final surface), and the propagation context at that
/// point.
#[derive(Debug)]
pub struct PathSegment<'a> {
    /// Current index of the surface.
    pub idx: usize,
    /// The surface itself.
    pub ifc: &'a Interface,
    /// The gap following the surface, if any.
    pub gap: Option<&'a Gap>,
    /// Refractive index of the following gap (1.0 at the final surface).
    pub rindex: f64,
    /// Global transform of the surface.
    pub tfrm: Transform3,
    /// Propagation direction in the following gap.
    pub z_dir: ZDir,
}

/// Ordered list of interfaces and gaps, with editing operations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequenceModel {
    ifcs: Vec<Interface>,
    gaps: Vec<Gap>,
    /// Index of the surface designated as the aperture stop.
    pub stop_surface: Option<usize>,
    next_id: u64,
}

impl SequenceModel {
    /// An empty sequence model.
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Append a surface and, optionally, the gap following it.
    ///
    /// Returns the index of the new surface.
    pub fn push_surface(&mut self, mut ifc: Interface, gap: Option<Gap>) -> usize {
        ifc.id = IfcId(self.alloc_id());
        self.ifcs.push(ifc);
        if let Some(mut g) = gap {
            g.id = GapId(self.alloc_id());
            self.gaps.push(g);
        }
        self.ifcs.len() - 1
    }

    /// Insert a surface at `idx`, with the gap that will follow it.
    pub fn insert_surface(&mut self, idx: usize, mut ifc: Interface, mut gap: Gap) -> Result<()> {
        if idx > self.ifcs.len() {
            return Err(SequenceError::SurfaceOutOfRange {
                index: idx,
                count: self.ifcs.len(),
            });
        }
        ifc.id = IfcId(self.alloc_id());
        gap.id = GapId(self.alloc_id());
        self.ifcs.insert(idx, ifc);
        self.gaps.insert(idx.min(self.gaps.len()), gap);
        debug!(idx, "inserted surface");
        Ok(())
    }

    /// Remove the surface at `idx` together with its following gap.
    pub fn remove_surface(&mut self, idx: usize) -> Result<(Interface, Option<Gap>)> {
        if idx >= self.ifcs.len() {
            return Err(SequenceError::SurfaceOutOfRange {
                index: idx,
                count: self.ifcs.len(),
            });
        }
        let ifc = self.ifcs.remove(idx);
        let gap = if idx < self.gaps.len() {
            Some(self.gaps.remove(idx))
        } else {
            None
        };
        debug!(idx, "removed surface");
        Ok((ifc, gap))
    }

    /// All interfaces, in order.
    pub fn ifcs(&self) -> &[Interface] {
        &self.ifcs
    }

    /// All gaps, in order; `gaps()[i]` follows `ifcs()[i]`.
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// The interface at `idx`.
    pub fn interface(&self, idx: usize) -> Result<&Interface> {
        self.ifcs.get(idx).ok_or(SequenceError::SurfaceOutOfRange {
            index: idx,
            count: self.ifcs.len(),
        })
    }

    /// The gap at `idx`.
    pub fn gap(&self, idx: usize) -> Result<&Gap> {
        self.gaps.get(idx).ok_or(SequenceError::GapOutOfRange {
            index: idx,
            count: self.gaps.len(),
        })
    }

    /// Current index of the interface with the given id.
    pub fn index_of(&self, id: IfcId) -> Option<usize> {
        self.ifcs.iter().position(|s| s.id == id)
    }

    /// Current index of the gap with the given id.
    pub fn gap_index_of(&self, id: GapId) -> Option<usize> {
        self.gaps.iter().position(|g| g.id == id)
    }

    /// The interface with the given id, if present.
    pub fn interface_by_id(&self, id: IfcId) -> Option<&Interface> {
        self.ifcs.iter().find(|s| s.id == id)
    }

    /// The gap with the given id, if present.
    pub fn gap_by_id(&self, id: GapId) -> Option<&Gap> {
        self.gaps.iter().find(|g| g.id == id)
    }

    /// Per-surface propagation direction for the gap following each
    /// surface; the direction flips at every reflecting surface.
    pub fn z_dir(&self) -> Vec<ZDir> {
        let mut dir = ZDir::Forward;
        self.ifcs
            .iter()
            .map(|s| {
                if s.is_reflecting() {
                    dir = dir.flip();
                }
                dir
            })
            .collect()
    }

    /// Global transforms of every surface, with the surface at `start`
    /// taken as the origin.
    pub fn compute_global_coords(&self, start: usize) -> Vec<Transform3> {
        let z_dirs = self.z_dir();
        let mut z = Vec::with_capacity(self.ifcs.len());
        let mut acc = 0.0;
        for i in 0..self.ifcs.len() {
            z.push(acc);
            if i < self.gaps.len() {
                acc += self.gaps[i].thickness * z_dirs[i].sign();
            }
        }
        let origin = z.get(start).copied().unwrap_or(0.0);
        z.into_iter()
            .map(|zi| Transform3::z_offset(zi - origin))
            .collect()
    }

    /// The ordered path traversal driving grouping and ray propagation:
    /// one segment per surface, each with the gap *following* it.
    pub fn path(&self) -> Vec<PathSegment<'_>> {
        let z_dirs = self.z_dir();
        let tfrms = self.compute_global_coords(0);
        self.ifcs
            .iter()
            .enumerate()
            .map(|(i, ifc)| {
                let gap = self.gaps.get(i);
                PathSegment {
                    idx: i,
                    ifc,
                    gap,
                    rindex: gap.map(|g| g.medium.rindex()).unwrap_or(1.0),
                    tfrm: tfrms[i].clone(),
                    z_dir: z_dirs[i],
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn singlet_model() -> SequenceModel {
        let mut seq = SequenceModel::new();
        seq.push_surface(Interface::dummy(1.0), Some(Gap::air(1e10)));
        seq.push_surface(
            Interface::transmit(0.02, 8.0),
            Some(Gap::material(4.0, Medium::material("N-BK7", 1.5168))),
        );
        seq.push_surface(Interface::transmit(-0.02, 8.0), Some(Gap::air(46.0)));
        seq.push_surface(Interface::dummy(10.0), None);
        seq
    }

    #[test]
    fn test_push_assigns_unique_ids() {
        let seq = singlet_model();
        let mut ids: Vec<u64> = seq.ifcs().iter().map(|s| s.id().0).collect();
        ids.extend(seq.gaps().iter().map(|g| g.id().0));
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
    }

    #[test]
    fn test_ids_survive_insert() {
        let mut seq = singlet_model();
        let id_s2 = seq.ifcs()[2].id();
        assert_eq!(seq.index_of(id_s2), Some(2));

        seq.insert_surface(1, Interface::dummy(5.0), Gap::air(2.0))
            .unwrap();
        assert_eq!(seq.index_of(id_s2), Some(3));
    }

    #[test]
    fn test_remove_shifts_indices() {
        let mut seq = singlet_model();
        let id_last = seq.ifcs()[3].id();
        let (removed, gap) = seq.remove_surface(1).unwrap();
        assert_eq!(removed.interact_mode, InteractMode::Transmit);
        assert!(gap.is_some());
        assert_eq!(seq.index_of(id_last), Some(2));
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut seq = singlet_model();
        let err = seq.remove_surface(9).unwrap_err();
        assert_eq!(
            err,
            SequenceError::SurfaceOutOfRange { index: 9, count: 4 }
        );
    }

    #[test]
    fn test_path_pairs_gaps_with_surfaces() {
        let seq = singlet_model();
        let path = seq.path();
        assert_eq!(path.len(), 4);
        assert!(path[0].gap.unwrap().is_air());
        assert!(!path[1].gap.unwrap().is_air());
        assert!(path[3].gap.is_none());
        assert_eq!(path[3].rindex, 1.0);
        assert_eq!(path[1].rindex, 1.5168);
    }

    #[test]
    fn test_z_dir_flips_at_reflector() {
        let mut seq = SequenceModel::new();
        seq.push_surface(Interface::dummy(1.0), Some(Gap::air(10.0)));
        seq.push_surface(Interface::reflect(0.0, 5.0), Some(Gap::air(10.0)));
        seq.push_surface(Interface::dummy(1.0), None);
        let dirs = seq.z_dir();
        assert_eq!(dirs, vec![ZDir::Forward, ZDir::Reverse, ZDir::Reverse]);
    }

    #[test]
    fn test_global_coords_accumulate_thickness() {
        let seq = singlet_model();
        let tfrms = seq.compute_global_coords(1);
        assert_eq!(tfrms[1].trans.z, 0.0);
        assert_eq!(tfrms[2].trans.z, 4.0);
        assert_eq!(tfrms[3].trans.z, 50.0);
    }
}
