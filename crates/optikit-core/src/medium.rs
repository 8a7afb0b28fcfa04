//! Optical media for gaps between interfaces.
//!
//! Air is the distinguished medium: runs of non-air gaps are what the
//! assembly layer groups into physical elements.

use serde::{Deserialize, Serialize};

/// The medium filling a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Medium {
    /// Air, refractive index 1.0.
    Air,
    /// A named optical material with its d-line refractive index.
    Material {
        /// Material name, e.g. a glass catalog code like "N-BK7".
        name: String,
        /// Refractive index at the d line.
        nd: f64,
    },
}

impl Medium {
    /// Create a named material medium.
    pub fn material(name: impl Into<String>, nd: f64) -> Self {
        Medium::Material {
            name: name.into(),
            nd,
        }
    }

    /// Whether this medium is air.
    pub fn is_air(&self) -> bool {
        matches!(self, Medium::Air)
    }

    /// Refractive index of the medium.
    pub fn rindex(&self) -> f64 {
        match self {
            Medium::Air => 1.0,
            Medium::Material { nd, .. } => *nd,
        }
    }

    /// Display name of the medium.
    pub fn name(&self) -> &str {
        match self {
            Medium::Air => "air",
            Medium::Material { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_properties() {
        assert!(Medium::Air.is_air());
        assert_eq!(Medium::Air.rindex(), 1.0);
        assert_eq!(Medium::Air.name(), "air");
    }

    #[test]
    fn test_material_properties() {
        let bk7 = Medium::material("N-BK7", 1.5168);
        assert!(!bk7.is_air());
        assert_eq!(bk7.rindex(), 1.5168);
        assert_eq!(bk7.name(), "N-BK7");
    }
}
