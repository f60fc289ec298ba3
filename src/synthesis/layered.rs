//! Layered oxide archetype (alpha-NaFeO2 type, R-3m #166, hexagonal setting).
//!
//! LiCoO2 data: alkali on 3a (0,0,0), transition metal on 3b (0,0,1/2),
//! oxygen on 6c (0,0,±z). The R centring translations produce the three
//! stacked slabs of the hexagonal cell.

use crate::core::error::Result;
use crate::core::structure::{StructureData, UnitCellParams};
use crate::synthesis::builder::{
    CrystalPrototype, SiteExpansion, StructureBuilder, SupercellRepeats, TransformKind, WyckoffSite,
};
use log::info;
use nalgebra::Vector3;

pub const LAYERED_A: f64 = 2.816;
pub const LAYERED_C: f64 = 14.052;

/// Experimental oxygen z parameter of the 6c site.
pub const OXYGEN_Z: f64 = 0.2604;

/// Moves the transition-metal layers (z = 1/2 + n/3) onto multiples of c/3,
/// so one of them sits on the cell boundary.
pub const METAL_LAYER_SHIFT: f64 = -1.0 / 6.0;

/// Element placed on the 3b site before any substitution.
pub const PLACEHOLDER_METAL: &str = "Co";

pub fn rhombohedral_centering() -> Vec<Vector3<f64>> {
    vec![
        Vector3::new(0.0, 0.0, 0.0),
        Vector3::new(2.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
        Vector3::new(1.0 / 3.0, 2.0 / 3.0, 2.0 / 3.0),
    ]
}

/// Builder for the layered family.
///
/// Centering translations never produce coincident sites, so unlike the
/// olivine builder there is no dedup tolerance to tune.
#[derive(Debug, Clone, Default)]
pub struct LayeredBuilder {
    pub align_metal_layers: bool,
}

impl LayeredBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn align_metal_layers(mut self, align: bool) -> Self {
        self.align_metal_layers = align;
        self
    }

    pub fn prototype(&self) -> CrystalPrototype {
        CrystalPrototype {
            name: "LiCoO2 (R-3m)".to_string(),
            cell: UnitCellParams::hexagonal(LAYERED_A, LAYERED_C),
            transform: TransformKind::Hexagonal,
            sites: vec![
                WyckoffSite::new("Li", "3a", 0.0, 0.0, 0.0),
                WyckoffSite::new(PLACEHOLDER_METAL, "3b", 0.0, 0.0, 0.5),
                WyckoffSite::new("O", "6c", 0.0, 0.0, OXYGEN_Z),
                // -z branch, kept positive
                WyckoffSite::new("O", "6c", 0.0, 0.0, 1.0 - OXYGEN_Z),
            ],
            expansion: SiteExpansion::Centering(rhombohedral_centering()),
            z_shift: if self.align_metal_layers { METAL_LAYER_SHIFT } else { 0.0 },
        }
    }

    pub fn build(&self, repeats: SupercellRepeats) -> Result<StructureData> {
        let structure = StructureBuilder::new(self.prototype()).build(repeats)?;
        info!(
            "layered {}x{}x{}: {} atoms",
            repeats.nx,
            repeats.ny,
            repeats.nz,
            structure.len()
        );
        Ok(structure)
    }
}

/// Layered oxide supercell with cobalt on every metal site.
pub fn generate_layered(nx: i64, ny: i64, nz: i64) -> Result<StructureData> {
    LayeredBuilder::new().build(SupercellRepeats::new(nx, ny, nz)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StructureError;

    #[test]
    fn twelve_atoms_per_hexagonal_cell() {
        let s = generate_layered(1, 1, 1).unwrap();
        assert_eq!(s.len(), 12);
        assert_eq!(s.count_of("Li"), 3);
        assert_eq!(s.count_of("Co"), 3);
        assert_eq!(s.count_of("O"), 6);

        let s = generate_layered(3, 2, 2).unwrap();
        assert_eq!(s.len(), 12 * 12);
    }

    #[test]
    fn cell_is_hexagonal() {
        let s = generate_layered(1, 1, 1).unwrap();
        assert_eq!(s.unit_cell, UnitCellParams::hexagonal(2.816, 14.052));
    }

    #[test]
    fn rejects_empty_supercell() {
        assert!(matches!(
            generate_layered(1, 1, 0),
            Err(StructureError::InvalidRepeatCount { axis: 'z', value: 0 })
        ));
    }

    #[test]
    fn metal_layers_land_on_cell_boundaries_when_aligned() {
        let s = LayeredBuilder::new()
            .align_metal_layers(true)
            .build(SupercellRepeats::new(1, 1, 1).unwrap())
            .unwrap();
        for atom in s.atoms.iter().filter(|a| a.element == PLACEHOLDER_METAL) {
            let layer = atom.position.z / LAYERED_C * 3.0;
            assert!((layer - layer.round()).abs() < 1e-9, "metal at z = {}", atom.position.z);
        }
        // Shift is uniform: Li-metal z spacing is unchanged.
        let plain = generate_layered(1, 1, 1).unwrap();
        let dz = |s: &StructureData| s.atoms[1].position.z - s.atoms[0].position.z;
        assert!((dz(&s) - dz(&plain)).abs() < 1e-12);
    }
}
