//! Olivine archetype (LiFePO4, Pnma #62).
//!
//! Site data: ICSD 56291 (J. Solid State Chem. 178 (2005) 2575).

use crate::core::error::Result;
use crate::core::structure::{StructureData, UnitCellParams};
use crate::synthesis::builder::{
    CrystalPrototype, SiteExpansion, StructureBuilder, SupercellRepeats, TransformKind, WyckoffSite,
};
use crate::synthesis::symmetry::{SpaceGroup, DEFAULT_DEDUP_TOLERANCE};
use log::info;

pub const OLIVINE_A: f64 = 10.33;
pub const OLIVINE_B: f64 = 6.01;
pub const OLIVINE_C: f64 = 4.69;

/// Element on the 4c octahedral site before any doping.
pub const OLIVINE_METAL: &str = "Fe";

pub fn olivine_sites() -> Vec<WyckoffSite> {
    vec![
        WyckoffSite::new("Li", "4a", 0.0, 0.0, 0.0),
        WyckoffSite::new(OLIVINE_METAL, "4c", 0.2818, 0.25, 0.9744),
        WyckoffSite::new("P", "4c", 0.0947, 0.25, 0.4180),
        WyckoffSite::new("O", "4c", 0.0973, 0.25, 0.7434),
        WyckoffSite::new("O", "4c", 0.4567, 0.25, 0.2061),
        WyckoffSite::new("O", "8d", 0.1652, 0.0466, 0.2843),
    ]
}

#[derive(Debug, Clone)]
pub struct OlivineBuilder {
    pub dedup_tolerance: f64,
}

impl Default for OlivineBuilder {
    fn default() -> Self {
        Self {
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
        }
    }
}

impl OlivineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dedup_tolerance(mut self, tolerance: f64) -> Self {
        self.dedup_tolerance = tolerance;
        self
    }

    pub fn prototype(&self) -> Result<CrystalPrototype> {
        Ok(CrystalPrototype {
            name: "LiFePO4 (Pnma)".to_string(),
            cell: UnitCellParams::orthorhombic(OLIVINE_A, OLIVINE_B, OLIVINE_C),
            transform: TransformKind::General,
            sites: olivine_sites(),
            expansion: SiteExpansion::Operators(SpaceGroup::pnma()?),
            z_shift: 0.0,
        })
    }

    pub fn build(&self, repeats: SupercellRepeats) -> Result<StructureData> {
        let structure = StructureBuilder::new(self.prototype()?)
            .with_dedup_tolerance(self.dedup_tolerance)
            .build(repeats)?;
        info!(
            "olivine {}x{}x{}: {} atoms",
            repeats.nx,
            repeats.ny,
            repeats.nz,
            structure.len()
        );
        Ok(structure)
    }
}

/// Olivine supercell with iron on every metal site.
pub fn generate_olivine(nx: i64, ny: i64, nz: i64) -> Result<StructureData> {
    OlivineBuilder::new().build(SupercellRepeats::new(nx, ny, nz)?)
}
