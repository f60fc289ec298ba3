// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
pub mod analysis;
pub mod chemistry;
pub mod config;
pub mod core;
pub mod io;
pub mod math;
pub mod service;
pub mod synthesis;

// ============================================================================
// RE-EXPORTS (Public API)
// ============================================================================
pub use crate::core::error::StructureError;
pub use crate::core::structure::{Atom, AtomId, StructureData, UnitCellParams};
pub use crate::io::{parser, writer};

pub use crate::analysis::bonding::{compute_bonds, Bond, BondNetwork, DEFAULT_BOND_CUTOFF};
pub use crate::analysis::polyhedra::{compute_polyhedra, Polyhedron};
pub use crate::chemistry::materials::{generate_material, GenerationOptions, Material, MaterialFamily};
pub use crate::chemistry::substitution::{substitute, NcmRatio, SubstitutionRule};
pub use crate::config::{ElementSetting, ElementSettings, GeneratorConfig};
pub use crate::math::transform::CellTransform;
pub use crate::service::{GenerationRequest, StructureEvent, StructureService};
pub use crate::synthesis::builder::SupercellRepeats;
pub use crate::synthesis::layered::LayeredBuilder;
pub use crate::synthesis::olivine::OlivineBuilder;

use crate::chemistry::elements::is_coordination_center;
use std::collections::BTreeMap;
use std::fmt::Write as _;

// ============================================================================
// HIGH-LEVEL INTERFACE
// ============================================================================

/// Which derived bonding data to compute for a structure.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub bonds: bool,
    pub polyhedra: bool,
    pub bond_cutoff: f64,
    /// Per-element display overrides applied on top of the defaults.
    pub element_overrides: BTreeMap<String, ElementSetting>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bonds: false,
            polyhedra: false,
            bond_cutoff: DEFAULT_BOND_CUTOFF,
            element_overrides: BTreeMap::new(),
        }
    }
}

/// A structure together with the data derived from it for display.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub structure: StructureData,
    pub settings: ElementSettings,
    pub bonds: Option<Vec<Bond>>,
    pub polyhedra: Option<Vec<Polyhedron>>,
    pub report: String,
}

/// Generates the structure described by `config`.
pub fn generate(config: &GeneratorConfig) -> Result<StructureData, StructureError> {
    config.validate()?;
    generate_material(config.material()?, config.repeats()?, &config.generation_options())
}

/// The Master Pipeline function: derives bonds/polyhedra and a text report.
///
/// Works the same for generated and imported structures; an empty structure
/// yields an empty analysis rather than an error.
pub fn analyze(structure: StructureData, config: &AnalysisConfig) -> Analysis {
    let settings = ElementSettings::for_structure(&structure).with_overrides(&config.element_overrides);

    let bonds = config.bonds.then(|| compute_bonds(&structure.atoms, config.bond_cutoff));
    let polyhedra = config
        .polyhedra
        .then(|| compute_polyhedra(&structure.atoms, Some(&settings)));

    let mut report = String::new();
    let cell = &structure.unit_cell;
    let _ = writeln!(report, "--- Structure Report ---");
    let _ = writeln!(
        report,
        "• Cell:        a={:.4} b={:.4} c={:.4} Å, α={:.2} β={:.2} γ={:.2}°",
        cell.a, cell.b, cell.c, cell.alpha, cell.beta, cell.gamma
    );
    let _ = writeln!(report, "• Atoms:       {}", structure.len());
    for (element, _) in settings.iter() {
        let count = structure.count_of(element);
        let _ = writeln!(
            report,
            "    {:<3} {:>6}  ({:.1}%)",
            element,
            count,
            100.0 * count as f64 / structure.len().max(1) as f64
        );
    }

    if let Some(bonds) = &bonds {
        let network = BondNetwork::from_atoms(&structure.atoms, config.bond_cutoff);
        let _ = writeln!(report, "• Bonds:       {} (cutoff {:.2} Å)", bonds.len(), config.bond_cutoff);
        for (element, _) in settings.iter().filter(|(e, _)| is_coordination_center(e)) {
            if let Some(cn) = network.mean_coordination(&structure.atoms, element) {
                let _ = writeln!(report, "    {:<3} mean CN {:.2}", element, cn);
            }
        }
    }
    if let Some(polys) = &polyhedra {
        let centers = structure
            .atoms
            .iter()
            .filter(|a| is_coordination_center(&a.element))
            .count();
        let _ = writeln!(report, "• Polyhedra:   {} of {} centers fully coordinated", polys.len(), centers);
    }

    Analysis {
        structure,
        settings,
        bonds,
        polyhedra,
        report,
    }
}
