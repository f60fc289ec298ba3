//! Cathode material registry and the generation entry point per material.

use crate::chemistry::substitution::{rng_from_seed, substitute, NcmRatio, SubstitutionRule};
use crate::core::error::{Result, StructureError};
use crate::core::structure::StructureData;
use crate::synthesis::builder::SupercellRepeats;
use crate::synthesis::layered::LayeredBuilder;
use crate::synthesis::olivine::OlivineBuilder;
use crate::synthesis::symmetry::DEFAULT_DEDUP_TOLERANCE;
use log::info;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// FAMILIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MaterialFamily {
    /// alpha-NaFeO2 type layered oxides.
    Layered,
    /// LiFePO4 type phosphates.
    Olivine,
}

impl MaterialFamily {
    pub fn space_group_symbol(&self) -> &'static str {
        match self {
            MaterialFamily::Layered => "R-3m",
            MaterialFamily::Olivine => "Pnma",
        }
    }

    pub fn space_group_number(&self) -> u16 {
        match self {
            MaterialFamily::Layered => 166,
            MaterialFamily::Olivine => 62,
        }
    }

    pub fn crystal_system(&self) -> &'static str {
        match self {
            MaterialFamily::Layered => "Trigonal (hexagonal axes)",
            MaterialFamily::Olivine => "Orthorhombic",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MaterialFamily::Layered => {
                "Alternating Li and transition-metal layers between close-packed oxygen planes; 2D Li diffusion"
            }
            MaterialFamily::Olivine => {
                "Corner-sharing MO6 octahedra bridged by PO4 tetrahedra; 1D Li channels along b"
            }
        }
    }
}

// ============================================================================
// MATERIALS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Material {
    Ncm811,
    Ncm622,
    Ncm111,
    Lfp,
    Lmfp,
    Lco,
}

impl Material {
    /// Registry in listing order.
    pub fn all() -> [Material; 6] {
        [
            Material::Ncm811,
            Material::Ncm622,
            Material::Ncm111,
            Material::Lfp,
            Material::Lmfp,
            Material::Lco,
        ]
    }

    pub fn id(&self) -> &'static str {
        match self {
            Material::Ncm811 => "NCM-811",
            Material::Ncm622 => "NCM-622",
            Material::Ncm111 => "NCM-111",
            Material::Lfp => "LFP",
            Material::Lmfp => "LMFP",
            Material::Lco => "LCO",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Material::Ncm811 => "LiNi0.8Co0.1Mn0.1O2",
            Material::Ncm622 => "LiNi0.6Co0.2Mn0.2O2",
            Material::Ncm111 => "LiNi1/3Co1/3Mn1/3O2",
            Material::Lfp => "LiFePO4",
            Material::Lmfp => "LiMn0.35Fe0.65PO4",
            Material::Lco => "LiCoO2",
        }
    }

    pub fn family(&self) -> MaterialFamily {
        match self {
            Material::Ncm811 | Material::Ncm622 | Material::Ncm111 | Material::Lco => MaterialFamily::Layered,
            Material::Lfp | Material::Lmfp => MaterialFamily::Olivine,
        }
    }

    pub fn default_repeats(&self) -> SupercellRepeats {
        let (nx, ny, nz) = match self {
            Material::Ncm811 | Material::Ncm622 | Material::Ncm111 => (6, 6, 3),
            Material::Lfp | Material::Lmfp => (3, 3, 6),
            Material::Lco => (3, 3, 1),
        };
        SupercellRepeats { nx, ny, nz }
    }

    pub fn ncm_ratio(&self) -> Option<NcmRatio> {
        match self {
            Material::Ncm811 => Some(NcmRatio::R811),
            Material::Ncm622 => Some(NcmRatio::R622),
            Material::Ncm111 => Some(NcmRatio::R111),
            _ => None,
        }
    }

    /// Site mixing applied on top of the family's base structure, if any.
    pub fn substitution(&self) -> Option<SubstitutionRule> {
        match self {
            Material::Lmfp => Some(SubstitutionRule::lmfp()),
            _ => self.ncm_ratio().map(SubstitutionRule::ternary),
        }
    }

    pub fn info(&self) -> MaterialInfo {
        let family = self.family();
        let repeats = self.default_repeats();
        MaterialInfo {
            id: self.id(),
            name: self.display_name(),
            family,
            space_group: family.space_group_symbol(),
            space_group_number: family.space_group_number(),
            crystal_system: family.crystal_system(),
            description: family.description(),
            default_repeats: [repeats.nx, repeats.ny, repeats.nz],
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Material {
    type Err = StructureError;

    /// Case-insensitive id lookup; a bare "NCM" means NCM-811.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_uppercase().replace('_', "-");
        if key == "NCM" {
            return Ok(Material::Ncm811);
        }
        Material::all()
            .into_iter()
            .find(|m| m.id() == key || m.id().replace('-', "") == key)
            .ok_or_else(|| StructureError::UnknownMaterialFamily(s.to_string()))
    }
}

/// Flat metadata record for listings and space-group notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub family: MaterialFamily,
    pub space_group: &'static str,
    pub space_group_number: u16,
    pub crystal_system: &'static str,
    pub description: &'static str,
    pub default_repeats: [u32; 3],
}

// ============================================================================
// GENERATION
// ============================================================================

/// Knobs shared by every material generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub seed: Option<u64>,
    /// Layered family only.
    pub align_metal_layers: bool,
    /// Orbit dedup tolerance; only the operator-expanded olivine family
    /// reads it, layered output is independent of it.
    pub dedup_tolerance: f64,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            seed: None,
            align_metal_layers: false,
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
        }
    }
}

/// Base structure of the material's family, with no site mixing.
pub fn base_structure(material: Material, repeats: SupercellRepeats, options: &GenerationOptions) -> Result<StructureData> {
    match material.family() {
        MaterialFamily::Layered => LayeredBuilder::new()
            .align_metal_layers(options.align_metal_layers)
            .build(repeats),
        MaterialFamily::Olivine => OlivineBuilder::new()
            .with_dedup_tolerance(options.dedup_tolerance)
            .build(repeats),
    }
}

/// Builds `material` drawing substitutions from the caller's generator.
pub fn generate_material_with_rng<R: Rng + ?Sized>(
    material: Material,
    repeats: SupercellRepeats,
    options: &GenerationOptions,
    rng: &mut R,
) -> Result<StructureData> {
    let base = base_structure(material, repeats, options)?;
    let structure = match material.substitution() {
        Some(rule) => substitute(&base, &rule, rng),
        None => base,
    };
    info!("{}: generated {} atoms", material, structure.len());
    Ok(structure)
}

/// Builds `material`; `options.seed` selects a reproducible pattern, `None`
/// gives a new one per call.
pub fn generate_material(material: Material, repeats: SupercellRepeats, options: &GenerationOptions) -> Result<StructureData> {
    let mut rng = rng_from_seed(options.seed);
    generate_material_with_rng(material, repeats, options, &mut rng)
}

/// NCM supercell at one of the fixed product ratios.
pub fn generate_ncm(nx: i64, ny: i64, nz: i64, ratio: NcmRatio, seed: Option<u64>) -> Result<StructureData> {
    let material = match ratio {
        NcmRatio::R811 => Material::Ncm811,
        NcmRatio::R622 => Material::Ncm622,
        NcmRatio::R111 => Material::Ncm111,
    };
    let options = GenerationOptions {
        seed,
        ..GenerationOptions::default()
    };
    generate_material(material, SupercellRepeats::new(nx, ny, nz)?, &options)
}

/// LiMn0.35Fe0.65PO4 supercell.
pub fn generate_lmfp(nx: i64, ny: i64, nz: i64, seed: Option<u64>) -> Result<StructureData> {
    let options = GenerationOptions {
        seed,
        ..GenerationOptions::default()
    };
    generate_material(Material::Lmfp, SupercellRepeats::new(nx, ny, nz)?, &options)
}
