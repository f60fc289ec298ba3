use crate::analysis::bonding::DEFAULT_BOND_CUTOFF;
use crate::chemistry::elements::{element_color, priority};
use crate::chemistry::materials::{GenerationOptions, Material};
use crate::core::error::{Result as StructureResult, StructureError};
use crate::core::structure::StructureData;
use crate::synthesis::builder::SupercellRepeats;
use crate::synthesis::symmetry::DEFAULT_DEDUP_TOLERANCE;
use anyhow::{Context, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

// ============================================================================
// GENERATOR CONFIG
// ============================================================================

fn default_material() -> String {
    Material::Ncm811.id().to_string()
}

fn default_bond_cutoff() -> f64 {
    DEFAULT_BOND_CUTOFF
}

fn default_dedup_tolerance() -> f64 {
    DEFAULT_DEDUP_TOLERANCE
}

/// Everything a generation run needs, loadable from a JSON file.
///
/// Missing keys fall back to their defaults, so `{}` is a valid config.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    #[serde(default = "default_material")]
    pub material: String,
    /// `None` uses the material's default supercell.
    #[serde(default)]
    pub repeats: Option<[u32; 3]>,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub align_metal_layers: bool,
    #[serde(default = "default_bond_cutoff")]
    pub bond_cutoff: f64,
    #[serde(default = "default_dedup_tolerance")]
    pub dedup_tolerance: f64,
    /// Per-element display overrides (polyhedron colors etc.).
    #[serde(default)]
    pub elements: BTreeMap<String, ElementSetting>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            material: default_material(),
            repeats: None,
            seed: None,
            align_metal_layers: false,
            bond_cutoff: DEFAULT_BOND_CUTOFF,
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
            elements: BTreeMap::new(),
        }
    }
}

impl GeneratorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Could not open config {:?}", path))?;
        let config = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Error parsing config {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Could not create config file {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn material(&self) -> StructureResult<Material> {
        self.material.parse()
    }

    /// Configured repeats, else the material's default supercell.
    pub fn repeats(&self) -> StructureResult<SupercellRepeats> {
        match self.repeats {
            Some([nx, ny, nz]) => SupercellRepeats::new(nx as i64, ny as i64, nz as i64),
            None => Ok(self.material()?.default_repeats()),
        }
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            seed: self.seed,
            align_metal_layers: self.align_metal_layers,
            dedup_tolerance: self.dedup_tolerance,
        }
    }

    /// Fails fast on values that would silently produce nonsense.
    pub fn validate(&self) -> StructureResult<()> {
        self.material()?;
        self.repeats()?;
        if !(self.dedup_tolerance.is_finite() && self.dedup_tolerance > 0.0 && self.dedup_tolerance < 0.5) {
            return Err(StructureError::InvalidDedupTolerance(self.dedup_tolerance));
        }
        Ok(())
    }
}

// ============================================================================
// ELEMENT SETTINGS SCHEMA
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ElementSetting {
    pub visible: bool,
    pub scale: f64,
    pub color: String,
}

/// Display settings per element present in a structure, in legend order.
///
/// Serializes as a JSON object `{ element: { visible, scale, color } }` whose
/// keys keep that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementSettings {
    entries: Vec<(String, ElementSetting)>,
}

impl ElementSettings {
    /// Defaults for `elements`: only Li visible, scale 1, palette color.
    pub fn for_elements<S: AsRef<str>>(elements: &[S]) -> Self {
        let mut symbols: Vec<&str> = elements.iter().map(|e| e.as_ref()).collect();
        symbols.sort_by(|a, b| match (priority(a), priority(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.cmp(b),
        });
        symbols.dedup();

        let entries = symbols
            .into_iter()
            .map(|el| {
                let setting = ElementSetting {
                    visible: el == "Li",
                    scale: 1.0,
                    color: element_color(el).to_string(),
                };
                (el.to_string(), setting)
            })
            .collect();
        Self { entries }
    }

    pub fn for_structure(structure: &StructureData) -> Self {
        Self::for_elements(&structure.elements())
    }

    /// Replaces settings for elements named in `overrides`; others are ignored.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, ElementSetting>) -> Self {
        for (element, setting) in self.entries.iter_mut() {
            if let Some(o) = overrides.get(element) {
                *setting = o.clone();
            }
        }
        self
    }

    pub fn get(&self, element: &str) -> Option<&ElementSetting> {
        self.entries.iter().find(|(e, _)| e == element).map(|(_, s)| s)
    }

    pub fn get_mut(&mut self, element: &str) -> Option<&mut ElementSetting> {
        self.entries.iter_mut().find(|(e, _)| e == element).map(|(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ElementSetting)> {
        self.entries.iter().map(|(e, s)| (e.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ElementSettings {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (element, setting) in &self.entries {
            map.serialize_entry(element, setting)?;
        }
        map.end()
    }
}
