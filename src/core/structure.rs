use crate::core::error::{Result, StructureError};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Opaque atom identifier, unique within one `StructureData`.
///
/// Builders hand these out sequentially in generation order, so two seeded
/// generations with the same parameters produce the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AtomId(pub u64);

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom-{}", self.0)
    }
}

/// Hands out consecutive `AtomId`s for a single structure instance.
#[derive(Debug, Default)]
pub struct AtomIdAllocator {
    next: u64,
}

impl AtomIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> AtomId {
        let id = AtomId(self.next);
        self.next += 1;
        id
    }
}

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub id: AtomId,
    pub element: String,
    /// Cartesian position in Angstrom.
    pub position: Vector3<f64>,
    /// Presentation overrides; not part of the structural identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl Atom {
    pub fn new(id: AtomId, element: impl Into<String>, position: Vector3<f64>) -> Self {
        Self {
            id,
            element: element.into(),
            position,
            color: None,
            radius: None,
        }
    }

    /// Copy of this atom relabelled as `element`. Id and position are kept.
    pub fn with_element(&self, element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            ..self.clone()
        }
    }

    pub fn is_oxygen(&self) -> bool {
        self.element == "O"
    }

    pub fn display_color(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| crate::chemistry::elements::element_color(&self.element))
    }

    pub fn display_radius(&self) -> f64 {
        self.radius
            .unwrap_or_else(|| crate::chemistry::elements::display_radius(&self.element))
    }
}

/// Unit cell edge lengths (Angstrom) and angles (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitCellParams {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl UnitCellParams {
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        Self { a, b, c, alpha, beta, gamma }
    }

    /// Hexagonal setting: a = b, alpha = beta = 90, gamma = 120.
    pub fn hexagonal(a: f64, c: f64) -> Self {
        Self::new(a, a, c, 90.0, 90.0, 120.0)
    }

    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Self {
        Self::new(a, b, c, 90.0, 90.0, 90.0)
    }

    /// The 10 Angstrom cubic box used for imported or hand-placed atoms
    /// that come without a meaningful cell.
    pub fn placeholder() -> Self {
        Self::orthorhombic(10.0, 10.0, 10.0)
    }

    /// Checks lengths > 0 and angles strictly inside (0, 180).
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("a", self.a), ("b", self.b), ("c", self.c)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(StructureError::InvalidCellParameters(format!(
                    "edge length {} = {} must be positive",
                    name, value
                )));
            }
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !(value.is_finite() && value > 0.0 && value < 180.0) {
                return Err(StructureError::InvalidCellParameters(format!(
                    "angle {} = {} must lie in (0, 180) degrees",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// The aggregate output of every generator and importer.
///
/// Built fresh on every regeneration and never mutated in place afterwards;
/// consumers treat it as an immutable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureData {
    pub atoms: Vec<Atom>,
    pub unit_cell: UnitCellParams,
}

impl StructureData {
    pub fn new(atoms: Vec<Atom>, unit_cell: UnitCellParams) -> Self {
        Self { atoms, unit_cell }
    }

    /// An empty structure is valid; it simply renders nothing.
    pub fn empty() -> Self {
        Self::new(Vec::new(), UnitCellParams::placeholder())
    }

    /// Wraps hand-placed Cartesian atoms in the placeholder cell, assigning ids.
    pub fn from_cartesian<S: Into<String>>(atoms: impl IntoIterator<Item = (S, Vector3<f64>)>) -> Self {
        let mut ids = AtomIdAllocator::new();
        let atoms = atoms
            .into_iter()
            .map(|(element, position)| Atom::new(ids.next_id(), element, position))
            .collect();
        Self::new(atoms, UnitCellParams::placeholder())
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// Element -> atom count, sorted by symbol.
    pub fn composition(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for atom in &self.atoms {
            *counts.entry(atom.element.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Distinct element symbols present, sorted by symbol.
    pub fn elements(&self) -> Vec<String> {
        self.composition().into_keys().collect()
    }

    pub fn count_of(&self, element: &str) -> usize {
        self.atoms.iter().filter(|a| a.element == element).count()
    }
}
