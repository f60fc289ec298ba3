use crate::core::error::{Result, StructureError};
use crate::core::structure::{Atom, AtomIdAllocator, StructureData, UnitCellParams};
use crate::math::transform::CellTransform;
use crate::synthesis::symmetry::{SpaceGroup, DEFAULT_DEDUP_TOLERANCE};
use log::debug;
use nalgebra::Vector3;

// ============================================================================
// SUPERCELL REPEATS
// ============================================================================

/// Largest repeat count accepted along any axis. Bonding analysis is
/// all-pairs, so supercells far beyond 10x10x10 are not useful anyway.
pub const MAX_REPEAT: u32 = 20;

/// Validated supercell repeat counts (each in `1..=MAX_REPEAT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupercellRepeats {
    pub nx: u32,
    pub ny: u32,
    pub nz: u32,
}

impl SupercellRepeats {
    /// Rejects counts outside `1..=MAX_REPEAT`; never clamps.
    pub fn new(nx: i64, ny: i64, nz: i64) -> Result<Self> {
        let check = |axis: char, value: i64| -> Result<u32> {
            if value < 1 || value > MAX_REPEAT as i64 {
                return Err(StructureError::InvalidRepeatCount { axis, value });
            }
            Ok(value as u32)
        };
        Ok(Self {
            nx: check('x', nx)?,
            ny: check('y', ny)?,
            nz: check('z', nz)?,
        })
    }

    /// Re-checks counts set through the public fields.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.nx as i64, self.ny as i64, self.nz as i64).map(|_| ())
    }

    /// Saturates instead of overflowing for unvalidated field values.
    pub fn cell_count(&self) -> usize {
        (self.nx as usize)
            .saturating_mul(self.ny as usize)
            .saturating_mul(self.nz as usize)
    }

    /// Integer cell offsets, x slowest.
    pub fn offsets(&self) -> impl Iterator<Item = Vector3<f64>> + '_ {
        (0..self.nx).flat_map(move |ix| {
            (0..self.ny).flat_map(move |iy| {
                (0..self.nz).map(move |iz| Vector3::new(ix as f64, iy as f64, iz as f64))
            })
        })
    }
}

// ============================================================================
// PROTOTYPE DESCRIPTION
// ============================================================================

/// One symmetry-distinct site of the asymmetric unit.
#[derive(Debug, Clone, PartialEq)]
pub struct WyckoffSite {
    pub element: String,
    /// Multiplicity + letter, e.g. "4c".
    pub label: String,
    pub position: Vector3<f64>,
}

impl WyckoffSite {
    pub fn new(element: &str, label: &str, x: f64, y: f64, z: f64) -> Self {
        Self {
            element: element.to_string(),
            label: label.to_string(),
            position: Vector3::new(x, y, z),
        }
    }
}

/// How generating sites are turned into the full content of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SiteExpansion {
    /// Pure additive lattice-centering translations (e.g. the R centring).
    /// Results are not wrapped back into the cell.
    Centering(Vec<Vector3<f64>>),
    /// Full operator orbits, wrapped into [0, 1) and deduplicated.
    Operators(SpaceGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Hexagonal,
    General,
}

/// Everything needed to tile a structure: cell, sites, expansion rule.
#[derive(Debug, Clone, PartialEq)]
pub struct CrystalPrototype {
    pub name: String,
    pub cell: UnitCellParams,
    pub transform: TransformKind,
    pub sites: Vec<WyckoffSite>,
    pub expansion: SiteExpansion,
    /// Uniform fractional z offset applied to every generated position.
    pub z_shift: f64,
}

// ============================================================================
// BUILDER
// ============================================================================

/// Shared "expand sites -> dedup -> replicate -> convert" pipeline.
pub struct StructureBuilder {
    prototype: CrystalPrototype,
    dedup_tolerance: f64,
}

impl StructureBuilder {
    pub fn new(prototype: CrystalPrototype) -> Self {
        Self {
            prototype,
            dedup_tolerance: DEFAULT_DEDUP_TOLERANCE,
        }
    }

    pub fn with_dedup_tolerance(mut self, tolerance: f64) -> Self {
        self.dedup_tolerance = tolerance;
        self
    }

    pub fn prototype(&self) -> &CrystalPrototype {
        &self.prototype
    }

    /// Fractional content of a single cell as (element, position) pairs.
    pub fn cell_basis(&self) -> Vec<(String, Vector3<f64>)> {
        let proto = &self.prototype;
        let mut basis = Vec::new();

        match &proto.expansion {
            SiteExpansion::Centering(shifts) => {
                for shift in shifts {
                    for site in &proto.sites {
                        basis.push((site.element.clone(), site.position + shift));
                    }
                }
            }
            SiteExpansion::Operators(group) => {
                for site in &proto.sites {
                    let orbit = group.orbit(&site.position, self.dedup_tolerance);
                    debug!(
                        "{}: {} {} site -> {} positions under {}",
                        proto.name,
                        site.element,
                        site.label,
                        orbit.len(),
                        group.symbol
                    );
                    basis.extend(orbit.into_iter().map(|p| (site.element.clone(), p)));
                }
            }
        }

        if proto.z_shift != 0.0 {
            for (_, pos) in basis.iter_mut() {
                pos.z += proto.z_shift;
            }
        }
        basis
    }

    /// Tiles the cell basis over the supercell and converts to Cartesian.
    pub fn build(&self, repeats: SupercellRepeats) -> Result<StructureData> {
        repeats.validate()?;
        let proto = &self.prototype;
        let transform = match proto.transform {
            TransformKind::Hexagonal => CellTransform::hexagonal(&proto.cell)?,
            TransformKind::General => CellTransform::triclinic(&proto.cell)?,
        };

        let basis = self.cell_basis();
        let mut ids = AtomIdAllocator::new();
        let mut atoms = Vec::with_capacity(basis.len() * repeats.cell_count());

        for offset in repeats.offsets() {
            for (element, frac) in &basis {
                let cart = transform.to_cartesian(&(frac + offset));
                atoms.push(Atom::new(ids.next_id(), element.as_str(), cart));
            }
        }

        debug!(
            "{}: {} atoms/cell x {} cells = {} atoms",
            proto.name,
            basis.len(),
            repeats.cell_count(),
            atoms.len()
        );

        Ok(StructureData::new(atoms, proto.cell))
    }
}
