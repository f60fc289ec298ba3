use crate::core::error::{Result, StructureError};
use crate::core::structure::UnitCellParams;
use nalgebra::{Matrix3, Vector3};

/// Below this |sin(gamma)| the a/b plane collapses and the general formula
/// would divide by (nearly) zero.
const MIN_SIN_GAMMA: f64 = 1e-8;

/// Angle tolerance (degrees) accepted by the hexagonal closed form.
const HEXAGONAL_ANGLE_TOLERANCE: f64 = 1e-6;

/// Smallest accepted value of the squared volume factor.
const MIN_VOLUME_TERM: f64 = 1e-12;

// ============================================================================
// FRACTIONAL -> CARTESIAN
// ============================================================================

/// A validated fractional-to-Cartesian map for one unit cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellTransform {
    /// Closed form for gamma = 120 and a = b; only a and c are needed.
    Hexagonal { a: f64, c: f64 },
    /// Standard crystallographic conversion; the columns are the cell vectors.
    General(Matrix3<f64>),
}

impl CellTransform {
    /// Hexagonal specialisation: `x = u*a + v*a*cos(120)`, `y = v*a*sin(120)`, `z = w*c`.
    ///
    /// Rejects cells that are not in the hexagonal setting, since the closed
    /// form silently ignores b, alpha, beta and gamma.
    pub fn hexagonal(cell: &UnitCellParams) -> Result<Self> {
        cell.validate()?;
        let is_hexagonal = (cell.gamma - 120.0).abs() < HEXAGONAL_ANGLE_TOLERANCE
            && (cell.alpha - 90.0).abs() < HEXAGONAL_ANGLE_TOLERANCE
            && (cell.beta - 90.0).abs() < HEXAGONAL_ANGLE_TOLERANCE
            && (cell.a - cell.b).abs() < 1e-9;
        if !is_hexagonal {
            return Err(StructureError::InvalidCellParameters(format!(
                "hexagonal transform needs a = b, alpha = beta = 90, gamma = 120 (got {:?})",
                cell
            )));
        }
        Ok(CellTransform::Hexagonal { a: cell.a, c: cell.c })
    }

    /// General triclinic conversion using the volume factor
    /// `V = sqrt(1 - cos²α - cos²β - cos²γ + 2 cosα cosβ cosγ)`.
    pub fn triclinic(cell: &UnitCellParams) -> Result<Self> {
        Ok(CellTransform::General(triclinic_matrix(cell)?))
    }

    pub fn to_cartesian(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        match *self {
            CellTransform::Hexagonal { a, c } => {
                let (sin_g, cos_g) = (2.0 * std::f64::consts::PI / 3.0).sin_cos();
                Vector3::new(
                    frac.x * a + frac.y * a * cos_g,
                    frac.y * a * sin_g,
                    frac.z * c,
                )
            }
            CellTransform::General(ref m) => m * frac,
        }
    }

    /// Cell vectors as matrix columns.
    pub fn matrix(&self) -> Matrix3<f64> {
        match *self {
            CellTransform::Hexagonal { a, c } => {
                let (sin_g, cos_g) = (2.0 * std::f64::consts::PI / 3.0).sin_cos();
                Matrix3::new(
                    a, a * cos_g, 0.0,
                    0.0, a * sin_g, 0.0,
                    0.0, 0.0, c,
                )
            }
            CellTransform::General(m) => m,
        }
    }
}

/// Builds the fractional-to-Cartesian matrix (a along x, b in the xy plane).
pub fn triclinic_matrix(cell: &UnitCellParams) -> Result<Matrix3<f64>> {
    cell.validate()?;

    let alpha_r = cell.alpha.to_radians();
    let beta_r = cell.beta.to_radians();
    let gamma_r = cell.gamma.to_radians();
    let (cos_a, cos_b, cos_g) = (alpha_r.cos(), beta_r.cos(), gamma_r.cos());
    let sin_g = gamma_r.sin();

    if sin_g.abs() < MIN_SIN_GAMMA {
        return Err(StructureError::DegenerateCell(format!(
            "sin(gamma) ~ 0 for gamma = {}",
            cell.gamma
        )));
    }

    let term = 1.0 - cos_a.powi(2) - cos_b.powi(2) - cos_g.powi(2) + 2.0 * cos_a * cos_b * cos_g;
    if term <= MIN_VOLUME_TERM {
        return Err(StructureError::DegenerateCell(format!(
            "angles ({}, {}, {}) give zero cell volume",
            cell.alpha, cell.beta, cell.gamma
        )));
    }
    let v_factor = term.sqrt();

    Ok(Matrix3::new(
        cell.a, cell.b * cos_g, cell.c * cos_b,
        0.0, cell.b * sin_g, cell.c * (cos_a - cos_b * cos_g) / sin_g,
        0.0, 0.0, cell.c * v_factor / sin_g,
    ))
}

/// One-shot general conversion of a fractional coordinate.
pub fn to_cartesian(frac: &Vector3<f64>, cell: &UnitCellParams) -> Result<Vector3<f64>> {
    Ok(CellTransform::triclinic(cell)?.to_cartesian(frac))
}

/// One-shot hexagonal conversion of a fractional coordinate.
pub fn to_cartesian_hexagonal(frac: &Vector3<f64>, cell: &UnitCellParams) -> Result<Vector3<f64>> {
    Ok(CellTransform::hexagonal(cell)?.to_cartesian(frac))
}
