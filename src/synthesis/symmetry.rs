use crate::core::error::{Result, StructureError};
use nalgebra::{Matrix3, Vector3};
use std::fmt;
use std::str::FromStr;

/// Two generated positions closer than this in every fractional axis are the
/// same site. Controls atom counts at cell boundaries, so it is threaded
/// through the builders rather than inlined.
pub const DEFAULT_DEDUP_TOLERANCE: f64 = 0.01;

/// Wrapped coordinates this close to 0 or 1 are snapped to exactly 0.
pub const BOUNDARY_SNAP_EPSILON: f64 = 1e-4;

/// Pnma (#62), standard setting, as listed in the International Tables.
pub const PNMA_OPERATORS: [&str; 8] = [
    "x,y,z",
    "-x+1/2,-y,z+1/2",
    "-x,y+1/2,-z",
    "x+1/2,-y+1/2,-z+1/2",
    "-x,-y,-z",
    "x+1/2,y,-z-1/2",
    "x,-y+1/2,z",
    "-x+1/2,y+1/2,z+1/2",
];

// ============================================================================
// SYMMETRY OPERATOR
// ============================================================================

/// Affine map on fractional coordinates: `r' = R r + t`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOperator {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl SymmetryOperator {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Applies the operator without wrapping into the unit cell.
    pub fn apply(&self, frac: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * frac + self.translation
    }
}

impl FromStr for SymmetryOperator {
    type Err = StructureError;

    /// Parses the crystallographic triplet notation, e.g. `"-x+1/2, -y, z+1/2"`.
    fn from_str(s: &str) -> Result<Self> {
        let malformed = |reason: &str| StructureError::MalformedOperator {
            expr: s.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(malformed("expected three comma-separated components"));
        }

        let mut rotation = Matrix3::zeros();
        let mut translation = Vector3::zeros();
        for (row, part) in parts.iter().enumerate() {
            let (coeffs, shift) = parse_component(part).map_err(|reason| malformed(&reason))?;
            for col in 0..3 {
                rotation[(row, col)] = coeffs[col];
            }
            translation[row] = shift;
        }

        if rotation.determinant().abs() < 1e-9 {
            return Err(malformed("rotation part is singular"));
        }
        Ok(Self { rotation, translation })
    }
}

impl fmt::Display for SymmetryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rows = Vec::with_capacity(3);
        for row in 0..3 {
            let mut out = String::new();
            for (col, axis) in ['x', 'y', 'z'].iter().enumerate() {
                let c = self.rotation[(row, col)];
                if c.abs() < 1e-12 {
                    continue;
                }
                if c < 0.0 {
                    out.push('-');
                } else if !out.is_empty() {
                    out.push('+');
                }
                if (c.abs() - 1.0).abs() > 1e-12 {
                    out.push_str(&format!("{}*", c.abs()));
                }
                out.push(*axis);
            }
            let t = self.translation[row];
            if t.abs() > 1e-12 {
                if t > 0.0 && !out.is_empty() {
                    out.push('+');
                }
                out.push_str(&format_fraction(t));
            }
            if out.is_empty() {
                out.push('0');
            }
            rows.push(out);
        }
        write!(f, "{}", rows.join(","))
    }
}

fn format_fraction(t: f64) -> String {
    for den in [2, 3, 4, 6] {
        let num = t * den as f64;
        if (num - num.round()).abs() < 1e-9 {
            return format!("{}/{}", num.round() as i64, den);
        }
    }
    format!("{}", t)
}

/// Parses one component such as `-x+1/2`, `y-z` or `0.25+z` into
/// (x/y/z coefficients, constant shift).
fn parse_component(expr: &str) -> std::result::Result<([f64; 3], f64), String> {
    let compact: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err("empty component".into());
    }

    let mut coeffs = [0.0; 3];
    let mut shift = 0.0;

    // Split into signed terms, keeping the sign with each term.
    let mut terms: Vec<String> = Vec::new();
    let mut current = String::new();
    for ch in compact.chars() {
        if (ch == '+' || ch == '-') && !current.is_empty() && !current.ends_with(|c: char| c == '+' || c == '-') {
            terms.push(std::mem::take(&mut current));
        }
        current.push(ch);
    }
    terms.push(current);

    for term in terms {
        let (sign, body) = match term.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, term.strip_prefix('+').unwrap_or(&term)),
        };
        if body.is_empty() {
            return Err(format!("dangling sign in '{}'", expr));
        }

        let axis = match body.chars().last() {
            Some('x') | Some('X') => Some(0),
            Some('y') | Some('Y') => Some(1),
            Some('z') | Some('Z') => Some(2),
            _ => None,
        };

        match axis {
            Some(idx) => {
                // optional numeric factor, e.g. "2x" or "2*x"
                let factor_str = body[..body.len() - 1].trim_end_matches('*');
                let factor = if factor_str.is_empty() { 1.0 } else { parse_number(factor_str)? };
                coeffs[idx] += sign * factor;
            }
            None => shift += sign * parse_number(body)?,
        }
    }

    Ok((coeffs, shift))
}

fn parse_number(s: &str) -> std::result::Result<f64, String> {
    match s.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().map_err(|_| format!("bad numerator '{}'", num))?;
            let den: f64 = den.parse().map_err(|_| format!("bad denominator '{}'", den))?;
            if den == 0.0 {
                return Err("division by zero".into());
            }
            Ok(num / den)
        }
        None => s.parse().map_err(|_| format!("bad number '{}'", s)),
    }
}

// ============================================================================
// NORMALISATION & ORBITS
// ============================================================================

/// Wraps each coordinate into [0, 1), snapping values within
/// `BOUNDARY_SNAP_EPSILON` of either edge to exactly 0.
pub fn normalize_fractional(frac: &Vector3<f64>) -> Vector3<f64> {
    frac.map(|v| {
        let wrapped = ((v % 1.0) + 1.0) % 1.0;
        if wrapped < BOUNDARY_SNAP_EPSILON || 1.0 - wrapped < BOUNDARY_SNAP_EPSILON {
            0.0
        } else {
            wrapped
        }
    })
}

/// Component-wise equality under `tolerance`.
pub fn same_site(a: &Vector3<f64>, b: &Vector3<f64>, tolerance: f64) -> bool {
    (a - b).iter().all(|d| d.abs() < tolerance)
}

/// Evaluates every operator on `frac`, normalises into the unit cell and
/// drops duplicates. The first occurrence of each site wins, so the result
/// follows operator order.
pub fn apply_operators(frac: &Vector3<f64>, operators: &[SymmetryOperator], tolerance: f64) -> Vec<Vector3<f64>> {
    let mut orbit: Vec<Vector3<f64>> = Vec::with_capacity(operators.len());
    for op in operators {
        let candidate = normalize_fractional(&op.apply(frac));
        if !orbit.iter().any(|site| same_site(site, &candidate, tolerance)) {
            orbit.push(candidate);
        }
    }
    orbit
}

// ============================================================================
// SPACE GROUP
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SpaceGroup {
    pub symbol: String,
    pub number: u16,
    pub operators: Vec<SymmetryOperator>,
}

impl SpaceGroup {
    pub fn from_operator_strings(symbol: &str, number: u16, operators: &[&str]) -> Result<Self> {
        let operators = operators
            .iter()
            .map(|s| s.parse::<SymmetryOperator>())
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            symbol: symbol.to_string(),
            number,
            operators,
        })
    }

    pub fn pnma() -> Result<Self> {
        Self::from_operator_strings("Pnma", 62, &PNMA_OPERATORS)
    }

    pub fn orbit(&self, frac: &Vector3<f64>, tolerance: f64) -> Vec<Vector3<f64>> {
        apply_operators(frac, &self.operators, tolerance)
    }
}
