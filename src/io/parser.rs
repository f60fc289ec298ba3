use crate::chemistry::elements::clean_symbol;
use crate::core::structure::{Atom, AtomIdAllocator, StructureData, UnitCellParams};
use crate::math::transform::CellTransform;
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use nalgebra::Vector3;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const DEFAULT_LENGTH: f64 = 10.0;
const DEFAULT_ANGLE: f64 = 90.0;

/// Parses a float value from a CIF string, safely removing uncertainty parentheses.
/// Example: "1.234(5)" -> 1.234
fn parse_cif_float(s: &str) -> Result<f64> {
    let clean_s = s.split('(').next().unwrap_or(s);
    clean_s.parse::<f64>().with_context(|| format!("Failed to parse '{}' as float", s))
}

/// Column positions of the atom-site loop.
struct AtomColumns {
    symbol: usize,
    x: usize,
    y: usize,
    z: usize,
    width: usize,
}

impl AtomColumns {
    fn from_headers(headers: &[&str]) -> Result<Self> {
        let find = |tag: &str| headers.iter().position(|&h| h == tag);
        let symbol = find("_atom_site_type_symbol")
            .or_else(|| find("_atom_site_label"))
            .context("CIF atom loop has neither '_atom_site_type_symbol' nor '_atom_site_label'")?;
        Ok(Self {
            symbol,
            x: find("_atom_site_fract_x").context("CIF missing '_atom_site_fract_x'")?,
            y: find("_atom_site_fract_y").context("CIF missing '_atom_site_fract_y'")?,
            z: find("_atom_site_fract_z").context("CIF missing '_atom_site_fract_z'")?,
            width: headers.len(),
        })
    }

    /// `None` for short or non-numeric rows, which are skipped.
    fn parse_row(&self, row: &str) -> Option<(String, Vector3<f64>)> {
        let parts: Vec<&str> = row.split_whitespace().collect();
        if parts.len() < self.width {
            return None;
        }
        let x = parse_cif_float(parts[self.x]).ok()?;
        let y = parse_cif_float(parts[self.y]).ok()?;
        let z = parse_cif_float(parts[self.z]).ok()?;
        Some((clean_symbol(parts[self.symbol]), Vector3::new(x, y, z)))
    }
}

/// Parses CIF text into a `StructureData`.
///
/// Cell values missing from the file default to 10 A / 90 degrees. Positions
/// are converted with the general triclinic transform, so any cell works.
///
/// # Errors
/// Unreadable atom loops, degenerate cells, and files yielding zero atoms.
pub fn from_cif_str(contents: &str) -> Result<StructureData> {
    let lines: Vec<&str> = contents
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .collect();

    let mut cell_params: HashMap<&str, f64> = HashMap::new();
    let mut fractional = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if line.starts_with("_cell_") {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() >= 2 {
                if let Ok(value) = parse_cif_float(parts[1]) {
                    cell_params.insert(parts[0], value);
                }
            }
        } else if line.starts_with("loop_") {
            i += 1;

            let mut headers = Vec::new();
            while i < lines.len() && lines[i].starts_with('_') {
                headers.push(lines[i].split_whitespace().next().unwrap_or(lines[i]));
                i += 1;
            }

            let is_atom_loop = headers.iter().any(|h| h.starts_with("_atom_site_fract_"));
            if is_atom_loop {
                let columns = AtomColumns::from_headers(&headers)?;
                while i < lines.len() && !is_block_boundary(lines[i]) {
                    match columns.parse_row(lines[i]) {
                        Some(site) => fractional.push(site),
                        None => debug!("skipping CIF row '{}'", lines[i]),
                    }
                    i += 1;
                }
            } else {
                while i < lines.len() && !is_block_boundary(lines[i]) {
                    i += 1;
                }
            }
            // the outer loop must see the boundary line itself
            continue;
        }
        i += 1;
    }

    let param = |key: &str, default: f64| -> f64 {
        cell_params.get(key).copied().unwrap_or_else(|| {
            warn!("CIF missing {}, assuming {}", key, default);
            default
        })
    };
    let cell = UnitCellParams::new(
        param("_cell_length_a", DEFAULT_LENGTH),
        param("_cell_length_b", DEFAULT_LENGTH),
        param("_cell_length_c", DEFAULT_LENGTH),
        param("_cell_angle_alpha", DEFAULT_ANGLE),
        param("_cell_angle_beta", DEFAULT_ANGLE),
        param("_cell_angle_gamma", DEFAULT_ANGLE),
    );
    let transform = CellTransform::triclinic(&cell).map_err(|e| anyhow!(e))?;

    if fractional.is_empty() {
        return Err(anyhow!("No atoms found in CIF file."));
    }

    let mut ids = AtomIdAllocator::new();
    let atoms = fractional
        .into_iter()
        .map(|(element, frac)| Atom::new(ids.next_id(), element, transform.to_cartesian(&frac)))
        .collect();

    Ok(StructureData::new(atoms, cell))
}

fn is_block_boundary(line: &str) -> bool {
    line.starts_with('_') || line.starts_with("loop_") || line.starts_with("data_")
}

/// Reads and parses a CIF file.
pub fn from_cif(path: &Path) -> Result<StructureData> {
    let contents = fs::read_to_string(path).with_context(|| format!("Could not read CIF file: {:?}", path))?;
    from_cif_str(&contents).with_context(|| format!("Rejected CIF import: {:?}", path))
}
