use crate::analysis::bonding::Bond;
use crate::analysis::polyhedra::Polyhedron;
use crate::core::structure::{AtomId, StructureData};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct PolyhedronSummary<'a> {
    center_id: AtomId,
    element: &'a str,
    color: &'a str,
    vertices: usize,
    faces: usize,
    volume: f64,
}

#[derive(Serialize)]
struct Export<'a> {
    #[serde(flatten)]
    structure: &'a StructureData,
    #[serde(skip_serializing_if = "Option::is_none")]
    bonds: Option<&'a [Bond]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    polyhedra: Option<Vec<PolyhedronSummary<'a>>>,
}

/// Pretty JSON of the structure, with optional derived bonding data.
pub fn to_json(structure: &StructureData, bonds: Option<&[Bond]>, polyhedra: Option<&[Polyhedron]>) -> Result<String> {
    let export = Export {
        structure,
        bonds,
        polyhedra: polyhedra.map(|polys| {
            polys
                .iter()
                .map(|p| PolyhedronSummary {
                    center_id: p.center_id,
                    element: &p.element,
                    color: &p.color,
                    vertices: p.hull.vertex_count(),
                    faces: p.hull.faces.len(),
                    volume: p.hull.volume(),
                })
                .collect()
        }),
    };
    serde_json::to_string_pretty(&export).context("Failed to serialize structure")
}

/// Plain XYZ: count line, comment line with the cell, one line per atom.
pub fn to_xyz(structure: &StructureData, comment: &str) -> String {
    let cell = &structure.unit_cell;
    let mut out = String::new();
    let _ = writeln!(out, "{}", structure.len());
    let _ = writeln!(
        out,
        "{} cell=[{:.4} {:.4} {:.4} {:.2} {:.2} {:.2}]",
        comment.replace('\n', " "),
        cell.a,
        cell.b,
        cell.c,
        cell.alpha,
        cell.beta,
        cell.gamma
    );
    for atom in &structure.atoms {
        let p = atom.position;
        let _ = writeln!(out, "{:<2} {:>12.6} {:>12.6} {:>12.6}", atom.element, p.x, p.y, p.z);
    }
    out
}

/// Writes JSON or XYZ depending on the file extension (JSON by default).
pub fn write_structure(
    path: &Path,
    structure: &StructureData,
    bonds: Option<&[Bond]>,
    polyhedra: Option<&[Polyhedron]>,
    comment: &str,
) -> Result<()> {
    let is_xyz = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xyz"))
        .unwrap_or(false);
    let contents = if is_xyz {
        to_xyz(structure, comment)
    } else {
        to_json(structure, bonds, polyhedra)?
    };
    fs::write(path, contents).with_context(|| format!("Could not write {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::bonding::compute_bonds;
    use nalgebra::Vector3;

    fn water_like() -> StructureData {
        StructureData::from_cartesian(vec![
            ("O", Vector3::new(0.0, 0.0, 0.0)),
            ("Li", Vector3::new(1.5, 0.0, 0.0)),
        ])
    }

    #[test]
    fn xyz_has_one_line_per_atom() {
        let xyz = to_xyz(&water_like(), "test");
        let lines: Vec<&str> = xyz.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "2");
        assert!(lines[1].starts_with("test cell=[10.0000"));
        assert!(lines[3].starts_with("Li"));
    }

    #[test]
    fn json_contains_atoms_and_bonds() {
        let s = water_like();
        let bonds = compute_bonds(&s.atoms, 2.5);
        let json = to_json(&s, Some(&bonds), None).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["atoms"].as_array().unwrap().len(), 2);
        assert_eq!(v["bonds"].as_array().unwrap().len(), 1);
        assert!(v.get("polyhedra").is_none());
        assert_eq!(v["unit_cell"]["a"], 10.0);
    }
}
