use crate::chemistry::elements::{is_coordination_center, known_color};
use crate::config::ElementSettings;
use crate::core::structure::{Atom, AtomId};
use crate::math::hull::{convex_hull, ConvexHull};
use log::{debug, warn};
use nalgebra::Vector3;
use serde::Serialize;

/// Transition metal to oxygen cutoff, in Angstrom.
pub const METAL_OXYGEN: f64 = 2.4;
/// P-O cutoff for phosphate tetrahedra.
pub const PHOSPHORUS_OXYGEN: f64 = 1.9;
/// Neighbors closer than this are treated as the center itself.
pub const MIN_DISTANCE: f64 = 0.1;

pub const MIN_NEIGHBORS: usize = 4;
pub const FALLBACK_POLYHEDRON_COLOR: &str = "#888888";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Polyhedron {
    pub center_id: AtomId,
    pub element: String,
    pub center: Vector3<f64>,
    pub hull: ConvexHull,
    pub color: String,
}

pub fn neighbor_cutoff(center_element: &str) -> f64 {
    if center_element == "P" {
        PHOSPHORUS_OXYGEN
    } else {
        METAL_OXYGEN
    }
}

fn oxygen_shell(center: &Atom, atoms: &[Atom]) -> Vec<Vector3<f64>> {
    let cutoff = neighbor_cutoff(&center.element);
    atoms
        .iter()
        .filter(|a| a.is_oxygen())
        .filter_map(|a| {
            let d = (a.position - center.position).norm();
            (d > MIN_DISTANCE && d < cutoff).then_some(a.position)
        })
        .collect()
}

fn polyhedron_color(element: &str, settings: Option<&ElementSettings>) -> String {
    settings
        .and_then(|s| s.get(element))
        .map(|s| s.color.clone())
        .or_else(|| known_color(element).map(str::to_string))
        .unwrap_or_else(|| FALLBACK_POLYHEDRON_COLOR.to_string())
}

/// Oxygen coordination polyhedra around every metal/P center.
///
/// Centers with fewer than four O neighbors (cut-off shells at the supercell
/// edge) are skipped silently; degenerate hulls are skipped with a warning.
pub fn compute_polyhedra(atoms: &[Atom], settings: Option<&ElementSettings>) -> Vec<Polyhedron> {
    let mut out = Vec::new();
    let mut incomplete = 0usize;

    for center in atoms.iter().filter(|a| is_coordination_center(&a.element)) {
        let shell = oxygen_shell(center, atoms);
        if shell.len() < MIN_NEIGHBORS {
            incomplete += 1;
            continue;
        }
        match convex_hull(&shell) {
            Ok(hull) => out.push(Polyhedron {
                center_id: center.id,
                element: center.element.clone(),
                center: center.position,
                hull,
                color: polyhedron_color(&center.element, settings),
            }),
            Err(e) => warn!(
                "skipping {} polyhedron for {} at {:?}: {}",
                center.element, center.id, center.position, e
            ),
        }
    }

    debug!("{} polyhedra built, {} incomplete shells skipped", out.len(), incomplete);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::StructureData;

    fn center_with(element: &str, ligands: &[[f64; 3]]) -> StructureData {
        let mut atoms = vec![(element, Vector3::zeros())];
        atoms.extend(ligands.iter().map(|p| ("O", Vector3::new(p[0], p[1], p[2]))));
        StructureData::from_cartesian(atoms)
    }

    const TETRA: [[f64; 3]; 4] = [
        [1.0, 1.0, 1.0],
        [1.0, -1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
    ];

    #[test]
    fn three_neighbors_give_nothing() {
        let s = center_with("Fe", &TETRA[..3]);
        assert!(compute_polyhedra(&s.atoms, None).is_empty());
    }

    #[test]
    fn four_neighbors_give_a_tetrahedron() {
        let s = center_with("Fe", &TETRA);
        let polys = compute_polyhedra(&s.atoms, None);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].hull.vertex_count(), 4);
        assert_eq!(polys[0].center_id, AtomId(0));
        assert_eq!(polys[0].color, "#8D6E63");
    }

    #[test]
    fn phosphorus_uses_the_shorter_cutoff() {
        // sqrt(3) = 1.73 A fits under 1.9
        let s = center_with("P", &TETRA);
        assert_eq!(compute_polyhedra(&s.atoms, None).len(), 1);
        let scaled: Vec<[f64; 3]> = TETRA.iter().map(|p| [p[0] * 1.2, p[1] * 1.2, p[2] * 1.2]).collect();
        let s = center_with("P", &scaled);
        assert!(compute_polyhedra(&s.atoms, None).is_empty());
    }

    #[test]
    fn coplanar_shell_is_skipped_not_fatal() {
        let mut s = center_with(
            "Ni",
            &[[1.0, 0.0, 0.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, -1.0, 0.0]],
        );
        // a second, healthy center further away
        let offset = Vector3::new(20.0, 0.0, 0.0);
        let next = s.atoms.len() as u64;
        s.atoms.push(Atom::new(AtomId(next), "Co", offset));
        for (k, p) in TETRA.iter().enumerate() {
            s.atoms.push(Atom::new(AtomId(next + 1 + k as u64), "O", offset + Vector3::new(p[0], p[1], p[2])));
        }
        let polys = compute_polyhedra(&s.atoms, None);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].element, "Co");
    }

    #[test]
    fn settings_override_color() {
        let s = center_with("Mn", &TETRA);
        let mut settings = ElementSettings::for_structure(&s);
        settings.get_mut("Mn").unwrap().color = "#ff0000".into();
        let polys = compute_polyhedra(&s.atoms, Some(&settings));
        assert_eq!(polys[0].color, "#ff0000");
    }

    #[test]
    fn lithium_is_never_a_center() {
        let s = center_with("Li", &TETRA);
        assert!(compute_polyhedra(&s.atoms, None).is_empty());
    }
}
