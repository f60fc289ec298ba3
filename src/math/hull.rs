use crate::core::error::{Result, StructureError};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Plane tolerance, relative to the spread of the input points.
const PLANE_TOLERANCE: f64 = 1e-6;

/// Convex hull of a small point cloud (coordination shells, typically 4-12 points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexHull {
    /// Hull vertices, in the order they appeared in the input.
    pub vertices: Vec<Vector3<f64>>,
    /// Triangles indexing `vertices`, wound counter-clockwise seen from outside.
    pub faces: Vec<[usize; 3]>,
}

impl ConvexHull {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Unique undirected edges of the triangulated surface.
    pub fn edges(&self) -> Vec<(usize, usize)> {
        let mut edges = BTreeSet::new();
        for f in &self.faces {
            for (p, q) in [(f[0], f[1]), (f[1], f[2]), (f[2], f[0])] {
                edges.insert((p.min(q), p.max(q)));
            }
        }
        edges.into_iter().collect()
    }

    pub fn volume(&self) -> f64 {
        let centroid = centroid(&self.vertices);
        self.faces
            .iter()
            .map(|f| {
                let a = self.vertices[f[0]] - centroid;
                let b = self.vertices[f[1]] - centroid;
                let c = self.vertices[f[2]] - centroid;
                a.dot(&b.cross(&c)) / 6.0
            })
            .sum()
    }
}

/// Computes the 3D convex hull by testing every candidate supporting plane.
///
/// Planar facets holding more than three points are re-triangulated from
/// their 2D outline, so coplanar ligands never produce overlapping triangles.
///
/// # Errors
/// `DegenerateHull` when fewer than four points are given or when all points
/// are (nearly) coplanar, in which case no closed surface exists.
pub fn convex_hull(points: &[Vector3<f64>]) -> Result<ConvexHull> {
    let n = points.len();
    if n < 4 {
        return Err(StructureError::DegenerateHull(format!(
            "need at least 4 points, got {}",
            n
        )));
    }

    let center = centroid(points);
    let extent = points.iter().map(|p| (p - center).norm()).fold(0.0, f64::max);
    if extent < 1e-12 {
        return Err(StructureError::DegenerateHull("all points coincide".into()));
    }
    let eps = PLANE_TOLERANCE * extent;

    let mut seen_planes: HashSet<Vec<usize>> = HashSet::new();
    let mut polygons: Vec<Vec<usize>> = Vec::new();
    let mut has_volume = false;

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                let normal = (points[j] - points[i]).cross(&(points[k] - points[i]));
                let norm = normal.norm();
                if norm < eps * extent {
                    continue; // collinear triple
                }
                let normal = normal / norm;

                let sides: Vec<f64> = points.iter().map(|p| normal.dot(&(p - points[i]))).collect();
                if sides.iter().any(|s| s.abs() > eps) {
                    has_volume = true;
                }

                let outward = if sides.iter().all(|&s| s <= eps) {
                    normal
                } else if sides.iter().all(|&s| s >= -eps) {
                    -normal
                } else {
                    continue;
                };

                let on_plane: Vec<usize> = (0..n).filter(|&m| sides[m].abs() <= eps).collect();
                if !seen_planes.insert(on_plane.clone()) {
                    continue;
                }
                let outline = planar_outline(points, &on_plane, &outward, eps);
                if outline.len() >= 3 {
                    polygons.push(outline);
                }
            }
        }
    }

    if !has_volume || polygons.len() < 4 {
        return Err(StructureError::DegenerateHull(format!(
            "{} points are coplanar",
            n
        )));
    }

    // Compact the vertex list, keeping input order.
    let used: BTreeSet<usize> = polygons.iter().flatten().copied().collect();
    let mut remap = vec![usize::MAX; n];
    let mut vertices = Vec::with_capacity(used.len());
    for (new_idx, &old_idx) in used.iter().enumerate() {
        remap[old_idx] = new_idx;
        vertices.push(points[old_idx]);
    }

    let mut faces = Vec::new();
    for outline in &polygons {
        for w in 1..(outline.len() - 1) {
            faces.push([remap[outline[0]], remap[outline[w]], remap[outline[w + 1]]]);
        }
    }

    Ok(ConvexHull { vertices, faces })
}

fn centroid(points: &[Vector3<f64>]) -> Vector3<f64> {
    points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / points.len() as f64
}

/// Outline of the points lying on one supporting plane, counter-clockwise
/// around `outward`. Interior and edge-collinear points are dropped.
fn planar_outline(points: &[Vector3<f64>], on_plane: &[usize], outward: &Vector3<f64>, eps: f64) -> Vec<usize> {
    let plane_center = on_plane.iter().fold(Vector3::zeros(), |acc, &m| acc + points[m]) / on_plane.len() as f64;

    // In-plane basis (u, w) with u x w = outward.
    let seed = on_plane
        .iter()
        .map(|&m| points[m] - plane_center)
        .find(|d| d.norm() > eps)
        .unwrap_or_else(|| outward.cross(&Vector3::x()));
    let u = (seed - outward * outward.dot(&seed)).normalize();
    let w = outward.cross(&u);

    let mut projected: Vec<(f64, f64, usize)> = on_plane
        .iter()
        .map(|&m| {
            let d = points[m] - plane_center;
            (d.dot(&u), d.dot(&w), m)
        })
        .collect();
    projected.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));

    // Andrew's monotone chain; result is counter-clockwise.
    let cross = |o: &(f64, f64, usize), a: &(f64, f64, usize), b: &(f64, f64, usize)| {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };
    let area_eps = eps * eps;

    let mut lower: Vec<(f64, f64, usize)> = Vec::new();
    for p in &projected {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= area_eps {
            lower.pop();
        }
        lower.push(*p);
    }
    let mut upper: Vec<(f64, f64, usize)> = Vec::new();
    for p in projected.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= area_eps {
            upper.pop();
        }
        upper.push(*p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);

    lower.into_iter().map(|(_, _, m)| m).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outward_facing(hull: &ConvexHull) -> bool {
        let c = centroid(&hull.vertices);
        hull.faces.iter().all(|f| {
            let (a, b, d) = (hull.vertices[f[0]], hull.vertices[f[1]], hull.vertices[f[2]]);
            (b - a).cross(&(d - a)).dot(&(a - c)) > 0.0
        })
    }

    #[test]
    fn tetrahedron_has_four_faces() {
        let pts = vec![
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(-1.0, -1.0, -1.0),
        ];
        let hull = convex_hull(&pts).unwrap();
        assert_eq!(hull.vertex_count(), 4);
        assert_eq!(hull.faces.len(), 4);
        assert_eq!(hull.edges().len(), 6);
        assert!(outward_facing(&hull));
    }

    #[test]
    fn octahedron_has_eight_faces() {
        let d = 2.0;
        let pts = vec![
            Vector3::new(d, 0.0, 0.0),
            Vector3::new(-d, 0.0, 0.0),
            Vector3::new(0.0, d, 0.0),
            Vector3::new(0.0, -d, 0.0),
            Vector3::new(0.0, 0.0, d),
            Vector3::new(0.0, 0.0, -d),
        ];
        let hull = convex_hull(&pts).unwrap();
        assert_eq!(hull.vertex_count(), 6);
        assert_eq!(hull.faces.len(), 8);
        assert!(outward_facing(&hull));
        // (4/3) d^3
        assert!((hull.volume() - 4.0 / 3.0 * d.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn cube_faces_are_split_into_two_triangles() {
        let mut pts = Vec::new();
        for x in [0.0, 1.0] {
            for y in [0.0, 1.0] {
                for z in [0.0, 1.0] {
                    pts.push(Vector3::new(x, y, z));
                }
            }
        }
        // an interior point must not become a vertex
        pts.push(Vector3::new(0.5, 0.5, 0.5));
        let hull = convex_hull(&pts).unwrap();
        assert_eq!(hull.vertex_count(), 8);
        assert_eq!(hull.faces.len(), 12);
        assert!((hull.volume() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn coplanar_points_are_degenerate() {
        let pts = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(1.0, 1.0, 0.0),
            Vector3::new(0.5, 0.2, 0.0),
        ];
        assert!(matches!(convex_hull(&pts), Err(StructureError::DegenerateHull(_))));
        assert!(convex_hull(&pts[..3]).is_err());
    }
}
