use crate::core::structure::{Atom, AtomId};
use log::debug;
use nalgebra::Vector3;
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::Serialize;

/// Default display cutoff for O-involving contacts, in Angstrom.
pub const DEFAULT_BOND_CUTOFF: f64 = 2.5;

/// A display bond between two atoms. Derived data, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bond {
    pub a: AtomId,
    pub b: AtomId,
    pub start: Vector3<f64>,
    pub end: Vector3<f64>,
}

impl Bond {
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }
}

/// Index pairs (i < j) of bonded atoms.
///
/// A pair bonds iff its squared distance is below `max_distance^2` and at
/// least one side is oxygen. Metal-metal contacts never bond here.
///
/// # Complexity
/// O(N^2) all-pairs; fine for the <= 10x10x10 supercells generated here.
fn bonded_pairs(atoms: &[Atom], max_distance: f64) -> Vec<(usize, usize)> {
    let cutoff_sq = max_distance * max_distance;
    let mut pairs = Vec::new();
    for i in 0..atoms.len() {
        for j in (i + 1)..atoms.len() {
            if !(atoms[i].is_oxygen() || atoms[j].is_oxygen()) {
                continue;
            }
            if (atoms[i].position - atoms[j].position).norm_squared() < cutoff_sq {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

pub fn compute_bonds(atoms: &[Atom], max_distance: f64) -> Vec<Bond> {
    let bonds: Vec<Bond> = bonded_pairs(atoms, max_distance)
        .into_iter()
        .map(|(i, j)| Bond {
            a: atoms[i].id,
            b: atoms[j].id,
            start: atoms[i].position,
            end: atoms[j].position,
        })
        .collect();
    debug!("{} bonds below {:.2} A among {} atoms", bonds.len(), max_distance, atoms.len());
    bonds
}

// ============================================================================
// GRAPH REPRESENTATION
// ============================================================================

/// Bond connectivity over atom indices.
pub struct BondNetwork {
    /// Nodes carry the index into the atom slice the network was built from.
    pub graph: UnGraph<usize, f64>,
}

impl BondNetwork {
    pub fn from_atoms(atoms: &[Atom], max_distance: f64) -> Self {
        let pairs = bonded_pairs(atoms, max_distance);
        let mut graph = UnGraph::<usize, f64>::with_capacity(atoms.len(), pairs.len());
        let nodes: Vec<NodeIndex> = (0..atoms.len()).map(|i| graph.add_node(i)).collect();
        for (i, j) in pairs {
            let length = (atoms[i].position - atoms[j].position).norm();
            graph.add_edge(nodes[i], nodes[j], length);
        }
        Self { graph }
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of bonds touching atom `index`.
    pub fn coordination_number(&self, index: usize) -> usize {
        if index >= self.graph.node_count() {
            return 0;
        }
        self.graph.neighbors(NodeIndex::new(index)).count()
    }

    /// Indices of atoms bonded to `index`, ascending.
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        if index >= self.graph.node_count() {
            return Vec::new();
        }
        let mut out: Vec<usize> = self
            .graph
            .neighbors(NodeIndex::new(index))
            .map(|n| self.graph[n])
            .collect();
        out.sort_unstable();
        out
    }

    /// Mean coordination number of every atom labelled `element`.
    pub fn mean_coordination(&self, atoms: &[Atom], element: &str) -> Option<f64> {
        let counts: Vec<usize> = atoms
            .iter()
            .enumerate()
            .filter(|(_, a)| a.element == element)
            .map(|(i, _)| self.coordination_number(i))
            .collect();
        if counts.is_empty() {
            return None;
        }
        Some(counts.iter().sum::<usize>() as f64 / counts.len() as f64)
    }

    /// Connected fragments, isolated atoms included.
    pub fn fragment_count(&self) -> usize {
        connected_components(&self.graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::StructureData;

    fn fe_fe_o() -> StructureData {
        StructureData::from_cartesian(vec![
            ("Fe", Vector3::new(0.0, 0.0, 0.0)),
            ("Fe", Vector3::new(1.0, 0.0, 0.0)),
            ("O", Vector3::new(1.2, 0.0, 0.0)),
        ])
    }

    #[test]
    fn metal_pairs_never_bond() {
        let s = fe_fe_o();
        let bonds = compute_bonds(&s.atoms, DEFAULT_BOND_CUTOFF);
        assert_eq!(bonds.len(), 2);
        for bond in &bonds {
            assert!(bond.a == AtomId(2) || bond.b == AtomId(2));
        }
    }

    #[test]
    fn cutoff_is_strict() {
        let s = StructureData::from_cartesian(vec![
            ("Ni", Vector3::new(0.0, 0.0, 0.0)),
            ("O", Vector3::new(2.0, 0.0, 0.0)),
        ]);
        assert!(compute_bonds(&s.atoms, 2.0).is_empty());
        assert_eq!(compute_bonds(&s.atoms, 2.0001).len(), 1);
    }

    #[test]
    fn empty_input_gives_no_bonds() {
        assert!(compute_bonds(&[], DEFAULT_BOND_CUTOFF).is_empty());
        assert_eq!(BondNetwork::from_atoms(&[], DEFAULT_BOND_CUTOFF).bond_count(), 0);
    }

    #[test]
    fn network_counts_coordination() {
        let s = fe_fe_o();
        let net = BondNetwork::from_atoms(&s.atoms, DEFAULT_BOND_CUTOFF);
        assert_eq!(net.bond_count(), 2);
        assert_eq!(net.coordination_number(2), 2);
        assert_eq!(net.coordination_number(0), 1);
        assert_eq!(net.neighbors(2), vec![0, 1]);
        assert_eq!(net.mean_coordination(&s.atoms, "Fe"), Some(1.0));
        assert_eq!(net.fragment_count(), 1);
        assert_eq!(net.coordination_number(99), 0);
    }
}
