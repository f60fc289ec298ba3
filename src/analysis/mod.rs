pub mod bonding;
pub mod polyhedra;
