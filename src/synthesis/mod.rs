pub mod builder;
pub mod layered;
pub mod olivine;
pub mod symmetry;
