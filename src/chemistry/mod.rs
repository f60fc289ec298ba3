pub mod elements;
pub mod materials;
pub mod substitution;
