pub mod hull;
pub mod transform;
