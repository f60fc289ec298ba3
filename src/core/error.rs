use thiserror::Error;

/// Errors raised by the structure generation core.
///
/// Sparse or degenerate *data* (empty atom lists, centers with too few
/// neighbours) is never an error; these variants cover caller mistakes and
/// geometry that cannot be computed at all.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructureError {
    #[error(
        "supercell repeat along {axis} must lie in 1..={max} (got {value})",
        max = crate::synthesis::builder::MAX_REPEAT
    )]
    InvalidRepeatCount { axis: char, value: i64 },

    #[error("invalid unit cell parameters: {0}")]
    InvalidCellParameters(String),

    #[error("degenerate unit cell: {0}")]
    DegenerateCell(String),

    #[error("unknown material family '{0}'")]
    UnknownMaterialFamily(String),

    #[error("site dedup tolerance {0} must lie in (0, 0.5) fractional units")]
    InvalidDedupTolerance(f64),

    #[error("invalid substitution rule: {0}")]
    InvalidSubstitution(String),

    #[error("malformed symmetry operator '{expr}': {reason}")]
    MalformedOperator { expr: String, reason: String },

    #[error("cannot build convex hull: {0}")]
    DegenerateHull(String),
}

pub type Result<T> = std::result::Result<T, StructureError>;
