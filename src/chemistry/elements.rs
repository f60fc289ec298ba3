//! Colors and display radii for the cathode element set.
//!
//! Radii are scaled-down ionic radii (roughly half of Shannon values) so
//! neighbouring spheres do not swallow each other at scale 1.0.

/// Cathode-relevant elements, in legend/priority order.
pub const PRIORITY_ORDER: [&str; 7] = ["Li", "Ni", "Co", "Mn", "Fe", "P", "O"];

/// Elements around which coordination polyhedra are drawn.
pub const COORDINATION_CENTERS: [&str; 5] = ["Co", "Ni", "Mn", "Fe", "P"];

pub const TRANSITION_METALS: [&str; 4] = ["Co", "Ni", "Mn", "Fe"];

pub const FALLBACK_COLOR: &str = "#cccccc";
pub const FALLBACK_RADIUS: f64 = 0.5;

pub fn element_color(element: &str) -> &'static str {
    match element {
        "Li" => "#0277BD", // azure
        "Ni" => "#00897B", // teal
        "Co" => "#EF6C00", // dark orange
        "Mn" => "#7E57C2", // violet
        "Al" => "#546E7A", // blue grey
        "Fe" => "#8D6E63", // bronze
        "P" => "#6D4C41",
        "O" => "#1A237E", // navy
        _ => FALLBACK_COLOR,
    }
}

/// Palette color, or `None` for elements outside the cathode palette.
pub fn known_color(element: &str) -> Option<&'static str> {
    match element_color(element) {
        FALLBACK_COLOR => None,
        c => Some(c),
    }
}

pub fn display_radius(element: &str) -> f64 {
    match element {
        "Li" => 0.45,
        "O" => 0.80,
        "Co" => 0.35,
        "Ni" => 0.40,
        "Mn" => 0.35,
        "Fe" => 0.40,
        "P" => 0.25,
        _ => FALLBACK_RADIUS,
    }
}

pub fn is_transition_metal(element: &str) -> bool {
    TRANSITION_METALS.contains(&element)
}

pub fn is_coordination_center(element: &str) -> bool {
    COORDINATION_CENTERS.contains(&element)
}

/// Position in `PRIORITY_ORDER`, if listed.
pub fn priority(element: &str) -> Option<usize> {
    PRIORITY_ORDER.iter().position(|&e| e == element)
}

/// Strips oxidation states and site numbering from a CIF label:
/// `"Fe2+"` -> `"Fe"`, `"O3"` -> `"O"`, `"Li1"` -> `"Li"`.
pub fn clean_symbol(label: &str) -> String {
    label
        .chars()
        .filter(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | '.')))
        .collect()
}
