use crate::core::error::{Result, StructureError};
use crate::core::structure::StructureData;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

const RATIO_SUM_TOLERANCE: f64 = 1e-6;

/// Fraction of Fe sites swapped for Mn in LiMn(0.35)Fe(0.65)PO4.
pub const LMFP_MN_FRACTION: f64 = 0.35;

// ============================================================================
// RULES
// ============================================================================

/// Statistical relabelling of every `target` site.
///
/// Each target atom independently draws `r` in [0, 1) and takes the first
/// mixture entry whose cumulative probability exceeds `r` (the last entry
/// absorbs rounding). This is a disorder model: the result is spatially
/// random, not an energy-minimised ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionRule {
    pub target: String,
    pub mixture: Vec<(String, f64)>,
}

impl SubstitutionRule {
    pub fn new(target: &str, mixture: Vec<(String, f64)>) -> Result<Self> {
        if mixture.is_empty() {
            return Err(StructureError::InvalidSubstitution("empty mixture".into()));
        }
        for (element, p) in &mixture {
            if !(p.is_finite() && (0.0..=1.0).contains(p)) {
                return Err(StructureError::InvalidSubstitution(format!(
                    "probability {} for {} outside [0, 1]",
                    p, element
                )));
            }
        }
        let total: f64 = mixture.iter().map(|(_, p)| p).sum();
        if (total - 1.0).abs() > RATIO_SUM_TOLERANCE {
            return Err(StructureError::InvalidSubstitution(format!(
                "probabilities sum to {}, expected 1",
                total
            )));
        }
        Ok(Self {
            target: target.to_string(),
            mixture,
        })
    }

    /// `target` becomes `dopant` with probability `fraction`, else stays.
    pub fn binary(target: &str, dopant: &str, fraction: f64) -> Result<Self> {
        Self::new(
            target,
            vec![(dopant.to_string(), fraction), (target.to_string(), 1.0 - fraction)],
        )
    }

    /// Ni/Co/Mn mixing on the layered metal site.
    pub fn ternary(ratio: NcmRatio) -> Self {
        let (ni, co, mn) = ratio.fractions();
        Self {
            target: crate::synthesis::layered::PLACEHOLDER_METAL.to_string(),
            mixture: vec![("Ni".to_string(), ni), ("Co".to_string(), co), ("Mn".to_string(), mn)],
        }
    }

    pub fn lmfp() -> Self {
        Self {
            target: "Fe".to_string(),
            mixture: vec![("Mn".to_string(), LMFP_MN_FRACTION), ("Fe".to_string(), 1.0 - LMFP_MN_FRACTION)],
        }
    }

    /// Picks the element for one uniform draw `r` in [0, 1).
    pub fn pick(&self, r: f64) -> &str {
        let mut cumulative = 0.0;
        for (element, p) in &self.mixture {
            cumulative += p;
            if r < cumulative {
                return element;
            }
        }
        // r landed in the rounding gap above the last cumulative sum
        self.mixture.last().map(|(e, _)| e.as_str()).unwrap_or(self.target.as_str())
    }
}

/// Relabels the rule's target sites; ids, positions and the cell are kept.
pub fn substitute<R: Rng + ?Sized>(base: &StructureData, rule: &SubstitutionRule, rng: &mut R) -> StructureData {
    let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
    let atoms = base
        .atoms
        .iter()
        .map(|atom| {
            if atom.element != rule.target {
                return atom.clone();
            }
            let element = rule.pick(rng.gen::<f64>());
            *tally.entry(element).or_insert(0) += 1;
            atom.with_element(element)
        })
        .collect();

    debug!("substituted {} sites: {:?}", rule.target, tally);
    StructureData::new(atoms, base.unit_cell)
}

/// Seeded generator when `seed` is given, otherwise a fresh entropy seed
/// (a new pattern on every regeneration).
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

// ============================================================================
// NCM PRODUCT TIERS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NcmRatio {
    R811,
    R622,
    R111,
}

impl NcmRatio {
    /// (Ni, Co, Mn) site fractions.
    pub fn fractions(&self) -> (f64, f64, f64) {
        match self {
            NcmRatio::R811 => (0.8, 0.1, 0.1),
            NcmRatio::R622 => (0.6, 0.2, 0.2),
            NcmRatio::R111 => (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0),
        }
    }
}

impl fmt::Display for NcmRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NcmRatio::R811 => "811",
            NcmRatio::R622 => "622",
            NcmRatio::R111 => "111",
        };
        f.write_str(s)
    }
}

impl FromStr for NcmRatio {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "811" => Ok(NcmRatio::R811),
            "622" => Ok(NcmRatio::R622),
            "111" => Ok(NcmRatio::R111),
            other => Err(StructureError::InvalidSubstitution(format!(
                "unknown NCM ratio '{}' (expected 811, 622 or 111)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::AtomId;
    use nalgebra::Vector3;

    fn metal_chain(n: usize, element: &str) -> StructureData {
        StructureData::from_cartesian(
            (0..n).map(|i| (element.to_string(), Vector3::new(i as f64 * 3.0, 0.0, 0.0))),
        )
    }

    #[test]
    fn pick_partitions_by_cumulative_probability() {
        let rule = SubstitutionRule::ternary(NcmRatio::R811);
        assert_eq!(rule.pick(0.0), "Ni");
        assert_eq!(rule.pick(0.79), "Ni");
        assert_eq!(rule.pick(0.85), "Co");
        assert_eq!(rule.pick(0.95), "Mn");
        assert_eq!(rule.pick(0.999_999_9), "Mn");
    }

    #[test]
    fn invalid_mixtures_are_rejected() {
        assert!(SubstitutionRule::binary("Fe", "Mn", 1.5).is_err());
        assert!(SubstitutionRule::new("Co", vec![("Ni".into(), 0.5), ("Mn".into(), 0.4)]).is_err());
        assert!(SubstitutionRule::new("Co", vec![]).is_err());
        assert!(SubstitutionRule::binary("Fe", "Mn", 0.35).is_ok());
    }

    #[test]
    fn only_target_sites_change() {
        let mut base = metal_chain(50, "Fe");
        base.atoms.extend(metal_chain(5, "O").atoms.into_iter().map(|mut a| {
            a.id = AtomId(a.id.0 + 1000);
            a
        }));
        let mut rng = rng_from_seed(Some(1));
        let out = substitute(&base, &SubstitutionRule::lmfp(), &mut rng);

        assert_eq!(out.count_of("O"), 5);
        assert_eq!(out.count_of("Fe") + out.count_of("Mn"), 50);
        for (a, b) in base.atoms.iter().zip(&out.atoms) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    fn same_seed_same_pattern() {
        let base = metal_chain(200, "Co");
        let rule = SubstitutionRule::ternary(NcmRatio::R622);
        let a = substitute(&base, &rule, &mut rng_from_seed(Some(42)));
        let b = substitute(&base, &rule, &mut rng_from_seed(Some(42)));
        assert_eq!(a, b);
    }

    #[test]
    fn ratios_parse() {
        assert_eq!("811".parse::<NcmRatio>().unwrap(), NcmRatio::R811);
        assert!("900".parse::<NcmRatio>().is_err());
        let (ni, co, mn) = NcmRatio::R111.fractions();
        assert!((ni + co + mn - 1.0).abs() < 1e-12);
    }
}
