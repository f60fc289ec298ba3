use cathode_structure_generator::chemistry::materials::base_structure;
use cathode_structure_generator::synthesis::symmetry::{SpaceGroup, DEFAULT_DEDUP_TOLERANCE};
use cathode_structure_generator::{
    analyze, compute_bonds, compute_polyhedra, generate, generate_material, parser, AnalysisConfig, AtomId,
    CellTransform, GenerationOptions, GeneratorConfig, Material, StructureData, StructureError, SupercellRepeats,
    UnitCellParams,
};
use nalgebra::Vector3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;

fn seeded(seed: u64) -> GenerationOptions {
    GenerationOptions {
        seed: Some(seed),
        ..GenerationOptions::default()
    }
}

fn repeats(nx: i64, ny: i64, nz: i64) -> SupercellRepeats {
    SupercellRepeats::new(nx, ny, nz).expect("valid repeats")
}

#[test]
fn test_seeded_generation_is_reproducible() {
    for material in Material::all() {
        let r = repeats(2, 2, 2);
        let a = generate_material(material, r, &seeded(2024)).unwrap();
        let b = generate_material(material, r, &seeded(2024)).unwrap();
        assert_eq!(a, b, "{} differs between identical seeded runs", material);
    }
}

#[test]
fn test_olivine_count_scales_with_supercell() {
    let single = generate_material(Material::Lfp, repeats(1, 1, 1), &seeded(0)).unwrap().len();
    assert_eq!(single, 28);
    for (nx, ny, nz) in [(2, 1, 1), (1, 3, 2), (3, 3, 6)] {
        let s = generate_material(Material::Lfp, repeats(nx, ny, nz), &seeded(0)).unwrap();
        assert_eq!(s.len(), single * (nx * ny * nz) as usize);
    }
}

#[test]
fn test_pnma_orbit_sizes() {
    let pnma = SpaceGroup::pnma().unwrap();
    let li = pnma.orbit(&Vector3::zeros(), DEFAULT_DEDUP_TOLERANCE);
    assert_eq!(li.len(), 4);

    let mirror = pnma.orbit(&Vector3::new(0.2818, 0.25, 0.9744), DEFAULT_DEDUP_TOLERANCE);
    assert_eq!(mirror.len(), 4);

    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let p = Vector3::new(rng.gen::<f64>(), rng.gen::<f64>(), rng.gen::<f64>());
        let orbit = pnma.orbit(&p, DEFAULT_DEDUP_TOLERANCE);
        assert!((1..=8).contains(&orbit.len()), "orbit of {:?} has {} points", p, orbit.len());
    }
}

#[test]
fn test_ncm811_substitution_ratio() {
    let r = repeats(6, 6, 3);
    let options = seeded(0);
    let base = base_structure(Material::Ncm811, r, &options).unwrap();
    let metal_sites: Vec<AtomId> = base.atoms.iter().filter(|a| a.element == "Co").map(|a| a.id).collect();
    assert_eq!(metal_sites.len(), 3 * 6 * 6 * 3);

    let mut total_ni = 0usize;
    let runs = 10u64;
    for seed in 0..runs {
        let s = generate_material(Material::Ncm811, r, &seeded(seed)).unwrap();
        assert_eq!(s.len(), base.len());

        let mut ni = 0usize;
        for (before, after) in base.atoms.iter().zip(&s.atoms) {
            assert_eq!(before.id, after.id);
            assert_eq!(before.position, after.position);
            if before.element == "Co" {
                assert!(["Ni", "Co", "Mn"].contains(&after.element.as_str()));
                if after.element == "Ni" {
                    ni += 1;
                }
            } else {
                assert_eq!(before.element, after.element);
            }
        }
        let fraction = ni as f64 / metal_sites.len() as f64;
        assert!((fraction - 0.8).abs() < 0.1, "seed {}: Ni fraction {}", seed, fraction);
        total_ni += ni;
    }
    let mean = total_ni as f64 / (runs as usize * metal_sites.len()) as f64;
    assert!((mean - 0.8).abs() < 0.05, "mean Ni fraction {}", mean);
}

#[test]
fn test_hexagonal_transform_matches_triclinic() {
    let cell = UnitCellParams::hexagonal(2.816, 14.052);
    let hex = CellTransform::hexagonal(&cell).unwrap();
    let general = CellTransform::triclinic(&cell).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    for _ in 0..100 {
        let f = Vector3::new(rng.gen_range(-1.0..2.0), rng.gen_range(-1.0..2.0), rng.gen_range(-1.0..2.0));
        let d = (hex.to_cartesian(&f) - general.to_cartesian(&f)).norm();
        assert!(d < 1e-6, "mismatch {} at {:?}", d, f);
    }
}

#[test]
fn test_bonds_require_oxygen() {
    let s = StructureData::from_cartesian(vec![
        ("Fe", Vector3::new(0.0, 0.0, 0.0)),
        ("Fe", Vector3::new(1.0, 0.0, 0.0)),
        ("O", Vector3::new(1.2, 0.0, 0.0)),
    ]);
    let bonds = compute_bonds(&s.atoms, 2.5);
    assert_eq!(bonds.len(), 2);
    let fe_fe = bonds
        .iter()
        .filter(|b| (b.a == AtomId(0) && b.b == AtomId(1)) || (b.a == AtomId(1) && b.b == AtomId(0)))
        .count();
    assert_eq!(fe_fe, 0);
}

#[test]
fn test_polyhedron_needs_four_oxygens() {
    let ligands = [
        Vector3::new(2.0, 0.0, 0.0),
        Vector3::new(0.0, 2.0, 0.0),
        Vector3::new(0.0, 0.0, 2.0),
        Vector3::new(-1.2, -1.2, -1.2),
    ];
    let with = |n: usize| {
        let mut atoms = vec![("Mn", Vector3::zeros())];
        atoms.extend(ligands[..n].iter().map(|p| ("O", *p)));
        StructureData::from_cartesian(atoms)
    };

    assert!(compute_polyhedra(&with(3).atoms, None).is_empty());
    let polys = compute_polyhedra(&with(4).atoms, None);
    assert_eq!(polys.len(), 1);
    assert_eq!(polys[0].hull.vertex_count(), 4);
    assert_eq!(polys[0].hull.faces.len(), 4);
}

#[test]
fn test_olivine_centers_are_fully_coordinated_in_the_bulk() {
    let s = generate_material(Material::Lfp, repeats(3, 3, 3), &seeded(0)).unwrap();
    let polys = compute_polyhedra(&s.atoms, None);
    let phosphate = polys.iter().filter(|p| p.element == "P").count();
    let octahedra = polys.iter().filter(|p| p.element == "Fe").count();
    assert!(phosphate > 0 && octahedra > 0);
    for p in polys.iter().filter(|p| p.element == "P") {
        assert_eq!(p.hull.vertex_count(), 4);
    }
}

#[test]
fn test_invalid_inputs_fail_fast() {
    assert_eq!(
        "NCA".parse::<Material>(),
        Err(StructureError::UnknownMaterialFamily("NCA".into()))
    );
    assert!(matches!(
        SupercellRepeats::new(0, 1, 1),
        Err(StructureError::InvalidRepeatCount { axis: 'x', value: 0 })
    ));
    assert!(CellTransform::triclinic(&UnitCellParams::new(3.0, 3.0, 3.0, 90.0, 90.0, 0.0)).is_err());

    let cfg = GeneratorConfig {
        material: "spinel".into(),
        ..GeneratorConfig::default()
    };
    assert!(generate(&cfg).is_err());
}

#[test]
fn test_empty_structure_is_valid() {
    let analysis = analyze(
        StructureData::empty(),
        &AnalysisConfig {
            bonds: true,
            polyhedra: true,
            ..AnalysisConfig::default()
        },
    );
    assert_eq!(analysis.bonds.unwrap().len(), 0);
    assert_eq!(analysis.polyhedra.unwrap().len(), 0);
    assert!(analysis.settings.is_empty());
}

#[test]
fn test_import_sample_cif() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("sample_inputs/lco.cif");
    assert!(path.exists(), "Test file not found: {:?}", path);

    let imported = parser::from_cif(&path).expect("Failed to parse CIF");
    assert_eq!(imported.len(), 12);
    assert_eq!(imported.count_of("Li"), 3);
    assert_eq!(imported.count_of("Co"), 3);
    assert_eq!(imported.count_of("O"), 6);

    let analysis = analyze(
        imported,
        &AnalysisConfig {
            bonds: true,
            ..AnalysisConfig::default()
        },
    );
    assert!(!analysis.bonds.unwrap().is_empty());
    assert!(analysis.report.contains("Atoms:       12"));
    assert!(analysis.settings.get("Li").unwrap().visible);
}

#[test]
fn test_generate_from_config() {
    let cfg: GeneratorConfig =
        serde_json::from_str(r#"{"material":"NCM-111","repeats":[2,2,1],"seed":1}"#).unwrap();
    let s = generate(&cfg).unwrap();
    assert_eq!(s.len(), 12 * 4);
    let metals = s.count_of("Ni") + s.count_of("Co") + s.count_of("Mn");
    assert_eq!(metals, 12);
}
