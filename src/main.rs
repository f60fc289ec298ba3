use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;
use std::time::Instant;

use cathode_structure_generator::{
    analyze, generate, parser, writer, AnalysisConfig, GeneratorConfig, Material, SupercellRepeats,
};

#[derive(Parser)]
#[command(author, version, about = "Cathode Crystal Structure Generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log progress (info level); set RUST_LOG for finer control.
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Builds a cathode supercell (NCM-811, NCM-622, NCM-111, LFP, LMFP, LCO).
    Generate {
        #[arg(short, long)]
        material: Option<String>,

        #[arg(long)]
        nx: Option<i64>,
        #[arg(long)]
        ny: Option<i64>,
        #[arg(long)]
        nz: Option<i64>,

        /// Fixes the substitution pattern; omit for a fresh one each run.
        #[arg(long)]
        seed: Option<u64>,

        /// Shift layered structures so metal planes sit on multiples of c/3.
        #[arg(long)]
        align_metal_layers: bool,

        /// JSON config file; flags given here override it.
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(long)]
        bonds: bool,

        #[arg(long)]
        polyhedra: bool,

        /// Output path (.json or .xyz).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Reads a CIF file and runs the same analysis on it.
    Import {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value_t = cathode_structure_generator::DEFAULT_BOND_CUTOFF)]
        cutoff: f64,

        #[arg(long)]
        bonds: bool,

        #[arg(long)]
        polyhedra: bool,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Lists the available materials.
    Materials,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let start_time = Instant::now();

    match cli.command {
        Commands::Generate {
            material,
            nx,
            ny,
            nz,
            seed,
            align_metal_layers,
            config,
            bonds,
            polyhedra,
            output,
        } => {
            println!("--- Cathode Structure Generator ---");

            let mut cfg = match &config {
                Some(path) => {
                    println!("Reading config from {:?}...", path);
                    GeneratorConfig::load(path)?
                }
                None => GeneratorConfig::default(),
            };
            if let Some(m) = material {
                cfg.material = m;
            }
            if nx.is_some() || ny.is_some() || nz.is_some() {
                let defaults = cfg.repeats()?;
                let repeats = SupercellRepeats::new(
                    nx.unwrap_or(defaults.nx as i64),
                    ny.unwrap_or(defaults.ny as i64),
                    nz.unwrap_or(defaults.nz as i64),
                )?;
                cfg.repeats = Some([repeats.nx, repeats.ny, repeats.nz]);
            }
            if seed.is_some() {
                cfg.seed = seed;
            }
            cfg.align_metal_layers |= align_metal_layers;

            let mat = cfg.material()?;
            let repeats = cfg.repeats()?;
            let info = mat.info();
            println!(
                "Generating {} ({}, {} #{}) as {}x{}x{} supercell...",
                info.id, info.name, info.space_group, info.space_group_number, repeats.nx, repeats.ny, repeats.nz
            );
            match cfg.seed {
                Some(s) => println!("-> Substitution seed: {}", s),
                None => println!("-> Substitution seed: random"),
            }

            let structure = generate(&cfg)?;
            println!("-> Built {} atoms.", structure.len());

            let analysis = analyze(
                structure,
                &AnalysisConfig {
                    bonds,
                    polyhedra,
                    bond_cutoff: cfg.bond_cutoff,
                    element_overrides: cfg.elements.clone(),
                },
            );

            println!("\nSuccess!");
            println!("{}", analysis.report);

            if let Some(path) = output {
                println!("Writing output to {:?}...", path);
                writer::write_structure(
                    &path,
                    &analysis.structure,
                    analysis.bonds.as_deref(),
                    analysis.polyhedra.as_deref(),
                    &format!("{} {}", info.id, info.name),
                )?;
            }
        }
        Commands::Import {
            input,
            cutoff,
            bonds,
            polyhedra,
            output,
        } => {
            println!("--- Cathode Structure Generator ---");
            println!("Reading structure from {:?}...", input);
            let structure = parser::from_cif(&input)?;
            println!("-> Loaded {} atoms.", structure.len());

            let analysis = analyze(
                structure,
                &AnalysisConfig {
                    bonds,
                    polyhedra,
                    bond_cutoff: cutoff,
                    ..AnalysisConfig::default()
                },
            );
            println!("{}", analysis.report);

            if let Some(path) = output {
                println!("Writing output to {:?}...", path);
                let comment = input
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .context("input path has no file name")?;
                writer::write_structure(
                    &path,
                    &analysis.structure,
                    analysis.bonds.as_deref(),
                    analysis.polyhedra.as_deref(),
                    comment,
                )?;
            }
        }
        Commands::Materials => {
            for m in Material::all() {
                let info = m.info();
                println!(
                    "{:<8} {:<22} {:<5} #{:<4} {:<26} default {}x{}x{}",
                    info.id,
                    info.name,
                    info.space_group,
                    info.space_group_number,
                    info.crystal_system,
                    info.default_repeats[0],
                    info.default_repeats[1],
                    info.default_repeats[2]
                );
            }
            return Ok(());
        }
    }

    println!("Done in {:.2?}", start_time.elapsed());
    Ok(())
}
