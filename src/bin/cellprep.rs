//! cellprep - single-cell preprocessing CLI
//!
//! Command-line interface for the filtering / normalization / PCA pipeline.

use cellprep::data::{DatasetConfig, ExpressionMatrix};
use cellprep::error::Result;
use cellprep::genes::Species;
use cellprep::normalize::NormalizationMethod;
use cellprep::pipeline::{NormalizationConfig, PreprocessConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI-friendly normalization method enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliMethod {
    /// Library-size CPM normalization followed by log10(x + 1)
    LogCpm,
    /// NB Pearson residuals with highly-variable-gene selection
    PearsonResiduals,
}

impl From<CliMethod> for NormalizationMethod {
    fn from(method: CliMethod) -> Self {
        match method {
            CliMethod::LogCpm => NormalizationMethod::LogCpm,
            CliMethod::PearsonResiduals => NormalizationMethod::PearsonResiduals,
        }
    }
}

/// CLI-friendly species enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSpecies {
    Human,
    Mouse,
}

impl From<CliSpecies> for Species {
    fn from(species: CliSpecies) -> Self {
        match species {
            CliSpecies::Human => Species::Human,
            CliSpecies::Mouse => Species::Mouse,
        }
    }
}

/// Single-cell expression preprocessing
#[derive(Parser)]
#[command(name = "cellprep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Filter, normalize and reduce a raw count matrix
    Preprocess {
        /// Path to the raw counts CSV (gzip if the extension is .gz)
        #[arg(short, long)]
        counts: PathBuf,

        /// Output path for the reduced matrix CSV[.gz]
        #[arg(short, long)]
        output: PathBuf,

        /// Normalization branch
        #[arg(short, long, value_enum, default_value = "pearson-residuals")]
        method: CliMethod,

        /// Species for the marker gene catalog (overrides the dataset config)
        #[arg(short, long, value_enum)]
        species: Option<CliSpecies>,

        /// Number of PCA components to retain
        #[arg(long, default_value = "50")]
        n_components: usize,

        /// Number of highly variable genes (Pearson branch)
        #[arg(long, default_value = "3000")]
        n_hvg: usize,

        /// Optional per-dataset YAML config (species, n_clusters)
        #[arg(long)]
        dataset_config: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess {
            counts,
            output,
            method,
            species,
            n_components,
            n_hvg,
            dataset_config,
        } => {
            let dataset = match dataset_config {
                Some(path) => DatasetConfig::from_yaml_file(path)?,
                None => DatasetConfig::default(),
            };
            let species = species
                .map(Species::from)
                .unwrap_or_else(|| dataset.species_or_default());

            let config = PreprocessConfig {
                method: method.into(),
                species,
                n_pca_components: n_components,
                normalize: NormalizationConfig {
                    n_hvg,
                    ..NormalizationConfig::default()
                },
                ..PreprocessConfig::default()
            };

            let raw = ExpressionMatrix::from_path(&counts)?;
            println!(
                "Loaded {} cells x {} genes from {}",
                raw.n_cells(),
                raw.n_genes(),
                counts.display()
            );

            let reduced = cellprep::pipeline::preprocess(&raw, &config)?;
            reduced.to_path(&output)?;

            println!(
                "Saved {} cells x {} components to {}",
                reduced.n_cells(),
                reduced.n_genes(),
                output.display()
            );
            Ok(())
        }
    }
}
