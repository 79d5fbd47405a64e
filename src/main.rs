//! EDS Map Plotter - Main entry point
//!
//! Reads exported EDS intensity grids (headerless CSV), renders each one as a
//! colour-mapped PNG with a title and colour bar, and writes the maps into an
//! output directory.

use anyhow::{bail, Context};
use clap::Parser;
use edsmap_plotter::config::PlotterConfig;
use edsmap_plotter::eds::{
    ConsoleSink, CsvSelection, DirectorySource, FileSource, PropertyReader, RenderContext,
    PALETTE_REGISTRY,
};
use edsmap_plotter::pipeline::run_batch;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Render EDS intensity grids as colour-mapped PNG maps
#[derive(Debug, Parser)]
#[command(name = "edsmap_plotter", version, about)]
struct Cli {
    /// Grid files to render (`.csv`; other files are skipped)
    #[arg(value_name = "FILE")]
    inputs: Vec<PathBuf>,

    /// Also render every `.csv` file in this directory
    #[arg(long, value_name = "DIR")]
    input_dir: Option<PathBuf>,

    /// Directory the PNG maps are written to (created if missing)
    #[arg(long, short = 'o', value_name = "DIR", required_unless_present = "list_colormaps")]
    output_dir: Option<PathBuf>,

    /// Colour map name, e.g. Blues, viridis, magma_r
    #[arg(long, short = 'c', value_name = "NAME")]
    colormap: Option<String>,

    /// JSON file with property overrides
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// PNG compression level: fast, default or best
    #[arg(long, value_name = "LEVEL")]
    png_compression: Option<String>,

    /// Print the recognized colour maps and exit
    #[arg(long)]
    list_colormaps: bool,

    /// Do not print a line per saved map
    #[arg(long, short = 'q')]
    quiet: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every selected file was rendered
fn run(cli: Cli) -> anyhow::Result<bool> {
    if cli.list_colormaps {
        print_colormaps();
        return Ok(true);
    }

    let props = load_properties(&cli)?;
    let config = PlotterConfig::from_properties(&props);

    if !PALETTE_REGISTRY.is_recognized(&config.colormap) {
        bail!(
            "Unknown colour map '{}' (use --list-colormaps to see the choices)",
            config.colormap
        );
    }

    let Some(output_dir) = cli.output_dir.as_deref() else {
        bail!("--output-dir is required");
    };

    let mut selection = CsvSelection::new();
    for input in &cli.inputs {
        if !selection.add(input.clone()) {
            tracing::warn!("Skipping {} (not a new .csv file)", input.display());
        }
    }
    if let Some(dir) = &cli.input_dir {
        let found = DirectorySource::new(dir).input_paths()?;
        tracing::info!("Found {} .csv file(s) in {}", found.len(), dir.display());
        selection.extend(found);
    }

    println!("EDS Map Plotter v{}", env!("CARGO_PKG_VERSION"));
    println!("  Colour map: {}", config.colormap);
    println!("  Compression: {}", config.png_compression.as_str());
    println!("  Files: {}\n", selection.len());

    let colormap = config.colormap.clone();
    let mut ctx = RenderContext::new(config);
    let mut sink = ConsoleSink::new(cli.quiet);
    let summary = run_batch(&selection, output_dir, &colormap, &mut ctx, &mut sink)
        .context("Batch could not start")?;

    Ok(summary.all_succeeded())
}

/// plotter.json defaults, then the config file, then command-line flags
fn load_properties(cli: &Cli) -> anyhow::Result<PropertyReader> {
    let mut props = match &cli.config {
        Some(path) => PropertyReader::from_json_file(path)?,
        None => PropertyReader::default(),
    };
    if let Some(colormap) = &cli.colormap {
        props.set("colormap", colormap.as_str());
    }
    if let Some(level) = &cli.png_compression {
        props.set("png.compression", level.as_str());
    }
    Ok(props)
}

fn print_colormaps() {
    println!("Sequential:");
    for name in PALETTE_REGISTRY.sequential_palettes() {
        println!("  {}", name);
    }
    println!("Diverging:");
    for name in PALETTE_REGISTRY.diverging_palettes() {
        println!("  {}", name);
    }
    println!("\nAppend _r to any name for the reversed map.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsStr;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_output_dir_required() {
        assert!(Cli::try_parse_from(["edsmap_plotter", "a_Fe.csv"]).is_err());
        assert!(Cli::try_parse_from(["edsmap_plotter", "--list-colormaps"]).is_ok());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "edsmap_plotter",
            "a_Fe.csv",
            "-o",
            "out",
            "--colormap",
            "magma",
            "--png-compression",
            "fast",
        ])
        .unwrap();
        let config = PlotterConfig::from_properties(&load_properties(&cli).unwrap());
        assert_eq!(config.colormap, "magma");
        assert_eq!(config.png_compression.as_str(), "fast");
    }

    fn parse(args: &[&OsStr]) -> Cli {
        let mut argv = vec![OsStr::new("edsmap_plotter")];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_run_merges_inputs_and_succeeds() {
        let scratch = tempfile::tempdir().unwrap();
        let listed = scratch.path().join("S_Fe.csv");
        std::fs::write(&listed, "1,2\n3,4\n").unwrap();
        let folder = scratch.path().join("more");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join("S_O.csv"), "5,6\n7,8\n").unwrap();
        let out = scratch.path().join("out");

        let cli = parse(&[
            listed.as_os_str(),
            OsStr::new("--input-dir"),
            folder.as_os_str(),
            OsStr::new("-o"),
            out.as_os_str(),
            OsStr::new("-q"),
        ]);
        assert!(run(cli).unwrap());
        assert!(out.join("S_edsmap_Fe.png").is_file());
        assert!(out.join("S_edsmap_O.png").is_file());
    }

    #[test]
    fn test_run_reports_failed_file() {
        let scratch = tempfile::tempdir().unwrap();
        let good = scratch.path().join("S_Fe.csv");
        std::fs::write(&good, "1,2\n3,4\n").unwrap();
        let bad = scratch.path().join("S_O.csv");
        std::fs::write(&bad, "a,b\n").unwrap();
        let out = scratch.path().join("out");

        let cli = parse(&[
            good.as_os_str(),
            bad.as_os_str(),
            OsStr::new("-o"),
            out.as_os_str(),
        ]);
        assert!(!run(cli).unwrap());
        assert!(out.join("S_edsmap_Fe.png").is_file());
        assert!(!out.join("S_edsmap_O.png").exists());
    }

    #[test]
    fn test_run_rejects_unknown_colormap_from_config_file() {
        let scratch = tempfile::tempdir().unwrap();
        let input = scratch.path().join("S_Fe.csv");
        std::fs::write(&input, "1,2\n3,4\n").unwrap();
        let config = scratch.path().join("plotter.json");
        std::fs::write(&config, r#"{"colormap": "NotAMap"}"#).unwrap();
        let out = scratch.path().join("out");

        let cli = parse(&[
            input.as_os_str(),
            OsStr::new("--config"),
            config.as_os_str(),
            OsStr::new("-o"),
            out.as_os_str(),
        ]);
        let err = run(cli).unwrap_err();
        assert!(err.to_string().contains("NotAMap"));
        assert!(!out.exists());
    }

    #[test]
    fn test_run_with_nothing_selected_is_error() {
        let scratch = tempfile::tempdir().unwrap();
        let out = scratch.path().join("out");
        let cli = parse(&[OsStr::new("-o"), out.as_os_str()]);
        assert!(run(cli).is_err());
    }
}
