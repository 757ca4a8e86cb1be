//! encal CLI - Empirical neighbourhood calibration of land-use attraction rules

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array3;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use encal_algorithms::calibration::{
    calibrate, Calibration, CalibrationParams, ClassRoles, DistanceCatalog, RingGrouping,
    RulePolicy,
};
use encal_core::io::read_ascii_grid;
use encal_core::Raster;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "encal")]
#[command(author, version, about = "Empirical neighbourhood calibration of land-use attraction rules", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a land-use raster
    Info {
        /// Input ASCII grid
        input: PathBuf,
    },
    /// List the distance rings of a neighbourhood
    Distances {
        /// Maximum neighbourhood radius in cells
        #[arg(short, long, default_value = "8")]
        max_distance: usize,
        /// Ring grouping: exact, rounded
        #[arg(short, long, default_value = "exact")]
        grouping: String,
    },
    /// Calibrate attraction rules from two land-use maps
    Calibrate(CalibrateArgs),
}

#[derive(Args)]
struct CalibrateArgs {
    /// Land use at time 1
    #[arg(long)]
    origin: PathBuf,
    /// Land use at time 2
    #[arg(long)]
    destination: PathBuf,
    /// Analysis mask, cells above zero are analysed
    #[arg(long)]
    mask: PathBuf,
    /// Number of land-use classes
    #[arg(short, long)]
    classes: usize,
    /// Number of passive classes (the first classes)
    #[arg(short, long)]
    passive: usize,
    /// Number of feature classes (the last classes)
    #[arg(short, long)]
    feature: usize,
    /// Maximum neighbourhood radius in cells
    #[arg(short, long, default_value = "8")]
    max_distance: usize,
    /// Ring grouping: exact, rounded
    #[arg(short, long, default_value = "exact")]
    grouping: String,
    /// Significance limit on |z|
    #[arg(short, long, default_value = "1.96")]
    z_limit: f64,
    /// Ring indices examined for rules, nearest ring is 0
    #[arg(short, long, value_delimiter = ',', default_value = "1,2")]
    rings: Vec<usize>,
    /// Rings that must be significant for a rule
    #[arg(long, default_value = "2")]
    min_significant: usize,
    /// Output attraction rule file
    #[arg(short, long)]
    output: PathBuf,
    /// Optional JSON report with every intermediate table
    #[arg(long)]
    report: Option<PathBuf>,
}

impl CalibrateArgs {
    fn params(&self) -> Result<CalibrationParams> {
        let roles = ClassRoles::from_counts(self.classes, self.passive, self.feature)
            .context("Invalid class roles")?;
        Ok(CalibrationParams {
            classes: self.classes,
            roles,
            max_distance: self.max_distance,
            grouping: parse_grouping(&self.grouping)?,
            policy: RulePolicy {
                z_limit: self.z_limit,
                rings: self.rings.clone(),
                min_significant: self.min_significant,
            },
        })
    }
}

// ─── Report ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report<'a> {
    params: &'a CalibrationParams,
    distances: Vec<f64>,
    ring_sizes: Vec<usize>,
    class_cells: &'a [u64],
    transitions: Vec<TransitionCount>,
    /// (ring, destination, neighbour)
    z_scores: Vec<Vec<Vec<Option<f64>>>>,
    /// (ring, destination, neighbour)
    log_enrichment: Vec<Vec<Vec<Option<f64>>>>,
    /// (neighbour, active destination), as in the rule file
    rules: Vec<Vec<u8>>,
}

#[derive(Serialize)]
struct TransitionCount {
    from: usize,
    to: usize,
    cells: u64,
}

impl<'a> Report<'a> {
    fn new(params: &'a CalibrationParams, cal: &'a Calibration) -> Self {
        Self {
            params,
            distances: cal.catalog.distances(),
            ring_sizes: cal.catalog.sizes(),
            class_cells: &cal.counts.class_cells,
            transitions: cal
                .counts
                .transitions
                .iter()
                .map(|(t, profile)| TransitionCount {
                    from: t.from,
                    to: t.to,
                    cells: profile.cells(),
                })
                .collect(),
            z_scores: nested(&cal.z_scores),
            log_enrichment: nested(&cal.log_enrichment),
            rules: cal
                .rules
                .matrix()
                .t()
                .rows()
                .into_iter()
                .map(|row| row.to_vec())
                .collect(),
        }
    }
}

fn nested<T: Clone>(table: &Array3<T>) -> Vec<Vec<Vec<T>>> {
    table
        .outer_iter()
        .map(|plane| plane.rows().into_iter().map(|row| row.to_vec()).collect())
        .collect()
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_map(path: &Path) -> Result<Raster<i32>> {
    let pb = spinner(&format!("Reading {}...", path.display()));
    let raster = read_ascii_grid(path).with_context(|| format!("Failed to read {}", path.display()));
    pb.finish_and_clear();
    raster
}

fn write_text(text: &str, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn parse_grouping(s: &str) -> Result<RingGrouping> {
    match s.to_lowercase().as_str() {
        "exact" | "e" => Ok(RingGrouping::Exact),
        "rounded" | "round" | "r" => Ok(RingGrouping::Rounded),
        _ => bail!("Unknown ring grouping: {}. Use: exact, rounded", s),
    }
}

fn run_calibrate(args: &CalibrateArgs) -> Result<Calibration> {
    let params = args.params()?;
    let origin = read_map(&args.origin)?;
    let destination = read_map(&args.destination)?;
    let mask = read_map(&args.mask)?;

    let start = Instant::now();
    let cal = calibrate(&origin, &destination, &mask, &params).context("Calibration failed")?;
    let elapsed = start.elapsed();

    info!(
        "{} valid cells, {} rings, {} transitions",
        cal.counts.valid_cells(),
        cal.catalog.len(),
        cal.counts.transitions.len()
    );

    write_text(&cal.rules.to_text(), &args.output)?;
    done("Attraction rules", &args.output, elapsed);

    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&Report::new(&params, &cal))
            .context("Failed to serialize report")?;
        write_text(&json, path)?;
        println!("Report saved to: {}", path.display());
    }

    Ok(cal)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_map(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }

            let counts = raster.value_counts();
            let valid: usize = counts.values().sum();
            println!("\nClasses:");
            for (value, n) in &counts {
                println!(
                    "  {:>4}: {} ({:.1}%)",
                    value,
                    n,
                    100.0 * *n as f64 / valid.max(1) as f64
                );
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                valid,
                100.0 * valid as f64 / raster.len() as f64
            );
        }

        // ── Distances ────────────────────────────────────────────────
        Commands::Distances {
            max_distance,
            grouping,
        } => {
            let catalog = DistanceCatalog::new(max_distance, parse_grouping(&grouping)?);
            println!("{} rings within radius {}", catalog.len(), max_distance);
            println!("  ring  distance  cells");
            for (i, ring) in catalog.rings().iter().enumerate() {
                println!("  {:>4}  {:>8.4}  {:>5}", i, ring.distance, ring.size());
            }
        }

        // ── Calibrate ────────────────────────────────────────────────
        Commands::Calibrate(args) => {
            let cal = run_calibrate(&args)?;
            if cli.verbose {
                print!("{}", cal.rules.to_text());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encal_core::io::write_ascii_grid;

    fn write_map(dir: &Path, name: &str, data: Vec<i32>) -> PathBuf {
        let raster = Raster::from_vec(data, 10, 10).unwrap();
        let path = dir.join(name);
        write_ascii_grid(&raster, &path).unwrap();
        path
    }

    fn args(dir: &Path) -> CalibrateArgs {
        // four class-0 cells ringed by class 1 become class 2
        let mut before = vec![0; 100];
        for (r, c) in [(2, 2), (2, 7), (7, 2), (7, 7)] {
            for dr in 0..3 {
                for dc in 0..3 {
                    if dr != 1 || dc != 1 {
                        before[(r + dr - 1) * 10 + c + dc - 1] = 1;
                    }
                }
            }
        }
        let mut after = before.clone();
        for i in [22, 27, 72, 77] {
            after[i] = 2;
        }

        CalibrateArgs {
            origin: write_map(dir, "t1.asc", before),
            destination: write_map(dir, "t2.asc", after),
            mask: write_map(dir, "mask.asc", vec![1; 100]),
            classes: 3,
            passive: 1,
            feature: 0,
            max_distance: 2,
            grouping: "exact".to_string(),
            z_limit: 1.96,
            rings: vec![0, 1],
            min_significant: 2,
            output: dir.join("att_rules.txt"),
            report: Some(dir.join("report.json")),
        }
    }

    #[test]
    fn test_parse_grouping() {
        assert_eq!(parse_grouping("Exact").unwrap(), RingGrouping::Exact);
        assert_eq!(parse_grouping("r").unwrap(), RingGrouping::Rounded);
        assert!(parse_grouping("hex").is_err());
    }

    #[test]
    fn test_calibrate_writes_rules_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let args = args(dir.path());
        run_calibrate(&args).unwrap();

        let rules = std::fs::read_to_string(&args.output).unwrap();
        assert_eq!(rules, "0 0\n1 1\n0 1\n");

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("report.json")).unwrap())
                .unwrap();
        assert_eq!(report["ring_sizes"], serde_json::json!([4, 4]));
        assert_eq!(report["transitions"][0]["cells"], 4);
        assert!(report["z_scores"][0][2][2].is_null());
        assert!(report["z_scores"][0][2][1].as_f64().unwrap() > 1.96);
        assert_eq!(report["rules"], serde_json::json!([[0, 0], [1, 1], [0, 1]]));
    }

    #[test]
    fn test_bad_roles_fail_before_reading() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path());
        args.passive = 3;
        args.origin = dir.path().join("missing.asc");
        let err = run_calibrate(&args).unwrap_err();
        assert!(err.to_string().contains("roles"));
    }

    #[test]
    fn test_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = args(dir.path());
        args.mask = dir.path().join("missing.asc");
        assert!(run_calibrate(&args).is_err());
    }

    #[test]
    fn test_nested_order() {
        let table = Array3::from_shape_fn((2, 2, 3), |(d, p, q)| d * 100 + p * 10 + q);
        let nested = nested(&table);
        assert_eq!(nested[1][0][2], 102);
        assert_eq!(nested[0][1].len(), 3);
    }
}
