//! Usage Statistics Report Tool
//!
//! Reads pipeline JSON from one or more data directories and writes the
//! derived dashboard report for each.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, LevelFilter};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

use usagestats::{load_dataset_async, Config, Dashboard};

const REPORT_FILE: &str = "report.json";

/// Derive dashboard series from pipeline output
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (overrides USAGESTATS_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory to read; repeat for several (default: from config)
    #[arg(short, long = "data-dir")]
    data_dir: Vec<PathBuf>,

    /// Output directory (default: from config)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose || cfg!(feature = "dev") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if std::env::var_os("RUST_LOG").is_none() || verbose {
        builder.filter_level(level);
    }
    builder.init();
}

/// Where the report for `data_dir` goes: directly under `out` for a single
/// directory, else in a subdirectory named after the data directory.
fn report_path(out: &Path, data_dir: &Path, several: bool) -> PathBuf {
    if !several {
        return out.join(REPORT_FILE);
    }
    let name = data_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "data".to_string());
    out.join(name).join(REPORT_FILE)
}

/// Report paths for every data directory, refusing two directories that
/// would write the same report.
fn report_paths(out: &Path, data_dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let several = data_dirs.len() > 1;
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut paths = Vec::with_capacity(data_dirs.len());
    for data_dir in data_dirs {
        let path = report_path(out, data_dir, several);
        if let Some(other) = claimed.insert(path.clone(), data_dir) {
            bail!(
                "{} and {} would both write {}; give the data directories distinct names",
                other.display(),
                data_dir.display(),
                path.display()
            );
        }
        paths.push(path);
    }
    Ok(paths)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::resolve(args.config.as_deref()).context("failed to load configuration")?;
    let data_dirs = if args.data_dir.is_empty() {
        vec![config.data_dir.clone()]
    } else {
        args.data_dir.clone()
    };
    let out = args.out.clone().unwrap_or_else(|| config.output_dir.clone());
    let paths = report_paths(&out, &data_dirs)?;
    let max_loads = config.max_concurrent_loads;
    let mut dashboard = Dashboard::new(config).context("invalid configuration")?;

    let rt = Runtime::new().context("failed to start the async runtime")?;
    for (data_dir, path) in data_dirs.iter().zip(&paths) {
        let dataset = rt
            .block_on(load_dataset_async(data_dir.clone(), max_loads))
            .with_context(|| format!("failed to load {}", data_dir.display()))?;
        let report = dashboard
            .report(&dataset)
            .with_context(|| format!("failed to derive report for {}", data_dir.display()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_vec_pretty(report.as_ref()).context("failed to serialize report")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
