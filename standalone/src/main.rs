use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Run a workload sequentially in this process", long_about = None)]
struct Args {
    /// Name of the workload to run (wc, indexer, vertex-degree, crash).
    #[arg(short, long)]
    workload: String,

    /// Where to write the merged output.
    #[arg(short, long, default_value = "mr-out-0")]
    output: PathBuf,

    /// Input files.
    #[arg(required = true)]
    inputs: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let workload = workload::try_named(&args.workload).ok_or_else(|| {
        anyhow!(
            "unknown workload `{}`, expected one of {}",
            args.workload,
            workload::NAMES.join(", ")
        )
    })?;

    let lines = standalone::run(&workload, &args.inputs)?;
    let path = standalone::write_output(&args.output, &lines)?;
    info!("Wrote {} keys to {}", lines.len(), path.display());
    Ok(())
}
