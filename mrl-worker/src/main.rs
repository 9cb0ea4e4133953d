use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mrl_worker::{Exit, RpcLink};

mod args;
use args::Args;

#[tokio::main]
async fn main() -> Result<()> {
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

    let socket = args.socket_path();
    let mut link = match RpcLink::connect(&socket).await {
        Ok(link) => link,
        Err(err) => {
            warn!("Coordinator at {} is unreachable: {err}", socket.display());
            return Ok(());
        }
    };
    info!("Worker connected to {}", socket.display());

    match mrl_worker::run(&mut link, workload, &args.config()).await? {
        Exit::JobDone => info!("Job finished, worker exiting"),
        Exit::CoordinatorGone => info!("Coordinator went away, worker exiting"),
    }
    Ok(())
}
