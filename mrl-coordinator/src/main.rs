mod args;

use args::Args;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mrl_coordinator::{server, Job, MRCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Retrieve job configuration from command line.
    // Note: There are default values for every argument but the inputs.
    let args = Args::parse();

    let job = Job::new(args.inputs.iter().cloned(), args.n_reduce)?;
    let coordinator = MRCoordinator::new(job, args.config());

    server::serve(coordinator, &args.socket_path()).await?;
    info!("Job finished");

    Ok(())
}
