use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use common::layout;
use mrl_worker::WorkerConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Name of the workload to run (wc, indexer, vertex-degree, crash).
    #[arg(short, long)]
    pub workload: String,

    /// Socket of the coordinator. Defaults to a per-user path under /var/tmp.
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Directory shared by all workers where artifacts are written.
    #[arg(short = 'd', long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Milliseconds to sleep when the coordinator has nothing to hand out.
    #[arg(short, long, default_value = "1000")]
    pub backoff_ms: u64,
}

impl Args {
    pub fn socket_path(&self) -> PathBuf {
        self.socket
            .clone()
            .unwrap_or_else(layout::default_socket_path)
    }

    pub fn config(&self) -> WorkerConfig {
        WorkerConfig {
            work_dir: self.work_dir.clone(),
            backoff: Duration::from_millis(self.backoff_ms),
        }
    }
}
