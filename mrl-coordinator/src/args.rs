use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use common::layout;
use mrl_coordinator::CoordinatorConfig;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Input files, one map task each.
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Number of reduce tasks (and output files).
    #[arg(short, long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..))]
    pub n_reduce: u32,

    /// Socket to listen on. Defaults to a per-user path under /var/tmp.
    #[arg(short, long)]
    pub socket: Option<PathBuf>,

    /// Seconds a worker may hold a task before it is handed to someone else.
    #[arg(short, long, default_value = "10")]
    pub task_timeout: u64,

    /// Seconds to keep serving after the job is done.
    #[arg(long, default_value = "3")]
    pub shutdown_grace: u64,
}

impl Args {
    pub fn socket_path(&self) -> PathBuf {
        self.socket
            .clone()
            .unwrap_or_else(layout::default_socket_path)
    }

    pub fn config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            task_timeout: Duration::from_secs(self.task_timeout),
            shutdown_grace: Duration::from_secs(self.shutdown_grace),
        }
    }
}
