//! Whole jobs run through a real coordinator on a Unix socket, with
//! workers in this process. Outputs are checked against a sequential run.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;

use common::protocol::TaskReply;
use common::{bucket_for, layout};
use mrl_coordinator::{server, CoordinatorConfig, Job, MRCoordinator};
use mrl_worker::{Exit, RpcLink, TaskSource, WorkerConfig};

const TEXTS: &[(&str, &str)] = &[
    ("pg-being_ernest.txt", "The truth is rarely pure and never simple."),
    ("pg-dorian_gray.txt", "The only way to get rid of a temptation is to yield to it."),
    ("pg-metamorphosis.txt", "As Gregor Samsa awoke one morning from uneasy dreams"),
];

fn write_inputs(dir: &Path) -> Vec<String> {
    TEXTS
        .iter()
        .map(|(name, text)| {
            let path = dir.join(name);
            fs::write(&path, text.repeat(20)).unwrap();
            path.to_string_lossy().into_owned()
        })
        .collect()
}

async fn start_coordinator(
    inputs: &[String],
    n_reduce: u32,
    task_timeout: Duration,
    socket: &Path,
) -> JoinHandle<anyhow::Result<()>> {
    let job = Job::new(inputs.iter().cloned(), n_reduce).unwrap();
    let config = CoordinatorConfig {
        task_timeout,
        shutdown_grace: Duration::from_millis(300),
    };
    let coordinator = MRCoordinator::new(job, config);

    let socket_path = socket.to_path_buf();
    let handle = tokio::spawn(async move { server::serve(coordinator, &socket_path).await });

    for _ in 0..200 {
        if socket.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(socket.exists(), "coordinator never bound its socket");
    handle
}

fn spawn_worker(name: &str, socket: PathBuf, work_dir: PathBuf) -> JoinHandle<Exit> {
    let workload = workload::try_named(name).unwrap();
    tokio::spawn(async move {
        let mut link = RpcLink::connect(&socket).await.unwrap();
        let config = WorkerConfig {
            work_dir,
            backoff: Duration::from_millis(50),
        };
        mrl_worker::run(&mut link, workload, &config).await.unwrap()
    })
}

/// Read every `mr-out-*` file, checking each key sits in its own bucket,
/// and merge them in key order.
fn collect_outputs(dir: &Path, n_reduce: u32) -> Vec<(String, String)> {
    let mut merged = Vec::new();
    for bucket in 0..n_reduce {
        let contents = fs::read_to_string(dir.join(layout::output_name(bucket))).unwrap();
        for line in contents.lines() {
            let (key, result) = line.split_once(' ').unwrap();
            assert_eq!(bucket_for(key, n_reduce), bucket, "`{key}` in wrong bucket");
            merged.push((key.to_string(), result.to_string()));
        }
    }
    merged.sort();
    merged
}

fn leftover_scratch_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(layout::TEMP_PREFIX))
        .count()
}

async fn run_job(workload_name: &str, n_workers: usize, n_reduce: u32) {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path());
    let socket = dir.path().join("coordinator.sock");

    let server = start_coordinator(&inputs, n_reduce, Duration::from_secs(10), &socket).await;
    let workers = (0..n_workers)
        .map(|_| spawn_worker(workload_name, socket.clone(), dir.path().to_path_buf()))
        .collect::<Vec<_>>();

    for worker in workers {
        worker.await.unwrap();
    }
    server.await.unwrap().unwrap();

    let expected = standalone::run(&workload::try_named(workload_name).unwrap(), &inputs).unwrap();
    assert_eq!(collect_outputs(dir.path(), n_reduce), expected);
    assert_eq!(leftover_scratch_files(dir.path()), 0);
    assert!(!socket.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn word_count_matches_sequential_run() {
    run_job("wc", 3, 2).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn indexer_matches_sequential_run() {
    run_job("indexer", 2, 5).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn single_reducer_single_worker() {
    run_job("wc", 1, 1).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn abandoned_task_is_reassigned() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = write_inputs(dir.path());
    let socket = dir.path().join("coordinator.sock");
    let n_reduce = 3;

    let server = start_coordinator(&inputs, n_reduce, Duration::from_secs(1), &socket).await;

    // Take a task and vanish without reporting it.
    let mut dead = RpcLink::connect(&socket).await.unwrap();
    let abandoned = dead.request_task().await.unwrap();
    assert!(matches!(abandoned, TaskReply::Assigned(_)));
    drop(dead);

    let exit = spawn_worker("wc", socket.clone(), dir.path().to_path_buf())
        .await
        .unwrap();
    assert!(matches!(exit, Exit::JobDone | Exit::CoordinatorGone));
    server.await.unwrap().unwrap();

    let expected = standalone::run(&workload::try_named("wc").unwrap(), &inputs).unwrap();
    assert_eq!(collect_outputs(dir.path(), n_reduce), expected);
}
