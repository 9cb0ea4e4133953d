use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error, info, warn};

use common::protocol::{Assignment, TaskReply, Work};
use common::Workload;

use crate::client::{LinkError, TaskSource};
use crate::{map, reduce};

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Shared directory inputs are resolved against and artifacts land in.
    pub work_dir: PathBuf,

    /// How long to sleep after being told to wait.
    pub backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Why the worker loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The coordinator reported the job finished.
    JobDone,

    /// The coordinator could not be reached. It is assumed to have exited
    /// after finishing the job.
    CoordinatorGone,
}

/// Pull tasks from `source` and execute them one at a time until the job is
/// done or the coordinator goes away.
///
/// A task that fails locally is not reported; the coordinator hands it out
/// again once its lease runs out. A reply this worker cannot decode is
/// skipped the same way.
pub async fn run<S: TaskSource>(
    source: &mut S,
    workload: Workload,
    config: &WorkerConfig,
) -> Result<Exit> {
    loop {
        let assignment = match source.request_task().await {
            Ok(TaskReply::Assigned(assignment)) => assignment,
            Ok(TaskReply::Wait) => {
                debug!("No task available, retrying in {:?}", config.backoff);
                tokio::time::sleep(config.backoff).await;
                continue;
            }
            Ok(TaskReply::Done) => {
                info!("Coordinator reports the job is done");
                return Ok(Exit::JobDone);
            }
            Err(LinkError::Protocol(err)) => {
                error!("Malformed reply from coordinator: {err}");
                tokio::time::sleep(config.backoff).await;
                continue;
            }
            Err(err) => {
                info!("Lost contact with coordinator ({err}), exiting");
                return Ok(Exit::CoordinatorGone);
            }
        };

        let completion = assignment.completion();
        let task_id = assignment.task_id;
        let work_dir = config.work_dir.clone();

        let outcome =
            tokio::task::spawn_blocking(move || execute(&assignment, &workload, &work_dir)).await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!("Task {task_id} ({completion}) failed: {err:#}");
                continue;
            }
            Err(err) => {
                error!("Task {task_id} ({completion}) panicked: {err}");
                continue;
            }
        }

        if let Err(err) = source.notify_done(completion.clone()).await {
            warn!("Could not report {completion} as done: {err}");
        }
    }
}

/// Execute one assignment synchronously.
pub fn execute(assignment: &Assignment, workload: &Workload, work_dir: &Path) -> Result<()> {
    match &assignment.work {
        Work::Map { input_path } => {
            map::perform_map(
                assignment.task_id,
                input_path,
                assignment.reduce_count,
                workload,
                work_dir,
            )?;
        }
        Work::Reduce {
            bucket,
            map_task_ids,
        } => {
            reduce::perform_reduce(*bucket, map_task_ids, workload, work_dir)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::protocol::{Completion, ProtocolError};
    use std::collections::VecDeque;
    use std::fs;

    /// Replays a fixed sequence of replies and records every completion.
    struct Scripted {
        replies: VecDeque<Result<TaskReply, LinkError>>,
        reported: Vec<Completion>,
        refuse_reports: bool,
    }

    impl Scripted {
        fn new(replies: Vec<Result<TaskReply, LinkError>>) -> Self {
            Self {
                replies: replies.into(),
                reported: Vec::new(),
                refuse_reports: false,
            }
        }
    }

    #[tonic::async_trait]
    impl TaskSource for Scripted {
        async fn request_task(&mut self) -> Result<TaskReply, LinkError> {
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(tonic::Status::unavailable("script exhausted").into()))
        }

        async fn notify_done(&mut self, completion: Completion) -> Result<(), LinkError> {
            if self.refuse_reports {
                return Err(tonic::Status::unavailable("gone").into());
            }
            self.reported.push(completion);
            Ok(())
        }
    }

    fn wc() -> Workload {
        workload::try_named("wc").unwrap()
    }

    fn config(dir: &Path) -> WorkerConfig {
        WorkerConfig {
            work_dir: dir.to_path_buf(),
            backoff: Duration::from_millis(500),
        }
    }

    fn map_task(task_id: u32, input_path: &str, reduce_count: u32) -> TaskReply {
        TaskReply::Assigned(Assignment {
            task_id,
            reduce_count,
            work: Work::Map {
                input_path: input_path.into(),
            },
        })
    }

    fn reduce_task(task_id: u32, bucket: u32, map_task_ids: Vec<u32>) -> TaskReply {
        TaskReply::Assigned(Assignment {
            task_id,
            reduce_count: 1,
            work: Work::Reduce {
                bucket,
                map_task_ids,
            },
        })
    }

    #[tokio::test]
    async fn runs_map_then_reduce_and_reports_both() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in.txt"), "one two two").unwrap();

        let mut source = Scripted::new(vec![
            Ok(map_task(0, "in.txt", 1)),
            Ok(reduce_task(1, 0, vec![0])),
            Ok(TaskReply::Done),
        ]);
        let exit = run(&mut source, wc(), &config(dir.path())).await.unwrap();

        assert_eq!(exit, Exit::JobDone);
        assert_eq!(
            source.reported,
            vec![
                Completion::Map {
                    input_path: "in.txt".into()
                },
                Completion::Reduce { bucket: 0 },
            ]
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("mr-out-0")).unwrap(),
            "one 1\ntwo 2\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_backoff_before_asking_again() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Scripted::new(vec![
            Ok(TaskReply::Wait),
            Ok(TaskReply::Wait),
            Ok(TaskReply::Done),
        ]);

        let started = tokio::time::Instant::now();
        let exit = run(&mut source, wc(), &config(dir.path())).await.unwrap();

        assert_eq!(exit, Exit::JobDone);
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert!(source.reported.is_empty());
    }

    #[tokio::test]
    async fn failed_task_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Scripted::new(vec![
            Ok(map_task(0, "missing.txt", 2)),
            Ok(TaskReply::Done),
        ]);

        let exit = run(&mut source, wc(), &config(dir.path())).await.unwrap();

        assert_eq!(exit, Exit::JobDone);
        assert!(source.reported.is_empty());
    }

    #[tokio::test]
    async fn unreachable_coordinator_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = Scripted::new(vec![]);

        let exit = run(&mut source, wc(), &config(dir.path())).await.unwrap();
        assert_eq!(exit, Exit::CoordinatorGone);
    }

    #[tokio::test]
    async fn failed_report_keeps_the_worker_going() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in.txt"), "x").unwrap();

        let mut source = Scripted::new(vec![Ok(map_task(0, "in.txt", 1)), Ok(TaskReply::Done)]);
        source.refuse_reports = true;

        let exit = run(&mut source, wc(), &config(dir.path())).await.unwrap();
        assert_eq!(exit, Exit::JobDone);
        assert!(dir.path().join("mr-0-0").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_reply_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("in.txt"), "x").unwrap();
        let mut source = Scripted::new(vec![
            Err(ProtocolError::UnknownTaskKind("assignment").into()),
            Err(ProtocolError::MissingStatus.into()),
            Ok(map_task(0, "in.txt", 1)),
            Ok(TaskReply::Done),
        ]);

        let started = tokio::time::Instant::now();
        let exit = run(&mut source, wc(), &config(dir.path())).await.unwrap();

        assert_eq!(exit, Exit::JobDone);
        assert!(source.replies.is_empty());
        assert!(started.elapsed() >= Duration::from_millis(1000));
        assert_eq!(
            source.reported,
            vec![Completion::Map {
                input_path: "in.txt".into()
            }]
        );
    }
}
