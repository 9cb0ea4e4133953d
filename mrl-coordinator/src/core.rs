use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

use common::protocol::{Completion, TaskReply};
pub use common::rpc::coordinator_server::{Coordinator, CoordinatorServer};
use common::rpc::{DoneReply, DoneRequest, TaskReply as WireTaskReply, TaskRequest};

use crate::job::{Job, Lease, Phase, Recorded, Scheduled};

/// How long a worker may hold a task before it is presumed dead.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the server keeps answering once the job is done, so workers
/// asking for work learn about it instead of finding the socket gone.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
pub struct CoordinatorConfig {
    pub task_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Everything mutated by requests and timers. Lives behind one lock.
#[derive(Debug)]
struct State {
    job: Job,

    /// Cancels the timer of each in-progress task.
    watchdogs: HashMap<Completion, CancellationToken>,
}

#[derive(Debug, Clone)]
pub struct MRCoordinator {
    state: Arc<Mutex<State>>,
    config: CoordinatorConfig,

    /// Cancelled once the job is done and the grace period has passed.
    shutdown: CancellationToken,
}

impl MRCoordinator {
    pub fn new(job: Job, config: CoordinatorConfig) -> Self {
        info!(
            "Job created with {} map tasks and {} reduce tasks",
            job.map_count(),
            job.reduce_count()
        );
        Self {
            state: Arc::new(Mutex::new(State {
                job,
                watchdogs: HashMap::new(),
            })),
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Resolves when the server should stop.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether every reduce task has completed.
    pub async fn done(&self) -> bool {
        self.state.lock().await.job.is_done()
    }

    pub async fn phase(&self) -> Phase {
        self.state.lock().await.job.phase()
    }

    /// `(maps_remaining, reduces_remaining)`.
    pub async fn remaining(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (state.job.maps_remaining(), state.job.reduces_remaining())
    }

    /// Hand out the next task, arming its timeout.
    pub async fn assign(&self) -> TaskReply {
        let mut state = self.state.lock().await;

        match state.job.assign() {
            Scheduled::Assigned { assignment, lease } => {
                info!(
                    "Assigned {} task {} (attempt {})",
                    assignment.kind(),
                    assignment.task_id,
                    lease.attempt
                );
                let token = CancellationToken::new();
                if let Some(previous) = state.watchdogs.insert(lease.task.clone(), token.clone()) {
                    previous.cancel();
                }
                self.arm_watchdog(lease, token);
                TaskReply::Assigned(assignment)
            }
            Scheduled::Wait => {
                debug!("No idle task, asking worker to wait");
                TaskReply::Wait
            }
            Scheduled::Done => TaskReply::Done,
        }
    }

    /// Record that a worker finished `completion`.
    pub async fn complete(&self, completion: Completion) -> Result<(), Status> {
        let mut state = self.state.lock().await;

        match state.job.complete(&completion) {
            Recorded::Completed { entered } => {
                if let Some(token) = state.watchdogs.remove(&completion) {
                    token.cancel();
                }
                info!(
                    "Completed {} ({} maps, {} reduces remaining)",
                    completion,
                    state.job.maps_remaining(),
                    state.job.reduces_remaining()
                );
                match entered {
                    Some(Phase::Reducing) => info!("All map tasks completed, starting reduce phase"),
                    Some(Phase::Done) => {
                        info!("All reduce tasks completed, job done");
                        self.schedule_shutdown();
                    }
                    _ => {}
                }
                Ok(())
            }
            Recorded::Duplicate => {
                debug!("Ignoring repeated completion of {}", completion);
                Ok(())
            }
            Recorded::Stale => {
                warn!("Ignoring completion of {} after its timeout", completion);
                Ok(())
            }
            Recorded::Unknown => Err(Status::invalid_argument(format!(
                "{completion} is not part of this job"
            ))),
        }
    }

    /// Revert the leased task to idle unless it completes within the timeout.
    fn arm_watchdog(&self, lease: Lease, token: CancellationToken) {
        let state = self.state.clone();
        let timeout = self.config.task_timeout;
        let deadline = Instant::now() + timeout;

        tokio::spawn(async move {
            select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => {
                    let mut state = state.lock().await;
                    if state.job.expire(&lease) {
                        state.watchdogs.remove(&lease.task);
                        warn!(
                            "{} (attempt {}) timed out after {:?}, will reassign",
                            lease.task, lease.attempt, timeout
                        );
                    }
                }
            }
        });
    }

    fn schedule_shutdown(&self) {
        let shutdown = self.shutdown.clone();
        let deadline = Instant::now() + self.config.shutdown_grace;

        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            info!("Shutting down coordinator");
            shutdown.cancel();
        });
    }
}

#[tonic::async_trait]
impl Coordinator for MRCoordinator {
    async fn request_task(
        &self,
        _request: Request<TaskRequest>,
    ) -> Result<Response<WireTaskReply>, Status> {
        let reply = self.assign().await;
        Ok(Response::new(reply.into()))
    }

    async fn notify_done(
        &self,
        request: Request<DoneRequest>,
    ) -> Result<Response<DoneReply>, Status> {
        let completion = Completion::try_from(request.into_inner())
            .map_err(|e| Status::invalid_argument(e.to_string()))?;

        self.complete(completion).await?;
        Ok(Response::new(DoneReply {}))
    }
}
