use std::collections::HashMap;

use anyhow::{bail, Result};

use common::protocol::{Assignment, Completion, TaskKind, Work};

pub type TaskId = u32;

/// Status of a single task.
///
/// Moves `Idle -> InProgress -> Completed`; the only way back is
/// `InProgress -> Idle`, when the assignment's timeout expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting to be handed out.
    Idle,

    /// Handed out, no completion seen yet.
    InProgress,

    /// Terminal.
    Completed,
}

/// State of the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Map tasks outstanding.
    Mapping,

    /// Every map task completed, reduce tasks outstanding.
    Reducing,

    /// Job completed.
    Done,
}

#[derive(Debug)]
struct Task {
    id: TaskId,
    status: TaskStatus,

    /// Number of times the task has been handed out.
    attempt: u32,
}

impl Task {
    fn new(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Idle,
            attempt: 0,
        }
    }
}

/// Proof of one particular hand-out of a task, used to expire exactly that
/// hand-out and no later one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub task: Completion,
    pub attempt: u32,
}

/// Outcome of [`Job::assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scheduled {
    Assigned { assignment: Assignment, lease: Lease },

    /// Everything in the current phase is handed out; ask again later.
    Wait,

    Done,
}

/// Outcome of [`Job::complete`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recorded {
    /// First completion of the task. Carries the phase the job entered
    /// because of it, if any.
    Completed { entered: Option<Phase> },

    /// The task was already completed.
    Duplicate,

    /// The task is idle again after a timeout and will be handed out anew.
    Stale,

    /// No such task in this job.
    Unknown,
}

/// The task registry of a single MapReduce run.
#[derive(Debug)]
pub struct Job {
    /// Map tasks keyed by input path.
    map_tasks: HashMap<String, Task>,

    /// Reduce tasks keyed by bucket.
    reduce_tasks: HashMap<u32, Task>,

    /// Ids of every map task, ascending. Sent with each reduce assignment.
    map_task_ids: Vec<TaskId>,

    reduce_count: u32,
    maps_remaining: usize,
    reduces_remaining: usize,
    phase: Phase,
}

impl Job {
    /// One map task per distinct input, in input order, and `reduce_count`
    /// reduce tasks.
    pub fn new<I, S>(inputs: I, reduce_count: u32) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if reduce_count == 0 {
            bail!("a job needs at least one reducer");
        }

        let mut map_tasks = HashMap::new();
        for input in inputs {
            let next_id = map_tasks.len() as TaskId;
            map_tasks
                .entry(input.into())
                .or_insert_with(|| Task::new(next_id));
        }
        if map_tasks.is_empty() {
            bail!("a job needs at least one input");
        }

        let mut map_task_ids = map_tasks.values().map(|task| task.id).collect::<Vec<_>>();
        map_task_ids.sort_unstable();

        // Reduce task ids continue after the map task ids.
        let reduce_tasks = (0..reduce_count)
            .map(|bucket| (bucket, Task::new(map_task_ids.len() as TaskId + bucket)))
            .collect::<HashMap<_, _>>();

        Ok(Self {
            maps_remaining: map_tasks.len(),
            reduces_remaining: reduce_tasks.len(),
            map_tasks,
            reduce_tasks,
            map_task_ids,
            reduce_count,
            phase: Phase::Mapping,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn reduce_count(&self) -> u32 {
        self.reduce_count
    }

    pub fn map_count(&self) -> usize {
        self.map_tasks.len()
    }

    pub fn maps_remaining(&self) -> usize {
        self.maps_remaining
    }

    pub fn reduces_remaining(&self) -> usize {
        self.reduces_remaining
    }

    pub fn map_task_ids(&self) -> &[TaskId] {
        &self.map_task_ids
    }

    pub fn status(&self, task: &Completion) -> Option<TaskStatus> {
        self.task(task).map(|task| task.status)
    }

    fn task(&self, task: &Completion) -> Option<&Task> {
        match task {
            Completion::Map { input_path } => self.map_tasks.get(input_path),
            Completion::Reduce { bucket } => self.reduce_tasks.get(bucket),
        }
    }

    fn task_mut(&mut self, task: &Completion) -> Option<&mut Task> {
        match task {
            Completion::Map { input_path } => self.map_tasks.get_mut(input_path),
            Completion::Reduce { bucket } => self.reduce_tasks.get_mut(bucket),
        }
    }

    /// Hand out an idle task of the current phase.
    ///
    /// No reduce task is handed out while any map task is not completed.
    pub fn assign(&mut self) -> Scheduled {
        if self.maps_remaining > 0 {
            let idle = self
                .map_tasks
                .iter_mut()
                .find(|(_, task)| task.status == TaskStatus::Idle);

            return match idle {
                Some((input_path, task)) => {
                    task.status = TaskStatus::InProgress;
                    task.attempt += 1;
                    Scheduled::Assigned {
                        assignment: Assignment {
                            task_id: task.id,
                            reduce_count: self.reduce_count,
                            work: Work::Map {
                                input_path: input_path.clone(),
                            },
                        },
                        lease: Lease {
                            task: Completion::Map {
                                input_path: input_path.clone(),
                            },
                            attempt: task.attempt,
                        },
                    }
                }
                None => Scheduled::Wait,
            };
        }

        if self.reduces_remaining > 0 {
            let idle = self
                .reduce_tasks
                .iter_mut()
                .find(|(_, task)| task.status == TaskStatus::Idle);

            return match idle {
                Some((&bucket, task)) => {
                    task.status = TaskStatus::InProgress;
                    task.attempt += 1;
                    Scheduled::Assigned {
                        assignment: Assignment {
                            task_id: task.id,
                            reduce_count: self.reduce_count,
                            work: Work::Reduce {
                                bucket,
                                map_task_ids: self.map_task_ids.clone(),
                            },
                        },
                        lease: Lease {
                            task: Completion::Reduce { bucket },
                            attempt: task.attempt,
                        },
                    }
                }
                None => Scheduled::Wait,
            };
        }

        Scheduled::Done
    }

    /// Record a completion notification.
    ///
    /// Only the first notification for an in-progress task counts; the rest
    /// leave the registry untouched.
    pub fn complete(&mut self, completion: &Completion) -> Recorded {
        let Some(task) = self.task_mut(completion) else {
            return Recorded::Unknown;
        };

        match task.status {
            TaskStatus::Completed => return Recorded::Duplicate,
            TaskStatus::Idle => return Recorded::Stale,
            TaskStatus::InProgress => task.status = TaskStatus::Completed,
        }

        let entered = match completion.kind() {
            TaskKind::Map => {
                self.maps_remaining -= 1;
                (self.maps_remaining == 0 && self.phase == Phase::Mapping).then(|| {
                    self.phase = Phase::Reducing;
                    Phase::Reducing
                })
            }
            TaskKind::Reduce => {
                self.reduces_remaining -= 1;
                (self.reduces_remaining == 0 && self.phase == Phase::Reducing).then(|| {
                    self.phase = Phase::Done;
                    Phase::Done
                })
            }
        };

        Recorded::Completed { entered }
    }

    /// Put the task back to idle if `lease` is still its current, unfinished
    /// hand-out. Returns whether it did.
    pub fn expire(&mut self, lease: &Lease) -> bool {
        match self.task_mut(&lease.task) {
            Some(task) if task.status == TaskStatus::InProgress && task.attempt == lease.attempt => {
                task.status = TaskStatus::Idle;
                true
            }
            _ => false,
        }
    }
}
