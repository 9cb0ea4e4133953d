//! Domain view of the coordinator protocol.
//!
//! The generated [`rpc`](crate::rpc) types model every variant as an
//! optional `oneof`; these types make the variants closed, so a message
//! missing its variant is rejected once, at the boundary.

use std::fmt;

use thiserror::Error;

use crate::rpc;
use crate::rpc::{assigned, done_request, task_reply};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A reply to `RequestTask` carried none of assigned/wait/done.
    #[error("task reply carries no status")]
    MissingStatus,

    /// A task reference named neither a map nor a reduce task.
    #[error("unknown task kind in {0}")]
    UnknownTaskKind(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Map,
    Reduce,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Map => write!(f, "map"),
            TaskKind::Reduce => write!(f, "reduce"),
        }
    }
}

/// Kind-specific payload of an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Work {
    /// Transform one input partition.
    Map { input_path: String },

    /// Aggregate `bucket` across the outputs of every listed map task.
    Reduce { bucket: u32, map_task_ids: Vec<u32> },
}

/// A task handed to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub task_id: u32,
    pub reduce_count: u32,
    pub work: Work,
}

impl Assignment {
    pub fn kind(&self) -> TaskKind {
        match self.work {
            Work::Map { .. } => TaskKind::Map,
            Work::Reduce { .. } => TaskKind::Reduce,
        }
    }

    /// The report a worker sends once this assignment is published.
    pub fn completion(&self) -> Completion {
        match &self.work {
            Work::Map { input_path } => Completion::Map {
                input_path: input_path.clone(),
            },
            Work::Reduce { bucket, .. } => Completion::Reduce { bucket: *bucket },
        }
    }
}

/// Answer to `RequestTask`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskReply {
    Assigned(Assignment),

    /// Every task of the current phase is handed out but not all are done.
    Wait,

    /// The job is finished.
    Done,
}

/// Reference to a finished task, as sent with `NotifyDone`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Completion {
    Map { input_path: String },
    Reduce { bucket: u32 },
}

impl Completion {
    pub fn kind(&self) -> TaskKind {
        match self {
            Completion::Map { .. } => TaskKind::Map,
            Completion::Reduce { .. } => TaskKind::Reduce,
        }
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Map { input_path } => write!(f, "map `{input_path}`"),
            Completion::Reduce { bucket } => write!(f, "reduce bucket {bucket}"),
        }
    }
}

/////////////////////////////////////////////////////////////////////////////
// Wire conversions
/////////////////////////////////////////////////////////////////////////////

impl From<TaskReply> for rpc::TaskReply {
    fn from(reply: TaskReply) -> Self {
        let reply = match reply {
            TaskReply::Assigned(assignment) => task_reply::Reply::Assigned(assignment.into()),
            TaskReply::Wait => task_reply::Reply::Wait(rpc::Wait {}),
            TaskReply::Done => task_reply::Reply::Done(rpc::Done {}),
        };
        rpc::TaskReply { reply: Some(reply) }
    }
}

impl TryFrom<rpc::TaskReply> for TaskReply {
    type Error = ProtocolError;

    fn try_from(reply: rpc::TaskReply) -> Result<Self, Self::Error> {
        match reply.reply.ok_or(ProtocolError::MissingStatus)? {
            task_reply::Reply::Assigned(assigned) => Ok(TaskReply::Assigned(assigned.try_into()?)),
            task_reply::Reply::Wait(_) => Ok(TaskReply::Wait),
            task_reply::Reply::Done(_) => Ok(TaskReply::Done),
        }
    }
}

impl From<Assignment> for rpc::Assigned {
    fn from(assignment: Assignment) -> Self {
        let task = match assignment.work {
            Work::Map { input_path } => assigned::Task::Map(rpc::MapTask { input_path }),
            Work::Reduce {
                bucket,
                map_task_ids,
            } => assigned::Task::Reduce(rpc::ReduceTask {
                bucket,
                map_task_ids,
            }),
        };
        rpc::Assigned {
            task_id: assignment.task_id,
            reduce_count: assignment.reduce_count,
            task: Some(task),
        }
    }
}

impl TryFrom<rpc::Assigned> for Assignment {
    type Error = ProtocolError;

    fn try_from(assigned: rpc::Assigned) -> Result<Self, Self::Error> {
        let work = match assigned
            .task
            .ok_or(ProtocolError::UnknownTaskKind("assignment"))?
        {
            assigned::Task::Map(map) => Work::Map {
                input_path: map.input_path,
            },
            assigned::Task::Reduce(reduce) => Work::Reduce {
                bucket: reduce.bucket,
                map_task_ids: reduce.map_task_ids,
            },
        };
        Ok(Assignment {
            task_id: assigned.task_id,
            reduce_count: assigned.reduce_count,
            work,
        })
    }
}

impl From<Completion> for rpc::DoneRequest {
    fn from(completion: Completion) -> Self {
        let task = match completion {
            Completion::Map { input_path } => done_request::Task::Map(rpc::MapDone { input_path }),
            Completion::Reduce { bucket } => done_request::Task::Reduce(rpc::ReduceDone { bucket }),
        };
        rpc::DoneRequest { task: Some(task) }
    }
}

impl TryFrom<rpc::DoneRequest> for Completion {
    type Error = ProtocolError;

    fn try_from(request: rpc::DoneRequest) -> Result<Self, Self::Error> {
        match request
            .task
            .ok_or(ProtocolError::UnknownTaskKind("completion"))?
        {
            done_request::Task::Map(map) => Ok(Completion::Map {
                input_path: map.input_path,
            }),
            done_request::Task::Reduce(reduce) => Ok(Completion::Reduce {
                bucket: reduce.bucket,
            }),
        }
    }
}
