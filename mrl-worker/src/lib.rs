//! Worker side of the job: pull a task, run the user's map or reduce
//! function over the shared directory, report back, repeat.

pub mod client;
pub mod core;
pub mod map;
pub mod reduce;

pub use crate::client::{LinkError, RpcLink, TaskSource};
pub use crate::core::{run, Exit, WorkerConfig};
