//! The coordinator of a MapReduce job: owns the task registry, answers
//! worker requests and reclaims tasks from workers that go quiet.

pub mod core;
pub mod job;
pub mod server;

pub use crate::core::{CoordinatorConfig, MRCoordinator};
pub use crate::job::{Job, Phase};
