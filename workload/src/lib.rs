//! MapReduce applications that workers can run, looked up by name.

use common::Workload;

pub mod crash;
pub mod indexer;
pub mod vertex_degree;
pub mod wc;

/// Names accepted by [`try_named`].
pub const NAMES: &[&str] = &["wc", "indexer", "vertex-degree", "crash"];

/// Look up a workload by the name given on the command line.
pub fn try_named(name: &str) -> Option<Workload> {
    let workload = match name {
        "wc" => Workload {
            map_fn: wc::map,
            reduce_fn: wc::reduce,
        },
        "indexer" => Workload {
            map_fn: indexer::map,
            reduce_fn: indexer::reduce,
        },
        "vertex-degree" => Workload {
            map_fn: vertex_degree::map,
            reduce_fn: vertex_degree::reduce,
        },
        "crash" => Workload {
            map_fn: crash::map,
            reduce_fn: crash::reduce,
        },
        _ => return None,
    };
    Some(workload)
}
