use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use common::codec::read_records;
use common::{layout, Workload};

/// Collect every value emitted for `bucket` by the listed map tasks,
/// grouped by key in ascending key order.
pub fn gather(
    bucket: u32,
    map_task_ids: &[u32],
    work_dir: &Path,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for &map_task in map_task_ids {
        let name = layout::intermediate_name(map_task, bucket);
        let file = File::open(work_dir.join(&name))
            .with_context(|| format!("opening intermediate artifact `{name}`"))?;

        for record in read_records(file) {
            let kv = record.with_context(|| format!("decoding `{name}`"))?;
            groups.entry(kv.key).or_default().push(kv.value);
        }
    }

    Ok(groups)
}

/// Run the reduce task for `bucket` and publish `mr-out-<bucket>`.
///
/// Every key is reduced before anything is written, so a failing reduce
/// function leaves no output behind.
pub fn perform_reduce(
    bucket: u32,
    map_task_ids: &[u32],
    workload: &Workload,
    work_dir: &Path,
) -> Result<PathBuf> {
    info!(
        "Starting reduce task for bucket {bucket} over {} map outputs",
        map_task_ids.len()
    );

    let groups = gather(bucket, map_task_ids, work_dir)?;

    let mut lines = Vec::with_capacity(groups.len());
    for (key, values) in &groups {
        let result = (workload.reduce_fn)(key, values)
            .with_context(|| format!("reduce function failed on key `{key}`"))?;
        lines.push((key, result));
    }

    let name = layout::output_name(bucket);
    let path = layout::publish(work_dir, &name, |w| {
        for (key, result) in &lines {
            writeln!(w, "{key} {result}")?;
        }
        Ok(())
    })
    .with_context(|| format!("writing output `{name}`"))?;

    info!("Reduce task for bucket {bucket} wrote {} keys", lines.len());
    Ok(path)
}
