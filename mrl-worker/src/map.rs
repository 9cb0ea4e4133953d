use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use common::codec::RecordWriter;
use common::{bucket_for, layout, KeyValue, Workload};

/// Split `kvs` into `reduce_count` buckets by key hash. Every bucket is
/// present in the result, empty or not.
pub fn partition(kvs: Vec<KeyValue>, reduce_count: u32) -> Vec<Vec<KeyValue>> {
    let mut buckets = vec![Vec::new(); reduce_count as usize];
    for kv in kvs {
        let bucket = bucket_for(&kv.key, reduce_count) as usize;
        buckets[bucket].push(kv);
    }
    buckets
}

/// Run map task `task_id` over `input_path`, publishing one intermediate
/// artifact per bucket into `work_dir`. A relative `input_path` is resolved
/// against `work_dir`, but the map function sees it as given.
pub fn perform_map(
    task_id: u32,
    input_path: &str,
    reduce_count: u32,
    workload: &Workload,
    work_dir: &Path,
) -> Result<Vec<PathBuf>> {
    info!("Starting map task {task_id} over `{input_path}`");

    // Inputs are not required to be UTF-8.
    let bytes = fs::read(work_dir.join(input_path))
        .with_context(|| format!("reading input `{input_path}`"))?;
    let contents = String::from_utf8_lossy(&bytes);

    let kvs = (workload.map_fn)(input_path, &contents)
        .with_context(|| format!("map function failed on `{input_path}`"))?;

    let mut emitted = 0;

    let mut artifacts = Vec::with_capacity(reduce_count as usize);
    for (bucket, records) in partition(kvs, reduce_count).iter().enumerate() {
        let name = layout::intermediate_name(task_id, bucket as u32);
        let path = layout::publish(work_dir, &name, |w| {
            let mut writer = RecordWriter::new(w);
            for kv in records {
                writer.write(kv)?;
            }
            emitted += writer.written();
            writer.finish().map(|_| ())
        })
        .with_context(|| format!("writing intermediate artifact `{name}`"))?;
        artifacts.push(path);
    }

    info!("Map task {task_id} emitted {emitted} records into {reduce_count} buckets");
    Ok(artifacts)
}
