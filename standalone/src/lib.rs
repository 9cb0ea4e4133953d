//! Runs a workload over its inputs in a single process, without a
//! coordinator. The output is what a distributed run produces, merged
//! across buckets, which makes it the reference for checking one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use itertools::Itertools;
use tracing::info;

use common::{layout, Workload};

/// Map every input, group the emitted values by key and reduce each group.
/// The result is sorted by key.
pub fn run(workload: &Workload, inputs: &[String]) -> Result<Vec<(String, String)>> {
    let mut emitted = Vec::new();
    for input in inputs.iter().unique() {
        let bytes = fs::read(input).with_context(|| format!("reading input `{input}`"))?;
        let contents = String::from_utf8_lossy(&bytes);
        let kvs = (workload.map_fn)(input, &contents)
            .with_context(|| format!("map function failed on `{input}`"))?;
        emitted.extend(kvs.into_iter().map(|kv| (kv.key, kv.value)));
    }
    info!("Mapped {} inputs into {} records", inputs.len(), emitted.len());

    emitted
        .into_iter()
        .into_group_map()
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(key, values)| {
            let result = (workload.reduce_fn)(&key, &values)
                .with_context(|| format!("reduce function failed on key `{key}`"))?;
            Ok::<_, anyhow::Error>((key, result))
        })
        .collect()
}

/// Write `lines` to `path` as `key result` lines.
pub fn write_output(path: &Path, lines: &[(String, String)]) -> Result<PathBuf> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .with_context(|| format!("`{}` does not name a file", path.display()))?
        .to_string_lossy();

    let written = layout::publish(dir, &name, |w| {
        for (key, result) in lines {
            writeln!(w, "{key} {result}")?;
        }
        Ok(())
    })
    .with_context(|| format!("writing `{}`", path.display()))?;
    Ok(written)
}
