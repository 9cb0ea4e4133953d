//! Naming of everything a job leaves on disk, plus the coordinator endpoint.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Prefix of the unique scratch files artifacts are staged in.
pub const TEMP_PREFIX: &str = ".mr-tmp-";

/// Intermediate artifact written by map task `map_task` for `bucket`.
pub fn intermediate_name(map_task: u32, bucket: u32) -> String {
    format!("mr-{map_task}-{bucket}")
}

/// Final output of the reducer owning `bucket`.
pub fn output_name(bucket: u32) -> String {
    format!("mr-out-{bucket}")
}

/// Well-known socket the coordinator listens on, scoped to the invoking user.
pub fn default_socket_path() -> PathBuf {
    PathBuf::from(format!("/var/tmp/mrl-coordinator-{}", whoami::username()))
}

/// Write an artifact under `dir/name` so that it becomes visible all at once.
///
/// `fill` writes into a scratch file in `dir`; only after it returns and the
/// data is flushed to disk is the scratch file renamed over `name`. If `fill`
/// fails the scratch file is removed and any previous artifact is left as is.
pub fn publish<F>(dir: &Path, name: &str, fill: F) -> io::Result<PathBuf>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let mut scratch = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)?;

    {
        let mut writer = BufWriter::new(scratch.as_file_mut());
        fill(&mut writer)?;
        writer.flush()?;
    }
    scratch.as_file().sync_all()?;

    let target = dir.join(name);
    scratch.persist(&target).map_err(|e| e.error)?;
    Ok(target)
}
