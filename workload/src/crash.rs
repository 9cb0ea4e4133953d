//! An application that misbehaves on purpose.
//!
//! Some calls kill the worker process outright, some stall it for longer
//! than the coordinator's task timeout, the rest return normally. The
//! output itself is deterministic, so a job run with this workload checks
//! that dead and slow workers are recovered from without changing the
//! result.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use tracing::warn;

use common::KeyValue;

/// Out of 1000 calls, how many exit the process.
const CRASH_PER_MILLE: u32 = 330;

/// Out of 1000 calls, how many stall first.
const STALL_PER_MILLE: u32 = 330;

const MAX_STALL: Duration = Duration::from_secs(12);

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

fn maybe_misbehave() {
    let mut rng = rand::thread_rng();
    let roll = rng.gen_range(0..1000);
    if roll < CRASH_PER_MILLE {
        warn!("crash workload: exiting");
        std::process::exit(1);
    } else if roll < CRASH_PER_MILLE + STALL_PER_MILLE {
        let stall = Duration::from_millis(rng.gen_range(0..MAX_STALL.as_millis() as u64));
        warn!("crash workload: stalling for {:?}", stall);
        std::thread::sleep(stall);
    }
}

/// Emit a handful of fixed keys, each tagged with the input it came from.
pub fn map(name: &str, contents: &str) -> Result<Vec<KeyValue>> {
    maybe_misbehave();
    Ok(emit(name, contents))
}

pub fn reduce(_key: &str, values: &[String]) -> Result<String> {
    maybe_misbehave();
    Ok(collate(values))
}

fn emit(name: &str, contents: &str) -> Vec<KeyValue> {
    KEYS.iter()
        .map(|key| KeyValue::new(*key, format!("{name}:{}", contents.len())))
        .collect()
}

fn collate(values: &[String]) -> String {
    values
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_every_key_once() {
        let kvs = emit("in-1", "hello");
        assert_eq!(kvs.len(), KEYS.len());
        assert!(kvs.iter().all(|kv| kv.value == "in-1:5"));
    }

    #[test]
    fn collate_is_order_independent() {
        let forward = ["x:1", "y:2", "x:1"].map(String::from);
        let backward = ["y:2", "x:1"].map(String::from);
        assert_eq!(collate(&forward), "x:1 y:2");
        assert_eq!(collate(&forward), collate(&backward));
    }
}
