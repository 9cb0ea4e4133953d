//! Users specify map and reduce functions, and the coordinator hands the
//! resulting tasks out to workers that pull them one at a time. For
//! simplicity, inputs and artifacts live on a filesystem shared by every
//! worker, unlike Hadoop or GFS.

use std::fmt;
use std::fmt::Formatter;
use std::hash::Hasher;

use serde::{Deserialize, Serialize};

pub mod codec;
pub mod layout;
pub mod protocol;

/// Stubs generated from `protos/coordinator.proto`.
pub mod rpc {
    tonic::include_proto!("coordinator");
}

/////////////////////////////////////////////////////////////////////////////
// MapReduce application types
/////////////////////////////////////////////////////////////////////////////

/// A map function takes the name of an input partition and its full
/// contents, and returns the key-value pairs it emits, in no particular
/// order.
pub type MapFn = fn(name: &str, contents: &str) -> anyhow::Result<Vec<KeyValue>>;

/// A reduce function takes in a key and every value emitted for that key
/// across the whole job. It returns the single output line's value.
pub type ReduceFn = fn(key: &str, values: &[String]) -> anyhow::Result<String>;

/// A map reduce application.
#[derive(Copy, Clone)]
pub struct Workload {
    pub map_fn: MapFn,
    pub reduce_fn: ReduceFn,
}

/////////////////////////////////////////////////////////////////////////////
// Key-value pairs
/////////////////////////////////////////////////////////////////////////////

/// A single key-value pair.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct KeyValue {
    /// The key.
    pub key: String,

    /// The value.
    pub value: String,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.value)
    }
}

impl KeyValue {
    /// Construct a new key-value pair from the given key and value.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Consumes the key-value pair and returns the key.
    #[inline]
    pub fn into_key(self) -> String {
        self.key
    }

    /// Consumes the key-value pair and returns the value.
    #[inline]
    pub fn into_value(self) -> String {
        self.value
    }
}

/// Hashes an intermediate key. The result is always non-negative when
/// viewed as an `i32`.
pub fn ihash(key: &[u8]) -> u32 {
    let mut hasher = fnv::FnvHasher::default();
    hasher.write(key);
    (hasher.finish() & 0x7fff_ffff) as u32
}

/// Compute the reduce bucket for a given key by calculating
/// `ihash(key) % n_reduce`.
pub fn bucket_for(key: &str, n_reduce: u32) -> u32 {
    ihash(key.as_bytes()) % n_reduce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihash_is_deterministic() {
        assert_eq!(ihash(b"apple"), ihash(b"apple"));
        assert_ne!(ihash(b"apple"), ihash(b"apples"));
    }

    #[test]
    fn ihash_fits_in_31_bits() {
        for key in ["", "a", "zebra", "the quick brown fox", "ünïcødé"] {
            assert!(ihash(key.as_bytes()) <= 0x7fff_ffff);
        }
    }

    #[test]
    fn buckets_stay_in_range() {
        for n in 1..8 {
            for key in ["a", "b", "c", "hello", "world", "map", "reduce"] {
                assert!(bucket_for(key, n) < n);
            }
        }
    }

    #[test]
    fn buckets_spread_keys() {
        let n = 4;
        let mut seen = [0usize; 4];
        for i in 0..400 {
            seen[bucket_for(&format!("key-{i}"), n) as usize] += 1;
        }
        assert!(seen.iter().all(|&count| count > 0), "{seen:?}");
    }

    #[test]
    fn key_value_display() {
        let kv = KeyValue::new("word", "3");
        assert_eq!(kv.to_string(), "word 3");
        assert_eq!(kv.clone().into_key(), "word");
        assert_eq!(kv.into_value(), "3");
    }
}
