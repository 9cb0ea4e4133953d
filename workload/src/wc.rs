//! Word count: how many times each word occurs across all inputs.

use anyhow::Result;

use common::KeyValue;

/// Split `contents` into words (maximal runs of letters) and emit
/// `(word, "1")` for each occurrence.
pub fn map(_name: &str, contents: &str) -> Result<Vec<KeyValue>> {
    Ok(contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .map(|word| KeyValue::new(word, "1"))
        .collect())
}

/// The number of occurrences is the number of values.
pub fn reduce(_key: &str, values: &[String]) -> Result<String> {
    Ok(values.len().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_non_letters() {
        let kvs = map("in.txt", "Hello, world! hello\n42 world's").unwrap();
        let words = kvs.iter().map(|kv| kv.key.as_str()).collect::<Vec<_>>();
        assert_eq!(words, ["Hello", "world", "hello", "world", "s"]);
        assert!(kvs.iter().all(|kv| kv.value == "1"));
    }

    #[test]
    fn counts_values() {
        let values = vec!["1".to_string(); 3];
        assert_eq!(reduce("the", &values).unwrap(), "3");
    }
}
