//! Inverted index: for each word, the inputs it appears in.

use std::collections::BTreeSet;

use anyhow::Result;

use common::KeyValue;

/// Emit `(word, name)` once per distinct word of the input.
pub fn map(name: &str, contents: &str) -> Result<Vec<KeyValue>> {
    let words = contents
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty())
        .collect::<BTreeSet<_>>();

    Ok(words
        .into_iter()
        .map(|word| KeyValue::new(word, name))
        .collect())
}

/// `<count> <name>,<name>,...` with the names sorted and deduplicated.
pub fn reduce(_key: &str, values: &[String]) -> Result<String> {
    let documents = values.iter().map(String::as_str).collect::<BTreeSet<_>>();
    let listing = documents.iter().copied().collect::<Vec<_>>().join(",");
    Ok(format!("{} {}", documents.len(), listing))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_emitted_once_per_document() {
        let kvs = map("a.txt", "cat dog cat").unwrap();
        assert_eq!(
            kvs,
            vec![KeyValue::new("cat", "a.txt"), KeyValue::new("dog", "a.txt")]
        );
    }

    #[test]
    fn documents_are_sorted() {
        let values = ["b.txt", "a.txt", "b.txt"].map(String::from);
        assert_eq!(reduce("cat", &values).unwrap(), "2 a.txt,b.txt");
    }
}
