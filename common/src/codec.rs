//! Encoding of intermediate artifacts.
//!
//! An artifact is a stream of JSON objects, one [`KeyValue`] per line.
//! Records are written one at a time through [`RecordWriter`] and read back
//! lazily with [`read_records`], in the order they were written.

use std::io::{self, BufReader, Read, Write};

use crate::KeyValue;

/// Streaming encoder for intermediate records.
pub struct RecordWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Append one record to the stream.
    pub fn write(&mut self, kv: &KeyValue) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, kv)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Decode every record from `reader`.
pub fn read_records<R: Read>(reader: R) -> impl Iterator<Item = io::Result<KeyValue>> {
    serde_json::Deserializer::from_reader(BufReader::new(reader))
        .into_iter::<KeyValue>()
        .map(|record| record.map_err(io::Error::from))
}
