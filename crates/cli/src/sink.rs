//! NDJSON (newline-delimited JSON) output.
//!
//! ```ignore
//! let mut sink = JsonStreamSink::stdout();
//! sink.write_rows(&listings)?;
//! let n = sink.finish()?;
//! ```

use serde::Serialize;
use std::io::{self, BufWriter, Write};

/// Serializes each row straight into a buffered writer, one per line.
pub struct JsonStreamSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl JsonStreamSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonStreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
            rows_written: 0,
        }
    }

    pub fn write_row<T: Serialize>(&mut self, row: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        self.writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }

    pub fn write_rows<T: Serialize>(&mut self, rows: &[T]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_core::{DashboardStats, Property};

    #[test]
    fn one_line_per_row() {
        let mut buf = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buf);

        let listings: Vec<Property> = serde_json::from_value(serde_json::json!([
            { "_id": "p1", "title": "Loft", "status": "For Rent" },
            { "id": "p2", "address": "12 MG Road" }
        ]))
        .unwrap();
        sink.write_rows(&listings).unwrap();
        sink.write_row(&DashboardStats::default()).unwrap();
        assert_eq!(sink.finish().unwrap(), 3);

        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "p1");
        assert_eq!(first["status"], "For Rent");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["address"]["line1"], "12 MG Road");
        assert!(lines[2].contains("\"totalProperties\":0"));
    }
}
