use anyhow::{Context, Result};
use common::{FrameSink, PoseFrame, PoseSource};
use log::warn;
use std::io::{BufRead, Write};

/// Reads one JSON frame per line. Blank lines are skipped, unparsable lines are
/// logged and dropped.
pub struct NdjsonSource<R> {
    reader: R,
    line: String,
    line_number: u64,
}

impl<R: BufRead> NdjsonSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> PoseSource for NdjsonSource<R> {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .context("Failed to read frame")?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<PoseFrame>(trimmed) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => warn!("Skipping line {}: {}", self.line_number, e),
            }
        }
    }
}

pub struct NdjsonSink<W> {
    writer: W,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> FrameSink for NdjsonSink<W> {
    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn send(&mut self, frame: &PoseFrame) -> Result<()> {
        serde_json::to_writer(&mut self.writer, frame)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
