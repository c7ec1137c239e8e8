use std::io::Write;

use crate::{encode_with, BuilderPool, Frame, FrameErr};
use sea_loader_types::Point;

/// Serializes points into a frame stream.
pub struct FrameWriter<W: Write> {
    writer: W,
    pool: &'static BuilderPool,
    frames: u64,
    bytes: u64,
}

impl<W: Write> std::fmt::Debug for FrameWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("frames", &self.frames)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl<W: Write> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            pool: BuilderPool::global(),
            frames: 0,
            bytes: 0,
        }
    }

    /// Encode and write one point. Nothing is written if encoding fails.
    pub fn write(&mut self, point: &Point) -> Result<(), FrameErr> {
        let frame = encode_with(self.pool, point)?;
        self.write_frame(&frame)
    }

    pub fn write_frame(&mut self, frame: &Frame) -> Result<(), FrameErr> {
        self.writer
            .write_all(frame.as_bytes())
            .map_err(FrameErr::IoError)?;
        self.frames += 1;
        self.bytes += frame.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), FrameErr> {
        self.writer.flush().map_err(FrameErr::IoError)
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes
    }

    /// Flush and return the inner writer.
    pub fn end(mut self) -> Result<W, FrameErr> {
        self.flush()?;
        Ok(self.writer)
    }
}
