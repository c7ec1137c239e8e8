use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read, Stdin},
    path::Path,
};

use crate::{decode, FrameErr, MAX_FRAME_SIZE, PREFIX_SIZE};
use sea_loader_types::{DataSource, LogicalPoint};

pub const BUFFER_SIZE: usize = 4 << 20;
/// Any frame larger than this is regarded as corruption. Same as the encoder's limit,
/// so every frame written by [`crate::FrameWriter`] can be read back.
pub const DEFAULT_MAX_FRAME_SIZE: u64 = MAX_FRAME_SIZE;

/// Reads a stream of frames, one point at a time.
///
/// The stream is assumed to be well-formed and fully written. End of stream is only
/// acceptable at a frame boundary; anything else is an error.
pub struct FrameReader<R: Read> {
    reader: R,
    max_frame_size: u64,
    frames_read: u64,
}

impl<R: Read> std::fmt::Debug for FrameReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("max_frame_size", &self.max_frame_size)
            .field("frames_read", &self.frames_read)
            .finish()
    }
}

impl FrameReader<BufReader<File>> {
    /// Open a frame file with a large read buffer.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FrameErr> {
        let file = File::open(path).map_err(FrameErr::IoError)?;
        Ok(Self::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
}

impl FrameReader<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::with_capacity(BUFFER_SIZE, std::io::stdin()))
    }
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            frames_read: 0,
        }
    }

    pub fn set_max_frame_size(&mut self, size: u64) -> &mut Self {
        self.max_frame_size = size;
        self
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read until `buf` is full. Returns how many bytes were read, which is less than
    /// `buf.len()` only if the stream ended.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize, FrameErr> {
        let mut total = 0;
        while total < buf.len() {
            match self.reader.read(&mut buf[total..]) {
                Ok(0) => break,
                Ok(n) => total += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(FrameErr::IoError(e)),
            }
        }
        Ok(total)
    }

    /// Read the next raw payload, without decoding it. Returns `None` at the end of stream.
    pub fn next_payload(&mut self) -> Result<Option<Vec<u8>>, FrameErr> {
        let mut len_buf = [0u8; PREFIX_SIZE];
        match self.read_full(&mut len_buf)? {
            0 => {
                log::debug!("End of stream after {} frames", self.frames_read);
                return Ok(None);
            }
            PREFIX_SIZE => (),
            _ => return Err(FrameErr::NotEnoughBytes),
        }
        let len = u64::from_le_bytes(len_buf);
        if len > self.max_frame_size {
            return Err(FrameErr::FrameTooLarge(len));
        }

        let len = len as usize;
        let mut payload = vec![0u8; len];
        let total = self.read_full(&mut payload)?;
        if total < len {
            return Err(FrameErr::NotEnoughBytes);
        }
        assert_eq!(total, payload.len(), "reader/writer logic error");
        self.frames_read += 1;
        Ok(Some(payload))
    }
}

impl<R: Read> DataSource for FrameReader<R> {
    type Error = FrameErr;

    fn next_item(&mut self) -> Result<Option<LogicalPoint>, FrameErr> {
        match self.next_payload()? {
            Some(payload) => Ok(Some(decode(&payload)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encode;
    use sea_loader_types::{Point, Timestamp};
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read call.
    struct Trickle {
        inner: Cursor<Vec<u8>>,
        chunk: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = std::cmp::min(buf.len(), self.chunk);
            self.inner.read(&mut buf[..n])
        }
    }

    fn stream(n: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for i in 0..n {
            let point = Point::new("cpu", Timestamp::UNIX_EPOCH)
                .with_tag("hostname", format!("host_{i}"))
                .with_field("usage_user", i as f64);
            bytes.extend_from_slice(encode(&point).unwrap().as_bytes());
        }
        bytes
    }

    #[test]
    fn test_short_reads() {
        let mut reader = FrameReader::new(Trickle {
            inner: Cursor::new(stream(3)),
            chunk: 3,
        });
        for i in 0..3 {
            let point = reader.next_item().unwrap().unwrap();
            assert_eq!(point.tag("hostname").unwrap().to_string(), format!("host_{i}"));
        }
        assert!(reader.next_item().unwrap().is_none());
        assert_eq!(reader.frames_read(), 3);
    }

    #[test]
    fn test_truncated_prefix() {
        let mut bytes = stream(1);
        bytes.extend_from_slice(&[1, 0, 0]);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(reader.next_item().unwrap().is_some());
        assert!(matches!(reader.next_item(), Err(FrameErr::NotEnoughBytes)));
    }

    #[test]
    fn test_truncated_payload() {
        let mut bytes = stream(2);
        bytes.pop();
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(reader.next_item().unwrap().is_some());
        assert!(matches!(reader.next_item(), Err(FrameErr::NotEnoughBytes)));
    }

    #[test]
    fn test_frame_too_large() {
        let mut reader = FrameReader::new(Cursor::new(stream(1)));
        reader.set_max_frame_size(8);
        assert!(matches!(reader.next_item(), Err(FrameErr::FrameTooLarge(_))));
    }
}
