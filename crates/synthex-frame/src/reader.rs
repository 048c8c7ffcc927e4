use std::collections::VecDeque;
use std::io::{ErrorKind, Read};

use crate::assembler::StreamAssembler;
use crate::error::{FrameError, Result};
use crate::frame::{FrameConfig, RawFrame};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads complete SysEx frames from any `Read` stream.
///
/// Works on `.syx` files and raw MIDI captures alike. Bytes between frames
/// (clock, channel messages) are skipped.
pub struct FrameReader<T> {
    inner: T,
    assembler: StreamAssembler,
    pending: VecDeque<RawFrame>,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            assembler: StreamAssembler::with_config(config),
            pending: VecDeque::new(),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// partial frame at EOF is discarded.
    pub fn read_frame(&mut self) -> Result<RawFrame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            let pending = &mut self.pending;
            self.assembler
                .push_with(&chunk[..read], |frame| pending.push_back(frame));
        }
    }

    /// Read frames until EOF.
    pub fn read_all(&mut self) -> Result<Vec<RawFrame>> {
        let mut frames = Vec::new();
        loop {
            match self.read_frame() {
                Ok(frame) => frames.push(frame),
                Err(FrameError::ConnectionClosed) => return Ok(frames),
                Err(err) => return Err(err),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.assembler.config()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::frame::{END, START};

    #[test]
    fn read_single_frame() {
        let mut reader = FrameReader::new(Cursor::new(vec![START, 1, 2, END]));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.as_bytes(), &[START, 1, 2, END]);
    }

    #[test]
    fn read_multiple_frames_with_noise() {
        let wire = vec![0xF8, START, 1, END, 0x90, 60, 100, START, 2, END, 0xFE];
        let mut reader = FrameReader::new(Cursor::new(wire));

        assert_eq!(reader.read_frame().unwrap().as_bytes(), &[START, 1, END]);
        assert_eq!(reader.read_frame().unwrap().as_bytes(), &[START, 2, END]);
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn read_frame_larger_than_chunk() {
        let mut wire = vec![START];
        wire.extend((0..READ_CHUNK_SIZE * 2).map(|i| (i % 0x80) as u8));
        wire.push(END);

        let cfg = FrameConfig {
            max_frame_size: wire.len(),
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire.clone()), cfg);
        assert_eq!(reader.read_frame().unwrap().as_bytes(), wire.as_slice());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: vec![START, 0x7D, 0x21, 0x00, 0x48, END],
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.command_byte(), Some(0x48));
    }

    #[test]
    fn partial_frame_at_eof_is_dropped() {
        let mut reader = FrameReader::new(Cursor::new(vec![START, 1, END, START, 2, 3]));
        let frames = reader.read_all().unwrap();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn empty_stream_reads_nothing() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            bytes: vec![START, 9, END],
            pos: 0,
        };
        let mut framed = FrameReader::new(reader);
        assert_eq!(framed.read_frame().unwrap().as_bytes(), &[START, 9, END]);
    }

    #[test]
    fn other_io_errors_propagate() {
        let mut framed = FrameReader::new(FailingReader);
        let err = framed.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::BrokenPipe));
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert_eq!(reader.config().max_frame_size, FrameConfig::default().max_frame_size);
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = &self.bytes[self.pos..];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }
    }
}
