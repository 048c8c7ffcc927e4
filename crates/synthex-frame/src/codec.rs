//! `tokio_util` codec over the same reassembly rules as [`StreamAssembler`].

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::assembler::StreamAssembler;
use crate::error::{FrameError, Result};
use crate::frame::{FrameConfig, RawFrame};

/// Frames an async byte stream into [`RawFrame`]s and writes frames back out.
#[derive(Debug, Default)]
pub struct SysexCodec {
    assembler: StreamAssembler,
    pending: VecDeque<RawFrame>,
}

impl SysexCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            assembler: StreamAssembler::with_config(config),
            pending: VecDeque::new(),
        }
    }
}

impl Decoder for SysexCodec {
    type Item = RawFrame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawFrame>> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }

        // The assembler keeps its own partial-frame buffer, so the source is
        // always consumed in full.
        let chunk = src.split();
        let pending = &mut self.pending;
        self.assembler
            .push_with(&chunk, |frame| pending.push_back(frame));
        Ok(self.pending.pop_front())
    }
}

impl Encoder<RawFrame> for SysexCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: RawFrame, dst: &mut BytesMut) -> Result<()> {
        let max = self.assembler.config().max_frame_size;
        if frame.len() > max {
            return Err(FrameError::FrameTooLarge {
                size: frame.len(),
                max,
            });
        }
        dst.extend_from_slice(frame.as_bytes());
        Ok(())
    }
}
