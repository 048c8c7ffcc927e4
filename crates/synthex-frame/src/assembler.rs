use bytes::BytesMut;
use tracing::{debug, trace};

use crate::frame::{FrameConfig, RawFrame, END, START};

const INITIAL_BUFFER_CAPACITY: usize = 64;

/// Where the assembler is within the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    /// Between frames. Everything except `0xF0` is dropped.
    Idle,
    /// Inside a frame, buffering until `0xF7`.
    Collecting,
}

/// Reassembles SysEx frames from arbitrarily fragmented input.
///
/// Rules:
/// - `0xF0` always starts a fresh frame, discarding any partial one.
/// - `0xF7` while collecting completes the frame (markers included).
/// - Bytes outside a frame are dropped.
/// - A frame that outgrows `max_frame_size` is dropped.
///
/// The output only depends on the byte sequence, never on how it was chunked.
/// Nothing here is an error: stray bytes and resynchronisation are normal on
/// a MIDI cable.
#[derive(Debug)]
pub struct StreamAssembler {
    buf: BytesMut,
    state: AssemblerState,
    config: FrameConfig,
}

impl StreamAssembler {
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            state: AssemblerState::Idle,
            config,
        }
    }

    /// Feed one chunk and collect every frame it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RawFrame> {
        let mut frames = Vec::new();
        self.push_with(chunk, |frame| frames.push(frame));
        frames
    }

    /// Feed a single byte.
    pub fn push_byte(&mut self, byte: u8) -> Option<RawFrame> {
        let mut completed = None;
        self.push_with(&[byte], |frame| completed = Some(frame));
        completed
    }

    /// Feed one chunk, handing each completed frame to `emit` as soon as it closes.
    pub fn push_with(&mut self, mut chunk: &[u8], mut emit: impl FnMut(RawFrame)) {
        while !chunk.is_empty() {
            match self.state {
                AssemblerState::Idle => match chunk.iter().position(|&b| b == START) {
                    Some(pos) => {
                        if pos > 0 {
                            trace!(skipped = pos, "dropping bytes outside frame");
                        }
                        self.begin();
                        chunk = &chunk[pos + 1..];
                    }
                    None => {
                        trace!(skipped = chunk.len(), "dropping bytes outside frame");
                        return;
                    }
                },
                AssemblerState::Collecting => {
                    match chunk.iter().position(|&b| b == START || b == END) {
                        Some(pos) if chunk[pos] == START => {
                            debug!(
                                discarded = self.buf.len() + pos,
                                "start marker inside frame, resynchronising"
                            );
                            self.begin();
                            chunk = &chunk[pos + 1..];
                        }
                        Some(pos) => {
                            if self.append(&chunk[..=pos]) {
                                self.state = AssemblerState::Idle;
                                emit(RawFrame::new(self.buf.split().freeze()));
                            }
                            chunk = &chunk[pos + 1..];
                        }
                        None => {
                            self.append(chunk);
                            return;
                        }
                    }
                }
            }
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// Bytes held for the frame in progress.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Drop any partial frame and return to idle.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.state = AssemblerState::Idle;
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn begin(&mut self) {
        self.buf.clear();
        self.buf.extend_from_slice(&[START]);
        self.state = AssemblerState::Collecting;
    }

    /// Returns `false` (and goes idle) if the frame would outgrow the limit.
    fn append(&mut self, bytes: &[u8]) -> bool {
        let size = self.buf.len() + bytes.len();
        if size > self.config.max_frame_size {
            debug!(
                size,
                max = self.config.max_frame_size,
                "dropping oversized frame"
            );
            self.reset();
            return false;
        }
        self.buf.extend_from_slice(bytes);
        true
    }
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn frame(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![START];
        bytes.extend_from_slice(body);
        bytes.push(END);
        bytes
    }

    #[test]
    fn single_chunk_single_frame() {
        let mut asm = StreamAssembler::new();
        let wire = frame(&[0x7D, 0x21, 0x00, 0x48]);
        let frames = asm.push(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), wire.as_slice());
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert_eq!(asm.buffered_len(), 0);
    }

    #[test]
    fn byte_at_a_time() {
        let mut asm = StreamAssembler::new();
        let wire = frame(&[1, 2, 3, 4, 5]);
        let mut out = Vec::new();
        for &b in &wire {
            if let Some(f) = asm.push_byte(b) {
                out.push(f);
            }
        }
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_bytes(), wire.as_slice());
    }

    #[test]
    fn frame_split_across_chunks() {
        let mut asm = StreamAssembler::new();
        assert!(asm.push(&[START, 1, 2]).is_empty());
        assert_eq!(asm.state(), AssemblerState::Collecting);
        assert_eq!(asm.buffered_len(), 3);
        assert!(asm.push(&[3]).is_empty());
        let frames = asm.push(&[4, END]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[START, 1, 2, 3, 4, END]);
    }

    #[test]
    fn multiple_frames_in_one_chunk() {
        let mut asm = StreamAssembler::new();
        let mut wire = frame(&[1]);
        wire.extend(frame(&[2, 2]));
        wire.extend(frame(&[3, 3, 3]));
        let frames = asm.push(&wire);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].as_bytes(), &[START, 2, 2, END]);
    }

    #[test]
    fn stray_start_marker_resynchronises() {
        let mut asm = StreamAssembler::new();
        let frames = asm.push(&[START, 0x01, 0x02, START, 0x03, 0x04, END]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[START, 0x03, 0x04, END]);
    }

    #[test]
    fn stray_start_marker_across_chunks() {
        let mut asm = StreamAssembler::new();
        assert!(asm.push(&[START, 0x01]).is_empty());
        assert!(asm.push(&[0x02]).is_empty());
        let frames = asm.push(&[START, 0x03, END]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[START, 0x03, END]);
    }

    #[test]
    fn idle_bytes_never_leak_into_next_frame() {
        let mut asm = StreamAssembler::new();
        let frames = asm.push(&[0x90, 60, 100, END, 0x12, START, 0x05, END, 0x80, 60]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[START, 0x05, END]);
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert_eq!(asm.buffered_len(), 0);
    }

    #[test]
    fn empty_chunk_is_a_no_op() {
        let mut asm = StreamAssembler::new();
        assert!(asm.push(&[]).is_empty());
        asm.push(&[START, 1]);
        assert!(asm.push(&[]).is_empty());
        assert_eq!(asm.buffered_len(), 2);
    }

    #[test]
    fn oversized_frame_is_dropped_and_stream_recovers() {
        let mut asm = StreamAssembler::with_config(FrameConfig { max_frame_size: 8 });
        let mut wire = vec![START];
        wire.extend(std::iter::repeat(0x11).take(16));
        wire.push(END);
        wire.extend(frame(&[1, 2]));

        let frames = asm.push(&wire);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[START, 1, 2, END]);
    }

    #[test]
    fn frame_at_exact_limit_is_kept() {
        let mut asm = StreamAssembler::with_config(FrameConfig { max_frame_size: 4 });
        let frames = asm.push(&[START, 1, 2, END]);
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let mut asm = StreamAssembler::new();
        asm.push(&[START, 1, 2]);
        asm.reset();
        assert_eq!(asm.state(), AssemblerState::Idle);
        assert!(asm.push(&[3, END]).is_empty());
    }

    fn arbitrary_stream() -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(
            prop_oneof![
                4 => 0u8..0x80,
                1 => Just(START),
                1 => Just(END),
                1 => 0x80u8..=0xFF,
            ],
            0..512,
        )
    }

    fn split_points(len: usize) -> impl Strategy<Value = Vec<usize>> {
        prop::collection::vec(0..=len, 0..16).prop_map(|mut cuts| {
            cuts.sort_unstable();
            cuts.dedup();
            cuts
        })
    }

    proptest! {
        #[test]
        fn prop_valid_frame_survives_any_partition(
            body in prop::collection::vec(0u8..0x80, 0..600),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..32),
        ) {
            let wire = frame(&body);
            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(wire.len())).collect();
            points.push(wire.len());
            points.sort_unstable();
            points.dedup();

            let mut asm = StreamAssembler::new();
            let mut out = Vec::new();
            let mut from = 0;
            for to in points {
                if to > from {
                    out.extend(asm.push(&wire[from..to]));
                    from = to;
                }
            }
            prop_assert_eq!(out.len(), 1);
            prop_assert_eq!(out[0].as_bytes(), wire.as_slice());
        }

        #[test]
        fn prop_chunking_never_changes_output(
            (stream, cuts) in arbitrary_stream().prop_flat_map(|s| {
                let len = s.len();
                (Just(s), split_points(len))
            })
        ) {
            let mut whole = StreamAssembler::new();
            let expected = whole.push(&stream);

            let mut chunked = StreamAssembler::new();
            let mut out = Vec::new();
            let mut from = 0;
            for to in cuts.into_iter().chain(std::iter::once(stream.len())) {
                out.extend(chunked.push(&stream[from..to]));
                from = to;
            }
            prop_assert_eq!(out, expected);

            for frame in whole.push(&stream) {
                prop_assert!(frame.is_delimited());
            }
        }
    }
}
