//! # Frame Transport
//!
//! Carries chunked-channel frames over a byte stream.
//!
//! ## Wire Format
//!
//! ```text
//! ┌───────────┬────────────────┬──────────────────┐
//! │ flags: u8 │ length: u32 BE │ payload (length) │
//! └───────────┴────────────────┴──────────────────┘
//! ```
//!
//! `flags` bit 0 marks start-of-message, bit 1 end-of-message. The length
//! prefix preserves frame boundaries on top of TCP.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use xrit_core::{Frame, FrameFlags, XritError};

/// Bytes before the payload: one flag byte plus the length prefix.
pub const FRAME_HEADER_LEN: usize = 5;

/// Length-prefixed frame codec with an upper size bound.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    #[must_use]
    pub const fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    fn check_size(&self, size: usize) -> Result<(), XritError> {
        if size > self.max_frame_size || u32::try_from(size).is_err() {
            return Err(XritError::FrameTooLarge {
                size,
                limit: self.max_frame_size,
            });
        }
        Ok(())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = XritError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, XritError> {
        if src.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let flags = FrameFlags::from_bits(src[0]);
        let length = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
        self.check_size(length)?;

        let total = FRAME_HEADER_LEN + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        src.advance(FRAME_HEADER_LEN);
        let payload = src.split_to(length).to_vec();
        tracing::trace!(length, start = flags.start, end = flags.end, "Frame received");

        Ok(Some(Frame { flags, payload }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = XritError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), XritError> {
        self.check_size(frame.payload.len())?;

        dst.reserve(FRAME_HEADER_LEN + frame.payload.len());
        dst.put_u8(frame.flags.bits());
        dst.put_u32(frame.payload.len() as u32);
        dst.extend_from_slice(&frame.payload);
        tracing::trace!(
            length = frame.payload.len(),
            start = frame.flags.start,
            end = frame.flags.end,
            "Frame sent"
        );

        Ok(())
    }
}
