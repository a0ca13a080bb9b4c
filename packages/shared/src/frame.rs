//! Wire framing for the comment protocol.
//!
//! Every message in both directions is a UTF-8 string followed by a single
//! `0x00` byte. `FrameCodec` turns a byte stream into those strings and back,
//! for use with `tokio_util::codec::{FramedRead, FramedWrite}`.

use bytes::{BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

/// Byte that ends every frame
pub const FRAME_TERMINATOR: u8 = 0x00;

/// Default upper bound on a single frame's payload (1 MiB)
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 1024 * 1024;

/// Handshake frame asking for the cross-domain policy document
pub const POLICY_FILE_REQUEST: &str = "<policy-file-request/>";

/// Cross-domain policy document sent in reply to `POLICY_FILE_REQUEST`
pub const POLICY_FILE_RESPONSE: &str = concat!(
    r#"<?xml version="1.0"?>"#,
    r#"<!DOCTYPE cross-domain-policy SYSTEM "/xml/dtds/cross-domain-policy.dtd">"#,
    r#"<cross-domain-policy>"#,
    r#"<site-control permitted-cross-domain-policies="master-only"/>"#,
    r#"<allow-access-from domain="*" to-ports="*"/>"#,
    r#"</cross-domain-policy>"#,
);

/// Rejection sent when the server has no free viewer slot
pub const NET_CONGESTION: &str = "Net Congestion";

/// Framing errors
#[derive(Debug, Error)]
pub enum FrameError {
    /// No terminator within the configured maximum length
    #[error("frame exceeds the maximum length of {max} bytes")]
    TooLong { max: usize },

    /// Payload is not UTF-8
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// Underlying socket error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// NUL-terminated UTF-8 frame codec
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_length: usize,
    /// Bytes already scanned for a terminator in the current buffer
    next_index: usize,
}

impl FrameCodec {
    /// Create a codec with `DEFAULT_MAX_FRAME_LENGTH`
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_FRAME_LENGTH)
    }

    /// Create a codec that rejects frames longer than `max_length` bytes
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = String;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, FrameError> {
        let read_to = buf.len().min(self.max_length.saturating_add(1));
        let terminator = buf[self.next_index..read_to]
            .iter()
            .position(|byte| *byte == FRAME_TERMINATOR);

        match terminator {
            Some(offset) => {
                let end = self.next_index + offset;
                self.next_index = 0;
                let mut frame = buf.split_to(end + 1);
                frame.truncate(end);
                Ok(Some(String::from_utf8(frame.to_vec())?))
            }
            None if buf.len() > self.max_length => Err(FrameError::TooLong {
                max: self.max_length,
            }),
            None => {
                self.next_index = read_to;
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        // An unterminated tail is never delivered
        if !buf.is_empty() {
            tracing::debug!(
                "Discarding {} bytes of unterminated frame at end of stream",
                buf.len()
            );
            buf.clear();
        }
        self.next_index = 0;
        Ok(None)
    }
}

impl<T: AsRef<str>> Encoder<T> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), FrameError> {
        let payload = item.as_ref().as_bytes();
        dst.reserve(payload.len() + 1);
        dst.put_slice(payload);
        dst.put_u8(FRAME_TERMINATOR);
        Ok(())
    }
}
