//! Frame reader
//!
//! Assembles one STX ... CR frame from the byte stream. Bytes before the
//! first STX are dropped, a CR with no open frame is ignored, and a second
//! STX restarts the frame.
//!
//! The link timeout only bounds the gap between two bytes, so a whole frame
//! read also carries a deadline. A line that never goes quiet and never
//! completes a frame ends in [`ProtocolError::Timeout`].

use std::time::{Duration, Instant};

use super::{Connection, ProtocolError, CR, MAX_FRAME_SIZE, READ_TIMEOUT, STX};

/// Read bytes until one complete frame has been received and return its payload
pub fn read_frame(conn: &mut Connection) -> Result<Vec<u8>, ProtocolError> {
    read_frame_within(conn, READ_TIMEOUT)
}

/// Like [`read_frame`], but give up once `timeout` has elapsed
pub fn read_frame_within(
    conn: &mut Connection,
    timeout: Duration,
) -> Result<Vec<u8>, ProtocolError> {
    let deadline = Instant::now() + timeout;
    let mut assembler = FrameAssembler::new();
    loop {
        let byte = match conn.read_byte() {
            Ok(byte) => byte,
            Err(e) => {
                assembler.log_incomplete(conn.name(), &e);
                return Err(e);
            }
        };
        if let Some(payload) = assembler.push(byte)? {
            return Ok(payload);
        }
        if Instant::now() >= deadline {
            let err = ProtocolError::Timeout;
            assembler.log_incomplete(conn.name(), &err);
            return Err(err);
        }
    }
}

/// Byte-at-a-time frame state machine
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: Vec<u8>,
    open: bool,
    discarded: usize,
}

impl FrameAssembler {
    /// New assembler with no open frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an STX has been seen and the frame is not yet terminated
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Bytes of the open frame received so far
    pub fn partial(&self) -> &[u8] {
        &self.buffer
    }

    /// Bytes dropped outside a frame since the last completed frame
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    fn log_incomplete(&self, link: &str, err: &ProtocolError) {
        if self.open || self.discarded > 0 {
            tracing::debug!(
                link,
                partial = ?self.buffer,
                discarded = self.discarded,
                "frame read abandoned: {}",
                err
            );
        }
    }

    /// Feed one byte; returns the payload once a CR closes an open frame
    pub fn push(&mut self, byte: u8) -> Result<Option<Vec<u8>>, ProtocolError> {
        match byte {
            STX => {
                if self.open && !self.buffer.is_empty() {
                    tracing::debug!(dropped = ?self.buffer, "STX inside open frame, restarting");
                }
                self.buffer.clear();
                self.open = true;
            }
            CR if !self.open => {
                // stray terminator
                self.discarded += 1;
            }
            CR => {
                self.open = false;
                if self.discarded > 0 {
                    tracing::debug!(discarded = self.discarded, "skipped bytes outside frame");
                    self.discarded = 0;
                }
                return Ok(Some(std::mem::take(&mut self.buffer)));
            }
            _ if self.open => {
                if self.buffer.len() >= MAX_FRAME_SIZE {
                    tracing::warn!(
                        partial = ?self.buffer,
                        "frame exceeded {} bytes",
                        MAX_FRAME_SIZE
                    );
                    self.buffer.clear();
                    self.open = false;
                    return Err(ProtocolError::FrameOverflow {
                        limit: MAX_FRAME_SIZE,
                    });
                }
                self.buffer.push(byte);
            }
            _ => self.discarded += 1,
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::link::mock::{Exhausted, MockLink};
    use pretty_assertions::assert_eq;

    fn frame_from(bytes: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        let mut conn = MockLink::with_response(bytes).into_connection();
        read_frame(&mut conn)
    }

    #[test]
    fn test_simple_frame() {
        assert_eq!(frame_from(b"\x0212.5\r").unwrap(), b"12.5".to_vec());
    }

    #[test]
    fn test_leading_garbage_discarded() {
        assert_eq!(frame_from(b"\x41\x023.0\r").unwrap(), b"3.0".to_vec());
    }

    #[test]
    fn test_cr_without_stx_ignored() {
        assert_eq!(frame_from(b"\r9\r\x02?\x01\r").unwrap(), b"?\x01".to_vec());
    }

    #[test]
    fn test_second_stx_restarts_frame() {
        assert_eq!(frame_from(b"\x0212\x021.5\r").unwrap(), b"1.5".to_vec());
    }

    #[test]
    fn test_empty_frame() {
        assert_eq!(frame_from(b"\x02\r").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_timeout_before_any_byte() {
        assert!(matches!(frame_from(b""), Err(ProtocolError::Timeout)));
    }

    #[test]
    fn test_timeout_mid_frame() {
        assert!(matches!(frame_from(b"\x0212."), Err(ProtocolError::Timeout)));
    }

    #[test]
    fn test_io_failure_mid_frame() {
        let mut conn = MockLink::with_response(b"\x021")
            .then(Exhausted::Broken)
            .into_connection();
        assert!(matches!(read_frame(&mut conn), Err(ProtocolError::Connection(_))));
    }

    #[test]
    fn test_overflow() {
        let mut bytes = vec![STX];
        bytes.extend(std::iter::repeat(b'1').take(MAX_FRAME_SIZE + 1));
        bytes.push(CR);
        assert!(matches!(
            frame_from(&bytes),
            Err(ProtocolError::FrameOverflow { .. })
        ));
    }

    #[test]
    fn test_endless_noise_times_out() {
        let mut conn = MockLink::with_response(&[])
            .then(Exhausted::Repeat(0x41))
            .into_connection();
        let started = Instant::now();
        let result = read_frame_within(&mut conn, Duration::from_millis(50));
        assert!(matches!(result, Err(ProtocolError::Timeout)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_endless_open_frames_time_out() {
        // STX keeps restarting the frame, so it never overflows
        let mut conn = MockLink::with_response(&[])
            .then(Exhausted::Repeat(STX))
            .into_connection();
        let result = read_frame_within(&mut conn, Duration::from_millis(50));
        assert!(matches!(result, Err(ProtocolError::Timeout)));
    }

    #[test]
    fn test_long_noise_run_before_frame() {
        let mut bytes: Vec<u8> = (0..10_000u32)
            .map(|i| (i % 0x80) as u8)
            .filter(|&b| b != STX)
            .collect();
        bytes.extend_from_slice(b"\x024.25\r");
        assert_eq!(frame_from(&bytes).unwrap(), b"4.25".to_vec());
    }

    #[test]
    fn test_partial_frame_kept_until_timeout() {
        let mut assembler = FrameAssembler::new();
        for byte in b"xx\x0212." {
            assert_eq!(assembler.push(*byte).unwrap(), None);
        }
        assert_eq!(assembler.partial(), b"12.");
        assert_eq!(assembler.discarded(), 2);
    }

    #[test]
    fn test_assembler_ignores_bytes_before_stx() {
        let mut assembler = FrameAssembler::new();
        for byte in b"noise\r\rmore" {
            assert_eq!(assembler.push(*byte).unwrap(), None);
        }
        assert!(!assembler.is_open());
        assert_eq!(assembler.push(STX).unwrap(), None);
        assert!(assembler.is_open());
    }
}
