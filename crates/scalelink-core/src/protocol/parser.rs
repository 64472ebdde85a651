//! 8217 payload parser
//!
//! A payload is either a status frame, `?` followed by exactly one status
//! byte, or a weight frame of the form `digits "." digits`. Anything else is
//! rejected.

use super::ProtocolError;
use crate::reading::{Reading, ScaleStatus};

/// Status byte bit: scale in motion
pub const STATUS_MOTION: u8 = 0b001;

/// Status byte bits that signal a fault. The device documentation does not
/// break these down further, so any of them maps to a generic error.
pub const STATUS_FAULT_MASK: u8 = 0b110;

/// Decoded content of one payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadingUpdate {
    /// Weight frame: replaces value and status
    Weight(f64),
    /// Status frame: `None` when no relevant bit was set
    Status(Option<ScaleStatus>),
}

impl ReadingUpdate {
    /// Merge this update onto the previously stored reading.
    ///
    /// Status frames never touch `value`. A status frame with no relevant
    /// bits keeps the prior status, unless that status only described the
    /// link (`disconnected`, `stale`): the scale is answering, so it is `ok`.
    pub fn apply(self, prior: &Reading) -> Reading {
        let mut next = prior.clone().refreshed();
        match self {
            ReadingUpdate::Weight(value) => {
                next.value = Some(value);
                next.status = ScaleStatus::Ok;
            }
            ReadingUpdate::Status(Some(status)) => next.status = status,
            ReadingUpdate::Status(None) => {
                if matches!(next.status, ScaleStatus::Disconnected | ScaleStatus::Stale) {
                    next.status = ScaleStatus::Ok;
                }
            }
        }
        next
    }
}

/// Decode the status byte of a `?x` frame
pub fn decode_status(status_byte: u8) -> Option<ScaleStatus> {
    if status_byte & STATUS_MOTION != 0 {
        Some(ScaleStatus::Moving)
    } else if status_byte & STATUS_FAULT_MASK != 0 {
        Some(ScaleStatus::Error)
    } else {
        None
    }
}

/// Parse one frame payload
pub fn parse_payload(payload: &[u8]) -> Result<ReadingUpdate, ProtocolError> {
    if let [b'?', status_byte] = payload {
        return Ok(ReadingUpdate::Status(decode_status(*status_byte)));
    }

    if let Some(value) = parse_weight(payload) {
        return Ok(ReadingUpdate::Weight(value));
    }

    Err(ProtocolError::parse(
        payload,
        "expected '?<status>' or '<digits>.<digits>'",
    ))
}

/// Scan `\d+\.\d+` over the whole payload
fn parse_weight(payload: &[u8]) -> Option<f64> {
    let dot = payload.iter().position(|&b| b == b'.')?;
    let (int_part, frac_part) = (&payload[..dot], &payload[dot + 1..]);

    let all_digits = |part: &[u8]| !part.is_empty() && part.iter().all(u8::is_ascii_digit);
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    std::str::from_utf8(payload).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn prior(value: Option<f64>, status: ScaleStatus) -> Reading {
        Reading {
            value,
            status,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_weight_payload() {
        assert_eq!(parse_payload(b"12.5").unwrap(), ReadingUpdate::Weight(12.5));
        assert_eq!(parse_payload(b"000.000").unwrap(), ReadingUpdate::Weight(0.0));
        assert_eq!(parse_payload(b"3.0").unwrap(), ReadingUpdate::Weight(3.0));
    }

    #[test]
    fn test_weight_requires_both_digit_groups() {
        for bad in ["12.", ".5", "12", "1.2.3", "-1.5", "1,5", " 1.5", "1.5 ", "1.5e3"] {
            assert!(parse_payload(bad.as_bytes()).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_status_motion_wins() {
        for byte in [0x01, 0x03, 0x05, 0x07, 0x31] {
            assert_eq!(
                parse_payload(&[b'?', byte]).unwrap(),
                ReadingUpdate::Status(Some(ScaleStatus::Moving))
            );
        }
    }

    #[test]
    fn test_status_fault_bits() {
        for byte in [0x02, 0x04, 0x06] {
            assert_eq!(
                parse_payload(&[b'?', byte]).unwrap(),
                ReadingUpdate::Status(Some(ScaleStatus::Error))
            );
        }
    }

    #[test]
    fn test_status_without_relevant_bits() {
        assert_eq!(parse_payload(b"?\x00").unwrap(), ReadingUpdate::Status(None));
        assert_eq!(parse_payload(b"?\x30").unwrap(), ReadingUpdate::Status(None));
    }

    #[test]
    fn test_status_needs_exactly_one_byte() {
        assert!(parse_payload(b"?").is_err());
        assert!(parse_payload(b"?\x01\x01").is_err());
    }

    #[test]
    fn test_malformed_payload() {
        let err = parse_payload(b"abc").unwrap_err();
        assert!(matches!(err, ProtocolError::Parse { ref payload, .. } if payload == b"abc"));
        assert!(parse_payload(b"").is_err());
    }

    #[test]
    fn test_weight_replaces_value_and_status() {
        let merged = ReadingUpdate::Weight(7.5).apply(&prior(Some(1.0), ScaleStatus::Error));
        assert_eq!(merged.value, Some(7.5));
        assert_eq!(merged.status, ScaleStatus::Ok);
    }

    #[test]
    fn test_status_keeps_value() {
        let merged = ReadingUpdate::Status(Some(ScaleStatus::Moving))
            .apply(&prior(Some(1.25), ScaleStatus::Ok));
        assert_eq!(merged.value, Some(1.25));
        assert_eq!(merged.status, ScaleStatus::Moving);
    }

    #[test]
    fn test_status_none_carries_everything_forward() {
        let before = prior(Some(2.0), ScaleStatus::Moving);
        let merged = ReadingUpdate::Status(None).apply(&before);
        assert_eq!(merged.value, before.value);
        assert_eq!(merged.status, before.status);
    }

    #[test]
    fn test_status_none_after_reconnect_reports_ok() {
        let stale = ReadingUpdate::Status(None).apply(&prior(Some(2.0), ScaleStatus::Stale));
        assert_eq!(stale.value, Some(2.0));
        assert_eq!(stale.status, ScaleStatus::Ok);

        let fresh = ReadingUpdate::Status(None).apply(&Reading::disconnected());
        assert_eq!(fresh.value, None);
        assert_eq!(fresh.status, ScaleStatus::Ok);
    }
}
