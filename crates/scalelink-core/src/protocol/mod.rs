//! Serial Protocol Communication
//!
//! Implements the Mettler Toledo 8217 protocol: the host sends `W`, the scale
//! answers with `STX payload CR`, where the payload is either a weight or a
//! status byte.

mod error;
pub mod frame;
pub mod link;
pub mod parser;
pub mod serial;

use std::time::Duration;

pub use error::ProtocolError;
pub use frame::{read_frame, read_frame_within, FrameAssembler};
pub use link::{Connection, ScaleLink, SerialLink};
pub use parser::{parse_payload, ReadingUpdate};
pub use serial::{open_port, LineSettings};

/// Start of frame
pub const STX: u8 = 0x02;

/// End of frame
pub const CR: u8 = 0x0D;

/// Weight request command ('W')
pub const POLL_COMMAND: u8 = b'W';

/// Default baud rate for 8217 scales
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout for a single byte, and the deadline for a whole frame
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest payload accepted before the frame is abandoned
pub const MAX_FRAME_SIZE: usize = 64;
