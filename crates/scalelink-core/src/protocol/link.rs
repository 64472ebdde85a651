//! Byte links and connections
//!
//! A [`ScaleLink`] is anything that moves bytes to and from a scale: a serial
//! port, or the simulated scale used in demo mode. A [`Connection`] owns one
//! open link for as long as the poll loop keeps it; dropping the connection
//! releases the underlying handle.

use serialport::SerialPort;
use std::io::{self, Read, Write};

use super::ProtocolError;

/// Abstraction for byte links to a scale
pub trait ScaleLink: Read + Write + Send {
    /// Human-readable endpoint name for logs
    fn describe(&self) -> String;
}

/// Serial port wrapper implementing ScaleLink
pub struct SerialLink {
    port: Box<dyn SerialPort>,
}

impl SerialLink {
    /// Wrap an open serial port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl ScaleLink for SerialLink {
    fn describe(&self) -> String {
        self.port.name().unwrap_or_else(|| "serial".to_string())
    }
}

/// An open link to a scale
pub struct Connection {
    link: Box<dyn ScaleLink>,
    name: String,
}

impl Connection {
    /// Take ownership of an open link
    pub fn new(link: Box<dyn ScaleLink>) -> Self {
        let name = link.describe();
        Self { link, name }
    }

    /// Endpoint name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Write a request to the scale
    pub fn send(&mut self, request: &[u8]) -> Result<(), ProtocolError> {
        self.link
            .write_all(request)
            .and_then(|_| self.link.flush())
            .map_err(|e| ProtocolError::Connection(format!("write to {}: {}", self.name, e)))
    }

    /// Read a single byte, honouring the link's read timeout.
    ///
    /// A read that returns no data is reported as [`ProtocolError::Timeout`].
    pub fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        let mut buf = [0u8; 1];
        loop {
            match self.link.read(&mut buf) {
                Ok(0) => return Err(ProtocolError::Timeout),
                Ok(_) => return Ok(buf[0]),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        tracing::debug!(link = %self.name, "connection closed");
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted in-memory link for tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// What the mock does once its scripted bytes run out
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Exhausted {
        /// Report a read timeout
        Timeout,
        /// Report an I/O failure
        Broken,
        /// Keep returning the same byte forever
        Repeat(u8),
    }

    /// Bytes written by the code under test, shared with the test body
    pub type Sent = Arc<Mutex<Vec<u8>>>;

    pub struct MockLink {
        recv: VecDeque<u8>,
        sent: Sent,
        fail_on_send: bool,
        exhausted: Exhausted,
    }

    impl MockLink {
        pub fn with_response(response: &[u8]) -> Self {
            Self {
                recv: response.iter().copied().collect(),
                sent: Arc::new(Mutex::new(Vec::new())),
                fail_on_send: false,
                exhausted: Exhausted::Timeout,
            }
        }

        pub fn failing_writes() -> Self {
            let mut link = Self::with_response(&[]);
            link.fail_on_send = true;
            link
        }

        pub fn then(mut self, exhausted: Exhausted) -> Self {
            self.exhausted = exhausted;
            self
        }

        pub fn sent(&self) -> Sent {
            Arc::clone(&self.sent)
        }

        pub fn into_connection(self) -> Connection {
            Connection::new(Box::new(self))
        }
    }

    impl Read for MockLink {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.recv.pop_front() {
                Some(byte) if !buf.is_empty() => {
                    buf[0] = byte;
                    Ok(1)
                }
                Some(_) => Ok(0),
                None => match self.exhausted {
                    Exhausted::Timeout => Err(io::Error::new(io::ErrorKind::TimedOut, "timed out")),
                    Exhausted::Broken => {
                        Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))
                    }
                    Exhausted::Repeat(byte) => {
                        buf[0] = byte;
                        Ok(1)
                    }
                },
            }
        }
    }

    impl Write for MockLink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_on_send {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "serial write failed"));
            }
            if let Ok(mut sent) = self.sent.lock() {
                sent.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl ScaleLink for MockLink {
        fn describe(&self) -> String {
            "mock".to_string()
        }
    }
}
