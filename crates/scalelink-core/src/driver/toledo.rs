//! Mettler Toledo 8217 driver

use std::time::Duration;

use super::ScaleDriver;
use crate::config::DriverConfig;
use crate::protocol::{
    open_port, parse_payload, read_frame, Connection, LineSettings, ProtocolError, SerialLink,
    POLL_COMMAND,
};
use crate::reading::Reading;

/// 8217 scale on a 7E1 serial line
#[derive(Debug, Clone)]
pub struct MettlerToledo8217 {
    line: LineSettings,
    poll_interval: Duration,
}

impl MettlerToledo8217 {
    /// Vendor/product identifier
    pub const VENDOR_PRODUCT: &'static str = "mettler_toledo_8217";

    /// Create a driver from config
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            line: LineSettings::seven_even_one(config.port.clone(), config.baud_rate),
            poll_interval: config.poll_interval(),
        }
    }

    /// Serial line parameters in use
    pub fn line_settings(&self) -> &LineSettings {
        &self.line
    }
}

impl ScaleDriver for MettlerToledo8217 {
    fn vendor_product(&self) -> &'static str {
        Self::VENDOR_PRODUCT
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn establish_connection(&self) -> Result<Connection, ProtocolError> {
        let port = open_port(&self.line)?;
        Ok(Connection::new(Box::new(SerialLink::new(port))))
    }

    fn acquire_reading(
        &self,
        conn: &mut Connection,
        current: &Reading,
    ) -> Result<Reading, ProtocolError> {
        acquire_8217(conn, current)
    }
}

/// One 8217 exchange: send `W`, read a frame, decode it and merge onto `current`
pub fn acquire_8217(conn: &mut Connection, current: &Reading) -> Result<Reading, ProtocolError> {
    conn.send(&[POLL_COMMAND])?;
    let payload = read_frame(conn)?;
    let update = parse_payload(&payload)?;
    tracing::trace!(link = conn.name(), payload = ?payload, ?update, "frame decoded");
    Ok(update.apply(current))
}
