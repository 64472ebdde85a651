//! Simulated scale driver

use std::time::Duration;

use super::{acquire_8217, ScaleDriver};
use crate::config::DriverConfig;
use crate::demo::SimulatedScale;
use crate::protocol::{Connection, ProtocolError};
use crate::reading::Reading;

/// Driver backed by [`SimulatedScale`]; speaks 8217 over an in-memory link
#[derive(Debug, Clone)]
pub struct DemoDriver {
    poll_interval: Duration,
}

impl DemoDriver {
    /// Create a demo driver; only the poll interval is taken from config
    pub fn new(config: &DriverConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
        }
    }
}

impl ScaleDriver for DemoDriver {
    fn vendor_product(&self) -> &'static str {
        "demo"
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn establish_connection(&self) -> Result<Connection, ProtocolError> {
        Ok(Connection::new(Box::new(SimulatedScale::new())))
    }

    fn acquire_reading(
        &self,
        conn: &mut Connection,
        current: &Reading,
    ) -> Result<Reading, ProtocolError> {
        acquire_8217(conn, current)
    }
}
