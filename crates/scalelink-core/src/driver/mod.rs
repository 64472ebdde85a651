//! Scale drivers
//!
//! Every supported protocol implements [`ScaleDriver`]. The implementation is
//! picked once at startup from [`DriverConfig::driver`](crate::config::DriverConfig).

mod demo;
mod toledo;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::DriverConfig;
use crate::protocol::{Connection, ProtocolError};
use crate::reading::Reading;

pub use demo::DemoDriver;
pub use toledo::{acquire_8217, MettlerToledo8217};

/// Capability set shared by all scale protocols
pub trait ScaleDriver: Send {
    /// Stable vendor/product identifier, used to pick a status icon
    fn vendor_product(&self) -> &'static str;

    /// Time between poll cycles
    fn poll_interval(&self) -> Duration;

    /// Open a link to the scale
    fn establish_connection(&self) -> Result<Connection, ProtocolError>;

    /// Request, read and decode one reading, merged onto `current`.
    ///
    /// Does not publish anything; the caller decides what to do with the result.
    fn acquire_reading(
        &self,
        conn: &mut Connection,
        current: &Reading,
    ) -> Result<Reading, ProtocolError>;
}

/// Protocol selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverKind {
    /// Mettler Toledo 8217 over a serial line
    #[default]
    #[serde(rename = "mettler_toledo_8217")]
    MettlerToledo8217,
    /// Simulated 8217 scale, no hardware needed
    Demo,
}

/// Build the driver named by the config
pub fn build_driver(config: &DriverConfig) -> Box<dyn ScaleDriver> {
    match config.driver {
        DriverKind::MettlerToledo8217 => Box::new(MettlerToledo8217::new(config)),
        DriverKind::Demo => Box::new(DemoDriver::new(config)),
    }
}
