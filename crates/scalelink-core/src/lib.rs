//! # ScaleLink Core Library
//!
//! Core functionality for polling serial weighing scales.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Mettler Toledo 8217 serial protocol (frame reader and payload parser)
//! - A driver trait so further scale protocols can be added
//! - A poll loop running on its own thread with reconnect handling
//! - A single-writer store holding the latest reading
//! - Status queries for presentation layers
//!
//! ## Supported Scales
//!
//! - Mettler Toledo 8217 protocol
//! - Simulated scale (demo mode)
//!
//! ## Example
//!
//! ```rust,ignore
//! use scalelink_core::{config::DriverConfig, status::ScaleMonitor};
//!
//! let config = DriverConfig::from_file("scalelink.json")?;
//! let monitor = ScaleMonitor::start(&config)?;
//!
//! println!("{}: {:?}", monitor.get_status(), monitor.get_last_reading().value);
//! monitor.stop();
//! ```

pub mod config;
pub mod demo;
pub mod driver;
pub mod poll;
pub mod protocol;
pub mod reading;
pub mod status;
pub mod store;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConfigError, DriverConfig};
    pub use crate::driver::{build_driver, DriverKind, ScaleDriver};
    pub use crate::poll::{ConnectionLossPolicy, PollHandle, PollLoop, PollState};
    pub use crate::protocol::{Connection, ProtocolError};
    pub use crate::reading::{Reading, ScaleStatus};
    pub use crate::status::{DriverRegistry, DriverStatusInfo, ScaleMonitor};
    pub use crate::store::{ReadingPublisher, ReadingStore};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
