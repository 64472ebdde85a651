//! Driver status for presentation layers
//!
//! [`ScaleMonitor`] is what a web page or CLI talks to: it starts the poll
//! loop for a configured driver and answers status queries from the store
//! without touching the serial line.

use serde::Serialize;
use std::collections::BTreeMap;
use std::io;

use crate::config::DriverConfig;
use crate::driver::{build_driver, ScaleDriver};
use crate::poll::{ConnectionLossPolicy, PollCounters, PollHandle, PollLoop};
use crate::reading::{Reading, ScaleStatus};
use crate::store::ReadingStore;

/// Directory holding vendor icons
pub const IMAGE_DIR: &str = "static/images";

/// Icon path for a vendor/product identifier
pub fn image_asset(vendor_product: &str) -> Option<String> {
    if vendor_product.is_empty() {
        None
    } else {
        Some(format!("{}/{}.png", IMAGE_DIR, vendor_product))
    }
}

/// A running driver and its store
pub struct ScaleMonitor {
    handle: PollHandle,
    store: ReadingStore,
}

impl ScaleMonitor {
    /// Build the configured driver and start polling it
    pub fn start(config: &DriverConfig) -> io::Result<Self> {
        Self::with_driver(build_driver(config), config.on_connection_loss)
    }

    /// Start polling an already constructed driver
    pub fn with_driver(
        driver: Box<dyn ScaleDriver>,
        policy: ConnectionLossPolicy,
    ) -> io::Result<Self> {
        let (poll_loop, store) = PollLoop::new(driver, policy);
        let handle = poll_loop.spawn()?;
        Ok(Self { handle, store })
    }

    /// Current status
    pub fn get_status(&self) -> ScaleStatus {
        self.store.snapshot().status
    }

    /// Vendor/product identifier of the driver
    pub fn get_vendor_product(&self) -> &'static str {
        self.handle.vendor_product()
    }

    /// Copy of the latest reading
    pub fn get_last_reading(&self) -> Reading {
        self.store.snapshot()
    }

    /// Read handle for async consumers
    pub fn store(&self) -> ReadingStore {
        self.store.clone()
    }

    /// Poll loop counters
    pub fn counters(&self) -> PollCounters {
        self.handle.counters()
    }

    /// Status line for the status page
    pub fn status_info(&self) -> DriverStatusInfo {
        DriverStatusInfo {
            state: self.get_status(),
            image: image_asset(self.get_vendor_product()),
        }
    }

    /// Stop polling and close the connection
    pub fn stop(self) {
        self.handle.stop();
    }
}

/// One row of the status report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverStatusInfo {
    /// Driver status
    pub state: ScaleStatus,
    /// Icon path, if the driver has a vendor identifier
    pub image: Option<String>,
}

/// Named set of running monitors
#[derive(Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, ScaleMonitor>,
}

impl DriverRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a monitor, returning any monitor previously under that name
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        monitor: ScaleMonitor,
    ) -> Option<ScaleMonitor> {
        self.drivers.insert(name.into(), monitor)
    }

    /// Look up a monitor by name
    pub fn get(&self, name: &str) -> Option<&ScaleMonitor> {
        self.drivers.get(name)
    }

    /// Number of registered drivers
    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    /// Whether no drivers are registered
    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Status of every registered driver, keyed by name
    pub fn status_report(&self) -> BTreeMap<String, DriverStatusInfo> {
        self.drivers
            .iter()
            .map(|(name, monitor)| (name.clone(), monitor.status_info()))
            .collect()
    }

    /// Stop every monitor
    pub fn stop_all(self) {
        for (name, monitor) in self.drivers {
            tracing::debug!(driver = %name, "stopping");
            monitor.stop();
        }
    }
}
