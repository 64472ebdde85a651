//! Poll loop
//!
//! Drives one [`ScaleDriver`] at a fixed cadence on a dedicated thread and
//! publishes every result into the reading store. The loop is the only
//! holder of the store's [`ReadingPublisher`].
//!
//! States: `Disconnected` (no link, try to open one each cycle) and
//! `Connected` (link open, poll each cycle). A connection loss drops the link
//! and returns to `Disconnected`; a parse error only skips the cycle.

use serde::{Deserialize, Serialize};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::driver::ScaleDriver;
use crate::protocol::{Connection, ProtocolError};
use crate::reading::{Reading, ScaleStatus};
use crate::store::{reading_store, ReadingPublisher, ReadingStore};

/// What to publish when the link drops while polling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionLossPolicy {
    /// Clear the weight and report `disconnected`
    #[default]
    Disconnected,
    /// Keep the last weight and report `stale`
    Stale,
}

/// Poll loop state between cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No open link
    Disconnected,
    /// Link open, next cycle polls
    Connected,
}

/// Running counters, shared with the [`PollHandle`]
#[derive(Debug, Default)]
struct PollStats {
    cycles: AtomicU64,
    readings: AtomicU64,
    parse_errors: AtomicU64,
    connection_losses: AtomicU64,
    failed_connects: AtomicU64,
}

impl PollStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn counters(&self) -> PollCounters {
        PollCounters {
            cycles: self.cycles.load(Ordering::Relaxed),
            readings: self.readings.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            connection_losses: self.connection_losses.load(Ordering::Relaxed),
            failed_connects: self.failed_connects.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the poll loop counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollCounters {
    /// Cycles run
    pub cycles: u64,
    /// Readings published from a decoded frame
    pub readings: u64,
    /// Cycles skipped because of an unparseable frame
    pub parse_errors: u64,
    /// Links dropped on read/write failure or timeout
    pub connection_losses: u64,
    /// Failed attempts to open a link
    pub failed_connects: u64,
}

/// Poll loop for one driver
pub struct PollLoop {
    driver: Box<dyn ScaleDriver>,
    publisher: ReadingPublisher,
    connection: Option<Connection>,
    policy: ConnectionLossPolicy,
    stats: Arc<PollStats>,
    /// Consecutive failed connection attempts
    connect_failures: u32,
}

impl PollLoop {
    /// Create a loop and the read handle of the store it publishes to
    pub fn new(driver: Box<dyn ScaleDriver>, policy: ConnectionLossPolicy) -> (Self, ReadingStore) {
        let (publisher, store) = reading_store(Reading::initial());
        let poll_loop = Self {
            driver,
            publisher,
            connection: None,
            policy,
            stats: Arc::new(PollStats::default()),
            connect_failures: 0,
        };
        (poll_loop, store)
    }

    /// Current state
    pub fn state(&self) -> PollState {
        if self.connection.is_some() {
            PollState::Connected
        } else {
            PollState::Disconnected
        }
    }

    /// Counters so far
    pub fn counters(&self) -> PollCounters {
        self.stats.counters()
    }

    /// Run one cycle and return the state the loop ends up in
    pub fn poll_once(&mut self) -> PollState {
        PollStats::bump(&self.stats.cycles);

        if self.connection.is_none() && !self.connect() {
            return PollState::Disconnected;
        }
        let Some(conn) = self.connection.as_mut() else {
            return PollState::Disconnected;
        };

        let current = self.publisher.snapshot();
        match self.driver.acquire_reading(conn, &current) {
            Ok(reading) => {
                PollStats::bump(&self.stats.readings);
                self.publisher.publish(reading);
            }
            Err(e) if e.is_connection_loss() => self.drop_connection(e, &current),
            Err(e) => {
                PollStats::bump(&self.stats.parse_errors);
                tracing::warn!(
                    driver = self.driver.vendor_product(),
                    "skipping cycle: {}",
                    e
                );
            }
        }
        self.state()
    }

    fn connect(&mut self) -> bool {
        match self.driver.establish_connection() {
            Ok(conn) => {
                if self.connect_failures > 0 {
                    tracing::info!(
                        driver = self.driver.vendor_product(),
                        link = conn.name(),
                        "scale reconnected after {} failed attempts",
                        self.connect_failures
                    );
                } else {
                    tracing::info!(
                        driver = self.driver.vendor_product(),
                        link = conn.name(),
                        "scale connected"
                    );
                }
                self.connect_failures = 0;
                self.connection = Some(conn);
                true
            }
            Err(e) => {
                PollStats::bump(&self.stats.failed_connects);
                if self.connect_failures == 0 {
                    tracing::error!(
                        driver = self.driver.vendor_product(),
                        "cannot connect to scale, retrying every {:?}: {}",
                        self.driver.poll_interval(),
                        e
                    );
                } else {
                    tracing::debug!(
                        driver = self.driver.vendor_product(),
                        attempt = self.connect_failures + 1,
                        "connect failed: {}",
                        e
                    );
                }
                self.connect_failures = self.connect_failures.saturating_add(1);
                self.publisher.publish(Reading::disconnected());
                false
            }
        }
    }

    fn drop_connection(&mut self, err: ProtocolError, prior: &Reading) {
        PollStats::bump(&self.stats.connection_losses);
        if let Some(conn) = self.connection.take() {
            tracing::warn!(
                driver = self.driver.vendor_product(),
                link = conn.name(),
                "connection lost: {}",
                err
            );
        }
        self.publisher.publish(self.loss_reading(prior));
    }

    fn loss_reading(&self, prior: &Reading) -> Reading {
        let has_value = prior.value.is_some() && prior.status != ScaleStatus::Disconnected;
        match self.policy {
            ConnectionLossPolicy::Stale if has_value => Reading::stale_from(prior),
            _ => Reading::disconnected(),
        }
    }

    /// Run cycles until a stop signal arrives or the sender is dropped.
    ///
    /// The stop signal is checked between cycles; a serial read in progress
    /// runs to completion or timeout first.
    pub fn run(mut self, stop: mpsc::Receiver<()>) {
        let interval = self.driver.poll_interval();
        tracing::info!(
            driver = self.driver.vendor_product(),
            "poll loop started, interval {:?}",
            interval
        );

        loop {
            self.poll_once();
            match stop.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Dropping the connection closes the port
        self.connection = None;
        self.publisher.publish(Reading::disconnected());
        tracing::info!(
            driver = self.driver.vendor_product(),
            "poll loop stopped after {} cycles",
            self.stats.counters().cycles
        );
    }

    /// Start the loop on its own thread
    pub fn spawn(self) -> io::Result<PollHandle> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let store = self.publisher.subscribe();
        let stats = Arc::clone(&self.stats);
        let vendor_product = self.driver.vendor_product();

        let join = thread::Builder::new()
            .name("scale-poll".to_string())
            .spawn(move || self.run(stop_rx))?;

        Ok(PollHandle {
            stop_tx: Some(stop_tx),
            join: Some(join),
            store,
            stats,
            vendor_product,
        })
    }
}

/// Handle to a running poll loop
pub struct PollHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    join: Option<JoinHandle<()>>,
    store: ReadingStore,
    stats: Arc<PollStats>,
    vendor_product: &'static str,
}

impl PollHandle {
    /// Read handle onto the loop's store
    pub fn store(&self) -> ReadingStore {
        self.store.clone()
    }

    /// Vendor/product identifier of the driver being polled
    pub fn vendor_product(&self) -> &'static str {
        self.vendor_product
    }

    /// Counters so far
    pub fn counters(&self) -> PollCounters {
        self.stats.counters()
    }

    /// Whether the poll thread is still running
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    /// Signal the loop to stop and wait for it to close the connection
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // Err means the loop already exited
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                tracing::error!(driver = self.vendor_product, "poll thread panicked");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
