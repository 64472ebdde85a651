//! Shared reading store
//!
//! Single writer, many readers. The poll loop owns the only
//! [`ReadingPublisher`]; everyone else gets a cloneable [`ReadingStore`].
//! Publishing replaces the whole [`Reading`] under a short lock, and readers
//! copy it out under the same lock, so a snapshot never mixes fields from two
//! cycles and no lock is ever held across serial I/O.

use tokio::sync::watch;

use crate::reading::Reading;

/// Create a store holding `initial`, returning the write capability and a read handle
pub fn reading_store(initial: Reading) -> (ReadingPublisher, ReadingStore) {
    let (tx, rx) = watch::channel(initial);
    (ReadingPublisher { tx }, ReadingStore { rx })
}

/// Write side of the store. Not `Clone`: there is one writer per driver.
#[derive(Debug)]
pub struct ReadingPublisher {
    tx: watch::Sender<Reading>,
}

impl ReadingPublisher {
    /// Atomically replace the stored reading
    pub fn publish(&self, reading: Reading) {
        self.tx.send_replace(reading);
    }

    /// Copy of the current reading
    pub fn snapshot(&self) -> Reading {
        self.tx.borrow().clone()
    }

    /// A new read handle onto this store
    pub fn subscribe(&self) -> ReadingStore {
        ReadingStore {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read side of the store
#[derive(Debug, Clone)]
pub struct ReadingStore {
    rx: watch::Receiver<Reading>,
}

impl ReadingStore {
    /// Copy of the most recently published reading
    pub fn snapshot(&self) -> Reading {
        self.rx.borrow().clone()
    }

    /// Wait for the next publish and return it.
    ///
    /// Returns `None` once the publisher is gone (poll loop stopped).
    pub async fn changed(&mut self) -> Option<Reading> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Whether the poll loop feeding this store is still alive
    pub fn is_live(&self) -> bool {
        self.rx.has_changed().is_ok()
    }
}
