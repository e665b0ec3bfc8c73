//! Connection pool for transports.
//!
//! Set of node connections with round-robin dispatch. Entries that failed
//! with a retryable error are marked dead and skipped while a live one
//! exists; they come back on their next success. Node discovery replaces the
//! whole set at once with [`ConnectionPool::rebuild`].

use crate::connection::Connection;
use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use url::Url;

/// A node connection and its liveness flag.
#[derive(Debug)]
pub struct PoolEntry {
    connection: Arc<Connection>,
    dead: AtomicBool,
}

impl PoolEntry {
    fn new(connection: Connection) -> Self {
        Self {
            connection: Arc::new(connection),
            dead: AtomicBool::new(false),
        }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Relaxed)
    }

    pub fn mark_dead(&self) {
        if !self.dead.swap(true, Ordering::Relaxed) {
            tracing::warn!(url = %self.connection.base_url(), "Marking connection dead");
        }
    }

    pub fn mark_live(&self) {
        if self.dead.swap(false, Ordering::Relaxed) {
            tracing::info!(url = %self.connection.base_url(), "Connection revived");
        }
    }
}

type Entries = Arc<Vec<Arc<PoolEntry>>>;

/// A pool with round-robin dispatch over a replaceable set of entries.
#[derive(Debug)]
pub struct ConnectionPool {
    entries: RwLock<Entries>,
    next: AtomicUsize,
}

impl ConnectionPool {
    /// Creates a pool over `connections`, all starting live.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `connections` is empty.
    pub fn new(connections: Vec<Connection>) -> Result<Self> {
        if connections.is_empty() {
            return Err(Error::Configuration(
                "at least one node URL is required".to_string(),
            ));
        }
        let entries = connections
            .into_iter()
            .map(|connection| Arc::new(PoolEntry::new(connection)))
            .collect();
        Ok(Self {
            entries: RwLock::new(Arc::new(entries)),
            next: AtomicUsize::new(0),
        })
    }

    /// Returns the next live entry in rotation.
    ///
    /// When every entry is dead the next one in rotation is returned anyway.
    pub fn next(&self) -> Arc<PoolEntry> {
        let entries = self.entries();
        let size = entries.len();
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        for offset in 0..size {
            let entry = &entries[(start + offset) % size];
            if !entry.is_dead() {
                if offset > 0 {
                    // Keep the rotation moving past the skipped entries.
                    self.next.fetch_add(offset, Ordering::Relaxed);
                }
                return Arc::clone(entry);
            }
        }
        Arc::clone(&entries[start % size])
    }

    /// Snapshot of the current entries.
    pub fn entries(&self) -> Arc<Vec<Arc<PoolEntry>>> {
        match self.entries.read() {
            Ok(entries) => Arc::clone(&entries),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replaces the entries with one per URL in `urls`.
    ///
    /// Entries whose URL is kept are reused and marked live; `connect` builds
    /// the others. On error the pool is left unchanged.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `urls` is empty, or the first error
    /// of `connect`.
    pub fn rebuild<F>(&self, urls: Vec<Url>, mut connect: F) -> Result<usize>
    where
        F: FnMut(Url) -> Result<Connection>,
    {
        if urls.is_empty() {
            return Err(Error::Configuration(
                "node discovery returned no nodes".to_string(),
            ));
        }

        let current = self.entries();
        let mut entries = Vec::with_capacity(urls.len());
        for url in urls {
            let reused = current
                .iter()
                .find(|entry| entry.connection().base_url() == &url);
            match reused {
                Some(entry) => {
                    entry.mark_live();
                    entries.push(Arc::clone(entry));
                }
                None => entries.push(Arc::new(PoolEntry::new(connect(url)?))),
            }
        }

        let size = entries.len();
        let entries = Arc::new(entries);
        match self.entries.write() {
            Ok(mut slot) => *slot = entries,
            Err(poisoned) => *poisoned.into_inner() = entries,
        }
        tracing::info!(nodes = size, previous = current.len(), "Connection pool rebuilt");
        Ok(size)
    }

    /// Number of entries not marked dead.
    pub fn live_count(&self) -> usize {
        self.entries().iter().filter(|entry| !entry.is_dead()).count()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
