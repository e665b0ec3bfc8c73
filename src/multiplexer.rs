//! Bounded multiplexing of concurrent transfers.
//!
//! A [`Multiplexer`] owns the set of in-flight transfers and a FIFO queue of
//! transfers waiting for a slot. All of it lives inside the future returned by
//! [`Multiplexer::drive`]; the rest of the program talks to it through a
//! cloneable [`MultiplexerHandle`] and gets each result back through a
//! [`TransferHandle`].
//!
//! ```no_run
//! use estransport::multiplexer::Multiplexer;
//! use std::time::Duration;
//!
//! # async fn example() -> estransport::Result<()> {
//! let (multiplexer, handle) = Multiplexer::new(8)?;
//! let driver = tokio::spawn(multiplexer.drive(Duration::from_secs(1)));
//!
//! // ... hand `handle` to one or more transports ...
//!
//! handle.stop();
//! let stats = driver.await.expect("drive loop panicked");
//! println!("peak concurrency: {}", stats.peak_active);
//! # Ok(())
//! # }
//! ```

use crate::connection::{Connection, EngineError, PreparedRequest, RawExchange, TransferFailure, TransferResponse};
use crate::{Error, Result};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// The single result of a transfer.
pub type TransferOutcome = std::result::Result<TransferResponse, TransferFailure>;

/// How a transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Success,
    Failure,
}

/// Lifecycle of a [`Transfer`].
///
/// `Created -> Queued -> Active -> Resolved -> Closed`. `Queued` is skipped
/// when a slot is free and nothing is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Created,
    Queued,
    Active,
    Resolved(Resolution),
    Closed,
}

/// One physical attempt of a request on one connection.
///
/// Retries create new transfers.
#[derive(Debug)]
pub struct Transfer {
    id: u64,
    request: PreparedRequest,
    connection: Arc<Connection>,
    state: TransferState,
    outcome: Option<oneshot::Sender<TransferOutcome>>,
}

impl Transfer {
    pub fn new(connection: Arc<Connection>, request: PreparedRequest) -> Self {
        Self {
            id: 0,
            request,
            connection,
            state: TransferState::Created,
            outcome: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn request(&self) -> &PreparedRequest {
        &self.request
    }

    /// Writes the outcome. The slot is consumed, so later calls are no-ops.
    fn resolve(&mut self, outcome: TransferOutcome) {
        let Some(slot) = self.outcome.take() else {
            return;
        };
        self.state = TransferState::Resolved(match outcome {
            Ok(_) => Resolution::Success,
            Err(_) => Resolution::Failure,
        });
        // The caller may have stopped waiting; that is not an error here.
        let _ = slot.send(outcome);
        self.state = TransferState::Closed;
    }
}

/// Counters reported when the drive loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiplexerStats {
    /// Transfers accepted for execution.
    pub submitted: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Transfers refused because the multiplexer was stopping.
    pub rejected: usize,
    pub peak_active: usize,
    pub peak_waiting: usize,
}

#[derive(Debug)]
enum Command {
    Submit(Transfer),
    Stop,
}

/// Bounded active count plus FIFO waiting queue.
#[derive(Debug)]
struct Registry<T> {
    max_active: usize,
    active: usize,
    waiting: VecDeque<T>,
    peak_active: usize,
    peak_waiting: usize,
}

impl<T> Registry<T> {
    fn new(max_active: usize) -> Self {
        Self {
            max_active,
            active: 0,
            waiting: VecDeque::new(),
            peak_active: 0,
            peak_waiting: 0,
        }
    }

    /// A new item may start right away without overtaking a waiting one.
    fn can_start(&self) -> bool {
        self.active < self.max_active && self.waiting.is_empty()
    }

    /// Returns the item if it may start now, otherwise queues it.
    fn admit(&mut self, item: T) -> Option<T> {
        if self.can_start() {
            self.occupy();
            Some(item)
        } else {
            self.waiting.push_back(item);
            self.peak_waiting = self.peak_waiting.max(self.waiting.len());
            None
        }
    }

    /// Pops the oldest waiting item if a slot is free.
    fn promote(&mut self) -> Option<T> {
        if self.active >= self.max_active {
            return None;
        }
        let item = self.waiting.pop_front()?;
        self.occupy();
        Some(item)
    }

    fn release(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    fn occupy(&mut self) {
        self.active += 1;
        self.peak_active = self.peak_active.max(self.active);
    }

    fn is_idle(&self) -> bool {
        self.active == 0 && self.waiting.is_empty()
    }
}

type Harvest = (Transfer, std::result::Result<RawExchange, EngineError>);

/// Owner of all in-flight transfers. Consumed by [`Multiplexer::drive`].
pub struct Multiplexer {
    commands: mpsc::UnboundedReceiver<Command>,
    registry: Registry<Transfer>,
    in_flight: FuturesUnordered<BoxFuture<'static, Harvest>>,
    stats: MultiplexerStats,
    stopping: bool,
}

impl Multiplexer {
    /// Creates a multiplexer allowing `max_active` concurrent transfers.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `max_active` is zero.
    pub fn new(max_active: usize) -> Result<(Self, MultiplexerHandle)> {
        if max_active == 0 {
            return Err(Error::Configuration(
                "max_active must be at least 1".to_string(),
            ));
        }

        let (sender, commands) = mpsc::unbounded_channel();
        let multiplexer = Self {
            commands,
            registry: Registry::new(max_active),
            in_flight: FuturesUnordered::new(),
            stats: MultiplexerStats::default(),
            stopping: false,
        };
        let handle = MultiplexerHandle {
            commands: sender,
            next_id: Arc::new(AtomicU64::new(1)),
        };
        Ok((multiplexer, handle))
    }

    /// Runs transfers until stopped and drained.
    ///
    /// Stop is observed from [`MultiplexerHandle::stop`] or from every handle
    /// being dropped. Active and queued transfers still run to completion;
    /// submissions arriving afterwards resolve as closed. `poll_timeout`
    /// bounds each idle wait.
    pub async fn drive(mut self, poll_timeout: Duration) -> MultiplexerStats {
        let mut open = true;
        tracing::debug!(max_active = self.registry.max_active, "Multiplexer started");

        loop {
            while let Some(transfer) = self.registry.promote() {
                self.start(transfer);
            }
            if self.stopping && self.registry.is_idle() {
                break;
            }

            tokio::select! {
                command = self.commands.recv(), if open => match command {
                    Some(Command::Submit(transfer)) => self.admit(transfer),
                    Some(Command::Stop) => self.stopping = true,
                    None => {
                        open = false;
                        self.stopping = true;
                    }
                },
                Some(harvest) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.harvest(harvest);
                    while let Some(Some(harvest)) = self.in_flight.next().now_or_never() {
                        self.harvest(harvest);
                    }
                },
                _ = tokio::time::sleep(poll_timeout) => {
                    tracing::trace!(
                        active = self.registry.active,
                        waiting = self.registry.waiting.len(),
                        "Multiplexer idle"
                    );
                }
            }
        }

        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            if let Command::Submit(transfer) = command {
                self.reject(transfer);
            }
        }

        self.stats.peak_active = self.registry.peak_active;
        self.stats.peak_waiting = self.registry.peak_waiting;
        tracing::debug!(
            completed = self.stats.completed,
            failed = self.stats.failed,
            peak_active = self.stats.peak_active,
            "Multiplexer drained"
        );
        self.stats
    }

    fn admit(&mut self, mut transfer: Transfer) {
        if self.stopping {
            self.reject(transfer);
            return;
        }
        self.stats.submitted += 1;
        if !self.registry.can_start() {
            transfer.state = TransferState::Queued;
        }
        if let Some(transfer) = self.registry.admit(transfer) {
            self.start(transfer);
        }
    }

    fn reject(&mut self, mut transfer: Transfer) {
        self.stats.rejected += 1;
        transfer.resolve(Err(TransferFailure::Closed));
    }

    fn start(&mut self, mut transfer: Transfer) {
        transfer.state = TransferState::Active;
        tracing::trace!(transfer = transfer.id, url = %transfer.request.url, "Transfer started");
        self.in_flight.push(
            async move {
                let result = transfer.connection.perform(&transfer.request).await;
                (transfer, result)
            }
            .boxed(),
        );
    }

    fn harvest(&mut self, (mut transfer, result): Harvest) {
        self.registry.release();
        self.stats.completed += 1;

        let outcome = result
            .map_err(TransferFailure::Engine)
            .and_then(|exchange| Connection::resolve(exchange, &transfer.request.ignore));
        match &outcome {
            Ok(response) => {
                self.stats.succeeded += 1;
                tracing::trace!(transfer = transfer.id, status = response.status.as_u16(), "Transfer done");
            }
            Err(failure) => {
                self.stats.failed += 1;
                tracing::trace!(transfer = transfer.id, error = %failure, "Transfer failed");
            }
        }
        transfer.resolve(outcome);
    }
}

/// Cloneable submission side of a [`Multiplexer`].
#[derive(Debug, Clone)]
pub struct MultiplexerHandle {
    commands: mpsc::UnboundedSender<Command>,
    next_id: Arc<AtomicU64>,
}

impl MultiplexerHandle {
    /// Hands a transfer to the drive loop.
    ///
    /// If the drive loop is gone the transfer resolves as closed right away.
    pub fn submit(&self, mut transfer: Transfer) -> TransferHandle {
        let (slot, receiver) = oneshot::channel();
        transfer.id = self.next_id.fetch_add(1, Ordering::Relaxed);
        transfer.outcome = Some(slot);

        if let Err(mpsc::error::SendError(command)) = self.commands.send(Command::Submit(transfer)) {
            if let Command::Submit(mut transfer) = command {
                transfer.resolve(Err(TransferFailure::Closed));
            }
        }
        TransferHandle { receiver }
    }

    /// Asks the drive loop to finish its current work and exit.
    pub fn stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }

    /// Returns `true` once the drive loop has exited.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Receives the outcome of one submitted transfer.
#[derive(Debug)]
pub struct TransferHandle {
    receiver: oneshot::Receiver<TransferOutcome>,
}

impl TransferHandle {
    /// Waits for the outcome.
    pub async fn outcome(self) -> TransferOutcome {
        self.receiver.await.unwrap_or(Err(TransferFailure::Closed))
    }
}
