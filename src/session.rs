//! Asynchronous driver around a [`Round`].
//!
//! The session runs as a single tokio task. User actions arrive through a
//! mailbox, the dealer's paced draws are timer ticks inside the same task,
//! and queued stat writes are polled alongside both. Nothing ever touches the
//! round concurrently, so Hit and Stay are simply rejected by the round while
//! the dealer is drawing, and a Deal cancels the pending tick.

use std::fmt;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::outcome::Outcome;
use crate::round::{Round, Snapshot};
use crate::stats::Totals;

const NOTICE_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause after each dealer draw before the next decision.
    pub dealer_delay: Duration,
    /// Requests buffered before callers wait.
    pub mailbox: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dealer_delay: Duration::from_millis(500),
            mailbox: 16,
        }
    }
}

/// One-shot outcome notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub outcome: Outcome,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.outcome.message())
    }
}

#[derive(Debug, Clone, Copy)]
enum Request {
    Deal,
    Hit,
    Stay,
    ResetTotals,
    Restart,
}

struct Message {
    request: Request,
    response: oneshot::Sender<Result<()>>,
}

pub struct Session {
    round: Round,
    config: SessionConfig,
    mailbox: mpsc::Receiver<Message>,
    snapshots: watch::Sender<Snapshot>,
    notices: broadcast::Sender<Notice>,
    dealer_due: Option<Instant>,
}

impl Session {
    /// Moves the round into a new task and returns a handle to drive it.
    ///
    /// The task ends once every handle is dropped, after flushing pending
    /// stat writes.
    pub fn spawn(round: Round, config: SessionConfig) -> (SessionHandle, JoinHandle<()>) {
        let (sender, mailbox) = mpsc::channel(config.mailbox.max(1));
        let (snapshots, snapshot_receiver) = watch::channel(round.snapshot());
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        let handle = SessionHandle {
            sender,
            snapshots: snapshot_receiver,
            notices: notices.clone(),
            totals: round.store().subscribe(),
        };
        let session = Session {
            round,
            config,
            mailbox,
            snapshots,
            notices,
            dealer_due: None,
        };
        (handle, tokio::spawn(session.run()))
    }

    async fn run(mut self) {
        loop {
            let dealer_due = self.dealer_due;
            let writes_pending = self.round.pending_writes() > 0;
            tokio::select! {
                message = self.mailbox.recv() => {
                    let Some(Message { request, response }) = message else {
                        break;
                    };
                    let result = self.handle(request);
                    self.publish();
                    if let Ok(Some(outcome)) = result {
                        self.announce(outcome);
                    }
                    let _ = response.send(result.map(|_| ()));
                }
                _ = time::sleep_until(dealer_due.unwrap_or_else(Instant::now)), if dealer_due.is_some() => {
                    let outcome = self.dealer_tick();
                    self.publish();
                    if let Some(outcome) = outcome {
                        self.announce(outcome);
                    }
                }
                Some(()) = self.round.next_write(), if writes_pending => {}
            }
        }
        self.round.flush().await;
        debug!("session closed");
    }

    fn handle(&mut self, request: Request) -> Result<Option<Outcome>> {
        match request {
            Request::Deal => {
                if self.dealer_due.take().is_some() {
                    info!("dealer turn cancelled by a new deal");
                }
                self.round.deal()?;
                Ok(None)
            }
            Request::Hit => self.round.hit(),
            Request::Stay => {
                self.round.stay()?;
                Ok(self.dealer_tick())
            }
            Request::ResetTotals => {
                self.round.reset_totals();
                Ok(None)
            }
            Request::Restart => {
                self.dealer_due = None;
                self.round.restart_session()?;
                Ok(None)
            }
        }
    }

    // Draw and wait, or stand and resolve.
    fn dealer_tick(&mut self) -> Option<Outcome> {
        self.dealer_due = None;
        if self.round.dealer_should_draw() {
            match self.round.dealer_draw() {
                Ok(card) => {
                    debug!(%card, score = self.round.dealer().score(), "dealer drew");
                    self.dealer_due = Some(Instant::now() + self.config.dealer_delay);
                }
                Err(err) => error!(?err, "dealer could not draw"),
            }
            return None;
        }
        match self.round.finish_dealer() {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                error!(?err, "dealer turn could not be resolved");
                None
            }
        }
    }

    fn announce(&self, outcome: Outcome) {
        // No subscribers is fine.
        let _ = self.notices.send(Notice { outcome });
    }

    fn publish(&self) {
        let next = self.round.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

/// Cloneable front door to a running [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    sender: mpsc::Sender<Message>,
    snapshots: watch::Receiver<Snapshot>,
    notices: broadcast::Sender<Notice>,
    totals: watch::Receiver<Totals>,
}

impl SessionHandle {
    pub async fn deal(&self) -> Result<()> {
        self.request(Request::Deal).await
    }

    pub async fn hit(&self) -> Result<()> {
        self.request(Request::Hit).await
    }

    pub async fn stay(&self) -> Result<()> {
        self.request(Request::Stay).await
    }

    pub async fn reset_totals(&self) -> Result<()> {
        self.request(Request::ResetTotals).await
    }

    /// Zeroes the session counters and deals a fresh round.
    pub async fn restart(&self) -> Result<()> {
        self.request(Request::Restart).await
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn snapshots(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Outcome notifications published after this call.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn totals(&self) -> watch::Receiver<Totals> {
        self.totals.clone()
    }

    async fn request(&self, request: Request) -> Result<()> {
        let (response, receiver) = oneshot::channel();
        self.sender
            .send(Message { request, response })
            .await
            .map_err(|_| Error::SessionClosed)?;
        receiver.await.map_err(|_| Error::SessionClosed)?
    }
}
