//! The link: one managed connection that reconnects by itself.
//!
//! A [`Link`] runs in its own Tokio task and exclusively owns the current
//! [`Connection`]. The rest of the program talks to it through a cheap
//! [`LinkHandle`] (outbound frames, close requests, health) and receives
//! everything that happens on the wire as [`LinkEvent`]s.
//!
//! ```text
//!           connect ok                      peer closes / error
//! Connecting ─────────→ Connected ─────────────────────────→ Reconnecting{n}
//!     │                    ↑   │                                 │
//!     │ connect fails      │   │ close()                         │ backoff elapsed
//!     └──→ Reconnecting{1} │   ▼                                 │
//!                          │ Closed                              │
//!                          └─────────────────────────────────────┘
//!                                 (retry cap reached → GaveUp)
//! ```
//!
//! Reconnecting never replays anything: frames submitted while the link is
//! down are rejected with [`TransportError::NotConnected`], and the consumer
//! learns about the new connection through [`LinkEvent::Reconnected`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{Connection, ConnectionId, Connector, ReconnectPolicy, TransportError};

/// Observable health of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// First connection attempt in progress.
    Connecting,
    /// A connection is open; frames can be sent.
    Connected,
    /// The connection was lost; waiting to retry.
    Reconnecting {
        /// 1-based retry counter since the last successful connect.
        attempt: u32,
    },
    /// Closed at the caller's request. Terminal.
    Closed,
    /// The retry cap was reached. Terminal.
    GaveUp,
}

impl LinkState {
    /// Returns `true` if frames can be sent right now.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns `true` if the link task has stopped for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::GaveUp)
    }
}

/// Everything the link reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// The first connection opened.
    Connected(ConnectionId),
    /// One inbound frame.
    Message(Vec<u8>),
    /// The current connection ended. `requested` is `true` only when the
    /// caller asked for it; otherwise a reconnect follows.
    Closed { reason: String, requested: bool },
    /// A retry is scheduled after `delay`.
    Reconnecting { attempt: u32, delay: Duration },
    /// A connection opened again after a loss.
    Reconnected(ConnectionId),
    /// The retry cap was reached; the link has stopped.
    GaveUp { attempts: u32 },
}

/// Commands from handles to the link task.
enum LinkCommand {
    Send(Vec<u8>),
    Close,
}

/// Handle to a running link. Cheap to clone.
///
/// Dropping every handle closes the link.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    endpoint: Arc<str>,
    commands: mpsc::UnboundedSender<LinkCommand>,
    state: watch::Receiver<LinkState>,
}

impl std::fmt::Debug for LinkCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send(frame) => write!(f, "Send({} bytes)", frame.len()),
            Self::Close => write!(f, "Close"),
        }
    }
}

impl LinkHandle {
    /// Queues one frame for sending. Never waits on the network.
    ///
    /// # Errors
    /// - [`TransportError::NotConnected`]: no connection is open right now
    /// - [`TransportError::Shutdown`]: the link task has stopped
    pub fn send(&self, frame: Vec<u8>) -> Result<(), TransportError> {
        let state = *self.state.borrow();
        if state.is_terminal() {
            return Err(TransportError::Shutdown);
        }
        if !state.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.commands
            .send(LinkCommand::Send(frame))
            .map_err(|_| TransportError::Shutdown)
    }

    /// Asks the link to close its connection and stop. No reconnect follows.
    pub fn close(&self) {
        // The task may already be gone; nothing left to close then.
        let _ = self.commands.send(LinkCommand::Close);
    }

    /// Returns the current health.
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Returns a receiver that observes every health change.
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.clone()
    }

    /// The endpoint this link dials.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// How a connection's pump loop ended.
enum PumpExit {
    /// The caller closed the link (or every handle/receiver is gone).
    Requested,
    /// The connection failed underneath us.
    Dropped(String),
}

/// The link task state. Created and started by [`Link::spawn`].
pub struct Link<C: Connector> {
    connector: C,
    endpoint: Arc<str>,
    policy: ReconnectPolicy,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
    events: mpsc::Sender<LinkEvent>,
    state: watch::Sender<LinkState>,
}

impl<C: Connector> Link<C> {
    /// Starts a link task dialing `endpoint`.
    ///
    /// Returns the handle and the event receiver. `capacity` bounds the
    /// event channel; a slow consumer applies backpressure to reads.
    pub fn spawn(
        connector: C,
        endpoint: impl Into<String>,
        policy: ReconnectPolicy,
        capacity: usize,
    ) -> (LinkHandle, mpsc::Receiver<LinkEvent>) {
        let endpoint: Arc<str> = Arc::from(endpoint.into());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(capacity.max(1));
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);

        let link = Self {
            connector,
            endpoint: Arc::clone(&endpoint),
            policy: policy.validated(),
            commands: cmd_rx,
            events: event_tx,
            state: state_tx,
        };
        tokio::spawn(link.run());

        let handle = LinkHandle {
            endpoint,
            commands: cmd_tx,
            state: state_rx,
        };
        (handle, event_rx)
    }

    async fn run(mut self) {
        let endpoint = Arc::clone(&self.endpoint);
        let mut attempt: u32 = 0;
        let mut connected_before = false;

        loop {
            match self.connector.connect(&endpoint).await {
                Ok(conn) => {
                    let id = conn.id();
                    attempt = 0;
                    self.state.send_replace(LinkState::Connected);
                    info!(%id, endpoint = %endpoint, "link connected");

                    let event = if connected_before {
                        LinkEvent::Reconnected(id)
                    } else {
                        LinkEvent::Connected(id)
                    };
                    connected_before = true;
                    self.emit(event).await;

                    match self.pump(&conn).await {
                        PumpExit::Requested => {
                            if let Err(e) = conn.close().await {
                                debug!(%id, error = %e, "close handshake failed");
                            }
                            self.finish(
                                LinkState::Closed,
                                LinkEvent::Closed {
                                    reason: "closed by client".into(),
                                    requested: true,
                                },
                            )
                            .await;
                            return;
                        }
                        PumpExit::Dropped(reason) => {
                            warn!(%id, %reason, "link dropped");
                            self.state
                                .send_replace(LinkState::Reconnecting { attempt: 1 });
                            self.emit(LinkEvent::Closed {
                                reason,
                                requested: false,
                            })
                            .await;
                        }
                    }
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, attempt, error = %e, "connect failed");
                }
            }

            attempt = attempt.saturating_add(1);
            if self.policy.is_exhausted(attempt) {
                warn!(endpoint = %endpoint, attempts = attempt - 1, "giving up on link");
                self.finish(
                    LinkState::GaveUp,
                    LinkEvent::GaveUp {
                        attempts: attempt - 1,
                    },
                )
                .await;
                return;
            }

            let delay = self.policy.delay(attempt, &mut rand::rng());
            self.state.send_replace(LinkState::Reconnecting { attempt });
            debug!(attempt, ?delay, "reconnect scheduled");
            self.emit(LinkEvent::Reconnecting { attempt, delay }).await;

            if !self.wait(delay).await {
                self.finish(
                    LinkState::Closed,
                    LinkEvent::Closed {
                        reason: "closed by client".into(),
                        requested: true,
                    },
                )
                .await;
                return;
            }
        }
    }

    /// Shuttles frames both ways until the connection ends.
    async fn pump(&mut self, conn: &C::Connection) -> PumpExit {
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(LinkCommand::Send(frame)) => {
                        if let Err(e) = conn.send(&frame).await {
                            return PumpExit::Dropped(e.to_string());
                        }
                    }
                    Some(LinkCommand::Close) | None => return PumpExit::Requested,
                },
                incoming = conn.recv() => match incoming {
                    Ok(Some(frame)) => {
                        if !self.emit(LinkEvent::Message(frame)).await {
                            return PumpExit::Requested;
                        }
                    }
                    Ok(None) => return PumpExit::Dropped("closed by peer".into()),
                    Err(e) => return PumpExit::Dropped(e.to_string()),
                },
            }
        }
    }

    /// Sleeps for the backoff delay. Returns `false` if a close was
    /// requested meanwhile.
    async fn wait(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                cmd = self.commands.recv() => match cmd {
                    Some(LinkCommand::Send(frame)) => {
                        warn!(bytes = frame.len(), "dropping frame queued while link was down");
                    }
                    Some(LinkCommand::Close) | None => return false,
                },
            }
        }
    }

    /// Delivers an event. Returns `false` if the consumer is gone.
    async fn emit(&self, event: LinkEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    async fn finish(&self, state: LinkState, event: LinkEvent) {
        self.state.send_replace(state);
        self.emit(event).await;
    }
}
