//! The client runtime: one actor task that owns the session.
//!
//! [`WizardClient::start`] spawns the actor and returns a [`ClientHandle`].
//! The actor is the only place that touches the [`SessionMachine`], the
//! [`Dispatcher`] and the current link, so every change is applied in
//! order without locks:
//!
//! ```text
//! ClientHandle::join() ──Command──┐
//!                                 ▼
//!                      ┌──── client actor ────┐
//!   LinkEvent ────────→│ machine · dispatcher │──→ watch<Arc<SessionView>>
//!                      └──────────┬───────────┘──→ mpsc<ClientNotice>
//!                                 ▼
//!                          LinkHandle::send
//! ```
//!
//! Calls on the handle return as soon as the action was checked and
//! queued; they never wait for the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};
use wizard_protocol::{CardFace, Codec, Color, JsonCodec, ProtocolError, decode_event};
use wizard_session::{SessionMachine, SessionView};
use wizard_transport::{
    Connector, Link, LinkEvent, LinkHandle, LinkState, WebSocketConnector,
};

use crate::{ClientConfig, ClientError, Dispatcher};

/// Connection news for the caller. Session changes go through
/// [`ClientHandle::subscribe`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientNotice {
    /// The first connection to the server opened.
    Connected,
    /// The connection ended. A reconnect follows unless `requested`.
    Closed { reason: String, requested: bool },
    /// A reconnect attempt is scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// The connection is back. The session was kept; the server may need
    /// a [`ClientHandle::rejoin`].
    Reconnected,
    /// The retry cap was reached. Call [`ClientHandle::connect`] to start
    /// over.
    GaveUp { attempts: u32 },
}

/// One user request for the actor.
#[derive(Debug)]
enum Request {
    Connect(Option<String>),
    Join(String),
    PlayCard(CardFace),
    Announce(u32),
    ChooseTrump(Color),
    StartGame,
    Kick(Vec<String>),
    Rejoin,
    Close,
}

struct Command {
    request: Request,
    reply: oneshot::Sender<Result<(), ClientError>>,
}

/// Entry point. See [`WizardClient::start`].
#[derive(Debug)]
pub struct WizardClient;

impl WizardClient {
    /// Starts a client that talks JSON over WebSocket.
    ///
    /// Must be called from within a Tokio runtime. Nothing is dialed yet;
    /// call [`ClientHandle::connect`].
    pub fn start(config: ClientConfig) -> (ClientHandle, mpsc::Receiver<ClientNotice>) {
        Self::start_with(WebSocketConnector, JsonCodec, config)
    }

    /// Starts a client over any connector and codec.
    pub fn start_with<K, C>(
        connector: K,
        codec: C,
        config: ClientConfig,
    ) -> (ClientHandle, mpsc::Receiver<ClientNotice>)
    where
        K: Connector + Clone,
        C: Codec,
    {
        let config = config.validated();
        let (cmd_tx, cmd_rx) = mpsc::channel(config.event_capacity);
        let (notice_tx, notice_rx) = mpsc::channel(config.event_capacity);

        let machine = SessionMachine::new();
        let (view_tx, view_rx) = watch::channel(machine.snapshot());
        // No link yet; `Closed` until the first connect.
        let (health_tx, health_rx) = watch::channel(LinkState::Closed);

        let actor = ClientActor {
            connector,
            config,
            machine,
            dispatcher: Dispatcher::new(codec),
            link: None,
            link_events: None,
            commands: cmd_rx,
            views: view_tx,
            health: health_tx,
            notices: notice_tx,
        };
        tokio::spawn(actor.run());

        let handle = ClientHandle {
            commands: cmd_tx,
            views: view_rx,
            health: health_rx,
        };
        (handle, notice_rx)
    }
}

/// Handle to a running client. Cheap to clone.
///
/// The actor stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    commands: mpsc::Sender<Command>,
    views: watch::Receiver<Arc<SessionView>>,
    health: watch::Receiver<LinkState>,
}

impl ClientHandle {
    /// Opens a fresh session to the configured endpoint.
    ///
    /// Any previous link is closed and the view is reset. A name passed to
    /// [`join`](Self::join) beforehand is kept and sent once connected.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.request(Request::Connect(None)).await
    }

    /// Like [`connect`](Self::connect), to another endpoint.
    pub async fn connect_to(&self, endpoint: impl Into<String>) -> Result<(), ClientError> {
        self.request(Request::Connect(Some(endpoint.into()))).await
    }

    /// Joins the game as `name`. Deferred until connected if necessary.
    pub async fn join(&self, name: impl Into<String>) -> Result<(), ClientError> {
        self.request(Request::Join(name.into())).await
    }

    pub async fn play_card(&self, card: impl Into<CardFace>) -> Result<(), ClientError> {
        self.request(Request::PlayCard(card.into())).await
    }

    pub async fn announce(&self, count: u32) -> Result<(), ClientError> {
        self.request(Request::Announce(count)).await
    }

    pub async fn choose_trump(&self, color: Color) -> Result<(), ClientError> {
        self.request(Request::ChooseTrump(color)).await
    }

    pub async fn start_game(&self) -> Result<(), ClientError> {
        self.request(Request::StartGame).await
    }

    /// Kicks each distinct name in `names`.
    pub async fn kick<I, S>(&self, names: I) -> Result<(), ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.request(Request::Kick(names)).await
    }

    /// Sends `join` again with the name used before (after a reconnect).
    pub async fn rejoin(&self) -> Result<(), ClientError> {
        self.request(Request::Rejoin).await
    }

    /// Closes the link. The view is kept.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.request(Request::Close).await
    }

    /// Receives a snapshot after every change. Bursts may coalesce;
    /// [`SessionView::revision`] tells how many changes happened.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionView>> {
        self.views.clone()
    }

    /// The latest snapshot.
    pub fn view(&self) -> Arc<SessionView> {
        Arc::clone(&self.views.borrow())
    }

    /// Observes the health of the current link.
    pub fn health(&self) -> watch::Receiver<LinkState> {
        self.health.clone()
    }

    async fn request(&self, request: Request) -> Result<(), ClientError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command {
                request,
                reply: reply_tx,
            })
            .await
            .map_err(|_| ClientError::Stopped)?;
        reply_rx.await.map_err(|_| ClientError::Stopped)?
    }
}

/// The actor state. Runs inside a Tokio task.
struct ClientActor<K: Connector, C: Codec> {
    connector: K,
    config: ClientConfig,
    machine: SessionMachine,
    dispatcher: Dispatcher<C>,
    link: Option<LinkHandle>,
    link_events: Option<mpsc::Receiver<LinkEvent>>,
    commands: mpsc::Receiver<Command>,
    views: watch::Sender<Arc<SessionView>>,
    health: watch::Sender<LinkState>,
    notices: mpsc::Sender<ClientNotice>,
}

impl<K, C> ClientActor<K, C>
where
    K: Connector + Clone,
    C: Codec,
{
    async fn run(mut self) {
        debug!("client actor started");

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(Command { request, reply }) => {
                        let result = self.handle_request(request);
                        // The caller may have given up waiting.
                        let _ = reply.send(result);
                    }
                    None => break,
                },
                event = next_link_event(&mut self.link_events) => match event {
                    Some(event) => self.handle_link_event(event),
                    None => {
                        debug!("link task finished");
                        self.link_events = None;
                    }
                },
            }
        }

        if let Some(link) = self.link.take() {
            link.close();
        }
        debug!("client actor stopped");
    }

    // -----------------------------------------------------------------
    // Requests from handles
    // -----------------------------------------------------------------

    fn handle_request(&mut self, request: Request) -> Result<(), ClientError> {
        let before = self.machine.view().revision();
        let result = match request {
            Request::Connect(endpoint) => {
                self.connect(endpoint);
                Ok(())
            }
            Request::Join(name) => {
                self.dispatcher
                    .join(&mut self.machine, self.link.as_ref(), &name)
            }
            Request::PlayCard(card) => {
                self.dispatcher
                    .play_card(self.machine.view(), self.link.as_ref(), card)
            }
            Request::Announce(count) => {
                self.dispatcher
                    .announce(self.machine.view(), self.link.as_ref(), count)
            }
            Request::ChooseTrump(color) => self.dispatcher.choose_trump(
                self.machine.view(),
                self.link.as_ref(),
                color,
            ),
            Request::StartGame => {
                self.dispatcher
                    .start_game(self.machine.view(), self.link.as_ref())
            }
            Request::Kick(names) => {
                self.dispatcher
                    .kick(self.machine.view(), self.link.as_ref(), &names)
            }
            Request::Rejoin => {
                self.dispatcher
                    .rejoin(self.machine.view(), self.link.as_ref())
            }
            Request::Close => {
                match &self.link {
                    Some(link) => link.close(),
                    None => debug!("close requested without a link"),
                }
                Ok(())
            }
        };
        self.publish_if_changed(before);
        result
    }

    /// Replaces the link and starts a new session.
    fn connect(&mut self, endpoint: Option<String>) {
        if let Some(old) = self.link.take() {
            debug!(endpoint = old.endpoint(), "closing previous link");
            old.close();
        }
        self.link_events = None;

        self.machine.reset();
        if let Some(name) = self.dispatcher.pending_join() {
            self.machine.submit_name(name.to_string());
        }

        let endpoint = endpoint.unwrap_or_else(|| self.config.endpoint.clone());
        info!(%endpoint, "connecting");
        let (link, events) = Link::spawn(
            self.connector.clone(),
            endpoint,
            self.config.policy.clone(),
            self.config.event_capacity,
        );
        self.health.send_replace(link.state());
        self.link = Some(link);
        self.link_events = Some(events);
    }

    // -----------------------------------------------------------------
    // Events from the link
    // -----------------------------------------------------------------

    fn handle_link_event(&mut self, event: LinkEvent) {
        let before = self.machine.view().revision();
        // Health goes out before the matching notice.
        if let Some(link) = &self.link {
            self.health.send_replace(link.state());
        }

        match event {
            LinkEvent::Connected(id) => {
                debug!(%id, "connected");
                self.machine.on_connected();
                self.flush_pending_join();
                self.notify(ClientNotice::Connected);
            }
            LinkEvent::Message(frame) => self.handle_frame(&frame),
            LinkEvent::Closed { reason, requested } => {
                if !requested {
                    self.machine.on_transport_closed();
                }
                self.notify(ClientNotice::Closed { reason, requested });
            }
            LinkEvent::Reconnecting { attempt, delay } => {
                self.notify(ClientNotice::Reconnecting { attempt, delay });
            }
            LinkEvent::Reconnected(id) => {
                debug!(%id, "reconnected");
                self.machine.on_connected();
                let flushed = self.flush_pending_join();
                if !flushed
                    && self.config.rejoin_on_reconnect
                    && self.machine.view().local_player_name().is_some()
                {
                    if let Err(e) = self
                        .dispatcher
                        .rejoin(self.machine.view(), self.link.as_ref())
                    {
                        warn!(error = %e, "rejoin after reconnect failed");
                    }
                }
                self.notify(ClientNotice::Reconnected);
            }
            LinkEvent::GaveUp { attempts } => {
                warn!(attempts, "gave up reconnecting");
                self.notify(ClientNotice::GaveUp { attempts });
            }
        }

        self.publish_if_changed(before);
    }

    fn handle_frame(&mut self, frame: &[u8]) {
        match decode_event(self.dispatcher.codec(), frame) {
            Ok(event) => {
                let kind = event.kind();
                if self.machine.apply(event) {
                    debug!(kind, revision = self.machine.view().revision(), "event applied");
                }
            }
            Err(ProtocolError::UnknownType(kind)) => {
                debug!(%kind, "dropping message of unknown type");
            }
            Err(e) => {
                warn!(error = %e, bytes = frame.len(), "dropping malformed message");
            }
        }
    }

    /// Returns `true` if a held-back join was sent.
    fn flush_pending_join(&mut self) -> bool {
        let Some(link) = &self.link else {
            return false;
        };
        match self.dispatcher.flush_pending_join(link) {
            Ok(sent) => sent,
            Err(e) => {
                warn!(error = %e, "deferred join not sent");
                false
            }
        }
    }

    fn notify(&self, notice: ClientNotice) {
        if let Err(e) = self.notices.try_send(notice) {
            debug!(error = %e, "notice dropped");
        }
    }

    fn publish_if_changed(&self, before: u64) {
        if self.machine.view().revision() != before {
            self.views.send_replace(self.machine.snapshot());
        }
    }
}

/// Waits for the next link event, or forever if there is no link.
async fn next_link_event(
    events: &mut Option<mpsc::Receiver<LinkEvent>>,
) -> Option<LinkEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
