//! The peer session.
//!
//! A [`PeerSession`] owns zero-or-more logical connections to the other
//! participants of a match and presents a role-agnostic send/receive surface
//! above them. The host listens on the address derived from the session
//! name; a joiner claims its own address and opens exactly one connection to
//! the host's.
//!
//! Instead of callback registration, inbound traffic is delivered as
//! [`SessionEvent`]s on a channel, in the order the transport delivered the
//! frames on each connection. With more than one inbound connection the host
//! serialises frames strictly in event-loop delivery order; no
//! cross-connection ordering is guaranteed beyond that.
//!
//! Liveness is active on both sides: every open connection receives a
//! periodic `Ping`, and a connection that stays silent past its TTL is
//! expired with a [`SessionEvent::PeerClosed`].

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use winterboard_core::{HashId, Player};

use crate::action::PlayerAction;
use crate::error::NetError;
use crate::frame::{Frame, FrameBody};
use crate::peers::PeerSet;
use crate::subjects;

/// Default NATS server URL for the signaling/data channel.
pub const DEFAULT_NATS_URL: &str = "nats://localhost:4222";

/// Environment variable overriding the NATS URL.
pub const NATS_URL_ENV: &str = "NATS_URL";

/// Configuration handed to [`PeerSession::host`] / [`PeerSession::join`].
///
/// The transport endpoint is external configuration; the session never
/// parses it from anywhere else.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Optional NATS URL override (defaults to `NATS_URL` env or localhost).
    pub nats_url: Option<String>,
    /// Interval between a joiner's `Open` retransmissions while the host
    /// has not answered.
    pub open_retry: Duration,
    /// How long a joiner keeps knocking before giving up with
    /// [`SessionEvent::Error`].
    pub join_timeout: Duration,
    /// Interval between `Ping` frames to open connections.
    pub heartbeat_interval: Duration,
    /// How long a connection may stay silent before it is expired.
    pub peer_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nats_url: None,
            open_retry: Duration::from_secs(1),
            join_timeout: Duration::from_secs(10),
            heartbeat_interval: Duration::from_secs(5),
            peer_ttl: Duration::from_secs(15),
        }
    }
}

impl SessionConfig {
    /// Create a config with all defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the NATS URL.
    #[must_use]
    pub fn with_nats_url(mut self, url: impl Into<String>) -> Self {
        self.nats_url = Some(url.into());
        self
    }

    /// Override the join handshake timing.
    #[must_use]
    pub fn with_join_timing(mut self, open_retry: Duration, join_timeout: Duration) -> Self {
        self.open_retry = open_retry;
        self.join_timeout = join_timeout;
        self
    }

    /// Override the liveness timing.
    #[must_use]
    pub fn with_liveness(mut self, heartbeat_interval: Duration, peer_ttl: Duration) -> Self {
        self.heartbeat_interval = heartbeat_interval;
        self.peer_ttl = peer_ttl;
        self
    }

    /// Resolve the effective NATS URL.
    #[must_use]
    pub fn resolve_url(&self) -> String {
        self.nats_url.clone().unwrap_or_else(|| {
            std::env::var(NATS_URL_ENV).unwrap_or_else(|_| DEFAULT_NATS_URL.to_string())
        })
    }
}

/// An event observed by the consumer of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The first connection became usable (host: first inbound connection;
    /// joiner: its single outbound connection).
    Ready,
    /// One inbound action frame.
    Action(PlayerAction),
    /// A connection closed and was removed from the active set.
    PeerClosed(String),
    /// The session failed in a way it cannot recover from on its own, such
    /// as a join that never got an answer from the host.
    Error(String),
}

/// The outbound half of a transport, narrowed to what the session's tasks
/// need from it.
trait FramePublisher {
    fn publish_frame(
        &self,
        subject: String,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), NetError>> + Send;
}

impl FramePublisher for async_nats::Client {
    async fn publish_frame(&self, subject: String, payload: Vec<u8>) -> Result<(), NetError> {
        self.publish(subject, payload.into()).await?;
        Ok(())
    }
}

/// A live peer session.
///
/// Dropping the session does not notify remote peers; call
/// [`dispose`](Self::dispose) for an orderly teardown.
#[derive(Debug)]
pub struct PeerSession {
    client: async_nats::Client,
    local_address: String,
    peers: Arc<PeerSet>,
    events: mpsc::UnboundedSender<SessionEvent>,
    recv_task: tokio::task::JoinHandle<()>,
    heartbeat_task: tokio::task::JoinHandle<()>,
    open_task: Option<tokio::task::JoinHandle<()>>,
}

impl PeerSession {
    /// Create a hosting session bound to `session_name` and begin accepting
    /// inbound connections on the derived host address.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if the transport connection or subscription
    /// fails. Later per-connection errors are handled by the session's
    /// tasks and never tear down the session as a whole.
    pub async fn host(
        session_name: &str,
        config: &SessionConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), NetError> {
        let address = subjects::host_address(session_name);
        Self::bind(address, config, true).await
    }

    /// Create a joining session and open one outbound connection to the
    /// host of `session_name`.
    ///
    /// The local address is derived from `local_name`, or from a freshly
    /// generated hash id when omitted. The `Open` frame is retransmitted on
    /// [`SessionConfig::open_retry`] until the host answers, so a joiner
    /// that races the host's subscription still connects; if nothing
    /// arrives within [`SessionConfig::join_timeout`] the session emits
    /// [`SessionEvent::Error`] and stops knocking.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if the transport connection or subscription
    /// fails.
    pub async fn join(
        session_name: &str,
        config: &SessionConfig,
        local_name: Option<&str>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), NetError> {
        let local_name = match local_name {
            Some(name) => name.to_string(),
            None => HashId::generate().to_string(),
        };
        let address = subjects::peer_address(&local_name);
        let (mut session, events) = Self::bind(address, config, false).await?;

        // Knock on the host's door until it answers with its own `Open`,
        // which the receive task turns into `SessionEvent::Ready`.
        let host_address = subjects::host_address(session_name);
        info!(host = host_address, "connection requested");
        session.open_task = Some(tokio::spawn(open_loop(
            session.client.clone(),
            Arc::clone(&session.peers),
            session.events.clone(),
            session.local_address.clone(),
            host_address,
            config.open_retry,
            config.join_timeout,
        )));

        Ok((session, events))
    }

    /// Connect to the transport, claim `address`, and spawn the receive and
    /// heartbeat tasks.
    async fn bind(
        address: String,
        config: &SessionConfig,
        is_host: bool,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SessionEvent>), NetError> {
        let url = config.resolve_url();
        info!(url, address, "connecting to NATS");
        let client = async_nats::connect(url.as_str()).await?;

        let subscription = client.subscribe(subjects::peer_subject(&address)).await?;
        info!(address, "listening for peer frames");

        let peers = Arc::new(PeerSet::new());
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let recv_task = tokio::spawn(receive_loop(
            subscription,
            client.clone(),
            Arc::clone(&peers),
            event_tx.clone(),
            address.clone(),
            is_host,
        ));
        let heartbeat_task = tokio::spawn(heartbeat_loop(
            client.clone(),
            Arc::clone(&peers),
            event_tx.clone(),
            address.clone(),
            config.heartbeat_interval,
            config.peer_ttl,
        ));

        Ok((
            Self {
                client,
                local_address: address,
                peers,
                events: event_tx,
                recv_task,
                heartbeat_task,
                open_task: None,
            },
            event_rx,
        ))
    }

    /// Returns the session-scoped address this peer listens on.
    #[must_use]
    pub fn local_address(&self) -> &str {
        &self.local_address
    }

    /// Returns the number of currently open connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    /// Players that have completed the join handshake, keyed by the remote
    /// connection they arrived on. Meaningful on the host only.
    #[must_use]
    pub fn connected_players(&self) -> Vec<(String, Player)> {
        self.peers.connected_players()
    }

    /// Broadcast an action to every open connection.
    ///
    /// With zero open connections this is a logged no-op — a session may
    /// legitimately be between players — and callers are never forced to
    /// check connection state first. A publish failure on one connection
    /// drops that connection (with a [`SessionEvent::PeerClosed`]) and the
    /// broadcast continues to the rest. Returns the number of connections
    /// the action was delivered to.
    ///
    /// # Errors
    ///
    /// Returns [`NetError`] if encoding the action fails.
    pub async fn send(&self, action: &PlayerAction) -> Result<usize, NetError> {
        broadcast_action(
            &self.client,
            &self.peers,
            &self.events,
            &self.local_address,
            action,
        )
        .await
    }

    /// Close every open connection and release the local identity.
    ///
    /// Remote peers are sent a `Close` frame on a best-effort basis. Safe to
    /// call multiple times; after the first call the connection set is empty
    /// and subsequent calls do nothing.
    pub async fn dispose(&self) {
        for address in self.peers.recipients() {
            let frame = Frame::new(FrameBody::Close {
                from: self.local_address.clone(),
            });
            match frame.encode() {
                Ok(payload) => {
                    if let Err(e) = self
                        .client
                        .publish(subjects::peer_subject(&address), payload.into())
                        .await
                    {
                        warn!(peer = address, error = %e, "close notification failed");
                    }
                }
                Err(e) => warn!(error = %e, "close frame encode failed"),
            }
            self.peers.close(&address);
        }
        if let Some(task) = &self.open_task {
            task.abort();
        }
        self.heartbeat_task.abort();
        self.recv_task.abort();
        info!(address = self.local_address, "session disposed");
    }
}

/// Broadcast one action frame to every open connection.
///
/// A failing connection is closed and reported, never propagated: the
/// caller has typically already applied the action locally, and aborting
/// mid-broadcast would leave the surviving peers out of sync.
async fn broadcast_action<P: FramePublisher>(
    publisher: &P,
    peers: &PeerSet,
    events: &mpsc::UnboundedSender<SessionEvent>,
    local_address: &str,
    action: &PlayerAction,
) -> Result<usize, NetError> {
    let recipients = peers.recipients();
    if recipients.is_empty() {
        debug!(kind = action.kind(), "no open connections, action dropped");
        return Ok(0);
    }

    let frame = Frame::new(FrameBody::Action {
        from: local_address.to_string(),
        action: action.clone(),
    });
    let payload = frame.encode()?;
    let mut delivered = 0;
    for address in &recipients {
        match publisher
            .publish_frame(subjects::peer_subject(address), payload.clone())
            .await
        {
            Ok(()) => delivered += 1,
            Err(e) => {
                warn!(peer = address, error = %e, "publish failed, dropping connection");
                if peers.close(address).is_some() {
                    let _ = events.send(SessionEvent::PeerClosed(address.clone()));
                }
            }
        }
    }
    debug!(kind = action.kind(), delivered, "action broadcast");
    Ok(delivered)
}

/// Retransmit the joiner's `Open` frame until the host answers or the
/// deadline passes.
async fn open_loop<P>(
    publisher: P,
    peers: Arc<PeerSet>,
    events: mpsc::UnboundedSender<SessionEvent>,
    local_address: String,
    host_address: String,
    retry: Duration,
    timeout: Duration,
) where
    P: FramePublisher + Send + Sync + 'static,
{
    let deadline = Instant::now() + timeout;
    let mut ticker = tokio::time::interval(retry);
    loop {
        ticker.tick().await;
        // The host's answering `Open` lands in the peer set via the
        // receive task.
        if !peers.is_empty() {
            return;
        }
        if Instant::now() >= deadline {
            warn!(host = host_address, "join timed out without an answer");
            let _ = events.send(SessionEvent::Error(format!(
                "no answer from host {host_address}"
            )));
            return;
        }
        let frame = Frame::new(FrameBody::Open {
            from: local_address.clone(),
        });
        match frame.encode() {
            Ok(payload) => {
                if let Err(e) = publisher
                    .publish_frame(subjects::peer_subject(&host_address), payload)
                    .await
                {
                    warn!(host = host_address, error = %e, "open frame publish failed");
                }
            }
            Err(e) => warn!(error = %e, "open frame encode failed"),
        }
    }
}

/// Expire silent connections and ping the live ones.
async fn heartbeat_loop<P>(
    publisher: P,
    peers: Arc<PeerSet>,
    events: mpsc::UnboundedSender<SessionEvent>,
    local_address: String,
    interval: Duration,
    ttl: Duration,
) where
    P: FramePublisher + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        for address in peers.expired(Instant::now(), ttl) {
            if peers.close(&address).is_some() {
                warn!(peer = address, "connection expired");
                if events.send(SessionEvent::PeerClosed(address)).is_err() {
                    return;
                }
            }
        }

        let frame = Frame::new(FrameBody::Ping {
            from: local_address.clone(),
        });
        let payload = match frame.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "ping encode failed");
                continue;
            }
        };
        for address in peers.recipients() {
            // A failed ping is not itself a close; the TTL decides.
            if let Err(e) = publisher
                .publish_frame(subjects::peer_subject(&address), payload.clone())
                .await
            {
                debug!(peer = address, error = %e, "ping publish failed");
            }
        }
    }
}

/// The per-session receive loop: decodes inbound frames, maintains the peer
/// set, and forwards events in delivery order.
async fn receive_loop(
    mut subscription: async_nats::Subscriber,
    client: async_nats::Client,
    peers: Arc<PeerSet>,
    events: mpsc::UnboundedSender<SessionEvent>,
    local_address: String,
    is_host: bool,
) {
    while let Some(msg) = subscription.next().await {
        let frame = match Frame::decode(&msg.payload) {
            Ok(frame) => frame,
            // Malformed or mis-versioned frames are dropped; one bad peer
            // must not take down the other connections.
            Err(e) => {
                error!(error = %e, "dropping inbound frame");
                continue;
            }
        };

        match frame.body {
            FrameBody::Open { from } => {
                let first = peers.is_empty();
                if !peers.open(&from) {
                    // A retransmitted open doubles as a liveness signal.
                    peers.touch(&from, Instant::now());
                    debug!(peer = from, "duplicate open ignored");
                    continue;
                }
                info!(peer = from, "connection opened");

                // The host acknowledges so the joiner observes its single
                // outbound connection becoming usable.
                if is_host {
                    let ack = Frame::new(FrameBody::Open {
                        from: local_address.clone(),
                    });
                    match ack.encode() {
                        Ok(payload) => {
                            if let Err(e) = client
                                .publish(subjects::peer_subject(&from), payload.into())
                                .await
                            {
                                warn!(peer = from, error = %e, "open ack failed");
                            }
                        }
                        Err(e) => warn!(error = %e, "open ack encode failed"),
                    }
                }

                if first && events.send(SessionEvent::Ready).is_err() {
                    break;
                }
            }
            FrameBody::Action { from, action } => {
                peers.touch(&from, Instant::now());
                // Seeing a join request complete on this connection is what
                // binds the player identity to it.
                if let PlayerAction::JoinRequest { player } = &action {
                    peers.bind_player(&from, player.clone());
                }
                if events.send(SessionEvent::Action(action)).is_err() {
                    break;
                }
            }
            FrameBody::Ping { from } => {
                if !peers.touch(&from, Instant::now()) {
                    debug!(peer = from, "ping from unknown connection");
                }
            }
            FrameBody::Close { from } => {
                if peers.close(&from).is_some() {
                    info!(peer = from, "connection closed");
                    if events.send(SessionEvent::PeerClosed(from)).is_err() {
                        break;
                    }
                }
            }
        }
    }
    debug!(address = local_address, "receive loop ended");
}
