//! # Sessions
//!
//! One [`Session`] per connection: the negotiated channel set, the liveness
//! monitor, the entity the peer controls, and the per-receiver entity
//! tracker.
//!
//! ## Lifecycle
//!
//! ```text
//! open ──► start (channel announcement, once) ──► active ──► closed
//!                                                   │
//!                  liveness timeout / fatal decode ─┘
//! ```
//!
//! Outbound messages go into an unbounded crossbeam queue drained by the
//! transport. Closing sends a final kick, then drops the queue sender, the
//! liveness ring and the entity tracker, so nothing more can be emitted.

pub(crate) mod handlers;
mod liveness;

pub use handlers::{
    DiscardHandler, ForwardHandler, KeepAliveHandler, KickHandler, RegisterChannelsHandler,
    UnregisterChannelsHandler,
};
pub use liveness::{LivenessMonitor, LivenessState, LivenessTick, PingChallenge, TimeoutKind};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use lodestone_core::AtomicF64;

use crate::config::LivenessConfig;
use crate::error::{ProtocolError, ProtocolResult, SessionError, SessionResult};
use crate::protocol::{is_reserved_channel, KeepAlive, Kick, Message};
use crate::sync::{EntityTracker, SyncedEntity};

/// Unique identifier for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u32);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Exchanging messages.
    Active,
    /// Closed; terminal.
    Closed,
}

/// Why a session was closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Short clock expired.
    TimedOut,
    /// Long clock expired.
    NoPingResponse,
    /// Inbound bytes could not be decoded.
    Protocol(String),
    /// The peer sent a kick.
    Remote(String),
    /// The server closed the session.
    Server(String),
}

impl DisconnectReason {
    /// True if the peer should be told with a kick message.
    #[must_use]
    pub const fn notifies_peer(&self) -> bool {
        !matches!(self, Self::Remote(_))
    }
}

impl From<TimeoutKind> for DisconnectReason {
    fn from(kind: TimeoutKind) -> Self {
        match kind {
            TimeoutKind::Traffic => Self::TimedOut,
            TimeoutKind::PingResponse => Self::NoPingResponse,
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimedOut => f.write_str("Connection timed out"),
            Self::NoPingResponse => f.write_str("No ping response"),
            Self::Protocol(detail) => write!(f, "Protocol error: {detail}"),
            Self::Remote(reason) | Self::Server(reason) => f.write_str(reason),
        }
    }
}

/// A decoded peer message handed to the rest of the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundEvent {
    /// Session it arrived on.
    pub session: SessionId,
    /// The message.
    pub message: Message,
}

/// What a handler may touch while handling one message.
pub struct HandlerContext<'a> {
    /// Session the message arrived on.
    pub session: &'a mut Session,
    /// Queue of messages for the rest of the server.
    pub events: &'a Sender<InboundEvent>,
}

impl HandlerContext<'_> {
    /// Hands `message` to the rest of the server.
    ///
    /// Dropped with a debug log if nobody is listening.
    pub fn forward(&self, message: Message) {
        let event = InboundEvent {
            session: self.session.id(),
            message,
        };
        if self.events.send(event).is_err() {
            tracing::debug!("No inbound listener; dropped message from {}", self.session.id());
        }
    }
}

/// Protocol, liveness and channel state of one connection.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    outbound: Option<Sender<Message>>,
    channels: Vec<String>,
    liveness: Option<LivenessMonitor>,
    latency_ms: Arc<AtomicF64>,
    controlled_entity: Option<i32>,
    tracker: EntityTracker,
    announced: bool,
    disconnect_reason: Option<DisconnectReason>,
}

impl Session {
    /// Opens a session. The receiver is the transport's outbound queue.
    #[must_use]
    pub fn new(id: SessionId, config: &LivenessConfig) -> (Self, Receiver<Message>) {
        Self::with_monitor(id, LivenessMonitor::new(config))
    }

    /// Opens a session around an existing monitor.
    #[must_use]
    pub fn with_monitor(id: SessionId, monitor: LivenessMonitor) -> (Self, Receiver<Message>) {
        let (tx, rx) = unbounded();
        let session = Self {
            id,
            state: SessionState::Active,
            outbound: Some(tx),
            channels: Vec::new(),
            liveness: Some(monitor),
            latency_ms: Arc::new(AtomicF64::new(0.0)),
            controlled_entity: None,
            tracker: EntityTracker::new(),
            announced: false,
            disconnect_reason: None,
        };
        tracing::info!("Session {} opened", id);
        (session, rx)
    }

    /// Session id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// True until closed.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Reason recorded at close.
    #[must_use]
    pub fn disconnect_reason(&self) -> Option<&DisconnectReason> {
        self.disconnect_reason.as_ref()
    }

    /// Liveness monitor, until closed.
    #[must_use]
    pub fn liveness(&self) -> Option<&LivenessMonitor> {
        self.liveness.as_ref()
    }

    /// Shared handle to the last round-trip time in milliseconds.
    #[must_use]
    pub fn latency_handle(&self) -> Arc<AtomicF64> {
        Arc::clone(&self.latency_ms)
    }

    /// Entity controlled by the peer, never echoed back to it.
    #[must_use]
    pub const fn controlled_entity(&self) -> Option<i32> {
        self.controlled_entity
    }

    /// Sets the entity controlled by the peer.
    pub fn set_controlled_entity(&mut self, entity_id: Option<i32>) {
        self.controlled_entity = entity_id;
    }

    /// Per-receiver entity state.
    #[must_use]
    pub fn tracker(&self) -> &EntityTracker {
        &self.tracker
    }

    /// Queues a message for the transport.
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] once closed, or if the transport dropped its
    /// end of the queue.
    pub fn send(&self, message: Message) -> SessionResult<()> {
        let closed = SessionError::Closed(self.id.0);
        let Some(outbound) = &self.outbound else {
            return Err(closed);
        };
        outbound.send(message).map_err(|_| closed)
    }

    /// Sends the channel announcement. Only the first call sends anything.
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] if the session is closed.
    pub fn start(&mut self, announcement: Message) -> SessionResult<bool> {
        if self.announced {
            return Ok(false);
        }
        self.send(announcement)?;
        self.announced = true;
        tracing::debug!("Session {} announced its channels", self.id);
        Ok(true)
    }

    /// Channels the peer registered.
    pub fn channels(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.iter().map(String::as_str)
    }

    /// True if the peer registered `name`, ignoring ASCII case.
    #[must_use]
    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Records a channel the peer can receive.
    ///
    /// Returns `false` if it was already registered.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ReservedChannel`] for `REGISTER`/`UNREGISTER`.
    pub fn register_channel(&mut self, name: &str) -> ProtocolResult<bool> {
        if is_reserved_channel(name) {
            return Err(ProtocolError::ReservedChannel(name.to_owned()));
        }
        if self.has_channel(name) {
            return Ok(false);
        }
        self.channels.push(name.to_owned());
        Ok(true)
    }

    /// Forgets a channel. Returns `false` if it was not registered.
    pub fn unregister_channel(&mut self, name: &str) -> bool {
        let before = self.channels.len();
        self.channels.retain(|c| !c.eq_ignore_ascii_case(name));
        self.channels.len() != before
    }

    /// Resets the short clock. Called for every inbound frame.
    pub fn record_traffic(&mut self) {
        if let Some(monitor) = &mut self.liveness {
            monitor.record_traffic();
        }
    }

    /// Feeds an echoed ping hash to the liveness monitor.
    ///
    /// Publishes the round-trip time on a match.
    pub fn acknowledge_ping(&mut self, hash: i32) -> Option<Duration> {
        let latency = self.liveness.as_mut()?.respond(hash)?;
        self.latency_ms.store(latency.as_secs_f64() * 1000.0);
        tracing::trace!("Session {} ping {:?}", self.id, latency);
        Some(latency)
    }

    /// Advances liveness by `dt`: sends a due challenge, or closes the
    /// session if a clock expired.
    pub fn tick(&mut self, dt: Duration) -> Option<DisconnectReason> {
        let tick = self.liveness.as_mut()?.tick(dt);

        if let Some(kind) = tick.timeout {
            let reason = DisconnectReason::from(kind);
            self.close(reason.clone());
            return Some(reason);
        }
        if let Some(hash) = tick.challenge {
            // Cannot fail while open
            let _ = self.send(Message::KeepAlive(KeepAlive { hash }));
        }
        None
    }

    /// Emits this tick's sync messages for everything `visible` except the
    /// peer's own entity.
    ///
    /// `scratch` is cleared and reused. Returns the number of messages queued.
    ///
    /// # Errors
    ///
    /// [`SessionError::Closed`] if the session is closed.
    pub fn sync_entities(
        &mut self,
        visible: &[&dyn SyncedEntity],
        scratch: &mut Vec<Message>,
    ) -> SessionResult<usize> {
        if !self.is_open() {
            return Err(SessionError::Closed(self.id.0));
        }
        scratch.clear();

        match self.controlled_entity {
            Some(own) => {
                let others: Vec<&dyn SyncedEntity> = visible
                    .iter()
                    .copied()
                    .filter(|e| e.entity_id() != own)
                    .collect();
                self.tracker.sync_visible(&others, scratch);
            }
            None => self.tracker.sync_visible(visible, scratch),
        }

        let count = scratch.len();
        for message in scratch.drain(..) {
            self.send(message)?;
        }
        Ok(count)
    }

    /// Closes the session.
    ///
    /// Sends a kick when the reason calls for one, then releases the queue,
    /// the liveness state and the entity tracker. Returns `false` if it was
    /// already closed.
    pub fn close(&mut self, reason: DisconnectReason) -> bool {
        if !self.is_open() {
            return false;
        }
        if reason.notifies_peer() {
            let _ = self.send(Message::Kick(Kick {
                reason: reason.to_string(),
            }));
        }
        tracing::info!("Session {} closed: {}", self.id, reason);

        self.state = SessionState::Closed;
        self.outbound = None;
        self.liveness = None;
        self.tracker.clear();
        self.disconnect_reason = Some(reason);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ChannelList;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn session() -> (Session, Receiver<Message>) {
        let monitor =
            LivenessMonitor::with_rng(&LivenessConfig::default(), StdRng::seed_from_u64(1));
        Session::with_monitor(SessionId(1), monitor)
    }

    #[test]
    fn test_announcement_sent_once() {
        let (mut session, rx) = session();
        let hello = Message::RegisterChannels(ChannelList::new(["MC|Beacon"]));

        assert_eq!(session.start(hello.clone()), Ok(true));
        assert_eq!(session.start(hello.clone()), Ok(false));
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![hello]);
    }

    #[test]
    fn test_channels() {
        let (mut session, _rx) = session();

        assert_eq!(session.register_channel("MC|Beacon"), Ok(true));
        assert_eq!(session.register_channel("mc|beacon"), Ok(false));
        assert!(matches!(
            session.register_channel("Register"),
            Err(ProtocolError::ReservedChannel(_))
        ));
        assert!(session.has_channel("MC|BEACON"));

        assert!(session.unregister_channel("MC|Beacon"));
        assert!(!session.unregister_channel("MC|Beacon"));
        assert_eq!(session.channels().count(), 0);
    }

    #[test]
    fn test_tick_sends_challenge() {
        let (mut session, rx) = session();

        assert_eq!(session.tick(Duration::from_millis(50)), None);
        let Ok(Message::KeepAlive(ping)) = rx.try_recv() else {
            panic!("Expected keep-alive");
        };

        session.tick(Duration::from_millis(120));
        assert_eq!(session.acknowledge_ping(ping.hash), Some(Duration::from_millis(120)));
        assert!((session.latency_handle().load() - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_timeout_closes_with_kick() {
        let (mut session, rx) = session();

        assert_eq!(session.tick(Duration::from_secs(31)), Some(DisconnectReason::TimedOut));
        assert!(!session.is_open());
        assert!(session.liveness().is_none());

        let kick = rx.try_iter().last();
        assert_eq!(
            kick,
            Some(Message::Kick(Kick {
                reason: "Connection timed out".into()
            }))
        );

        // Queue sender is gone
        assert!(rx.recv().is_err());
        assert_eq!(
            session.send(Message::Kick(Kick { reason: "x".into() })),
            Err(SessionError::Closed(1))
        );
    }

    #[test]
    fn test_remote_close_sends_nothing() {
        let (mut session, rx) = session();

        assert!(session.close(DisconnectReason::Remote("bye".into())));
        assert!(!session.close(DisconnectReason::TimedOut));
        assert!(rx.try_recv().is_err());
        assert_eq!(
            session.disconnect_reason(),
            Some(&DisconnectReason::Remote("bye".into()))
        );
    }
}
