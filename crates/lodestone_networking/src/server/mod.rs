//! # Sync Server
//!
//! The session table between the transport and the simulation.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SYNC SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  transport bytes ──► receive() ──► registry ──► handlers    │
//! │                                                   │         │
//! │                                   InboundEvent ◄──┘         │
//! │                                                             │
//! │  simulation ──► sync_entities() ──► session queue ──► bytes │
//! │                                                             │
//! │  scheduler ──► SessionLivenessTask ──► tick_sessions()      │
//! │            └─► TickRateMonitor ──► TickRateMetrics          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry is built once and shared read-only. Sessions sit behind a
//! single `parking_lot` mutex held only for the duration of one call.

mod scheduler;
mod tick_rate;

pub use scheduler::{ScheduledTask, Scheduler, SchedulerStats};
pub use tick_rate::{TickRateMetrics, TickRateMonitor};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use lodestone_core::AtomicF64;
use parking_lot::Mutex;

use crate::config::NetworkConfig;
use crate::error::{ProtocolResult, SessionError, SessionResult, TaskResult};
use crate::protocol::{standard_registry, Message, PacketReader, PacketWriter, ProtocolRegistry};
use crate::session::{
    DisconnectReason, HandlerContext, InboundEvent, Session, SessionId,
};
use crate::sync::SyncedEntity;

#[derive(Default)]
struct SessionTable {
    sessions: HashMap<SessionId, Session>,
    scratch: Vec<Message>,
}

/// Owns every session and the shared protocol registry.
pub struct SyncServer {
    config: NetworkConfig,
    registry: Arc<ProtocolRegistry>,
    table: Mutex<SessionTable>,
    next_id: AtomicU32,
    events_tx: Sender<InboundEvent>,
    events_rx: Receiver<InboundEvent>,
}

impl SyncServer {
    /// Creates a server around a prepared registry.
    #[must_use]
    pub fn new(config: NetworkConfig, registry: ProtocolRegistry) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            config,
            registry: Arc::new(registry),
            table: Mutex::new(SessionTable::default()),
            next_id: AtomicU32::new(1),
            events_tx,
            events_rx,
        }
    }

    /// Creates a server speaking the standard opcode table.
    ///
    /// # Errors
    ///
    /// Only if the standard table is inconsistent.
    pub fn with_standard_protocol(config: NetworkConfig) -> ProtocolResult<Self> {
        Ok(Self::new(config, standard_registry()?))
    }

    /// Configuration the server was created with.
    #[must_use]
    pub const fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Shared protocol registry.
    #[must_use]
    pub fn registry(&self) -> Arc<ProtocolRegistry> {
        Arc::clone(&self.registry)
    }

    /// Messages handlers forwarded to the rest of the server.
    #[must_use]
    pub fn events(&self) -> Receiver<InboundEvent> {
        self.events_rx.clone()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.table.lock().sessions.len()
    }

    /// True if `id` is open.
    #[must_use]
    pub fn is_open(&self, id: SessionId) -> bool {
        self.table
            .lock()
            .sessions
            .get(&id)
            .is_some_and(Session::is_open)
    }

    /// Opens a session and queues its channel announcement.
    ///
    /// The receiver is the transport's outbound queue; see
    /// [`SyncServer::encode_outbound`].
    ///
    /// # Errors
    ///
    /// Only if the queue is already closed, which cannot happen for a fresh
    /// session.
    pub fn open_session(&self) -> SessionResult<(SessionId, Receiver<Message>)> {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (mut session, outbound) = Session::new(id, &self.config.liveness);
        session.start(self.registry.handshake())?;

        self.table.lock().sessions.insert(id, session);
        Ok((id, outbound))
    }

    /// Closes and forgets a session.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if `id` is not open.
    pub fn close_session(&self, id: SessionId, reason: DisconnectReason) -> SessionResult<()> {
        let mut session = self
            .table
            .lock()
            .sessions
            .remove(&id)
            .ok_or(SessionError::UnknownSession(id.0))?;
        session.close(reason);
        Ok(())
    }

    /// Queues a message for one session.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if `id` is not open.
    pub fn send(&self, id: SessionId, message: Message) -> SessionResult<()> {
        let table = self.table.lock();
        let session = table
            .sessions
            .get(&id)
            .ok_or(SessionError::UnknownSession(id.0))?;
        session.send(message)
    }

    /// Decodes and dispatches every frame in `bytes`.
    ///
    /// `bytes` must hold whole frames. Any inbound data refreshes the short
    /// clock. Returns the number of frames dispatched.
    ///
    /// # Errors
    ///
    /// [`SessionError::Protocol`] if a frame could not be decoded or a
    /// handler failed fatally; the session is closed and removed first.
    pub fn receive(&self, id: SessionId, bytes: &[u8]) -> SessionResult<usize> {
        let mut table = self.table.lock();
        let session = table
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id.0))?;

        session.record_traffic();

        let mut input = PacketReader::new(bytes);
        let mut dispatched = 0;
        let mut failure = None;

        while !input.is_empty() && session.is_open() {
            let frame = match self.registry.decode_frame(&mut input) {
                Ok(frame) => frame,
                Err(e) => {
                    // Stream position is lost
                    failure = Some(e);
                    break;
                }
            };

            let opcode = frame.opcode;
            let mut ctx = HandlerContext {
                session: &mut *session,
                events: &self.events_tx,
            };
            match frame.dispatch(&mut ctx) {
                Ok(()) => dispatched += 1,
                Err(e) if e.is_fatal() => {
                    failure = Some(e);
                    break;
                }
                Err(e) => {
                    tracing::warn!("Session {} opcode 0x{:02X}: {}", id, opcode, e);
                    dispatched += 1;
                }
            }
        }

        if let Some(e) = failure {
            tracing::warn!("Session {} sent undecodable data: {}", id, e);
            session.close(DisconnectReason::Protocol(e.to_string()));
            table.sessions.remove(&id);
            return Err(e.into());
        }
        if !session.is_open() {
            table.sessions.remove(&id);
        }
        Ok(dispatched)
    }

    /// Encodes every queued outbound message of one session into `out`.
    ///
    /// Returns the number of frames written.
    ///
    /// # Errors
    ///
    /// If a queued message cannot be encoded. That message is dropped;
    /// frames written before it stay in `out`.
    pub fn encode_outbound(
        &self,
        outbound: &Receiver<Message>,
        out: &mut PacketWriter,
    ) -> ProtocolResult<usize> {
        let mut frames = 0;
        for message in outbound.try_iter() {
            self.registry.encode(&message, out)?;
            frames += 1;
        }
        Ok(frames)
    }

    /// Advances liveness for every session.
    ///
    /// Timed-out sessions are kicked and removed. Returns who was
    /// disconnected and why.
    pub fn tick_sessions(&self, dt: Duration) -> Vec<(SessionId, DisconnectReason)> {
        let mut table = self.table.lock();
        let mut closed = Vec::new();
        for (id, session) in &mut table.sessions {
            if let Some(reason) = session.tick(dt) {
                closed.push((*id, reason));
            }
        }
        for (id, _) in &closed {
            table.sessions.remove(id);
        }
        closed
    }

    /// Emits this tick's entity messages for one session.
    ///
    /// Returns the number of messages queued.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if `id` is not open.
    pub fn sync_entities(
        &self,
        id: SessionId,
        visible: &[&dyn SyncedEntity],
    ) -> SessionResult<usize> {
        let mut guard = self.table.lock();
        let SessionTable { sessions, scratch } = &mut *guard;
        let session = sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id.0))?;
        session.sync_entities(visible, scratch)
    }

    /// Sets the entity one session controls.
    ///
    /// # Errors
    ///
    /// [`SessionError::UnknownSession`] if `id` is not open.
    pub fn set_controlled_entity(&self, id: SessionId, entity_id: Option<i32>) -> SessionResult<()> {
        let mut table = self.table.lock();
        let session = table
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id.0))?;
        session.set_controlled_entity(entity_id);
        Ok(())
    }

    /// Shared round-trip time of one session, in milliseconds.
    #[must_use]
    pub fn session_latency(&self, id: SessionId) -> Option<Arc<AtomicF64>> {
        self.table
            .lock()
            .sessions
            .get(&id)
            .map(Session::latency_handle)
    }

    /// Channels one session registered.
    #[must_use]
    pub fn session_channels(&self, id: SessionId) -> Option<Vec<String>> {
        self.table
            .lock()
            .sessions
            .get(&id)
            .map(|s| s.channels().map(str::to_owned).collect())
    }
}

impl std::fmt::Debug for SyncServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServer")
            .field("config", &self.config)
            .field("sessions", &self.session_count())
            .finish_non_exhaustive()
    }
}

/// Scheduled task driving [`SyncServer::tick_sessions`].
#[derive(Debug)]
pub struct SessionLivenessTask {
    server: Arc<SyncServer>,
    last: Instant,
}

impl SessionLivenessTask {
    /// Creates the task; the first invocation advances by `now - start`.
    #[must_use]
    pub fn new(server: Arc<SyncServer>, start: Instant) -> Self {
        Self { server, last: start }
    }
}

impl ScheduledTask for SessionLivenessTask {
    fn name(&self) -> &'static str {
        "session-liveness"
    }

    fn run(&mut self, now: Instant) -> TaskResult {
        let Some(dt) = now.checked_duration_since(self.last) else {
            return Err(crate::error::TaskError::ClockWentBackwards(self.last - now));
        };
        self.last = now;
        for (id, reason) in self.server.tick_sessions(dt) {
            tracing::debug!("Session {} dropped by liveness: {}", id, reason);
        }
        Ok(())
    }
}
