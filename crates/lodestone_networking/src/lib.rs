//! # LODESTONE Networking
//!
//! Wire protocol, entity synchronization and session liveness for a
//! multiplayer world server.
//!
//! ## Architecture
//!
//! - **Protocol**: one-byte opcode framing, a write-once codec table, and
//!   named sub-channels negotiated per session inside a generic envelope
//! - **Sync**: per-receiver delta encoding of entity transforms that never
//!   drifts from what the receiver reconstructs
//! - **Session**: dual-clock keep-alive liveness and channel negotiation
//! - **Server**: session table, fixed-period scheduler, tick-rate metrics
//!
//! ## Threading
//!
//! ```text
//! simulation thread ──► SyncServer::sync_entities ──► session queues
//! transport         ──► SyncServer::receive       ──► InboundEvent queue
//! scheduler thread  ──► liveness + tick-rate      ──► atomic metrics
//! ```
//!
//! Nothing here performs network I/O; the transport drains each session's
//! outbound queue and feeds inbound bytes back.
//!
//! ## Example
//!
//! ```rust
//! use lodestone_networking::{Message, NetworkConfig, SyncServer};
//!
//! let server = SyncServer::with_standard_protocol(NetworkConfig::default())?;
//! let (id, outbound) = server.open_session()?;
//! assert!(matches!(outbound.try_recv(), Ok(Message::RegisterChannels(_))));
//!
//! // 0x01 is not bound: the rest of the stream is unreadable
//! assert!(server.receive(id, &[0x01, 0x00]).is_err());
//! assert_eq!(server.session_count(), 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod sync;

// Re-exports for convenience
pub use config::{LivenessConfig, NetworkConfig, TickRateConfig};
pub use error::{
    ConfigError, ProtocolError, ProtocolResult, SessionError, SessionResult, SyncError,
    SyncResult, TaskError, TaskResult,
};
pub use protocol::{
    standard_registry, Message, MessageKind, PacketReader, PacketWriter, Parameter,
    ProtocolRegistry,
};
pub use server::{
    ScheduledTask, Scheduler, SessionLivenessTask, SyncServer, TickRateMetrics, TickRateMonitor,
};
pub use session::{DisconnectReason, InboundEvent, LivenessMonitor, Session, SessionId};
pub use sync::{EntityKind, EntityMirror, EntityTracker, SyncedEntity};

/// Default service port.
pub const DEFAULT_PORT: u16 = 25565;

/// Scheduler period in milliseconds (20 ticks per second).
pub const TICK_PERIOD_MS: u64 = 50;

/// Tick rate reported before enough samples exist.
#[allow(clippy::cast_precision_loss)]
pub const TARGET_TICK_RATE: f32 = 1000.0 / TICK_PERIOD_MS as f32;
