//! # Entity Synchronization
//!
//! ```text
//! simulation ──► SyncedEntity ──► EntityTracker ──► EntitySynchronizer ──► Vec<Message>
//!                                   (per receiver)     (per entity)
//!
//! receiver   ◄── EntityMirror ◄── decoded messages
//! ```
//!
//! Each receiver owns its own tracker, because "last sent" differs per
//! receiver: an entity that just came into view spawns for one session
//! while another only gets a relative move.

mod kind;
mod mirror;
mod synchronizer;
mod tracker;

pub use kind::{protocol_velocity, EntityKind, VELOCITY_SCALE};
pub use mirror::{EntityMirror, MirroredEntity};
pub use synchronizer::{EntitySynchronizer, SyncPhase, RELATIVE_MOVE_RANGE};
pub use tracker::{EntityTracker, SyncedEntity};
