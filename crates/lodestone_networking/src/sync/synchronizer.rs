//! # Entity State Synchronizer
//!
//! Turns one entity's live state into the smallest set of messages that
//! keeps a receiver's copy exact.
//!
//! ## Per-tick decision
//!
//! ```text
//!                 ┌─ delta outside [-128, 127] or forced ─→ TELEPORT (+ LOOK if rotated/forced)
//! quantize live ──┤
//!                 ├─ moved and rotated ─→ LOOK + RELATIVE MOVE
//!                 ├─ moved only ────────→ RELATIVE MOVE
//!                 ├─ rotated only ──────→ LOOK
//!                 └─ neither ───────────→ (nothing)
//!
//! head yaw changed   → HEAD YAW
//! parameters changed → METADATA (whole list)
//! ```
//!
//! ## No drift
//!
//! The synchronizer remembers the last *sent* quantized transform and
//! computes every delta against it. The receiver applies exactly the same
//! integers, so both sides hold identical state after every message, no
//! matter how many ticks produced no output.

use std::ops::RangeInclusive;

use lodestone_core::{QuantizedTransform, Transform, Vec3};

use crate::error::{SyncError, SyncResult};
use crate::protocol::{
    EntityDestroy, EntityHeadYaw, EntityLook, EntityLookRelativeMove, EntityMetadata,
    EntityRelativeMove, EntitySpawn, EntityTeleport, Message, Parameter,
};
use crate::sync::kind::{protocol_velocity, EntityKind};

/// Quantized per-axis deltas a relative move can carry.
///
/// Bound by the signed-byte wire field.
pub const RELATIVE_MOVE_RANGE: RangeInclusive<i64> = (i8::MIN as i64)..=(i8::MAX as i64);

/// Lifecycle of a synchronizer. Destruction consumes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing sent yet; the next step must be a spawn.
    Init,
    /// Spawned; updates are deltas.
    Synced,
}

/// Per-entity, per-receiver encoder state.
#[derive(Clone, Debug)]
pub struct EntitySynchronizer {
    entity_id: i32,
    kind: EntityKind,
    phase: SyncPhase,
    last_sent: QuantizedTransform,
    last_parameters: Vec<Parameter>,
}

impl EntitySynchronizer {
    /// Creates a synchronizer in [`SyncPhase::Init`].
    #[must_use]
    pub fn new(entity_id: i32, kind: EntityKind) -> Self {
        Self {
            entity_id,
            kind,
            phase: SyncPhase::Init,
            last_sent: QuantizedTransform::default(),
            last_parameters: Vec::new(),
        }
    }

    /// Entity id.
    #[inline]
    #[must_use]
    pub const fn entity_id(&self) -> i32 {
        self.entity_id
    }

    /// Entity kind.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> SyncPhase {
        self.phase
    }

    /// Transform the receiver currently holds.
    #[inline]
    #[must_use]
    pub const fn last_sent(&self) -> &QuantizedTransform {
        &self.last_sent
    }

    /// Parameter list the receiver currently holds.
    #[inline]
    #[must_use]
    pub fn last_parameters(&self) -> &[Parameter] {
        &self.last_parameters
    }

    /// Emits the spawn message and moves to [`SyncPhase::Synced`].
    ///
    /// The spawn carries the kind's own parameters followed by `parameters`;
    /// only `parameters` become the metadata snapshot.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadySpawned`] outside [`SyncPhase::Init`].
    pub fn spawn(
        &mut self,
        live: &Transform,
        velocity: Vec3,
        parameters: &[Parameter],
        out: &mut Vec<Message>,
    ) -> SyncResult<()> {
        if self.phase != SyncPhase::Init {
            return Err(SyncError::AlreadySpawned(self.entity_id));
        }

        let q = live.quantize();
        let mut spawn_parameters = self.kind.spawn_parameters();
        spawn_parameters.extend_from_slice(parameters);

        out.push(Message::EntitySpawn(EntitySpawn {
            entity_id: self.entity_id,
            type_id: self.kind.type_id(),
            x: q.x,
            y: q.y,
            z: q.z,
            yaw: q.yaw,
            pitch: q.pitch,
            head_yaw: q.head_yaw,
            velocity: protocol_velocity(velocity),
            parameters: spawn_parameters,
        }));

        self.last_sent = q;
        self.last_parameters = parameters.to_vec();
        self.phase = SyncPhase::Synced;
        Ok(())
    }

    /// Emits whatever this tick needs and rebases on what was sent.
    ///
    /// `force` sends an absolute position and rotation even if nothing
    /// changed.
    ///
    /// # Errors
    ///
    /// [`SyncError::NotSpawned`] before [`EntitySynchronizer::spawn`].
    pub fn update(
        &mut self,
        live: &Transform,
        parameters: &[Parameter],
        force: bool,
        out: &mut Vec<Message>,
    ) -> SyncResult<()> {
        if self.phase != SyncPhase::Synced {
            return Err(SyncError::NotSpawned(self.entity_id));
        }

        let target = live.quantize();
        self.sync_body(&target, force, out);
        self.sync_head(&target, out);
        self.sync_parameters(parameters, out);
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn sync_body(&mut self, target: &QuantizedTransform, force: bool, out: &mut Vec<Message>) {
        let id = self.entity_id;
        let delta = target.position_delta(&self.last_sent);
        let moved = delta != [0, 0, 0];
        let rotated = target.rotation_differs(&self.last_sent);
        let out_of_range = delta.iter().any(|d| !RELATIVE_MOVE_RANGE.contains(d));

        let look = Message::EntityLook(EntityLook {
            entity_id: id,
            yaw: target.yaw,
            pitch: target.pitch,
        });

        if force || out_of_range {
            out.push(Message::EntityTeleport(EntityTeleport {
                entity_id: id,
                x: target.x,
                y: target.y,
                z: target.z,
                yaw: target.yaw,
                pitch: target.pitch,
            }));
            if force || rotated {
                out.push(look);
            }
        } else {
            // In range: every delta fits an i8
            let [dx, dy, dz] = delta.map(|d| d as i8);
            if moved && rotated {
                out.push(Message::EntityLookRelativeMove(EntityLookRelativeMove {
                    entity_id: id,
                    dx,
                    dy,
                    dz,
                    yaw: target.yaw,
                    pitch: target.pitch,
                }));
            } else if moved {
                out.push(Message::EntityRelativeMove(EntityRelativeMove {
                    entity_id: id,
                    dx,
                    dy,
                    dz,
                }));
            } else if rotated {
                out.push(look);
            }
        }

        self.last_sent.x = target.x;
        self.last_sent.y = target.y;
        self.last_sent.z = target.z;
        self.last_sent.yaw = target.yaw;
        self.last_sent.pitch = target.pitch;
    }

    fn sync_head(&mut self, target: &QuantizedTransform, out: &mut Vec<Message>) {
        if !self.kind.has_head() || target.head_yaw == self.last_sent.head_yaw {
            return;
        }
        out.push(Message::EntityHeadYaw(EntityHeadYaw {
            entity_id: self.entity_id,
            head_yaw: target.head_yaw,
        }));
        self.last_sent.head_yaw = target.head_yaw;
    }

    fn sync_parameters(&mut self, parameters: &[Parameter], out: &mut Vec<Message>) {
        if self.last_parameters.as_slice() == parameters {
            return;
        }
        self.last_parameters = parameters.to_vec();
        out.push(Message::EntityMetadata(EntityMetadata {
            entity_id: self.entity_id,
            parameters: parameters.to_vec(),
        }));
    }

    /// Consumes the synchronizer and returns its destroy message.
    #[must_use]
    pub fn destroy(self) -> Message {
        Message::EntityDestroy(EntityDestroy {
            entity_ids: vec![self.entity_id],
        })
    }
}
