//! # Entity Mirror
//!
//! Receiver-side view rebuilt purely from synchronization messages.
//!
//! Applying every message a synchronizer emits, in order, leaves the mirror
//! holding exactly the synchronizer's last-sent state.

use std::collections::HashMap;

use lodestone_core::QuantizedTransform;

use crate::error::{SyncError, SyncResult};
use crate::protocol::{Message, Parameter};

/// One entity as the receiver sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MirroredEntity {
    /// Wire type id from the spawn.
    pub type_id: u8,
    /// Quantized transform.
    pub transform: QuantizedTransform,
    /// Last received parameter list.
    pub parameters: Vec<Parameter>,
}

/// Entities reconstructed from inbound sync messages.
#[derive(Clone, Debug, Default)]
pub struct EntityMirror {
    entities: HashMap<i32, MirroredEntity>,
}

impl EntityMirror {
    /// Creates an empty mirror.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity state, if spawned and not destroyed.
    #[must_use]
    pub fn get(&self, entity_id: i32) -> Option<&MirroredEntity> {
        self.entities.get(&entity_id)
    }

    fn entity_mut(&mut self, entity_id: i32) -> SyncResult<&mut MirroredEntity> {
        self.entities
            .get_mut(&entity_id)
            .ok_or(SyncError::UnknownEntity(entity_id))
    }

    /// Applies one message.
    ///
    /// Returns `Ok(false)` for messages that are not entity sync messages.
    /// Relative moves wrap like the wire integers they model.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownEntity`] for an update to an entity that was
    /// never spawned or was destroyed, [`SyncError::AlreadyTracked`] for a
    /// second spawn.
    pub fn apply(&mut self, message: &Message) -> SyncResult<bool> {
        match message {
            Message::EntitySpawn(m) => {
                if self.entities.contains_key(&m.entity_id) {
                    return Err(SyncError::AlreadyTracked(m.entity_id));
                }
                self.entities.insert(
                    m.entity_id,
                    MirroredEntity {
                        type_id: m.type_id,
                        transform: QuantizedTransform {
                            x: m.x,
                            y: m.y,
                            z: m.z,
                            yaw: m.yaw,
                            pitch: m.pitch,
                            head_yaw: m.head_yaw,
                        },
                        parameters: m.parameters.clone(),
                    },
                );
            }
            Message::EntityDestroy(m) => {
                for id in &m.entity_ids {
                    self.entities
                        .remove(id)
                        .ok_or(SyncError::UnknownEntity(*id))?;
                }
            }
            Message::EntityTeleport(m) => {
                let t = &mut self.entity_mut(m.entity_id)?.transform;
                t.x = m.x;
                t.y = m.y;
                t.z = m.z;
                t.yaw = m.yaw;
                t.pitch = m.pitch;
            }
            Message::EntityRelativeMove(m) => {
                let t = &mut self.entity_mut(m.entity_id)?.transform;
                t.x = t.x.wrapping_add(i32::from(m.dx));
                t.y = t.y.wrapping_add(i32::from(m.dy));
                t.z = t.z.wrapping_add(i32::from(m.dz));
            }
            Message::EntityLookRelativeMove(m) => {
                let t = &mut self.entity_mut(m.entity_id)?.transform;
                t.x = t.x.wrapping_add(i32::from(m.dx));
                t.y = t.y.wrapping_add(i32::from(m.dy));
                t.z = t.z.wrapping_add(i32::from(m.dz));
                t.yaw = m.yaw;
                t.pitch = m.pitch;
            }
            Message::EntityLook(m) => {
                let t = &mut self.entity_mut(m.entity_id)?.transform;
                t.yaw = m.yaw;
                t.pitch = m.pitch;
            }
            Message::EntityHeadYaw(m) => {
                self.entity_mut(m.entity_id)?.transform.head_yaw = m.head_yaw;
            }
            Message::EntityMetadata(m) => {
                self.entity_mut(m.entity_id)?
                    .parameters
                    .clone_from(&m.parameters);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{EntityLook, EntityRelativeMove, KeepAlive};

    #[test]
    fn test_update_before_spawn() {
        let mut mirror = EntityMirror::new();
        let look = Message::EntityLook(EntityLook {
            entity_id: 9,
            yaw: 1,
            pitch: 1,
        });

        assert_eq!(mirror.apply(&look), Err(SyncError::UnknownEntity(9)));
    }

    #[test]
    fn test_non_sync_message() {
        let mut mirror = EntityMirror::new();
        assert_eq!(mirror.apply(&Message::KeepAlive(KeepAlive { hash: 3 })), Ok(false));
    }

    #[test]
    fn test_relative_moves_accumulate() {
        let mut mirror = EntityMirror::new();
        mirror
            .apply(&Message::EntitySpawn(crate::protocol::EntitySpawn {
                entity_id: 1,
                type_id: 90,
                x: 0,
                y: 0,
                z: 0,
                yaw: 0,
                pitch: 0,
                head_yaw: 0,
                velocity: [0; 3],
                parameters: Vec::new(),
            }))
            .unwrap();

        for _ in 0..3 {
            mirror
                .apply(&Message::EntityRelativeMove(EntityRelativeMove {
                    entity_id: 1,
                    dx: 100,
                    dy: -128,
                    dz: 1,
                }))
                .unwrap();
        }

        let t = mirror.get(1).unwrap().transform;
        assert_eq!((t.x, t.y, t.z), (300, -384, 3));
    }
}
