//! Per-receiver set of entity synchronizers.

use std::collections::{HashMap, HashSet};

use lodestone_core::{Transform, Vec3};

use crate::error::{SyncError, SyncResult};
use crate::protocol::{EntityDestroy, Message, Parameter};
use crate::sync::kind::EntityKind;
use crate::sync::synchronizer::EntitySynchronizer;

/// What the simulation exposes about an entity.
pub trait SyncedEntity {
    /// Stable id.
    fn entity_id(&self) -> i32;

    /// Kind, fixed for the entity's lifetime.
    fn kind(&self) -> EntityKind;

    /// Live transform.
    fn transform(&self) -> Transform;

    /// Velocity in world units per tick. Only used at spawn.
    fn velocity(&self) -> Vec3 {
        Vec3::default()
    }

    /// Current auxiliary parameters.
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// True to send an absolute position this tick.
    fn needs_resync(&self) -> bool {
        false
    }
}

/// Synchronizers for every entity one receiver can see.
#[derive(Debug, Default)]
pub struct EntityTracker {
    synchronizers: HashMap<i32, EntitySynchronizer>,
}

impl EntityTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.synchronizers.len()
    }

    /// True if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.synchronizers.is_empty()
    }

    /// True if `entity_id` is tracked.
    #[must_use]
    pub fn is_tracked(&self, entity_id: i32) -> bool {
        self.synchronizers.contains_key(&entity_id)
    }

    /// Synchronizer for `entity_id`.
    #[must_use]
    pub fn get(&self, entity_id: i32) -> Option<&EntitySynchronizer> {
        self.synchronizers.get(&entity_id)
    }

    /// Starts tracking `entity` and emits its spawn.
    ///
    /// # Errors
    ///
    /// [`SyncError::AlreadyTracked`] if the id is tracked.
    pub fn track(&mut self, entity: &dyn SyncedEntity, out: &mut Vec<Message>) -> SyncResult<()> {
        let id = entity.entity_id();
        if self.synchronizers.contains_key(&id) {
            return Err(SyncError::AlreadyTracked(id));
        }
        let mut sync = EntitySynchronizer::new(id, entity.kind());
        sync.spawn(&entity.transform(), entity.velocity(), &entity.parameters(), out)?;
        self.synchronizers.insert(id, sync);
        Ok(())
    }

    /// Emits this tick's updates for a tracked entity.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownEntity`] if the id is not tracked.
    pub fn update(&mut self, entity: &dyn SyncedEntity, out: &mut Vec<Message>) -> SyncResult<()> {
        let id = entity.entity_id();
        let sync = self
            .synchronizers
            .get_mut(&id)
            .ok_or(SyncError::UnknownEntity(id))?;
        sync.update(
            &entity.transform(),
            &entity.parameters(),
            entity.needs_resync(),
            out,
        )
    }

    /// Stops tracking and emits the destroy message.
    ///
    /// # Errors
    ///
    /// [`SyncError::UnknownEntity`] if the id is not tracked.
    pub fn untrack(&mut self, entity_id: i32, out: &mut Vec<Message>) -> SyncResult<()> {
        let sync = self
            .synchronizers
            .remove(&entity_id)
            .ok_or(SyncError::UnknownEntity(entity_id))?;
        out.push(sync.destroy());
        Ok(())
    }

    /// Brings the receiver's view in line with `visible`.
    ///
    /// New entities spawn, known ones update, and entities no longer visible
    /// are destroyed together in one message.
    pub fn sync_visible(&mut self, visible: &[&dyn SyncedEntity], out: &mut Vec<Message>) {
        let mut seen = HashSet::with_capacity(visible.len());

        for entity in visible {
            let id = entity.entity_id();
            if !seen.insert(id) {
                continue;
            }
            let result = if self.is_tracked(id) {
                self.update(*entity, out)
            } else {
                self.track(*entity, out)
            };
            if let Err(e) = result {
                tracing::warn!("Entity sync failed: {}", e);
            }
        }

        let mut gone: Vec<i32> = self
            .synchronizers
            .keys()
            .copied()
            .filter(|id| !seen.contains(id))
            .collect();
        if gone.is_empty() {
            return;
        }
        gone.sort_unstable();
        for id in &gone {
            self.synchronizers.remove(id);
        }
        for chunk in gone.chunks(usize::from(u8::MAX)) {
            out.push(Message::EntityDestroy(EntityDestroy {
                entity_ids: chunk.to_vec(),
            }));
        }
    }

    /// Drops every synchronizer without emitting anything.
    pub fn clear(&mut self) {
        self.synchronizers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageKind;

    struct Pig {
        id: i32,
        at: Transform,
    }

    impl SyncedEntity for Pig {
        fn entity_id(&self) -> i32 {
            self.id
        }

        fn kind(&self) -> EntityKind {
            EntityKind::Creature { type_id: 90 }
        }

        fn transform(&self) -> Transform {
            self.at
        }
    }

    #[test]
    fn test_track_update_untrack() {
        let mut tracker = EntityTracker::new();
        let mut pig = Pig {
            id: 5,
            at: Transform::default(),
        };
        let mut out = Vec::new();

        tracker.track(&pig, &mut out).unwrap();
        assert_eq!(tracker.track(&pig, &mut out), Err(SyncError::AlreadyTracked(5)));

        pig.at = Transform::new(1.0, 0.0, 0.0, 0.0, 0.0);
        tracker.update(&pig, &mut out).unwrap();
        tracker.untrack(5, &mut out).unwrap();

        let kinds: Vec<_> = out.iter().map(Message::kind).collect();
        assert_eq!(
            kinds,
            [
                MessageKind::EntitySpawn,
                MessageKind::EntityRelativeMove,
                MessageKind::EntityDestroy
            ]
        );

        // Destroyed means gone: no further messages possible
        assert_eq!(tracker.update(&pig, &mut out), Err(SyncError::UnknownEntity(5)));
        assert_eq!(tracker.untrack(5, &mut out), Err(SyncError::UnknownEntity(5)));
    }

    #[test]
    fn test_sync_visible() {
        let mut tracker = EntityTracker::new();
        let a = Pig {
            id: 1,
            at: Transform::default(),
        };
        let b = Pig {
            id: 2,
            at: Transform::default(),
        };
        let mut out = Vec::new();

        tracker.sync_visible(&[&a, &b], &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(tracker.len(), 2);

        out.clear();
        tracker.sync_visible(&[&b], &mut out);
        assert_eq!(
            out,
            [Message::EntityDestroy(EntityDestroy {
                entity_ids: vec![1]
            })]
        );
        assert!(!tracker.is_tracked(1));
    }
}
