//! Entity kinds and what they add to a spawn message.

use lodestone_core::Vec3;

use crate::protocol::Parameter;

/// Velocity scale on the wire (units per world unit per tick).
pub const VELOCITY_SCALE: f64 = 8000.0;

/// Kind of a synchronized entity.
///
/// Decides the spawn type id, the kind-specific spawn parameters, and
/// whether the entity has a head that turns independently of its body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// A plain mob.
    Creature {
        /// Wire type id.
        type_id: u8,
    },
    /// A creeper: fuse state and charge travel with the spawn.
    Creeper {
        /// Fuse state (-1 idle, 1 fusing).
        fuse: i8,
        /// Struck by lightning.
        charged: bool,
    },
    /// The dragon: health travels with the spawn.
    EnderDragon {
        /// Current health.
        health: i32,
    },
    /// A non-living object. Objects have no head.
    Object {
        /// Wire type id.
        type_id: u8,
    },
}

impl EntityKind {
    /// Wire type id for creepers.
    pub const CREEPER_TYPE_ID: u8 = 50;
    /// Wire type id for the dragon.
    pub const ENDER_DRAGON_TYPE_ID: u8 = 63;

    /// Spawn parameter index of the creeper fuse.
    pub const CREEPER_FUSE_INDEX: u8 = 16;
    /// Spawn parameter index of the creeper charge flag.
    pub const CREEPER_CHARGED_INDEX: u8 = 17;
    /// Spawn parameter index of the dragon health.
    pub const DRAGON_HEALTH_INDEX: u8 = 16;

    /// Wire type id.
    #[must_use]
    pub const fn type_id(&self) -> u8 {
        match self {
            Self::Creature { type_id } | Self::Object { type_id } => *type_id,
            Self::Creeper { .. } => Self::CREEPER_TYPE_ID,
            Self::EnderDragon { .. } => Self::ENDER_DRAGON_TYPE_ID,
        }
    }

    /// True if head yaw is synchronized separately from body yaw.
    #[must_use]
    pub const fn has_head(&self) -> bool {
        !matches!(self, Self::Object { .. })
    }

    /// Parameters only this kind puts in its spawn message.
    #[must_use]
    pub fn spawn_parameters(&self) -> Vec<Parameter> {
        match *self {
            Self::Creeper { fuse, charged } => vec![
                Parameter::byte(Self::CREEPER_FUSE_INDEX, fuse),
                Parameter::byte(Self::CREEPER_CHARGED_INDEX, i8::from(charged)),
            ],
            Self::EnderDragon { health } => vec![Parameter::int(Self::DRAGON_HEALTH_INDEX, health)],
            Self::Creature { .. } | Self::Object { .. } => Vec::new(),
        }
    }
}

/// Converts a velocity in world units per tick to wire units.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn protocol_velocity(velocity: Vec3) -> [i16; 3] {
    let axis = |v: f64| (v * VELOCITY_SCALE).clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
    [axis(velocity.x), axis(velocity.y), axis(velocity.z)]
}
