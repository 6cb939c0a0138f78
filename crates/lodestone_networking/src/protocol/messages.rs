//! # Message Definitions
//!
//! Every message the synchronization layer sends or understands.
//!
//! Opcodes are not part of a message: the registry binds them, so the same
//! message type could sit behind a different byte in another protocol table.

use crate::protocol::parameter::Parameter;

/// Discriminant of a [`Message`], used to look up its codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKind {
    /// Keep-alive challenge or response.
    KeepAlive,
    /// Client posture change.
    EntityAction,
    /// Entity creation.
    EntitySpawn,
    /// Entity removal.
    EntityDestroy,
    /// Small position change.
    EntityRelativeMove,
    /// Absolute body rotation.
    EntityLook,
    /// Small position change plus rotation.
    EntityLookRelativeMove,
    /// Absolute position and rotation.
    EntityTeleport,
    /// Absolute head rotation.
    EntityHeadYaw,
    /// Auxiliary parameter list.
    EntityMetadata,
    /// Block event.
    BlockAction,
    /// Generic named-channel envelope.
    PluginMessage,
    /// Disconnect with reason.
    Kick,
    /// Channel names the sender can receive.
    RegisterChannels,
    /// Channel names the sender no longer receives.
    UnregisterChannels,
    /// Command block edit carried on a named channel.
    CommandBlockEdit,
    /// Beacon effect selection carried on a named channel.
    BeaconEffect,
}

/// Keep-alive message: a ping challenge, or its echo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeepAlive {
    /// Challenge hash; the echo carries the same value.
    pub hash: i32,
}

/// Client-issued posture change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityAction {
    /// Entity performing the action.
    pub entity_id: i32,
    /// One of the `ACTION_*` constants.
    pub action: i8,
    /// Action-specific data (e.g. jump boost).
    pub aux: i32,
}

impl EntityAction {
    /// Action: start crouching.
    pub const ACTION_CROUCH: i8 = 1;
    /// Action: stop crouching.
    pub const ACTION_UNCROUCH: i8 = 2;
    /// Action: leave bed.
    pub const ACTION_LEAVE_BED: i8 = 3;
    /// Action: start sprinting.
    pub const ACTION_START_SPRINTING: i8 = 4;
    /// Action: stop sprinting.
    pub const ACTION_STOP_SPRINTING: i8 = 5;

    /// Creates an action message with no auxiliary data.
    #[inline]
    #[must_use]
    pub const fn new(entity_id: i32, action: i8) -> Self {
        Self {
            entity_id,
            action,
            aux: 0,
        }
    }
}

/// Entity creation. Carries the full quantized transform.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntitySpawn {
    /// New entity id.
    pub entity_id: i32,
    /// Kind-specific type id.
    pub type_id: u8,
    /// X in 1/32 units.
    pub x: i32,
    /// Y in 1/32 units.
    pub y: i32,
    /// Z in 1/32 units.
    pub z: i32,
    /// Body yaw.
    pub yaw: i8,
    /// Pitch.
    pub pitch: i8,
    /// Head yaw.
    pub head_yaw: i8,
    /// Velocity in 1/8000 units per tick.
    pub velocity: [i16; 3],
    /// Kind spawn parameters followed by the current auxiliary parameters.
    pub parameters: Vec<Parameter>,
}

/// Removal of one or more entities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDestroy {
    /// Ids to remove. At most 255 per message.
    pub entity_ids: Vec<i32>,
}

/// Position change within a single signed byte per axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityRelativeMove {
    /// Entity id.
    pub entity_id: i32,
    /// X delta in 1/32 units.
    pub dx: i8,
    /// Y delta in 1/32 units.
    pub dy: i8,
    /// Z delta in 1/32 units.
    pub dz: i8,
}

/// Absolute body rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLook {
    /// Entity id.
    pub entity_id: i32,
    /// Body yaw.
    pub yaw: i8,
    /// Pitch.
    pub pitch: i8,
}

/// Relative move and absolute rotation in one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityLookRelativeMove {
    /// Entity id.
    pub entity_id: i32,
    /// X delta in 1/32 units.
    pub dx: i8,
    /// Y delta in 1/32 units.
    pub dy: i8,
    /// Z delta in 1/32 units.
    pub dz: i8,
    /// Body yaw.
    pub yaw: i8,
    /// Pitch.
    pub pitch: i8,
}

/// Absolute position and rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityTeleport {
    /// Entity id.
    pub entity_id: i32,
    /// X in 1/32 units.
    pub x: i32,
    /// Y in 1/32 units.
    pub y: i32,
    /// Z in 1/32 units.
    pub z: i32,
    /// Body yaw.
    pub yaw: i8,
    /// Pitch.
    pub pitch: i8,
}

/// Absolute head rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityHeadYaw {
    /// Entity id.
    pub entity_id: i32,
    /// Head yaw.
    pub head_yaw: i8,
}

/// Replacement auxiliary parameter list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityMetadata {
    /// Entity id.
    pub entity_id: i32,
    /// Complete current list.
    pub parameters: Vec<Parameter>,
}

/// Block event at a position.
///
/// Size: 12 bytes on the wire after the opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockAction {
    /// Block X.
    pub x: i32,
    /// Block Y, unsigned.
    pub y: u16,
    /// Block Z.
    pub z: i32,
    /// First event byte.
    pub first: i8,
    /// Second event byte.
    pub second: i8,
}

/// Named-channel envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginMessage {
    /// Channel name.
    pub channel: String,
    /// Encoded inner payload.
    pub data: Vec<u8>,
}

/// Disconnect notice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Kick {
    /// Human-readable reason.
    pub reason: String,
}

/// A set of channel names. Used by both the register and unregister messages.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelList {
    /// Channel names, in announcement order.
    pub channels: Vec<String>,
}

impl ChannelList {
    /// Builds a list from anything yielding names.
    #[must_use]
    pub fn new<I, S>(channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
        }
    }
}

/// Command block contents edited by a client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandBlockEdit {
    /// Block X.
    pub x: i32,
    /// Block Y.
    pub y: i32,
    /// Block Z.
    pub z: i32,
    /// New command text.
    pub command: String,
}

/// Beacon effects chosen by a client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BeaconEffect {
    /// Primary effect id.
    pub primary: i32,
    /// Secondary effect id.
    pub secondary: i32,
}

/// Any message the layer can carry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Message {
    /// Keep-alive challenge or response.
    KeepAlive(KeepAlive),
    /// Client posture change.
    EntityAction(EntityAction),
    /// Entity creation.
    EntitySpawn(EntitySpawn),
    /// Entity removal.
    EntityDestroy(EntityDestroy),
    /// Small position change.
    EntityRelativeMove(EntityRelativeMove),
    /// Absolute body rotation.
    EntityLook(EntityLook),
    /// Small position change plus rotation.
    EntityLookRelativeMove(EntityLookRelativeMove),
    /// Absolute position and rotation.
    EntityTeleport(EntityTeleport),
    /// Absolute head rotation.
    EntityHeadYaw(EntityHeadYaw),
    /// Auxiliary parameter list.
    EntityMetadata(EntityMetadata),
    /// Block event.
    BlockAction(BlockAction),
    /// Named-channel envelope.
    PluginMessage(PluginMessage),
    /// Disconnect with reason.
    Kick(Kick),
    /// Channels the sender can receive.
    RegisterChannels(ChannelList),
    /// Channels the sender no longer receives.
    UnregisterChannels(ChannelList),
    /// Command block edit.
    CommandBlockEdit(CommandBlockEdit),
    /// Beacon effect selection.
    BeaconEffect(BeaconEffect),
}

impl Message {
    /// Returns the discriminant used for codec lookup.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::KeepAlive(_) => MessageKind::KeepAlive,
            Self::EntityAction(_) => MessageKind::EntityAction,
            Self::EntitySpawn(_) => MessageKind::EntitySpawn,
            Self::EntityDestroy(_) => MessageKind::EntityDestroy,
            Self::EntityRelativeMove(_) => MessageKind::EntityRelativeMove,
            Self::EntityLook(_) => MessageKind::EntityLook,
            Self::EntityLookRelativeMove(_) => MessageKind::EntityLookRelativeMove,
            Self::EntityTeleport(_) => MessageKind::EntityTeleport,
            Self::EntityHeadYaw(_) => MessageKind::EntityHeadYaw,
            Self::EntityMetadata(_) => MessageKind::EntityMetadata,
            Self::BlockAction(_) => MessageKind::BlockAction,
            Self::PluginMessage(_) => MessageKind::PluginMessage,
            Self::Kick(_) => MessageKind::Kick,
            Self::RegisterChannels(_) => MessageKind::RegisterChannels,
            Self::UnregisterChannels(_) => MessageKind::UnregisterChannels,
            Self::CommandBlockEdit(_) => MessageKind::CommandBlockEdit,
            Self::BeaconEffect(_) => MessageKind::BeaconEffect,
        }
    }

    /// The entity a sync message refers to, if any.
    ///
    /// Destroy messages report their first id.
    #[must_use]
    pub fn entity_id(&self) -> Option<i32> {
        match self {
            Self::EntityAction(m) => Some(m.entity_id),
            Self::EntitySpawn(m) => Some(m.entity_id),
            Self::EntityDestroy(m) => m.entity_ids.first().copied(),
            Self::EntityRelativeMove(m) => Some(m.entity_id),
            Self::EntityLook(m) => Some(m.entity_id),
            Self::EntityLookRelativeMove(m) => Some(m.entity_id),
            Self::EntityTeleport(m) => Some(m.entity_id),
            Self::EntityHeadYaw(m) => Some(m.entity_id),
            Self::EntityMetadata(m) => Some(m.entity_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            Message::KeepAlive(KeepAlive { hash: 1 }).kind(),
            MessageKind::KeepAlive
        );
        assert_eq!(
            Message::RegisterChannels(ChannelList::new(["A"])).kind(),
            MessageKind::RegisterChannels
        );
    }

    #[test]
    fn test_entity_id() {
        let look = Message::EntityLook(EntityLook {
            entity_id: 12,
            yaw: 0,
            pitch: 0,
        });
        assert_eq!(look.entity_id(), Some(12));

        let destroy = Message::EntityDestroy(EntityDestroy {
            entity_ids: vec![4, 5],
        });
        assert_eq!(destroy.entity_id(), Some(4));

        assert_eq!(Message::Kick(Kick { reason: String::new() }).entity_id(), None);
    }
}
