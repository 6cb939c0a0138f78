//! # Message Codecs
//!
//! One stateless codec per message type. A codec turns its message into a
//! payload (no opcode) and back.
//!
//! Codecs bound to an opcode use their name for diagnostics only. Codecs
//! registered on a dynamic channel use their name as the channel name.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::buffer::{PacketReader, PacketWriter};
use crate::protocol::messages::{
    BeaconEffect, BlockAction, ChannelList, CommandBlockEdit, EntityAction, EntityDestroy,
    EntityHeadYaw, EntityLook, EntityLookRelativeMove, EntityMetadata, EntityRelativeMove,
    EntitySpawn, EntityTeleport, KeepAlive, Kick, Message, MessageKind, PluginMessage,
};
use crate::protocol::parameter::{read_parameters, write_parameters};

/// Bidirectional translator between one message type and its payload bytes.
pub trait Codec: Send + Sync {
    /// Diagnostic name, or the channel name for dynamic codecs.
    fn name(&self) -> &'static str;

    /// Kind of message this codec handles.
    fn kind(&self) -> MessageKind;

    /// Appends the payload of `message` to `out`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnexpectedMessage`] if `message` is of another kind,
    /// or a field error if a value cannot be represented.
    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()>;

    /// Reads one payload from `input`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Truncated`] or [`ProtocolError::Malformed`] on bad input.
    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message>;
}

fn unexpected(codec: &dyn Codec, message: &Message) -> ProtocolError {
    ProtocolError::UnexpectedMessage {
        codec: codec.name(),
        found: message.kind(),
    }
}

/// Codec for [`KeepAlive`].
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepAliveCodec;

impl Codec for KeepAliveCodec {
    fn name(&self) -> &'static str {
        "keep_alive"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::KeepAlive
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::KeepAlive(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.hash);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::KeepAlive(KeepAlive {
            hash: input.read_i32()?,
        }))
    }
}

/// Codec for [`EntityAction`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityActionCodec;

impl Codec for EntityActionCodec {
    fn name(&self) -> &'static str {
        "entity_action"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityAction
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityAction(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        out.write_i8(m.action);
        out.write_i32(m.aux);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntityAction(EntityAction {
            entity_id: input.read_i32()?,
            action: input.read_i8()?,
            aux: input.read_i32()?,
        }))
    }
}

/// Codec for [`EntitySpawn`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntitySpawnCodec;

impl Codec for EntitySpawnCodec {
    fn name(&self) -> &'static str {
        "entity_spawn"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntitySpawn
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntitySpawn(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        out.write_u8(m.type_id);
        out.write_i32(m.x);
        out.write_i32(m.y);
        out.write_i32(m.z);
        out.write_i8(m.yaw);
        out.write_i8(m.pitch);
        out.write_i8(m.head_yaw);
        for axis in m.velocity {
            out.write_i16(axis);
        }
        write_parameters(out, &m.parameters)
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntitySpawn(EntitySpawn {
            entity_id: input.read_i32()?,
            type_id: input.read_u8()?,
            x: input.read_i32()?,
            y: input.read_i32()?,
            z: input.read_i32()?,
            yaw: input.read_i8()?,
            pitch: input.read_i8()?,
            head_yaw: input.read_i8()?,
            velocity: [input.read_i16()?, input.read_i16()?, input.read_i16()?],
            parameters: read_parameters(input)?,
        }))
    }
}

/// Codec for [`EntityDestroy`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityDestroyCodec;

impl Codec for EntityDestroyCodec {
    fn name(&self) -> &'static str {
        "entity_destroy"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityDestroy
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityDestroy(m) = message else {
            return Err(unexpected(self, message));
        };
        let Ok(count) = u8::try_from(m.entity_ids.len()) else {
            return Err(ProtocolError::Malformed(format!(
                "cannot destroy {} entities in one message",
                m.entity_ids.len()
            )));
        };
        out.write_u8(count);
        for id in &m.entity_ids {
            out.write_i32(*id);
        }
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        let count = input.read_u8()?;
        let entity_ids = (0..count)
            .map(|_| input.read_i32())
            .collect::<ProtocolResult<Vec<_>>>()?;
        Ok(Message::EntityDestroy(EntityDestroy { entity_ids }))
    }
}

/// Codec for [`EntityRelativeMove`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityRelativeMoveCodec;

impl Codec for EntityRelativeMoveCodec {
    fn name(&self) -> &'static str {
        "entity_relative_move"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityRelativeMove
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityRelativeMove(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        out.write_i8(m.dx);
        out.write_i8(m.dy);
        out.write_i8(m.dz);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntityRelativeMove(EntityRelativeMove {
            entity_id: input.read_i32()?,
            dx: input.read_i8()?,
            dy: input.read_i8()?,
            dz: input.read_i8()?,
        }))
    }
}

/// Codec for [`EntityLook`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityLookCodec;

impl Codec for EntityLookCodec {
    fn name(&self) -> &'static str {
        "entity_look"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityLook
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityLook(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        out.write_i8(m.yaw);
        out.write_i8(m.pitch);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntityLook(EntityLook {
            entity_id: input.read_i32()?,
            yaw: input.read_i8()?,
            pitch: input.read_i8()?,
        }))
    }
}

/// Codec for [`EntityLookRelativeMove`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityLookRelativeMoveCodec;

impl Codec for EntityLookRelativeMoveCodec {
    fn name(&self) -> &'static str {
        "entity_look_relative_move"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityLookRelativeMove
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityLookRelativeMove(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        out.write_i8(m.dx);
        out.write_i8(m.dy);
        out.write_i8(m.dz);
        out.write_i8(m.yaw);
        out.write_i8(m.pitch);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntityLookRelativeMove(EntityLookRelativeMove {
            entity_id: input.read_i32()?,
            dx: input.read_i8()?,
            dy: input.read_i8()?,
            dz: input.read_i8()?,
            yaw: input.read_i8()?,
            pitch: input.read_i8()?,
        }))
    }
}

/// Codec for [`EntityTeleport`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityTeleportCodec;

impl Codec for EntityTeleportCodec {
    fn name(&self) -> &'static str {
        "entity_teleport"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityTeleport
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityTeleport(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        out.write_i32(m.x);
        out.write_i32(m.y);
        out.write_i32(m.z);
        out.write_i8(m.yaw);
        out.write_i8(m.pitch);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntityTeleport(EntityTeleport {
            entity_id: input.read_i32()?,
            x: input.read_i32()?,
            y: input.read_i32()?,
            z: input.read_i32()?,
            yaw: input.read_i8()?,
            pitch: input.read_i8()?,
        }))
    }
}

/// Codec for [`EntityHeadYaw`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityHeadYawCodec;

impl Codec for EntityHeadYawCodec {
    fn name(&self) -> &'static str {
        "entity_head_yaw"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityHeadYaw
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityHeadYaw(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        out.write_i8(m.head_yaw);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntityHeadYaw(EntityHeadYaw {
            entity_id: input.read_i32()?,
            head_yaw: input.read_i8()?,
        }))
    }
}

/// Codec for [`EntityMetadata`].
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityMetadataCodec;

impl Codec for EntityMetadataCodec {
    fn name(&self) -> &'static str {
        "entity_metadata"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::EntityMetadata
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::EntityMetadata(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.entity_id);
        write_parameters(out, &m.parameters)
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::EntityMetadata(EntityMetadata {
            entity_id: input.read_i32()?,
            parameters: read_parameters(input)?,
        }))
    }
}

/// Codec for [`BlockAction`].
///
/// Twelve bytes: the field widths add up to 4 + 2 + 4 + 1 + 1.
///
/// ```text
/// ┌────────┬──────────┬────────┬────────┬────────┐
/// │ x: i32 │ y: u16   │ z: i32 │ b1: i8 │ b2: i8 │
/// └────────┴──────────┴────────┴────────┴────────┘
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockActionCodec;

impl BlockActionCodec {
    /// Payload size in bytes.
    pub const SIZE: usize = 12;
}

impl Codec for BlockActionCodec {
    fn name(&self) -> &'static str {
        "block_action"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::BlockAction
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::BlockAction(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.x);
        out.write_u16(m.y);
        out.write_i32(m.z);
        out.write_i8(m.first);
        out.write_i8(m.second);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::BlockAction(BlockAction {
            x: input.read_i32()?,
            y: input.read_u16()?,
            z: input.read_i32()?,
            first: input.read_i8()?,
            second: input.read_i8()?,
        }))
    }
}

/// Codec for the named-channel envelope.
#[derive(Clone, Copy, Debug, Default)]
pub struct PluginMessageCodec;

impl Codec for PluginMessageCodec {
    fn name(&self) -> &'static str {
        "plugin_message"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::PluginMessage
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::PluginMessage(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_string(&m.channel)?;
        out.write_byte_array(&m.data)
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        let channel = input.read_string()?;
        let data = input.read_byte_array()?.to_vec();
        Ok(Message::PluginMessage(PluginMessage { channel, data }))
    }
}

/// Codec for [`Kick`].
#[derive(Clone, Copy, Debug, Default)]
pub struct KickCodec;

impl Codec for KickCodec {
    fn name(&self) -> &'static str {
        "kick"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::Kick
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::Kick(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_string(&m.reason)
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::Kick(Kick {
            reason: input.read_string()?,
        }))
    }
}

fn write_channel_names(list: &ChannelList, out: &mut PacketWriter) {
    for (i, channel) in list.channels.iter().enumerate() {
        if i > 0 {
            out.write_u8(0);
        }
        out.write_raw(channel.as_bytes());
    }
}

fn read_channel_names(input: &mut PacketReader<'_>) -> ProtocolResult<ChannelList> {
    let raw = input.read_rest();
    let channels = raw
        .split(|b| *b == 0)
        .filter(|name| !name.is_empty())
        .map(|name| {
            std::str::from_utf8(name)
                .map(str::to_owned)
                .map_err(|_| ProtocolError::Malformed("channel name is not UTF-8".into()))
        })
        .collect::<ProtocolResult<Vec<_>>>()?;
    Ok(ChannelList { channels })
}

/// Payload codec for the reserved `REGISTER` channel: NUL-separated names.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegisterChannelsCodec;

impl Codec for RegisterChannelsCodec {
    fn name(&self) -> &'static str {
        "REGISTER"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::RegisterChannels
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::RegisterChannels(list) = message else {
            return Err(unexpected(self, message));
        };
        write_channel_names(list, out);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        read_channel_names(input).map(Message::RegisterChannels)
    }
}

/// Payload codec for the reserved `UNREGISTER` channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnregisterChannelsCodec;

impl Codec for UnregisterChannelsCodec {
    fn name(&self) -> &'static str {
        "UNREGISTER"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::UnregisterChannels
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::UnregisterChannels(list) = message else {
            return Err(unexpected(self, message));
        };
        write_channel_names(list, out);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        read_channel_names(input).map(Message::UnregisterChannels)
    }
}

/// Dynamic codec for command block edits on `MC|AdvCdm`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandBlockCodec;

impl Codec for CommandBlockCodec {
    fn name(&self) -> &'static str {
        "MC|AdvCdm"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::CommandBlockEdit
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::CommandBlockEdit(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.x);
        out.write_i32(m.y);
        out.write_i32(m.z);
        out.write_string(&m.command)
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::CommandBlockEdit(CommandBlockEdit {
            x: input.read_i32()?,
            y: input.read_i32()?,
            z: input.read_i32()?,
            command: input.read_string()?,
        }))
    }
}

/// Dynamic codec for beacon effect selection on `MC|Beacon`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BeaconCodec;

impl Codec for BeaconCodec {
    fn name(&self) -> &'static str {
        "MC|Beacon"
    }

    fn kind(&self) -> MessageKind {
        MessageKind::BeaconEffect
    }

    fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let Message::BeaconEffect(m) = message else {
            return Err(unexpected(self, message));
        };
        out.write_i32(m.primary);
        out.write_i32(m.secondary);
        Ok(())
    }

    fn decode(&self, input: &mut PacketReader<'_>) -> ProtocolResult<Message> {
        Ok(Message::BeaconEffect(BeaconEffect {
            primary: input.read_i32()?,
            secondary: input.read_i32()?,
        }))
    }
}
