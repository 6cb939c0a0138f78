//! The standard opcode table, built in one explicit, ordered pass.

use crate::error::ProtocolResult;
use crate::protocol::codecs::{
    BeaconCodec, BlockActionCodec, CommandBlockCodec, EntityActionCodec, EntityDestroyCodec,
    EntityHeadYawCodec, EntityLookCodec, EntityLookRelativeMoveCodec, EntityMetadataCodec,
    EntityRelativeMoveCodec, EntitySpawnCodec, EntityTeleportCodec, KeepAliveCodec, KickCodec,
    PluginMessageCodec, RegisterChannelsCodec, UnregisterChannelsCodec,
};
use crate::protocol::registry::ProtocolRegistry;
use crate::session::handlers::{
    DiscardHandler, ForwardHandler, KeepAliveHandler, KickHandler, RegisterChannelsHandler,
    UnregisterChannelsHandler,
};

/// Opcodes of the standard table.
pub mod opcodes {
    /// Keep-alive challenge / echo.
    pub const KEEP_ALIVE: u8 = 0x00;
    /// Posture change.
    pub const ENTITY_ACTION: u8 = 0x13;
    /// Entity spawn.
    pub const ENTITY_SPAWN: u8 = 0x18;
    /// Entity destroy.
    pub const ENTITY_DESTROY: u8 = 0x1D;
    /// Relative move.
    pub const ENTITY_RELATIVE_MOVE: u8 = 0x1F;
    /// Look.
    pub const ENTITY_LOOK: u8 = 0x20;
    /// Look and relative move.
    pub const ENTITY_LOOK_RELATIVE_MOVE: u8 = 0x21;
    /// Teleport.
    pub const ENTITY_TELEPORT: u8 = 0x22;
    /// Head yaw.
    pub const ENTITY_HEAD_YAW: u8 = 0x23;
    /// Metadata.
    pub const ENTITY_METADATA: u8 = 0x28;
    /// Block action.
    pub const BLOCK_ACTION: u8 = 0x36;
    /// Named-channel envelope.
    pub const PLUGIN_MESSAGE: u8 = 0xFA;
    /// Kick.
    pub const KICK: u8 = 0xFF;
}

/// Builds the standard table with its built-in handlers.
///
/// Sync messages only travel server → peer, so inbound copies are
/// discarded. Peer input is forwarded to the inbound event queue.
///
/// # Errors
///
/// Only if the table itself is inconsistent (duplicate opcode or channel).
pub fn standard_registry() -> ProtocolResult<ProtocolRegistry> {
    let mut builder = ProtocolRegistry::builder();
    builder
        .register(opcodes::KEEP_ALIVE, KeepAliveCodec, KeepAliveHandler)?
        .register(opcodes::ENTITY_ACTION, EntityActionCodec, ForwardHandler)?
        .register(opcodes::ENTITY_SPAWN, EntitySpawnCodec, DiscardHandler)?
        .register(opcodes::ENTITY_DESTROY, EntityDestroyCodec, DiscardHandler)?
        .register(opcodes::ENTITY_RELATIVE_MOVE, EntityRelativeMoveCodec, DiscardHandler)?
        .register(opcodes::ENTITY_LOOK, EntityLookCodec, DiscardHandler)?
        .register(opcodes::ENTITY_LOOK_RELATIVE_MOVE, EntityLookRelativeMoveCodec, DiscardHandler)?
        .register(opcodes::ENTITY_TELEPORT, EntityTeleportCodec, DiscardHandler)?
        .register(opcodes::ENTITY_HEAD_YAW, EntityHeadYawCodec, DiscardHandler)?
        .register(opcodes::ENTITY_METADATA, EntityMetadataCodec, DiscardHandler)?
        .register(opcodes::BLOCK_ACTION, BlockActionCodec, ForwardHandler)?
        .register(opcodes::PLUGIN_MESSAGE, PluginMessageCodec, ForwardHandler)?
        .register(opcodes::KICK, KickCodec, KickHandler)?
        .register_reserved(RegisterChannelsCodec, RegisterChannelsHandler)?
        .register_reserved(UnregisterChannelsCodec, UnregisterChannelsHandler)?
        .register_channel(CommandBlockCodec, ForwardHandler)?
        .register_channel(BeaconCodec, ForwardHandler)?;
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ChannelList, Message, MessageKind};

    #[test]
    fn test_standard_table() {
        let registry = standard_registry().unwrap();

        assert_eq!(registry.opcode_of(MessageKind::KeepAlive), Some(0x00));
        assert_eq!(registry.opcode_of(MessageKind::BlockAction), Some(0x36));
        assert_eq!(registry.opcode_of(MessageKind::Kick), Some(0xFF));
        assert_eq!(registry.opcode_of(MessageKind::BeaconEffect), None);
        assert!(registry.codec(0x01).is_none());

        assert_eq!(
            registry.handshake(),
            Message::RegisterChannels(ChannelList::new(["MC|AdvCdm", "MC|Beacon"]))
        );
    }

    #[test]
    fn test_register_travels_in_envelope() {
        let registry = standard_registry().unwrap();
        let frame = registry
            .encode_frame(&Message::RegisterChannels(ChannelList::new(["A", "B"])))
            .unwrap();

        let mut expected = vec![0xFA, 0, 8];
        for unit in "REGISTER".encode_utf16() {
            expected.extend_from_slice(&unit.to_be_bytes());
        }
        expected.extend_from_slice(&[0, 3, b'A', 0, b'B']);
        assert_eq!(frame, expected);
    }
}
