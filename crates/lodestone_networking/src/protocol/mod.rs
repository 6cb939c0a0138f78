//! # Wire Protocol
//!
//! One-byte opcode framing with codec-specific payloads.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ Opcode (1 byte)                                              │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Payload (big-endian, length implied by the codec)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no length prefix. A frame whose opcode is unknown leaves the
//! rest of the stream unreadable, which is why unknown opcodes close the
//! connection.
//!
//! ## Layers
//!
//! - `buffer`: big-endian primitives
//! - `parameter`: typed entity parameter lists
//! - `messages` / `codecs`: message structs and their payload codecs
//! - `registry`: opcode and channel table, envelope wrapping
//! - `table`: the standard table with built-in handlers

mod buffer;
mod codecs;
mod messages;
mod parameter;
mod registry;
mod table;

pub use buffer::{PacketReader, PacketWriter, MAX_BYTE_ARRAY_LEN, MAX_STRING_UNITS};
pub use codecs::{
    BeaconCodec, BlockActionCodec, Codec, CommandBlockCodec, EntityActionCodec,
    EntityDestroyCodec, EntityHeadYawCodec, EntityLookCodec, EntityLookRelativeMoveCodec,
    EntityMetadataCodec, EntityRelativeMoveCodec, EntitySpawnCodec, EntityTeleportCodec,
    KeepAliveCodec, KickCodec, PluginMessageCodec, RegisterChannelsCodec,
    UnregisterChannelsCodec,
};
pub use messages::{
    BeaconEffect, BlockAction, ChannelList, CommandBlockEdit, EntityAction, EntityDestroy,
    EntityHeadYaw, EntityLook, EntityLookRelativeMove, EntityMetadata, EntityRelativeMove,
    EntitySpawn, EntityTeleport, KeepAlive, Kick, Message, MessageKind, PluginMessage,
};
pub use parameter::{
    read_parameters, write_parameters, ItemSlot, Parameter, ParameterValue,
    MAX_PARAMETER_INDEX, PARAMETER_LIST_END,
};
pub use registry::{
    is_reserved_channel, Frame, MessageHandler, ProtocolRegistry, RegistryBuilder,
    REGISTER_CHANNEL, RESERVED_CHANNELS, UNREGISTER_CHANNEL,
};
pub use table::{opcodes, standard_registry};
