//! # Wire Framing Registry
//!
//! Maps opcodes and channel names to codecs and handlers.
//!
//! ## Frame Layout
//!
//! ```text
//! ┌────────────┬──────────────────────────────────────────┐
//! │ opcode: u8 │ payload (length implied by the codec)     │
//! └────────────┴──────────────────────────────────────────┘
//!
//! envelope (0xFA):
//! ┌────────────┬────────────────┬──────────────┬──────────┐
//! │ 0xFA       │ channel string │ i16 length   │ payload  │
//! └────────────┴────────────────┴──────────────┴──────────┘
//! ```
//!
//! A registry is assembled once with [`RegistryBuilder`] and then only read,
//! so it can be shared through an `Arc` without locking.

use std::collections::HashMap;

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::buffer::{PacketReader, PacketWriter};
use crate::protocol::codecs::Codec;
use crate::protocol::messages::{ChannelList, Message, MessageKind, PluginMessage};
use crate::session::HandlerContext;

/// Channel that announces receivable channel names.
pub const REGISTER_CHANNEL: &str = "REGISTER";

/// Channel that withdraws channel names.
pub const UNREGISTER_CHANNEL: &str = "UNREGISTER";

/// Names no dynamic codec may claim.
pub const RESERVED_CHANNELS: [&str; 2] = [REGISTER_CHANNEL, UNREGISTER_CHANNEL];

/// True if `name` is reserved, ignoring ASCII case.
#[must_use]
pub fn is_reserved_channel(name: &str) -> bool {
    RESERVED_CHANNELS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
}

/// Reacts to one decoded inbound message.
pub trait MessageHandler: Send + Sync {
    /// Handles `message` for the session in `ctx`.
    ///
    /// # Errors
    ///
    /// A fatal [`ProtocolError`] closes the session; anything else is logged.
    fn handle(&self, ctx: &mut HandlerContext<'_>, message: Message) -> ProtocolResult<()>;
}

struct Binding {
    codec: Box<dyn Codec>,
    handler: Box<dyn MessageHandler>,
}

/// Where a message kind is bound.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Route {
    Opcode(u8),
    Channel(usize),
}

/// Collects bindings during startup.
pub struct RegistryBuilder {
    opcodes: Vec<Option<Binding>>,
    channels: Vec<Binding>,
    routes: HashMap<MessageKind, Route>,
}

impl RegistryBuilder {
    /// Creates an empty builder with all 256 opcodes free.
    #[must_use]
    pub fn new() -> Self {
        Self {
            opcodes: std::iter::repeat_with(|| None).take(256).collect(),
            channels: Vec::new(),
            routes: HashMap::new(),
        }
    }

    fn claim_kind(&mut self, kind: MessageKind, route: Route) -> ProtocolResult<()> {
        if self.routes.contains_key(&kind) {
            return Err(ProtocolError::DuplicateKind(kind));
        }
        self.routes.insert(kind, route);
        Ok(())
    }

    /// Binds a codec and its handler to an opcode.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::DuplicateOpcode`] if the opcode is taken,
    /// [`ProtocolError::DuplicateKind`] if the message kind already has a codec.
    pub fn register(
        &mut self,
        opcode: u8,
        codec: impl Codec + 'static,
        handler: impl MessageHandler + 'static,
    ) -> ProtocolResult<&mut Self> {
        let slot = usize::from(opcode);
        if self.opcodes[slot].is_some() {
            return Err(ProtocolError::DuplicateOpcode(opcode));
        }
        self.claim_kind(codec.kind(), Route::Opcode(opcode))?;
        self.opcodes[slot] = Some(Binding {
            codec: Box::new(codec),
            handler: Box::new(handler),
        });
        Ok(self)
    }

    fn bind_channel(
        &mut self,
        codec: Box<dyn Codec>,
        handler: Box<dyn MessageHandler>,
    ) -> ProtocolResult<()> {
        let name = codec.name();
        if self
            .channels
            .iter()
            .any(|bound| bound.codec.name().eq_ignore_ascii_case(name))
        {
            return Err(ProtocolError::DuplicateChannel(name.to_owned()));
        }
        self.claim_kind(codec.kind(), Route::Channel(self.channels.len()))?;
        self.channels.push(Binding { codec, handler });
        Ok(())
    }

    /// Binds a dynamic codec to the channel named by [`Codec::name`].
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ReservedChannel`] for `REGISTER`/`UNREGISTER`,
    /// [`ProtocolError::DuplicateChannel`] if the name is taken (ignoring case).
    pub fn register_channel(
        &mut self,
        codec: impl Codec + 'static,
        handler: impl MessageHandler + 'static,
    ) -> ProtocolResult<&mut Self> {
        if is_reserved_channel(codec.name()) {
            return Err(ProtocolError::ReservedChannel(codec.name().to_owned()));
        }
        self.bind_channel(Box::new(codec), Box::new(handler))?;
        Ok(self)
    }

    /// Binds the codec for one of the reserved channels.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownChannel`] if the codec does not name a
    /// reserved channel.
    pub fn register_reserved(
        &mut self,
        codec: impl Codec + 'static,
        handler: impl MessageHandler + 'static,
    ) -> ProtocolResult<&mut Self> {
        if !is_reserved_channel(codec.name()) {
            return Err(ProtocolError::UnknownChannel(codec.name().to_owned()));
        }
        self.bind_channel(Box::new(codec), Box::new(handler))?;
        Ok(self)
    }

    /// Freezes the table.
    #[must_use]
    pub fn build(self) -> ProtocolRegistry {
        let envelope_opcode = match self.routes.get(&MessageKind::PluginMessage) {
            Some(Route::Opcode(opcode)) => Some(*opcode),
            _ => None,
        };
        ProtocolRegistry {
            opcodes: self.opcodes.into_boxed_slice(),
            channels: self.channels.into_boxed_slice(),
            routes: self.routes,
            envelope_opcode,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A decoded inbound frame, ready to dispatch.
pub struct Frame<'r> {
    /// Opcode the frame arrived on.
    pub opcode: u8,
    /// Decoded message. Envelopes on known channels are already unwrapped.
    pub message: Message,
    handler: &'r dyn MessageHandler,
}

impl Frame<'_> {
    /// Runs the handler bound to this frame.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns.
    pub fn dispatch(self, ctx: &mut HandlerContext<'_>) -> ProtocolResult<()> {
        self.handler.handle(ctx, self.message)
    }
}

/// Immutable opcode and channel table.
pub struct ProtocolRegistry {
    opcodes: Box<[Option<Binding>]>,
    channels: Box<[Binding]>,
    routes: HashMap<MessageKind, Route>,
    envelope_opcode: Option<u8>,
}

impl ProtocolRegistry {
    /// Starts a new table.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    fn binding(&self, opcode: u8) -> Option<&Binding> {
        self.opcodes[usize::from(opcode)].as_ref()
    }

    fn channel(&self, name: &str) -> Option<&Binding> {
        self.channels
            .iter()
            .find(|bound| bound.codec.name().eq_ignore_ascii_case(name))
    }

    /// Codec bound to `opcode`.
    #[must_use]
    pub fn codec(&self, opcode: u8) -> Option<&dyn Codec> {
        self.binding(opcode).map(|b| b.codec.as_ref())
    }

    /// Opcode a message kind is sent on, if it has one of its own.
    #[must_use]
    pub fn opcode_of(&self, kind: MessageKind) -> Option<u8> {
        match self.routes.get(&kind) {
            Some(Route::Opcode(opcode)) => Some(*opcode),
            _ => None,
        }
    }

    /// Dynamic codec for a channel name, ignoring ASCII case.
    #[must_use]
    pub fn channel_codec(&self, name: &str) -> Option<&dyn Codec> {
        self.channel(name).map(|b| b.codec.as_ref())
    }

    /// Names of the non-reserved channels, in registration order.
    pub fn dynamic_channels(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.channels
            .iter()
            .map(|b| b.codec.name())
            .filter(|name| !is_reserved_channel(name))
    }

    /// The channel announcement sent once when a session starts.
    #[must_use]
    pub fn handshake(&self) -> Message {
        Message::RegisterChannels(ChannelList::new(self.dynamic_channels()))
    }

    /// Consumes the opcode byte and returns its codec.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnknownOpcode`] if nothing is bound,
    /// [`ProtocolError::Truncated`] on empty input.
    pub fn read_header<'r>(&'r self, input: &mut PacketReader<'_>) -> ProtocolResult<&'r dyn Codec> {
        let opcode = input.read_u8()?;
        self.codec(opcode)
            .ok_or(ProtocolError::UnknownOpcode(opcode))
    }

    /// Decodes one frame from `input`.
    ///
    /// Envelopes naming a registered channel are unwrapped into the inner
    /// message and routed to that channel's handler. Envelopes for unknown
    /// channels stay wrapped.
    ///
    /// # Errors
    ///
    /// Any decoding error. The reader position is unspecified afterwards.
    pub fn decode_frame<'r>(&'r self, input: &mut PacketReader<'_>) -> ProtocolResult<Frame<'r>> {
        let opcode = input.read_u8()?;
        let binding = self
            .binding(opcode)
            .ok_or(ProtocolError::UnknownOpcode(opcode))?;
        let message = binding.codec.decode(input)?;

        if let Message::PluginMessage(envelope) = &message {
            if let Some(channel) = self.channel(&envelope.channel) {
                let mut inner = PacketReader::new(&envelope.data);
                let message = channel.codec.decode(&mut inner)?;
                return Ok(Frame {
                    opcode,
                    message,
                    handler: channel.handler.as_ref(),
                });
            }
        }

        Ok(Frame {
            opcode,
            message,
            handler: binding.handler.as_ref(),
        })
    }

    /// Wraps a channel-bound message into an envelope.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnregisteredMessage`] if the kind has no channel.
    pub fn wrap(&self, message: &Message) -> ProtocolResult<PluginMessage> {
        let Some(Route::Channel(index)) = self.routes.get(&message.kind()) else {
            return Err(ProtocolError::UnregisteredMessage(message.kind()));
        };
        let codec = self.channels[*index].codec.as_ref();
        let mut payload = PacketWriter::new();
        codec.encode(message, &mut payload)?;
        Ok(PluginMessage {
            channel: codec.name().to_owned(),
            data: payload.into_bytes(),
        })
    }

    /// Appends a complete frame (opcode and payload) for `message`.
    ///
    /// On error `out` is left as it was.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnregisteredMessage`] if neither an opcode nor a
    /// channel is bound, or any codec error.
    pub fn encode(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        let start = out.len();
        let result = self.write_frame(message, out);
        if result.is_err() {
            out.truncate(start);
        }
        result
    }

    fn write_frame(&self, message: &Message, out: &mut PacketWriter) -> ProtocolResult<()> {
        match self.routes.get(&message.kind()) {
            Some(Route::Opcode(opcode)) => {
                let Some(binding) = self.binding(*opcode) else {
                    return Err(ProtocolError::UnregisteredMessage(message.kind()));
                };
                out.write_u8(*opcode);
                binding.codec.encode(message, out)
            }
            Some(Route::Channel(_)) => {
                let Some(opcode) = self.envelope_opcode else {
                    return Err(ProtocolError::UnregisteredMessage(MessageKind::PluginMessage));
                };
                let envelope = Message::PluginMessage(self.wrap(message)?);
                out.write_u8(opcode);
                match self.binding(opcode) {
                    Some(binding) => binding.codec.encode(&envelope, out),
                    None => Err(ProtocolError::UnregisteredMessage(MessageKind::PluginMessage)),
                }
            }
            None => Err(ProtocolError::UnregisteredMessage(message.kind())),
        }
    }

    /// Encodes one frame into a fresh buffer.
    ///
    /// # Errors
    ///
    /// Same as [`ProtocolRegistry::encode`].
    pub fn encode_frame(&self, message: &Message) -> ProtocolResult<Vec<u8>> {
        let mut out = PacketWriter::new();
        self.encode(message, &mut out)?;
        Ok(out.into_bytes())
    }
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let opcodes: Vec<String> = self
            .opcodes
            .iter()
            .enumerate()
            .filter_map(|(op, b)| b.as_ref().map(|b| format!("0x{op:02X}={}", b.codec.name())))
            .collect();
        let channels: Vec<&str> = self.channels.iter().map(|b| b.codec.name()).collect();
        f.debug_struct("ProtocolRegistry")
            .field("opcodes", &opcodes)
            .field("channels", &channels)
            .finish()
    }
}
