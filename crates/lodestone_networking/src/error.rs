//! # Networking Error Types
//!
//! All errors that can occur in the synchronization layer.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::MessageKind;

/// Errors raised while framing, encoding or decoding wire messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The leading byte of a frame is not bound to any codec.
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),

    /// A fixed-size field ran past the end of the input.
    #[error("truncated payload: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        /// Bytes the field required.
        needed: usize,
        /// Bytes that were left.
        remaining: usize,
    },

    /// The payload decoded to something no codec can represent.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// Two codecs were registered for the same opcode.
    #[error("opcode 0x{0:02X} is already bound")]
    DuplicateOpcode(u8),

    /// A message kind is already bound to an opcode or a channel.
    #[error("{0:?} messages already have a codec")]
    DuplicateKind(MessageKind),

    /// Two dynamic codecs share a channel name.
    #[error("channel {0:?} is already registered")]
    DuplicateChannel(String),

    /// A reserved channel name was used for registration.
    #[error("channel name {0:?} is reserved")]
    ReservedChannel(String),

    /// An envelope named a channel nobody registered.
    #[error("unknown channel {0:?}")]
    UnknownChannel(String),

    /// A codec was handed a message of another kind.
    #[error("codec {codec} cannot encode a {found:?} message")]
    UnexpectedMessage {
        /// Name of the codec.
        codec: &'static str,
        /// Kind of the message it received.
        found: MessageKind,
    },

    /// No opcode or channel is bound for this message kind.
    #[error("no codec registered for {0:?} messages")]
    UnregisteredMessage(MessageKind),

    /// A string exceeds the wire length prefix.
    #[error("string of {0} UTF-16 units exceeds the 32767 limit")]
    StringTooLong(usize),
}

impl ProtocolError {
    /// True if the byte stream position can no longer be trusted.
    ///
    /// Payload length is codec-specific, so once a frame cannot be decoded
    /// the only safe reaction is to close the whole connection.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownOpcode(_) | Self::Truncated { .. } | Self::Malformed(_)
        )
    }
}

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised by the entity synchronizer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncError {
    /// The entity has no synchronizer (never tracked, or already destroyed).
    #[error("entity {0} is not tracked")]
    UnknownEntity(i32),

    /// The entity is already tracked.
    #[error("entity {0} is already tracked")]
    AlreadyTracked(i32),

    /// An update arrived before the spawn was emitted.
    #[error("entity {0} has not been spawned")]
    NotSpawned(i32),

    /// A second spawn was requested.
    #[error("entity {0} was already spawned")]
    AlreadySpawned(i32),
}

/// Result type for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors raised at the session level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The session was closed; nothing more may be sent or received.
    #[error("session {0} is closed")]
    Closed(u32),

    /// No open session has this id.
    #[error("unknown session {0}")]
    UnknownSession(u32),

    /// Decoding inbound bytes failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Failure of one scheduled task invocation.
///
/// Logged by the scheduler; the task stays scheduled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The supplied time is earlier than the previous invocation.
    #[error("clock went backwards by {0:?}")]
    ClockWentBackwards(Duration),

    /// A session operation failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

/// Result type for scheduled task invocations.
pub type TaskResult = Result<(), TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ProtocolError::UnknownOpcode(0xEE).is_fatal());
        assert!(ProtocolError::Truncated { needed: 4, remaining: 1 }.is_fatal());
        assert!(ProtocolError::Malformed("bad".into()).is_fatal());

        assert!(!ProtocolError::ReservedChannel("REGISTER".into()).is_fatal());
        assert!(!ProtocolError::UnknownChannel("MC|Brand".into()).is_fatal());
        assert!(!ProtocolError::DuplicateOpcode(0x36).is_fatal());
    }

    #[test]
    fn test_messages() {
        assert_eq!(ProtocolError::UnknownOpcode(0x0A).to_string(), "unknown opcode 0x0A");
        assert_eq!(
            SessionError::from(ProtocolError::UnknownOpcode(1)).to_string(),
            "unknown opcode 0x01"
        );
        assert_eq!(SyncError::UnknownEntity(7).to_string(), "entity 7 is not tracked");
    }
}
