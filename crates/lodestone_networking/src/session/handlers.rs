//! Built-in inbound handlers.

use crate::error::{ProtocolError, ProtocolResult};
use crate::protocol::{Message, MessageHandler};
use crate::session::{DisconnectReason, HandlerContext};

fn wrong_message(handler: &'static str, message: &Message) -> ProtocolError {
    ProtocolError::UnexpectedMessage {
        codec: handler,
        found: message.kind(),
    }
}

/// Feeds echoed ping hashes to the session's liveness monitor.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepAliveHandler;

impl MessageHandler for KeepAliveHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, message: Message) -> ProtocolResult<()> {
        let Message::KeepAlive(ping) = message else {
            return Err(wrong_message("KeepAliveHandler", &message));
        };
        ctx.session.acknowledge_ping(ping.hash);
        Ok(())
    }
}

/// Adds channels the peer announced.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegisterChannelsHandler;

impl MessageHandler for RegisterChannelsHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, message: Message) -> ProtocolResult<()> {
        let Message::RegisterChannels(list) = message else {
            return Err(wrong_message("RegisterChannelsHandler", &message));
        };
        for name in &list.channels {
            if let Err(e) = ctx.session.register_channel(name) {
                tracing::warn!("Session {} rejected channel: {}", ctx.session.id(), e);
            }
        }
        Ok(())
    }
}

/// Removes channels the peer withdrew.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnregisterChannelsHandler;

impl MessageHandler for UnregisterChannelsHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, message: Message) -> ProtocolResult<()> {
        let Message::UnregisterChannels(list) = message else {
            return Err(wrong_message("UnregisterChannelsHandler", &message));
        };
        for name in &list.channels {
            ctx.session.unregister_channel(name);
        }
        Ok(())
    }
}

/// Hands the message to the rest of the server unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct ForwardHandler;

impl MessageHandler for ForwardHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, message: Message) -> ProtocolResult<()> {
        ctx.forward(message);
        Ok(())
    }
}

/// Drops messages that only ever travel towards the peer.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscardHandler;

impl MessageHandler for DiscardHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, message: Message) -> ProtocolResult<()> {
        tracing::trace!(
            "Session {} sent {:?}; discarded",
            ctx.session.id(),
            message.kind()
        );
        Ok(())
    }
}

/// Closes the session when the peer kicks.
#[derive(Clone, Copy, Debug, Default)]
pub struct KickHandler;

impl MessageHandler for KickHandler {
    fn handle(&self, ctx: &mut HandlerContext<'_>, message: Message) -> ProtocolResult<()> {
        let Message::Kick(kick) = message else {
            return Err(wrong_message("KickHandler", &message));
        };
        ctx.session.close(DisconnectReason::Remote(kick.reason));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LivenessConfig;
    use crate::protocol::{ChannelList, EntityAction, Kick};
    use crate::session::{InboundEvent, Session, SessionId};
    use crossbeam_channel::unbounded;

    #[test]
    fn test_register_skips_reserved() {
        let (mut session, _rx) = Session::new(SessionId(3), &LivenessConfig::default());
        let (events, _events_rx) = unbounded();
        let mut ctx = HandlerContext {
            session: &mut session,
            events: &events,
        };

        RegisterChannelsHandler
            .handle(
                &mut ctx,
                Message::RegisterChannels(ChannelList::new(["MC|Beacon", "register", "Custom"])),
            )
            .unwrap();
        UnregisterChannelsHandler
            .handle(
                &mut ctx,
                Message::UnregisterChannels(ChannelList::new(["custom"])),
            )
            .unwrap();

        assert_eq!(session.channels().collect::<Vec<_>>(), vec!["MC|Beacon"]);
    }

    #[test]
    fn test_forward_and_kick() {
        let (mut session, _rx) = Session::new(SessionId(4), &LivenessConfig::default());
        let (events, events_rx) = unbounded();
        let mut ctx = HandlerContext {
            session: &mut session,
            events: &events,
        };

        let crouch = Message::EntityAction(EntityAction::new(12, EntityAction::ACTION_CROUCH));
        ForwardHandler.handle(&mut ctx, crouch.clone()).unwrap();
        KickHandler
            .handle(&mut ctx, Message::Kick(Kick { reason: "Quit".into() }))
            .unwrap();

        assert_eq!(
            events_rx.try_recv(),
            Ok(InboundEvent {
                session: SessionId(4),
                message: crouch,
            })
        );
        assert!(!session.is_open());
    }

    #[test]
    fn test_wrong_message_is_rejected() {
        let (mut session, _rx) = Session::new(SessionId(5), &LivenessConfig::default());
        let (events, _events_rx) = unbounded();
        let mut ctx = HandlerContext {
            session: &mut session,
            events: &events,
        };

        let ping = Message::KeepAlive(crate::protocol::KeepAlive { hash: 1 });
        let result = KickHandler.handle(&mut ctx, ping);
        assert!(matches!(result, Err(ProtocolError::UnexpectedMessage { .. })));
    }
}
