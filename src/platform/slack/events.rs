// ABOUTME: Socket Mode callbacks translating Slack push events into transport events
// ABOUTME: Callbacks are fn pointers and reach the event channel through listener user state

use slack_morphism::prelude::*;
use slackbot_core::{RawMessage, TransportEvent};
use std::sync::Arc;
use tokio::sync::mpsc;

/// State shared with the Socket Mode callbacks via `with_user_state()`.
/// Callbacks cannot capture variables, so they look this up on every event.
#[derive(Clone)]
pub(crate) struct SlackBridgeState {
    pub(crate) tx: mpsc::Sender<TransportEvent>,
    pub(crate) debug: bool,
}

/// Handle push events from Socket Mode
pub(crate) async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let bridge = {
        let guard = states.read().await;
        guard
            .get_user_state::<SlackBridgeState>()
            .cloned()
            .ok_or("SlackBridgeState not found in user state")?
    };

    let Some(translated) = translate_event(&event.event) else {
        return Ok(());
    };

    if bridge.debug {
        tracing::debug!(platform = "slack", event = ?translated, "Transport event");
    }

    if bridge.tx.send(translated).await.is_err() {
        tracing::warn!(platform = "slack", "Event stream receiver dropped");
    }
    Ok(())
}

/// Socket Mode error handler
pub(crate) fn socket_mode_error_handler(
    err: Box<dyn std::error::Error + Send + Sync>,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> HttpStatusCode {
    tracing::error!(platform = "slack", error = %err, "Socket Mode error");
    HttpStatusCode::OK
}

/// Map a Slack event body onto the transport's event vocabulary.
///
/// App mentions are skipped: the plain `message` event for the same post
/// already carries the mention text.
pub(crate) fn translate_event(body: &SlackEventCallbackBody) -> Option<TransportEvent> {
    match body {
        SlackEventCallbackBody::Message(msg) => translate_message(msg).map(TransportEvent::Message),
        SlackEventCallbackBody::TokensRevoked(_) | SlackEventCallbackBody::AppUninstalled(_) => {
            Some(TransportEvent::InvalidAuth)
        }
        _ => None,
    }
}

/// Messages without a channel or a sending user carry nothing we can reply to
pub(crate) fn translate_message(msg: &SlackMessageEvent) -> Option<RawMessage> {
    let channel = msg.origin.channel.as_ref()?.to_string();
    let user = msg.sender.user.as_ref()?.to_string();

    let text = msg
        .content
        .as_ref()
        .and_then(|c| c.text.as_ref())
        .cloned()
        .unwrap_or_default();

    let raw = RawMessage::new(channel, user, text);
    Some(match &msg.subtype {
        Some(subtype) => raw.with_subtype(format!("{:?}", subtype)),
        None => raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: serde_json::Value) -> SlackEventCallbackBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_message_is_translated() {
        let event = body(json!({
            "type": "message",
            "channel": "C123",
            "user": "U456",
            "text": "slackbot hello",
            "ts": "1700000000.000100"
        }));

        let Some(TransportEvent::Message(raw)) = translate_event(&event) else {
            panic!("expected a message");
        };
        assert_eq!(raw.channel, "C123");
        assert_eq!(raw.user, "U456");
        assert_eq!(raw.text, "slackbot hello");
        assert!(raw.subtype.is_none());
    }

    #[test]
    fn test_subtype_is_preserved() {
        let event = body(json!({
            "type": "message",
            "subtype": "channel_join",
            "channel": "C123",
            "user": "U456",
            "text": "<@U456> has joined the channel",
            "ts": "1700000000.000100"
        }));

        let Some(TransportEvent::Message(raw)) = translate_event(&event) else {
            panic!("expected a message");
        };
        assert!(raw.subtype.is_some());
    }

    #[test]
    fn test_message_without_user_is_dropped() {
        let event = body(json!({
            "type": "message",
            "channel": "C123",
            "text": "system notice",
            "ts": "1700000000.000100"
        }));

        assert!(translate_event(&event).is_none());
    }

    #[test]
    fn test_app_uninstalled_invalidates_auth() {
        let event = body(json!({ "type": "app_uninstalled" }));
        assert!(matches!(
            translate_event(&event),
            Some(TransportEvent::InvalidAuth)
        ));
    }

    #[test]
    fn test_bridge_state_clone_shares_sender() {
        let (tx, mut rx) = mpsc::channel(1);
        let state = SlackBridgeState { tx, debug: true };
        let cloned = state.clone();
        cloned
            .tx
            .try_send(TransportEvent::InvalidAuth)
            .unwrap();
        assert!(matches!(rx.try_recv(), Ok(TransportEvent::InvalidAuth)));
        assert!(cloned.debug);
    }
}
