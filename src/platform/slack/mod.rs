// ABOUTME: Slack transport for the session layer using slack-morphism Socket Mode
// ABOUTME: Handles auth.test, users.list paging, chat.postMessage and listener teardown

mod events;

use async_trait::async_trait;
use slack_morphism::errors::SlackClientError;
use slack_morphism::prelude::*;
use slackbot_core::{
    BotError, EventStream, Identity, Participant, Result, Transport, TransportFactory,
};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

use self::events::{handle_push_event, socket_mode_error_handler, SlackBridgeState};

/// Maximum message length for a single Slack text block
const MAX_MESSAGE_LENGTH: usize = 4000;

/// Page size for users.list
const USERS_PAGE_SIZE: u16 = 200;

const EVENT_BUFFER: usize = 256;

/// Slack API error codes that mean the credentials are unusable
const AUTH_ERROR_CODES: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

type SlackSocketModeListener = SlackClientSocketModeListener<SlackClientHyperHttpsConnector>;

// =============================================================================
// SlackTransport
// =============================================================================

/// Slack transport using slack-morphism with Socket Mode
pub struct SlackTransport {
    /// Shared Slack client for API calls
    client: Arc<SlackHyperClient>,
    /// Bot OAuth token (xoxb-...) for Web API calls
    bot_token: SlackApiToken,
    /// App-level token (xapp-...) for Socket Mode connections
    app_token: SlackApiToken,
    debug: bool,
    /// Live Socket Mode listener, present between connect and disconnect
    listener: Mutex<Option<SlackSocketModeListener>>,
}

impl SlackTransport {
    pub fn new(bot_token: &str, app_token: &str, debug: bool) -> Result<Self> {
        let connector = SlackClientHyperConnector::new().map_err(|e| {
            BotError::Transport(format!("failed to create Slack HTTP connector: {}", e))
        })?;

        Ok(Self {
            client: Arc::new(SlackClient::new(connector)),
            bot_token: SlackApiToken::new(SlackApiTokenValue(bot_token.to_string())),
            app_token: SlackApiToken::new(SlackApiTokenValue(app_token.to_string())),
            debug,
            listener: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Transport for SlackTransport {
    async fn authenticate(&self) -> Result<Identity> {
        let session = self.client.open_session(&self.bot_token);
        let response = session.auth_test().await.map_err(classify_error)?;

        Ok(Identity {
            user_id: response.user_id.to_string(),
            user: response.user.clone().unwrap_or_default(),
            team: response.team.to_string(),
        })
    }

    async fn connect(&self) -> Result<EventStream> {
        let mut slot = self.listener.lock().await;
        if slot.is_some() {
            return Err(BotError::Transport(
                "Socket Mode listener already running".to_string(),
            ));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let bridge_state = SlackBridgeState {
            tx,
            debug: self.debug,
        };

        // Callbacks are fn pointers, not closures
        let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_event);

        let environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(&self.client))
                .with_error_handler(socket_mode_error_handler)
                .with_user_state(bridge_state),
        );

        let listener = SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            environment,
            callbacks,
        );

        listener
            .listen_for(&self.app_token)
            .await
            .map_err(classify_error)?;
        listener.start().await;
        tracing::info!(platform = "slack", "Socket Mode connected");

        *slot = Some(listener);
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn participants(&self) -> Result<Vec<Participant>> {
        let session = self.client.open_session(&self.bot_token);
        let mut participants = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;

        loop {
            let mut request = SlackApiUsersListRequest::new().with_limit(USERS_PAGE_SIZE);
            if let Some(next) = cursor.take() {
                request = request.with_cursor(next);
            }

            let response = session.users_list(&request).await.map_err(classify_error)?;
            participants.extend(response.members.into_iter().filter_map(|user| {
                user.name
                    .map(|name| Participant::new(user.id.to_string(), name))
            }));

            cursor = response
                .response_metadata
                .and_then(|meta| meta.next_cursor)
                .filter(|next| !next.0.is_empty());
            if cursor.is_none() {
                break;
            }
        }

        if self.debug {
            tracing::debug!(platform = "slack", count = participants.len(), "Fetched users");
        }
        Ok(participants)
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        let session = self.client.open_session(&self.bot_token);

        for chunk in chunk_text(text, MAX_MESSAGE_LENGTH) {
            let request = SlackApiChatPostMessageRequest::new(
                channel.into(),
                SlackMessageContent::new().with_text(chunk.to_string()),
            );
            session
                .chat_post_message(&request)
                .await
                .map_err(classify_error)?;
        }
        Ok(())
    }

    async fn disconnect(&self) {
        let listener = self.listener.lock().await.take();
        if let Some(listener) = listener {
            tracing::info!(platform = "slack", "Shutting down Socket Mode listener");
            listener.shutdown().await;
        }
    }
}

impl std::fmt::Debug for SlackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackTransport")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Factory
// =============================================================================

/// Builds [`SlackTransport`]s for the connector. The bot token arrives per
/// call; the app-level token is fixed at construction.
#[derive(Clone, Default)]
pub struct SlackTransportFactory {
    app_token: Option<String>,
}

impl SlackTransportFactory {
    pub fn new(app_token: Option<String>) -> Self {
        Self { app_token }
    }
}

impl TransportFactory for SlackTransportFactory {
    fn create(&self, token: &str, debug: bool) -> Result<Arc<dyn Transport>> {
        let app_token = self
            .app_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                BotError::Config(
                    "missing slack app token (set slack.app_token or SLACK_APP_TOKEN)".to_string(),
                )
            })?;

        Ok(Arc::new(SlackTransport::new(token, app_token, debug)?))
    }
}

impl std::fmt::Debug for SlackTransportFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackTransportFactory")
            .field("app_token", &self.app_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// =============================================================================
// Utility functions
// =============================================================================

/// Auth failures become `BotError::Auth`; everything else is a transport error
fn classify_error(err: SlackClientError) -> BotError {
    match &err {
        SlackClientError::ApiError(api) if AUTH_ERROR_CODES.contains(&api.code.as_str()) => {
            BotError::Auth(api.code.clone())
        }
        _ => BotError::Transport(err.to_string()),
    }
}

/// Split text into chunks at line boundaries, falling back to the last char
/// boundary that fits
fn chunk_text(text: &str, max_len: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > max_len {
        let mut limit = max_len;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }

        let split_at = remaining[..limit]
            .rfind('\n')
            .map(|pos| pos + 1)
            .unwrap_or(limit);

        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }

    chunks.push(remaining);
    chunks
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slack_transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SlackTransport>();
    }

    #[test]
    fn test_factory_requires_app_token() {
        let err = SlackTransportFactory::new(None)
            .create("xoxb-test", false)
            .unwrap_err();
        assert!(matches!(err, BotError::Config(_)));

        let err = SlackTransportFactory::new(Some("  ".to_string()))
            .create("xoxb-test", false)
            .unwrap_err();
        assert!(matches!(err, BotError::Config(_)));
    }

    #[test]
    fn test_factory_debug_redacts_token() {
        let factory = SlackTransportFactory::new(Some("xapp-secret".to_string()));
        let rendered = format!("{:?}", factory);
        assert!(!rendered.contains("xapp-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_chunk_text_short() {
        assert_eq!(chunk_text("hello", MAX_MESSAGE_LENGTH), vec!["hello"]);
    }

    #[test]
    fn test_chunk_text_splits_at_newline() {
        let text = format!("{}\n{}", "a".repeat(3000), "b".repeat(3000));
        let chunks = chunk_text(&text, MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].ends_with('\n'));
        assert_eq!(chunks[1], "b".repeat(3000));
    }

    #[test]
    fn test_chunk_text_no_newlines() {
        let text = "a".repeat(5000);
        let chunks = chunk_text(&text, MAX_MESSAGE_LENGTH);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), MAX_MESSAGE_LENGTH);
        assert_eq!(chunks[1].len(), 1000);
    }

    #[test]
    fn test_chunk_text_respects_char_boundaries() {
        // 'š' is two bytes; an odd limit lands mid-char
        let text = "š".repeat(10);
        let chunks = chunk_text(&text, 5);
        assert!(chunks.iter().all(|c| c.len() <= 5));
        assert_eq!(chunks.concat(), text);
    }
}
