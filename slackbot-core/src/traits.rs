// ABOUTME: Transport capability consumed by the connector and session
// ABOUTME: Defines the platform-facing types so the core never sees a client library

use crate::error::Result;
use async_trait::async_trait;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;

// =============================================================================
// Identity and directory types
// =============================================================================

/// Authenticated self-descriptor returned by the platform's auth check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Bot's user ID (e.g., U12345678)
    pub user_id: String,
    /// Bot's display name, used for by-name addressing
    pub user: String,
    /// Workspace/team name, informational only
    pub team: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user: user.into(),
            team: String::new(),
        }
    }

    /// Mention token for this identity, e.g. `<@U12345678>`
    pub fn mention(&self) -> String {
        format!("<@{}>", self.user_id)
    }
}

/// One entry of the platform's participant directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

// =============================================================================
// Transport events
// =============================================================================

/// A message as delivered by the platform, before any filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub channel: String,
    pub user: String,
    pub text: String,
    /// Platform subtype (edits, joins, bot posts); `None` for a plain message
    pub subtype: Option<String>,
}

impl RawMessage {
    pub fn new(
        channel: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
            text: text.into(),
            subtype: None,
        }
    }

    pub fn with_subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }
}

/// Lower-level event pumped from the transport connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Message(RawMessage),
    /// The platform revoked or rejected our credentials
    InvalidAuth,
}

/// Boxed stream of transport events
pub type EventStream = Pin<Box<dyn Stream<Item = TransportEvent> + Send>>;

/// Direct conversations are identified by their channel ID prefix
pub fn is_direct_channel(channel: &str) -> bool {
    channel.starts_with('D')
}

// =============================================================================
// Transport capability
// =============================================================================

/// Chat platform client as seen by the session layer
#[async_trait]
pub trait Transport: Send + Sync {
    /// Auth round-trip; returns who we are
    async fn authenticate(&self) -> Result<Identity>;

    /// Open the managed connection and start pumping events
    async fn connect(&self) -> Result<EventStream>;

    /// Fetch the full participant directory
    async fn participants(&self) -> Result<Vec<Participant>>;

    /// Write one outbound text message to a channel
    async fn post_message(&self, channel: &str, text: &str) -> Result<()>;

    /// Tear down the connection. Must be idempotent.
    async fn disconnect(&self);
}

/// Builds a transport from stored credentials
pub trait TransportFactory: Send + Sync {
    fn create(&self, token: &str, debug: bool) -> Result<Arc<dyn Transport>>;
}
