// ABOUTME: Error taxonomy shared by the connector, session and dispatcher.
// ABOUTME: Each variant maps to one failure class with its own propagation policy.

use thiserror::Error;

/// Errors raised by the session lifecycle and dispatch layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BotError {
    /// Missing or invalid configuration, detected before any network call
    #[error("configuration error: {0}")]
    Config(String),

    /// Credentials rejected, or invalidated mid-session
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Operation not valid in the current lifecycle state
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// The exit signal fired (or the event stream ended) during a receive
    #[error("connection closed")]
    ConnectionClosed,

    /// No destination channel could be resolved for an outbound event
    #[error("routing error: {0}")]
    Routing(String),

    /// A required argument was missing or empty
    #[error("invalid argument: {0}")]
    Argument(String),

    /// A command failed while executing; rendered verbatim as the reply body
    #[error("error executing cmd: {0}")]
    Dispatch(String),

    /// Transport failure other than authentication
    #[error("transport error: {0}")]
    Transport(String),
}

impl BotError {
    /// Errors that must take the whole process down
    pub fn is_fatal(&self) -> bool {
        matches!(self, BotError::Config(_) | BotError::Auth(_))
    }

    /// Whether this error represents a normal shutdown of the receive loop
    pub fn is_closed(&self) -> bool {
        matches!(self, BotError::ConnectionClosed)
    }
}

pub type Result<T, E = BotError> = std::result::Result<T, E>;
