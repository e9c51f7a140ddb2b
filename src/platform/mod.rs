// ABOUTME: Chat platform transports for the session layer
// ABOUTME: Slack over Socket Mode is the only platform

pub mod slack;

pub use slack::{SlackTransport, SlackTransportFactory};
