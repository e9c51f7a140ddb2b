// ABOUTME: Root library for the slackbot binary
// ABOUTME: Slack transport, built-in commands and logging on top of slackbot-core

pub mod commands;
pub mod logging;
pub mod platform;

// Re-export the platform-agnostic core
pub use slackbot_core::config;
pub use slackbot_core::paths;
pub use slackbot_core::{
    BotError, Command, Connector, Dispatcher, DispatcherState, Event, FnCommand, Registry,
    Session,
};

pub use slackbot_core::config::Config;
pub use platform::{SlackTransport, SlackTransportFactory};
