// ABOUTME: Session lifecycle manager and event dispatcher for a chat bot
// ABOUTME: Platform-agnostic; the chat client is plugged in through the Transport trait

pub mod commands;
pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod metrics;
pub mod paths;
pub mod session;
pub mod signal;
pub mod traits;

pub use commands::{factory, Command, CommandFactory, FnCommand, Registry, RegistryEntry};
pub use connector::Connector;
pub use dispatcher::{Dispatcher, DispatcherState};
pub use error::{BotError, Result};
pub use event::{Event, EventType, ReplyContext};
pub use session::Session;
pub use signal::ExitSignal;
pub use traits::{
    EventStream, Identity, Participant, RawMessage, Transport, TransportEvent, TransportFactory,
};
