// ABOUTME: Receive-match-execute-reply run loop over a single session
// ABOUTME: Drives the Idle -> Running -> Closing -> Stopped lifecycle

use crate::{
    commands::{tokenize, Registry},
    connector::Connector,
    error::{BotError, Result},
    event::Event,
    metrics,
    session::Session,
};

/// Lifecycle of a [`Dispatcher`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Idle,
    Running,
    Closing,
    Stopped,
}

/// Matches inbound events against the command registry and relays replies
pub struct Dispatcher {
    connector: Connector,
    registry: Registry,
    state: DispatcherState,
}

impl Dispatcher {
    /// Build a dispatcher. A `help` command listing every registered command
    /// is appended after the caller's entries.
    pub fn new(connector: Connector, registry: Registry) -> Result<Self> {
        Ok(Self {
            connector,
            registry: registry.with_help()?,
            state: DispatcherState::Idle,
        })
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Initialize and start the connector. Idle -> Running.
    pub async fn start(&mut self, debug: bool, token: &str) -> Result<()> {
        if self.state != DispatcherState::Idle {
            return Err(BotError::Lifecycle(format!(
                "cannot start dispatcher in state {:?}",
                self.state
            )));
        }

        tracing::info!("Starting dispatcher");
        let started = match self.connector.init(debug, token).await {
            Ok(()) => self.connector.start().await,
            Err(e) => Err(e),
        };

        match started {
            Ok(()) => {
                self.state = DispatcherState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = DispatcherState::Stopped;
                Err(e)
            }
        }
    }

    /// Open a session and process events until it closes.
    ///
    /// A closed connection ends the loop with `Ok`; any other receive error is
    /// returned after the session and connector have been shut down.
    pub async fn run(&mut self) -> Result<()> {
        if self.state != DispatcherState::Running {
            return Err(BotError::Lifecycle(format!(
                "cannot run dispatcher in state {:?}",
                self.state
            )));
        }

        tracing::info!("Connecting");
        let session = match self.connector.stream().await {
            Ok(session) => session,
            Err(e) => {
                self.shutdown(None).await;
                return Err(e);
            }
        };

        let outcome = loop {
            match session.recv().await {
                Ok(event) => self.handle(&session, event).await,
                Err(e) => break e,
            }
        };

        self.shutdown(Some(&session)).await;

        if outcome.is_closed() {
            tracing::info!("Connection closed");
            Ok(())
        } else {
            tracing::error!(error = %outcome, "Receive loop failed");
            Err(outcome)
        }
    }

    /// Stop the connector. Safe to call in any state.
    pub async fn stop(&mut self) -> Result<()> {
        tracing::info!("Stopping dispatcher");
        self.connector.stop().await?;
        self.state = DispatcherState::Stopped;
        Ok(())
    }

    /// Dispatch one event and deliver the reply, if any. Delivery failures
    /// are logged; they never end the loop.
    async fn handle(&self, session: &Session, event: Event) {
        let Some(reply) = self.dispatch(&event).await else {
            return;
        };

        if let Err(e) = session.send(&reply).await {
            metrics::record_send_failure();
            tracing::warn!(error = %e, to = %reply.to, "Failed to send reply");
        }
    }

    /// Run the first command whose pattern matches the event text.
    ///
    /// Returns the reply event, or `None` when the event is not dispatchable
    /// or nothing matches. Command failures become an error reply.
    pub async fn dispatch(&self, event: &Event) -> Option<Event> {
        if !event.is_dispatchable() {
            return None;
        }

        let text = event.body();
        let args = tokenize(&text);
        if args.is_empty() {
            return None;
        }

        let entry = self.registry.find(&text)?;
        let command = entry.command();
        metrics::record_command(command.name());
        tracing::debug!(command = command.name(), from = %event.from, "Executing command");

        let output = match command.exec(&args).await {
            Ok(output) => output,
            Err(e) => {
                metrics::record_command_error(command.name());
                tracing::warn!(command = command.name(), error = %e, "Command failed");
                BotError::Dispatch(format!("{:#}", e)).to_string().into_bytes()
            }
        };

        Some(event.reply_with(output))
    }

    /// Closing -> Stopped: close the session (if any), then stop the connector
    async fn shutdown(&mut self, session: Option<&Session>) {
        self.state = DispatcherState::Closing;

        if let Some(session) = session {
            session.close();
        }
        if let Err(e) = self.connector.stop().await {
            tracing::warn!(error = %e, "Failed to stop connector");
        }

        self.state = DispatcherState::Stopped;
    }
}
