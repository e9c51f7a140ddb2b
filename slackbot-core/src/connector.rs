// ABOUTME: Session factory owning credentials and the running/stopped lifecycle
// ABOUTME: Bridges global shutdown into per-session teardown via a watchdog task

use crate::{
    error::{BotError, Result},
    session::{Session, DEFAULT_REFRESH_INTERVAL},
    signal::ExitSignal,
    traits::{Transport, TransportFactory},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Default)]
struct ConnectorState {
    token: String,
    debug: bool,
    running: bool,
    exit: ExitSignal,
    transport: Option<Arc<dyn Transport>>,
}

struct ConnectorInner {
    factory: Arc<dyn TransportFactory>,
    refresh_interval: Duration,
    state: Mutex<ConnectorState>,
}

/// Owns platform credentials and produces sessions on demand.
///
/// Cheap to clone; clones share state, so a shutdown handler can hold one
/// and call [`Connector::stop`] while the run loop owns another.
#[derive(Clone)]
pub struct Connector {
    inner: Arc<ConnectorInner>,
}

impl Connector {
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self::with_refresh_interval(factory, DEFAULT_REFRESH_INTERVAL)
    }

    /// Like [`Connector::new`] with a custom name cache refresh interval
    pub fn with_refresh_interval(
        factory: Arc<dyn TransportFactory>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ConnectorInner {
                factory,
                refresh_interval,
                state: Mutex::new(ConnectorState::default()),
            }),
        }
    }

    /// Store credentials. No network effect.
    pub async fn init(&self, debug: bool, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            return Err(BotError::Config("missing slack token".to_string()));
        }

        let mut state = self.inner.state.lock().await;
        state.token = token.to_string();
        state.debug = debug;
        Ok(())
    }

    /// Authenticate and mark the connector running. No-op if already running.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        if state.token.is_empty() {
            return Err(BotError::Config("missing slack token".to_string()));
        }
        if state.running {
            return Ok(());
        }

        let transport = self.inner.factory.create(&state.token, state.debug)?;
        let identity = transport.authenticate().await.map_err(into_auth_error)?;

        tracing::info!(
            user = %identity.user,
            user_id = %identity.user_id,
            team = %identity.team,
            "Authenticated with chat platform"
        );

        state.transport = Some(transport);
        state.exit = ExitSignal::new();
        state.running = true;
        Ok(())
    }

    /// Open a new session. Requires a prior successful [`Connector::start`].
    pub async fn stream(&self) -> Result<Session> {
        let (transport, global_exit) = {
            let state = self.inner.state.lock().await;
            match (&state.transport, state.running) {
                (Some(transport), true) => (Arc::clone(transport), state.exit.clone()),
                _ => return Err(BotError::Lifecycle("not running".to_string())),
            }
        };

        let identity = transport.authenticate().await.map_err(into_auth_error)?;
        let events = transport.connect().await?;
        let session_exit = ExitSignal::new();

        tokio::spawn(watchdog(
            global_exit,
            session_exit.clone(),
            Arc::clone(&transport),
        ));

        tracing::info!(user = %identity.user, "Session opened");

        Ok(Session::open(
            identity,
            transport,
            events,
            session_exit,
            self.inner.refresh_interval,
        ))
    }

    /// Signal exit to every session and mark the connector stopped.
    /// No-op if not running.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if !state.running {
            return Ok(());
        }

        state.exit.signal();
        state.running = false;
        state.transport = None;
        tracing::info!("Connector stopped");
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.running
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("refresh_interval", &self.inner.refresh_interval)
            .finish_non_exhaustive()
    }
}

fn into_auth_error(err: BotError) -> BotError {
    match err {
        BotError::Auth(_) => err,
        other => BotError::Auth(other.to_string()),
    }
}

/// Wait for either exit signal, then disconnect and close the session signal
async fn watchdog(global: ExitSignal, session: ExitSignal, transport: Arc<dyn Transport>) {
    tokio::select! {
        _ = global.wait() => tracing::debug!("Global exit signalled, closing session"),
        _ = session.wait() => tracing::debug!("Session closed locally"),
    }

    transport.disconnect().await;
    session.signal();
}
