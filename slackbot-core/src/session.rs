// ABOUTME: One live, authenticated connection to the chat platform
// ABOUTME: Normalizes inbound messages, routes replies and keeps a participant name cache

use crate::{
    error::{BotError, Result},
    event::{Event, EventType, ReplyContext},
    metrics,
    signal::ExitSignal,
    traits::{is_direct_channel, EventStream, Identity, RawMessage, Transport, TransportEvent},
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_stream::StreamExt;

/// Default interval between participant directory refreshes
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

// =============================================================================
// Name cache
// =============================================================================

/// Participant ID -> display name. Replaced wholesale, never patched.
#[derive(Debug, Default)]
pub struct NameCache {
    names: RwLock<HashMap<String, String>>,
}

impl NameCache {
    /// Display name for `id`, or an empty string when unknown
    pub fn get(&self, id: &str) -> String {
        match self.names.read() {
            Ok(names) => names.get(id).cloned().unwrap_or_default(),
            Err(poisoned) => poisoned.into_inner().get(id).cloned().unwrap_or_default(),
        }
    }

    /// Swap in a freshly built mapping
    pub fn replace(&self, fresh: HashMap<String, String>) {
        match self.names.write() {
            Ok(mut names) => *names = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
    }

    pub fn len(&self) -> usize {
        self.names.read().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Refresh the name cache immediately, then on every tick until `exit` fires.
/// Fetch failures keep the previous mapping.
async fn refresh_names(
    transport: Arc<dyn Transport>,
    cache: Arc<NameCache>,
    exit: ExitSignal,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = exit.wait() => return,
            _ = ticker.tick() => {}
        }

        match transport.participants().await {
            Ok(participants) => {
                let fresh: HashMap<String, String> = participants
                    .into_iter()
                    .map(|p| (p.id, p.name))
                    .collect();
                metrics::set_name_cache_size(fresh.len());
                cache.replace(fresh);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Participant refresh failed, keeping previous names");
            }
        }
    }
}

// =============================================================================
// Session
// =============================================================================

/// A live connection: receive normalized events, send replies
pub struct Session {
    identity: Identity,
    transport: Arc<dyn Transport>,
    events: tokio::sync::Mutex<EventStream>,
    exit: ExitSignal,
    names: Arc<NameCache>,
}

impl Session {
    /// Wrap an open transport connection and start the name refresh task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        identity: Identity,
        transport: Arc<dyn Transport>,
        events: EventStream,
        exit: ExitSignal,
        refresh_interval: Duration,
    ) -> Self {
        let names = Arc::new(NameCache::default());

        tokio::spawn(refresh_names(
            Arc::clone(&transport),
            Arc::clone(&names),
            exit.clone(),
            refresh_interval,
        ));

        Self {
            identity,
            transport,
            events: tokio::sync::Mutex::new(events),
            exit,
            names,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Whether this session has been closed (locally or by global shutdown)
    pub fn is_closed(&self) -> bool {
        self.exit.is_signaled()
    }

    /// Cached display name for a participant; empty when unknown
    pub fn name_of(&self, id: &str) -> String {
        self.names.get(id)
    }

    /// Wait for the next message addressed to us.
    ///
    /// Returns `ConnectionClosed` once the exit signal fires or the transport
    /// stream ends, and `Auth` if the platform invalidates our credentials.
    pub async fn recv(&self) -> Result<Event> {
        let mut events = self.events.lock().await;

        loop {
            let next = tokio::select! {
                biased;
                _ = self.exit.wait() => return Err(BotError::ConnectionClosed),
                next = events.next() => next,
            };

            match next {
                None => return Err(BotError::ConnectionClosed),
                Some(TransportEvent::InvalidAuth) => {
                    return Err(BotError::Auth("invalid credentials".to_string()))
                }
                Some(TransportEvent::Message(msg)) => {
                    if let Some(event) = self.accept(msg) {
                        metrics::record_event_received();
                        return Ok(event);
                    }
                }
            }
        }
    }

    /// Filter and normalize one raw message. Only plain messages in direct
    /// conversations, or that start by addressing us, are accepted.
    fn accept(&self, msg: RawMessage) -> Option<Event> {
        if msg.subtype.is_some() || msg.user == self.identity.user_id {
            return None;
        }

        let addressed_as = if !self.identity.user.is_empty()
            && msg.text.starts_with(&self.identity.user)
        {
            Some(self.identity.user.clone())
        } else if msg.text.starts_with(&self.identity.mention()) {
            Some(self.identity.user_id.clone())
        } else {
            None
        };

        if addressed_as.is_none() && !is_direct_channel(&msg.channel) {
            return None;
        }

        let text = match addressed_as {
            Some(_) => strip_leading_word(&msg.text).to_string(),
            None => msg.text,
        };

        Some(Event {
            event_type: EventType::Text,
            from: format!("{}:{}", msg.channel, msg.user),
            to: addressed_as.unwrap_or_default(),
            data: text.into_bytes(),
            reply: Some(ReplyContext::new(msg.channel, msg.user)),
        })
    }

    /// Deliver an event to its channel.
    ///
    /// The destination comes from `event.to` when it has the form
    /// `<channel>:<participant>`, otherwise from the reply context.
    /// An empty `to` is rejected before any routing.
    pub async fn send(&self, event: &Event) -> Result<()> {
        if event.to.is_empty() {
            return Err(BotError::Argument("event has no recipient".to_string()));
        }

        let (channel, name) = match event.to.split(':').collect::<Vec<_>>().as_slice() {
            [channel, participant] => (channel.to_string(), self.name_of(participant)),
            _ => match &event.reply {
                Some(reply) => (reply.channel().to_string(), self.name_of(reply.sender_id())),
                None => (String::new(), String::new()),
            },
        };

        if channel.is_empty() {
            return Err(BotError::Routing("no channel to send to".to_string()));
        }

        let message = outbound_text(&channel, &name, &event.body());
        self.transport.post_message(&channel, &message).await
    }

    /// Close the session. Idempotent; safe to race with the watchdog.
    pub fn close(&self) {
        self.exit.signal();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("closed", &self.exit.is_signaled())
            .field("names", &self.names.len())
            .finish()
    }
}

/// Drop the first space-delimited word (the self-mention)
fn strip_leading_word(text: &str) -> &str {
    text.split_once(' ')
        .map(|(_, rest)| rest.trim_start())
        .unwrap_or("")
}

/// Outbound text: verbatim in direct conversations or when the recipient's
/// name is unknown, otherwise prefixed with `@name: `
pub fn outbound_text(channel: &str, name: &str, body: &str) -> String {
    if name.is_empty() || is_direct_channel(channel) {
        body.to_string()
    } else {
        format!("@{}: {}", name, body)
    }
}
