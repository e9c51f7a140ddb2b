// ABOUTME: Normalized message envelope exchanged between dispatcher and session
// ABOUTME: Decoupled from the transport's native event shape via ReplyContext

use std::borrow::Cow;

/// Kind of an internal event. Only text is produced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventType {
    #[default]
    Text,
}

/// Reply addressing captured from the inbound platform event.
///
/// Used as a fallback by `Session::send` when `Event::to` cannot be parsed
/// as `<channel>:<participant>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyContext {
    channel: String,
    sender_id: String,
}

impl ReplyContext {
    pub fn new(channel: impl Into<String>, sender_id: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            sender_id: sender_id.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }
}

/// Internal message envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    /// Sender address, `<channel>:<participant>` for inbound events
    pub from: String,
    /// Destination address; for inbound events, how the bot was addressed
    pub to: String,
    pub data: Vec<u8>,
    pub reply: Option<ReplyContext>,
}

impl Event {
    /// Build a text event
    pub fn text(from: impl Into<String>, to: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            event_type: EventType::Text,
            from: from.into(),
            to: to.into(),
            data: data.into(),
            reply: None,
        }
    }

    pub fn with_reply(mut self, reply: ReplyContext) -> Self {
        self.reply = Some(reply);
        self
    }

    /// Payload as text, replacing invalid UTF-8
    pub fn body(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Whether the dispatcher should look at this event at all
    pub fn is_dispatchable(&self) -> bool {
        self.event_type == EventType::Text && !self.data.is_empty()
    }

    /// Build the reply to this event: addresses swapped, reply context kept
    pub fn reply_with(&self, data: impl Into<Vec<u8>>) -> Event {
        Event {
            event_type: EventType::Text,
            from: self.to.clone(),
            to: self.from.clone(),
            data: data.into(),
            reply: self.reply.clone(),
        }
    }
}
