// ABOUTME: Shared mock transport for slackbot-core integration tests
// ABOUTME: Records outbound writes and counts auth, refresh and disconnect calls

#![allow(dead_code)]

use async_trait::async_trait;
use slackbot_core::{
    BotError, EventStream, Identity, Participant, RawMessage, Result, Transport, TransportEvent,
    TransportFactory,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

pub const BOT_ID: &str = "UBOT";
pub const BOT_NAME: &str = "slackbot";

/// Transport double driven by the test through an mpsc sender
pub struct MockTransport {
    identity: Identity,
    auth_calls: AtomicUsize,
    fail_auth: AtomicBool,
    participant_calls: AtomicUsize,
    participants: Mutex<Vec<Participant>>,
    fail_participants: AtomicBool,
    disconnects: AtomicUsize,
    fail_post: AtomicBool,
    sent: Mutex<Vec<(String, String)>>,
    inbound_tx: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    inbound_rx: Mutex<Option<mpsc::Receiver<TransportEvent>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::channel(64);
        Arc::new(Self {
            identity: Identity {
                user_id: BOT_ID.to_string(),
                user: BOT_NAME.to_string(),
                team: "test-team".to_string(),
            },
            auth_calls: AtomicUsize::new(0),
            fail_auth: AtomicBool::new(false),
            participant_calls: AtomicUsize::new(0),
            participants: Mutex::new(Vec::new()),
            fail_participants: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
            fail_post: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(Some(rx)),
        })
    }

    pub fn with_participants(self: Arc<Self>, participants: Vec<Participant>) -> Arc<Self> {
        *self.participants.lock().unwrap() = participants;
        self
    }

    pub fn set_participants(&self, participants: Vec<Participant>) {
        *self.participants.lock().unwrap() = participants;
    }

    pub fn fail_auth(&self, fail: bool) {
        self.fail_auth.store(fail, Ordering::SeqCst);
    }

    pub fn fail_participants(&self, fail: bool) {
        self.fail_participants.store(fail, Ordering::SeqCst);
    }

    pub fn fail_post(&self, fail: bool) {
        self.fail_post.store(fail, Ordering::SeqCst);
    }

    pub fn auth_calls(&self) -> usize {
        self.auth_calls.load(Ordering::SeqCst)
    }

    pub fn participant_calls(&self) -> usize {
        self.participant_calls.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub async fn push(&self, event: TransportEvent) {
        let tx = self.inbound_tx.lock().unwrap().clone();
        tx.expect("stream already ended").send(event).await.unwrap();
    }

    pub async fn push_message(&self, channel: &str, user: &str, text: &str) {
        self.push(TransportEvent::Message(RawMessage::new(channel, user, text)))
            .await;
    }

    /// Drop the inbound sender so the event stream ends
    pub fn end_stream(&self) {
        self.inbound_tx.lock().unwrap().take();
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn authenticate(&self) -> Result<Identity> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_auth.load(Ordering::SeqCst) {
            return Err(BotError::Auth("invalid_auth".to_string()));
        }
        Ok(self.identity.clone())
    }

    async fn connect(&self) -> Result<EventStream> {
        let rx = self
            .inbound_rx
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BotError::Transport("already connected".to_string()))?;
        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn participants(&self) -> Result<Vec<Participant>> {
        self.participant_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_participants.load(Ordering::SeqCst) {
            return Err(BotError::Transport("users.list failed".to_string()));
        }
        Ok(self.participants.lock().unwrap().clone())
    }

    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        if self.fail_post.load(Ordering::SeqCst) {
            return Err(BotError::Transport("chat.postMessage failed".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), text.to_string()));
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory handing out the same mock on every call
pub struct MockFactory {
    pub transport: Arc<MockTransport>,
}

impl MockFactory {
    pub fn new(transport: Arc<MockTransport>) -> Arc<Self> {
        Arc::new(Self { transport })
    }
}

impl TransportFactory for MockFactory {
    fn create(&self, _token: &str, _debug: bool) -> Result<Arc<dyn Transport>> {
        Ok(self.transport.clone())
    }
}

/// Poll `cond` until it holds or two seconds pass
pub async fn wait_for<F: Fn() -> bool>(cond: F) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
