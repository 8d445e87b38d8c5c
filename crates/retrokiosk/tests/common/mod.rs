//! Fakes shared by the integration tests: a scripted socket, an
//! in-memory save backend, a counting emulator and a recording host.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use retrokiosk::{
    Connection, ConnectionId, Connector, Emulator, GameId, HostBridge, LoadResponse, PromptView,
    SaveBackend, SaveError, SessionError, SessionMessage, SessionView, TransportError,
};
use retrokiosk_protocol::SaveBody;

// =========================================================================
// Scripted socket
// =========================================================================

/// One thing the fake server does, in order.
#[derive(Debug, Clone)]
pub enum Step {
    Wait(Duration),
    Send(String),
    Close,
    Fail,
}

pub fn health_response() -> Step {
    Step::Send(r#"{"msgver":"1","type":"health_status_check_response","status":200}"#.into())
}

/// What happens on the n-th dial. Dials past the end of the script get
/// `default`.
#[derive(Debug, Clone)]
pub enum Dial {
    Refuse,
    /// Accept and play these steps; hold the socket open afterwards.
    Accept(Vec<Step>),
}

pub struct FakeConnector {
    script: Mutex<VecDeque<Dial>>,
    default: Dial,
    pub urls: Arc<Mutex<Vec<String>>>,
    pub sent: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new(script: Vec<Dial>, default: Dial) -> Self {
        Self {
            script: Mutex::new(script.into()),
            default,
            urls: Arc::default(),
            sent: Arc::default(),
        }
    }

    /// Every dial succeeds and the socket stays quiet.
    pub fn healthy() -> Self {
        Self::new(Vec::new(), Dial::Accept(Vec::new()))
    }

    /// Every dial is refused.
    pub fn refusing() -> Self {
        Self::new(Vec::new(), Dial::Refuse)
    }
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl Connector for FakeConnector {
    type Connection = FakeConnection;

    async fn connect(&self, url: &str) -> Result<FakeConnection, TransportError> {
        self.urls.lock().unwrap().push(url.to_owned());
        let dial = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());
        match dial {
            Dial::Refuse => Err(TransportError::ConnectFailed {
                url: url.to_owned(),
                reason: "refused".into(),
            }),
            Dial::Accept(steps) => Ok(FakeConnection {
                id: ConnectionId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                steps: tokio::sync::Mutex::new(steps.into()),
                sent: Arc::clone(&self.sent),
            }),
        }
    }
}

pub struct FakeConnection {
    id: ConnectionId,
    steps: tokio::sync::Mutex<VecDeque<Step>>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl Connection for FakeConnection {
    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(text.to_owned());
        Ok(())
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut steps = self.steps.lock().await;
        loop {
            match steps.front().cloned() {
                Some(Step::Wait(d)) => {
                    // Leave the step queued until the wait completes so a
                    // cancelled recv resumes it.
                    tokio::time::sleep(d).await;
                    steps.pop_front();
                }
                Some(Step::Send(text)) => {
                    steps.pop_front();
                    return Ok(Some(text));
                }
                Some(Step::Close) => {
                    steps.pop_front();
                    return Ok(None);
                }
                Some(Step::Fail) => {
                    steps.pop_front();
                    return Err(TransportError::ReceiveFailed(std::io::Error::other("reset")));
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

// =========================================================================
// Save backend
// =========================================================================

#[derive(Default)]
pub struct BackendLog {
    pub writes: Mutex<Vec<Vec<u8>>>,
    pub reads: AtomicUsize,
    /// Writes started and not yet completed or dropped.
    pub active_writes: AtomicUsize,
}

impl BackendLog {
    pub fn active_writes(&self) -> usize {
        self.active_writes.load(Ordering::SeqCst)
    }
}

struct ActiveWrite<'a>(&'a AtomicUsize);

impl<'a> ActiveWrite<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActiveWrite<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Answers reads with `stored` (or 404) and records writes.
/// With `hang_writes` a write never completes.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    pub stored: Option<Vec<u8>>,
    pub fail_writes: bool,
    pub hang_writes: bool,
    pub log: Arc<BackendLog>,
}

impl MemoryBackend {
    pub fn write_count(&self) -> usize {
        self.log.writes.lock().unwrap().len()
    }
}

impl SaveBackend for MemoryBackend {
    async fn write(&self, _game_id: &GameId, _token: &str, body: &SaveBody) -> Result<(), SaveError> {
        let _active = ActiveWrite::enter(&self.log.active_writes);
        if self.hang_writes {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.log.writes.lock().unwrap().push(body.decode_state().unwrap());
        if self.fail_writes {
            return Err(SaveError::Status {
                status: 500,
                url: "/api/v1/game-state/save".into(),
            });
        }
        Ok(())
    }

    async fn read(&self, _game_id: &GameId, _token: Option<&str>) -> Result<LoadResponse, SaveError> {
        self.log.reads.fetch_add(1, Ordering::SeqCst);
        Ok(match &self.stored {
            Some(state) => LoadResponse::Found(state.clone()),
            None => LoadResponse::NotFound,
        })
    }

    async fn fetch_fallback(&self, _key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        Ok(None)
    }
}

// =========================================================================
// Emulator
// =========================================================================

#[derive(Default)]
pub struct EmulatorLog {
    pub pauses: AtomicUsize,
    pub plays: AtomicUsize,
    pub loaded: Mutex<Vec<Vec<u8>>>,
}

impl EmulatorLog {
    pub fn pauses(&self) -> usize {
        self.pauses.load(Ordering::SeqCst)
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

pub struct FakeEmulator {
    pub state: Vec<u8>,
    pub log: Arc<EmulatorLog>,
}

impl FakeEmulator {
    pub fn new(state: &[u8]) -> (Self, Arc<EmulatorLog>) {
        let log = Arc::new(EmulatorLog::default());
        (
            Self {
                state: state.to_vec(),
                log: Arc::clone(&log),
            },
            log,
        )
    }
}

impl Emulator for FakeEmulator {
    fn pause(&mut self) {
        self.log.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn play(&mut self) {
        self.log.plays.fetch_add(1, Ordering::SeqCst);
    }

    fn save_state(&mut self) -> Result<Vec<u8>, SessionError> {
        Ok(self.state.clone())
    }

    fn load_state(&mut self, state: &[u8]) -> Result<(), SessionError> {
        self.log.loaded.lock().unwrap().push(state.to_vec());
        self.state = state.to_vec();
        Ok(())
    }
}

// =========================================================================
// Host and view
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Post(SessionMessage),
    Return(String),
    Navigate(String),
    Reload,
}

#[derive(Clone, Default)]
pub struct RecordingHost {
    pub calls: Arc<Mutex<Vec<HostCall>>>,
}

impl RecordingHost {
    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl HostBridge for RecordingHost {
    fn post_message(&mut self, message: SessionMessage) {
        self.calls.lock().unwrap().push(HostCall::Post(message));
    }

    fn return_to_host(&mut self, reason: &str) {
        self.calls.lock().unwrap().push(HostCall::Return(reason.to_owned()));
    }

    fn navigate(&mut self, path: &str) {
        self.calls.lock().unwrap().push(HostCall::Navigate(path.to_owned()));
    }

    fn reload(&mut self) {
        self.calls.lock().unwrap().push(HostCall::Reload);
    }
}

#[derive(Clone, Default)]
pub struct RecordingView {
    pub prompts: Arc<Mutex<Vec<PromptView>>>,
    pub timer_text: Arc<Mutex<Vec<Option<String>>>>,
}

impl SessionView for RecordingView {
    fn render_timer(&mut self, display: Option<retrokiosk::TimerDisplay>) {
        self.timer_text
            .lock()
            .unwrap()
            .push(display.map(|d| d.to_string()));
    }

    fn render_prompt(&mut self, prompt: &PromptView) {
        self.prompts.lock().unwrap().push(*prompt);
    }
}
