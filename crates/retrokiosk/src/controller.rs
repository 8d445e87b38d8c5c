//! `SessionController` builder, handle and actor loop.
//!
//! The controller runs as a single Tokio task that owns every piece of
//! session state: the play timer, the prompt, the auto-save interval, the
//! health monitor and the termination state. Everything that can happen
//! to a session (commands from the page, timer ticks, socket trouble, the
//! startup load) is handled one at a time inside one `select!` loop.

use retrokiosk_protocol::{HostAction, HostMessage, SessionMessage};
use retrokiosk_save::{SaveBackend, SaveCoordinator, SaveError, SaveOutcome, SkipReason};
use retrokiosk_session::{Emulator, EmulatorBinding, SessionIdentity, TokenSlot};
use retrokiosk_tick::{CountdownTimer, IntervalTimer, TimerEvent, TimerState};
use retrokiosk_transport::Connector;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::{HostContext, ServerOrigins, SessionConfig};
use crate::health::{ConnectionMonitor, ConnectionState};
use crate::host::{HostBridge, LogHost, NullView, SessionView};
use crate::termination::{
    EndReason, Prompt, PromptChoice, PromptTrigger, PromptView, TerminationState,
};
use crate::KioskError;

/// Capacity of the command channel between handles and the actor.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

type LoadResult = Result<Option<Vec<u8>>, SaveError>;

// ---------------------------------------------------------------------------
// Commands, events, status
// ---------------------------------------------------------------------------

/// Navigation the page intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Browser back.
    Back,
    /// Escape key.
    Escape,
    /// The page is about to unload.
    Unload,
}

/// Commands sent to the controller task through its channel.
enum Command<E> {
    GameStarted(E),
    Host(HostAction),
    /// The shared token slot was filled for the first time.
    TokenArrived,
    /// A token arrived while one was already set.
    RefreshToken(String),
    Navigation(NavigationEvent),
    Choose(PromptChoice),
    SaveNow {
        reply: oneshot::Sender<Result<SaveOutcome, SaveError>>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
    Shutdown,
}

/// A snapshot of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub termination: TerminationState,
    pub connection: ConnectionState,
    pub failures: u32,
    pub timer: TimerState,
    /// Whether the game-start callback has fired.
    pub loaded: bool,
    pub prompt: Option<PromptView>,
    pub end_reason: Option<EndReason>,
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Handle to a running session. The page talks to the controller only
/// through this.
///
/// Cheap to clone. When every clone is dropped without the session having
/// ended, the controller ends it with [`EndReason::Closed`].
pub struct SessionHandle<E> {
    sender: mpsc::Sender<Command<E>>,
    token: TokenSlot,
    ended: watch::Receiver<Option<EndReason>>,
}

impl<E> Clone for SessionHandle<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            token: self.token.clone(),
            ended: self.ended.clone(),
        }
    }
}

impl<E: Emulator> SessionHandle<E> {
    async fn send(&self, cmd: Command<E>) -> Result<(), KioskError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| KioskError::SessionClosed)
    }

    /// The game-start callback: binds the emulator, applies any restored
    /// state and starts the timer. Later calls are ignored.
    pub async fn game_started(&self, emulator: E) -> Result<(), KioskError> {
        self.send(Command::GameStarted(emulator)).await
    }

    /// Delivers a message posted by the hosting frame.
    pub async fn deliver_host_message(&self, message: HostMessage) -> Result<(), KioskError> {
        match message {
            HostMessage::Token(token) => self.deliver_token(token).await,
            HostMessage::Action(action) => self.send(Command::Host(action)).await,
        }
    }

    /// Parses and delivers a posted JSON message. Returns `false` for
    /// messages that are not for us.
    ///
    /// # Errors
    /// [`KioskError::Protocol`] if `text` is not JSON at all.
    pub async fn deliver_host_json(&self, text: &str) -> Result<bool, KioskError> {
        match HostMessage::parse(text)? {
            Some(message) => {
                self.deliver_host_message(message).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Hands over an auth token.
    ///
    /// The first token lands in the shared slot immediately, so a startup
    /// wait sees it without going through the controller. Later tokens are
    /// only used to re-authenticate a dropped connection.
    pub async fn deliver_token(&self, token: impl Into<String>) -> Result<(), KioskError> {
        let token = token.into();
        if token.is_empty() {
            return Ok(());
        }
        if self.token.offer(token.clone()) {
            self.send(Command::TokenArrived).await
        } else {
            self.send(Command::RefreshToken(token)).await
        }
    }

    /// Reports an intercepted back/Escape/unload.
    pub async fn navigation(&self, event: NavigationEvent) -> Result<(), KioskError> {
        self.send(Command::Navigation(event)).await
    }

    /// Answers the save prompt.
    pub async fn choose(&self, choice: PromptChoice) -> Result<(), KioskError> {
        self.send(Command::Choose(choice)).await
    }

    /// Runs a forced save and waits for its outcome.
    pub async fn save_now(&self) -> Result<SaveOutcome, KioskError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::SaveNow { reply: reply_tx }).await?;
        let outcome = reply_rx.await.map_err(|_| KioskError::SessionClosed)?;
        Ok(outcome?)
    }

    /// Requests a snapshot of the session.
    pub async fn status(&self) -> Result<SessionStatus, KioskError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Status { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| KioskError::SessionClosed)
    }

    /// Ends the session with [`EndReason::Closed`].
    pub async fn shutdown(&self) -> Result<(), KioskError> {
        self.send(Command::Shutdown).await
    }

    /// Why the session ended, if it has.
    pub fn end_reason(&self) -> Option<EndReason> {
        *self.ended.borrow()
    }

    /// Waits for the session to end.
    pub async fn ended(&self) -> EndReason {
        let mut ended = self.ended.clone();
        match ended.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(EndReason::Closed),
            Err(_) => self.end_reason().unwrap_or(EndReason::Closed),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`SessionController`].
///
/// # Example
///
/// ```rust,ignore
/// let controller = SessionController::builder()
///     .config(config)
///     .identity(identity)
///     .host(my_host)
///     .build(WebSocketConnector, HttpSaveBackend::new(origin)?);
/// let (handle, task) = controller.spawn();
/// handle.game_started(my_emulator).await?;
/// ```
pub struct SessionControllerBuilder {
    config: SessionConfig,
    identity: SessionIdentity,
    origins: ServerOrigins,
    host: Box<dyn HostBridge>,
    view: Box<dyn SessionView>,
}

impl SessionControllerBuilder {
    /// Defaults: default config, no game id, no token, a logging host and
    /// a view that renders nothing.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            identity: SessionIdentity::new(None, "", TokenSlot::empty()),
            origins: ServerOrigins::default(),
            host: Box::new(LogHost),
            view: Box::new(NullView),
        }
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn identity(mut self, identity: SessionIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Where the health socket's address is derived from.
    pub fn origins(mut self, origins: ServerOrigins) -> Self {
        self.origins = origins;
        self
    }

    pub fn host(mut self, host: impl HostBridge) -> Self {
        self.host = Box::new(host);
        self
    }

    pub fn view(mut self, view: impl SessionView) -> Self {
        self.view = Box::new(view);
        self
    }

    /// Assembles the controller with the given socket connector and save
    /// backend. Nothing runs until [`SessionController::spawn`].
    pub fn build<C, B, E>(self, connector: C, backend: B) -> SessionController<C, B, E>
    where
        C: Connector,
        B: SaveBackend,
        E: Emulator,
    {
        let config = self.config.validated();
        let emulator = EmulatorBinding::unbound();
        let saves = SaveCoordinator::new(
            backend,
            emulator.clone(),
            self.identity.clone(),
            config.save.clone(),
        );
        SessionController {
            monitor: ConnectionMonitor::new(connector, config.health.clone()),
            timer: CountdownTimer::new(config.timer.clone()),
            prompt: Prompt::new(config.prompt.countdown_secs),
            auto_save: IntervalTimer::new(config.save.auto_save_interval),
            config,
            identity: self.identity,
            origins: self.origins,
            host: self.host,
            view: self.view,
            emulator,
            saves,
        }
    }
}

impl Default for SessionControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// A fully assembled session, ready to [`spawn`](Self::spawn).
pub struct SessionController<C, B, E> {
    config: SessionConfig,
    identity: SessionIdentity,
    origins: ServerOrigins,
    host: Box<dyn HostBridge>,
    view: Box<dyn SessionView>,
    emulator: EmulatorBinding<E>,
    saves: SaveCoordinator<B, E>,
    monitor: ConnectionMonitor<C>,
    timer: CountdownTimer,
    prompt: Prompt,
    auto_save: IntervalTimer,
}

impl SessionController<(), (), ()> {
    /// Creates a new builder. The connector, backend and emulator types
    /// are fixed later by [`SessionControllerBuilder::build`].
    pub fn builder() -> SessionControllerBuilder {
        SessionControllerBuilder::new()
    }
}

impl<C, B, E> SessionController<C, B, E>
where
    C: Connector,
    B: SaveBackend,
    E: Emulator,
{
    /// Starts the controller task.
    ///
    /// Returns the handle the page talks through and the task, which
    /// resolves with the end reason once the session has ended and every
    /// handle is gone.
    pub fn spawn(self) -> (SessionHandle<E>, JoinHandle<EndReason>) {
        let (sender, commands) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (ended_tx, ended_rx) = watch::channel(None);

        let handle = SessionHandle {
            sender,
            token: self.identity.token_slot().clone(),
            ended: ended_rx,
        };

        let actor = SessionActor {
            state: TerminationState::Active,
            loaded: false,
            pending_restore: None,
            end_reason: None,
            ended_tx,
            commands,
            config: self.config,
            identity: self.identity,
            origins: self.origins,
            host: self.host,
            view: self.view,
            emulator: self.emulator,
            saves: self.saves,
            monitor: self.monitor,
            timer: self.timer,
            prompt: self.prompt,
            auto_save: self.auto_save,
            auto_save_task: None,
        };
        (handle, tokio::spawn(actor.run()))
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The controller task's state.
struct SessionActor<C, B, E> {
    config: SessionConfig,
    identity: SessionIdentity,
    origins: ServerOrigins,
    host: Box<dyn HostBridge>,
    view: Box<dyn SessionView>,
    emulator: EmulatorBinding<E>,
    saves: SaveCoordinator<B, E>,
    monitor: ConnectionMonitor<C>,
    timer: CountdownTimer,
    prompt: Prompt,
    auto_save: IntervalTimer,
    /// The running auto-save, aborted when the session ends.
    auto_save_task: Option<JoinHandle<()>>,

    state: TerminationState,
    loaded: bool,
    /// State loaded before the emulator was bound.
    pending_restore: Option<Vec<u8>>,
    end_reason: Option<EndReason>,
    ended_tx: watch::Sender<Option<EndReason>>,
    commands: mpsc::Receiver<Command<E>>,
}

/// Awaits the startup load; pends forever once it has been taken.
async fn startup_result(rx: &mut Option<oneshot::Receiver<LoadResult>>) -> Option<LoadResult> {
    match rx {
        Some(rx) => rx.await.ok(),
        None => std::future::pending().await,
    }
}

impl<C, B, E> SessionActor<C, B, E>
where
    C: Connector,
    B: SaveBackend,
    E: Emulator,
{
    /// Runs the actor loop until the session has ended and every handle
    /// has been dropped.
    async fn run(mut self) -> EndReason {
        tracing::info!(
            game_id = ?self.identity.game_id().map(|id| id.as_str()),
            context = %self.config.host_context,
            limit_secs = ?self.config.timer.limit_secs,
            "session started"
        );
        self.view.render_timer(self.timer.display());
        if let Some(token) = self.identity.token() {
            self.start_monitor(&token);
        }
        let mut startup = Some(self.spawn_startup_load());

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd).await,
                    None => break,
                },
                event = self.timer.wait_for_tick() => self.on_timer(event).await,
                event = self.prompt.wait_for_tick() => self.on_prompt_tick(event),
                _ = self.auto_save.tick() => self.spawn_auto_save(),
                loss = self.monitor.next_loss() => self.end(loss.into()),
                loaded = startup_result(&mut startup) => {
                    startup = None;
                    self.on_state_loaded(loaded).await;
                }
            }
        }

        if self.state != TerminationState::Ended {
            tracing::info!("all session handles dropped");
            self.end(EndReason::Closed);
        }
        self.end_reason.unwrap_or(EndReason::Closed)
    }

    async fn handle_command(&mut self, cmd: Command<E>) {
        match cmd {
            Command::GameStarted(emulator) => self.on_game_started(emulator).await,
            Command::Host(action) => self.on_host_action(action).await,
            Command::TokenArrived => self.on_token_arrived(),
            Command::RefreshToken(token) => self.on_token_refresh(token),
            Command::Navigation(event) => self.on_navigation(event).await,
            Command::Choose(choice) => self.on_prompt_choice(choice).await,
            Command::SaveNow { reply } => self.spawn_save_now(reply),
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown => self.end(EndReason::Closed),
        }
    }

    fn transition(&mut self, target: TerminationState) -> bool {
        if !self.state.can_transition_to(target) {
            tracing::warn!(from = %self.state, to = %target, "illegal termination transition");
            return false;
        }
        tracing::debug!(from = %self.state, to = %target, "termination state");
        self.state = target;
        true
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            termination: self.state,
            connection: self.monitor.state(),
            failures: self.monitor.failures(),
            timer: self.timer.state(),
            loaded: self.loaded,
            prompt: self.prompt.view(),
            end_reason: self.end_reason,
        }
    }

    // -- startup ------------------------------------------------------------

    /// Waits (bounded) for a token, then loads saved state in the
    /// background so the loop keeps serving commands meanwhile.
    fn spawn_startup_load(&self) -> oneshot::Receiver<LoadResult> {
        let (tx, rx) = oneshot::channel();
        let saves = self.saves.clone();
        let slot = self.identity.token_slot().clone();
        let wait = self.config.token_wait.clone();
        tokio::spawn(async move {
            slot.wait(&wait).await;
            let _ = tx.send(saves.load().await);
        });
        rx
    }

    async fn on_state_loaded(&mut self, result: Option<LoadResult>) {
        match result {
            Some(Ok(Some(state))) if self.loaded => self.apply_restore(state).await,
            Some(Ok(Some(state))) => {
                tracing::debug!(bytes = state.len(), "saved state waiting for game start");
                self.pending_restore = Some(state);
            }
            Some(Ok(None)) => tracing::debug!("no saved state"),
            Some(Err(e)) => tracing::debug!(error = %e, "starting without saved state"),
            None => tracing::debug!("startup load abandoned"),
        }
    }

    async fn apply_restore(&mut self, state: Vec<u8>) {
        match self.emulator.restore(&state).await {
            Ok(true) => tracing::info!(bytes = state.len(), "saved state restored"),
            Ok(false) => self.pending_restore = Some(state),
            Err(e) => tracing::warn!(error = %e, "emulator rejected saved state"),
        }
    }

    async fn on_game_started(&mut self, emulator: E) {
        if self.state == TerminationState::Ended {
            tracing::debug!("game start after session end ignored");
            return;
        }
        if self.loaded {
            tracing::debug!("game already started");
            return;
        }
        self.emulator.bind(emulator).await;
        self.loaded = true;
        self.monitor.mark_loaded();

        if let Some(state) = self.pending_restore.take() {
            self.apply_restore(state).await;
        }
        self.timer.start();
        self.view.render_timer(self.timer.display());
        if self.config.save.auto_save {
            self.auto_save.start();
        }
        tracing::info!("game started");
    }

    // -- token --------------------------------------------------------------

    fn start_monitor(&mut self, token: &str) {
        match self.origins.socket_url(token) {
            Ok(url) => {
                self.monitor.start(url);
            }
            Err(e) => tracing::warn!(error = %e, "cannot derive health socket address"),
        }
    }

    fn on_token_arrived(&mut self) {
        if !self.state.is_live() || self.monitor.state() != ConnectionState::Idle {
            return;
        }
        if let Some(token) = self.identity.token() {
            tracing::info!("auth token arrived");
            self.start_monitor(&token);
        }
    }

    fn on_token_refresh(&mut self, token: String) {
        if !self.state.is_live() || !self.monitor.state().accepts_token_refresh() {
            tracing::debug!(connection = %self.monitor.state(), "token already set, ignoring");
            return;
        }
        let url = match self.origins.socket_url(&token) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(error = %e, "cannot derive health socket address");
                return;
            }
        };
        self.identity.token_slot().refresh(token);
        if self.monitor.refresh(url) {
            tracing::info!("token refreshed, reconnecting");
        }
    }

    // -- triggers -----------------------------------------------------------

    async fn on_host_action(&mut self, action: HostAction) {
        tracing::debug!(?action, "host action");
        match action {
            HostAction::End if self.config.prompt.enabled => {
                self.request_prompt(PromptTrigger::HostEnd).await;
            }
            HostAction::End => self.end(EndReason::UserEnded),
            HostAction::Continue => self.continue_session().await,
            HostAction::Restart => self.end(EndReason::Restart),
        }
    }

    async fn on_navigation(&mut self, event: NavigationEvent) {
        let trigger = match event {
            NavigationEvent::Back => PromptTrigger::BackNavigation,
            NavigationEvent::Escape => PromptTrigger::EscapeKey,
            NavigationEvent::Unload => PromptTrigger::Unload,
        };
        if self.config.prompt.enabled {
            self.request_prompt(trigger).await;
        } else {
            tracing::debug!(?event, "no prompt configured, ending");
            self.end(EndReason::UserEnded);
        }
    }

    async fn on_timer(&mut self, event: TimerEvent) {
        self.view.render_timer(self.timer.display());
        if event != TimerEvent::Expired {
            return;
        }

        tracing::info!("time limit reached");
        let embedded = self.config.host_context.is_embedded();
        if embedded {
            self.host.post_message(SessionMessage::SessionOptions);
        }

        if self.config.prompt.enabled {
            if let Some(view) = self.prompt.retrigger(PromptTrigger::TimerExpired) {
                self.view.render_prompt(&view);
            } else {
                self.request_prompt(PromptTrigger::TimerExpired).await;
            }
        } else {
            self.emulator.pause().await;
            if !embedded {
                self.end(EndReason::TimeExpired);
            }
        }
    }

    /// Pauses and shows the prompt. At most one prompt at a time.
    async fn request_prompt(&mut self, trigger: PromptTrigger) {
        if self.state != TerminationState::Active {
            tracing::debug!(state = %self.state, ?trigger, "prompt request ignored");
            return;
        }
        self.transition(TerminationState::PromptPending);
        self.emulator.pause().await;
        let view = self.prompt.show(trigger);
        self.view.render_prompt(&view);
        tracing::info!(?trigger, countdown = view.countdown, "save prompt shown");
    }

    fn hide_prompt(&mut self) {
        if self.prompt.is_visible() {
            self.prompt.hide();
            self.view.hide_prompt();
        }
    }

    fn on_prompt_tick(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick { .. } => {
                if let Some(view) = self.prompt.view() {
                    self.view.render_prompt(&view);
                }
            }
            TimerEvent::Expired => {
                tracing::info!("save prompt timed out");
                self.hide_prompt();
                self.transition(TerminationState::Discarding);
                self.end(EndReason::UserEnded);
            }
        }
    }

    async fn on_prompt_choice(&mut self, choice: PromptChoice) {
        if self.state != TerminationState::PromptPending {
            tracing::debug!(state = %self.state, ?choice, "no prompt to answer");
            return;
        }
        match choice {
            PromptChoice::Resume => {
                if !self.prompt.view().is_some_and(|v| v.can_resume) {
                    tracing::debug!("resume not offered for this prompt");
                    return;
                }
                self.hide_prompt();
                self.transition(TerminationState::Active);
                self.emulator.play().await;
                tracing::info!("session resumed");
            }
            PromptChoice::Discard => {
                self.hide_prompt();
                self.transition(TerminationState::Discarding);
                self.end(EndReason::UserEnded);
            }
            PromptChoice::Save => {
                self.hide_prompt();
                self.transition(TerminationState::Saving);
                let limit = self.config.prompt.final_save_timeout;
                match tokio::time::timeout(limit, self.saves.save(true)).await {
                    Ok(Ok(outcome)) => tracing::info!(?outcome, "final save"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "final save failed, ending anyway"),
                    Err(_) => tracing::warn!(
                        limit_ms = limit.as_millis() as u64,
                        "final save timed out, ending anyway"
                    ),
                }
                self.end(EndReason::UserEnded);
            }
        }
    }

    /// The host's `continue`: dismiss any prompt, reset the clock, resume.
    async fn continue_session(&mut self) {
        match self.state {
            TerminationState::PromptPending => {
                self.hide_prompt();
                self.transition(TerminationState::Active);
            }
            TerminationState::Active => {}
            other => {
                tracing::debug!(state = %other, "continue ignored");
                return;
            }
        }
        self.timer.reset();
        self.view.render_timer(self.timer.display());
        self.emulator.play().await;
        tracing::info!("session continued");
    }

    // -- saves --------------------------------------------------------------

    fn spawn_auto_save(&mut self) {
        if self.state != TerminationState::Active {
            return;
        }
        if self.auto_save_task.as_ref().is_some_and(|task| !task.is_finished()) {
            tracing::debug!("previous auto-save still running");
            return;
        }
        let saves = self.saves.clone();
        self.auto_save_task = Some(tokio::spawn(async move {
            let _ = saves.save(false).await;
        }));
    }

    fn spawn_save_now(&self, reply: oneshot::Sender<Result<SaveOutcome, SaveError>>) {
        if self.state == TerminationState::Ended {
            let _ = reply.send(Ok(SaveOutcome::Skipped(SkipReason::SessionEnded)));
            return;
        }
        let saves = self.saves.clone();
        tokio::spawn(async move {
            let _ = reply.send(saves.save(true).await);
        });
    }

    // -- ending -------------------------------------------------------------

    /// Enters `Ended`. Runs once; later calls are logged and ignored.
    fn end(&mut self, reason: EndReason) {
        if self.state == TerminationState::Ended {
            tracing::debug!(%reason, "session already ended");
            return;
        }
        self.transition(TerminationState::Ended);
        self.dispose();
        tracing::info!(%reason, "session ended");
        self.route_exit(reason);
        self.end_reason = Some(reason);
        let _ = self.ended_tx.send(Some(reason));
    }

    /// Stops every timer, cancels a running auto-save and closes the socket.
    fn dispose(&mut self) {
        self.timer.stop();
        self.hide_prompt();
        self.auto_save.stop();
        if let Some(task) = self.auto_save_task.take() {
            task.abort();
        }
        self.monitor.close();
    }

    fn route_exit(&mut self, reason: EndReason) {
        if reason == EndReason::Restart {
            self.host.reload();
            return;
        }
        match self.config.host_context {
            HostContext::Embedded => self.host.post_message(SessionMessage::SessionEnd {
                reason: reason.to_string(),
            }),
            HostContext::ManagedShell => self.host.return_to_host(reason.as_str()),
            HostContext::Standalone => self.host.navigate(&self.config.exit_path),
        }
    }
}
