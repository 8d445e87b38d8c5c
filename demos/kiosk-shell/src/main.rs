use std::time::{Duration, Instant};

use retrokiosk::prelude::*;
use retrokiosk::{
    GameId, HostAction, HostMessage, SaveConfig, SessionError, SessionMessage, TimerConfig,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Stand-in emulator
// ---------------------------------------------------------------------------

/// Pretends to run a game. Its "state" is the total play time in
/// milliseconds, so save/restore round trips are visible in the logs.
struct ClockEmulator {
    played: Duration,
    resumed_at: Option<Instant>,
}

impl ClockEmulator {
    fn running() -> Self {
        Self {
            played: Duration::ZERO,
            resumed_at: Some(Instant::now()),
        }
    }

    fn total(&self) -> Duration {
        self.played + self.resumed_at.map_or(Duration::ZERO, |t| t.elapsed())
    }
}

impl Emulator for ClockEmulator {
    fn pause(&mut self) {
        if let Some(t) = self.resumed_at.take() {
            self.played += t.elapsed();
        }
        println!("[emulator] paused at {:.1}s", self.played.as_secs_f32());
    }

    fn play(&mut self) {
        if self.resumed_at.is_none() {
            self.resumed_at = Some(Instant::now());
        }
        println!("[emulator] playing");
    }

    fn save_state(&mut self) -> Result<Vec<u8>, SessionError> {
        let millis = self.total().as_millis() as u64;
        Ok(millis.to_le_bytes().to_vec())
    }

    fn load_state(&mut self, state: &[u8]) -> Result<(), SessionError> {
        let bytes: [u8; 8] = state
            .try_into()
            .map_err(|_| SessionError::Emulator(format!("expected 8 bytes, got {}", state.len())))?;
        self.played = Duration::from_millis(u64::from_le_bytes(bytes));
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
        println!("[emulator] restored {:.1}s of play", self.played.as_secs_f32());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Terminal host
// ---------------------------------------------------------------------------

struct StdoutHost;

impl HostBridge for StdoutHost {
    fn post_message(&mut self, message: SessionMessage) {
        match serde_json::to_string(&message) {
            Ok(json) => println!("[host] postMessage {json}"),
            Err(e) => tracing::warn!(error = %e, "could not encode host message"),
        }
    }

    fn return_to_host(&mut self, reason: &str) {
        println!("[host] return to shell: {reason}");
    }

    fn navigate(&mut self, path: &str) {
        println!("[host] navigate to {path}");
    }

    fn reload(&mut self) {
        println!("[host] reload");
    }
}

struct StdoutView;

impl SessionView for StdoutView {
    fn render_timer(&mut self, display: Option<retrokiosk::TimerDisplay>) {
        if let Some(display) = display {
            // Only print whole minutes and the final warning stretch.
            if display.warning || display.remaining_secs % 60 == 0 {
                println!("[view] {display}");
            }
        }
    }

    fn render_prompt(&mut self, prompt: &retrokiosk::PromptView) {
        let resume = if prompt.can_resume { "/resume" } else { "" };
        println!(
            "[view] save before leaving? save/discard{resume} ({}s)",
            prompt.countdown
        );
    }

    fn hide_prompt(&mut self) {
        println!("[view] prompt closed");
    }
}

// ---------------------------------------------------------------------------
// Configuration from the environment
// ---------------------------------------------------------------------------

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_flag(name: &str) -> bool {
    env(name).is_some_and(|v| matches!(v.as_str(), "1" | "true" | "yes"))
}

fn config_from_env() -> SessionConfig {
    let limit = env("KIOSK_TIME_LIMIT").and_then(|v| v.parse::<u32>().ok());
    let timer = limit.map_or_else(TimerConfig::unlimited, TimerConfig::with_limit);
    let save = if env_flag("KIOSK_AUTO_SAVE") {
        let secs = env("KIOSK_AUTO_SAVE_INTERVAL")
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);
        SaveConfig::auto(Duration::from_secs(secs))
    } else {
        SaveConfig::default()
    };
    let host_context = if env_flag("KIOSK_EMBEDDED") {
        HostContext::Embedded
    } else {
        HostContext::Standalone
    };
    SessionConfig {
        timer,
        save,
        host_context,
        ..SessionConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

const HELP: &str = "commands: end | continue | restart | back | escape | unload | \
save | discard | resume | savenow | status | token <jwt> | json <message> | quit";

async fn dispatch(handle: &SessionHandle<ClockEmulator>, line: &str) -> Result<bool, KioskError> {
    let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
    match cmd {
        "end" => handle.deliver_host_message(HostMessage::Action(HostAction::End)).await?,
        "continue" => {
            handle
                .deliver_host_message(HostMessage::Action(HostAction::Continue))
                .await?
        }
        "restart" => {
            handle
                .deliver_host_message(HostMessage::Action(HostAction::Restart))
                .await?
        }
        "back" => handle.navigation(NavigationEvent::Back).await?,
        "escape" => handle.navigation(NavigationEvent::Escape).await?,
        "unload" => handle.navigation(NavigationEvent::Unload).await?,
        "save" => handle.choose(PromptChoice::Save).await?,
        "discard" => handle.choose(PromptChoice::Discard).await?,
        "resume" => handle.choose(PromptChoice::Resume).await?,
        "savenow" => println!("{:?}", handle.save_now().await?),
        "status" => println!("{:#?}", handle.status().await?),
        "token" => handle.deliver_token(arg.trim()).await?,
        "json" => {
            if !handle.deliver_host_json(arg).await? {
                println!("message ignored");
            }
        }
        "quit" => {
            handle.shutdown().await?;
            return Ok(false);
        }
        "" => {}
        _ => println!("{HELP}"),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let server = env("KIOSK_SERVER").unwrap_or_else(|| "http://localhost:8080".into());
    let name = env("KIOSK_GAME_NAME").unwrap_or_else(|| "Demo Game".into());
    let game_id = GameId::resolve(env("KIOSK_GAME_ID").as_deref(), "/play", &name).ok();
    let token = env("KIOSK_TOKEN").map(TokenSlot::with_token).unwrap_or_default();
    let origins = retrokiosk::ServerOrigins {
        page_hostname: env("KIOSK_HOSTNAME").unwrap_or_else(|| "localhost".into()),
        ..Default::default()
    };

    let (handle, task) = SessionController::builder()
        .config(config_from_env())
        .identity(SessionIdentity::new(game_id, name, token))
        .origins(origins)
        .host(StdoutHost)
        .view(StdoutView)
        .build(WebSocketConnector, HttpSaveBackend::new(&server)?)
        .spawn();

    handle.game_started(ClockEmulator::running()).await?;
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            reason = handle.ended() => {
                println!("session ended: {reason}");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !dispatch(&handle, line.trim()).await? {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    drop(handle);
    let reason = task.await?;
    tracing::info!(%reason, "controller stopped");
    Ok(())
}
