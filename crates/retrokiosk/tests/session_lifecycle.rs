//! End-to-end session scenarios through `SessionHandle`, on paused time.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::{
    Dial, FakeConnector, FakeEmulator, HostCall, MemoryBackend, RecordingHost, RecordingView, Step,
};
use retrokiosk::{
    ConnectionState, EndReason, GameId, HostAction, HostContext, HostMessage, NavigationEvent,
    PromptChoice, PromptConfig, PromptTrigger, SaveOutcome, SessionConfig, SessionController,
    SessionHandle, SessionIdentity, SessionMessage, SkipReason, TerminationState, TimerConfig,
    TokenSlot,
};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

struct Session {
    handle: SessionHandle<FakeEmulator>,
    task: JoinHandle<EndReason>,
    host: RecordingHost,
    view: RecordingView,
    backend: MemoryBackend,
    urls: Arc<Mutex<Vec<String>>>,
}

fn launch(
    config: SessionConfig,
    connector: FakeConnector,
    backend: MemoryBackend,
    token: Option<&str>,
) -> Session {
    let host = RecordingHost::default();
    let view = RecordingView::default();
    let urls = Arc::clone(&connector.urls);
    let slot = token.map(TokenSlot::with_token).unwrap_or_default();
    let game_id = GameId::resolve(Some("tetris"), "/play", "Tetris").unwrap();

    let (handle, task) = SessionController::builder()
        .config(config)
        .identity(SessionIdentity::new(Some(game_id), "Tetris", slot))
        .host(host.clone())
        .view(view.clone())
        .build(connector, backend.clone())
        .spawn();

    Session {
        handle,
        task,
        host,
        view,
        backend,
        urls,
    }
}

fn launch_default(config: SessionConfig) -> Session {
    launch(
        config,
        FakeConnector::healthy(),
        MemoryBackend::default(),
        Some("jwt"),
    )
}

fn timed(limit_secs: u32) -> SessionConfig {
    SessionConfig {
        timer: TimerConfig::with_limit(limit_secs),
        ..SessionConfig::default()
    }
}

async fn ended_within(handle: &SessionHandle<FakeEmulator>, secs: u64) -> EndReason {
    timeout(Duration::from_secs(secs), handle.ended())
        .await
        .expect("session should have ended")
}

// =========================================================================
// Timer expiry and the prompt
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_timer_expiry_unanswered_prompt_ends_without_saving() {
    let s = launch_default(timed(5));
    let (emulator, log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    let started = tokio::time::Instant::now();
    let reason = ended_within(&s.handle, 60).await;

    assert_eq!(reason, EndReason::UserEnded);
    // 5s of play, then the 10s prompt countdown.
    assert!(started.elapsed() >= Duration::from_secs(15));
    assert_eq!(s.backend.write_count(), 0);
    assert_eq!(s.host.calls(), vec![HostCall::Navigate("/selectGame".into())]);
    assert_eq!(log.pauses(), 1);

    let prompts = s.view.prompts.lock().unwrap().clone();
    let first = prompts.first().copied().unwrap();
    assert_eq!(first.trigger, PromptTrigger::TimerExpired);
    assert_eq!(first.countdown, 10);
    assert!(!first.can_resume);
    assert!(prompts.iter().any(|p| p.countdown == 1));
}

#[tokio::test(start_paused = true)]
async fn test_timer_renders_clock_text() {
    let s = launch_default(timed(65));
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();
    sleep(Duration::from_millis(1500)).await;

    let texts = s.view.timer_text.lock().unwrap().clone();
    assert_eq!(texts.first().cloned().flatten().as_deref(), Some("Time Remaining: 1:05"));
    assert!(texts.contains(&Some("Time Remaining: 1:04".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_choose_save_writes_state_then_ends() {
    let s = launch_default(SessionConfig::default());
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle.navigation(NavigationEvent::Escape).await.unwrap();
    let status = s.handle.status().await.unwrap();
    assert_eq!(status.termination, TerminationState::PromptPending);

    s.handle.choose(PromptChoice::Save).await.unwrap();
    assert_eq!(ended_within(&s.handle, 5).await, EndReason::UserEnded);

    let writes = s.backend.log.writes.lock().unwrap().clone();
    assert_eq!(writes, vec![b"state".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn test_choose_save_backend_failure_still_ends() {
    let backend = MemoryBackend {
        fail_writes: true,
        ..MemoryBackend::default()
    };
    let s = launch(SessionConfig::default(), FakeConnector::healthy(), backend, Some("jwt"));
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle.navigation(NavigationEvent::Back).await.unwrap();
    s.handle.choose(PromptChoice::Save).await.unwrap();

    assert_eq!(ended_within(&s.handle, 5).await, EndReason::UserEnded);
    assert_eq!(s.backend.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_choose_save_stalled_backend_ends_after_timeout() {
    let backend = MemoryBackend {
        hang_writes: true,
        ..MemoryBackend::default()
    };
    let s = launch(SessionConfig::default(), FakeConnector::healthy(), backend, Some("jwt"));
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle.navigation(NavigationEvent::Escape).await.unwrap();
    s.handle.choose(PromptChoice::Save).await.unwrap();

    assert_eq!(ended_within(&s.handle, 60).await, EndReason::UserEnded);
    let status = timeout(Duration::from_secs(1), s.handle.status())
        .await
        .expect("controller should still answer")
        .unwrap();
    assert_eq!(status.termination, TerminationState::Ended);
    assert_eq!(s.backend.log.active_writes(), 0);
    assert_eq!(s.backend.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_choose_discard_ends_without_saving() {
    let s = launch_default(SessionConfig::default());
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle.navigation(NavigationEvent::Unload).await.unwrap();
    s.handle.choose(PromptChoice::Discard).await.unwrap();

    assert_eq!(ended_within(&s.handle, 5).await, EndReason::UserEnded);
    assert_eq!(s.backend.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_choose_resume_returns_to_play_and_can_reprompt() {
    let s = launch_default(SessionConfig::default());
    let (emulator, log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle.navigation(NavigationEvent::Escape).await.unwrap();
    let status = s.handle.status().await.unwrap();
    let prompt = status.prompt.unwrap();
    assert_eq!(prompt.trigger, PromptTrigger::EscapeKey);
    assert!(prompt.can_resume);

    s.handle.choose(PromptChoice::Resume).await.unwrap();
    let status = s.handle.status().await.unwrap();
    assert_eq!(status.termination, TerminationState::Active);
    assert!(status.prompt.is_none());
    assert_eq!(log.pauses(), 1);
    assert_eq!(log.plays(), 1);

    s.handle.navigation(NavigationEvent::Back).await.unwrap();
    let status = s.handle.status().await.unwrap();
    assert_eq!(status.termination, TerminationState::PromptPending);
    assert_eq!(status.prompt.unwrap().countdown, 10);
}

#[tokio::test(start_paused = true)]
async fn test_second_trigger_while_prompting_ignored() {
    let s = launch_default(SessionConfig::default());
    let (emulator, log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle.navigation(NavigationEvent::Escape).await.unwrap();
    s.handle
        .deliver_host_message(HostMessage::Action(HostAction::End))
        .await
        .unwrap();

    let status = s.handle.status().await.unwrap();
    assert_eq!(status.prompt.unwrap().trigger, PromptTrigger::EscapeKey);
    assert_eq!(log.pauses(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_choose_resume_after_timer_expiry_rejected() {
    let s = launch_default(timed(2));
    let (emulator, log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();
    sleep(Duration::from_millis(2500)).await;

    s.handle.choose(PromptChoice::Resume).await.unwrap();
    let status = s.handle.status().await.unwrap();
    assert_eq!(status.termination, TerminationState::PromptPending);
    assert_eq!(status.prompt.unwrap().trigger, PromptTrigger::TimerExpired);
    assert_eq!(log.plays(), 0);

    s.handle.choose(PromptChoice::Discard).await.unwrap();
    assert_eq!(ended_within(&s.handle, 5).await, EndReason::UserEnded);
}

#[tokio::test(start_paused = true)]
async fn test_choose_without_prompt_ignored() {
    let s = launch_default(SessionConfig::default());
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle.choose(PromptChoice::Discard).await.unwrap();
    let status = s.handle.status().await.unwrap();
    assert_eq!(status.termination, TerminationState::Active);
    assert!(s.handle.end_reason().is_none());
}

// =========================================================================
// Host frame
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_embedded_timer_expiry_posts_session_options() {
    let s = launch_default(SessionConfig {
        host_context: HostContext::Embedded,
        ..timed(2)
    });
    let (emulator, log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();
    sleep(Duration::from_millis(2500)).await;

    assert_eq!(s.host.calls(), vec![HostCall::Post(SessionMessage::SessionOptions)]);

    // The host extends the session.
    s.handle
        .deliver_host_json(r#"{"action":"continue"}"#)
        .await
        .unwrap();
    let status = s.handle.status().await.unwrap();
    assert_eq!(status.termination, TerminationState::Active);
    assert!(status.prompt.is_none());
    assert_eq!(status.timer.remaining_secs, Some(2));
    assert!(status.timer.running);
    assert_eq!(log.plays(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_host_continue_resets_timer() {
    let s = launch_default(timed(10));
    let (emulator, log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();
    sleep(Duration::from_millis(4500)).await;
    assert_eq!(s.handle.status().await.unwrap().timer.remaining_secs, Some(6));

    s.handle
        .deliver_host_message(HostMessage::Action(HostAction::Continue))
        .await
        .unwrap();

    let status = s.handle.status().await.unwrap();
    assert_eq!(status.timer.remaining_secs, Some(10));
    assert_eq!(log.plays(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_embedded_host_end_without_prompt_posts_session_end() {
    let s = launch_default(SessionConfig {
        host_context: HostContext::Embedded,
        prompt: PromptConfig::disabled(),
        ..SessionConfig::default()
    });
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    assert!(s.handle.deliver_host_json(r#"{"action":"end"}"#).await.unwrap());
    assert_eq!(ended_within(&s.handle, 5).await, EndReason::UserEnded);
    assert_eq!(
        s.host.calls(),
        vec![HostCall::Post(SessionMessage::SessionEnd {
            reason: "User ended session".into()
        })]
    );
}

#[tokio::test(start_paused = true)]
async fn test_managed_shell_end_returns_to_host() {
    let s = launch_default(SessionConfig {
        host_context: HostContext::ManagedShell,
        prompt: PromptConfig::disabled(),
        ..SessionConfig::default()
    });
    s.handle
        .deliver_host_message(HostMessage::Action(HostAction::End))
        .await
        .unwrap();

    ended_within(&s.handle, 5).await;
    assert_eq!(s.host.calls(), vec![HostCall::Return("User ended session".into())]);
}

#[tokio::test(start_paused = true)]
async fn test_host_restart_reloads() {
    let s = launch_default(SessionConfig::default());
    s.handle
        .deliver_host_json(r#"{"action":"restart"}"#)
        .await
        .unwrap();

    assert_eq!(ended_within(&s.handle, 5).await, EndReason::Restart);
    assert_eq!(s.host.calls(), vec![HostCall::Reload]);
}

#[tokio::test(start_paused = true)]
async fn test_deliver_host_json_unrelated_message_ignored() {
    let s = launch_default(SessionConfig::default());
    assert!(!s.handle.deliver_host_json(r#"{"action":"dance"}"#).await.unwrap());
    assert!(!s.handle.deliver_host_json(r#"{"hello":1}"#).await.unwrap());
    assert!(s.handle.deliver_host_json("not json").await.is_err());
}

// =========================================================================
// Ending
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_end_runs_once() {
    let s = launch_default(SessionConfig {
        host_context: HostContext::Embedded,
        prompt: PromptConfig::disabled(),
        ..SessionConfig::default()
    });
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    s.handle
        .deliver_host_message(HostMessage::Action(HostAction::End))
        .await
        .unwrap();
    s.handle
        .deliver_host_message(HostMessage::Action(HostAction::Restart))
        .await
        .unwrap();
    s.handle.shutdown().await.unwrap();

    let status = s.handle.status().await.unwrap();
    assert_eq!(status.termination, TerminationState::Ended);
    assert_eq!(status.end_reason, Some(EndReason::UserEnded));
    assert_eq!(status.connection, ConnectionState::Closed);
    assert!(!status.timer.running);
    assert_eq!(s.host.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_standalone_expiry_without_prompt_ends_time_expired() {
    let s = launch_default(SessionConfig {
        prompt: PromptConfig::disabled(),
        ..timed(3)
    });
    let (emulator, log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    assert_eq!(ended_within(&s.handle, 10).await, EndReason::TimeExpired);
    assert_eq!(log.pauses(), 1);
    assert_eq!(s.host.calls(), vec![HostCall::Navigate("/selectGame".into())]);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_without_prompt_ends_user_ended() {
    for event in [NavigationEvent::Escape, NavigationEvent::Back, NavigationEvent::Unload] {
        let s = launch_default(SessionConfig {
            prompt: PromptConfig::disabled(),
            ..SessionConfig::default()
        });
        let (emulator, _log) = FakeEmulator::new(b"state");
        s.handle.game_started(emulator).await.unwrap();

        s.handle.navigation(event).await.unwrap();
        assert_eq!(ended_within(&s.handle, 5).await, EndReason::UserEnded, "{event:?}");
        assert!(s.view.prompts.lock().unwrap().is_empty(), "{event:?}");
        assert_eq!(s.backend.write_count(), 0, "{event:?}");
        assert_eq!(s.host.calls(), vec![HostCall::Navigate("/selectGame".into())]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_ends_closed() {
    let s = launch_default(SessionConfig::default());
    let host = s.host.clone();
    let task = s.task;
    drop(s.handle);

    let reason = timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
    assert_eq!(reason, EndReason::Closed);
    assert_eq!(host.calls(), vec![HostCall::Navigate("/selectGame".into())]);
}

#[tokio::test(start_paused = true)]
async fn test_game_started_after_end_ignored() {
    let s = launch_default(SessionConfig::default());
    s.handle.shutdown().await.unwrap();
    assert_eq!(ended_within(&s.handle, 5).await, EndReason::Closed);

    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();
    assert!(!s.handle.status().await.unwrap().loaded);
}

// =========================================================================
// Connection health
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_connection_failures_end_session_with_error() {
    let s = launch(
        SessionConfig::default(),
        FakeConnector::refusing(),
        MemoryBackend::default(),
        Some("jwt"),
    );
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    assert_eq!(ended_within(&s.handle, 60).await, EndReason::ConnectionError);
    assert_eq!(s.host.calls(), vec![HostCall::Navigate("/selectGame".into())]);
    let status = s.handle.status().await.unwrap();
    assert_eq!(status.connection, ConnectionState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_late_token_starts_health_socket() {
    let s = launch(
        SessionConfig::default(),
        FakeConnector::healthy(),
        MemoryBackend::default(),
        None,
    );
    assert_eq!(s.handle.status().await.unwrap().connection, ConnectionState::Idle);

    assert!(s.handle.deliver_host_json(r#"{"jwt":"late"}"#).await.unwrap());
    sleep(Duration::from_millis(50)).await;

    assert_eq!(s.urls.lock().unwrap().clone(), vec!["ws://localhost:8080/ws?token=late".to_string()]);
    assert_eq!(s.handle.status().await.unwrap().connection, ConnectionState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_refreshed_token_reconnects_dropped_socket() {
    let connector = FakeConnector::new(vec![Dial::Accept(vec![Step::Close])], Dial::Accept(Vec::new()));
    let s = launch(SessionConfig::default(), connector, MemoryBackend::default(), Some("first"));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(s.handle.status().await.unwrap().connection, ConnectionState::Reconnecting);

    s.handle.deliver_token("second").await.unwrap();
    sleep(Duration::from_millis(50)).await;

    let urls = s.urls.lock().unwrap().clone();
    assert_eq!(urls.len(), 2);
    assert!(urls[1].ends_with("token=second"), "{urls:?}");
    assert_eq!(s.handle.status().await.unwrap().connection, ConnectionState::Open);
}

// =========================================================================
// Saving and restoring
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_game_started_applies_saved_state() {
    let backend = MemoryBackend {
        stored: Some(b"saved".to_vec()),
        ..MemoryBackend::default()
    };
    let s = launch(SessionConfig::default(), FakeConnector::healthy(), backend, Some("jwt"));
    let (emulator, log) = FakeEmulator::new(b"fresh");
    s.handle.game_started(emulator).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert!(s.handle.status().await.unwrap().loaded);
    assert_eq!(log.loaded.lock().unwrap().clone(), vec![b"saved".to_vec()]);
}

#[tokio::test(start_paused = true)]
async fn test_game_started_twice_keeps_first_emulator() {
    let s = launch_default(SessionConfig::default());
    let (first, first_log) = FakeEmulator::new(b"one");
    let (second, second_log) = FakeEmulator::new(b"two");
    s.handle.game_started(first).await.unwrap();
    s.handle.game_started(second).await.unwrap();

    s.handle.navigation(NavigationEvent::Escape).await.unwrap();
    s.handle.status().await.unwrap();
    assert_eq!(first_log.pauses(), 1);
    assert_eq!(second_log.pauses(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_save_now_before_game_start_skipped() {
    let s = launch_default(SessionConfig::default());
    let outcome = s.handle.save_now().await.unwrap();
    assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::EmulatorUnbound));
}

#[tokio::test(start_paused = true)]
async fn test_save_now_after_end_skipped() {
    let s = launch_default(SessionConfig::default());
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();
    s.handle.shutdown().await.unwrap();
    assert_eq!(ended_within(&s.handle, 5).await, EndReason::Closed);

    let outcome = s.handle.save_now().await.unwrap();
    assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::SessionEnded));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(s.backend.write_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_save_now_writes_current_state() {
    let s = launch_default(SessionConfig::default());
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    let outcome = s.handle.save_now().await.unwrap();
    assert_eq!(outcome, SaveOutcome::Saved { bytes: 5 });
    assert_eq!(s.backend.write_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_auto_save_runs_while_active() {
    let s = launch_default(SessionConfig {
        save: retrokiosk::SaveConfig::auto(Duration::from_secs(10)),
        ..SessionConfig::default()
    });
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    sleep(Duration::from_millis(25_500)).await;
    assert_eq!(s.backend.write_count(), 2);

    // No auto-saves while the prompt is up.
    s.handle.navigation(NavigationEvent::Escape).await.unwrap();
    sleep(Duration::from_secs(9)).await;
    assert_eq!(s.backend.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_end_cancels_running_auto_save() {
    let backend = MemoryBackend {
        hang_writes: true,
        ..MemoryBackend::default()
    };
    let config = SessionConfig {
        save: retrokiosk::SaveConfig::auto(Duration::from_secs(10)),
        ..SessionConfig::default()
    };
    let s = launch(config, FakeConnector::healthy(), backend, Some("jwt"));
    let (emulator, _log) = FakeEmulator::new(b"state");
    s.handle.game_started(emulator).await.unwrap();

    sleep(Duration::from_millis(10_500)).await;
    assert_eq!(s.backend.log.active_writes(), 1);

    s.handle.shutdown().await.unwrap();
    assert_eq!(ended_within(&s.handle, 5).await, EndReason::Closed);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(s.backend.log.active_writes(), 0);
    assert_eq!(s.backend.write_count(), 0);
}
