//! # retrokiosk
//!
//! Session controller for kiosk-style emulated game players.
//!
//! retrokiosk wraps an external emulation engine and handles everything
//! around gameplay: a soft play-time limit, a health-check WebSocket with
//! reconnects, saving and restoring emulator state against a backend, and
//! a confirmation prompt that decides how a session ends.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use retrokiosk::prelude::*;
//! # use retrokiosk::SessionError;
//! # struct MyEmulator;
//! # impl Emulator for MyEmulator {
//! #     fn pause(&mut self) {}
//! #     fn play(&mut self) {}
//! #     fn save_state(&mut self) -> Result<Vec<u8>, SessionError> { Ok(vec![]) }
//! #     fn load_state(&mut self, _: &[u8]) -> Result<(), SessionError> { Ok(()) }
//! # }
//!
//! # async fn run() -> Result<(), KioskError> {
//! let identity = SessionIdentity::resolve(None, "/play", "Tetris", TokenSlot::with_token("jwt"));
//! let (handle, _task) = SessionController::builder()
//!     .identity(identity)
//!     .build(WebSocketConnector, HttpSaveBackend::new("http://localhost:8080")?)
//!     .spawn();
//!
//! handle.game_started(MyEmulator).await?;
//! let reason = handle.ended().await;
//! println!("session over: {reason}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! SessionController   ← termination state machine, one actor task
//!   ├─ ConnectionMonitor  (retrokiosk-transport, retrokiosk-protocol)
//!   ├─ SaveCoordinator    (retrokiosk-save)
//!   ├─ CountdownTimer     (retrokiosk-tick)
//!   └─ SessionIdentity, Emulator (retrokiosk-session)
//! ```

mod config;
mod controller;
mod error;
mod health;
mod host;
mod termination;

pub use config::{DEFAULT_EXIT_PATH, HostContext, PromptConfig, ServerOrigins, SessionConfig};
pub use controller::{
    NavigationEvent, SessionController, SessionControllerBuilder, SessionHandle, SessionStatus,
};
pub use error::KioskError;
pub use health::{ConnectionLoss, ConnectionMonitor, ConnectionState, HealthConfig};
pub use host::{HostBridge, LogHost, NullView, SessionView};
pub use termination::{EndReason, PromptChoice, PromptTrigger, PromptView, TerminationState};

pub use retrokiosk_protocol::{HostAction, HostMessage, SessionMessage};
pub use retrokiosk_save::{
    HttpSaveBackend, LoadResponse, SaveBackend, SaveConfig, SaveError, SaveOutcome, SkipReason,
};
pub use retrokiosk_session::{
    Emulator, GameId, SessionError, SessionIdentity, TokenSlot, TokenWaitConfig,
};
pub use retrokiosk_tick::{TimerConfig, TimerDisplay, TimerState};
pub use retrokiosk_transport::{Connection, ConnectionId, Connector, TransportError};
#[cfg(feature = "websocket")]
pub use retrokiosk_transport::WebSocketConnector;

/// The types most embedders need.
pub mod prelude {
    pub use crate::{
        Emulator, EndReason, HostBridge, HostContext, HttpSaveBackend, KioskError,
        NavigationEvent, PromptChoice, SessionConfig, SessionController, SessionHandle,
        SessionIdentity, SessionView, TokenSlot,
    };
    #[cfg(feature = "websocket")]
    pub use crate::WebSocketConnector;
}
