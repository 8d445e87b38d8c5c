//! Save-state coordination for retrokiosk.
//!
//! [`SaveCoordinator`] owns the rules: auto-save gating, the single
//! in-flight save, skipping empty buffers, and the not-found fallback on
//! load. [`SaveBackend`] owns the storage; [`HttpSaveBackend`] is the
//! REST implementation.
//!
//! ```text
//! Emulator ──snapshot──▶ SaveCoordinator ──SaveBody──▶ SaveBackend
//!          ◀──restore───                 ◀──bytes────
//! ```

mod backend;
mod config;
mod coordinator;
mod error;
mod http;

pub use backend::{LoadResponse, SaveBackend};
pub use config::{DEFAULT_AUTO_SAVE_INTERVAL, MIN_AUTO_SAVE_INTERVAL, SaveConfig};
pub use coordinator::{SaveCoordinator, SaveOutcome, SkipReason};
pub use error::SaveError;
pub use http::{DEFAULT_REQUEST_TIMEOUT, HttpSaveBackend};
