//! Session identity and emulator binding for retrokiosk.
//!
//! This crate answers two questions for the layers above:
//!
//! 1. **Who is playing what** — [`SessionIdentity`]: the resolved
//!    [`GameId`], the display name, and the auth token, which may show up
//!    late through [`TokenSlot`].
//! 2. **What are we driving** — the [`Emulator`] trait the external engine
//!    is adapted to, and [`EmulatorBinding`], the shared slot the engine
//!    lands in once the game has started.
//!
//! # How it fits in the stack
//!
//! ```text
//! Controller (above)  ← pauses/resumes, terminates
//!     ↕
//! Save coordinator    ← snapshots/restores through the binding
//!     ↕
//! Session layer (this crate)  ← identity, token, emulator slot
//! ```

mod emulator;
mod error;
mod identity;

pub use emulator::{Emulator, EmulatorBinding};
pub use error::SessionError;
pub use identity::{GameId, SessionIdentity, TokenSlot, TokenWaitConfig, sanitize_display_name};
