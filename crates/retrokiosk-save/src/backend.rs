//! The storage seam between the coordinator and wherever saves live.

use std::future::Future;

use retrokiosk_protocol::SaveBody;
use retrokiosk_session::GameId;

use crate::SaveError;

/// Result of asking the backend for a saved state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadResponse {
    /// Raw state bytes.
    Found(Vec<u8>),
    /// The backend has nothing for this game (HTTP 404).
    NotFound,
}

/// Where save state is written to and read from.
///
/// The coordinator only decides *whether* to save or load; the backend
/// decides *how*. [`HttpSaveBackend`](crate::HttpSaveBackend) talks to the
/// REST API; tests plug in an in-memory one.
pub trait SaveBackend: Send + Sync + 'static {
    /// Persists `body` under `game_id`, authenticated with `token`.
    ///
    /// # Errors
    /// Any transport failure or non-success status.
    fn write(
        &self,
        game_id: &GameId,
        token: &str,
        body: &SaveBody,
    ) -> impl Future<Output = Result<(), SaveError>> + Send;

    /// Reads the state saved under `game_id`. The token is optional.
    ///
    /// # Errors
    /// Any transport failure or a status other than success or not-found.
    fn read(
        &self,
        game_id: &GameId,
        token: Option<&str>,
    ) -> impl Future<Output = Result<LoadResponse, SaveError>> + Send;

    /// Fetches the bundled fallback state stored under `key` (the
    /// sanitized display name). `Ok(None)` when there is none.
    ///
    /// # Errors
    /// Transport failures. The coordinator treats these as "no state".
    fn fetch_fallback(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, SaveError>> + Send;
}
