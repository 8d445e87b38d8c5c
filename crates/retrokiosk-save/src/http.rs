//! REST implementation of [`SaveBackend`].
//!
//! ```text
//! POST {api}/api/v1/game-state/save?gameID=<id>   Bearer <token>, JSON SaveBody
//! GET  {api}/api/v1/game-state/load?gameID=<id>   optional Bearer, raw bytes | 404
//! GET  {assets}/saves/<key>.state                 raw bytes, fallback only
//! ```

use std::time::Duration;

use reqwest::StatusCode;
use retrokiosk_protocol::SaveBody;
use retrokiosk_session::GameId;
use url::Url;

use crate::{LoadResponse, SaveBackend, SaveError};

const SAVE_PATH: &str = "api/v1/game-state/save";
const LOAD_PATH: &str = "api/v1/game-state/load";
const FALLBACK_DIR: &str = "saves";

/// Per-request limit applied by [`HttpSaveBackend::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn client_with_timeout(timeout: Duration) -> Result<reqwest::Client, SaveError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Save backend speaking the game-state REST API.
#[derive(Debug, Clone)]
pub struct HttpSaveBackend {
    client: reqwest::Client,
    api_base: Url,
    asset_base: Url,
}

impl HttpSaveBackend {
    /// Backend whose API and fallback assets share one origin.
    ///
    /// Requests give up after [`DEFAULT_REQUEST_TIMEOUT`].
    ///
    /// # Errors
    /// Returns [`SaveError::InvalidUrl`] if `base` does not parse.
    pub fn new(base: &str) -> Result<Self, SaveError> {
        let api_base = directory_url(base)?;
        Ok(Self {
            client: client_with_timeout(DEFAULT_REQUEST_TIMEOUT)?,
            asset_base: api_base.clone(),
            api_base,
        })
    }

    /// Serves fallback `.state` files from a different origin.
    ///
    /// # Errors
    /// Returns [`SaveError::InvalidUrl`] if `base` does not parse.
    pub fn with_asset_base(mut self, base: &str) -> Result<Self, SaveError> {
        self.asset_base = directory_url(base)?;
        Ok(self)
    }

    /// Rebuilds the client with a different per-request timeout.
    ///
    /// # Errors
    /// Returns [`SaveError::Http`] if the client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, SaveError> {
        self.client = client_with_timeout(timeout)?;
        Ok(self)
    }

    /// Replaces the HTTP client (timeouts, proxies, test clients).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn game_url(&self, path: &str, game_id: &GameId) -> Result<Url, SaveError> {
        let mut url = self.api_base.join(path)?;
        url.query_pairs_mut().append_pair("gameID", game_id.as_str());
        Ok(url)
    }

    pub(crate) fn fallback_url(&self, key: &str) -> Result<Url, SaveError> {
        Ok(self.asset_base.join(&format!("{FALLBACK_DIR}/{key}.state"))?)
    }
}

/// Parses `base` and makes sure its path ends in `/` so `join` appends
/// instead of replacing the last segment.
fn directory_url(base: &str) -> Result<Url, SaveError> {
    let mut url = Url::parse(base)?;
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

fn status_error(status: StatusCode, url: &Url) -> SaveError {
    SaveError::Status {
        status: status.as_u16(),
        url: url.path().to_owned(),
    }
}

impl SaveBackend for HttpSaveBackend {
    async fn write(&self, game_id: &GameId, token: &str, body: &SaveBody) -> Result<(), SaveError> {
        let url = self.game_url(SAVE_PATH, game_id)?;
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, &url));
        }
        Ok(())
    }

    async fn read(&self, game_id: &GameId, token: Option<&str>) -> Result<LoadResponse, SaveError> {
        let url = self.game_url(LOAD_PATH, game_id)?;
        let mut request = self.client.get(url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(LoadResponse::NotFound),
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                Ok(LoadResponse::Found(bytes.to_vec()))
            }
            status => Err(status_error(status, &url)),
        }
    }

    async fn fetch_fallback(&self, key: &str) -> Result<Option<Vec<u8>>, SaveError> {
        let url = self.fallback_url(key)?;
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "no fallback state");
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        Ok((!bytes.is_empty()).then(|| bytes.to_vec()))
    }
}
