//! Authenticating HTTP client for the Victor Smart-Kill REST API.
//!
//! The client exchanges a username/password pair for a token at `api-token-auth/`,
//! caches it in memory, and sends it as `Authorization: Token <token>` on every call.
//! A `401` on the first attempt triggers one token refresh and one retry.

use std::fmt;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client as HttpClient, Method, Response, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AuthError, ConfigError, Error, HttpError, MappingError};

pub const DEFAULT_BASE_URL: &str = "https://www.victorsmartkill.com/";
pub const TOKEN_PATH: &str = "api-token-auth/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Account credentials. Both parts must be non-empty.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, Error> {
        let username = username.into();
        let password = password.into();
        if username.is_empty() {
            return Err(ConfigError::new("User name is required.").into());
        }
        if password.is_empty() {
            return Err(ConfigError::new("Password is required.").into());
        }
        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Client settings; applied to every request including the token fetch.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("smartkill/{}", crate::VERSION),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    RetryAfterRefresh,
}

/// Smart-Kill API client.
///
/// The cached token is shared by all calls on the instance. Fetches run under a
/// lock, so concurrent calls that find no token trigger a single fetch.
pub struct Client {
    credentials: Credentials,
    base_url: Url,
    http: HttpClient,
    token: Mutex<Option<String>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("credentials", &self.credentials)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client for the production service with default settings.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self, Error> {
        Self::with_config(Credentials::new(username, password)?, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Result<Self, Error> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|e| ConfigError::new(format!("Invalid user agent: {}", e)))?;
        headers.insert(USER_AGENT, agent);

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            base_url,
            http,
            token: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    /// Whether a token is currently cached.
    pub async fn has_token(&self) -> bool {
        self.token.lock().await.is_some()
    }

    /// The cached token, if any.
    pub async fn token(&self) -> Option<String> {
        self.token.lock().await.clone()
    }

    /// Drop any cached token and fetch a new one.
    pub async fn fetch_token(&self) -> Result<(), Error> {
        let mut slot = self.token.lock().await;
        self.fetch_token_into(&mut slot).await.map(|_| ())
    }

    /// Send an authenticated request and return the raw response.
    ///
    /// A `401` on the first attempt refreshes the token and retries once; the
    /// response of the retry is returned whatever its status. Other statuses are
    /// returned as-is.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, Error> {
        let url = self.resolve(path)?;
        let mut token = self.current_token().await?;
        let mut attempt = Attempt::First;

        loop {
            debug!(%method, %url, ?attempt, "Sending request");
            let mut req = self
                .http
                .request(method.clone(), url.clone())
                .header(AUTHORIZATION, format!("Token {}", token));
            if let Some(b) = body {
                req = req.json(b);
            }
            let response = req.send().await?;

            if response.status() != StatusCode::UNAUTHORIZED {
                return Ok(response);
            }
            match attempt {
                Attempt::First => {
                    info!(path, "Unauthorized response; fetching token and retrying");
                    token = self.refresh_token(&token).await?;
                    attempt = Attempt::RetryAfterRefresh;
                }
                Attempt::RetryAfterRefresh => {
                    warn!(path, "Still unauthorized after token refresh");
                    return Ok(response);
                }
            }
        }
    }

    pub async fn get(&self, path: &str) -> Result<Response, Error> {
        self.request(Method::GET, path, None).await
    }

    /// GET a path and parse the JSON body; non-success statuses become [`HttpError`].
    pub async fn get_json(&self, path: &str) -> Result<Value, Error> {
        let response = self.get(path).await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let data = serde_json::from_str(&body).ok();
            return Err(HttpError::new(status.as_u16(), path, data).into());
        }
        serde_json::from_str(&body)
            .map_err(|e| MappingError::new(format!("Invalid JSON from {}: {}", path, e)).into())
    }

    fn resolve(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    async fn current_token(&self) -> Result<String, Error> {
        let mut slot = self.token.lock().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }
        info!("Token is missing; fetching token");
        self.fetch_token_into(&mut slot).await
    }

    /// Replace `stale` with a fresh token unless a concurrent call already did.
    async fn refresh_token(&self, stale: &str) -> Result<String, Error> {
        let mut slot = self.token.lock().await;
        match slot.as_deref() {
            Some(current) if current != stale => {
                debug!("Token already refreshed by a concurrent request");
                Ok(current.to_string())
            }
            _ => self.fetch_token_into(&mut slot).await,
        }
    }

    /// Clears `slot`, POSTs the credentials, and stores the returned token.
    async fn fetch_token_into(&self, slot: &mut Option<String>) -> Result<String, Error> {
        *slot = None;

        let url = self.resolve(TOKEN_PATH)?;
        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password,
        });
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;
        let data: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(HttpError::new(status.as_u16(), TOKEN_PATH, Some(data)).into());
        }

        match data.get("token").and_then(Value::as_str).filter(|t| !t.is_empty()) {
            Some(token) => {
                *slot = Some(token.to_string());
                info!("Fetched token");
                Ok(token.to_string())
            }
            None => Err(AuthError::new("Unexpected response from token endpoint").into()),
        }
    }
}

fn parse_base_url(base: &str) -> Result<Url, Error> {
    let base = base.trim();
    if base.is_empty() {
        return Err(ConfigError::new("Base URL is required.").into());
    }
    // Url::join drops the last segment unless the base ends with a slash.
    let normalized = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    };
    Url::parse(&normalized)
        .map_err(|e| ConfigError::new(format!("Invalid base URL {}: {}", base, e)).into())
}
