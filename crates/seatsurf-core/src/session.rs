//! Session lifecycle
//!
//! One `SessionManager` exists per process and is shared by every tool
//! invocation. It holds the bearer tokens in memory only and renews them
//! silently shortly before they lapse.
//!
//! State machine:
//!
//! ```text
//!                 login ok
//! Unauthenticated ---------> Active --(now > expires_at - 60s)--> Expired
//!       ^                      ^                                    |
//!       |                      |         refresh ok                 | ensure_authenticated
//!       |                      +------------- Renewing <------------+
//!       |                                        |
//!       +---------- refresh failed / logout -----+
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::credentials::CredentialSet;
use crate::error::{Error, Result};
use crate::gateway::{Gateway, Method, Response};

/// How long a freshly issued access token is trusted. Sits inside the
/// server's real 15 minute lifetime.
pub const TOKEN_LIFETIME_SECS: i64 = 14 * 60;

/// Tokens closer than this to `expires_at` are renewed before use
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    Active,
    Renewing,
    Expired,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Active => "active",
            Self::Renewing => "renewing",
            Self::Expired => "expired",
        }
    }
}

/// Token pair as returned by /auth/login and /auth/refresh
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

#[derive(Clone)]
struct Tokens {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

impl Tokens {
    fn issue(pair: TokenPair, now: DateTime<Utc>) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_at: now + Duration::seconds(TOKEN_LIFETIME_SECS),
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Default)]
struct State {
    gateway: Option<Gateway>,
    tokens: Option<Tokens>,
    renewing: bool,
}

/// Owns the authentication state and the gateway it authenticates
#[derive(Default)]
pub struct SessionManager {
    state: RwLock<State>,
    /// Single-flight guard: at most one refresh in flight
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log in with a complete credential set.
    ///
    /// Any previous session is discarded first, so a failed login always
    /// leaves the manager unauthenticated.
    pub async fn login(&self, credentials: &CredentialSet) -> Result<()> {
        credentials.validate()?;
        let gateway = Gateway::new(&credentials.base_url)?;

        {
            let mut state = self.state.write().await;
            state.tokens = None;
            state.renewing = false;
            state.gateway = Some(gateway.clone());
        }

        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
            "organizationId": credentials.organization_id,
        });
        let response = gateway
            .request(Method::POST, "/auth/login", Some(&body), None)
            .await?;

        if !response.is_success() {
            warn!("Login rejected with status {}", response.status);
            return Err(Error::Authentication {
                status: response.status.as_u16(),
                body: response.body,
            });
        }

        let pair: TokenPair = response.json()?;
        self.state.write().await.tokens = Some(Tokens::issue(pair, Utc::now()));

        info!("Logged in to {} as {}", gateway.base_url(), credentials.email);
        Ok(())
    }

    /// Drop the session. Local only; nothing is sent to the server.
    pub async fn logout(&self) {
        let mut state = self.state.write().await;
        if state.tokens.take().is_some() {
            info!("Logged out");
        }
        state.renewing = false;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.tokens.is_some()
    }

    pub async fn status(&self) -> SessionStatus {
        let state = self.state.read().await;
        match &state.tokens {
            None => SessionStatus::Unauthenticated,
            Some(_) if state.renewing => SessionStatus::Renewing,
            Some(tokens) if Utc::now() < tokens.expires_at => SessionStatus::Active,
            Some(_) => SessionStatus::Expired,
        }
    }

    /// Base URL of the current (or last attempted) login
    pub async fn base_url(&self) -> Option<String> {
        self.state
            .read()
            .await
            .gateway
            .as_ref()
            .map(|g| g.base_url().to_string())
    }

    /// Gate for every authenticated operation.
    ///
    /// Returns immediately while the token is comfortably valid. Within the
    /// refresh margin it performs exactly one silent refresh; if that fails
    /// the session is torn down and the caller must log in again.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        let observed = {
            let state = self.state.read().await;
            match &state.tokens {
                Some(tokens) => tokens.clone(),
                None => return Err(Error::NotAuthenticated),
            }
        };

        if !observed.needs_refresh(Utc::now()) {
            return Ok(());
        }

        self.refresh(&observed.access_token).await
    }

    async fn refresh(&self, stale_access_token: &str) -> Result<()> {
        let _flight = self.refresh_gate.lock().await;

        let (gateway, refresh_token) = {
            let mut state = self.state.write().await;
            let tokens = match &state.tokens {
                Some(tokens) => tokens.clone(),
                None => return Err(Error::NotAuthenticated),
            };

            // Someone else renewed while we waited for the gate
            if tokens.access_token != stale_access_token || !tokens.needs_refresh(Utc::now()) {
                debug!("Token already renewed by a concurrent caller");
                return Ok(());
            }

            let usable = state
                .gateway
                .clone()
                .filter(|_| !tokens.refresh_token.is_empty());
            let gateway = match usable {
                Some(gateway) => gateway,
                None => {
                    state.tokens = None;
                    return Err(Error::SessionExpired);
                }
            };

            state.renewing = true;
            (gateway, tokens.refresh_token)
        };

        debug!("Refreshing access token");
        let outcome = request_refresh(&gateway, &refresh_token).await;

        let mut state = self.state.write().await;
        state.renewing = false;

        // A logout or a new login happened while the refresh was in flight
        let still_current = state
            .tokens
            .as_ref()
            .is_some_and(|t| t.refresh_token == refresh_token);
        if !still_current {
            return if state.tokens.is_some() {
                Ok(())
            } else {
                Err(Error::NotAuthenticated)
            };
        }

        match outcome {
            Ok(pair) => {
                state.tokens = Some(Tokens::issue(pair, Utc::now()));
                info!("Session renewed");
                Ok(())
            }
            Err(e) => {
                warn!("Token refresh failed, clearing session: {}", e);
                state.tokens = None;
                Err(Error::SessionExpired)
            }
        }
    }

    /// Send an authenticated request after passing the authentication gate
    pub async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Response> {
        self.ensure_authenticated().await?;

        let (gateway, token) = {
            let state = self.state.read().await;
            let gateway = state.gateway.clone().ok_or(Error::NotAuthenticated)?;
            let token = state.tokens.as_ref().map(|t| t.access_token.clone());
            (gateway, token)
        };

        gateway.request(method, path, body, token.as_deref()).await
    }

    #[cfg(test)]
    pub(crate) async fn set_expires_at(&self, at: DateTime<Utc>) {
        if let Some(tokens) = self.state.write().await.tokens.as_mut() {
            tokens.expires_at = at;
        }
    }
}

async fn request_refresh(gateway: &Gateway, refresh_token: &str) -> Result<TokenPair> {
    let body = json!({ "refreshToken": refresh_token });
    let response = gateway
        .request(Method::POST, "/auth/refresh", Some(&body), None)
        .await?
        .error_for_status()?;
    response.json()
}
