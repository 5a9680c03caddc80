//! Auth state store: who is logged in right now, for the view layer.
//!
//! Flow Overview: `refresh` asks the provider for user, tokens and attributes
//! and either publishes a new [`Session`] (and writes the cookie projection)
//! or collapses to "no session". `login`, `confirm_sign_in` and the reset
//! operations only forward to the provider; callers `refresh` afterwards.
//! `logout` clears local state even when the provider call fails.
//!
//! Overlapping operations are sequenced: every refresh and logout takes a
//! ticket when it starts, and a refresh whose ticket is older than the last
//! applied one is discarded on completion. A slow refresh can therefore never
//! resurrect a session that a later logout cleared.
//!
//! Every applied refresh or logout leaves its cookie batch (writes or
//! removals) in the store until the caller takes it with
//! [`AuthStore::take_set_cookies`] and forwards it as `Set-Cookie` headers.

use axum::http::HeaderValue;
use axum_extra::extract::cookie::Cookie;
use parking_lot::Mutex;
use secrecy::SecretString;
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::cookies::{set_cookie_header, CookieBridge};
use super::provider::{IdentityError, IdentityProvider};
use super::types::{
    Credentials, ResetPasswordStep, Session, SessionTokens, SignInOutcome, DEFAULT_ADMIN_GROUP,
};
use super::validation::{
    validate_credentials, validate_new_password, validate_username, ValidationError,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    admin_group: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            admin_group: DEFAULT_ADMIN_GROUP.to_string(),
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn with_admin_group(mut self, group: impl Into<String>) -> Self {
        self.admin_group = group.into();
        self
    }

    #[must_use]
    pub fn admin_group(&self) -> &str {
        &self.admin_group
    }
}

/// Observable store state.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub loading: bool,
}

pub struct AuthStore<P> {
    provider: P,
    cookies: Arc<CookieBridge>,
    config: StoreConfig,
    state: watch::Sender<AuthSnapshot>,
    issued: AtomicU64,
    applied: Mutex<u64>,
    set_cookies: Mutex<Vec<Cookie<'static>>>,
}

impl<P: IdentityProvider> AuthStore<P> {
    /// Build an unmounted store. It reports `loading` until the first refresh.
    pub fn new(provider: P, cookies: Arc<CookieBridge>, config: StoreConfig) -> Self {
        Self {
            provider,
            cookies,
            config,
            state: watch::Sender::new(AuthSnapshot {
                session: None,
                loading: true,
            }),
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
            set_cookies: Mutex::new(Vec::new()),
        }
    }

    /// Build the store and restore any live provider session.
    pub async fn mount(provider: P, cookies: Arc<CookieBridge>, config: StoreConfig) -> Self {
        let store = Self::new(provider, cookies, config);
        store.refresh().await;
        store
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieBridge {
        &self.cookies
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.state.borrow().clone()
    }

    /// Receive every state change, typically to re-render.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn session(&self) -> Option<Session> {
        self.state.borrow().session.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().session.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Take the cookies emitted by the last applied refresh or logout.
    ///
    /// Each batch replaces the previous one, so only the newest outcome is
    /// ever forwarded. Empty once taken.
    #[must_use]
    pub fn take_set_cookies(&self) -> Vec<Cookie<'static>> {
        std::mem::take(&mut *self.set_cookies.lock())
    }

    /// [`Self::take_set_cookies`] rendered as `Set-Cookie` header values.
    #[must_use]
    pub fn take_set_cookie_headers(&self) -> Vec<HeaderValue> {
        self.take_set_cookies()
            .iter()
            .filter_map(set_cookie_header)
            .collect()
    }

    /// Reload the session from the provider. Returns whether a user is logged in.
    ///
    /// Provider failures never escape: they collapse to "no session" and clear
    /// the cookie projection.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let ticket = self.next_ticket();
        self.state.send_modify(|state| state.loading = true);

        let loaded = self.load_session().await;

        {
            let mut applied = self.applied.lock();
            if ticket < *applied {
                debug!(ticket, applied = *applied, "discarding stale session refresh");
            } else {
                *applied = ticket;
                let emitted = match loaded {
                    Ok((session, tokens)) => {
                        let written = self.cookies.write(&tokens, &session.groups);
                        debug!(user_id = %session.user_id, "session refreshed");
                        self.state
                            .send_modify(|state| state.session = Some(session));
                        written
                    }
                    Err(err) => {
                        match err {
                            IdentityError::NotAuthenticated => debug!("no active session"),
                            other => warn!("session refresh failed: {other}"),
                        }
                        let removals = self.cookies.clear();
                        self.state.send_modify(|state| state.session = None);
                        removals
                    }
                };
                *self.set_cookies.lock() = emitted;
            }
        }

        self.state.send_modify(|state| state.loading = false);
        self.is_authenticated()
    }

    /// Forward credentials to the provider. The session is left untouched.
    ///
    /// # Errors
    /// Validation failures before any provider call, or the provider's error.
    #[instrument(skip_all, fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<SignInOutcome, AuthError> {
        validate_credentials(credentials)?;
        let outcome = self
            .provider
            .sign_in(credentials)
            .await
            .inspect_err(|err| debug!("sign-in rejected: {err}"))?;
        debug!(
            signed_in = outcome.is_signed_in,
            next_step = ?outcome.next_step,
            "sign-in completed"
        );
        Ok(outcome)
    }

    /// Answer a new-password challenge returned by `login`.
    ///
    /// # Errors
    /// Validation failures before any provider call, or the provider's error.
    #[instrument(skip_all)]
    pub async fn confirm_sign_in(
        &self,
        new_password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<SignInOutcome, AuthError> {
        validate_new_password(new_password, confirmation)?;
        Ok(self.provider.confirm_sign_in(new_password).await?)
    }

    /// Sign out at the provider, then clear cookies and session.
    ///
    /// Local state is cleared even when the provider call fails; that failure
    /// is still returned so the caller can report it.
    ///
    /// # Errors
    /// The provider's sign-out error, after local state has been cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        let ticket = self.next_ticket();
        {
            let mut applied = self.applied.lock();
            *applied = (*applied).max(ticket);
        }

        let result = self.provider.sign_out().await;
        if let Err(err) = &result {
            warn!("provider sign-out failed, clearing local session anyway: {err}");
        }

        {
            // Under `applied` so a refresh finishing now cannot interleave.
            let _applied = self.applied.lock();
            *self.set_cookies.lock() = self.cookies.clear();
            self.state.send_modify(|state| state.session = None);
        }
        info!("session cleared");

        result.map_err(AuthError::from)
    }

    /// Start a password reset for `username`.
    ///
    /// # Errors
    /// Validation failures before any provider call, or the provider's error.
    #[instrument(skip(self))]
    pub async fn reset_password(&self, username: &str) -> Result<ResetPasswordStep, AuthError> {
        validate_username(username)?;
        Ok(self.provider.reset_password(username.trim()).await?)
    }

    /// Finish a password reset with the delivered code.
    ///
    /// # Errors
    /// Validation failures before any provider call, or the provider's error.
    #[instrument(skip(self, new_password, confirmation))]
    pub async fn confirm_reset_password(
        &self,
        username: &str,
        code: &str,
        new_password: &SecretString,
        confirmation: &SecretString,
    ) -> Result<(), AuthError> {
        validate_username(username)?;
        if code.trim().is_empty() {
            return Err(ValidationError::Missing("Confirmation code").into());
        }
        validate_new_password(new_password, confirmation)?;
        self.provider
            .confirm_reset_password(username.trim(), code.trim(), new_password)
            .await?;
        Ok(())
    }

    fn next_ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn load_session(&self) -> Result<(Session, SessionTokens), IdentityError> {
        let user = self.provider.current_user().await?;
        let provider_session = self.provider.fetch_session().await?;
        let tokens = provider_session
            .tokens
            .clone()
            .ok_or(IdentityError::NotAuthenticated)?;

        let attributes = match self.provider.fetch_user_attributes().await {
            Ok(attributes) => attributes,
            Err(IdentityError::NotAuthenticated) => return Err(IdentityError::NotAuthenticated),
            Err(err) => {
                warn!("failed to fetch user attributes: {err}");
                HashMap::new()
            }
        };
        let email = attributes
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let groups = admin_first(provider_session.groups(), &self.config.admin_group);

        Ok((
            Session {
                user_id: user.user_id,
                email,
                groups,
                attributes,
            },
            tokens,
        ))
    }
}

/// Move the administrative group to the front so the primary group reflects
/// admin membership regardless of claim order. Other groups keep their order.
fn admin_first(mut groups: Vec<String>, admin_group: &str) -> Vec<String> {
    if let Some(index) = groups.iter().position(|group| group == admin_group) {
        let admin = groups.remove(index);
        groups.insert(0, admin);
    }
    groups
}
