//! In-process identity provider for local development and tests.
//!
//! Behaves like the managed provider from the store's point of view: sign-in
//! may return a new-password challenge, sessions carry a group claim, and
//! failures can be injected to exercise the "not logged in" paths.

use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::provider::{IdentityError, IdentityProvider};
use super::types::{
    Credentials, ProviderSession, ProviderUser, ResetPasswordStep, SessionTokens, SignInOutcome,
    SignInStep, GROUPS_CLAIM,
};

#[derive(Clone, Debug)]
pub struct MemoryUser {
    pub user_id: String,
    pub username: String,
    password: SecretString,
    pub groups: Vec<String>,
    pub attributes: HashMap<String, Value>,
    must_change_password: bool,
}

impl MemoryUser {
    /// A user whose e-mail doubles as username.
    #[must_use]
    pub fn new(user_id: &str, email: &str, password: &str) -> Self {
        let mut attributes = HashMap::new();
        attributes.insert("email".to_string(), Value::String(email.to_string()));
        Self {
            user_id: user_id.to_string(),
            username: email.to_string(),
            password: SecretString::from(password.to_string()),
            groups: Vec::new(),
            attributes,
            must_change_password: false,
        }
    }

    #[must_use]
    pub fn with_groups(mut self, groups: &[&str]) -> Self {
        self.groups = groups.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// First sign-in answers with a new-password challenge.
    #[must_use]
    pub fn with_temporary_password(mut self) -> Self {
        self.must_change_password = true;
        self
    }
}

#[derive(Default)]
struct Inner {
    users: HashMap<String, MemoryUser>,
    signed_in: Option<String>,
    pending_challenge: Option<String>,
    reset_codes: HashMap<String, String>,
    issued: u64,
    unreachable: bool,
    sign_out_fails: bool,
    attributes_fail: bool,
}

#[derive(Default)]
pub struct MemoryIdentityProvider {
    inner: Mutex<Inner>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_user(self, user: MemoryUser) -> Self {
        self.inner.lock().users.insert(user.username.clone(), user);
        self
    }

    /// Every call fails with a transport error while set.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.inner.lock().unreachable = unreachable;
    }

    pub fn set_sign_out_failure(&self, fails: bool) {
        self.inner.lock().sign_out_fails = fails;
    }

    pub fn set_attributes_failure(&self, fails: bool) {
        self.inner.lock().attributes_fail = fails;
    }

    /// Replace a user's group memberships, as an administrator would in the pool.
    pub fn set_groups(&self, username: &str, groups: &[&str]) {
        if let Some(user) = self.inner.lock().users.get_mut(username) {
            user.groups = groups.iter().map(ToString::to_string).collect();
        }
    }

    /// Drop the provider-side session without telling the client.
    pub fn expire_session(&self) {
        self.inner.lock().signed_in = None;
    }

    /// The reset code that would have been delivered to the user.
    #[must_use]
    pub fn reset_code(&self, username: &str) -> Option<String> {
        self.inner.lock().reset_codes.get(username).cloned()
    }

    fn reachable(inner: &Inner) -> Result<(), IdentityError> {
        if inner.unreachable {
            Err(IdentityError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    fn signed_in_user(inner: &Inner) -> Result<&MemoryUser, IdentityError> {
        inner
            .signed_in
            .as_ref()
            .and_then(|username| inner.users.get(username))
            .ok_or(IdentityError::NotAuthenticated)
    }
}

fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().unwrap_or('*');
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, credentials: &Credentials) -> Result<SignInOutcome, IdentityError> {
        let mut inner = self.inner.lock();
        Self::reachable(&inner)?;
        let username = credentials.username.trim();
        let must_change_password = inner
            .users
            .get(username)
            .filter(|user| {
                user.password.expose_secret() == credentials.password.expose_secret()
            })
            .map(|user| user.must_change_password)
            .ok_or_else(|| IdentityError::Rejected("Incorrect username or password.".to_string()))?;

        if must_change_password {
            inner.pending_challenge = Some(username.to_string());
            return Ok(SignInOutcome::challenge(
                SignInStep::ConfirmSignInWithNewPassword,
            ));
        }

        inner.signed_in = Some(username.to_string());
        Ok(SignInOutcome::signed_in())
    }

    async fn confirm_sign_in(
        &self,
        challenge_response: &SecretString,
    ) -> Result<SignInOutcome, IdentityError> {
        let mut inner = self.inner.lock();
        Self::reachable(&inner)?;
        let username = inner.pending_challenge.take().ok_or_else(|| {
            IdentityError::Rejected("No sign-in challenge in progress.".to_string())
        })?;
        if let Some(user) = inner.users.get_mut(&username) {
            user.password = challenge_response.clone();
            user.must_change_password = false;
        }
        inner.signed_in = Some(username);
        Ok(SignInOutcome::signed_in())
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock();
        Self::reachable(&inner)?;
        if inner.sign_out_fails {
            return Err(IdentityError::Rejected("Sign out failed.".to_string()));
        }
        inner.signed_in = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<ProviderUser, IdentityError> {
        let inner = self.inner.lock();
        Self::reachable(&inner)?;
        let user = Self::signed_in_user(&inner)?;
        Ok(ProviderUser {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
        })
    }

    async fn fetch_session(&self) -> Result<ProviderSession, IdentityError> {
        let mut inner = self.inner.lock();
        Self::reachable(&inner)?;
        inner.issued += 1;
        let issued = inner.issued;
        let Ok(user) = Self::signed_in_user(&inner) else {
            return Ok(ProviderSession::default());
        };

        let mut claims = json!({ "sub": user.user_id });
        if !user.groups.is_empty() {
            claims[GROUPS_CLAIM] = json!(user.groups);
        }
        Ok(ProviderSession {
            tokens: Some(SessionTokens::new(
                format!("access-{}-{issued}", user.user_id),
                format!("id-{}-{issued}", user.user_id),
            )),
            claims,
        })
    }

    async fn fetch_user_attributes(&self) -> Result<HashMap<String, Value>, IdentityError> {
        let inner = self.inner.lock();
        Self::reachable(&inner)?;
        if inner.attributes_fail {
            return Err(IdentityError::Transport("attribute lookup timed out".to_string()));
        }
        Ok(Self::signed_in_user(&inner)?.attributes.clone())
    }

    async fn reset_password(&self, username: &str) -> Result<ResetPasswordStep, IdentityError> {
        let mut inner = self.inner.lock();
        Self::reachable(&inner)?;
        if !inner.users.contains_key(username) {
            return Err(IdentityError::Rejected(
                "Username/client id combination not found.".to_string(),
            ));
        }
        inner.issued += 1;
        let code = format!("{:06}", inner.issued % 1_000_000);
        inner.reset_codes.insert(username.to_string(), code);
        Ok(ResetPasswordStep::ConfirmWithCode {
            destination: Some(mask_email(username)),
        })
    }

    async fn confirm_reset_password(
        &self,
        username: &str,
        code: &str,
        new_password: &SecretString,
    ) -> Result<(), IdentityError> {
        let mut inner = self.inner.lock();
        Self::reachable(&inner)?;
        if inner.reset_codes.get(username).map(String::as_str) != Some(code) {
            return Err(IdentityError::Rejected(
                "Invalid verification code provided, please try again.".to_string(),
            ));
        }
        inner.reset_codes.remove(username);
        let user = inner.users.get_mut(username).ok_or_else(|| {
            IdentityError::Rejected("Username/client id combination not found.".to_string())
        })?;
        user.password = new_password.clone();
        user.must_change_password = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> MemoryIdentityProvider {
        MemoryIdentityProvider::new().with_user(
            MemoryUser::new("u-1", "ana@example.com", "correct-horse").with_groups(&["A", "B"]),
        )
    }

    #[tokio::test]
    async fn sign_in_rejects_wrong_password_with_provider_message() {
        let provider = provider();
        let err = provider
            .sign_in(&Credentials::new("ana@example.com", "nope"))
            .await
            .err();
        assert_eq!(
            err.map(|e| e.to_string()),
            Some("Incorrect username or password.".to_string())
        );
    }

    #[tokio::test]
    async fn session_carries_group_claim_only_when_signed_in() -> Result<(), IdentityError> {
        let provider = provider();
        assert!(provider.fetch_session().await?.tokens.is_none());

        provider
            .sign_in(&Credentials::new("ana@example.com", "correct-horse"))
            .await?;
        let session = provider.fetch_session().await?;
        assert!(session.tokens.is_some());
        assert_eq!(session.groups(), vec!["A".to_string(), "B".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn temporary_password_requires_new_password() -> Result<(), IdentityError> {
        let provider = MemoryIdentityProvider::new().with_user(
            MemoryUser::new("u-2", "ben@example.com", "temp-pass").with_temporary_password(),
        );
        let outcome = provider
            .sign_in(&Credentials::new("ben@example.com", "temp-pass"))
            .await?;
        assert_eq!(
            outcome,
            SignInOutcome::challenge(SignInStep::ConfirmSignInWithNewPassword)
        );
        assert_eq!(
            provider.current_user().await,
            Err(IdentityError::NotAuthenticated)
        );

        let outcome = provider
            .confirm_sign_in(&SecretString::from("brand-new-pass".to_string()))
            .await?;
        assert!(outcome.is_signed_in);
        assert_eq!(provider.current_user().await?.user_id, "u-2");
        Ok(())
    }

    #[tokio::test]
    async fn reset_code_round_trip() -> Result<(), IdentityError> {
        let provider = provider();
        let step = provider.reset_password("ana@example.com").await?;
        assert_eq!(
            step,
            ResetPasswordStep::ConfirmWithCode {
                destination: Some("a***@example.com".to_string())
            }
        );
        let code = provider.reset_code("ana@example.com").unwrap_or_default();
        let new_password = SecretString::from("another-horse".to_string());
        assert!(provider
            .confirm_reset_password("ana@example.com", "000000", &new_password)
            .await
            .is_err());
        provider
            .confirm_reset_password("ana@example.com", &code, &new_password)
            .await?;
        provider
            .sign_in(&Credentials::new("ana@example.com", "another-horse"))
            .await?;
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_provider_fails_every_call() {
        let provider = provider();
        provider.set_unreachable(true);
        assert!(matches!(
            provider.current_user().await,
            Err(IdentityError::Transport(_))
        ));
        assert!(matches!(
            provider.sign_out().await,
            Err(IdentityError::Transport(_))
        ));
    }
}
