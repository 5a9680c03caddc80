//! Seam to the managed identity provider.
//!
//! The provider SDK itself is an external collaborator. The store only needs
//! the success/failure outcome of each call and the shape of the token group
//! claim, so every operation it consumes is expressed here.

use secrecy::SecretString;
use serde_json::Value;
use std::{collections::HashMap, future::Future};
use thiserror::Error;

use super::types::{
    Credentials, ProviderSession, ProviderUser, ResetPasswordStep, SignInOutcome,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// No signed-in user or the session expired at the provider.
    #[error("user is not authenticated")]
    NotAuthenticated,
    /// The provider rejected the call; the message is shown to the user as-is.
    #[error("{0}")]
    Rejected(String),
    #[error("identity provider unreachable: {0}")]
    Transport(String),
}

/// Operations consumed from the identity provider client.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Exchange a username/password pair. May return a challenge instead of
    /// a full sign-in.
    fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<SignInOutcome, IdentityError>> + Send;

    /// Answer a pending sign-in challenge (for example a new password).
    fn confirm_sign_in(
        &self,
        challenge_response: &SecretString,
    ) -> impl Future<Output = Result<SignInOutcome, IdentityError>> + Send;

    fn sign_out(&self) -> impl Future<Output = Result<(), IdentityError>> + Send;

    fn current_user(&self) -> impl Future<Output = Result<ProviderUser, IdentityError>> + Send;

    fn fetch_session(&self) -> impl Future<Output = Result<ProviderSession, IdentityError>> + Send;

    fn fetch_user_attributes(
        &self,
    ) -> impl Future<Output = Result<HashMap<String, Value>, IdentityError>> + Send;

    fn reset_password(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<ResetPasswordStep, IdentityError>> + Send;

    fn confirm_reset_password(
        &self,
        username: &str,
        code: &str,
        new_password: &SecretString,
    ) -> impl Future<Output = Result<(), IdentityError>> + Send;
}
