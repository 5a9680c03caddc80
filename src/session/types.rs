//! Session data shared between the auth store, the cookie bridge and the view
//! layer. Tokens are bearer secrets and only ever travel as `SecretString`.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Group name required to pass admin route checks.
pub const DEFAULT_ADMIN_GROUP: &str = "DataWovenAdmin";

/// Claim carrying group memberships in the provider's access token.
pub const GROUPS_CLAIM: &str = "cognito:groups";

/// Authenticated user state held for rendering decisions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub email: String,
    pub groups: Vec<String>,
    pub attributes: HashMap<String, Value>,
}

impl Session {
    /// First group of the ordered membership list.
    #[must_use]
    pub fn primary_group(&self) -> Option<&str> {
        self.groups.first().map(String::as_str)
    }

    #[must_use]
    pub fn is_member(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}

/// Access/id token pair issued by the identity provider.
#[derive(Clone, Debug)]
pub struct SessionTokens {
    pub access_token: SecretString,
    pub id_token: SecretString,
}

impl SessionTokens {
    #[must_use]
    pub fn new(access_token: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            id_token: SecretString::from(id_token.into()),
        }
    }
}

/// Username/password pair submitted from the login form.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// User identity as reported by the provider's current-user call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUser {
    pub user_id: String,
    pub username: String,
}

/// Result of the provider's fetch-session call.
///
/// `tokens` is `None` when the provider has no live session. `claims` is the
/// decoded access token payload; only the group claim is interpreted here.
#[derive(Clone, Debug, Default)]
pub struct ProviderSession {
    pub tokens: Option<SessionTokens>,
    pub claims: Value,
}

impl ProviderSession {
    /// Group memberships from the token claim, in provider order.
    ///
    /// A missing or malformed claim yields an empty list.
    #[must_use]
    pub fn groups(&self) -> Vec<String> {
        self.claims
            .get(GROUPS_CLAIM)
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Next step reported by a sign-in or confirm-sign-in call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step", content = "detail")]
pub enum SignInStep {
    Done,
    ConfirmSignInWithNewPassword,
    ConfirmSignUp,
    ResetPassword,
    Other(String),
}

/// Raw provider outcome returned to callers of `login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInOutcome {
    pub is_signed_in: bool,
    pub next_step: SignInStep,
}

impl SignInOutcome {
    #[must_use]
    pub fn signed_in() -> Self {
        Self {
            is_signed_in: true,
            next_step: SignInStep::Done,
        }
    }

    #[must_use]
    pub fn challenge(step: SignInStep) -> Self {
        Self {
            is_signed_in: false,
            next_step: step,
        }
    }
}

/// Next step reported by an initiate-password-reset call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "step")]
pub enum ResetPasswordStep {
    /// A confirmation code was sent to `destination` (usually a masked e-mail).
    ConfirmWithCode { destination: Option<String> },
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn groups_read_from_claim_in_order() {
        let session = ProviderSession {
            tokens: None,
            claims: json!({ "cognito:groups": ["ImplementationUser", "DataWovenAdmin"] }),
        };
        assert_eq!(
            session.groups(),
            vec!["ImplementationUser".to_string(), "DataWovenAdmin".to_string()]
        );
    }

    #[test]
    fn groups_default_to_empty() {
        assert!(ProviderSession::default().groups().is_empty());

        let malformed = ProviderSession {
            tokens: None,
            claims: json!({ "cognito:groups": "DataWovenAdmin" }),
        };
        assert!(malformed.groups().is_empty());
    }

    #[test]
    fn primary_group_is_first_entry() {
        let session = Session {
            user_id: "u-1".to_string(),
            email: String::new(),
            groups: vec!["A".to_string(), "B".to_string()],
            attributes: HashMap::new(),
        };
        assert_eq!(session.primary_group(), Some("A"));
        assert!(session.is_member("B"));
        assert!(!session.is_member("b"));
    }

    #[test]
    fn sign_in_step_serializes_with_tag() {
        let json = serde_json::to_value(SignInOutcome::challenge(
            SignInStep::ConfirmSignInWithNewPassword,
        ))
        .unwrap_or_default();
        assert_eq!(json["is_signed_in"], false);
        assert_eq!(json["next_step"]["step"], "confirm_sign_in_with_new_password");
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials::new("ana@example.com", "hunter2hunter2");
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
