//! Client-side session state for the portal.
//!
//! ## Components
//!
//! - [`AuthStore`] holds the current [`Session`] and a `loading` flag, and
//!   sequences refresh/logout against the identity provider.
//! - [`CookieBridge`] projects the session into three cookies (access token
//!   marker, id token marker, primary group) that the route guard reads.
//! - [`IdentityProvider`] is the seam to the managed user pool. The in-memory
//!   implementation backs local development and tests.
//!
//! ## Cookie Projection
//!
//! | Cookie                                         | Value                    |
//! |------------------------------------------------|--------------------------|
//! | `CognitoIdentityServiceProvider.accessToken`   | access token             |
//! | `CognitoIdentityServiceProvider.idToken`       | id token                 |
//! | `CognitoIdentityServiceProvider.userGroup`     | first group, or `none`   |
//!
//! All three are written with `Path=/`, `SameSite=Lax` and a one hour
//! `Max-Age` (see [`CookieConfig`]), and are removed together on logout or
//! refresh failure. `Secure` is off by default so the portal works over plain
//! HTTP locally; enable it with [`CookieConfig::with_secure`] behind HTTPS.

mod cookies;
mod memory;
mod provider;
mod store;
mod types;
mod validation;

pub use cookies::{
    set_cookie_header, CookieBridge, CookieConfig, CookieProjection, ACCESS_TOKEN_COOKIE,
    ID_TOKEN_COOKIE, NO_GROUP, USER_GROUP_COOKIE,
};
pub use memory::{MemoryIdentityProvider, MemoryUser};
pub use provider::{IdentityError, IdentityProvider};
pub use store::{AuthError, AuthSnapshot, AuthStore, StoreConfig};
pub use types::{
    Credentials, ProviderSession, ProviderUser, ResetPasswordStep, Session, SessionTokens,
    SignInOutcome, SignInStep, DEFAULT_ADMIN_GROUP, GROUPS_CLAIM,
};
pub use validation::{
    valid_email, validate_credentials, validate_new_password, validate_username,
    ValidationError, MIN_PASSWORD_LENGTH,
};
