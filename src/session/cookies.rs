//! Cookie projection of the session for server-side route gating.
//!
//! The bridge is the only writer of these cookies and the route guard is the
//! only reader. Values are presence markers: nothing here validates tokens.

use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use parking_lot::Mutex;
use secrecy::ExposeSecret;
use std::collections::BTreeMap;
use tokio::time::{Duration, Instant};
use tracing::debug;

use super::types::SessionTokens;

pub const ACCESS_TOKEN_COOKIE: &str = "CognitoIdentityServiceProvider.accessToken";
pub const ID_TOKEN_COOKIE: &str = "CognitoIdentityServiceProvider.idToken";
pub const USER_GROUP_COOKIE: &str = "CognitoIdentityServiceProvider.userGroup";

/// Primary group value written when the user belongs to no group.
pub const NO_GROUP: &str = "none";

const DEFAULT_MAX_AGE_SECONDS: i64 = 60 * 60;

#[derive(Clone, Debug)]
pub struct CookieConfig {
    max_age_seconds: i64,
    secure: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
            secure: false,
        }
    }
}

impl CookieConfig {
    #[must_use]
    pub fn with_max_age_seconds(mut self, seconds: i64) -> Self {
        self.max_age_seconds = seconds.max(0);
        self
    }

    /// Mark cookies `Secure`; only useful when the portal is served over HTTPS.
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }
}

/// What the route guard can learn about a request from its cookies.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieProjection {
    pub access_token: bool,
    pub id_token: bool,
    pub primary_group: Option<String>,
}

impl CookieProjection {
    /// Read the projection from parsed request cookies. Empty values count as absent.
    #[must_use]
    pub fn from_jar(jar: &CookieJar) -> Self {
        let present = |name: &str| jar.get(name).is_some_and(|c| !c.value().is_empty());
        Self {
            access_token: present(ACCESS_TOKEN_COOKIE),
            id_token: present(ID_TOKEN_COOKIE),
            primary_group: jar
                .get(USER_GROUP_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|group| !group.is_empty()),
        }
    }

    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_jar(&CookieJar::from_headers(headers))
    }

    /// Both token markers are present.
    #[must_use]
    pub fn has_tokens(&self) -> bool {
        self.access_token && self.id_token
    }

    #[must_use]
    pub fn primary_group(&self) -> Option<&str> {
        self.primary_group.as_deref()
    }
}

struct LiveCookie {
    value: String,
    expires_at: Instant,
}

/// Writes and clears the three projection cookies.
///
/// Each call returns the `Set-Cookie` cookies to hand to whatever owns the
/// real cookie store, and the bridge keeps its own copy so the client side can
/// replay them (`cookie_header`) until they expire.
pub struct CookieBridge {
    config: CookieConfig,
    live: Mutex<BTreeMap<&'static str, LiveCookie>>,
}

impl Default for CookieBridge {
    fn default() -> Self {
        Self::new(CookieConfig::default())
    }
}

impl CookieBridge {
    #[must_use]
    pub fn new(config: CookieConfig) -> Self {
        Self {
            config,
            live: Mutex::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CookieConfig {
        &self.config
    }

    /// Project a token pair and group list. The primary group is the first
    /// entry, or [`NO_GROUP`] when the list is empty.
    #[must_use = "the returned cookies must reach the browser as Set-Cookie headers"]
    pub fn write(&self, tokens: &SessionTokens, groups: &[String]) -> Vec<Cookie<'static>> {
        let primary_group = groups.first().map_or(NO_GROUP, String::as_str);
        let cookies = vec![
            self.build(ACCESS_TOKEN_COOKIE, tokens.access_token.expose_secret()),
            self.build(ID_TOKEN_COOKIE, tokens.id_token.expose_secret()),
            self.build(USER_GROUP_COOKIE, primary_group),
        ];

        let ttl = Duration::from_secs(u64::try_from(self.config.max_age_seconds).unwrap_or(0));
        let expires_at = Instant::now() + ttl;
        let mut live = self.live.lock();
        for (name, cookie) in [ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, USER_GROUP_COOKIE]
            .into_iter()
            .zip(&cookies)
        {
            live.insert(
                name,
                LiveCookie {
                    value: cookie.value().to_string(),
                    expires_at,
                },
            );
        }

        debug!(primary_group, "cookie projection written");
        cookies
    }

    /// Expire all projection cookies immediately.
    #[must_use = "the returned removals must reach the browser as Set-Cookie headers"]
    pub fn clear(&self) -> Vec<Cookie<'static>> {
        self.live.lock().clear();
        debug!("cookie projection cleared");
        [ACCESS_TOKEN_COOKIE, ID_TOKEN_COOKIE, USER_GROUP_COOKIE]
            .into_iter()
            .map(|name| {
                Cookie::build((name, ""))
                    .path("/")
                    .same_site(SameSite::Lax)
                    .max_age(time::Duration::ZERO)
                    .build()
            })
            .collect()
    }

    /// The projection a request carrying the live cookies would present.
    #[must_use]
    pub fn projection(&self) -> CookieProjection {
        CookieProjection::from_headers(&self.request_headers())
    }

    /// `Cookie` request header with every unexpired projection cookie.
    #[must_use]
    pub fn cookie_header(&self) -> Option<HeaderValue> {
        let now = Instant::now();
        let live = self.live.lock();
        let pairs: Vec<String> = live
            .iter()
            .filter(|(_, cookie)| cookie.expires_at > now)
            .map(|(name, cookie)| {
                Cookie::new(*name, cookie.value.clone())
                    .encoded()
                    .to_string()
            })
            .collect();
        if pairs.is_empty() {
            return None;
        }
        HeaderValue::from_str(&pairs.join("; ")).ok()
    }

    fn request_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = self.cookie_header() {
            headers.insert(axum::http::header::COOKIE, value);
        }
        headers
    }

    fn build(&self, name: &'static str, value: &str) -> Cookie<'static> {
        Cookie::build((name, value.to_string()))
            .path("/")
            .same_site(SameSite::Lax)
            .secure(self.config.secure)
            .max_age(time::Duration::seconds(self.config.max_age_seconds))
            .build()
    }
}

/// Render a cookie as a `Set-Cookie` header value.
#[must_use]
pub fn set_cookie_header(cookie: &Cookie<'_>) -> Option<HeaderValue> {
    HeaderValue::from_str(&cookie.encoded().to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;

    fn tokens() -> SessionTokens {
        SessionTokens::new("access.jwt.value", "id.jwt.value")
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    fn find<'a>(cookies: &'a [Cookie<'static>], name: &str) -> Option<&'a Cookie<'static>> {
        cookies.iter().find(|c| c.name() == name)
    }

    #[test]
    fn write_sets_three_cookies_with_fixed_attributes() {
        let bridge = CookieBridge::default();
        let cookies = bridge.write(&tokens(), &groups(&["ImplementationUser"]));

        assert_eq!(cookies.len(), 3);
        for cookie in &cookies {
            assert_eq!(cookie.path(), Some("/"));
            assert_eq!(cookie.same_site(), Some(SameSite::Lax));
            assert_eq!(cookie.max_age(), Some(time::Duration::seconds(3600)));
        }
        assert_eq!(
            find(&cookies, ACCESS_TOKEN_COOKIE).map(Cookie::value),
            Some("access.jwt.value")
        );
        assert_eq!(
            find(&cookies, ID_TOKEN_COOKIE).map(Cookie::value),
            Some("id.jwt.value")
        );
    }

    #[test]
    fn empty_groups_write_sentinel() {
        let bridge = CookieBridge::default();
        let cookies = bridge.write(&tokens(), &[]);
        assert_eq!(
            find(&cookies, USER_GROUP_COOKIE).map(Cookie::value),
            Some(NO_GROUP)
        );
        assert_eq!(bridge.projection().primary_group(), Some("none"));
    }

    #[test]
    fn primary_group_is_first_element_only() {
        let bridge = CookieBridge::default();
        let cookies = bridge.write(&tokens(), &groups(&["DataWovenAdmin", "X"]));
        assert_eq!(
            find(&cookies, USER_GROUP_COOKIE).map(Cookie::value),
            Some("DataWovenAdmin")
        );

        let cookies = bridge.write(&tokens(), &groups(&["X", "DataWovenAdmin"]));
        assert_eq!(
            find(&cookies, USER_GROUP_COOKIE).map(Cookie::value),
            Some("X")
        );
    }

    #[test]
    fn clear_expires_every_cookie_and_is_idempotent() {
        let bridge = CookieBridge::default();
        let _ = bridge.write(&tokens(), &groups(&["A"]));

        for _ in 0..2 {
            let removals = bridge.clear();
            assert_eq!(removals.len(), 3);
            for cookie in &removals {
                assert_eq!(cookie.value(), "");
                assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
            }
            assert_eq!(bridge.cookie_header(), None);
            assert_eq!(bridge.projection(), CookieProjection::default());
        }
    }

    #[test]
    fn write_is_a_full_overwrite() {
        let bridge = CookieBridge::default();
        let _ = bridge.write(&tokens(), &groups(&["A"]));
        let _ = bridge.write(&tokens(), &groups(&["B"]));
        let projection = bridge.projection();
        assert!(projection.has_tokens());
        assert_eq!(projection.primary_group(), Some("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn live_cookies_expire_after_max_age() {
        let bridge = CookieBridge::default();
        let _ = bridge.write(&tokens(), &groups(&["A"]));
        assert!(bridge.projection().has_tokens());

        tokio::time::advance(Duration::from_secs(3599)).await;
        assert!(bridge.projection().has_tokens());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!bridge.projection().has_tokens());
        assert_eq!(bridge.cookie_header(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn custom_max_age_drives_header_and_expiry() {
        let bridge = CookieBridge::new(CookieConfig::default().with_max_age_seconds(60));
        let cookies = bridge.write(&tokens(), &groups(&["A"]));
        let header = find(&cookies, ACCESS_TOKEN_COOKIE)
            .and_then(set_cookie_header)
            .and_then(|value| value.to_str().map(ToString::to_string).ok())
            .unwrap_or_default();
        assert!(header.contains("Max-Age=60"), "{header}");
        assert!(!header.contains("Secure"), "{header}");

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(!bridge.projection().has_tokens());
    }

    #[test]
    fn negative_max_age_is_clamped_to_zero() {
        let config = CookieConfig::default().with_max_age_seconds(-5);
        assert_eq!(config.max_age_seconds(), 0);
        assert!(!config.secure());
    }

    #[test]
    fn secure_flag_follows_config() {
        let bridge = CookieBridge::new(CookieConfig::default().with_secure(true));
        let cookies = bridge.write(&tokens(), &[]);
        assert!(cookies.iter().all(|c| c.secure() == Some(true)));
    }

    #[test]
    fn set_cookie_header_renders_attributes() {
        let bridge = CookieBridge::default();
        let cookies = bridge.write(&tokens(), &groups(&["DataWovenAdmin"]));
        let header = find(&cookies, USER_GROUP_COOKIE)
            .and_then(set_cookie_header)
            .and_then(|value| value.to_str().map(ToString::to_string).ok())
            .unwrap_or_default();
        assert!(header.starts_with("CognitoIdentityServiceProvider.userGroup=DataWovenAdmin"));
        assert!(header.contains("Path=/"));
        assert!(header.contains("SameSite=Lax"));
        assert!(header.contains("Max-Age=3600"));
    }

    #[test]
    fn projection_treats_empty_values_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static(
                "CognitoIdentityServiceProvider.accessToken=; CognitoIdentityServiceProvider.idToken=abc; CognitoIdentityServiceProvider.userGroup=",
            ),
        );
        let projection = CookieProjection::from_headers(&headers);
        assert!(!projection.access_token);
        assert!(projection.id_token);
        assert!(!projection.has_tokens());
        assert_eq!(projection.primary_group(), None);
    }

    #[test]
    fn projection_keeps_group_value_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("CognitoIdentityServiceProvider.userGroup=datawovenadmin"),
        );
        let projection = CookieProjection::from_headers(&headers);
        assert_eq!(projection.primary_group(), Some("datawovenadmin"));
    }
}
