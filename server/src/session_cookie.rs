//! Binding between the session identity and the HTTP cookie that carries it.
//! Nothing outside this module reads or writes the cookie.

use axum::http::header::{InvalidHeaderValue, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use shelf_core::{IdentityConfig, SessionId};

/// Reads and writes the session cookie according to the configured policy
#[derive(Debug, Clone)]
pub struct SessionCookie {
    config: IdentityConfig,
}

impl SessionCookie {
    pub fn new(config: IdentityConfig) -> Self {
        Self { config }
    }

    /// The raw session token the client presented, if any
    pub fn presented(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                (key == self.config.cookie_name && !value.is_empty()).then(|| value.to_string())
            })
    }

    /// `Set-Cookie` value that persists `session_id` on the client
    pub fn issue(&self, session_id: &SessionId) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; SameSite={}",
            self.config.cookie_name,
            session_id,
            self.config.cookie_path,
            self.config.max_age_secs,
            self.config.same_site,
        );
        if self.config.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    /// Insert the `Set-Cookie` header for `session_id` into `headers`
    pub fn attach(
        &self,
        headers: &mut HeaderMap,
        session_id: &SessionId,
    ) -> Result<(), InvalidHeaderValue> {
        headers.append(SET_COOKIE, self.issue(session_id)?);
        Ok(())
    }
}
