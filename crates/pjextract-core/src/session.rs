//! Assembling an [`AuthSession`] from the cookies of a logged-in browser.

use crate::error::AuthError;
use crate::model::AuthSession;
use crate::token;

/// Cookie carrying the anti-forgery token echoed in `X-Xsrf-Token`.
pub const CSRF_COOKIE: &str = "Xsrf-Token";
/// Cookie carrying the access token whose claims hold the panel id.
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
/// Claim of the access token holding the panel id.
pub const PANEL_ID_CLAIM: &str = "id";

impl AuthSession {
    /// Build a session from `(name, value)` cookie pairs in browser order.
    ///
    /// The cookie header contains every pair, joined by `"; "`. Fails when
    /// either named cookie is missing or empty, or when the access token
    /// yields no panel id.
    pub fn from_cookies<'a, I>(cookies: I) -> Result<Self, AuthError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut pairs = Vec::new();
        let mut csrf_token = None;
        let mut access_token = None;

        for (name, value) in cookies {
            pairs.push(format!("{name}={value}"));
            if value.is_empty() {
                continue;
            }
            match name {
                CSRF_COOKIE if csrf_token.is_none() => csrf_token = Some(value),
                ACCESS_TOKEN_COOKIE if access_token.is_none() => access_token = Some(value),
                _ => {}
            }
        }

        let csrf_token = csrf_token.ok_or(AuthError::MissingCookie(CSRF_COOKIE))?;
        let access_token = access_token.ok_or(AuthError::MissingCookie(ACCESS_TOKEN_COOKIE))?;

        let claims = token::decode_claims(access_token).ok_or(AuthError::TokenDecode)?;
        let panel_id = token::claim_string(&claims, PANEL_ID_CLAIM)
            .ok_or(AuthError::MissingClaim(PANEL_ID_CLAIM))?;

        Ok(Self {
            cookie_header: pairs.join("; "),
            csrf_token: csrf_token.to_string(),
            panel_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn access_token(payload: &str) -> String {
        format!("eyJhbGciOiJIUzI1NiJ9.{}.sig", URL_SAFE_NO_PAD.encode(payload))
    }

    #[test]
    fn builds_session_from_cookies() {
        let token = access_token(r#"{"id":98765,"sub":"user"}"#);
        let cookies = [
            ("JSESSIONID", "abc"),
            ("Xsrf-Token", "csrf-123"),
            ("access_token", token.as_str()),
        ];
        let session = AuthSession::from_cookies(cookies).unwrap();
        assert_eq!(session.csrf_token, "csrf-123");
        assert_eq!(session.panel_id, "98765");
        assert_eq!(
            session.cookie_header,
            format!("JSESSIONID=abc; Xsrf-Token=csrf-123; access_token={token}")
        );
    }

    #[test]
    fn context_wide_cookie_list_keeps_every_cookie() {
        // Every cookie of the browser context, including the SSO host's and
        // those scoped to API paths, in the order the browser lists them.
        let token = access_token(r#"{"id":"4242"}"#);
        let cookies = [
            ("KEYCLOAK_SESSION", "kc"),
            ("AUTH_SESSION_ID", "sso"),
            ("access_token", token.as_str()),
            ("JSESSIONID", "api"),
            ("Xsrf-Token", "csrf-9"),
        ];
        let session = AuthSession::from_cookies(cookies).unwrap();
        assert_eq!(session.panel_id, "4242");
        assert_eq!(session.csrf_token, "csrf-9");
        assert_eq!(
            session.cookie_header,
            format!("KEYCLOAK_SESSION=kc; AUTH_SESSION_ID=sso; access_token={token}; JSESSIONID=api; Xsrf-Token=csrf-9")
        );
    }

    #[test]
    fn missing_csrf_cookie_fails() {
        let token = access_token(r#"{"id":1}"#);
        let err = AuthSession::from_cookies([("access_token", token.as_str())]).unwrap_err();
        assert!(matches!(err, AuthError::MissingCookie("Xsrf-Token")));
    }

    #[test]
    fn empty_csrf_cookie_counts_as_missing() {
        let token = access_token(r#"{"id":1}"#);
        let err = AuthSession::from_cookies([("Xsrf-Token", ""), ("access_token", token.as_str())])
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingCookie("Xsrf-Token")));
    }

    #[test]
    fn missing_access_token_fails() {
        let err = AuthSession::from_cookies([("Xsrf-Token", "x")]).unwrap_err();
        assert!(matches!(err, AuthError::MissingCookie("access_token")));
    }

    #[test]
    fn undecodable_token_fails() {
        let err =
            AuthSession::from_cookies([("Xsrf-Token", "x"), ("access_token", "opaque")]).unwrap_err();
        assert!(matches!(err, AuthError::TokenDecode));
    }

    #[test]
    fn token_without_id_claim_fails() {
        let token = access_token(r#"{"sub":"user"}"#);
        let err = AuthSession::from_cookies([("Xsrf-Token", "x"), ("access_token", token.as_str())])
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingClaim("id")));
    }
}
