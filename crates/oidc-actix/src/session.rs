//! The signed `_interaction` cookie binding a browser to the interaction it was shown.

use actix_session::{
    config::CookieContentSecurity, storage::CookieSessionStore, Session, SessionMiddleware,
};
use actix_web::cookie::{Cookie, CookieJar, Key, SameSite};
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{self, HeaderMap, HeaderValue};
use actix_web::Error;
use sha2::{Digest, Sha512};
use std::future::{ready, Ready};

use oidc_core::OidcError;

pub const INTERACTION_COOKIE: &str = "_interaction";
const UID_KEY: &str = "uid";

/// Derive the 64-byte cookie signing key from a configured secret.
pub fn cookie_key(secret: &str) -> Key {
    Key::from(Sha512::digest(secret.as_bytes()).as_slice())
}

pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(INTERACTION_COOKIE.to_string())
        .cookie_content_security(CookieContentSecurity::Signed)
        .cookie_secure(secure)
        .cookie_http_only(true)
        .cookie_same_site(SameSite::Lax)
        .build()
}

/// Accepts interaction cookies signed with the previous `SECURE_KEY` by re-signing
/// them with the current one before the session middleware verifies them.
///
/// Must wrap the session middleware (registered after it).
#[derive(Clone)]
pub struct PreviousKeyFallback {
    current: Key,
    previous: Key,
}

impl PreviousKeyFallback {
    pub fn new(current: Key, previous: Key) -> Self {
        Self { current, previous }
    }

    /// The rewritten `Cookie` header, if the interaction cookie only verifies
    /// under the previous key.
    fn resign(&self, headers: &HeaderMap) -> Option<HeaderValue> {
        let mut cookies: Vec<Cookie<'static>> = headers
            .get_all(header::COOKIE)
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| Cookie::parse_encoded(pair.trim().to_string()).ok())
            .collect();
        let pos = cookies.iter().position(|c| c.name() == INTERACTION_COOKIE)?;

        let mut jar = CookieJar::new();
        jar.add_original(cookies[pos].clone());
        if jar.signed(&self.current).get(INTERACTION_COOKIE).is_some() {
            return None;
        }
        let verified = jar.signed(&self.previous).get(INTERACTION_COOKIE)?;

        let mut resigned = CookieJar::new();
        resigned.signed_mut(&self.current).add(verified);
        cookies[pos] = resigned.get(INTERACTION_COOKIE)?.clone();

        let header = cookies
            .iter()
            .map(|c| c.encoded().stripped().to_string())
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&header).ok()
    }
}

impl<S, B> Transform<S, ServiceRequest> for PreviousKeyFallback
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = PreviousKeyFallbackService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(PreviousKeyFallbackService {
            service,
            keys: self.clone(),
        }))
    }
}

pub struct PreviousKeyFallbackService<S> {
    service: S,
    keys: PreviousKeyFallback,
}

impl<S, B> Service<ServiceRequest> for PreviousKeyFallbackService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = S::Future;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        if let Some(cookie_header) = self.keys.resign(req.headers()) {
            tracing::debug!("interaction cookie re-signed from previous key");
            req.headers_mut().insert(header::COOKIE, cookie_header);
        }
        self.service.call(req)
    }
}

pub fn bind_interaction(session: &Session, uid: &str) -> Result<(), OidcError> {
    session.insert(UID_KEY, uid).map_err(|e| {
        tracing::error!(error = %e, "failed to write interaction session");
        OidcError::server_error("failed to write interaction session")
    })
}

/// Fails with `session_not_found` unless the cookie names `uid`.
pub fn require_interaction(session: &Session, uid: &str) -> Result<(), OidcError> {
    let bound = session.get::<String>(UID_KEY).map_err(|e| {
        tracing::warn!(error = %e, "unreadable interaction session");
        OidcError::session_not_found("interaction session not found")
    })?;

    match bound {
        Some(bound) if bound == uid => Ok(()),
        Some(_) => Err(OidcError::session_not_found(
            "interaction session does not match this interaction",
        )),
        None => Err(OidcError::session_not_found("interaction session not found")),
    }
}

pub fn release_interaction(session: &Session) {
    session.remove(UID_KEY);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_key_is_stable_per_secret() {
        let a = cookie_key("secret-one");
        let b = cookie_key("secret-one");
        let c = cookie_key("secret-two");
        assert_eq!(a.master(), b.master());
        assert_ne!(a.master(), c.master());
    }

    fn signed_header(key: &Key, value: &str) -> HeaderMap {
        let mut jar = CookieJar::new();
        jar.signed_mut(key)
            .add(Cookie::new(INTERACTION_COOKIE, value.to_string()));
        let signed = jar.get(INTERACTION_COOKIE).unwrap().encoded().stripped().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("other=1; {signed}")).unwrap(),
        );
        headers
    }

    #[test]
    fn previous_key_cookie_is_resigned_with_current_key() {
        let current = cookie_key("current");
        let previous = cookie_key("previous");
        let fallback = PreviousKeyFallback::new(current.clone(), previous.clone());

        let rewritten = fallback
            .resign(&signed_header(&previous, r#"{"uid":"\"abc\""}"#))
            .unwrap();
        let rewritten = rewritten.to_str().unwrap();
        assert!(rewritten.starts_with("other=1; "));

        let cookie = rewritten
            .split("; ")
            .find_map(|pair| {
                Cookie::parse_encoded(pair.to_string())
                    .ok()
                    .filter(|c| c.name() == INTERACTION_COOKIE)
            })
            .unwrap();
        let mut jar = CookieJar::new();
        jar.add_original(cookie);
        let verified = jar.signed(&current).get(INTERACTION_COOKIE).unwrap();
        assert_eq!(verified.value(), r#"{"uid":"\"abc\""}"#);
    }

    #[test]
    fn current_and_unknown_signatures_are_left_alone() {
        let current = cookie_key("current");
        let fallback = PreviousKeyFallback::new(current.clone(), cookie_key("previous"));

        assert!(fallback.resign(&signed_header(&current, "v")).is_none());
        assert!(fallback
            .resign(&signed_header(&cookie_key("stranger"), "v"))
            .is_none());
        assert!(fallback.resign(&HeaderMap::new()).is_none());
    }
}
