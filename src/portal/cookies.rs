//! Per-origin cookie storage for a portal session.

use cookie::time::OffsetDateTime;
use cookie::{Cookie, CookieJar};
use std::collections::HashMap;
use tracing::trace;
use url::Url;

/// One jar per host. The portal and identity provider never share cookies.
///
/// Within a host, cookies are scoped by path (RFC 6265 path-match) and dropped
/// once their `Expires`/`Max-Age` has passed.
#[derive(Debug, Clone, Default)]
pub struct SessionCookies {
    jars: HashMap<String, CookieJar>,
}

impl SessionCookies {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a cookie for the host of `origin`, scoped to the default path of `origin`.
    pub fn insert(&mut self, origin: &Url, name: &str, value: &str) {
        let mut cookie = Cookie::new(name.to_owned(), value.to_owned());
        cookie.set_path(default_path(origin));
        self.jar_mut(origin).add(cookie);
    }

    /// Value of cookie `name` held for the host of `origin`, regardless of path.
    pub fn get(&self, origin: &Url, name: &str) -> Option<&str> {
        let host = origin.host_str()?;
        self.jars
            .get(host)?
            .get(name)
            .filter(|c| !is_expired(c))
            .map(|c| c.value())
    }

    /// `name=value; ...` for every live cookie whose host and path match `url`.
    pub fn header_for(&self, url: &Url) -> String {
        let Some(jar) = url.host_str().and_then(|host| self.jars.get(host)) else {
            return String::new();
        };
        let mut pairs: Vec<String> = jar
            .iter()
            .filter(|c| !is_expired(c) && path_matches(c.path().unwrap_or("/"), url.path()))
            .map(|c| format!("{}={}", c.name(), c.value()))
            .collect();
        pairs.sort();
        pairs.join("; ")
    }

    /// Applies `Set-Cookie` headers received from `url`.
    ///
    /// An empty value, a non-positive `Max-Age` or an `Expires` in the past deletes the cookie.
    pub fn absorb<'a>(&mut self, url: &Url, set_cookies: impl Iterator<Item = &'a str>) {
        for raw in set_cookies {
            let Ok(mut parsed) = Cookie::parse(raw.to_owned()) else {
                trace!(url = %url, "ignoring malformed Set-Cookie header");
                continue;
            };
            let expired = parsed.value().is_empty() || is_expired(&parsed);
            let jar = self.jar_mut(url);
            if expired {
                jar.remove(Cookie::from(parsed.name().to_owned()));
                continue;
            }
            if parsed.path().is_none_or(|p| !p.starts_with('/')) {
                parsed.set_path(default_path(url));
            }
            jar.add(parsed);
        }
    }

    fn jar_mut(&mut self, url: &Url) -> &mut CookieJar {
        let host = url.host_str().unwrap_or_default().to_owned();
        self.jars.entry(host).or_default()
    }
}

/// `Max-Age` takes precedence over `Expires` when both are present.
fn is_expired(cookie: &Cookie<'_>) -> bool {
    if let Some(age) = cookie.max_age() {
        return age.whole_seconds() <= 0;
    }
    cookie
        .expires_datetime()
        .is_some_and(|at| at <= OffsetDateTime::now_utc())
}

/// Directory of the request path, used when `Set-Cookie` carries no `Path`.
fn default_path(url: &Url) -> String {
    match url.path().rfind('/') {
        Some(0) | None => "/".to_owned(),
        Some(idx) => url.path()[..idx].to_owned(),
    }
}

/// RFC 6265 section 5.1.4 path-match.
fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}
