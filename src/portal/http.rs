//! HTTP boundary of the portal client.
//!
//! Requests and responses are plain values so the redirect chain can be
//! replayed against a scripted transport. Redirects are never followed by the
//! transport; callers inspect `Location`/`Refresh` themselves. Cookies are not
//! stored here either, see [`crate::portal::cookies::SessionCookies`].

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::time::Duration;
use url::Url;

use crate::portal::errors::{PortalError, Result};

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// Form-encoded body fields, sent as `application/x-www-form-urlencoded`.
    pub form: Option<Vec<(String, String)>>,
}

impl HttpRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            form: None,
        }
    }

    pub fn post_form(url: Url, form: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            url,
            headers: HeaderMap::new(),
            form: Some(form),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// URL the request was sent to; relative redirect targets resolve against it.
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body decoded as UTF-16, honouring a byte order mark and defaulting to big endian.
    pub fn text_utf16(&self) -> String {
        decode_utf16(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn set_cookies(&self) -> impl Iterator<Item = &str> {
        self.headers
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
    }
}

fn decode_utf16(bytes: &[u8]) -> String {
    let (little_endian, payload) = match bytes {
        [0xFF, 0xFE, rest @ ..] => (true, rest),
        [0xFE, 0xFF, rest @ ..] => (false, rest),
        _ => (false, bytes),
    };
    let units = payload.chunks_exact(2).map(|pair| {
        if little_endian {
            u16::from_le_bytes([pair[0], pair[1]])
        } else {
            u16::from_be_bytes([pair[0], pair[1]])
        }
    });
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// Sends a single request without following redirects.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production transport on top of `reqwest`.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Only connection setup is bounded; responses may take as long as the portal needs.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("campusnet/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            form,
        } = request;

        let mut builder = self.http.request(method, url.clone()).headers(headers);
        if let Some(fields) = form {
            builder = builder.form(&fields);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

/// Builds a `Cookie` header value, skipping it entirely when there is nothing to send.
pub(crate) fn cookie_header(pairs: &str) -> Option<HeaderValue> {
    if pairs.is_empty() {
        return None;
    }
    HeaderValue::from_str(pairs).ok()
}

/// Resolves `target` against `base`, accepting absolute URLs and origin-relative paths alike.
pub(crate) fn resolve(base: &Url, target: &str) -> Result<Url> {
    base.join(target.trim()).map_err(PortalError::from)
}
