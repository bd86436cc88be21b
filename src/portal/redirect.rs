//! Redirect chain between the portal landing page, the identity provider and back.
//!
//! Each hop hides its target in a different place: a meta refresh tag, an
//! inline `window.location.href` assignment, the login button, or an HTTP
//! `Refresh` header. Extractors are pure; the async steps below wire them to
//! the transport and log every transition at trace level.

use html_scraper::{Html, Selector};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;
use url::Url;

use crate::portal::errors::{PortalError, Result};
use crate::portal::http::{HttpRequest, HttpTransport, resolve};
use crate::portal::session::SessionContext;
use crate::portal::{PORTAL_ORIGIN, arguments};

static META_REFRESH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+http-equiv="refresh"\s+content="\d+;\s*URL=([^"]*)""#).unwrap()
});

static SCRIPT_LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.location\.href\s*=\s*'([^']*)'").unwrap());

static LOGIN_BUTTON_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#logIn_btn").unwrap());

/// Target of a `<meta http-equiv="refresh" content="0; URL=...">` tag.
pub fn meta_refresh_target(body: &str) -> Option<String> {
    META_REFRESH_RE
        .captures(body)
        .map(|caps| htmlize::unescape(&caps[1]).into_owned())
}

/// Target of an inline `window.location.href = '...'` assignment.
pub fn script_location_target(body: &str) -> Option<String> {
    SCRIPT_LOCATION_RE
        .captures(body)
        .map(|caps| htmlize::unescape(&caps[1]).into_owned())
}

/// `href` of the portal's login button; also present on "Access denied" pages.
pub fn login_button_href(doc: &Html) -> Option<String> {
    doc.select(&LOGIN_BUTTON_SEL)
        .next()
        .and_then(|el| el.attr("href"))
        .map(str::to_owned)
}

/// Target of a `Refresh: 0; URL=<target>` header value.
pub fn refresh_header_target(value: &str) -> Option<String> {
    let (_, rest) = value.split_once(';')?;
    let rest = rest.trim_start();
    let target = rest
        .strip_prefix("URL=")
        .or_else(|| rest.strip_prefix("url="))?;
    (!target.is_empty()).then(|| target.to_owned())
}

/// "start" hops: portal landing page to the identity provider login URL.
pub async fn start_page_redirect(
    transport: &dyn HttpTransport,
    ctx: &mut SessionContext,
) -> Result<Url> {
    let landing = ctx
        .send(transport, HttpRequest::get(PORTAL_ORIGIN.clone()))
        .await?;
    let target = meta_refresh_target(&landing.text_utf16())
        .ok_or_else(|| PortalError::redirect("start-1", "no meta refresh tag on landing page"))?;
    let target = resolve(&landing.url, &target)?;
    trace!(step = "start-1", target = %target, "redirect");

    let resp = ctx.send(transport, HttpRequest::get(target)).await?;
    let target = script_location_target(&resp.text())
        .ok_or_else(|| PortalError::redirect("start-2", "no window.location.href literal"))?;
    let target = resolve(&resp.url, &target)?;
    trace!(step = "start-2", target = %target, "redirect");

    let resp = ctx.send(transport, HttpRequest::get(target)).await?;
    let href = {
        let doc = Html::parse_document(&resp.text());
        login_button_href(&doc)
    }
    .ok_or_else(|| PortalError::redirect("start-3", "no #logIn_btn link"))?;
    let target = resolve(&resp.url, &href)?;
    trace!(step = "start-3", target = %target, "redirect");

    Ok(target)
}

/// "final" hops: portal login-check URL to the authenticated start page.
///
/// Returns the session id carried by the last URL.
pub async fn final_redirects(
    transport: &dyn HttpTransport,
    ctx: &mut SessionContext,
    login_check: Url,
) -> Result<String> {
    let resp = ctx.send(transport, HttpRequest::get(login_check)).await?;
    let target = resp
        .header("Refresh")
        .and_then(refresh_header_target)
        .ok_or_else(|| PortalError::redirect("final-1", "no Refresh header on login check"))?;
    let target = resolve(&resp.url, &target)?;
    trace!(step = "final-1", target = %target, "redirect");

    let resp = ctx.send(transport, HttpRequest::get(target)).await?;
    let target = script_location_target(&resp.text())
        .ok_or_else(|| PortalError::redirect("final-2", "no window.location.href literal"))?;
    let target = resolve(&PORTAL_ORIGIN, &target)?;
    trace!(step = "final-2", target = %target, "redirect");

    arguments::session_id(&target)
        .ok_or_else(|| PortalError::redirect("final-2", "no session id in ARGUMENTS"))
}
