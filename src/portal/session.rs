//! Authentication state of a portal session and the transitions between states.
//!
//! ```text
//! NoAuth ──login──▶ PortalAuthenticated
//! IdpAuthenticated ──refresh──▶ PortalAuthenticated   (falls back to login)
//! ```
//!
//! All mutable session state (status, session id, cookies) lives in
//! [`SessionContext`]; the transitions take it explicitly.

use http::{StatusCode, header};
use html_scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, info, trace};
use url::Url;

use crate::portal::cookies::SessionCookies;
use crate::portal::errors::{PortalError, Result};
use crate::portal::http::{HttpRequest, HttpResponse, HttpTransport, cookie_header, resolve};
use crate::portal::models::{IdpSessionCredentials, LoginCredentials, PortalSessionCredentials};
use crate::portal::redirect;
use crate::portal::{
    ENTRYPOINT, IDP_AUX1_COOKIE, IDP_AUX2_COOKIE, IDP_ORIGIN, IDP_TOKEN_COOKIE,
    PORTAL_SESSION_COOKIE,
};

static VERIFICATION_TOKEN_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("input[name=__RequestVerificationToken]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    NoAuth,
    /// Identity provider cookies are present; the portal session still has to be derived.
    IdpAuthenticated,
    PortalAuthenticated,
}

/// Session id, cookies and authentication progress of one client.
#[derive(Debug, Clone)]
pub struct SessionContext {
    status: AuthStatus,
    session_id: Option<String>,
    cookies: SessionCookies,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            status: AuthStatus::NoAuth,
            session_id: None,
            cookies: SessionCookies::new(),
        }
    }

    /// Seeds a context from previously exported credentials.
    ///
    /// Portal credentials alone are rejected: a portal session only exists
    /// inside its identity provider session.
    pub fn import(
        idp: Option<&IdpSessionCredentials>,
        portal: Option<&PortalSessionCredentials>,
    ) -> Result<Self> {
        let mut ctx = Self::new();
        match (idp, portal) {
            (None, Some(_)) => return Err(PortalError::InvalidCredentialCombination),
            (None, None) => {}
            (Some(idp), portal) => {
                ctx.cookies
                    .insert(&IDP_ORIGIN, IDP_TOKEN_COOKIE, &idp.id_token);
                ctx.cookies
                    .insert(&IDP_ORIGIN, IDP_AUX1_COOKIE, &idp.id_token_aux1);
                ctx.cookies
                    .insert(&IDP_ORIGIN, IDP_AUX2_COOKIE, &idp.id_token_aux2);
                ctx.status = AuthStatus::IdpAuthenticated;

                if let Some(portal) = portal {
                    ctx.session_id = Some(portal.session_id.clone());
                    ctx.cookies
                        .insert(&ENTRYPOINT, PORTAL_SESSION_COOKIE, &portal.session_cookie);
                    ctx.status = AuthStatus::PortalAuthenticated;
                }
            }
        }
        Ok(ctx)
    }

    pub fn status(&self) -> AuthStatus {
        self.status
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn cookies(&self) -> &SessionCookies {
        &self.cookies
    }

    /// Identity provider cookies currently held. Fails if any of the three is absent.
    pub fn idp_credentials(&self) -> Result<IdpSessionCredentials> {
        let get = |name: &'static str| {
            self.cookies
                .get(&IDP_ORIGIN, name)
                .map(str::to_owned)
                .ok_or(PortalError::MissingCookie(name))
        };
        Ok(IdpSessionCredentials {
            id_token: get(IDP_TOKEN_COOKIE)?,
            id_token_aux1: get(IDP_AUX1_COOKIE)?,
            id_token_aux2: get(IDP_AUX2_COOKIE)?,
        })
    }

    /// Portal session id and cookie currently held.
    pub fn portal_credentials(&self) -> Result<PortalSessionCredentials> {
        let session_id = self
            .session_id
            .clone()
            .ok_or_else(|| PortalError::missing("session id"))?;
        let session_cookie = self
            .cookies
            .get(&ENTRYPOINT, PORTAL_SESSION_COOKIE)
            .map(str::to_owned)
            .ok_or(PortalError::MissingCookie(PORTAL_SESSION_COOKIE))?;
        Ok(PortalSessionCredentials {
            session_id,
            session_cookie,
        })
    }

    /// Marks the portal session as lost while keeping identity provider cookies.
    pub(crate) fn invalidate_portal(&mut self) {
        self.session_id = None;
        if self.status == AuthStatus::PortalAuthenticated {
            self.status = AuthStatus::IdpAuthenticated;
        }
    }

    fn authenticated(&mut self, session_id: String) {
        self.session_id = Some(session_id);
        self.status = AuthStatus::PortalAuthenticated;
    }

    /// Sends `request` with this session's cookies and records any cookies set by the response.
    pub(crate) async fn send(
        &mut self,
        transport: &dyn HttpTransport,
        mut request: HttpRequest,
    ) -> Result<HttpResponse> {
        if let Some(value) = cookie_header(&self.cookies.header_for(&request.url)) {
            request.headers.insert(header::COOKIE, value);
        }
        let resp = transport.send(request).await?;
        trace!(status = resp.status.as_u16(), url = %resp.url, "response");
        self.cookies.absorb(&resp.url, resp.set_cookies());
        Ok(resp)
    }
}

/// Drives login and refresh for one [`SessionContext`].
pub struct SessionMachine<'a> {
    transport: &'a dyn HttpTransport,
    ctx: &'a mut SessionContext,
    login: &'a LoginCredentials,
}

impl<'a> SessionMachine<'a> {
    pub fn new(
        transport: &'a dyn HttpTransport,
        ctx: &'a mut SessionContext,
        login: &'a LoginCredentials,
    ) -> Self {
        Self {
            transport,
            ctx,
            login,
        }
    }

    /// Brings the session to `PortalAuthenticated`, doing only as much work as its state needs.
    pub async fn ensure_session(&mut self) -> Result<()> {
        match self.ctx.status {
            AuthStatus::NoAuth => self.login(None).await,
            AuthStatus::IdpAuthenticated => self.refresh(None).await,
            AuthStatus::PortalAuthenticated => Ok(()),
        }
    }

    /// Full password login through the identity provider form.
    pub async fn login(&mut self, login_url: Option<Url>) -> Result<()> {
        let login_url = match login_url {
            Some(url) => url,
            None => redirect::start_page_redirect(self.transport, self.ctx).await?,
        };
        info!(username = %self.login.username, "logging in to identity provider");

        let resp = self.get(login_url).await?;
        let form_url = location(&resp, "login-1")?;
        trace!(step = "login-1", target = %form_url, "redirect");

        let resp = self.get(form_url.clone()).await?;
        let token = {
            let doc = Html::parse_document(&resp.text());
            doc.select(&VERIFICATION_TOKEN_SEL)
                .next()
                .and_then(|el| el.attr("value"))
                .map(str::to_owned)
        }
        .ok_or_else(|| PortalError::missing("__RequestVerificationToken"))?;

        let return_url = form_url
            .query_pairs()
            .find(|(k, _)| k == "ReturnUrl")
            .map(|(_, v)| v.into_owned())
            .ok_or_else(|| PortalError::redirect("login-2", "login form URL has no ReturnUrl"))?;

        let form = vec![
            ("ReturnUrl".to_owned(), return_url),
            ("CancelUrl".to_owned(), String::new()),
            ("Username".to_owned(), self.login.username.clone()),
            ("Password".to_owned(), self.login.password.clone()),
            ("__RequestVerificationToken".to_owned(), token),
            ("RememberLogin".to_owned(), "true".to_owned()),
            ("button".to_owned(), "login".to_owned()),
        ];
        let resp = self
            .ctx
            .send(self.transport, HttpRequest::post_form(form_url, form))
            .await?;
        if !resp.status.is_redirection() {
            return Err(PortalError::LoginRejected);
        }
        let target = location(&resp, "login-3")?;
        trace!(step = "login-3", target = %target, "redirect");

        let resp = self.get(target).await?;
        let login_check = location(&resp, "login-4")?;
        trace!(step = "login-4", target = %login_check, "redirect");

        self.finish(login_check).await
    }

    /// Re-derives a portal session from live identity provider cookies.
    ///
    /// The identity provider answers with a `302` when it still recognizes the
    /// session; anything else means the cookies are stale and a full login follows.
    pub async fn refresh(&mut self, login_url: Option<Url>) -> Result<()> {
        self.ctx.invalidate_portal();
        let login_url = match login_url {
            Some(url) => url,
            None => redirect::start_page_redirect(self.transport, self.ctx).await?,
        };

        let resp = self.get(login_url.clone()).await?;
        if resp.status != StatusCode::FOUND {
            debug!(
                status = resp.status.as_u16(),
                "identity provider session expired, falling back to login"
            );
            return self.login(Some(login_url)).await;
        }
        let login_check = location(&resp, "refresh")?;
        trace!(step = "refresh", target = %login_check, "redirect");

        self.finish(login_check).await
    }

    async fn finish(&mut self, login_check: Url) -> Result<()> {
        let session_id = redirect::final_redirects(self.transport, self.ctx, login_check).await?;
        self.ctx.authenticated(session_id);
        info!("portal session established");
        Ok(())
    }

    async fn get(&mut self, url: Url) -> Result<HttpResponse> {
        self.ctx.send(self.transport, HttpRequest::get(url)).await
    }
}

fn location(resp: &HttpResponse, step: &'static str) -> Result<Url> {
    let target = resp
        .header(header::LOCATION.as_str())
        .ok_or_else(|| PortalError::redirect(step, "no Location header"))?;
    resolve(&resp.url, target)
}
