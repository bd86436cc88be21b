//! Scripted portal and identity provider for integration tests.
//!
//! Routes are matched in registration order. Each route replies from a queue;
//! the last reply of a queue repeats forever. Every request is recorded so
//! tests can assert on what was (and was not) sent.

#![allow(dead_code)]

use async_trait::async_trait;
use campusnet::portal::errors::Result;
use campusnet::portal::{
    HttpRequest, HttpResponse, HttpTransport, IdpSessionCredentials, LoginCredentials,
    PortalSessionCredentials,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

pub const IDP: &str = "https://campusnet-dsf.constructor.university";
pub const PORTAL: &str = "https://campusnet.constructor.university";
pub const ENTRYPOINT: &str = "https://campusnet.constructor.university/scripts/mgrqispi.dll";

/// Session id handed out by the scripted login check.
pub const SESSION_ID: &str = "123456789012345";
pub const PORTAL_COOKIE: &str = "fresh-cnsc";

pub fn authorize_url() -> String {
    format!("{IDP}/connect/authorize?client_id=ClassicWeb&response_type=code")
}

pub fn login_credentials() -> LoginCredentials {
    LoginCredentials::new("jdoe", "hunter2")
}

pub fn idp_credentials() -> IdpSessionCredentials {
    IdpSessionCredentials {
        id_token: "stored-idsrv".to_owned(),
        id_token_aux1: "stored-c1".to_owned(),
        id_token_aux2: "stored-c2".to_owned(),
    }
}

pub fn portal_credentials() -> PortalSessionCredentials {
    PortalSessionCredentials {
        session_id: "111111111111111".to_owned(),
        session_cookie: "stored-cnsc".to_owned(),
    }
}

#[derive(Debug, Clone)]
pub struct Reply {
    status: StatusCode,
    headers: Vec<(&'static str, String)>,
    body: Vec<u8>,
}

impl Reply {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("content-type", "text/html; charset=utf-8".to_owned())],
            body: body.into().into_bytes(),
        }
    }

    /// Body encoded as UTF-16 little endian with a byte order mark, like the portal landing page.
    pub fn utf16(body: &str) -> Self {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in body.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        Self {
            status: StatusCode::OK,
            headers: vec![("content-type", "text/html; charset=utf-16".to_owned())],
            body: bytes,
        }
    }

    pub fn redirect(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            headers: vec![("location", location.into())],
            body: Vec::new(),
        }
    }

    pub fn refresh(target: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: vec![("refresh", format!("0; URL={}", target.into()))],
            body: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn with_cookie(mut self, set_cookie: impl Into<String>) -> Self {
        self.headers.push(("set-cookie", set_cookie.into()));
        self
    }

    fn into_response(self, request: &HttpRequest) -> HttpResponse {
        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            headers.append(
                HeaderName::from_static(name),
                HeaderValue::from_str(&value).unwrap(),
            );
        }
        HttpResponse {
            status: self.status,
            url: request.url.clone(),
            headers,
            body: self.body,
        }
    }
}

type Matcher = Box<dyn Fn(&HttpRequest) -> bool + Send + Sync>;

struct Route {
    name: String,
    matches: Matcher,
    replies: VecDeque<Reply>,
}

#[derive(Default)]
struct Inner {
    routes: Vec<Route>,
    requests: Vec<HttpRequest>,
}

/// In-memory stand-in for both servers. Clones share routes and the request log.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(
        &self,
        name: impl Into<String>,
        matches: impl Fn(&HttpRequest) -> bool + Send + Sync + 'static,
        replies: impl IntoIterator<Item = Reply>,
    ) -> &Self {
        let replies: VecDeque<Reply> = replies.into_iter().collect();
        assert!(!replies.is_empty(), "route needs at least one reply");
        self.inner.lock().unwrap().routes.push(Route {
            name: name.into(),
            matches: Box::new(matches),
            replies,
        });
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Requests sent to portal program `program`.
    pub fn program_requests(&self, program: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| query(r, "PRGNAME").as_deref() == Some(program))
            .collect()
    }

    pub fn posts(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.method == Method::POST)
            .count()
    }

    pub fn boxed(&self) -> Box<dyn HttpTransport> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push(request.clone());

        let route = inner
            .routes
            .iter_mut()
            .find(|route| (route.matches)(&request))
            .unwrap_or_else(|| panic!("no scripted route for {} {}", request.method, request.url));
        let reply = if route.replies.len() > 1 {
            route.replies.pop_front().unwrap()
        } else {
            route.replies[0].clone()
        };
        tracing::trace!(route = %route.name, url = %request.url, "scripted reply");
        Ok(reply.into_response(&request))
    }
}

pub fn query(request: &HttpRequest, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// `ARGUMENTS` of a recorded entrypoint request.
pub fn arguments(request: &HttpRequest) -> String {
    query(request, "ARGUMENTS").unwrap_or_default()
}

pub fn cookie_header(request: &HttpRequest) -> String {
    request
        .headers
        .get(http::header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_owned()
}

pub fn path(expected: &'static str) -> impl Fn(&HttpRequest) -> bool + Send + Sync {
    move |r| r.url.path() == expected
}

pub fn program(name: &'static str) -> impl Fn(&HttpRequest) -> bool + Send + Sync {
    move |r| {
        r.url.path() == "/scripts/mgrqispi.dll" && query(r, "PRGNAME").as_deref() == Some(name)
    }
}

pub fn has_cookie(request: &HttpRequest, name: &str) -> bool {
    cookie_header(request)
        .split("; ")
        .any(|pair| pair.split_once('=').is_some_and(|(n, _)| n == name))
}

pub fn access_denied_page() -> String {
    format!(
        r#"<html><body><div id="pageContent"><h1>Access denied</h1>
        <p>Your session has expired.</p>
        <a id="logIn_btn" class="img_arrowLogin" href="{}">Log in</a></div></body></html>"#,
        authorize_url()
    )
}

/// Landing page, external start page and the anonymous start page that carries the login button.
pub fn mount_start_page(transport: &ScriptedTransport) {
    transport
        .route(
            "landing",
            |r| r.url.as_str() == format!("{PORTAL}/"),
            [Reply::utf16(
                r#"<html><head><meta http-equiv="refresh" content="0; URL=/scripts/mgrqispi.dll?APPNAME=CampusNet&amp;PRGNAME=EXTERNALPAGES&amp;ARGUMENTS=-N000000000000001,-N000344,-Awelcome" /></head></html>"#,
            )],
        )
        .route(
            "external-pages",
            program("EXTERNALPAGES"),
            [Reply::html(
                "<html><head><script type=\"text/javascript\">\n  window.location.href = '/scripts/mgrqispi.dll?APPNAME=CampusNet&PRGNAME=STARTPAGE_DISPATCH&ARGUMENTS=-N000000000000001';\n</script></head></html>",
            )],
        )
        .route(
            "start-page",
            program("STARTPAGE_DISPATCH"),
            [Reply::html(format!(
                r#"<html><body><a id="logIn_btn" href="{}">Log in</a></body></html>"#,
                authorize_url()
            ))],
        );
}

/// Authorize endpoint with live cookies, login check, and the dispatch to the authenticated start page.
pub fn mount_portal_login_check(transport: &ScriptedTransport) {
    let login_check = format!(
        "{ENTRYPOINT}?APPNAME=CampusNet&PRGNAME=LOGINCHECK&ARGUMENTS=-N000000000000001,-N000324,-Auser"
    );
    transport
        .route(
            "authorize-with-session",
            |r| r.url.path() == "/connect/authorize" && has_cookie(r, "idsrv"),
            [Reply::redirect(login_check)],
        )
        .route(
            "login-check",
            program("LOGINCHECK"),
            [Reply::refresh(
                "/scripts/mgrqispi.dll?APPNAME=CampusNet&PRGNAME=REDIRECTLOGIN&ARGUMENTS=-N000000000000001",
            )
            .with_cookie(format!("cnsc={PORTAL_COOKIE}; path=/scripts/; secure; HttpOnly"))],
        )
        .route(
            "redirect-login",
            program("REDIRECTLOGIN"),
            [Reply::html(format!(
                "<html><head><script>\nwindow.location.href = '/scripts/mgrqispi.dll?APPNAME=CampusNet&PRGNAME=MLSSTART&ARGUMENTS=-N{SESSION_ID},-N000019,';\n</script></head></html>"
            ))],
        );
}

/// Password login form of the identity provider. `accept` decides whether the POST redirects.
pub fn mount_idp_login(transport: &ScriptedTransport, accept: bool) {
    let form_path = "/Account/Login?ReturnUrl=%2Fconnect%2Fauthorize%2Fcallback%3Fclient_id%3DClassicWeb";
    let form_page = Reply::html(
        r#"<html><body><form method="post">
        <input name="Username" /><input name="Password" type="password" />
        <input name="__RequestVerificationToken" type="hidden" value="csrf-token-42" />
        <button name="button" value="login">Login</button>
        </form></body></html>"#,
    );
    let post_reply = if accept {
        Reply::redirect("/connect/authorize/callback?client_id=ClassicWeb")
            .with_cookie("idsrv=fresh-idsrv; path=/; secure; httponly")
            .with_cookie("idsrvC1=fresh-c1; path=/; secure; httponly")
            .with_cookie("idsrvC2=fresh-c2; path=/; secure; httponly")
    } else {
        form_page.clone()
    };

    transport
        .route(
            "login-post",
            |r| r.method == Method::POST && r.url.path() == "/Account/Login",
            [post_reply],
        )
        .route("login-form", path("/Account/Login"), [form_page])
        .route(
            "authorize-callback",
            path("/connect/authorize/callback"),
            [Reply::redirect(format!(
                "{ENTRYPOINT}?APPNAME=CampusNet&PRGNAME=LOGINCHECK&ARGUMENTS=-N000000000000001,-N000324,-Auser"
            ))],
        )
        .route(
            "authorize-anonymous",
            path("/connect/authorize"),
            [Reply::redirect(form_path)],
        );
}

/// Everything a full login from scratch needs.
pub fn mount_full_login(transport: &ScriptedTransport) {
    mount_start_page(transport);
    mount_portal_login_check(transport);
    mount_idp_login(transport, true);
}
