//! Client for the CampusNet portal and its identity provider.

pub mod arguments;
pub mod client;
pub mod cookies;
pub mod errors;
pub mod extract;
pub mod http;
pub mod models;
pub mod redirect;
pub mod session;

pub use client::CampusNetClient;
pub use errors::PortalError;
pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use models::{
    CalendarEvent, Course, IdpSessionCredentials, LoginCredentials, PortalSessionCredentials,
    UNKNOWN_SEMESTER, UserInfo,
};
pub use session::{AuthStatus, SessionContext};

use std::sync::LazyLock;
use url::Url;

/// Identity provider origin.
pub const IDP_ADDR: &str = "https://campusnet-dsf.constructor.university";
/// Portal (data tier) origin.
pub const PORTAL_ADDR: &str = "https://campusnet.constructor.university";
/// Every data request goes through this single script.
pub const ENTRYPOINT_PATH: &str = "/scripts/mgrqispi.dll";
/// Value of the `APPNAME` query parameter.
pub const APP_NAME: &str = "CampusNet";

/// Identity provider session cookie.
pub const IDP_TOKEN_COOKIE: &str = "idsrv";
pub const IDP_AUX1_COOKIE: &str = "idsrvC1";
pub const IDP_AUX2_COOKIE: &str = "idsrvC2";
/// Portal session cookie, scoped to the entrypoint.
pub const PORTAL_SESSION_COOKIE: &str = "cnsc";

pub(crate) static IDP_ORIGIN: LazyLock<Url> =
    LazyLock::new(|| Url::parse(IDP_ADDR).expect("identity provider origin is a valid URL"));
pub(crate) static PORTAL_ORIGIN: LazyLock<Url> =
    LazyLock::new(|| Url::parse(PORTAL_ADDR).expect("portal origin is a valid URL"));
pub(crate) static ENTRYPOINT: LazyLock<Url> = LazyLock::new(|| {
    PORTAL_ORIGIN
        .join(ENTRYPOINT_PATH)
        .expect("entrypoint path joins onto the portal origin")
});
