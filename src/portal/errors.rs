//! Error types for the CampusNet portal client.

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// An expected redirect marker was missing from a response.
    #[error("redirect marker missing at step '{step}': {detail}")]
    RedirectParse { step: &'static str, detail: String },
    /// Portal session credentials were supplied without their identity-provider session.
    #[error("portal session credentials require identity provider credentials")]
    InvalidCredentialCombination,
    /// The portal kept denying access after one re-authentication.
    #[error("access still denied after refreshing the portal session")]
    SessionRefreshFailed,
    /// The identity provider answered the login form with a page instead of a redirect.
    #[error("identity provider rejected the login credentials")]
    LoginRejected,
    #[error("required field '{0}' is missing from the page")]
    MissingField(String),
    #[error("field '{field}' has an unparseable value: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("cookie '{0}' is not present in the session")]
    MissingCookie(&'static str),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    InvalidUrl(#[from] url::ParseError),
    #[error("cache operation failed")]
    Cache(#[source] anyhow::Error),
}

impl PortalError {
    pub(crate) fn redirect(step: &'static str, detail: impl Into<String>) -> Self {
        Self::RedirectParse {
            step,
            detail: detail.into(),
        }
    }

    pub(crate) fn missing(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }
}

pub type Result<T, E = PortalError> = std::result::Result<T, E>;
