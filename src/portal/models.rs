//! Domain records produced by the portal client.

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use custom_debug_derive::Debug;
use serde::{Deserialize, Serialize};

pub type CourseCode = String;
pub type SemesterId = String;

/// Bucket for courses seen in a registration table but not yet in a semester catalog.
pub const UNKNOWN_SEMESTER: &str = "UNKNOWN";

/// Username and password for the identity provider. Never persisted by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub username: String,
    #[debug(with = crate::fmt::redacted)]
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// The three identity-provider cookies. Importing them skips the password step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdpSessionCredentials {
    #[debug(with = crate::fmt::redacted)]
    pub id_token: String,
    #[debug(with = crate::fmt::redacted)]
    pub id_token_aux1: String,
    #[debug(with = crate::fmt::redacted)]
    pub id_token_aux2: String,
}

/// The portal session id and its cookie. Only meaningful next to [`IdpSessionCredentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalSessionCredentials {
    #[debug(with = crate::fmt::redacted)]
    pub session_id: String,
    #[debug(with = crate::fmt::redacted)]
    pub session_cookie: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub matriculation_number: String,
    pub first_name: String,
    #[debug(skip_if = Option::is_none)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub major: String,
    pub username: String,
    pub date_of_birth: NaiveDate,
    pub country: String,
}

/// A course as listed in the catalog or a registration table.
///
/// `code` is unique within a semester bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub internal_id1: String,
    pub internal_id2: String,
    pub code: CourseCode,
    pub name: String,
    #[serde(default)]
    #[debug(skip_if = Option::is_none)]
    pub instructor: Option<String>,
    #[serde(default)]
    #[debug(skip_if = Option::is_none)]
    pub description: Option<String>,
    #[serde(default)]
    #[debug(skip_if = Option::is_none)]
    pub credits: Option<f64>,
    #[serde(default)]
    #[debug(skip_if = Option::is_none)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    #[debug(skip_if = Option::is_none)]
    pub end_date: Option<NaiveDate>,
}

impl Course {
    pub fn new(
        internal_id1: impl Into<String>,
        internal_id2: impl Into<String>,
        code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            internal_id1: internal_id1.into(),
            internal_id2: internal_id2.into(),
            code: code.into(),
            name: name.into(),
            instructor: None,
            description: None,
            credits: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Display title used for calendar entries, e.g. `"Linear Algebra (CH-123)"`.
    pub fn display_title(&self) -> String {
        format!("{} ({})", self.name, self.code)
    }
}

/// A single class meeting extracted from the weekly schedule grid.
///
/// `start` and `end` are wall-clock times in `time_zone`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarEvent {
    pub uid: String,
    pub title: String,
    #[debug(skip_if = Option::is_none)]
    pub location: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub time_zone: Tz,
    pub weekly_recurrence: bool,
}
