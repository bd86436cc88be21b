//! Authenticated access to portal programs and the data built on top of them.

use chrono::NaiveDate;
use chrono_tz::Tz;
use html_scraper::Html;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cache::Cache;
use crate::portal::errors::{PortalError, Result};
use crate::portal::extract::calendar::{self, GridOptions};
use crate::portal::extract::{DATE_FORMAT, courses, profile};
use crate::portal::http::{HttpRequest, HttpTransport, ReqwestTransport};
use crate::portal::models::{
    CalendarEvent, IdpSessionCredentials, LoginCredentials, PortalSessionCredentials, UserInfo,
};
use crate::portal::session::{AuthStatus, SessionContext, SessionMachine};
use crate::portal::{APP_NAME, ENTRYPOINT, arguments, redirect};
use crate::utils::log_if_slow;

/// Default time zone of the portal's schedule.
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::Europe::Berlin;

/// Marker of the portal's access-denied page.
const ACCESS_DENIED_MARKER: &str = "<h1>Access denied</h1>";

/// Re-authentications allowed per data request. The portal should never deny
/// twice in a row after a successful refresh.
const MAX_REFRESHES_PER_REQUEST: usize = 1;

const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(2);

/// Program names and constant arguments of the pages the client reads.
mod programs {
    pub const PROFILE: (&str, &[&str]) = ("PERSADDRESS", &["-N000068", "-A"]);
    pub const CATALOG: (&str, &[&str]) = ("PROFCOURSES", &["-N000092"]);
    pub const REGISTRATIONS: (&str, &[&str]) = ("MYREGISTRATIONS", &["-N000095", "-N0"]);
    pub const SCHEDULER: &str = "SCHEDULER";
    pub const SCHEDULER_MENU: &str = "-N000093";
    pub const SCHEDULER_TRAILER: &[&str] = &["-A", "-N1", "-N0", "-N0"];
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_owned()).collect()
}

/// A CampusNet client: one session, one cache, strictly sequential requests.
pub struct CampusNetClient<C: Cache> {
    transport: Box<dyn HttpTransport>,
    login: LoginCredentials,
    session: SessionContext,
    cache: C,
    time_zone: Tz,
}

impl<C: Cache> CampusNetClient<C> {
    /// Creates a client over `reqwest` and brings its session up, reusing stored credentials when given.
    pub async fn create(
        login: LoginCredentials,
        cache: C,
        idp: Option<IdpSessionCredentials>,
        portal: Option<PortalSessionCredentials>,
    ) -> Result<Self> {
        let transport = Box::new(ReqwestTransport::new()?);
        let mut client = Self::new(transport, login, cache, idp.as_ref(), portal.as_ref())?;
        client.ensure_session().await?;
        Ok(client)
    }

    /// Creates a client without touching the network.
    ///
    /// Fails with [`PortalError::InvalidCredentialCombination`] when `portal`
    /// is given without `idp`.
    pub fn new(
        transport: Box<dyn HttpTransport>,
        login: LoginCredentials,
        cache: C,
        idp: Option<&IdpSessionCredentials>,
        portal: Option<&PortalSessionCredentials>,
    ) -> Result<Self> {
        let session = SessionContext::import(idp, portal)?;
        debug!(status = ?session.status(), "session imported");
        Ok(Self {
            transport,
            login,
            session,
            cache,
            time_zone: DEFAULT_TIME_ZONE,
        })
    }

    pub fn with_time_zone(mut self, time_zone: Tz) -> Self {
        self.time_zone = time_zone;
        self
    }

    pub fn status(&self) -> AuthStatus {
        self.session.status()
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    pub fn into_cache(self) -> C {
        self.cache
    }

    fn machine(&mut self) -> SessionMachine<'_> {
        SessionMachine::new(self.transport.as_ref(), &mut self.session, &self.login)
    }

    /// Brings the session to `PortalAuthenticated`.
    pub async fn ensure_session(&mut self) -> Result<()> {
        self.machine().ensure_session().await
    }

    /// Identity provider cookies, logging in first if there are none yet.
    pub async fn idp_credentials(&mut self) -> Result<IdpSessionCredentials> {
        if self.session.status() == AuthStatus::NoAuth {
            self.machine().login(None).await?;
        }
        self.session.idp_credentials()
    }

    /// Portal session id and cookie, establishing the session first if needed.
    pub async fn portal_credentials(&mut self) -> Result<PortalSessionCredentials> {
        self.ensure_session().await?;
        self.session.portal_credentials()
    }

    /// Runs portal program `program` with positional `args` and parses the page.
    ///
    /// An access-denied page triggers one session refresh and one retry of the
    /// identical request; a second denial fails with
    /// [`PortalError::SessionRefreshFailed`].
    pub async fn request(&mut self, program: &str, args: &[String]) -> Result<Html> {
        self.ensure_session().await?;

        let mut refreshes = 0;
        loop {
            let session_id = self
                .session
                .session_id()
                .ok_or_else(|| PortalError::missing("session id"))?;
            let mut url = ENTRYPOINT.clone();
            url.query_pairs_mut()
                .append_pair("APPNAME", APP_NAME)
                .append_pair("PRGNAME", program)
                .append_pair("ARGUMENTS", &arguments::encode(session_id, args));

            debug!(program, attempt = refreshes + 1, "portal request");
            let start = Instant::now();
            let resp = self
                .session
                .send(self.transport.as_ref(), HttpRequest::get(url))
                .await?;
            log_if_slow(start, SLOW_REQUEST_THRESHOLD, program);

            let body = resp.text();
            if !body.contains(ACCESS_DENIED_MARKER) {
                return Ok(Html::parse_document(&body));
            }

            if refreshes >= MAX_REFRESHES_PER_REQUEST {
                warn!(program, "access denied again after refresh");
                return Err(PortalError::SessionRefreshFailed);
            }
            refreshes += 1;

            info!(program, "access denied, refreshing portal session");
            let login_url = {
                let doc = Html::parse_document(&body);
                redirect::login_button_href(&doc)
            }
            .ok_or_else(|| PortalError::redirect("access-denied", "no #logIn_btn link"))?;
            let login_url = resp.url.join(&login_url)?;
            self.machine().refresh(Some(login_url)).await?;
        }
    }

    async fn request_program(&mut self, (program, args): (&str, &[&str])) -> Result<Html> {
        self.request(program, &owned(args)).await
    }

    /// Profile of the logged-in user, fetched once and then served from the cache.
    pub async fn user_info(&mut self) -> Result<UserInfo> {
        if let Some(info) = self.cache.user_info() {
            return Ok(info.clone());
        }

        let info = {
            let doc = self.request_program(programs::PROFILE).await?;
            profile::parse_user_info(&doc)?
        };

        self.cache.set_user_info(info.clone());
        self.cache.save().await.map_err(PortalError::Cache)?;
        info!(username = %info.username, "profile cached");
        Ok(info)
    }

    /// Refreshes the cached course list from every catalog semester and the registration tables.
    pub async fn fetch_courses(&mut self) -> Result<()> {
        let (options, initial_rows) = {
            let doc = self.request_program(programs::CATALOG).await?;
            (
                courses::parse_semester_options(&doc)?,
                courses::parse_catalog_rows(&doc)?,
            )
        };

        let mut initial_rows = Some(initial_rows);
        for option in options {
            let rows = match (option.selected, initial_rows.take()) {
                (true, Some(rows)) => rows,
                (_, leftover) => {
                    initial_rows = leftover;
                    let mut args = owned(programs::CATALOG.1);
                    args.push(format!("-N{}", option.value));
                    let doc = self.request(programs::CATALOG.0, &args).await?;
                    courses::parse_catalog_rows(&doc)?
                }
            };
            debug!(
                semester = %option.semester_id,
                name = %option.name,
                rows = rows.len(),
                "catalog semester"
            );
            courses::merge_catalog(&mut self.cache, &option.semester_id, rows);
        }

        let registered = {
            let doc = self.request_program(programs::REGISTRATIONS).await?;
            courses::parse_registrations(&doc)?
        };
        courses::merge_registrations(&mut self.cache, registered);

        self.cache.save().await.map_err(PortalError::Cache)?;
        info!(
            courses = self.cache.data().course_to_semester.len(),
            "course cache updated"
        );
        Ok(())
    }

    /// Events of the week containing `week`, dated from `pivot` (defaults to `week`).
    ///
    /// With `repeat`, every event recurs weekly.
    pub async fn calendar(
        &mut self,
        week: NaiveDate,
        repeat: bool,
        pivot: Option<NaiveDate>,
    ) -> Result<Vec<CalendarEvent>> {
        let pivot = pivot.unwrap_or(week);

        let mut args = vec![
            programs::SCHEDULER_MENU.to_owned(),
            format!("-A{}", week.format(DATE_FORMAT)),
        ];
        args.extend(owned(programs::SCHEDULER_TRAILER));

        let appointments = {
            let doc = self.request(programs::SCHEDULER, &args).await?;
            calendar::parse_appointments(&doc)?
        };
        let events = calendar::build_events(
            appointments,
            &self.cache,
            GridOptions {
                pivot,
                repeat,
                time_zone: self.time_zone,
            },
        );
        info!(%week, %pivot, events = events.len(), "schedule extracted");
        Ok(events)
    }
}
