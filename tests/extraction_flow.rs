//! Profile, course and schedule extraction through an authenticated client.

mod helpers;

use campusnet::cache::{Cache, InMemoryCache};
use campusnet::portal::{CampusNetClient, Course, UNKNOWN_SEMESTER};
use chrono::{NaiveDate, NaiveTime};
use helpers::*;

fn authenticated_client(
    transport: &ScriptedTransport,
    cache: InMemoryCache,
) -> CampusNetClient<InMemoryCache> {
    CampusNetClient::new(
        transport.boxed(),
        login_credentials(),
        cache,
        Some(&idp_credentials()),
        Some(&portal_credentials()),
    )
    .unwrap()
}

const PROFILE_PAGE: &str = r#"<html><body>
<table class="persaddrTbl">
  <tr><td>Matriculation number</td><td>30001234</td></tr>
  <tr><td>First name</td><td>Jane</td></tr>
  <tr><td>Middle name</td><td></td></tr>
  <tr><td>Last name</td><td>Doe</td></tr>
  <tr><td>Studies</td><td>Computer Science</td></tr>
  <tr><td>Username</td><td>JDOE</td></tr>
  <tr><td>Date of birth</td><td>02.03.2001</td></tr>
  <tr><td>First citizenship</td><td>Germany</td></tr>
</table></body></html>"#;

fn catalog_page(selected_spring: bool, rows: &[(&str, &str, &str)]) -> String {
    let selected = |yes: bool| if yes { r#" selected="selected""# } else { "" };
    let rows: String = rows
        .iter()
        .map(|(code, name, ids)| {
            format!(
                r#"<tr class="tbdata">
                  <td class="rw-profc-courseno">{code}</td>
                  <td class="rw-profc-coursename"><a class="link" href="/scripts/mgrqispi.dll?APPNAME=CampusNet&amp;PRGNAME=COURSEDETAILS&amp;ARGUMENTS=-N1,-N000092,-N0,{ids},-N0">{name}</a></td>
                  <td class="rw-profc-credits">5.0</td>
                </tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>
        <select id="semester" name="semester">
          <option value="999">All</option>
          <option value="000000015088000"{}>Spring 2025</option>
          <option value="000000015078000"{}>Fall 2024</option>
        </select>
        <table class="rw-table"><tr class="tbhead"><td>Course</td></tr>{rows}</table>
        </body></html>"#,
        selected(selected_spring),
        selected(!selected_spring),
    )
}

const REGISTRATIONS_PAGE: &str = r#"<html><body>
<table class="tb750">
  <thead><tr class="tbhead"><td>Accepted Registrations</td></tr></thead>
  <tbody><tr><td class="dl-inner">
    <a name="eventLink" href="/scripts/mgrqispi.dll?ARGUMENTS=-N1,-N000095,-N0,-N501,-N502">CH-230-A Programming in C and C++</a>
  </td></tr><tr><td class="dl-inner">
    <a name="eventLink" href="/scripts/mgrqispi.dll?ARGUMENTS=-N1,-N000095,-N0,-N701,-N702">JTLA-101 German Language Basics</a>
  </td></tr></tbody>
</table></body></html>"#;

fn scheduler_page() -> String {
    r#"<html><body><div id="weekTableRoomplan"><table>
      <tr><td class="tbcontrol" colspan="8">Week 07</td></tr>
      <tr><td class="fulltime">all day</td><td></td><td></td><td></td><td></td><td></td></tr>
      <tr>
        <td class="time">10:00</td>
        <td class="appointment" rowspan="6">
          <span class="timePeriod"><i>10:00 - 11:30</i><span class="arrow">Lecture Hall</span></span>
          <a class="link" href="/scripts/mgrqispi.dll?ARGUMENTS=-N1">CH-230-A</a>
        </td>
        <td></td><td></td><td></td><td></td>
      </tr>
    </table></div></body></html>"#
        .to_owned()
}

#[tokio::test]
async fn user_info_is_fetched_once() {
    let transport = ScriptedTransport::new();
    transport.route("profile", program("PERSADDRESS"), [Reply::html(PROFILE_PAGE)]);

    let mut client = authenticated_client(&transport, InMemoryCache::new());
    let info = client.user_info().await.unwrap();
    assert_eq!(info.matriculation_number, "30001234");
    assert_eq!(info.middle_name, None);
    assert_eq!(info.username, "jdoe");
    assert_eq!(
        info.date_of_birth,
        NaiveDate::from_ymd_opt(2001, 3, 2).unwrap()
    );

    let again = client.user_info().await.unwrap();
    assert_eq!(again, info);
    assert_eq!(transport.program_requests("PERSADDRESS").len(), 1);
    assert_eq!(client.cache().user_info(), Some(&info));
}

#[tokio::test]
async fn fetch_courses_reconciles_semesters() {
    let transport = ScriptedTransport::new();
    transport
        .route(
            "catalog-fall",
            |r| {
                program("PROFCOURSES")(r) && arguments(r).ends_with(",-N000000015078000")
            },
            [Reply::html(catalog_page(
                false,
                &[("JTLA-101", "German Language Basics", "-N701,-N702")],
            ))],
        )
        .route(
            "catalog",
            program("PROFCOURSES"),
            [Reply::html(catalog_page(
                true,
                &[("CH-230-A", "Programming in C and C++", "-N501,-N502")],
            ))],
        )
        .route(
            "registrations",
            program("MYREGISTRATIONS"),
            [Reply::html(REGISTRATIONS_PAGE)],
        );

    let mut cache = InMemoryCache::new();
    cache.assign_course(
        UNKNOWN_SEMESTER,
        Course::new("701", "702", "JTLA-101", "German Language Basics"),
    );

    let mut client = authenticated_client(&transport, cache);
    client.fetch_courses().await.unwrap();

    // The selected semester's page is reused; only Fall needs a second catalog request.
    let catalog = transport.program_requests("PROFCOURSES");
    assert_eq!(catalog.len(), 2);
    assert_eq!(
        arguments(&catalog[0]),
        format!("-N{},-N000092", portal_credentials().session_id)
    );

    let cache = client.cache();
    assert_eq!(cache.semester_for("CH-230-A"), Some("2025S"));
    assert_eq!(cache.semester_for("JTLA-101"), Some("2024F"));
    assert!(cache.data().courses[UNKNOWN_SEMESTER].is_empty());
    assert_eq!(cache.course("CH-230-A").unwrap().credits, Some(5.0));
    assert_eq!(cache.course("JTLA-101").unwrap().internal_id1, "701");
}

#[tokio::test]
async fn fetch_courses_files_unlisted_registrations_as_unknown() {
    let transport = ScriptedTransport::new();
    transport
        .route(
            "catalog",
            program("PROFCOURSES"),
            [Reply::html(catalog_page(true, &[]))],
        )
        .route(
            "registrations",
            program("MYREGISTRATIONS"),
            [Reply::html(REGISTRATIONS_PAGE)],
        );

    let mut client = authenticated_client(&transport, InMemoryCache::new());
    client.fetch_courses().await.unwrap();

    let cache = client.cache();
    assert_eq!(cache.semester_for("CH-230-A"), Some(UNKNOWN_SEMESTER));
    assert_eq!(cache.data().courses[UNKNOWN_SEMESTER].len(), 2);
    assert_eq!(
        cache.course("CH-230-A").unwrap().name,
        "Programming in C and C++"
    );
}

#[tokio::test]
async fn calendar_maps_columns_onto_pivot_week() {
    let transport = ScriptedTransport::new();
    transport.route("scheduler", program("SCHEDULER"), [Reply::html(scheduler_page())]);

    let mut cache = InMemoryCache::new();
    cache.assign_course(
        "2025S",
        Course::new("501", "502", "CH-230-A", "Programming in C and C++"),
    );
    let mut client = authenticated_client(&transport, cache);

    let week = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
    let pivot = NaiveDate::from_ymd_opt(2025, 2, 3).unwrap();
    let events = client.calendar(week, true, Some(pivot)).await.unwrap();

    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.title, "Programming in C and C++ (CH-230-A)");
    assert_eq!(event.start, pivot.and_time(NaiveTime::from_hms_opt(10, 0, 0).unwrap()));
    assert_eq!(event.end, pivot.and_time(NaiveTime::from_hms_opt(11, 30, 0).unwrap()));
    assert_eq!(event.location.as_deref(), Some("Lecture Hall"));
    assert_eq!(event.time_zone, chrono_tz::Europe::Berlin);
    assert!(event.weekly_recurrence);

    let sent = transport.program_requests("SCHEDULER");
    assert_eq!(
        arguments(&sent[0]),
        format!(
            "-N{},-N000093,-A10.02.2025,-A,-N1,-N0,-N0",
            portal_credentials().session_id
        )
    );
}

#[tokio::test]
async fn calendar_without_cached_course_uses_code() {
    let transport = ScriptedTransport::new();
    transport.route("scheduler", program("SCHEDULER"), [Reply::html(scheduler_page())]);

    let mut client = authenticated_client(&transport, InMemoryCache::new())
        .with_time_zone(chrono_tz::Europe::London);
    let week = NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
    let events = client.calendar(week, false, None).await.unwrap();

    assert_eq!(events[0].title, "CH-230-A");
    assert_eq!(events[0].start.date(), week);
    assert_eq!(events[0].time_zone, chrono_tz::Europe::London);
    assert!(!events[0].weekly_recurrence);
}
