//! Course catalog (`PROFCOURSES`) and registration (`MYREGISTRATIONS`) pages.
//!
//! Catalog pages are listed per semester and are authoritative; registration
//! tables only tell us a course exists, not when it runs. Reconciliation into
//! the cache follows "first known semester wins": once a code is filed under a
//! real semester, later sightings never move it again.

use html_scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, trace};

use crate::cache::Cache;
use crate::portal::arguments;
use crate::portal::errors::{PortalError, Result};
use crate::portal::extract::element_text;
use crate::portal::http::resolve;
use crate::portal::models::{Course, SemesterId, UNKNOWN_SEMESTER};
use crate::portal::PORTAL_ORIGIN;

/// Option value of the synthetic "All" semester entry.
const ALL_SEMESTERS_VALUE: &str = "999";

/// Registration tables worth reading; the page carries others (e.g. rejected).
const REGISTRATION_TABLES: [&str; 2] = ["Pending Registrations", "Accepted Registrations"];

static SEMESTER_OPTION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#semester > option").unwrap());
static CATALOG_ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".rw-table tr.tbdata").unwrap());
static COURSE_NO_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".rw-profc-courseno").unwrap());
static COURSE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".rw-profc-coursename > .link").unwrap());
static CREDITS_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".rw-profc-credits").unwrap());
static REG_TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".tb750").unwrap());
static REG_HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("thead > tr.tbhead > td").unwrap());
static REG_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tbody > tr > .dl-inner a[name=eventLink]").unwrap());

/// An entry of the catalog's semester dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemesterOption {
    /// Portal-internal semester number, passed back as `-N<value>`.
    pub value: String,
    pub name: String,
    pub semester_id: SemesterId,
    /// The loaded page already shows this semester.
    pub selected: bool,
}

/// `"Spring 2025"` → `"2025S"`, `"Fall 2024"` → `"2024F"`.
///
/// The season letter comes from the first word and the year from the last
/// all-digit word, so extra words such as `"Spring Term 2025"` are tolerated.
pub fn semester_id_from_name(name: &str) -> Option<SemesterId> {
    let mut words = name.split_whitespace();
    let season = words.next()?.chars().next()?;
    let year = words
        .filter(|w| w.chars().all(|c| c.is_ascii_digit()))
        .last()?;
    Some(format!("{year}{}", season.to_ascii_uppercase()))
}

pub fn parse_semester_options(doc: &Html) -> Result<Vec<SemesterOption>> {
    let mut options = Vec::new();
    for el in doc.select(&SEMESTER_OPTION_SEL) {
        let value = el.attr("value").unwrap_or_default().trim().to_owned();
        if value == ALL_SEMESTERS_VALUE {
            continue;
        }
        let name = element_text(el);
        let semester_id =
            semester_id_from_name(&name).ok_or_else(|| PortalError::InvalidField {
                field: "semester name",
                value: name.clone(),
            })?;
        options.push(SemesterOption {
            value,
            name,
            semester_id,
            selected: el.attr("selected").is_some(),
        });
    }
    Ok(options)
}

/// Internal id pair carried at positions 3 and 4 of a course link's `ARGUMENTS`.
pub fn course_link_ids(href: &str) -> Result<(String, String)> {
    let url = resolve(&PORTAL_ORIGIN, href)?;
    let args = arguments::parse(&url).unwrap_or_default();
    match (args.get(3), args.get(4)) {
        (Some(a), Some(b)) => Ok((
            arguments::strip_prefix(a).to_owned(),
            arguments::strip_prefix(b).to_owned(),
        )),
        _ => Err(PortalError::InvalidField {
            field: "course link ARGUMENTS",
            value: href.to_owned(),
        }),
    }
}

fn select_required<'a>(
    row: ElementRef<'a>,
    sel: &Selector,
    field: &str,
) -> Result<ElementRef<'a>> {
    row.select(sel)
        .next()
        .ok_or_else(|| PortalError::missing(field))
}

/// Course rows of one semester's catalog page. Unparseable credits count as `0`.
pub fn parse_catalog_rows(doc: &Html) -> Result<Vec<Course>> {
    let mut courses = Vec::new();
    for row in doc.select(&CATALOG_ROW_SEL) {
        let code = element_text(select_required(row, &COURSE_NO_SEL, "course number")?);
        let link = select_required(row, &COURSE_LINK_SEL, "course link")?;
        let name = element_text(link);
        let (id1, id2) = course_link_ids(link.attr("href").unwrap_or_default())?;
        let credits = element_text(select_required(row, &CREDITS_SEL, "course credits")?)
            .parse::<f64>()
            .unwrap_or(0.0);

        let mut course = Course::new(id1, id2, code, name);
        course.credits = Some(credits);
        courses.push(course);
    }
    Ok(courses)
}

/// Courses linked from the pending and accepted registration tables.
pub fn parse_registrations(doc: &Html) -> Result<Vec<Course>> {
    let mut courses = Vec::new();
    for table in doc.select(&REG_TABLE_SEL) {
        let heading = element_text(select_required(table, &REG_HEADING_SEL, "registration table heading")?);
        if !REGISTRATION_TABLES.contains(&heading.as_str()) {
            trace!(heading = %heading, "skipping registration table");
            continue;
        }
        for link in table.select(&REG_LINK_SEL) {
            let (id1, id2) = course_link_ids(link.attr("href").unwrap_or_default())?;
            let text = element_text(link);
            let (code, name) = text
                .split_once(' ')
                .ok_or_else(|| PortalError::InvalidField {
                    field: "registration link text",
                    value: text.clone(),
                })?;
            courses.push(Course::new(id1, id2, code, name.trim()));
        }
    }
    Ok(courses)
}

/// Files catalog courses under `semester`, unless already filed under a known semester.
pub fn merge_catalog<C: Cache + ?Sized>(cache: &mut C, semester: &str, courses: Vec<Course>) {
    let mut added = 0usize;
    for course in courses {
        if is_resolved(cache, &course.code) {
            continue;
        }
        cache.assign_course(semester, course);
        added += 1;
    }
    debug!(semester, added, "merged catalog courses");
}

/// Files registered courses under the UNKNOWN bucket when no semester is known for them.
pub fn merge_registrations<C: Cache + ?Sized>(cache: &mut C, courses: Vec<Course>) {
    for course in courses {
        if is_resolved(cache, &course.code) {
            continue;
        }
        cache.assign_course(UNKNOWN_SEMESTER, course);
    }
}

fn is_resolved<C: Cache + ?Sized>(cache: &C, code: &str) -> bool {
    cache
        .semester_for(code)
        .is_some_and(|semester| semester != UNKNOWN_SEMESTER)
}
