//! Weekly schedule grid (`SCHEDULER` program).
//!
//! The grid is a table with one row per time slot. A row's first cell says
//! what kind of row it is; only `time` rows carry appointments. Day columns
//! follow, Monday first, so the column index is the day offset from the pivot.

use chrono::{Duration, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use html_scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::warn;

use crate::cache::Cache;
use crate::portal::errors::{PortalError, Result};
use crate::portal::extract::element_text;
use crate::portal::models::CalendarEvent;

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("#weekTableRoomplan > table tr").unwrap());
static TIME_PERIOD_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".timePeriod > i").unwrap());
static LOCATION_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".timePeriod > .arrow").unwrap());

/// How the weekly grid is turned into events.
#[derive(Debug, Clone, Copy)]
pub struct GridOptions {
    /// Date of the first day column.
    pub pivot: NaiveDate,
    pub repeat: bool,
    pub time_zone: Tz,
}

/// One appointment cell before course titles are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appointment {
    pub day_offset: usize,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub course_code: String,
    pub location: Option<String>,
}

fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

fn child_elements<'a>(el: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

/// `"10:00 - 11:30"` → `(10:00, 11:30)`.
pub fn parse_time_range(text: &str) -> Result<(NaiveTime, NaiveTime)> {
    let invalid = || PortalError::InvalidField {
        field: "appointment time range",
        value: text.to_owned(),
    };
    let (start, end) = text.split_once(" - ").ok_or_else(invalid)?;
    let parse = |s: &str| NaiveTime::parse_from_str(s.trim(), "%H:%M").map_err(|_| invalid());
    Ok((parse(start)?, parse(end)?))
}

/// Appointments of every time-slot row. Control and full-day rows are skipped
/// silently, anything else unexpected is logged and skipped.
///
/// `day_offset` is the cell's position among the row's day cells. Cells hidden
/// by a `rowspan` from an earlier row are absent from the markup, so offsets are
/// only reliable while no appointment spans into the row being read.
pub fn parse_appointments(doc: &Html) -> Result<Vec<Appointment>> {
    let mut appointments = Vec::new();

    for row in doc.select(&ROW_SEL) {
        let Some(first) = child_elements(row).next() else {
            continue;
        };
        if has_class(first, "tbcontrol") || has_class(first, "fulltime") {
            continue;
        }
        if !has_class(first, "time") {
            warn!(row = %row.html(), "unexpected row in weekly schedule");
            continue;
        }

        let day_cells = child_elements(row).filter(|c| c.value().name() == "td" && !has_class(*c, "time"));
        for (day_offset, cell) in day_cells.enumerate() {
            if !has_class(cell, "appointment") {
                continue;
            }

            let time_el = cell
                .select(&TIME_PERIOD_SEL)
                .next()
                .ok_or_else(|| PortalError::missing("appointment time period"))?;
            let (start, end) = parse_time_range(&element_text(time_el))?;

            let course_code = child_elements(cell)
                .find(|c| c.value().name() == "a" && has_class(*c, "link"))
                .map(element_text)
                .ok_or_else(|| PortalError::missing("appointment course link"))?;

            let location = cell
                .select(&LOCATION_SEL)
                .next()
                .map(element_text)
                .filter(|l| !l.is_empty());

            appointments.push(Appointment {
                day_offset,
                start,
                end,
                course_code,
                location,
            });
        }
    }

    Ok(appointments)
}

/// Turns appointments into events, resolving course titles through the cache.
pub fn build_events<C: Cache + ?Sized>(
    appointments: Vec<Appointment>,
    cache: &C,
    options: GridOptions,
) -> Vec<CalendarEvent> {
    appointments
        .into_iter()
        .map(|a| {
            let day = options.pivot + Duration::days(a.day_offset as i64);
            let title = cache
                .course(&a.course_code)
                .map(|course| course.display_title())
                .unwrap_or(a.course_code);
            CalendarEvent {
                uid: ulid::Ulid::new().to_string(),
                title,
                location: a.location,
                start: day.and_time(a.start),
                end: day.and_time(a.end),
                time_zone: options.time_zone,
                weekly_recurrence: options.repeat,
            }
        })
        .collect()
}
