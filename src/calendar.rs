//! iCalendar (RFC 5545) output for extracted schedule events.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::portal::models::CalendarEvent;

const PRODUCT_ID: &str = concat!("-//campusnet//campusnet ", env!("CARGO_PKG_VERSION"), "//EN");

/// Escapes TEXT values: backslash, semicolon, comma and newlines.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Folds content lines longer than 75 octets, never splitting a character.
fn fold_line(line: &str, out: &mut String) {
    let mut width = 0;
    for c in line.chars() {
        let len = c.len_utf8();
        if width + len > 75 {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += len;
    }
    out.push_str("\r\n");
}

fn local_stamp(dt: NaiveDateTime) -> String {
    dt.format("%Y%m%dT%H%M%S").to_string()
}

/// Serializes `events` into a single `VCALENDAR` document.
///
/// Times are written as local times with a `TZID` parameter; calendar clients
/// resolve the IANA zone name themselves.
pub fn to_ics(events: &[CalendarEvent], stamp: DateTime<Utc>) -> String {
    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        format!("PRODID:{PRODUCT_ID}"),
        "CALSCALE:GREGORIAN".to_string(),
    ];
    let dtstamp = stamp.format("%Y%m%dT%H%M%SZ").to_string();

    for event in events {
        let tz = event.time_zone.name();
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:{}", event.uid));
        lines.push(format!("DTSTAMP:{dtstamp}"));
        lines.push(format!("DTSTART;TZID={tz}:{}", local_stamp(event.start)));
        lines.push(format!("DTEND;TZID={tz}:{}", local_stamp(event.end)));
        lines.push(format!("SUMMARY:{}", escape_text(&event.title)));
        if let Some(location) = &event.location {
            lines.push(format!("LOCATION:{}", escape_text(location)));
        }
        if event.weekly_recurrence {
            lines.push("RRULE:FREQ=WEEKLY".to_string());
        }
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        fold_line(line, &mut out);
    }
    out
}
