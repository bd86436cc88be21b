//! HTML to domain record extraction for the fixed set of portal pages.
//!
//! Extractors take an already parsed document and never touch the network,
//! so the client can drop each [`html_scraper::Html`] before its next await.

pub mod calendar;
pub mod courses;
pub mod profile;

use html_scraper::ElementRef;

/// `day.month.year`, used for dates of birth and schedule week arguments.
pub const DATE_FORMAT: &str = "%d.%m.%Y";

/// Concatenated, trimmed text content of an element.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}
