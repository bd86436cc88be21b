//! Personal data table (`PERSADDRESS` program).

use chrono::NaiveDate;
use html_scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::portal::errors::{PortalError, Result};
use crate::portal::extract::{DATE_FORMAT, element_text};
use crate::portal::models::UserInfo;

static TABLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table.persaddrTbl").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());

/// Label → value map of the two-cell rows of the profile table.
fn profile_fields(doc: &Html) -> Result<HashMap<String, String>> {
    let table = doc
        .select(&TABLE_SEL)
        .next()
        .ok_or_else(|| PortalError::missing("profile table"))?;

    let mut fields = HashMap::new();
    for row in table.select(&ROW_SEL) {
        let cells: Vec<_> = row.select(&CELL_SEL).collect();
        if cells.len() < 2 {
            continue;
        }
        let label = element_text(cells[0]);
        if label.is_empty() {
            continue;
        }
        fields.insert(label, element_text(cells[1]));
    }
    Ok(fields)
}

pub fn parse_user_info(doc: &Html) -> Result<UserInfo> {
    let mut fields = profile_fields(doc)?;
    let mut take = |label: &str| {
        fields
            .remove(label)
            .ok_or_else(|| PortalError::missing(label))
    };

    let matriculation_number = take("Matriculation number")?;
    let first_name = take("First name")?;
    let middle_name = Some(take("Middle name")?).filter(|m| !m.is_empty());
    let last_name = take("Last name")?;
    let major = take("Studies")?;
    let username = take("Username")?.to_lowercase();
    let raw_dob = take("Date of birth")?;
    let country = take("First citizenship")?;

    let date_of_birth =
        NaiveDate::parse_from_str(&raw_dob, DATE_FORMAT).map_err(|_| PortalError::InvalidField {
            field: "Date of birth",
            value: raw_dob.clone(),
        })?;

    Ok(UserInfo {
        matriculation_number,
        first_name,
        middle_name,
        last_name,
        major,
        username,
        date_of_birth,
        country,
    })
}
