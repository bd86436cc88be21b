//! Debug formatting helpers for [`custom_debug_derive`].

use std::fmt;

/// Hides secret values (passwords, cookies, session ids) while keeping their presence visible.
///
/// Use with `#[debug(with = crate::fmt::redacted)]` on string fields.
pub fn redacted<T: AsRef<str>>(value: &T, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value.as_ref().is_empty() {
        f.write_str("\"\"")
    } else {
        f.write_str("<redacted>")
    }
}
