//! Encoding and decoding of the portal's `ARGUMENTS` query parameter.
//!
//! Every element carries a two-character type prefix: `-N` for numbers,
//! `-A` for free text. The session id is always the first element.

use url::Url;

/// Builds `ARGUMENTS` for a data request: the session id followed by the caller's arguments.
pub fn encode(session_id: &str, args: &[String]) -> String {
    std::iter::once(format!("-N{session_id}"))
        .chain(args.iter().cloned())
        .collect::<Vec<_>>()
        .join(",")
}

/// Splits the `ARGUMENTS` parameter of `url`, if present.
pub fn parse(url: &Url) -> Option<Vec<String>> {
    url.query_pairs()
        .find(|(k, _)| k == "ARGUMENTS")
        .map(|(_, v)| v.split(',').map(str::to_owned).collect())
}

/// Drops the two-character type prefix of an argument element.
pub fn strip_prefix(element: &str) -> &str {
    element.get(2..).unwrap_or_default()
}

/// Session id carried by a portal URL, without its type prefix.
pub fn session_id(url: &Url) -> Option<String> {
    let args = parse(url)?;
    let first = args.first()?;
    let id = strip_prefix(first);
    (!id.is_empty()).then(|| id.to_owned())
}
