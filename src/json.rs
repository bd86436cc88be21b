//! JSON files for stored credentials and the course cache.
//!
//! Hand-edited or stale files are common here, so parse failures report the
//! serde path of the offending field and a snippet of the line around it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse `body`, reporting the field path, the type mismatch and a marked snippet on failure.
pub fn parse_json_with_context<T: DeserializeOwned>(body: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|err| {
        let inner = err.inner();
        let (line, column) = (inner.line(), inner.column());
        let path = err.path().to_string();

        let message = inner.to_string();
        let location = format!(" at line {line} column {column}");
        let message = message.strip_suffix(&location).unwrap_or(&message);

        let mut report = String::new();
        if !path.is_empty() && path != "." {
            report.push_str(&format!("at path '{path}': "));
        }
        report.push_str(&format!(
            "{} (line {line} col {column})\n{}",
            describe_mismatch(message),
            snippet(body, line, column)
        ));
        anyhow::anyhow!(report)
    })
}

/// Reads and parses `path`, returning `None` when the file does not exist.
pub async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let body = match tokio::fs::read_to_string(path).await {
        Ok(body) => body,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    parse_json_with_context(&body)
        .map(Some)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Writes `value` as pretty JSON, replacing `path` only once the full body is on disk.
pub async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("Failed to write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("Failed to replace {}", path.display()))
}

/// Rewrites `"invalid type: X, expected Y"` as `"expected Y, got X"`.
fn describe_mismatch(message: &str) -> String {
    if let Some(rest) = message.split_once("invalid type: ").map(|(_, r)| r)
        && let Some((actual, expected)) = rest.split_once(", expected ")
    {
        return format!("expected {}, got {actual}", expected.trim());
    }
    message.to_string()
}

/// About twenty characters of the failing line with a caret under `column` (1-based).
fn snippet(body: &str, line: usize, column: usize) -> String {
    const HALF_WIDTH: usize = 10;

    let chars: Vec<char> = body
        .lines()
        .nth(line.saturating_sub(1))
        .unwrap_or_default()
        .chars()
        .collect();
    if chars.is_empty() {
        return "(empty line)".to_string();
    }

    let at = column.saturating_sub(1).min(chars.len());
    let start = at.saturating_sub(HALF_WIDTH);
    let end = (at + HALF_WIDTH).min(chars.len());
    let excerpt: String = chars[start..end].iter().collect();

    format!("...{excerpt}...\n   {}^", " ".repeat(at - start))
}
