//! Video reference normalization.
//!
//! Accepts bare ids, query strings (`v=ID&t=25`, `ID&t=25`) and the usual
//! YouTube URL shapes (`watch?v=`, `youtu.be/`, `embed/`, `v/`, ...).

use std::time::Duration;

use super::types::LoungeResult;
use crate::dial::xml::extract_xml_text;

/// A normalized video: id plus optional start offset (zero if none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub id: String,
    pub start_time: Duration,
}

/// Extracts the video id and start time from a video reference.
///
/// The `v` query parameter wins; otherwise the last path segment (cut at the
/// first `&`) is used if it looks like a video id. When no id can be found
/// the trimmed input is returned as-is with no start time.
pub fn parse_video(reference: &str) -> VideoRef {
    let trimmed = reference.trim();
    // Treat URLs as query strings.
    let query = trimmed.replace('?', "&");

    let mut v = None;
    let mut t = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "v" if v.is_none() => v = Some(value.into_owned()),
            "t" if t.is_none() => t = Some(value.into_owned()),
            _ => {}
        }
    }

    let id = v
        .filter(|id| !id.is_empty())
        .or_else(|| id_from_path(&query));

    match id {
        Some(id) => VideoRef {
            id,
            start_time: t.as_deref().map(parse_start_time).unwrap_or_default(),
        },
        None => VideoRef {
            id: trimmed.to_string(),
            start_time: Duration::ZERO,
        },
    }
}

/// Last path segment up to the first `&`, if it is a plausible video id.
fn id_from_path(path: &str) -> Option<String> {
    let base = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let base = base.split('&').next().unwrap_or_default();
    is_video_id(base).then(|| base.to_string())
}

/// Checks the 11-character id alphabet; the last character only takes
/// values whose low 2 bits are zero in the base64url alphabet.
fn is_video_id(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 11
        && bytes[..10]
            .iter()
            .all(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        && b"048AEIMQUYcgkosw".contains(&bytes[10])
}

/// Parses `t`: bare seconds (`110`) or a compound duration (`1h14m33s`).
///
/// Negative, zero or unparsable values yield zero.
pub fn parse_start_time(t: &str) -> Duration {
    let t = t.trim();
    let with_unit;
    let t = if t.ends_with(|c: char| c.is_ascii_digit()) {
        with_unit = format!("{}s", t);
        with_unit.as_str()
    } else {
        t
    };
    parse_duration(t).unwrap_or_default()
}

/// Parses a sequence of `<number><unit>` groups with units `h`, `m`, `s`, `ms`.
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() || s.starts_with('-') {
        return None;
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return None;
        }
        let value: f64 = rest[..num_len].parse().ok()?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 0.001,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total += value * scale;
    }

    Duration::try_from_secs_f64(total).ok()
}

/// Extracts the screen id from the raw `additionalData` of the YouTube app.
///
/// Returns an empty string if there is no `screenId` element.
pub fn screen_id_from_additional_data(raw: &str) -> LoungeResult<String> {
    let wrapped = format!("<dummy>{}</dummy>", raw);
    Ok(extract_xml_text(&wrapped, "screenId")?.unwrap_or_default())
}
