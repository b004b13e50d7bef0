//! Bind channel payloads.
//!
//! The bind endpoint answers with a chunked stream where every chunk is a
//! decimal length followed by a JSON array of `[index, [key, value, ...]]`
//! records:
//!
//! ```text
//! 270
//! [[0,["c","sid-foo-bar-baz","",8]]
//! ,[1,["S","gsessionid-foo-bar-baz"]]
//! ,[2,["loungeStatus",{}]]
//! ]
//! ```
//!
//! Only the `c` (session id) and `S` (gsessionid) records matter; every other
//! record is skipped whatever its shape.

use serde_json::Value;

use super::types::{LoungeError, LoungeResult, SessionIds};
use super::video::VideoRef;
use crate::protocol_constants::{
    LOUNGE_PARAM_APP, LOUNGE_PARAM_CVER, LOUNGE_PARAM_DEVICE, LOUNGE_PARAM_ID, LOUNGE_PARAM_VER,
};

/// A decoded bind record.
#[derive(Debug, Clone, PartialEq, Eq)]
enum BindRecord {
    SessionId(String),
    GSessionId(String),
    Other,
}

impl BindRecord {
    /// Decodes one `[index, [key, value, ...]]` entry.
    fn decode(entry: &Value) -> Self {
        let Some(record) = entry
            .as_array()
            .and_then(|e| e.get(1))
            .and_then(Value::as_array)
        else {
            return Self::Other;
        };
        let key = record.first().and_then(Value::as_str);
        let value = record
            .get(1)
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty());
        match (key, value) {
            (Some("c"), Some(v)) => Self::SessionId(v.to_string()),
            (Some("S"), Some(v)) => Self::GSessionId(v.to_string()),
            _ => Self::Other,
        }
    }
}

/// Extracts the session ids from a bind response body.
///
/// Everything before the first `[` is skipped. Chunks are scanned in order
/// and scanning stops as soon as both ids are known; a truncated trailing
/// chunk is tolerated once the first chunk has been read.
///
/// # Errors
///
/// - [`LoungeError::Json`] if the first chunk is not valid JSON
/// - [`LoungeError::MissingSessionIds`] if either id is absent
pub fn extract_session_ids(body: &str) -> LoungeResult<SessionIds> {
    let Some(start) = body.find('[') else {
        return Err(LoungeError::MissingSessionIds);
    };

    let mut sid = None;
    let mut gsessionid = None;

    let chunks = serde_json::Deserializer::from_str(&body[start..]).into_iter::<Value>();
    for (i, chunk) in chunks.enumerate() {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) if i == 0 => return Err(e.into()),
            Err(e) => {
                log::debug!("[Lounge] Ignoring unreadable bind chunk {}: {}", i, e);
                break;
            }
        };
        // Length prefixes of later chunks decode as plain numbers.
        let Some(entries) = chunk.as_array() else {
            continue;
        };

        for entry in entries {
            match BindRecord::decode(entry) {
                BindRecord::SessionId(v) => sid = Some(v),
                BindRecord::GSessionId(v) => gsessionid = Some(v),
                BindRecord::Other => continue,
            }
            if let (Some(sid), Some(gsessionid)) = (&sid, &gsessionid) {
                return Ok(SessionIds {
                    sid: sid.clone(),
                    gsessionid: gsessionid.clone(),
                });
            }
        }
    }

    Err(LoungeError::MissingSessionIds)
}

// ─────────────────────────────────────────────────────────────────────────────
// Request Builders
// ─────────────────────────────────────────────────────────────────────────────

/// Query of the bind request opening a session.
pub fn session_query(token: &str, name: &str, rid: u64) -> Vec<(&'static str, String)> {
    vec![
        ("CVER", LOUNGE_PARAM_CVER.to_string()),
        ("RID", rid.to_string()),
        ("VER", LOUNGE_PARAM_VER.to_string()),
        ("app", LOUNGE_PARAM_APP.to_string()),
        ("device", LOUNGE_PARAM_DEVICE.to_string()),
        ("id", LOUNGE_PARAM_ID.to_string()),
        ("loungeIdToken", token.to_string()),
        ("name", name.to_string()),
    ]
}

/// Query of the bind requests sent inside an open session.
pub fn command_query(token: &str, ids: &SessionIds, rid: u64) -> Vec<(&'static str, String)> {
    vec![
        ("CVER", LOUNGE_PARAM_CVER.to_string()),
        ("RID", rid.to_string()),
        ("SID", ids.sid.clone()),
        ("VER", LOUNGE_PARAM_VER.to_string()),
        ("gsessionid", ids.gsessionid.clone()),
        ("loungeIdToken", token.to_string()),
    ]
}

/// Form of the bind request opening a session.
pub fn session_form() -> Vec<(String, String)> {
    vec![("count".to_string(), "0".to_string())]
}

/// Form replacing the playlist with `videos`, starting at the first one.
///
/// Returns `None` if `videos` is empty.
pub fn set_playlist_form(videos: &[VideoRef]) -> Option<Vec<(String, String)>> {
    let first = videos.first()?;
    let ids: Vec<&str> = videos.iter().map(|v| v.id.as_str()).collect();
    Some(vec![
        ("count".to_string(), "1".to_string()),
        ("req0__sc".to_string(), "setPlaylist".to_string()),
        ("req0_videoId".to_string(), first.id.clone()),
        (
            "req0_currentTime".to_string(),
            first.start_time.as_secs().to_string(),
        ),
        ("req0_currentIndex".to_string(), "0".to_string()),
        ("req0_videoIds".to_string(), ids.join(",")),
    ])
}

/// Form appending one video to the queue.
pub fn add_video_form(index: usize, video: &VideoRef) -> Vec<(String, String)> {
    vec![
        ("count".to_string(), "1".to_string()),
        (format!("req{}__sc", index), "addVideo".to_string()),
        (format!("req{}_videoId", index), video.id.clone()),
    ]
}
