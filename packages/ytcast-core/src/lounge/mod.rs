//! YouTube Lounge session client.
//!
//! This module provides:
//! - `api` - Token handling, pairing and the `Remote` session
//! - `bind` - Bind channel parsing and request builders
//! - `video` - Video reference normalization
//! - `types` - Tokens, session ids and errors

pub mod api;
pub mod bind;
pub mod types;
pub mod video;

pub use api::{LoungeApi, Remote};
pub use bind::extract_session_ids;
pub use types::{LoungeError, LoungeResult, LoungeToken, Screen, SessionIds};
pub use video::{parse_start_time, parse_video, screen_id_from_additional_data, VideoRef};
