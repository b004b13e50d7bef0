//! ytcast Core - shared library for casting YouTube videos to smart TVs.
//!
//! # Architecture
//!
//! The crate is organized in three layers:
//!
//! - [`dial::ssdp`]: SSDP M-SEARCH discovery streaming raw service records
//! - [`dial`]: DIAL device description, app info, launch, stop, ping and
//!   Wake-on-LAN recovery ([`DialClient`])
//! - [`lounge`]: YouTube Lounge sessions ([`LoungeApi`], [`Remote`])
//!
//! Supporting modules:
//!
//! - [`config`]: Timeouts, endpoints and bind addresses ([`CoreConfig`])
//! - [`wol`]: Magic packet construction and sending
//! - [`error`]: Error codes and classification
//!
//! No module installs a logger or keeps global state: every client is
//! configured by the [`CoreConfig`] it is built with.

#![warn(clippy::all)]

pub mod config;
pub mod dial;
pub mod error;
pub mod lounge;
pub mod protocol_constants;
pub mod utils;
pub mod wol;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export commonly used types at the crate root
pub use config::{CoreConfig, LoungeConfig, SsdpConfig, WakeupConfig};
pub use error::{CastError, CastResult, ErrorCode, ErrorKind};
pub use utils::now_millis;

// Re-export DIAL types
pub use dial::{
    AppInfo, AppState, Device, DialClient, DialError, DialResult, DiscoveredService,
    DiscoveryError, DiscoveryResult, Wakeup,
};

// Re-export Lounge types
pub use lounge::{
    parse_video, screen_id_from_additional_data, LoungeApi, LoungeError, LoungeResult,
    LoungeToken, Remote, VideoRef,
};

// Re-export Wake-on-LAN types
pub use wol::{WolError, WolResult};
