//! Centralized error classification for the ytcast core library.
//!
//! Every module owns its own `thiserror` enum. This module adds:
//! - [`ErrorCode`] - machine-readable codes and an [`ErrorKind`] per variant
//! - [`CastError`] - an umbrella error for callers driving several layers

use std::fmt;

use thiserror::Error;

use crate::dial::{DialError, DiscoveryError};
use crate::lounge::LoungeError;
use crate::wol::WolError;

/// Broad classes of failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Connection, DNS, timeout or socket I/O failure.
    Transport,
    /// The peer answered, but not in the expected shape or status.
    Protocol,
    /// The answer was well formed but cannot be acted upon.
    Semantic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transport => "transport",
            Self::Protocol => "protocol",
            Self::Semantic => "semantic",
        })
    }
}

/// Trait for error types that provide machine-readable error codes.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns the class of the failure.
    fn kind(&self) -> ErrorKind;
}

impl ErrorCode for WolError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidMac(_) => "invalid_mac",
            Self::SocketBind(_) => "socket_bind_failed",
            Self::Send(_) => "wol_send_failed",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMac(_) => ErrorKind::Semantic,
            Self::SocketBind(_) | Self::Send(_) => ErrorKind::Transport,
        }
    }
}

impl ErrorCode for DiscoveryError {
    fn code(&self) -> &'static str {
        match self {
            Self::SocketBind(_) => "socket_bind_failed",
            Self::SendSearch(_) => "ssdp_send_failed",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Transport
    }
}

impl ErrorCode for DialError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::BadStatus { .. } => "http_error_status",
            Self::InvalidUrl { .. } => "invalid_url",
            Self::MissingApplicationUrl => "missing_application_url",
            Self::Xml(_) => "xml_parse_error",
            Self::MissingElement(_) => "missing_xml_element",
            Self::NoMac => "no_mac",
            Self::WakeupFailed => "wakeup_failed",
            Self::StopNotAllowed => "stop_not_allowed",
            Self::MissingRunLink => "missing_run_link",
            Self::Discovery(e) => e.code(),
            Self::Wol(e) => e.code(),
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) => ErrorKind::Transport,
            Self::BadStatus { .. }
            | Self::InvalidUrl { .. }
            | Self::MissingApplicationUrl
            | Self::Xml(_)
            | Self::MissingElement(_)
            | Self::MissingRunLink => ErrorKind::Protocol,
            Self::NoMac | Self::WakeupFailed | Self::StopNotAllowed => ErrorKind::Semantic,
            Self::Discovery(e) => e.kind(),
            Self::Wol(e) => e.kind(),
        }
    }
}

impl ErrorCode for LoungeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::BadStatus { .. } => "http_error_status",
            Self::Json(_) => "json_parse_error",
            Self::Xml(_) => "xml_parse_error",
            Self::NoScreens => "no_screens",
            Self::NoToken => "no_lounge_token",
            Self::MissingSessionIds => "missing_session_ids",
            Self::NoScreen => "no_screen",
            Self::NoScreenId => "no_screen_id",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(_) => ErrorKind::Transport,
            Self::BadStatus { .. } | Self::Json(_) | Self::Xml(_) | Self::NoScreenId => {
                ErrorKind::Protocol
            }
            Self::NoScreens | Self::NoToken | Self::MissingSessionIds | Self::NoScreen => {
                ErrorKind::Semantic
            }
        }
    }
}

/// Umbrella error for operations spanning several layers.
#[derive(Debug, Error)]
pub enum CastError {
    /// SSDP search could not be started.
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// DIAL request or wakeup failed.
    #[error(transparent)]
    Dial(#[from] DialError),

    /// Lounge request failed.
    #[error(transparent)]
    Lounge(#[from] LoungeError),

    /// Magic packet could not be sent.
    #[error(transparent)]
    Wol(#[from] WolError),

    /// No discovered device matches the requested name.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Receiver application reported a state that cannot be launched.
    #[error("unknown app state: {0}")]
    UnknownAppState(String),

    /// Receiver application did not expose a screen id in time.
    #[error("timed out waiting for the app to start")]
    LaunchTimeout,
}

impl ErrorCode for CastError {
    fn code(&self) -> &'static str {
        match self {
            Self::Discovery(e) => e.code(),
            Self::Dial(e) => e.code(),
            Self::Lounge(e) => e.code(),
            Self::Wol(e) => e.code(),
            Self::DeviceNotFound(_) => "device_not_found",
            Self::UnknownAppState(_) => "unknown_app_state",
            Self::LaunchTimeout => "launch_timeout",
        }
    }

    fn kind(&self) -> ErrorKind {
        match self {
            Self::Discovery(e) => e.kind(),
            Self::Dial(e) => e.kind(),
            Self::Lounge(e) => e.kind(),
            Self::Wol(e) => e.kind(),
            Self::DeviceNotFound(_) | Self::UnknownAppState(_) | Self::LaunchTimeout => {
                ErrorKind::Semantic
            }
        }
    }
}

/// Convenient Result alias for multi-layer operations.
pub type CastResult<T> = Result<T, CastError>;
