//! Shared types for DIAL discovery and control.
//!
//! This module contains the records produced by SSDP discovery, the devices
//! built from them, the application information returned by DIAL servers and
//! the error types of the DIAL layer.

use std::fmt;
use std::time::Duration;

use reqwest::header::HeaderMap;
use thiserror::Error;

use crate::wol::WolError;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur while starting an SSDP search.
///
/// Per-datagram parse failures are not errors: they are logged and skipped.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Failed to create or bind the UDP socket for discovery.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// Failed to send the M-SEARCH request.
    #[error("failed to send SSDP search: {0}")]
    SendSearch(#[source] std::io::Error),
}

/// Convenient Result alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors that can occur while talking to a DIAL server.
#[derive(Debug, Error)]
pub enum DialError {
    /// HTTP request failed at the transport level (connect, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a status outside the accepted range.
    #[error("{method} {url}: bad HTTP status {status}")]
    BadStatus {
        method: String,
        url: String,
        status: u16,
    },

    /// A URL taken from the device could not be parsed.
    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Device description response lacks the `Application-URL` header.
    #[error("missing Application-URL header")]
    MissingApplicationUrl,

    /// XML body could not be parsed.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML body lacks a required element.
    #[error("missing XML element {0}")]
    MissingElement(&'static str),

    /// Device has no MAC address to wake.
    #[error("missing device MAC address")]
    NoMac,

    /// Device did not come back within the wake budget.
    #[error("unable to wake up device")]
    WakeupFailed,

    /// Application does not allow being stopped.
    #[error("application does not allow stop")]
    StopNotAllowed,

    /// Application is not running so there is no instance to stop.
    #[error("missing application run link")]
    MissingRunLink,

    /// Re-discovery could not be started.
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Magic packet could not be sent.
    #[error("wake-on-lan failed: {0}")]
    Wol(#[from] WolError),
}

/// Convenient Result alias for DIAL operations.
pub type DialResult<T> = Result<T, DialError>;

// ─────────────────────────────────────────────────────────────────────────────
// Discovery Records
// ─────────────────────────────────────────────────────────────────────────────

/// A service that answered an M-SEARCH request.
///
/// Built from one UDP response; never deduplicated at this level since the
/// same device usually answers several searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    /// Composite unique service name (`USN`), e.g. `uuid:...::urn:...`.
    pub unique_service_name: String,
    /// URL of the device description (`LOCATION`).
    pub location: String,
    /// Search target the service answered for (`ST`).
    pub search_target: String,
    /// Every header of the response (case-insensitive lookup).
    pub headers: HeaderMap,
}

impl DiscoveredService {
    /// Returns a header value as trimmed text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
    }
}

/// Wake-on-LAN parameters advertised in the `WAKEUP` SSDP header.
///
/// The default value (empty MAC) means the device cannot be woken up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wakeup {
    /// MAC address of the device's wired or wireless interface.
    pub mac: String,
    /// Estimated time needed to wake the device and start its DIAL server.
    pub timeout: Duration,
}

impl Wakeup {
    /// Parses a `MAC=<mac>;Timeout=<seconds>` header value.
    ///
    /// Keys are case-insensitive and whitespace around `=` and `;` is ignored.
    /// Any structural mismatch, empty MAC or non-numeric/negative timeout
    /// yields [`Wakeup::default`].
    pub fn parse(value: &str) -> Self {
        let mut mac = None;
        let mut timeout = None;

        for field in value.split(';').map(str::trim).filter(|f| !f.is_empty()) {
            let Some((key, val)) = field.split_once('=') else {
                return Self::default();
            };
            let (key, val) = (key.trim(), val.trim());
            if key.eq_ignore_ascii_case("MAC") && mac.is_none() {
                mac = Some(val);
            } else if key.eq_ignore_ascii_case("Timeout") && timeout.is_none() {
                timeout = Some(val);
            } else {
                return Self::default();
            }
        }

        let (Some(mac), Some(timeout)) = (mac, timeout) else {
            return Self::default();
        };
        if mac.is_empty() || !timeout.bytes().all(|b| b.is_ascii_digit()) {
            return Self::default();
        }
        match timeout.parse::<u64>() {
            Ok(secs) => Self {
                mac: mac.to_string(),
                timeout: Duration::from_secs(secs),
            },
            Err(_) => Self::default(),
        }
    }

    /// Returns true if the device advertised a MAC address.
    pub fn is_supported(&self) -> bool {
        !self.mac.is_empty()
    }
}

/// A DIAL server discovered on the network.
///
/// `unique_service_name` identifies the physical receiver across discovery
/// rounds; `location` and `application_url` may change after a wake cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Unique service name from the SSDP response.
    pub unique_service_name: String,
    /// Device description URL from the SSDP response.
    pub location: String,
    /// Base URL of the DIAL REST service.
    pub application_url: String,
    /// UPnP `friendlyName` of the device.
    pub friendly_name: String,
    /// Wake-on-LAN parameters (default if unsupported).
    pub wakeup: Wakeup,
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Information
// ─────────────────────────────────────────────────────────────────────────────

/// State of a DIAL application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    /// Installed and either starting or running.
    Running,
    /// Installed and not running.
    Stopped,
    /// Running but not visible to the user.
    Hidden,
    /// Not installed; can be installed with a GET on the URL.
    Installable(String),
    /// Any other value. Should be ignored.
    Invalid(String),
}

impl AppState {
    /// Parses the text of a `<state>` element.
    pub fn parse(state: &str) -> Self {
        let state = state.trim();
        match state {
            "running" => Self::Running,
            "stopped" => Self::Stopped,
            "hidden" => Self::Hidden,
            _ => match state
                .strip_prefix("installable=")
                .or_else(|| state.strip_prefix("installable:"))
            {
                Some(url) if !url.trim().is_empty() => Self::Installable(url.trim().to_string()),
                _ => Self::Invalid(state.to_string()),
            },
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Hidden => write!(f, "hidden"),
            Self::Installable(url) => write!(f, "installable={}", url),
            Self::Invalid(raw) => write!(f, "invalid ({:?})", raw),
        }
    }
}

/// Information about an application on a DIAL device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Application name.
    pub name: String,
    /// Current state.
    pub state: AppState,
    /// True if a running instance can be stopped with DELETE on `run_link`.
    pub allow_stop: bool,
    /// Instance URL of the running application (only when running).
    pub run_link: Option<String>,
    /// Raw inner content of `<additionalData>`, application specific.
    pub additional_data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wakeup_parse_well_formed() {
        let cases = [
            "MAC=10:dd:b1:c9:00:e4;Timeout=10",
            "MAC = 10:dd:b1:c9:00:e4 ; Timeout = 10",
            "  mac=10:dd:b1:c9:00:e4;timeout=10  ",
            "MAC=10:dd:b1:c9:00:e4;Timeout=10;",
            "Mac=\t10:dd:b1:c9:00:e4\t;\tTIMEOUT=\t10",
        ];
        for case in cases {
            let wakeup = Wakeup::parse(case);
            assert_eq!(wakeup.mac, "10:dd:b1:c9:00:e4", "{:?}", case);
            assert_eq!(wakeup.timeout, Duration::from_secs(10), "{:?}", case);
            assert!(wakeup.is_supported());
        }
    }

    #[test]
    fn wakeup_parse_rejects_malformed_values() {
        let cases = [
            "",
            "MAC=10:dd:b1:c9:00:e4",
            "Timeout=10",
            "MAC=;Timeout=10",
            "MAC=10:dd:b1:c9:00:e4;Timeout=",
            "MAC=10:dd:b1:c9:00:e4;Timeout=-5",
            "MAC=10:dd:b1:c9:00:e4;Timeout=ten",
            "MAC=10:dd:b1:c9:00:e4;Timeout=1.5",
            "MAC10:dd:b1:c9:00:e4;Timeout=10",
            "MAC=10:dd:b1:c9:00:e4;Other=1;Timeout=10",
            "MAC=10:dd:b1:c9:00:e4;Timeout=99999999999999999999999",
        ];
        for case in cases {
            assert_eq!(Wakeup::parse(case), Wakeup::default(), "{:?}", case);
        }
    }

    #[test]
    fn app_state_parse() {
        assert_eq!(AppState::parse("running"), AppState::Running);
        assert_eq!(AppState::parse(" stopped\n"), AppState::Stopped);
        assert_eq!(AppState::parse("hidden"), AppState::Hidden);
        assert_eq!(
            AppState::parse("installable=http://store/app"),
            AppState::Installable("http://store/app".into())
        );
        assert_eq!(
            AppState::parse("installable:http://store/app"),
            AppState::Installable("http://store/app".into())
        );
        assert_eq!(AppState::parse("Running"), AppState::Invalid("Running".into()));
        assert_eq!(AppState::parse("installable="), AppState::Invalid("installable=".into()));
    }

    #[test]
    fn discovered_service_header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("wakeup", " MAC=aa:bb:cc:dd:ee:ff;Timeout=5 ".parse().unwrap());
        let service = DiscoveredService {
            unique_service_name: "uuid:1".into(),
            location: "http://127.0.0.1/dd.xml".into(),
            search_target: "st".into(),
            headers,
        };
        assert_eq!(service.header("WAKEUP"), Some("MAC=aa:bb:cc:dd:ee:ff;Timeout=5"));
        assert_eq!(service.header("missing"), None);
    }
}
