//! DIAL (DIscovery And Launch) client.
//!
//! This module provides:
//! - `ssdp` - M-SEARCH discovery streaming raw service records
//! - `client` - Device description, app info, launch, stop and ping
//! - `wakeup` - Wake-on-LAN recovery with re-discovery
//! - `xml` - Device description and app-info parsing
//! - `types` - Shared records and errors

pub mod client;
pub mod ssdp;
pub mod types;
mod wakeup;
pub mod xml;

pub use client::{parse_device, DialClient};
pub use ssdp::{search, SsdpParseError};
pub use types::{
    AppInfo, AppState, Device, DialError, DialResult, DiscoveredService, DiscoveryError,
    DiscoveryResult, Wakeup,
};
