//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by external specifications (SSDP, DIAL, Wake-on-LAN)
//! or mirror what the upstream YouTube web client sends. Changing them would
//! break protocol compliance or make the receiver reject our requests.

use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// SSDP (Simple Service Discovery Protocol)
// ─────────────────────────────────────────────────────────────────────────────

/// Multicast address and port reserved for SSDP by IANA.
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Lower bound for the M-SEARCH response window.
pub const SSDP_MIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Upper bound for the M-SEARCH response window.
pub const SSDP_MAX_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum size of a single M-SEARCH response datagram.
pub const SSDP_MAX_RESPONSE_SIZE: usize = 4096;

/// Capacity of the channel carrying discovered services.
pub const SSDP_CHANNEL_CAPACITY: usize = 10;

/// UPnP 1.0 recommends a TTL of 4 for SSDP multicast.
pub const SSDP_MULTICAST_TTL: u32 = 4;

// ─────────────────────────────────────────────────────────────────────────────
// DIAL (DIscovery And Launch)
// ─────────────────────────────────────────────────────────────────────────────

/// SSDP search target for DIAL servers.
pub const DIAL_SEARCH_TARGET: &str = "urn:dial-multiscreen-org:service:dial:1";

/// Response header carrying the base URL of the DIAL REST service.
pub const DIAL_APPLICATION_URL_HEADER: &str = "Application-URL";

/// SSDP response header carrying Wake-on-LAN parameters.
pub const DIAL_WAKEUP_HEADER: &str = "WAKEUP";

/// Content type for DIAL launch payloads.
pub const DIAL_PAYLOAD_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Capacity of the channel carrying discovered devices.
pub const DIAL_DEVICE_CHANNEL_CAPACITY: usize = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Wake-on-LAN
// ─────────────────────────────────────────────────────────────────────────────

/// Limited broadcast address on the discard port.
pub const WOL_BROADCAST_ADDR: &str = "255.255.255.255:9";

/// Size of a magic packet: 6 sync bytes + 16 repetitions of a 6-byte MAC.
pub const WOL_MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

/// Shortest time budget granted to a device to wake up.
pub const WAKEUP_MIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest time budget granted to a device to wake up.
pub const WAKEUP_MAX_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay between two wake attempts.
pub const WAKEUP_CHECK_INTERVAL: Duration = Duration::from_secs(2);

// ─────────────────────────────────────────────────────────────────────────────
// YouTube Lounge
// ─────────────────────────────────────────────────────────────────────────────

/// Base URL of the (undocumented) Lounge API.
pub const LOUNGE_API_BASE: &str = "https://www.youtube.com/api/lounge";

/// Token endpoint, relative to [`LOUNGE_API_BASE`].
pub const LOUNGE_TOKEN_PATH: &str = "/pairing/get_lounge_token_batch";

/// Pairing-code endpoint, relative to [`LOUNGE_API_BASE`].
pub const LOUNGE_PAIRING_PATH: &str = "/pairing/get_screen";

/// Bind endpoint, relative to [`LOUNGE_API_BASE`].
pub const LOUNGE_BIND_PATH: &str = "/bc/bind";

/// Bind request parameters identifying us as a desktop web remote.
pub const LOUNGE_PARAM_APP: &str = "youtube-desktop";
pub const LOUNGE_PARAM_CVER: &str = "1";
pub const LOUNGE_PARAM_DEVICE: &str = "REMOTE_CONTROL";
pub const LOUNGE_PARAM_ID: &str = "remote";
pub const LOUNGE_PARAM_VER: &str = "8";

/// Lower bound of the jitter inserted between two queued videos.
pub const LOUNGE_MIN_ADD_DELAY: Duration = Duration::from_secs(2);

/// Upper bound of the jitter inserted between two queued videos.
pub const LOUNGE_MAX_ADD_DELAY: Duration = Duration::from_secs(5);

/// `Origin` header expected by both the Lounge API and the TV app.
pub const YOUTUBE_ORIGIN: &str = "https://www.youtube.com";

/// User agent of the upstream web client.
pub const YOUTUBE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.45 Safari/537.36";

/// YouTube application name registered in the DIAL registry.
pub const YOUTUBE_DIAL_APP_NAME: &str = "YouTube";

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// Default timeout for HTTP requests (connect + read).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for liveness checks. Sleeping devices often swallow SYNs.
pub const PING_TIMEOUT: Duration = Duration::from_secs(3);
