//! Client configuration.
//!
//! Every network client in this crate takes its timeouts, endpoints and bind
//! addresses from a [`CoreConfig`] passed at construction time. There is no
//! global state: two clients with different configurations can coexist.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use crate::protocol_constants::{
    HTTP_TIMEOUT, LOUNGE_API_BASE, LOUNGE_MAX_ADD_DELAY, LOUNGE_MIN_ADD_DELAY, PING_TIMEOUT,
    SSDP_MIN_TIMEOUT, SSDP_MULTICAST_TTL, WAKEUP_CHECK_INTERVAL, WAKEUP_MAX_TIMEOUT,
    WAKEUP_MIN_TIMEOUT,
};

/// Configuration for SSDP M-SEARCH discovery.
#[derive(Debug, Clone)]
pub struct SsdpConfig {
    /// Destination of the M-SEARCH datagram.
    pub multicast_addr: SocketAddr,
    /// Local address the search socket binds to. Port 0 allocates an
    /// ephemeral port per search so concurrent searches never collide.
    pub bind_addr: SocketAddr,
    /// Multicast TTL for the M-SEARCH datagram.
    pub multicast_ttl: u32,
}

impl Default for SsdpConfig {
    fn default() -> Self {
        Self {
            multicast_addr: SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::new(239, 255, 255, 250),
                1900,
            )),
            bind_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
            multicast_ttl: SSDP_MULTICAST_TTL,
        }
    }
}

/// Configuration for the Wake-on-LAN recovery loop.
#[derive(Debug, Clone)]
pub struct WakeupConfig {
    /// Destination of the magic packet.
    pub broadcast_addr: SocketAddr,
    /// Lower bound of the wake budget.
    pub min_timeout: Duration,
    /// Upper bound of the wake budget.
    pub max_timeout: Duration,
    /// Delay between two attempts.
    pub check_interval: Duration,
    /// Search window of the re-discovery run inside each attempt.
    pub rediscover_timeout: Duration,
}

impl Default for WakeupConfig {
    fn default() -> Self {
        Self {
            broadcast_addr: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::BROADCAST, 9)),
            min_timeout: WAKEUP_MIN_TIMEOUT,
            max_timeout: WAKEUP_MAX_TIMEOUT,
            check_interval: WAKEUP_CHECK_INTERVAL,
            rediscover_timeout: SSDP_MIN_TIMEOUT,
        }
    }
}

/// Configuration for the Lounge session client.
#[derive(Debug, Clone)]
pub struct LoungeConfig {
    /// Base URL of the Lounge API, without trailing slash.
    pub api_base: String,
    /// Lower bound of the jitter between two `addVideo` requests.
    pub min_add_delay: Duration,
    /// Upper bound of the jitter between two `addVideo` requests.
    pub max_add_delay: Duration,
}

impl Default for LoungeConfig {
    fn default() -> Self {
        Self {
            api_base: LOUNGE_API_BASE.to_string(),
            min_add_delay: LOUNGE_MIN_ADD_DELAY,
            max_add_delay: LOUNGE_MAX_ADD_DELAY,
        }
    }
}

/// Top-level configuration shared by [`DialClient`](crate::DialClient) and
/// [`LoungeApi`](crate::LoungeApi).
///
/// All fields have sensible defaults.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Timeout applied to every HTTP request (connect + read).
    pub http_timeout: Duration,
    /// Shorter timeout for liveness checks.
    pub ping_timeout: Duration,
    /// SSDP discovery settings.
    pub ssdp: SsdpConfig,
    /// Wake-on-LAN recovery settings.
    pub wakeup: WakeupConfig,
    /// Lounge API settings.
    pub lounge: LoungeConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            http_timeout: HTTP_TIMEOUT,
            ping_timeout: PING_TIMEOUT,
            ssdp: SsdpConfig::default(),
            wakeup: WakeupConfig::default(),
            lounge: LoungeConfig::default(),
        }
    }
}
