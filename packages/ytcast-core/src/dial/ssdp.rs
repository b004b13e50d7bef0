//! SSDP M-SEARCH discovery.
//!
//! One search sends a single M-SEARCH datagram and streams back every valid
//! response received before the deadline. The same socket is used for send
//! AND receive since devices reply unicast back to the sending socket/port.
//!
//! Responses are NOT deduplicated here: a device typically answers several
//! searches and deduplication belongs to the caller.

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tokio_stream::wrappers::ReceiverStream;

use super::types::{DiscoveredService, DiscoveryError, DiscoveryResult};
use crate::config::SsdpConfig;
use crate::protocol_constants::{
    SSDP_CHANNEL_CAPACITY, SSDP_MAX_RESPONSE_SIZE, SSDP_MAX_TIMEOUT, SSDP_MIN_TIMEOUT,
    SSDP_MULTICAST_ADDR,
};
use crate::utils::clamp_duration;

/// Reasons a single response datagram is discarded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SsdpParseError {
    #[error("malformed status line")]
    MalformedStatusLine,

    #[error("unexpected status {0}")]
    BadStatus(String),

    #[error("missing or empty {0} header")]
    MissingHeader(&'static str),
}

/// Build the M-SEARCH message.
///
/// HOST always names the multicast group, `MX` is the window in whole seconds.
pub fn build_msearch_message(search_target: &str, window: Duration) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\r\n",
        SSDP_MULTICAST_ADDR,
        window.as_secs(),
        search_target
    )
}

/// Parses one HTTP-formatted response datagram.
///
/// The status must be exactly 200 and `USN`, `LOCATION` and `ST` must be
/// present and non-empty. Header lines that are not valid HTTP headers are
/// skipped.
pub fn parse_search_response(datagram: &[u8]) -> Result<DiscoveredService, SsdpParseError> {
    let text = String::from_utf8_lossy(datagram);
    let mut lines = text.lines();

    let status_line = lines.next().ok_or(SsdpParseError::MalformedStatusLine)?;
    let mut parts = status_line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(status)) if version.starts_with("HTTP/") => {
            if status != "200" {
                return Err(SsdpParseError::BadStatus(status.to_string()));
            }
        }
        _ => return Err(SsdpParseError::MalformedStatusLine),
    }

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.trim().is_empty() {
            break;
        }
        // Split on the first colon only: LOCATION values contain colons.
        let Some((name, value)) = line.split_once(':') else {
            log::trace!("[SSDP] Skipping header line without colon: {:?}", line);
            continue;
        };
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.trim().as_bytes()),
            HeaderValue::from_str(value.trim()),
        ) else {
            log::trace!("[SSDP] Skipping invalid header line: {:?}", line);
            continue;
        };
        headers.append(name, value);
    }

    let required = |name: &'static str| -> Result<String, SsdpParseError> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or(SsdpParseError::MissingHeader(name))
    };

    let unique_service_name = required("USN")?;
    let location = required("LOCATION")?;
    let search_target = required("ST")?;

    Ok(DiscoveredService {
        unique_service_name,
        location,
        search_target,
        headers,
    })
}

/// Creates the UDP socket used for both sending the search and receiving replies.
///
/// Sets up socket options for SSDP discovery:
/// - SO_REUSEADDR for rapid restarts
/// - Multicast TTL (4 per UPnP 1.0)
fn create_socket(config: &SsdpConfig) -> DiscoveryResult<UdpSocket> {
    let domain = match config.bind_addr {
        SocketAddr::V4(_) => Domain::IPV4,
        SocketAddr::V6(_) => Domain::IPV6,
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(DiscoveryError::SocketBind)?;

    if let Err(e) = socket.set_reuse_address(true) {
        log::warn!("[SSDP] Failed to set SO_REUSEADDR on {}: {}", config.bind_addr, e);
    }

    if domain == Domain::IPV4 {
        if let Err(e) = socket.set_multicast_ttl_v4(config.multicast_ttl) {
            log::warn!("[SSDP] Failed to set multicast TTL on {}: {}", config.bind_addr, e);
        }
    }

    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::SocketBind)?;
    socket
        .bind(&config.bind_addr.into())
        .map_err(DiscoveryError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(DiscoveryError::SocketBind)
}

/// Sends one M-SEARCH for `search_target` and streams the valid responses.
///
/// `window` is clamped into `[SSDP_MIN_TIMEOUT, SSDP_MAX_TIMEOUT]`. The stream
/// ends when the window elapses or the socket fails. Dropping the stream stops
/// the receive task.
///
/// # Errors
///
/// Returns an error synchronously if the socket cannot be bound or the search
/// datagram cannot be sent.
pub async fn search(
    config: &SsdpConfig,
    search_target: &str,
    window: Duration,
) -> DiscoveryResult<ReceiverStream<DiscoveredService>> {
    let window = clamp_duration(window, SSDP_MIN_TIMEOUT, SSDP_MAX_TIMEOUT);
    let deadline = Instant::now() + window;

    let socket = create_socket(config)?;
    let msg = build_msearch_message(search_target, window);
    socket
        .send_to(msg.as_bytes(), config.multicast_addr)
        .await
        .map_err(DiscoveryError::SendSearch)?;

    log::debug!(
        "[SSDP] Sent M-SEARCH for {} to {} ({}s window)",
        search_target,
        config.multicast_addr,
        window.as_secs()
    );

    let (tx, rx) = mpsc::channel(SSDP_CHANNEL_CAPACITY);
    tokio::spawn(receive_loop(socket, tx, deadline));

    Ok(ReceiverStream::new(rx))
}

/// Reads responses until the deadline, a socket error or the consumer leaving.
async fn receive_loop(socket: UdpSocket, tx: mpsc::Sender<DiscoveredService>, deadline: Instant) {
    let mut buf = [0u8; SSDP_MAX_RESPONSE_SIZE];
    let started = Instant::now();

    loop {
        let (len, src) = tokio::select! {
            _ = tx.closed() => {
                log::trace!("[SSDP] Consumer dropped the stream, stopping");
                return;
            }
            res = timeout_at(deadline, socket.recv_from(&mut buf)) => match res {
                Ok(Ok(received)) => received,
                Ok(Err(e)) => {
                    log::warn!("[SSDP] Socket recv error: {}", e);
                    break;
                }
                Err(_) => break,
            }
        };

        let service = match parse_search_response(&buf[..len]) {
            Ok(service) => service,
            Err(reason) => {
                log::debug!("[SSDP] Discarding response from {}: {}", src, reason);
                continue;
            }
        };

        log::trace!(
            "[SSDP] Response from {}: usn={}, location={}",
            src,
            service.unique_service_name,
            service.location
        );

        match timeout_at(deadline, tx.send(service)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => return,
            Err(_) => break,
        }
    }

    log::trace!(
        "[SSDP] Recv loop finished after {}ms",
        started.elapsed().as_millis()
    );
}
