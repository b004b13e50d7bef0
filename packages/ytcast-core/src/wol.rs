//! Wake-on-LAN magic packets.
//!
//! A magic packet is 6 bytes of `0xFF` followed by the target MAC address
//! repeated 16 times, sent as a single UDP datagram (usually to the limited
//! broadcast address on the discard port). Nothing is expected back.
//!
//! See <https://en.wikipedia.org/wiki/Wake-on-LAN>.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use thiserror::Error;
use tokio::net::UdpSocket;

use crate::protocol_constants::WOL_MAGIC_PACKET_LEN;

/// Errors that can occur while sending a magic packet.
#[derive(Debug, Error)]
pub enum WolError {
    /// The hardware address could not be parsed.
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),

    /// Failed to create or bind the UDP socket.
    #[error("failed to bind UDP socket: {0}")]
    SocketBind(#[source] std::io::Error),

    /// Failed to write the datagram.
    #[error("failed to send magic packet: {0}")]
    Send(#[source] std::io::Error),
}

/// Convenient Result alias for Wake-on-LAN operations.
pub type WolResult<T> = Result<T, WolError>;

/// Parses a 48-bit hardware address.
///
/// Accepted forms:
/// - `01:23:45:67:89:ab`
/// - `01-23-45-67-89-ab`
/// - `0123.4567.89ab`
/// - `0123456789ab`
pub fn parse_mac(mac: &str) -> WolResult<[u8; 6]> {
    let trimmed = mac.trim();
    let invalid = || WolError::InvalidMac(mac.to_string());

    let groups: Vec<&str> = if trimmed.contains(':') {
        trimmed.split(':').collect()
    } else if trimmed.contains('-') {
        trimmed.split('-').collect()
    } else if trimmed.contains('.') {
        trimmed.split('.').collect()
    } else {
        vec![trimmed]
    };

    // All groups must share one width: 6x2, 3x4 or 1x12 hex digits.
    let width = match groups.len() {
        6 => 2,
        3 => 4,
        1 => 12,
        _ => return Err(invalid()),
    };
    if groups
        .iter()
        .any(|g| g.len() != width || !g.bytes().all(|b| b.is_ascii_hexdigit()))
    {
        return Err(invalid());
    }

    let digits: String = groups.concat();
    let mut addr = [0u8; 6];
    for (i, byte) in addr.iter_mut().enumerate() {
        let pair = digits.get(i * 2..i * 2 + 2).ok_or_else(invalid)?;
        *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
    }
    Ok(addr)
}

/// Builds the 102-byte magic packet for `mac`.
#[must_use]
pub fn magic_packet(mac: &[u8; 6]) -> [u8; WOL_MAGIC_PACKET_LEN] {
    let mut packet = [0xFFu8; WOL_MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(mac);
    }
    packet
}

/// Creates a non-blocking UDP socket allowed to send broadcasts.
fn create_socket(target: SocketAddr) -> WolResult<UdpSocket> {
    let (domain, bind_ip) = match target.ip() {
        IpAddr::V4(_) => (Domain::IPV4, IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        IpAddr::V6(_) => (Domain::IPV6, IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
    };

    let socket =
        Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(WolError::SocketBind)?;

    if let Err(e) = socket.set_broadcast(true) {
        log::warn!("[WOL] Failed to set SO_BROADCAST: {}", e);
    }

    socket
        .set_nonblocking(true)
        .map_err(WolError::SocketBind)?;
    socket
        .bind(&SocketAddr::new(bind_ip, 0).into())
        .map_err(WolError::SocketBind)?;

    let std_socket: std::net::UdpSocket = socket.into();
    UdpSocket::from_std(std_socket).map_err(WolError::SocketBind)
}

/// Sends one magic packet for `mac` to `broadcast_addr`.
///
/// Success only means the datagram was written; whether the device wakes up
/// has to be checked by other means.
pub async fn wake(mac: &str, broadcast_addr: SocketAddr) -> WolResult<()> {
    let addr = parse_mac(mac)?;
    let packet = magic_packet(&addr);

    let socket = create_socket(broadcast_addr)?;
    socket
        .send_to(&packet, broadcast_addr)
        .await
        .map_err(WolError::Send)?;

    log::debug!("[WOL] Sent magic packet for {} to {}", mac, broadcast_addr);
    Ok(())
}
