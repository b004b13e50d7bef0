//! Shared mock servers and payloads for network tests.
//!
//! HTTP mocks are axum routers served on an ephemeral loopback port; SSDP
//! mocks are plain UDP sockets answering every M-SEARCH they receive.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use axum::Router;
use tokio::net::{TcpListener, UdpSocket};

use crate::config::CoreConfig;
use crate::protocol_constants::DIAL_SEARCH_TARGET;

/// Device description with `friendlyName` "Living Room TV".
pub const DEVICE_DESCRIPTION: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:dial-multiscreen-org:device:dial:1</deviceType>
    <friendlyName>Living Room TV</friendlyName>
    <manufacturer>ACME</manufacturer>
  </device>
</root>"#;

/// Builds an app-info document for `state`, with `additional` as raw
/// `additionalData` content.
pub fn app_info_xml(state: &str, additional: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<service xmlns="urn:dial-multiscreen-org:schemas:dial" dialVer="2.1">
  <name>YouTube</name>
  <options allowStop="true"/>
  <state>{state}</state>
  <link rel="run" href="run"/>
  <additionalData>{additional}</additionalData>
</service>"#
    )
}

/// Serves `router` on `127.0.0.1:<ephemeral>` and returns its address.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Builds an M-SEARCH response datagram for the DIAL search target.
pub fn ssdp_response(location: &str, usn: &str, extra: &[(&str, &str)]) -> String {
    ssdp_response_for(DIAL_SEARCH_TARGET, location, usn, extra)
}

/// Builds an M-SEARCH response datagram for an arbitrary search target.
pub fn ssdp_response_for(st: &str, location: &str, usn: &str, extra: &[(&str, &str)]) -> String {
    let mut msg = format!(
        "HTTP/1.1 200 OK\r\nCACHE-CONTROL: max-age=1800\r\nLOCATION: {}\r\nST: {}\r\nUSN: {}\r\n",
        location, st, usn
    );
    for (name, value) in extra {
        msg.push_str(&format!("{}: {}\r\n", name, value));
    }
    msg.push_str("\r\n");
    msg
}

/// Spawns a UDP responder answering every received datagram with `responses`.
pub async fn spawn_ssdp_responder(responses: Vec<String>) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = [0u8; 2048];
        while let Ok((_, client)) = socket.recv_from(&mut buf).await {
            for response in &responses {
                let _ = socket.send_to(response.as_bytes(), client).await;
            }
        }
    });
    addr
}

/// Configuration pointing every socket at loopback mocks.
pub fn test_config(ssdp_responder: SocketAddr) -> CoreConfig {
    let mut config = CoreConfig::default();
    config.http_timeout = Duration::from_secs(5);
    config.ping_timeout = Duration::from_millis(500);
    config.ssdp.multicast_addr = ssdp_responder;
    config.ssdp.bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0));
    config
}
