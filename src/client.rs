//! Client mode: a single DISCOVER probe.
//!
//! Builds a DISCOVER for the named interface, broadcasts it to the server
//! port and prints the first matching OFFER as JSON on stdout. Used for
//! probing a server and as a reference encoder for backend authors.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::codec::{self, frame::format_mac, frame::BOOTREPLY, frame::BOOTREQUEST, MessageType};
use crate::config::Settings;

/// Source port for client-mode probes.
const CLIENT_PORT: u16 = 68;

/// Delay before the first retransmission; grows 1.5x per attempt.
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Options requested when the caller supplies none.
const DEFAULT_PARAMETERS: [&str; 7] = [
    "hostname",
    "subnet-mask",
    "routers",
    "domain-name",
    "domain-name-servers",
    "time-offset",
    "ntp-servers",
];

/// Issue one DISCOVER on the configured interface and print the first
/// matching OFFER. Exhausting the retries is an error (exit code 1).
pub async fn run(settings: &Settings) -> Result<()> {
    let interface = settings
        .interface
        .as_deref()
        .context("you need to specify an interface in client mode")?;

    let mac = interface_mac(interface)?;
    let request = build_request(
        &mac,
        hostname().as_deref(),
        interface_address(interface),
        settings.extra_request.as_ref(),
    );
    let frame = codec::encode_object(&request)?;
    if frame.op != BOOTREQUEST {
        bail!(
            "only DHCP requests can be sent in client mode (dhcp-{} is a DHCP response message)",
            frame.message_type
        );
    }

    let socket = bind_client_socket(interface).context("cannot bind client socket")?;
    let socket = UdpSocket::from_std(socket)?;
    let destination = SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), settings.port);

    let mut delay = INITIAL_RETRY_DELAY;
    let mut buf = [0u8; 4096];
    for _ in 0..settings.retries {
        socket
            .send_to(&frame.bytes, destination)
            .await
            .context("error sending DHCP request")?;
        info!(
            "dhcp-{} for {}/{:08x} sent to {}",
            frame.message_type,
            format_mac(frame.chaddr),
            frame.xid,
            destination
        );

        let window = tokio::time::Instant::now() + delay;
        loop {
            let remaining = window.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            let Ok(received) = timeout(remaining, socket.recv_from(&mut buf)).await else {
                break;
            };
            let (len, peer) = received.context("error receiving DHCP response")?;
            match codec::decode(&buf[..len]) {
                Ok(decoded)
                    if decoded.op == BOOTREPLY
                        && decoded.message_type == Some(MessageType::Offer)
                        && decoded.xid == frame.xid
                        && decoded.chaddr == frame.chaddr =>
                {
                    info!(
                        "dhcp-offer received from {} for {}/{:08x}",
                        peer,
                        format_mac(decoded.chaddr),
                        decoded.xid
                    );
                    println!("{}", Value::Object(decoded.json));
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => warn!("invalid DHCP frame received from {}: {}", peer, e),
            }
        }
        delay = delay * 3 / 2;
    }

    bail!("no valid response from DHCP server")
}

/// Assemble the DISCOVER JSON. Caller-supplied attributes win over the
/// generated ones; the message type and parameter list are only defaulted
/// when absent.
fn build_request(
    mac: &str,
    hostname: Option<&str>,
    address: Option<Ipv4Addr>,
    extra: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut request = Map::new();
    request.insert("client-hardware-address".into(), mac.into());
    if let Some(extra) = extra {
        for (key, value) in extra {
            request.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    if let Some(hostname) = hostname {
        request
            .entry("hostname".to_string())
            .or_insert_with(|| hostname.into());
    }
    if let Some(address) = address {
        request
            .entry("bootp-client-address".to_string())
            .or_insert_with(|| address.to_string().into());
    }
    request
        .entry("dhcp-message-type".to_string())
        .or_insert_with(|| "discover".into());
    request
        .entry("parameters-request-list".to_string())
        .or_insert_with(|| DEFAULT_PARAMETERS.iter().copied().collect());
    request
}

/// The interface MAC address, lowercase colon-hex, from sysfs.
fn interface_mac(interface: &str) -> Result<String> {
    let path = format!("/sys/class/net/{interface}/address");
    let mac = std::fs::read_to_string(&path)
        .with_context(|| format!("cannot read MAC address of interface {interface}"))?;
    Ok(mac.trim().to_ascii_lowercase())
}

/// The interface's first IPv4 address, when it has one.
fn interface_address(interface: &str) -> Option<Ipv4Addr> {
    let addrs = nix::ifaddrs::getifaddrs().ok()?;
    for entry in addrs {
        if entry.interface_name != interface {
            continue;
        }
        if let Some(address) = entry.address.and_then(|a| a.as_sockaddr_in().map(|s| s.ip())) {
            if !address.is_unspecified() {
                return Some(address);
            }
        }
    }
    None
}

fn hostname() -> Option<String> {
    nix::unistd::gethostname()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Broadcast-capable socket on the client port, pinned to the interface.
fn bind_client_socket(interface: &str) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    #[cfg(target_os = "linux")]
    socket.bind_device(Some(interface.as_bytes()))?;
    #[cfg(not(target_os = "linux"))]
    let _ = interface;
    socket.set_nonblocking(true)?;
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), CLIENT_PORT);
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_the_defaults() {
        let request = build_request("aa:bb:cc:dd:ee:ff", Some("probe"), None, None);
        assert_eq!(
            request["client-hardware-address"],
            Value::from("aa:bb:cc:dd:ee:ff")
        );
        assert_eq!(request["hostname"], Value::from("probe"));
        assert_eq!(request["dhcp-message-type"], Value::from("discover"));
        assert_eq!(
            request["parameters-request-list"],
            serde_json::json!([
                "hostname",
                "subnet-mask",
                "routers",
                "domain-name",
                "domain-name-servers",
                "time-offset",
                "ntp-servers"
            ])
        );
        assert!(!request.contains_key("bootp-client-address"));
    }

    #[test]
    fn interface_address_is_included_when_known() {
        let request = build_request(
            "aa:bb:cc:dd:ee:ff",
            None,
            Some(Ipv4Addr::new(192, 168, 40, 7)),
            None,
        );
        assert_eq!(request["bootp-client-address"], Value::from("192.168.40.7"));
    }

    #[test]
    fn extra_attributes_are_merged() {
        let extra = config_extra(r#"{"user-class":"6950580a","hostname":"custom"}"#);
        let request = build_request("aa:bb:cc:dd:ee:ff", Some("probe"), None, Some(&extra));
        assert_eq!(request["user-class"], Value::from("6950580a"));
        // caller-supplied hostname wins over the system one
        assert_eq!(request["hostname"], Value::from("custom"));
    }

    #[test]
    fn extra_may_override_the_message_type() {
        let extra = config_extra(r#"{"dhcp-message-type":"inform"}"#);
        let request = build_request("aa:bb:cc:dd:ee:ff", None, None, Some(&extra));
        assert_eq!(request["dhcp-message-type"], Value::from("inform"));
    }

    #[test]
    fn built_request_encodes_as_a_bootrequest() {
        let request = build_request("aa:bb:cc:dd:ee:ff", Some("probe"), None, None);
        let frame = codec::encode_object(&request).unwrap();
        assert_eq!(frame.op, BOOTREQUEST);
        assert_eq!(frame.message_type, MessageType::Discover);
    }

    fn config_extra(text: &str) -> Map<String, Value> {
        crate::config::parse_request_extra(text).unwrap()
    }
}
