//! The relay dispatcher.
//!
//! One task owns the service UDP socket, the pending-request table and the
//! worker pool, multiplexed with a 1 Hz maintenance tick. Worker pipe
//! readers feed stdout lines back through an mpsc channel, so every state
//! mutation happens on this task and no locking is needed.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::codec::{self, frame::format_mac, frame::BOOTREQUEST, EncodedFrame};
use crate::config::Settings;
use crate::error::RelayError;
use crate::relay::pool::{WorkerEvent, WorkerPool};
use crate::relay::table::{PendingRequest, RequestTable};

/// Channel depth between worker stdout readers and the dispatcher.
const EVENT_QUEUE: usize = 256;

/// Scratch receive buffer; covers the fixed header plus a full options area.
const RECV_BUFFER: usize = 4096;

pub struct RelayServer {
    socket: UdpSocket,
    table: RequestTable,
    pool: WorkerPool,
    events: mpsc::Receiver<WorkerEvent>,
}

impl RelayServer {
    /// Bind the service socket and prepare the worker pool. Binding failures
    /// are fatal at startup.
    pub fn bind(settings: &Settings) -> Result<Self, RelayError> {
        let addr = SocketAddr::new(settings.address, settings.port);
        let socket = bind_service_socket(addr, settings.interface.as_deref())
            .map_err(|source| RelayError::SocketBind { addr, source })?;
        let socket = UdpSocket::from_std(socket)
            .map_err(|source| RelayError::SocketBind { addr, source })?;

        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        let backend = settings.backend.clone().ok_or(RelayError::EmptyBackend)?;
        let pool = WorkerPool::new(backend, settings.workers, settings.credentials, tx);

        Ok(Self {
            socket,
            table: RequestTable::new(),
            pool,
            events: rx,
        })
    }

    /// Run the event loop until SIGTERM or SIGINT.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!("listening on {}", self.socket.local_addr()?);
        self.pool.maintain();

        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut buf = [0u8; RECV_BUFFER];

        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => self.handle_frame(&buf[..len], peer).await,
                    Err(e) => warn!("service socket receive error: {}", e),
                },
                event = self.events.recv() => match event {
                    Some(WorkerEvent::Line { slot, pid, line }) => {
                        self.handle_worker_line(slot, pid, &line).await;
                    }
                    Some(WorkerEvent::Eof { slot, pid }) => self.pool.mark_eof(slot, pid),
                    None => {}
                },
                _ = tick.tick() => self.handle_tick(),
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                    break;
                }
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Decode an inbound frame, register it and steer it to one worker.
    async fn handle_frame(&mut self, data: &[u8], peer: SocketAddr) {
        let decoded = match codec::decode(data) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("invalid DHCP frame received from {}: {}", peer, e);
                return;
            }
        };
        // only client requests are brokered; replies on the service socket
        // are someone else's traffic
        if decoded.op != BOOTREQUEST {
            warn!("ignoring BOOTREPLY frame received from {}", peer);
            return;
        }
        let type_name = decoded.type_name();
        let mac = format_mac(decoded.chaddr);
        let xid = decoded.xid;
        info!("dhcp-{} received from {} for {}/{:08x}", type_name, peer, mac, xid);

        let now = Instant::now();
        let selector = decoded.chaddr.as_bytes()[5];
        let request = PendingRequest::new(&decoded, peer, now);
        let key = request.key;
        self.table.insert(request);

        let Some(slot) = self.pool.select(selector, now) else {
            error!("no available backend worker to process request");
            self.table.remove(&key);
            return;
        };
        let pid = self.pool.pid_of(slot).unwrap_or(0);
        let line = serde_json::Value::Object(decoded.json).to_string();
        match self.pool.dispatch(slot, &line).await {
            Ok(()) => info!(
                "dhcp-{} for {}/{:08x} forwarded to backend worker {}",
                type_name, mac, xid, pid
            ),
            Err(e) => {
                // the pending entry stays and expires on its own
                warn!("error forwarding request to backend worker {}: {}", pid, e);
            }
        }
    }

    /// Encode one worker stdout line and route the reply to its requester.
    async fn handle_worker_line(&mut self, slot: usize, pid: u32, line: &str) {
        if self.pool.pid_of(slot) != Some(pid) {
            return;
        }
        let frame = match codec::encode(line) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                // heartbeat; refreshes liveness only
                self.pool.stamp(slot, pid, Instant::now());
                return;
            }
            Err(e) => {
                warn!("received invalid JSON from backend worker {}: {}", pid, e);
                return;
            }
        };
        self.pool.stamp(slot, pid, Instant::now());
        info!(
            "dhcp-{} for {}/{:08x} received from backend worker {}",
            frame.message_type,
            format_mac(frame.chaddr),
            frame.xid,
            pid
        );

        let Some(pending) = self.table.lookup(&frame.key) else {
            warn!(
                "no matching pending request for {}/{:08x}, ignoring response from backend worker {}",
                format_mac(frame.chaddr),
                frame.xid,
                pid
            );
            return;
        };
        let destination = reply_destination(&frame, pending.remote);
        match self.socket.send_to(&frame.bytes, destination).await {
            Ok(_) => {
                info!(
                    "dhcp-{} for {}/{:08x} sent to {}",
                    frame.message_type,
                    format_mac(frame.chaddr),
                    frame.xid,
                    destination
                );
                self.table.remove(&frame.key);
            }
            Err(e) => {
                // entry left in place; the tick expires it
                warn!(
                    "error sending dhcp-{} for {}/{:08x} to {}: {}",
                    frame.message_type,
                    format_mac(frame.chaddr),
                    frame.xid,
                    destination,
                    e
                );
            }
        }
    }

    /// The 1 Hz maintenance pass: respawn dead workers, evict stale entries.
    fn handle_tick(&mut self) {
        self.pool.maintain();
        for expired in self.table.expire(Instant::now()) {
            warn!(
                "no backend response to dhcp-{} for {}/{:08x}",
                expired.type_name(),
                format_mac(expired.chaddr),
                expired.xid
            );
        }
    }
}

/// Replies to relayed requests unicast to the relay agent; everything else
/// goes to the limited broadcast address. The requester's source port is
/// preserved either way.
fn reply_destination(frame: &EncodedFrame, remote: SocketAddr) -> SocketAddr {
    if frame.giaddr.is_unspecified() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), remote.port())
    } else {
        SocketAddr::new(IpAddr::V4(frame.giaddr), remote.port())
    }
}

/// Build the service socket: broadcast-capable, address reuse, non-blocking,
/// optionally pinned to an interface.
fn bind_service_socket(
    addr: SocketAddr,
    interface: Option<&str>,
) -> std::io::Result<std::net::UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    #[cfg(target_os = "linux")]
    if let Some(interface) = interface {
        socket.bind_device(Some(interface.as_bytes()))?;
    }
    #[cfg(not(target_os = "linux"))]
    let _ = interface;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    Ok(socket.into())
}
