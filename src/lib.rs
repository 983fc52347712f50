//! salur - DHCPv4 front-end brokering requests as JSON to backend workers.
//!
//! The server terminates DHCP traffic on a UDP socket, translates every
//! frame to a compact JSON line, and hands it to a pool of long-running
//! backend processes that implement the actual lease policy. Replies come
//! back as JSON lines on the workers' stdout and are matched to their
//! requests through an 11-byte correlation key. A second mode issues a
//! single DISCOVER and prints the first matching OFFER as JSON.

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod pidfile;
pub mod relay;
