use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while translating between DHCP frames and JSON.
///
/// Codec errors are always recovered locally: the offending frame or JSON
/// line is logged and dropped, and the event loop continues.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("truncated frame or invalid magic")]
    MalformedFrame,

    #[error("invalid BOOTP operation {0}")]
    BadOp(u8),

    #[error("invalid client hardware address type {htype} or length {hlen}")]
    BadHardware { htype: u8, hlen: u8 },

    #[error("invalid length {len} for DHCP option \"{key}\" (min:{min}/max:{max}/modulo:{modulo})")]
    BadOptionLength {
        key: &'static str,
        len: usize,
        min: u8,
        max: u8,
        modulo: u8,
    },

    #[error("unknown DHCP message type \"{0}\"")]
    BadMessageType(String),

    #[error("invalid top-level JSON object: {0}")]
    BadJson(String),

    #[error("invalid DHCP option \"{0}\"")]
    BadOption(String),

    #[error("values list not supported for DHCP option \"{0}\"")]
    ListUnsupported(String),

    #[error("invalid value type for DHCP option \"{key}\" ({given} given, should be {expected})")]
    TypeMismatch {
        key: String,
        given: &'static str,
        expected: &'static str,
    },

    #[error("invalid hexstring format \"{0}\"")]
    BadHex(String),

    #[error("invalid IPv4 address \"{value}\" for DHCP option \"{key}\"")]
    BadAddress { key: String, value: String },

    #[error("invalid address/netmask format \"{value}\" for DHCP option \"{key}\"")]
    BadAddressMask { key: String, value: String },

    #[error("not enough space to store DHCP option \"{0}\"")]
    NoSpace(String),

    #[error("invalid client hardware address \"{0}\"")]
    BadHardwareAddress(String),

    #[error("invalid transaction id \"{0}\"")]
    BadTransactionId(String),

    #[error("invalid value for DHCP option \"{0}\"")]
    BadValue(String),

    #[error("undefined client hardware address")]
    MissingChaddr,

    #[error("undefined DHCP message type")]
    MissingType,
}

/// Fatal lifecycle errors. These abort startup with exit code 1; nothing in
/// this enum is raised once the event loop is running.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("cannot bind service socket [{addr}]: {source}")]
    SocketBind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("another instance is already running (pid {0})")]
    PidfileCollision(i32),

    #[error("cannot open pidfile {path}: {source}")]
    Pidfile {
        path: String,
        source: std::io::Error,
    },

    #[error("unknown user \"{0}\"")]
    UnknownUser(String),

    #[error("unknown group \"{0}\"")]
    UnknownGroup(String),

    #[error("empty backend command")]
    EmptyBackend,
}
