//! DHCP wire frame layout and correlation keys.
//!
//! The fixed BOOTP header is defined by RFC 2131; the variable options area
//! follows the magic cookie and is terminated by option 255.

use std::fmt;
use std::net::Ipv4Addr;

use macaddr::MacAddr6;

use crate::error::CodecError;

/// BOOTP operation: client request.
pub const BOOTREQUEST: u8 = 1;
/// BOOTP operation: server reply.
pub const BOOTREPLY: u8 = 2;

/// DHCP magic cookie, network byte order.
pub const DHCP_MAGIC_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Byte offset of the options area (fixed header + magic cookie).
pub const OPTIONS_OFFSET: usize = 240;

/// Capacity of the options area, end marker included.
pub const OPTIONS_CAPACITY: usize = 2048;

/// Minimum BOOTP frame length on the wire; shorter frames are zero-padded.
pub const MIN_FRAME_LEN: usize = 300;

/// Ethernet hardware address length (htype 1).
pub const HW_ADDR_LEN: usize = 6;

/// DHCP message types as carried in option 53.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
    ForceRenew = 9,
    LeaseQuery = 10,
    LeaseUnassigned = 11,
    LeaseUnknown = 12,
    LeaseActive = 13,
    BulkLeaseQuery = 14,
    LeaseQueryDone = 15,
}

impl MessageType {
    /// Parse from the option 53 value.
    pub fn from_code(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Discover),
            2 => Some(Self::Offer),
            3 => Some(Self::Request),
            4 => Some(Self::Decline),
            5 => Some(Self::Ack),
            6 => Some(Self::Nak),
            7 => Some(Self::Release),
            8 => Some(Self::Inform),
            9 => Some(Self::ForceRenew),
            10 => Some(Self::LeaseQuery),
            11 => Some(Self::LeaseUnassigned),
            12 => Some(Self::LeaseUnknown),
            13 => Some(Self::LeaseActive),
            14 => Some(Self::BulkLeaseQuery),
            15 => Some(Self::LeaseQueryDone),
            _ => None,
        }
    }

    /// Parse from the lowercase protocol name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        (1..=15)
            .filter_map(Self::from_code)
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// The name used on the JSON side of the codec.
    pub fn name(self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::Offer => "offer",
            Self::Request => "request",
            Self::Decline => "decline",
            Self::Ack => "ack",
            Self::Nak => "nak",
            Self::Release => "release",
            Self::Inform => "inform",
            Self::ForceRenew => "forcerenew",
            Self::LeaseQuery => "leasequery",
            Self::LeaseUnassigned => "leaseunassigned",
            Self::LeaseUnknown => "leaseunknown",
            Self::LeaseActive => "leaseactive",
            Self::BulkLeaseQuery => "bulkleasequery",
            Self::LeaseQueryDone => "leasequerydone",
        }
    }

    /// Fold a reply type onto the request type that elicited it, so both
    /// sides of an exchange share one correlation key.
    pub fn bucket(self) -> Self {
        match self {
            Self::Offer => Self::Discover,
            Self::Ack | Self::Nak => Self::Request,
            other => other,
        }
    }

    /// The BOOTP op byte a frame of this type carries.
    pub fn bootp_op(self) -> u8 {
        match self {
            Self::Discover | Self::Request | Self::Decline | Self::Release | Self::Inform => {
                BOOTREQUEST
            }
            _ => BOOTREPLY,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The 11-byte tuple that links a reply back to its pending request:
/// `chaddr[0..5] || xid[0..3] || type_bucket`.
///
/// The key is opaque; it is compared bytewise and hashed with a trivial
/// byte-mixing hash (see `relay::table`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationKey(pub [u8; 11]);

impl CorrelationKey {
    pub fn new(chaddr: MacAddr6, xid: u32, type_bucket: u8) -> Self {
        let mut key = [0u8; 11];
        key[..6].copy_from_slice(chaddr.as_bytes());
        key[6..10].copy_from_slice(&xid.to_le_bytes());
        key[10] = type_bucket;
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; 11] {
        &self.0
    }
}

/// Format a MAC address the way it appears in JSON payloads and logs:
/// six lowercase hex pairs joined by `:`.
pub fn format_mac(mac: MacAddr6) -> String {
    let b = mac.as_bytes();
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b[0], b[1], b[2], b[3], b[4], b[5]
    )
}

/// Parse a colon-separated lowercase or uppercase MAC address.
pub fn parse_mac(s: &str) -> Result<MacAddr6, CodecError> {
    let mut bytes = [0u8; HW_ADDR_LEN];
    let mut parts = s.split(':');
    for slot in bytes.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| CodecError::BadHardwareAddress(s.to_string()))?;
        if part.len() != 2 {
            return Err(CodecError::BadHardwareAddress(s.to_string()));
        }
        *slot = u8::from_str_radix(part, 16)
            .map_err(|_| CodecError::BadHardwareAddress(s.to_string()))?;
    }
    if parts.next().is_some() {
        return Err(CodecError::BadHardwareAddress(s.to_string()));
    }
    Ok(MacAddr6::from(bytes))
}

/// A DHCP frame split into its fixed header and raw options area.
///
/// All multi-byte integers are held in host order; serialization restores
/// network order. The options area excludes the magic cookie and holds the
/// raw TLV bytes up to (and excluding) any trailing padding.
#[derive(Debug, Clone)]
pub struct DhcpFrame {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: Ipv4Addr,
    pub yiaddr: Ipv4Addr,
    pub siaddr: Ipv4Addr,
    pub giaddr: Ipv4Addr,
    pub chaddr: [u8; 16],
    pub sname: [u8; 64],
    pub file: [u8; 128],
    pub options: Vec<u8>,
}

impl Default for DhcpFrame {
    fn default() -> Self {
        Self {
            op: 0,
            htype: 1,
            hlen: HW_ADDR_LEN as u8,
            hops: 0,
            xid: 0,
            secs: 0,
            flags: 0,
            ciaddr: Ipv4Addr::UNSPECIFIED,
            yiaddr: Ipv4Addr::UNSPECIFIED,
            siaddr: Ipv4Addr::UNSPECIFIED,
            giaddr: Ipv4Addr::UNSPECIFIED,
            chaddr: [0; 16],
            sname: [0; 64],
            file: [0; 128],
            options: Vec::new(),
        }
    }
}

impl DhcpFrame {
    /// Parse the fixed header of a frame received from the wire.
    ///
    /// Fails with `MalformedFrame` when the buffer is shorter than the fixed
    /// header or the magic cookie does not match; `BadOp` and `BadHardware`
    /// enforce the BOOTP operation and Ethernet hardware address contract.
    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < OPTIONS_OFFSET || data[236..240] != DHCP_MAGIC_COOKIE {
            return Err(CodecError::MalformedFrame);
        }

        let op = data[0];
        if op != BOOTREQUEST && op != BOOTREPLY {
            return Err(CodecError::BadOp(op));
        }

        let htype = data[1];
        let hlen = data[2];
        if htype != 1 || hlen != HW_ADDR_LEN as u8 {
            return Err(CodecError::BadHardware { htype, hlen });
        }

        let mut chaddr = [0u8; 16];
        chaddr.copy_from_slice(&data[28..44]);
        let mut sname = [0u8; 64];
        sname.copy_from_slice(&data[44..108]);
        let mut file = [0u8; 128];
        file.copy_from_slice(&data[108..236]);

        Ok(Self {
            op,
            htype,
            hlen,
            hops: data[3],
            xid: u32::from_be_bytes([data[4], data[5], data[6], data[7]]),
            secs: u16::from_be_bytes([data[8], data[9]]),
            flags: u16::from_be_bytes([data[10], data[11]]),
            ciaddr: Ipv4Addr::new(data[12], data[13], data[14], data[15]),
            yiaddr: Ipv4Addr::new(data[16], data[17], data[18], data[19]),
            siaddr: Ipv4Addr::new(data[20], data[21], data[22], data[23]),
            giaddr: Ipv4Addr::new(data[24], data[25], data[26], data[27]),
            chaddr,
            sname,
            file,
            options: data[OPTIONS_OFFSET..].to_vec(),
        })
    }

    /// Serialize to wire format, zero-padded to the BOOTP minimum of 300
    /// bytes. The options area must already carry its end marker.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(OPTIONS_OFFSET + self.options.len());
        out.push(self.op);
        out.push(self.htype);
        out.push(self.hlen);
        out.push(self.hops);
        out.extend_from_slice(&self.xid.to_be_bytes());
        out.extend_from_slice(&self.secs.to_be_bytes());
        out.extend_from_slice(&self.flags.to_be_bytes());
        out.extend_from_slice(&self.ciaddr.octets());
        out.extend_from_slice(&self.yiaddr.octets());
        out.extend_from_slice(&self.siaddr.octets());
        out.extend_from_slice(&self.giaddr.octets());
        out.extend_from_slice(&self.chaddr);
        out.extend_from_slice(&self.sname);
        out.extend_from_slice(&self.file);
        out.extend_from_slice(&DHCP_MAGIC_COOKIE);
        out.extend_from_slice(&self.options);
        if out.len() < MIN_FRAME_LEN {
            out.resize(MIN_FRAME_LEN, 0);
        }
        out
    }

    /// The client hardware address (first `hlen` bytes of chaddr).
    pub fn mac(&self) -> MacAddr6 {
        MacAddr6::new(
            self.chaddr[0],
            self.chaddr[1],
            self.chaddr[2],
            self.chaddr[3],
            self.chaddr[4],
            self.chaddr[5],
        )
    }
}
