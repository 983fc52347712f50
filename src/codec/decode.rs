//! Frame-to-JSON decoder.
//!
//! Produces a flat JSON object keyed by registry names. BOOTP header fields
//! are emitted only when non-zero (the client hardware address always is);
//! options follow in wire order; unknown option codes appear under their
//! decimal code with a hex value.

use std::net::Ipv4Addr;

use macaddr::MacAddr6;
use serde_json::{Map, Value};

use crate::codec::frame::{format_mac, CorrelationKey, DhcpFrame, MessageType};
use crate::codec::registry::{self, OptionKind, OptionSpec};
use crate::error::CodecError;

/// A decoded frame: the JSON document plus the side-band fields the
/// dispatcher needs for correlation and routing.
#[derive(Debug)]
pub struct DecodedFrame {
    pub json: Map<String, Value>,
    pub op: u8,
    /// Parsed value of option 53, when the frame carried one.
    pub message_type: Option<MessageType>,
    pub chaddr: MacAddr6,
    pub xid: u32,
    pub giaddr: Ipv4Addr,
    pub key: CorrelationKey,
}

impl DecodedFrame {
    /// The message type name for logs; plain BOOTP frames have none.
    pub fn type_name(&self) -> &'static str {
        self.message_type.map(MessageType::name).unwrap_or("bootp")
    }
}

/// Decode one raw DHCP frame.
pub fn decode(data: &[u8]) -> Result<DecodedFrame, CodecError> {
    let frame = DhcpFrame::parse(data)?;
    let mut json = Map::new();

    if frame.hops != 0 {
        json.insert("bootp-relay-hops".into(), frame.hops.into());
    }
    if frame.xid != 0 {
        json.insert(
            "bootp-transaction-id".into(),
            format!("{:08x}", frame.xid).into(),
        );
    }
    if frame.secs != 0 {
        json.insert("bootp-start-time".into(), frame.secs.into());
    }
    for (key, addr) in [
        ("bootp-client-address", frame.ciaddr),
        ("bootp-assigned-address", frame.yiaddr),
        ("bootp-server-address", frame.siaddr),
        ("bootp-relay-address", frame.giaddr),
    ] {
        if !addr.is_unspecified() {
            json.insert(key.into(), addr.to_string().into());
        }
    }
    if frame.sname[0] != 0 {
        json.insert("bootp-server-name".into(), padded_string(&frame.sname).into());
    }
    if frame.file[0] != 0 {
        json.insert("bootp-filename".into(), padded_string(&frame.file).into());
    }
    json.insert("client-hardware-address".into(), format_mac(frame.mac()).into());

    let mut message_type = None;
    let mut offset = 0;
    let options = frame.options.as_slice();
    while offset < options.len() && options[offset] != 255 {
        let code = options[offset];
        let spec = registry::by_code(code as u16);

        // A bare pad byte carries no length prefix.
        if let Some(spec) = spec {
            if !spec.wire {
                offset += 1;
                continue;
            }
        }

        if offset + 1 >= options.len() {
            return Err(CodecError::MalformedFrame);
        }
        let len = options[offset + 1] as usize;
        if offset + 2 + len > options.len() {
            return Err(CodecError::MalformedFrame);
        }
        let value = &options[offset + 2..offset + 2 + len];

        match spec {
            Some(spec) => {
                check_length(spec, len)?;
                if spec.kind == OptionKind::MessageType {
                    message_type = Some(
                        MessageType::from_code(value[0])
                            .ok_or_else(|| CodecError::BadMessageType(value[0].to_string()))?,
                    );
                }
                json.insert(spec.key.into(), decode_value(spec, value));
            }
            None => {
                json.insert(code.to_string(), hex_string(value).into());
            }
        }
        offset += 2 + len;
    }

    let chaddr = frame.mac();
    let type_byte = message_type.map(|t| t as u8).unwrap_or(0);
    Ok(DecodedFrame {
        key: CorrelationKey::new(chaddr, frame.xid, type_byte),
        op: frame.op,
        message_type,
        chaddr,
        xid: frame.xid,
        giaddr: frame.giaddr,
        json,
    })
}

fn check_length(spec: &OptionSpec, len: usize) -> Result<(), CodecError> {
    let bad = (spec.modulo > 0 && len % spec.modulo as usize != 0)
        || (spec.min > 0 && len < spec.min as usize)
        || (spec.max > 0 && len > spec.max as usize);
    if bad {
        return Err(CodecError::BadOptionLength {
            key: spec.key,
            len,
            min: spec.min,
            max: spec.max,
            modulo: spec.modulo,
        });
    }
    Ok(())
}

fn decode_value(spec: &OptionSpec, value: &[u8]) -> Value {
    if spec.list {
        // Elements are modulo-sized chunks; with no modulo the whole value
        // decodes as a single element.
        let stride = if spec.modulo > 0 {
            spec.modulo as usize
        } else {
            value.len().max(1)
        };
        Value::Array(
            value
                .chunks(stride)
                .map(|chunk| decode_element(spec, chunk))
                .collect(),
        )
    } else {
        decode_element(spec, value)
    }
}

fn decode_element(spec: &OptionSpec, value: &[u8]) -> Value {
    match spec.kind {
        OptionKind::Opaque => hex_string(value).into(),
        OptionKind::Boolean => (value[0] != 0).into(),
        OptionKind::Integer => {
            let width = (spec.min as usize).min(4).min(value.len());
            value[..width]
                .iter()
                .fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
                .into()
        }
        OptionKind::String => String::from_utf8_lossy(value).into_owned().into(),
        OptionKind::Address => Ipv4Addr::new(value[0], value[1], value[2], value[3])
            .to_string()
            .into(),
        OptionKind::AddressMask => format!(
            "{}/{}",
            Ipv4Addr::new(value[0], value[1], value[2], value[3]),
            Ipv4Addr::new(value[4], value[5], value[6], value[7])
        )
        .into(),
        OptionKind::OptionRef => registry::by_code(value[0] as u16)
            .map(|s| s.key.to_string())
            .unwrap_or_else(|| value[0].to_string())
            .into(),
        OptionKind::MessageType => MessageType::from_code(value[0])
            .map(|t| t.name().to_string())
            .unwrap_or_default()
            .into(),
        OptionKind::None => Value::Null,
    }
}

fn hex_string(value: &[u8]) -> String {
    value.iter().map(|b| format!("{b:02x}")).collect()
}

fn padded_string(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
