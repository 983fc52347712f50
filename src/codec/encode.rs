//! JSON-to-frame encoder.
//!
//! Accepts a flat JSON object keyed by registry names (or decimal option
//! codes) and emits a complete DHCP frame. BOOTP header pseudo-codes write
//! into the fixed header; everything else becomes a TLV in the options area,
//! terminated by option 255 and zero-padded to the BOOTP minimum.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use macaddr::MacAddr6;
use rand::Rng;
use serde_json::{Map, Value};

use crate::codec::frame::{
    parse_mac, CorrelationKey, DhcpFrame, MessageType, HW_ADDR_LEN, OPTIONS_CAPACITY,
};
use crate::codec::registry::{
    self, KeyResolution, OptionKind, OptionSpec, FRAME_ASSIGNED_ADDRESS, FRAME_CLIENT_ADDRESS,
    FRAME_CLIENT_HW_ADDRESS, FRAME_FILENAME, FRAME_RELAY_ADDRESS, FRAME_RELAY_HOPS,
    FRAME_SERVER_ADDRESS, FRAME_SERVER_NAME, FRAME_START_TIME, FRAME_TRANSACTION_ID,
};
use crate::error::CodecError;

/// An encoded frame plus the side-band fields the dispatcher needs.
#[derive(Debug)]
pub struct EncodedFrame {
    pub bytes: Vec<u8>,
    pub op: u8,
    pub message_type: MessageType,
    pub chaddr: MacAddr6,
    pub xid: u32,
    pub giaddr: Ipv4Addr,
    /// Correlation key with the reply type folded onto its request type, so
    /// it matches the key of the pending request being answered.
    pub key: CorrelationKey,
}

/// Encode one line of JSON.
///
/// An empty object `{}` is a well-formed no-op (workers may emit it as a
/// heartbeat) and yields `Ok(None)`.
pub fn encode(input: &str) -> Result<Option<EncodedFrame>, CodecError> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| CodecError::BadJson(e.to_string()))?;
    let object = match value {
        Value::Object(object) => object,
        _ => return Err(CodecError::BadJson("not a top-level object".into())),
    };
    if object.is_empty() {
        return Ok(None);
    }
    encode_object(&object).map(Some)
}

/// Encode an already-parsed JSON object.
pub fn encode_object(object: &Map<String, Value>) -> Result<EncodedFrame, CodecError> {
    let mut frame = DhcpFrame::default();
    let mut used: HashSet<u16> = HashSet::new();
    let mut message_type: Option<MessageType> = None;

    for (key, value) in object {
        let resolved =
            registry::resolve_key(key).ok_or_else(|| CodecError::BadOption(key.clone()))?;

        match resolved {
            KeyResolution::Known(spec) => {
                if !used.insert(spec.code) {
                    continue;
                }
                encode_known(&mut frame, &mut message_type, spec, key, value)?;
            }
            KeyResolution::Unknown(code) => {
                if !used.insert(code as u16) {
                    continue;
                }
                let hex = value
                    .as_str()
                    .ok_or_else(|| mismatch(key, value, "hexstring"))?;
                push_opaque_tlv(&mut frame.options, code, key, hex)?;
            }
        }
    }

    let message_type = message_type.ok_or(CodecError::MissingType)?;
    if frame.chaddr[..HW_ADDR_LEN].iter().all(|&b| b == 0) {
        return Err(CodecError::MissingChaddr);
    }
    if frame.xid == 0 {
        frame.xid = rand::thread_rng().gen();
    }

    ensure_space(&frame.options, 1, "end")?;
    frame.options.push(255);
    frame.op = message_type.bootp_op();

    let chaddr = frame.mac();
    Ok(EncodedFrame {
        op: frame.op,
        message_type,
        chaddr,
        xid: frame.xid,
        giaddr: frame.giaddr,
        key: CorrelationKey::new(chaddr, frame.xid, message_type.bucket() as u8),
        bytes: frame.to_bytes(),
    })
}

fn encode_known(
    frame: &mut DhcpFrame,
    message_type: &mut Option<MessageType>,
    spec: &'static OptionSpec,
    key: &str,
    value: &Value,
) -> Result<(), CodecError> {
    let elements: &[Value] = match value {
        Value::Array(items) => {
            if !spec.list {
                return Err(CodecError::ListUnsupported(key.to_string()));
            }
            if items.is_empty() {
                return Err(CodecError::BadValue(key.to_string()));
            }
            items
        }
        single => std::slice::from_ref(single),
    };
    let items = elements.len();

    match spec.kind {
        // Pad carries no value; accept and ignore.
        OptionKind::None => Ok(()),

        OptionKind::Opaque => {
            for element in elements {
                let text = element
                    .as_str()
                    .ok_or_else(|| mismatch(key, element, "hexstring"))?;
                match spec.code {
                    FRAME_CLIENT_HW_ADDRESS => {
                        let mac = parse_mac(text)?;
                        frame.chaddr[..HW_ADDR_LEN].copy_from_slice(mac.as_bytes());
                    }
                    FRAME_TRANSACTION_ID => {
                        if text.is_empty() || text.len() > 8 {
                            return Err(CodecError::BadTransactionId(text.to_string()));
                        }
                        frame.xid = u32::from_str_radix(text, 16)
                            .map_err(|_| CodecError::BadTransactionId(text.to_string()))?;
                    }
                    _ => push_opaque_tlv(&mut frame.options, spec.code as u8, key, text)?,
                }
            }
            Ok(())
        }

        OptionKind::Boolean => {
            push_tlv_header(&mut frame.options, spec, items, key)?;
            for element in elements {
                let flag = element
                    .as_bool()
                    .ok_or_else(|| mismatch(key, element, "boolean"))?;
                frame.options.push(flag as u8);
            }
            Ok(())
        }

        OptionKind::Integer => {
            if spec.code == FRAME_RELAY_HOPS || spec.code == FRAME_START_TIME {
                let number = elements[0]
                    .as_u64()
                    .ok_or_else(|| mismatch(key, &elements[0], "integer"))?;
                if spec.code == FRAME_RELAY_HOPS {
                    frame.hops = number as u8;
                } else {
                    frame.secs = number as u16;
                }
                return Ok(());
            }
            push_tlv_header(&mut frame.options, spec, items, key)?;
            for element in elements {
                let number = element
                    .as_u64()
                    .ok_or_else(|| mismatch(key, element, "integer"))?;
                let width = spec.min as usize;
                for shift in (0..width).rev() {
                    frame.options.push((number >> (shift * 8)) as u8);
                }
            }
            Ok(())
        }

        OptionKind::String => {
            for element in elements {
                let text = element
                    .as_str()
                    .ok_or_else(|| mismatch(key, element, "string"))?;
                match spec.code {
                    FRAME_SERVER_NAME => copy_padded(&mut frame.sname, text),
                    FRAME_FILENAME => copy_padded(&mut frame.file, text),
                    _ => {
                        if text.is_empty() || text.len() > u8::MAX as usize {
                            return Err(CodecError::BadValue(key.to_string()));
                        }
                        ensure_space(&frame.options, 2 + text.len(), key)?;
                        frame.options.push(spec.code as u8);
                        frame.options.push(text.len() as u8);
                        frame.options.extend_from_slice(text.as_bytes());
                    }
                }
            }
            Ok(())
        }

        OptionKind::Address => {
            let header_codes = [
                FRAME_CLIENT_ADDRESS,
                FRAME_ASSIGNED_ADDRESS,
                FRAME_SERVER_ADDRESS,
                FRAME_RELAY_ADDRESS,
            ];
            if !header_codes.contains(&spec.code) {
                push_tlv_header(&mut frame.options, spec, items, key)?;
            }
            for element in elements {
                let text = element
                    .as_str()
                    .ok_or_else(|| mismatch(key, element, "IPv4 address"))?;
                let addr = parse_address(key, text)?;
                match spec.code {
                    FRAME_CLIENT_ADDRESS => frame.ciaddr = addr,
                    FRAME_ASSIGNED_ADDRESS => frame.yiaddr = addr,
                    FRAME_SERVER_ADDRESS => frame.siaddr = addr,
                    FRAME_RELAY_ADDRESS => frame.giaddr = addr,
                    _ => frame.options.extend_from_slice(&addr.octets()),
                }
            }
            Ok(())
        }

        OptionKind::AddressMask => {
            push_tlv_header(&mut frame.options, spec, items, key)?;
            for element in elements {
                let text = element
                    .as_str()
                    .ok_or_else(|| mismatch(key, element, "IPv4 address/netmask couple"))?;
                let (addr, mask) = text.split_once('/').ok_or_else(|| {
                    CodecError::BadAddressMask {
                        key: key.to_string(),
                        value: text.to_string(),
                    }
                })?;
                frame
                    .options
                    .extend_from_slice(&parse_address(key, addr)?.octets());
                frame
                    .options
                    .extend_from_slice(&parse_address(key, mask)?.octets());
            }
            Ok(())
        }

        OptionKind::OptionRef => {
            push_tlv_header(&mut frame.options, spec, items, key)?;
            for element in elements {
                let text = element
                    .as_str()
                    .ok_or_else(|| mismatch(key, element, "DHCP option"))?;
                match registry::resolve_key(text) {
                    Some(KeyResolution::Known(target)) if target.code < 255 => {
                        frame.options.push(target.code as u8);
                    }
                    _ => return Err(CodecError::BadOption(text.to_string())),
                }
            }
            Ok(())
        }

        OptionKind::MessageType => {
            let text = elements[0]
                .as_str()
                .ok_or_else(|| mismatch(key, &elements[0], "DHCP message type"))?;
            let parsed = MessageType::from_name(text)
                .ok_or_else(|| CodecError::BadMessageType(text.to_string()))?;
            ensure_space(&frame.options, 3, key)?;
            frame.options.push(spec.code as u8);
            frame.options.push(1);
            frame.options.push(parsed as u8);
            *message_type = Some(parsed);
            Ok(())
        }
    }
}

fn mismatch(key: &str, value: &Value, expected: &'static str) -> CodecError {
    let given = match value {
        Value::String(_) => "string",
        Value::Number(_) => "integer",
        Value::Bool(_) => "boolean",
        Value::Array(_) => "list",
        Value::Null => "null",
        Value::Object(_) => "object",
    };
    CodecError::TypeMismatch {
        key: key.to_string(),
        given,
        expected,
    }
}

fn parse_address(key: &str, text: &str) -> Result<Ipv4Addr, CodecError> {
    text.parse().map_err(|_| CodecError::BadAddress {
        key: key.to_string(),
        value: text.to_string(),
    })
}

fn ensure_space(options: &[u8], needed: usize, key: &str) -> Result<(), CodecError> {
    if options.len() + needed > OPTIONS_CAPACITY {
        return Err(CodecError::NoSpace(key.to_string()));
    }
    Ok(())
}

/// Write the code/length prefix of a fixed-stride TLV (integers, booleans,
/// addresses, address/mask couples, option references).
fn push_tlv_header(
    options: &mut Vec<u8>,
    spec: &OptionSpec,
    items: usize,
    key: &str,
) -> Result<(), CodecError> {
    let len = spec.min as usize * items;
    if len > u8::MAX as usize {
        return Err(CodecError::NoSpace(key.to_string()));
    }
    ensure_space(options, 2 + len, key)?;
    options.push(spec.code as u8);
    options.push(len as u8);
    Ok(())
}

fn push_opaque_tlv(
    options: &mut Vec<u8>,
    code: u8,
    key: &str,
    hex: &str,
) -> Result<(), CodecError> {
    if hex.is_empty() || hex.len() % 2 != 0 || hex.len() / 2 > u8::MAX as usize {
        return Err(CodecError::BadHex(hex.to_string()));
    }
    let mut bytes = Vec::with_capacity(hex.len() / 2);
    for pair in hex.as_bytes().chunks(2) {
        let pair = std::str::from_utf8(pair).map_err(|_| CodecError::BadHex(hex.to_string()))?;
        bytes.push(
            u8::from_str_radix(pair, 16).map_err(|_| CodecError::BadHex(hex.to_string()))?,
        );
    }
    ensure_space(options, 2 + bytes.len(), key)?;
    options.push(code);
    options.push(bytes.len() as u8);
    options.extend_from_slice(&bytes);
    Ok(())
}

fn copy_padded(field: &mut [u8], text: &str) {
    field.fill(0);
    let len = text.len().min(field.len() - 1);
    field[..len].copy_from_slice(&text.as_bytes()[..len]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode::decode;
    use crate::codec::frame::{BOOTREPLY, BOOTREQUEST, MIN_FRAME_LEN, OPTIONS_OFFSET};

    fn options_of(frame: &EncodedFrame) -> &[u8] {
        &frame.bytes[OPTIONS_OFFSET..]
    }

    fn find_tlv<'a>(options: &'a [u8], code: u8) -> Option<&'a [u8]> {
        let mut offset = 0;
        while offset < options.len() && options[offset] != 255 {
            if options[offset] == 0 {
                offset += 1;
                continue;
            }
            let len = options[offset + 1] as usize;
            if options[offset] == code {
                return Some(&options[offset + 2..offset + 2 + len]);
            }
            offset += 2 + len;
        }
        None
    }

    mod discover_roundtrip {
        use super::*;

        #[test]
        fn encodes_the_reference_discover() {
            let frame = encode(
                r#"{"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"discover","parameters-request-list":["subnet-mask","routers"]}"#,
            )
            .unwrap()
            .unwrap();

            assert_eq!(frame.op, BOOTREQUEST);
            assert_eq!(frame.bytes[0], BOOTREQUEST);
            assert_eq!(frame.bytes[1], 1);
            assert_eq!(frame.bytes[2], 6);
            assert_eq!(&frame.bytes[28..34], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
            assert_eq!(&frame.bytes[236..240], &[0x63, 0x82, 0x53, 0x63]);
            assert_eq!(frame.bytes.len(), MIN_FRAME_LEN);

            let options = options_of(&frame);
            assert_eq!(find_tlv(options, 53).unwrap(), &[1]);
            assert_eq!(find_tlv(options, 55).unwrap(), &[1, 3]);
            assert!(options.contains(&255));
        }

        #[test]
        fn decode_of_encode_preserves_every_key() {
            let input = serde_json::json!({
                "client-hardware-address": "aa:bb:cc:dd:ee:ff",
                "dhcp-message-type": "discover",
                "parameters-request-list": ["subnet-mask", "routers"],
                "hostname": "probe",
                "requested-ip-address": "192.168.1.50",
            });
            let object = input.as_object().unwrap();
            let frame = encode_object(object).unwrap();
            let decoded = decode(&frame.bytes).unwrap();
            for (key, value) in object {
                assert_eq!(decoded.json.get(key), Some(value), "key {key}");
            }
        }

        #[test]
        fn encode_of_decode_reproduces_the_frame() {
            let frame = encode(
                r#"{"bootp-transaction-id":"11223344","client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"discover","parameters-request-list":["subnet-mask","routers"]}"#,
            )
            .unwrap()
            .unwrap();
            let decoded = decode(&frame.bytes).unwrap();
            let again = encode_object(&decoded.json).unwrap();
            assert_eq!(frame.bytes, again.bytes);
        }
    }

    mod header_fields {
        use super::*;

        #[test]
        fn pseudo_codes_write_fixed_fields() {
            let frame = encode(
                r#"{"bootp-relay-hops":3,"bootp-transaction-id":"0000abcd","bootp-start-time":9,"bootp-client-address":"10.1.1.1","bootp-assigned-address":"10.1.1.2","bootp-server-address":"10.1.1.3","bootp-relay-address":"10.1.1.4","bootp-server-name":"srv","bootp-filename":"boot.efi","client-hardware-address":"02:00:00:00:00:01","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();

            assert_eq!(frame.bytes[3], 3);
            assert_eq!(frame.xid, 0xabcd);
            assert_eq!(&frame.bytes[4..8], &0x0000abcdu32.to_be_bytes());
            assert_eq!(&frame.bytes[8..10], &9u16.to_be_bytes());
            assert_eq!(&frame.bytes[12..16], &[10, 1, 1, 1]);
            assert_eq!(&frame.bytes[16..20], &[10, 1, 1, 2]);
            assert_eq!(&frame.bytes[20..24], &[10, 1, 1, 3]);
            assert_eq!(&frame.bytes[24..28], &[10, 1, 1, 4]);
            assert_eq!(frame.giaddr, Ipv4Addr::new(10, 1, 1, 4));
            assert_eq!(&frame.bytes[44..48], b"srv\0");
            assert_eq!(&frame.bytes[108..117], b"boot.efi\0");
            // none of these may leak into the options area
            let options = options_of(&frame);
            assert_eq!(options.iter().filter(|&&b| b == 255).count(), 1);
            assert_eq!(find_tlv(options, 53).unwrap(), &[2]);
        }

        #[test]
        fn missing_xid_gets_a_random_value() {
            let frame = encode(
                r#"{"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"discover"}"#,
            )
            .unwrap()
            .unwrap();
            assert_ne!(frame.xid, 0);
            assert_eq!(&frame.bytes[4..8], &frame.xid.to_be_bytes());
        }

        #[test]
        fn long_server_name_is_truncated() {
            let long = "x".repeat(200);
            let frame = encode(&format!(
                r#"{{"bootp-server-name":"{long}","client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}}"#,
            ))
            .unwrap()
            .unwrap();
            assert_eq!(frame.bytes[44 + 62], b'x');
            assert_eq!(frame.bytes[44 + 63], 0);
        }
    }

    mod option_values {
        use super::*;

        #[test]
        fn address_mask_list() {
            let frame = encode(
                r#"{"policy-filters":["10.0.0.0/255.0.0.0","192.168.1.0/255.255.255.0"],"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"ack"}"#,
            )
            .unwrap()
            .unwrap();
            let value = find_tlv(options_of(&frame), 21).unwrap();
            assert_eq!(value.len(), 16);
            assert_eq!(&value[..8], &[10, 0, 0, 0, 255, 0, 0, 0]);
            assert_eq!(&value[8..], &[192, 168, 1, 0, 255, 255, 255, 0]);

            let decoded = decode(&frame.bytes).unwrap();
            assert_eq!(
                decoded.json["policy-filters"],
                serde_json::json!(["10.0.0.0/255.0.0.0", "192.168.1.0/255.255.255.0"])
            );
        }

        #[test]
        fn integers_pack_at_declared_width() {
            let frame = encode(
                r#"{"address-lease-time":604800,"max-message-size":1500,"ip-default-ttl":64,"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();
            let options = options_of(&frame);
            assert_eq!(find_tlv(options, 51).unwrap(), &604800u32.to_be_bytes());
            assert_eq!(find_tlv(options, 57).unwrap(), &1500u16.to_be_bytes());
            assert_eq!(find_tlv(options, 23).unwrap(), &[64]);
        }

        #[test]
        fn booleans_encode_as_single_bytes() {
            let frame = encode(
                r#"{"ip-forwarding":true,"mask-supplier":false,"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();
            let options = options_of(&frame);
            assert_eq!(find_tlv(options, 19).unwrap(), &[1]);
            assert_eq!(find_tlv(options, 30).unwrap(), &[0]);
        }

        #[test]
        fn address_list_packs_four_bytes_each() {
            let frame = encode(
                r#"{"routers":["10.0.0.1","10.0.0.2"],"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();
            assert_eq!(
                find_tlv(options_of(&frame), 3).unwrap(),
                &[10, 0, 0, 1, 10, 0, 0, 2]
            );
        }

        #[test]
        fn opaque_hex_roundtrip() {
            let frame = encode(
                r#"{"client-identifier":"01aabbccddeeff","client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"request"}"#,
            )
            .unwrap()
            .unwrap();
            assert_eq!(
                find_tlv(options_of(&frame), 61).unwrap(),
                &[0x01, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]
            );
        }

        #[test]
        fn unknown_decimal_key_encodes_as_opaque() {
            let frame = encode(
                r#"{"84":"dead01","client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();
            assert_eq!(find_tlv(options_of(&frame), 84).unwrap(), &[0xde, 0xad, 0x01]);
        }

        #[test]
        fn decimal_key_resolves_registered_option() {
            let frame = encode(
                r#"{"1":"255.255.255.0","client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();
            assert_eq!(find_tlv(options_of(&frame), 1).unwrap(), &[255, 255, 255, 0]);
        }

        #[test]
        fn duplicate_options_after_the_first_are_ignored() {
            // "1" aliases subnet-mask; the named key comes first and wins
            let frame = encode(
                r#"{"subnet-mask":"255.255.255.0","1":"255.255.0.0","client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();
            let options = options_of(&frame);
            assert_eq!(find_tlv(options, 1).unwrap(), &[255, 255, 255, 0]);
            assert_eq!(options.iter().filter(|&&b| b == 1).count(), 1);
        }

        #[test]
        fn message_type_sets_op() {
            for (name, op) in [("discover", BOOTREQUEST), ("request", BOOTREQUEST),
                               ("release", BOOTREQUEST), ("inform", BOOTREQUEST),
                               ("offer", BOOTREPLY), ("ack", BOOTREPLY), ("nak", BOOTREPLY)] {
                let frame = encode(&format!(
                    r#"{{"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"{name}"}}"#,
                ))
                .unwrap()
                .unwrap();
                assert_eq!(frame.op, op, "type {name}");
            }
        }

        #[test]
        fn reply_key_uses_the_request_bucket() {
            let frame = encode(
                r#"{"bootp-transaction-id":"11223344","client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"offer"}"#,
            )
            .unwrap()
            .unwrap();
            assert_eq!(
                frame.key.as_bytes(),
                &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x44, 0x33, 0x22, 0x11, 0x01]
            );
        }
    }

    mod rejects {
        use super::*;

        #[test]
        fn non_object_json() {
            assert!(matches!(encode("[1,2]"), Err(CodecError::BadJson(_))));
            assert!(matches!(encode("not json"), Err(CodecError::BadJson(_))));
        }

        #[test]
        fn empty_object_is_a_heartbeat() {
            assert!(encode("{}").unwrap().is_none());
            assert!(encode("  { }  ").unwrap().is_none());
        }

        #[test]
        fn unknown_key() {
            assert!(matches!(
                encode(r#"{"no-such-option":1}"#),
                Err(CodecError::BadOption(_))
            ));
        }

        #[test]
        fn list_for_scalar_option() {
            assert!(matches!(
                encode(r#"{"subnet-mask":["255.0.0.0"]}"#),
                Err(CodecError::ListUnsupported(_))
            ));
        }

        #[test]
        fn empty_list() {
            assert!(matches!(
                encode(r#"{"routers":[]}"#),
                Err(CodecError::BadValue(_))
            ));
        }

        #[test]
        fn string_for_integer_option() {
            assert!(matches!(
                encode(r#"{"address-lease-time":"3600"}"#),
                Err(CodecError::TypeMismatch { .. })
            ));
        }

        #[test]
        fn integer_for_string_option() {
            assert!(matches!(
                encode(r#"{"hostname":12}"#),
                Err(CodecError::TypeMismatch { .. })
            ));
        }

        #[test]
        fn boolean_mismatches() {
            assert!(matches!(
                encode(r#"{"ip-forwarding":"true"}"#),
                Err(CodecError::TypeMismatch { .. })
            ));
            assert!(matches!(
                encode(r#"{"hostname":true}"#),
                Err(CodecError::TypeMismatch { .. })
            ));
        }

        #[test]
        fn odd_length_hex() {
            assert!(matches!(
                encode(r#"{"client-identifier":"abc"}"#),
                Err(CodecError::BadHex(_))
            ));
        }

        #[test]
        fn non_hex_digits() {
            assert!(matches!(
                encode(r#"{"client-identifier":"zz"}"#),
                Err(CodecError::BadHex(_))
            ));
        }

        #[test]
        fn malformed_address() {
            assert!(matches!(
                encode(r#"{"subnet-mask":"255.255.255"}"#),
                Err(CodecError::BadAddress { .. })
            ));
        }

        #[test]
        fn address_mask_without_slash() {
            assert!(matches!(
                encode(r#"{"policy-filters":["10.0.0.0"]}"#),
                Err(CodecError::BadAddressMask { .. })
            ));
        }

        #[test]
        fn bad_hardware_address() {
            assert!(matches!(
                encode(r#"{"client-hardware-address":"aa:bb"}"#),
                Err(CodecError::BadHardwareAddress(_))
            ));
        }

        #[test]
        fn unknown_message_type() {
            assert!(matches!(
                encode(r#"{"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"bogus"}"#),
                Err(CodecError::BadMessageType(_))
            ));
        }

        #[test]
        fn unknown_option_reference() {
            assert!(matches!(
                encode(r#"{"client-hardware-address":"aa:bb:cc:dd:ee:ff","dhcp-message-type":"discover","parameters-request-list":["84"]}"#,),
                Err(CodecError::BadOption(_))
            ));
        }

        #[test]
        fn missing_message_type() {
            assert!(matches!(
                encode(r#"{"client-hardware-address":"aa:bb:cc:dd:ee:ff"}"#),
                Err(CodecError::MissingType)
            ));
        }

        #[test]
        fn missing_hardware_address() {
            assert!(matches!(
                encode(r#"{"dhcp-message-type":"discover"}"#),
                Err(CodecError::MissingChaddr)
            ));
        }
    }

    mod capacity {
        use super::*;

        fn filler(total_payload: usize) -> Map<String, Value> {
            // private-01..private-31 at 253 bytes each fill the options area;
            // the caller controls the tail option's size to hit exact totals.
            let mut object = Map::new();
            object.insert(
                "client-hardware-address".into(),
                "aa:bb:cc:dd:ee:ff".into(),
            );
            object.insert("dhcp-message-type".into(), "offer".into());
            let mut remaining = total_payload;
            let mut code = 224;
            while remaining > 0 {
                let chunk = remaining.min(253);
                object.insert(code.to_string(), "61".repeat(chunk).into());
                remaining -= chunk;
                code += 1;
            }
            object
        }

        #[test]
        fn options_area_can_fill_exactly() {
            // 3 bytes for option 53, eight 255-byte TLVs, one 4-byte TLV and
            // the end marker come to exactly 2048.
            let mut object = filler(8 * 253);
            object.insert("233".to_string(), "6161".into());
            let frame = encode_object(&object).unwrap();
            assert_eq!(frame.bytes.len() - OPTIONS_OFFSET, OPTIONS_CAPACITY);
        }

        #[test]
        fn one_byte_over_fails_with_no_space() {
            let mut object = filler(8 * 253);
            object.insert("233".to_string(), "616161".into());
            assert!(matches!(
                encode_object(&object),
                Err(CodecError::NoSpace(_))
            ));
        }
    }
}
