//! Static DHCP option registry.
//!
//! One row per recognized BOOTP field or DHCP option (from the IANA
//! bootp-dhcp-parameters assignments), describing its wire type, cardinality
//! and size constraints. BOOTP header fields carry synthetic codes in
//! 0x0101..0x010a so the codec can treat them uniformly with true options.
//! The table is pure data, terminated by a sentinel row for option 255.

use std::io::{self, Write};

/// Synthetic codes for the fixed BOOTP header fields.
pub const FRAME_RELAY_HOPS: u16 = 0x0101;
pub const FRAME_TRANSACTION_ID: u16 = 0x0102;
pub const FRAME_START_TIME: u16 = 0x0103;
pub const FRAME_CLIENT_ADDRESS: u16 = 0x0104;
pub const FRAME_ASSIGNED_ADDRESS: u16 = 0x0105;
pub const FRAME_SERVER_ADDRESS: u16 = 0x0106;
pub const FRAME_RELAY_ADDRESS: u16 = 0x0107;
pub const FRAME_CLIENT_HW_ADDRESS: u16 = 0x0108;
pub const FRAME_SERVER_NAME: u16 = 0x0109;
pub const FRAME_FILENAME: u16 = 0x010a;

/// Wire type category of an option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    /// Pad/end markers; carries no value.
    None,
    /// Raw bytes, rendered as a lowercase hex string.
    Opaque,
    /// Big-endian unsigned integer of the option's minimum size.
    Integer,
    /// Single byte, JSON true/false.
    Boolean,
    /// Raw bytes rendered as a JSON string.
    String,
    /// IPv4 address in dotted-quad form.
    Address,
    /// IPv4 address/netmask couple, `a.b.c.d/m.m.m.m`.
    AddressMask,
    /// Reference to another DHCP option, by registry name.
    OptionRef,
    /// DHCP message type name (option 53).
    MessageType,
}

/// One registry row.
#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub code: u16,
    pub key: &'static str,
    pub kind: OptionKind,
    /// True options carry a length-prefixed TLV in the options area; BOOTP
    /// header synthetics (and the bare pad/end markers) do not.
    pub wire: bool,
    /// Minimum value size in bytes; also the packed element size for
    /// integers and addresses. Zero means unconstrained.
    pub min: u8,
    /// Maximum value size in bytes; zero means unconstrained.
    pub max: u8,
    /// For list options, the exact element stride; the on-wire length must
    /// be a multiple of it. Zero means unconstrained.
    pub modulo: u8,
    pub list: bool,
}

const fn hdr(code: u16, key: &'static str, kind: OptionKind, min: u8, max: u8) -> OptionSpec {
    OptionSpec { code, key, kind, wire: false, min, max, modulo: 0, list: false }
}

const fn opt(code: u16, key: &'static str, kind: OptionKind, min: u8, max: u8) -> OptionSpec {
    OptionSpec { code, key, kind, wire: true, min, max, modulo: 0, list: false }
}

const fn lst(code: u16, key: &'static str, kind: OptionKind, min: u8, modulo: u8) -> OptionSpec {
    OptionSpec { code, key, kind, wire: true, min, max: 0, modulo, list: true }
}

const fn mark(code: u16, key: &'static str) -> OptionSpec {
    OptionSpec { code, key, kind: OptionKind::None, wire: false, min: 0, max: 0, modulo: 0, list: false }
}

use OptionKind::{Address, AddressMask, Boolean, Integer, MessageType, Opaque, OptionRef, String as Str};

/// The registry proper. Ends with the sentinel row for option 255; lookups
/// never match the sentinel.
pub static REGISTRY: &[OptionSpec] = &[
    hdr(FRAME_RELAY_HOPS, "bootp-relay-hops", Integer, 1, 1),
    hdr(FRAME_TRANSACTION_ID, "bootp-transaction-id", Opaque, 4, 4),
    hdr(FRAME_START_TIME, "bootp-start-time", Integer, 2, 2),
    hdr(FRAME_CLIENT_ADDRESS, "bootp-client-address", Address, 4, 4),
    hdr(FRAME_ASSIGNED_ADDRESS, "bootp-assigned-address", Address, 4, 4),
    hdr(FRAME_SERVER_ADDRESS, "bootp-server-address", Address, 4, 4),
    hdr(FRAME_RELAY_ADDRESS, "bootp-relay-address", Address, 4, 4),
    hdr(FRAME_CLIENT_HW_ADDRESS, "client-hardware-address", Opaque, 6, 6),
    hdr(FRAME_SERVER_NAME, "bootp-server-name", Str, 1, 63),
    hdr(FRAME_FILENAME, "bootp-filename", Str, 1, 127),
    mark(0, "pad"),
    opt(1, "subnet-mask", Address, 4, 4),
    opt(2, "time-offset", Integer, 4, 4),
    lst(3, "routers", Address, 4, 4),
    lst(4, "time-servers", Address, 4, 4),
    lst(5, "name-servers", Address, 4, 4),
    lst(6, "domain-name-servers", Address, 4, 4),
    lst(7, "log-servers", Address, 4, 4),
    lst(8, "cookie-servers", Address, 4, 4),
    lst(9, "lpr-servers", Address, 4, 4),
    lst(10, "impress-servers", Address, 4, 4),
    lst(11, "resource-location-servers", Address, 4, 4),
    opt(12, "hostname", Str, 1, 0),
    opt(13, "boot-file-size", Integer, 2, 2),
    opt(14, "merit-dump-file", Str, 1, 0),
    opt(15, "domain-name", Str, 1, 0),
    opt(16, "swap-server", Address, 4, 4),
    opt(17, "root-path", Str, 1, 0),
    opt(18, "extensions-path", Str, 1, 0),
    opt(19, "ip-forwarding", Boolean, 1, 1),
    opt(20, "non-local-source-routing", Boolean, 1, 1),
    lst(21, "policy-filters", AddressMask, 8, 8),
    opt(22, "maximum-datagram-reassembly-size", Integer, 2, 2),
    opt(23, "ip-default-ttl", Integer, 1, 1),
    opt(24, "path-mtu-aging-timeout", Integer, 4, 4),
    lst(25, "path-mtu-plateau-table", Integer, 2, 2),
    opt(26, "interface-mtu", Integer, 2, 2),
    opt(27, "all-subnets-local", Boolean, 1, 1),
    opt(28, "broadcast-address", Address, 4, 4),
    opt(29, "perform-mask-discovery", Boolean, 1, 1),
    opt(30, "mask-supplier", Boolean, 1, 1),
    opt(31, "perform-router-discovery", Boolean, 1, 1),
    opt(32, "router-solicitation-address", Address, 4, 4),
    lst(33, "static-routes", AddressMask, 8, 8),
    opt(34, "trailer-encapsulation", Boolean, 1, 1),
    opt(35, "arp-cache-timeout", Integer, 4, 4),
    opt(36, "ethernet-encapsulation", Boolean, 1, 1),
    opt(37, "tcp-default-ttl", Integer, 1, 1),
    opt(38, "tcp-keepalive-interval", Integer, 4, 4),
    opt(39, "tcp-keepalive-garbage", Boolean, 1, 1),
    opt(40, "nis-domain", Str, 1, 0),
    lst(41, "nis-servers", Address, 4, 4),
    lst(42, "ntp-servers", Address, 4, 4),
    opt(43, "vendor-specific-information", Opaque, 1, 0),
    lst(44, "netbios-name-servers", Address, 4, 4),
    lst(45, "netbios-dgram-distribution-servers", Address, 4, 4),
    opt(46, "netbios-node-type", Integer, 1, 1),
    opt(47, "netbios-scope", Str, 1, 0),
    lst(48, "xwindow-font-servers", Address, 4, 4),
    lst(49, "xwindow-display-managers", Address, 4, 4),
    opt(50, "requested-ip-address", Address, 4, 4),
    opt(51, "address-lease-time", Integer, 4, 4),
    opt(52, "option-overload", Integer, 1, 1),
    opt(53, "dhcp-message-type", MessageType, 1, 1),
    opt(54, "server-identifier", Address, 4, 4),
    lst(55, "parameters-request-list", OptionRef, 1, 1),
    opt(56, "message", Str, 1, 0),
    opt(57, "max-message-size", Integer, 2, 2),
    opt(58, "renewal-time", Integer, 4, 4),
    opt(59, "rebinding-time", Integer, 4, 4),
    opt(60, "vendor-class-identifier", Str, 1, 0),
    opt(61, "client-identifier", Opaque, 2, 0),
    opt(62, "netware-domain", Str, 1, 0),
    opt(63, "netware-option", Opaque, 1, 0),
    opt(64, "nisp-domain", Str, 1, 0),
    lst(65, "nisp-servers", Address, 4, 4),
    opt(66, "tftp-server", Str, 1, 0),
    opt(67, "boot-filename", Str, 1, 0),
    lst(68, "mobile-ip-home-agents", Address, 4, 4),
    lst(69, "smtp-servers", Address, 4, 4),
    lst(70, "pop3-servers", Address, 4, 4),
    lst(71, "nntp-servers", Address, 4, 4),
    lst(72, "www-servers", Address, 4, 4),
    lst(73, "finger-servers", Address, 4, 4),
    lst(74, "irc-servers", Address, 4, 4),
    lst(75, "streettalk-servers", Address, 4, 4),
    lst(76, "streettalk-directory-servers", Address, 4, 4),
    opt(77, "user-class", Opaque, 1, 0),
    opt(78, "directory-agent", Opaque, 1, 0),
    opt(79, "service-scope", Opaque, 1, 0),
    opt(81, "client-fqdn", Opaque, 1, 0),
    opt(82, "relay-agent-information", Opaque, 1, 0),
    opt(83, "isns-configuration", Opaque, 1, 0),
    lst(85, "nds-servers", Address, 4, 4),
    opt(86, "nds-tree-name", Str, 1, 0),
    opt(87, "nds-context", Str, 1, 0),
    opt(88, "bcmcs-domain", Str, 1, 0),
    lst(89, "bcmcs-servers", Address, 4, 4),
    opt(90, "authentication", Opaque, 3, 0),
    opt(91, "last-transaction-time", Integer, 4, 4),
    lst(92, "associated-addresses", Address, 4, 4),
    opt(93, "client-system", Integer, 2, 2),
    opt(94, "client-ndi", Opaque, 3, 3),
    opt(97, "client-guid", Opaque, 1, 0),
    opt(98, "user-authentication", Str, 1, 0),
    opt(99, "geoconf-civic", Opaque, 1, 0),
    opt(100, "tz-posix", Str, 1, 0),
    opt(101, "tz-database", Str, 1, 0),
    opt(116, "auto-configuration", Integer, 1, 1),
    lst(117, "name-service-search", Integer, 2, 2),
    opt(118, "subnet-selection", Address, 4, 4),
    opt(119, "domain-search", Str, 1, 0),
    opt(120, "sip-server", Opaque, 1, 0),
    opt(121, "classless-route", Opaque, 1, 0),
    opt(122, "cablelabs-configuration", Opaque, 1, 0),
    opt(123, "geoconf", Opaque, 1, 0),
    opt(124, "vi-vendor-class", Opaque, 1, 0),
    opt(125, "vi-vendor-specific-information", Opaque, 1, 0),
    lst(136, "pana-agents", Address, 4, 4),
    opt(137, "v4-lost", Str, 1, 0),
    opt(138, "v4-capwap-access-controller", Opaque, 1, 0),
    opt(139, "v4-address-mos", Opaque, 1, 0),
    opt(140, "v4-fqdn-mos", Opaque, 1, 0),
    opt(141, "sip-ua-domain", Str, 1, 0),
    opt(142, "v4-address-andsf", Opaque, 1, 0),
    opt(144, "v4-geoloc", Opaque, 1, 0),
    opt(145, "forcerenew-nonce-capable", Opaque, 1, 0),
    opt(146, "rdnss-selection", Opaque, 1, 0),
    lst(150, "tftp-servers", Address, 4, 4),
    opt(151, "status-code", Str, 1, 0),
    opt(152, "base-time", Integer, 4, 4),
    opt(153, "start-time-of-state", Integer, 4, 4),
    opt(154, "query-start-time", Integer, 4, 4),
    opt(155, "query-end-time", Integer, 4, 4),
    opt(156, "dhcp-state", Integer, 1, 1),
    opt(157, "data-source", Integer, 1, 1),
    opt(158, "v4-pcp-server", Opaque, 5, 0),
    opt(208, "pxelinux-magic", Opaque, 4, 4),
    opt(209, "configuration-file", Str, 1, 0),
    opt(210, "path-prefix", Str, 1, 0),
    opt(211, "reboot-time", Integer, 4, 4),
    opt(212, "v6-6rd", Opaque, 1, 0),
    opt(213, "v4-access-domain", Str, 1, 0),
    opt(220, "subnet-allocation", Opaque, 1, 0),
    opt(221, "virtual-subnet-allocation", Opaque, 1, 0),
    opt(224, "private-01", Opaque, 1, 0),
    opt(225, "private-02", Opaque, 1, 0),
    opt(226, "private-03", Opaque, 1, 0),
    opt(227, "private-04", Opaque, 1, 0),
    opt(228, "private-05", Opaque, 1, 0),
    opt(229, "private-06", Opaque, 1, 0),
    opt(230, "private-07", Opaque, 1, 0),
    opt(231, "private-08", Opaque, 1, 0),
    opt(232, "private-09", Opaque, 1, 0),
    opt(233, "private-10", Opaque, 1, 0),
    opt(234, "private-11", Opaque, 1, 0),
    opt(235, "private-12", Opaque, 1, 0),
    opt(236, "private-13", Opaque, 1, 0),
    opt(237, "private-14", Opaque, 1, 0),
    opt(238, "private-15", Opaque, 1, 0),
    opt(239, "private-16", Opaque, 1, 0),
    opt(240, "private-17", Opaque, 1, 0),
    opt(241, "private-18", Opaque, 1, 0),
    opt(242, "private-19", Opaque, 1, 0),
    opt(243, "private-20", Opaque, 1, 0),
    opt(244, "private-21", Opaque, 1, 0),
    opt(245, "private-22", Opaque, 1, 0),
    opt(246, "private-23", Opaque, 1, 0),
    opt(247, "private-24", Opaque, 1, 0),
    opt(248, "private-25", Opaque, 1, 0),
    opt(249, "private-26", Opaque, 1, 0),
    opt(250, "private-27", Opaque, 1, 0),
    opt(251, "private-28", Opaque, 1, 0),
    opt(252, "private-29", Opaque, 1, 0),
    opt(253, "private-30", Opaque, 1, 0),
    opt(254, "private-31", Opaque, 1, 0),
    mark(255, "end"),
];

fn rows() -> impl Iterator<Item = &'static OptionSpec> {
    REGISTRY.iter().take_while(|spec| spec.code != 255)
}

/// Look up a registry row by numeric code (wire code or header synthetic).
/// The table has ~150 entries and the scan runs at most twice per option, so
/// a linear walk is fine.
pub fn by_code(code: u16) -> Option<&'static OptionSpec> {
    rows().find(|spec| spec.code == code)
}

/// Result of resolving a JSON key against the registry.
#[derive(Debug, Clone, Copy)]
pub enum KeyResolution {
    Known(&'static OptionSpec),
    /// A decimal key in [1,254] with no registry row; treated as an opaque
    /// option of the given code.
    Unknown(u8),
}

/// Resolve a JSON key: registry names match case-insensitively; a string of
/// decimal digits is parsed as an option code in [1,254].
pub fn resolve_key(key: &str) -> Option<KeyResolution> {
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        let code: u16 = key.parse().ok()?;
        if !(1..=254).contains(&code) {
            return None;
        }
        return Some(match by_code(code) {
            Some(spec) => KeyResolution::Known(spec),
            None => KeyResolution::Unknown(code as u8),
        });
    }
    rows()
        .find(|spec| spec.key.eq_ignore_ascii_case(key))
        .map(KeyResolution::Known)
}

/// Human label for a row's decoded type, as shown by `--listkeys`.
pub fn type_label(spec: &OptionSpec) -> String {
    match (spec.kind, spec.list) {
        (OptionKind::Opaque, false) => "hexstring".into(),
        (OptionKind::Opaque, true) => "hexstrings list".into(),
        (OptionKind::Boolean, false) => "boolean".into(),
        (OptionKind::Boolean, true) => "booleans list".into(),
        (OptionKind::Integer, false) => "integer".into(),
        (OptionKind::Integer, true) => "integers list".into(),
        (OptionKind::String, false) => "string".into(),
        (OptionKind::String, true) => "strings list".into(),
        (OptionKind::Address, false) => "IPv4 address".into(),
        (OptionKind::Address, true) => "IPv4 addresses list".into(),
        (OptionKind::AddressMask, false) => "IPv4 address/netmask couple".into(),
        (OptionKind::AddressMask, true) => "IPv4 addresses/netmasks couples list".into(),
        (OptionKind::OptionRef, false) => "DHCP option".into(),
        (OptionKind::OptionRef, true) => "DHCP options list".into(),
        (OptionKind::MessageType, false) => "DHCP message type".into(),
        (OptionKind::MessageType, true) => "DHCP message types list".into(),
        (OptionKind::None, _) => "none".into(),
    }
}

/// Print the registry as a three-column table (key, decoded type, numeric
/// code; `-` for BOOTP header fields).
pub fn list_keys(out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "key                                  type                                  option"
    )?;
    writeln!(
        out,
        "-----------------------------------  ------------------------------------  ------"
    )?;
    for spec in rows().filter(|spec| spec.kind != OptionKind::None) {
        let code = if spec.code > 0 && spec.code < 255 {
            spec.code.to_string()
        } else {
            "-".to_string()
        };
        writeln!(out, "{:<35.35}  {:<36.36}  {}", spec.key, type_label(spec), code)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ends_with_sentinel() {
        let last = REGISTRY.last().unwrap();
        assert_eq!(last.code, 255);
        assert_eq!(last.kind, OptionKind::None);
    }

    #[test]
    fn list_options_carry_a_modulo() {
        for spec in REGISTRY.iter().filter(|spec| spec.list) {
            assert!(spec.modulo > 0, "list option {} has no modulo", spec.key);
        }
    }

    #[test]
    fn by_code_finds_wire_options() {
        assert_eq!(by_code(53).unwrap().key, "dhcp-message-type");
        assert_eq!(by_code(21).unwrap().key, "policy-filters");
        assert_eq!(by_code(254).unwrap().key, "private-31");
    }

    #[test]
    fn by_code_finds_header_synthetics() {
        assert_eq!(by_code(FRAME_TRANSACTION_ID).unwrap().key, "bootp-transaction-id");
        assert_eq!(by_code(FRAME_CLIENT_HW_ADDRESS).unwrap().key, "client-hardware-address");
    }

    #[test]
    fn by_code_never_matches_the_sentinel() {
        assert!(by_code(255).is_none());
    }

    #[test]
    fn resolve_key_by_name() {
        assert!(matches!(
            resolve_key("routers"),
            Some(KeyResolution::Known(spec)) if spec.code == 3
        ));
    }

    #[test]
    fn resolve_key_is_case_insensitive() {
        assert!(matches!(
            resolve_key("Subnet-Mask"),
            Some(KeyResolution::Known(spec)) if spec.code == 1
        ));
    }

    #[test]
    fn resolve_decimal_key() {
        assert!(matches!(
            resolve_key("53"),
            Some(KeyResolution::Known(spec)) if spec.key == "dhcp-message-type"
        ));
    }

    #[test]
    fn resolve_decimal_key_outside_registry() {
        assert!(matches!(resolve_key("84"), Some(KeyResolution::Unknown(84))));
    }

    #[test]
    fn resolve_rejects_out_of_range_codes() {
        assert!(resolve_key("0").is_none());
        assert!(resolve_key("255").is_none());
        assert!(resolve_key("999").is_none());
    }

    #[test]
    fn resolve_rejects_unknown_names() {
        assert!(resolve_key("end").is_none());
        assert!(resolve_key("no-such-option").is_none());
    }

    #[test]
    fn pad_resolves_to_a_valueless_row() {
        assert!(matches!(
            resolve_key("pad"),
            Some(KeyResolution::Known(spec)) if spec.kind == OptionKind::None
        ));
    }

    #[test]
    fn list_keys_renders_table() {
        let mut out = Vec::new();
        list_keys(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("dhcp-message-type"));
        assert!(text.contains("DHCP message type"));
        assert!(text.contains("bootp-transaction-id"));
        // header fields have no wire code
        let line = text.lines().find(|l| l.starts_with("bootp-relay-hops")).unwrap();
        assert!(line.trim_end().ends_with('-'));
        // pad/end markers are not listed
        assert!(!text.lines().any(|l| l.starts_with("pad ")));
    }
}
