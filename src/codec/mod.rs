//! Bidirectional DHCPv4 frame <-> JSON codec.
//!
//! The mapping is tag-exact and driven by the static option registry: every
//! recognized option decodes to a human-readable key and encodes back to the
//! same wire bytes.

pub mod decode;
pub mod encode;
pub mod frame;
pub mod registry;

pub use decode::{decode, DecodedFrame};
pub use encode::{encode, encode_object, EncodedFrame};
pub use frame::{CorrelationKey, DhcpFrame, MessageType};
