//! The 16-bit header extensions field.
//!
//! Its bits mean different things for different packet types. The body
//! decoders and the framer both read it through [`Extensions::decode`], so
//! they apply the same masks.
use std::fmt::{self, Display, Formatter};

use crate::wire::constants::{
    EXT_BLOCK_TYPE_MASK, EXT_BLOCK_TYPE_SHIFT, EXT_CONFIRMED_PRESENT_FLAG,
    EXT_EXTENDED_PARAMS_FLAG, EXT_ITEM_COUNT_MASK, EXT_ITEM_COUNT_SHIFT, EXT_QUERY_FLAG,
    EXT_RESPONSE_FLAG, EXT_TELEMETRY_SIZE_MASK,
};
use crate::wire::message::{BlockType, PacketType};

/// Raw extensions value as read from the header (little-endian on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Extensions(u16);

impl Extensions {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Bits 8-11.
    fn block_type(self) -> BlockType {
        BlockType::from(((self.0 & EXT_BLOCK_TYPE_MASK) >> EXT_BLOCK_TYPE_SHIFT) as u8)
    }

    /// Bits 12-15.
    fn item_count(self) -> u8 {
        ((self.0 & EXT_ITEM_COUNT_MASK) >> EXT_ITEM_COUNT_SHIFT) as u8
    }

    /// Confirm req/ack body selector: hashes when the block type is
    /// Not-A-Block, otherwise one block.
    fn confirm_selector(self) -> ConfirmSelector {
        match self.block_type() {
            BlockType::NotABlock => ConfirmSelector::ByHash {
                count: self.item_count(),
            },
            block_type => ConfirmSelector::Block(block_type),
        }
    }

    fn is_query(self) -> bool {
        self.0 & EXT_QUERY_FLAG != 0
    }

    fn is_response(self) -> bool {
        self.0 & EXT_RESPONSE_FLAG != 0
    }

    fn confirmed_present(self) -> bool {
        self.0 & EXT_CONFIRMED_PRESENT_FLAG != 0
    }

    fn extended_params_present(self) -> bool {
        self.0 & EXT_EXTENDED_PARAMS_FLAG != 0
    }

    /// Bits 0-9.
    fn telemetry_size(self) -> u16 {
        self.0 & EXT_TELEMETRY_SIZE_MASK
    }

    /// Interprets the field for the given packet type.
    pub fn decode(self, packet_type: PacketType) -> DecodedExtensions {
        match packet_type {
            PacketType::Publish => DecodedExtensions::Publish {
                block_type: self.block_type(),
            },
            PacketType::ConfirmReq | PacketType::ConfirmAck => {
                DecodedExtensions::Confirm(self.confirm_selector())
            }
            PacketType::NodeIdHandshake => DecodedExtensions::NodeIdHandshake {
                is_query: self.is_query(),
                is_response: self.is_response(),
            },
            PacketType::FrontierReq => DecodedExtensions::FrontierReq {
                confirmed_present: self.confirmed_present(),
            },
            PacketType::BulkPull => DecodedExtensions::BulkPull {
                extended: self.extended_params_present(),
            },
            PacketType::TelemetryAck => DecodedExtensions::TelemetryAck {
                payload_size: self.telemetry_size(),
            },
            _ => DecodedExtensions::Unused,
        }
    }
}

/// What a confirm req or confirm ack carries after its fixed prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmSelector {
    ByHash { count: u8 },
    Block(BlockType),
}

/// Packet-type-specific view of the extensions field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedExtensions {
    Publish { block_type: BlockType },
    Confirm(ConfirmSelector),
    NodeIdHandshake { is_query: bool, is_response: bool },
    FrontierReq { confirmed_present: bool },
    BulkPull { extended: bool },
    /// Informational; the telemetry body is always parsed at its fixed size.
    TelemetryAck { payload_size: u16 },
    Unused,
}

impl Display for DecodedExtensions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };

        match self {
            DecodedExtensions::Publish { block_type }
            | DecodedExtensions::Confirm(ConfirmSelector::Block(block_type)) => {
                write!(f, "block type {}", block_type.name())
            }
            DecodedExtensions::Confirm(ConfirmSelector::ByHash { count }) => {
                write!(f, "{count} hashes")
            }
            DecodedExtensions::NodeIdHandshake {
                is_query,
                is_response,
            } => write!(
                f,
                "query {}, response {}",
                yes_no(*is_query),
                yes_no(*is_response)
            ),
            DecodedExtensions::FrontierReq { confirmed_present } => {
                write!(f, "confirmed only {}", yes_no(*confirmed_present))
            }
            DecodedExtensions::BulkPull { extended } => {
                write!(f, "extended parameters {}", yes_no(*extended))
            }
            DecodedExtensions::TelemetryAck { payload_size } => {
                write!(f, "payload size {payload_size}")
            }
            DecodedExtensions::Unused => write!(f, "Unused"),
        }
    }
}
