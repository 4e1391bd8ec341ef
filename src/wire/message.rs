use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use chrono::{DateTime, Utc};

use crate::session::Direction;
use crate::wire::block::Block;
use crate::wire::constants::{MAGIC_BETA, MAGIC_DEV, MAGIC_LIVE, MAGIC_TEST};
use crate::wire::decode::Reader;
use crate::wire::extensions::Extensions;
use crate::Result;

/// Implemented by fixed-layout records that decode straight from a reader.
pub trait Decode: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self>;
}

/// The 8-byte header in front of every non-continuation message.
///
/// ```text
/// 2 bytes  magic (network identifier, ASCII)
/// 1 byte   version_max
/// 1 byte   version_using
/// 1 byte   version_min
/// 1 byte   packet type
/// 2 bytes  extensions (little-endian, meaning depends on packet type)
/// ```
///
/// Unknown magic values and packet types are kept as-is; they only become
/// "Unknown" when labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: [u8; 2],
    pub version_max: u8,
    pub version_using: u8,
    pub version_min: u8,
    pub packet_type: PacketType,
    pub extensions: Extensions,
}

impl Header {
    pub fn network(&self) -> Network {
        Network::from(self.magic)
    }
}

/// Network named by the header magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Dev,
    Beta,
    Live,
    Test,
    Unknown([u8; 2]),
}

impl From<[u8; 2]> for Network {
    fn from(magic: [u8; 2]) -> Self {
        match magic {
            MAGIC_DEV => Network::Dev,
            MAGIC_BETA => Network::Beta,
            MAGIC_LIVE => Network::Live,
            MAGIC_TEST => Network::Test,
            other => Network::Unknown(other),
        }
    }
}

impl Network {
    pub fn name(&self) -> &'static str {
        match self {
            Network::Dev => "Nano Dev Network",
            Network::Beta => "Nano Beta Network",
            Network::Live => "Nano Live Network",
            Network::Test => "Nano Test Network",
            Network::Unknown(_) => "Unknown",
        }
    }
}

/// Packet type byte of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    Invalid,
    NotAType,
    Keepalive,
    Publish,
    ConfirmReq,
    ConfirmAck,
    BulkPull,
    BulkPush,
    FrontierReq,
    /// Deprecated; no body layout is known.
    BulkPullBlocks,
    NodeIdHandshake,
    BulkPullAccount,
    TelemetryReq,
    TelemetryAck,
    AscPullReq,
    AscPullAck,
    Unknown(u8),
}

impl From<u8> for PacketType {
    fn from(value: u8) -> Self {
        match value {
            0 => PacketType::Invalid,
            1 => PacketType::NotAType,
            2 => PacketType::Keepalive,
            3 => PacketType::Publish,
            4 => PacketType::ConfirmReq,
            5 => PacketType::ConfirmAck,
            6 => PacketType::BulkPull,
            7 => PacketType::BulkPush,
            8 => PacketType::FrontierReq,
            9 => PacketType::BulkPullBlocks,
            10 => PacketType::NodeIdHandshake,
            11 => PacketType::BulkPullAccount,
            12 => PacketType::TelemetryReq,
            13 => PacketType::TelemetryAck,
            14 => PacketType::AscPullReq,
            15 => PacketType::AscPullAck,
            other => PacketType::Unknown(other),
        }
    }
}

impl PacketType {
    pub fn as_u8(self) -> u8 {
        match self {
            PacketType::Invalid => 0,
            PacketType::NotAType => 1,
            PacketType::Keepalive => 2,
            PacketType::Publish => 3,
            PacketType::ConfirmReq => 4,
            PacketType::ConfirmAck => 5,
            PacketType::BulkPull => 6,
            PacketType::BulkPush => 7,
            PacketType::FrontierReq => 8,
            PacketType::BulkPullBlocks => 9,
            PacketType::NodeIdHandshake => 10,
            PacketType::BulkPullAccount => 11,
            PacketType::TelemetryReq => 12,
            PacketType::TelemetryAck => 13,
            PacketType::AscPullReq => 14,
            PacketType::AscPullAck => 15,
            PacketType::Unknown(value) => value,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PacketType::Invalid => "Invalid",
            PacketType::NotAType => "Not A Type",
            PacketType::Keepalive => "Keepalive",
            PacketType::Publish => "Publish",
            PacketType::ConfirmReq => "Confirm Req",
            PacketType::ConfirmAck => "Confirm Ack",
            PacketType::BulkPull => "Bulk Pull",
            PacketType::BulkPush => "Bulk Push",
            PacketType::FrontierReq => "Frontier Req",
            PacketType::BulkPullBlocks => "Bulk Pull Blocks [DEPRECATED]",
            PacketType::NodeIdHandshake => "Node ID Handshake",
            PacketType::BulkPullAccount => "Bulk Pull Account",
            PacketType::TelemetryReq => "Telemetry Req",
            PacketType::TelemetryAck => "Telemetry Ack",
            PacketType::AscPullReq => "Asc Pull Req",
            PacketType::AscPullAck => "Asc Pull Ack",
            PacketType::Unknown(_) => "Unknown",
        }
    }

    /// Requests whose responses (or follow-up data) arrive without a header.
    pub fn starts_continuation(self) -> bool {
        matches!(
            self,
            PacketType::BulkPull
                | PacketType::BulkPush
                | PacketType::FrontierReq
                | PacketType::BulkPullAccount
        )
    }
}

/// Block type byte, used both in the extensions field and as the leading
/// byte of streamed blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Invalid,
    /// Also the end-of-stream sentinel in bulk pull/push and asc pull acks.
    NotABlock,
    Send,
    Receive,
    Open,
    Change,
    State,
    Unknown(u8),
}

impl From<u8> for BlockType {
    fn from(value: u8) -> Self {
        match value {
            0 => BlockType::Invalid,
            1 => BlockType::NotABlock,
            2 => BlockType::Send,
            3 => BlockType::Receive,
            4 => BlockType::Open,
            5 => BlockType::Change,
            6 => BlockType::State,
            other => BlockType::Unknown(other),
        }
    }
}

impl BlockType {
    pub fn as_u8(self) -> u8 {
        match self {
            BlockType::Invalid => 0,
            BlockType::NotABlock => 1,
            BlockType::Send => 2,
            BlockType::Receive => 3,
            BlockType::Open => 4,
            BlockType::Change => 5,
            BlockType::State => 6,
            BlockType::Unknown(value) => value,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BlockType::Invalid => "Invalid",
            BlockType::NotABlock => "Not A Block",
            BlockType::Send => "Send",
            BlockType::Receive => "Receive",
            BlockType::Open => "Open",
            BlockType::Change => "Change",
            BlockType::State => "State",
            BlockType::Unknown(_) => "Unknown",
        }
    }
}

/// A block slot inside a message.
///
/// A block type outside the five known variants cannot be sized, so the
/// decoder stops there and records the offending type instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockBody {
    Block(Block),
    Unrecognized(BlockType),
}

impl BlockBody {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockBody::Block(block) => block.block_type(),
            BlockBody::Unrecognized(block_type) => *block_type,
        }
    }
}

/// A decoded Nano message.
///
/// The first group of variants follows a header and is selected by its
/// packet type. The second group are headerless continuation messages whose
/// meaning comes from the request recorded in the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Keepalive(Vec<Peer>),
    Publish(BlockBody),
    ConfirmReq(ConfirmReq),
    ConfirmAck(ConfirmAck),
    BulkPull(BulkPull),
    BulkPush,
    FrontierReq(FrontierReq),
    NodeIdHandshake(NodeIdHandshake),
    BulkPullAccount(BulkPullAccount),
    TelemetryReq,
    TelemetryAck(Box<TelemetryAck>),
    AscPullReq(AscPullReq),
    AscPullAck(AscPullAck),
    /// Headered message with no known body layout; the body is kept raw.
    Unsupported {
        packet_type: PacketType,
        payload: Vec<u8>,
    },

    // --- headerless continuations ---
    BulkPullResponse(StreamEntry),
    BulkPushData(StreamEntry),
    FrontierResponse(FrontierResponse),
    BulkPullAccountResponse(BulkPullAccountResponse),
    /// Headerless bytes in a direction with no matching continuation.
    UnexpectedHeaderless {
        direction: Direction,
        payload: Vec<u8>,
    },
}

impl Message {
    /// True when decoding stopped early on something it could not size,
    /// leaving the rest of the framed bytes unparsed.
    pub fn is_partial(&self) -> bool {
        let unrecognized = |body: &BlockBody| matches!(body, BlockBody::Unrecognized(_));

        match self {
            Message::Publish(body) => unrecognized(body),
            Message::ConfirmReq(ConfirmReq::Block(body)) => unrecognized(body),
            Message::ConfirmAck(ack) => {
                matches!(&ack.payload, VotePayload::Block(body) if unrecognized(body))
            }
            Message::AscPullAck(ack) => match &ack.payload {
                AscPullAckPayload::Blocks(blocks) => blocks.iter().any(unrecognized),
                _ => false,
            },
            Message::BulkPullResponse(StreamEntry::Block(body))
            | Message::BulkPushData(StreamEntry::Block(body)) => unrecognized(body),
            _ => false,
        }
    }

    /// One-line description, in the style of a capture tool's info column.
    pub fn summary(&self) -> String {
        match self {
            Message::Keepalive(_) => "Keepalive".to_string(),
            Message::Publish(body) => format!("Publish ({})", body.block_type().name()),
            Message::ConfirmReq(ConfirmReq::ByHash(pairs)) => {
                format!("Confirm Req (ReqByHash, {} Pairs)", pairs.len())
            }
            Message::ConfirmReq(ConfirmReq::Block(body)) => {
                format!("Confirm Req ({} Block)", body.block_type().name())
            }
            Message::ConfirmAck(ack) => match &ack.payload {
                VotePayload::Hashes(hashes) => format!("Confirm Ack ({} Blocks)", hashes.len()),
                VotePayload::Block(body) => {
                    format!("Confirm Ack ({} Block)", body.block_type().name())
                }
            },
            Message::BulkPull(_) => "Bulk Pull Request".to_string(),
            Message::BulkPush => "Bulk Push".to_string(),
            Message::FrontierReq(_) => "Frontier Req".to_string(),
            Message::NodeIdHandshake(handshake) => {
                let mut s = "Node ID Handshake".to_string();
                if handshake.query.is_some() {
                    s.push_str(" (Query)");
                }
                if handshake.response.is_some() {
                    s.push_str(" (Response)");
                }
                s
            }
            Message::BulkPullAccount(_) => "Bulk Pull Account Request".to_string(),
            Message::TelemetryReq => "Telemetry Req".to_string(),
            Message::TelemetryAck(_) => "Telemetry Ack".to_string(),
            Message::AscPullReq(_) => "Asc Pull Req".to_string(),
            Message::AscPullAck(_) => "Asc Pull Ack".to_string(),
            Message::Unsupported { packet_type, .. } => match packet_type {
                PacketType::Unknown(value) => format!("Unknown ({value})"),
                other => other.name().to_string(),
            },
            Message::BulkPullResponse(StreamEntry::End) => {
                "Bulk Pull Response [BULK PULL RESPONSE END]".to_string()
            }
            Message::BulkPullResponse(StreamEntry::Block(body)) => {
                format!("Bulk Pull Response ({} Block)", body.block_type().name())
            }
            Message::BulkPushData(StreamEntry::End) => "Bulk Push Data [BULK PUSH END]".to_string(),
            Message::BulkPushData(StreamEntry::Block(body)) => {
                format!("Bulk Push Data ({} Block)", body.block_type().name())
            }
            Message::FrontierResponse(_) => "Frontier Response".to_string(),
            Message::BulkPullAccountResponse(_) => "Bulk Pull Account Response".to_string(),
            Message::UnexpectedHeaderless { direction, .. } => match direction {
                Direction::ClientToServer => "UNKNOWN HEADERLESS [CLIENT] Packet".to_string(),
                Direction::ServerToClient => "UNKNOWN HEADERLESS [SERVER] Packet".to_string(),
            },
        }
    }
}

/// One peer slot of a keepalive.
///
/// An all-zero address is an empty slot. IPv4 peers are sent in the
/// IPv4-mapped form `::ffff:a.b.c.d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub address: Ipv6Addr,
    pub port: u16,
}

impl Peer {
    pub fn is_empty(&self) -> bool {
        self.address.is_unspecified()
    }

    /// The peer as a socket address, unwrapping IPv4-mapped addresses.
    /// `None` for an empty slot.
    pub fn endpoint(&self) -> Option<SocketAddr> {
        if self.is_empty() {
            return None;
        }

        let ip = match self.address.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(self.address),
        };

        Some(SocketAddr::new(ip, self.port))
    }
}

impl Display for Peer {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.endpoint() {
            None => write!(f, "(none)"),
            Some(endpoint) => write!(f, "{endpoint}"),
        }
    }
}

/// Confirm req body, selected by the extensions block type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmReq {
    /// Block type Not-A-Block: `item_count` hash/root pairs.
    ByHash(Vec<HashPair>),
    Block(BlockBody),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashPair {
    pub hash: [u8; 32],
    pub root: [u8; 32],
}

/// Account, signature and sequence prefix shared by every confirm ack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteCommon {
    pub account: [u8; 32],
    pub signature: [u8; 64],
    pub sequence: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmAck {
    pub vote: VoteCommon,
    pub payload: VotePayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VotePayload {
    /// Vote by hash.
    Hashes(Vec<[u8; 32]>),
    /// Vote by block.
    Block(BlockBody),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPull {
    pub start: [u8; 32],
    pub end: [u8; 32],
    pub extended: Option<BulkPullExtended>,
}

/// Optional bulk pull parameters, present when extensions bit 0 is set.
///
/// ```text
/// 1 byte   zero
/// 4 bytes  count (little-endian)
/// 3 bytes  reserved
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPullExtended {
    pub zero: u8,
    pub count: u32,
    pub reserved: [u8; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierReq {
    pub start: [u8; 32],
    pub age: u32,
    pub count: u32,
    /// Extensions bit 1.
    pub confirmed_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIdHandshake {
    pub query: Option<[u8; 32]>,
    pub response: Option<HandshakeResponse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakeResponse {
    pub account: [u8; 32],
    pub signature: [u8; 64],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPullAccount {
    pub account: [u8; 32],
    pub minimum_amount: [u8; 16],
    /// Selects the layout of every response entry; see
    /// [`BulkPullAccountResponse`].
    pub flags: u8,
}

/// Node telemetry, always 202 bytes on the wire.
///
/// Numeric fields are big-endian. `declared_size` is the payload size the
/// sender put in extensions bits 0-9; it is reported but never used to bound
/// the parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryAck {
    pub signature: [u8; 64],
    pub node_id: [u8; 32],
    pub block_count: u64,
    pub cemented_count: u64,
    pub unchecked_count: u64,
    pub account_count: u64,
    pub bandwidth_cap: u64,
    pub peer_count: u32,
    pub protocol_version: u8,
    pub uptime: u64,
    pub genesis_block: [u8; 32],
    pub major_version: u8,
    pub minor_version: u8,
    pub patch_version: u8,
    pub pre_release_version: u8,
    pub maker: u8,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub active_difficulty: u64,
    pub declared_size: u16,
}

impl TelemetryAck {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AscPullReq {
    pub id: u64,
    pub payload: AscPullReqPayload,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AscPullReqPayload {
    Blocks { start: [u8; 32], count: u8 },
    AccountInfo { target: [u8; 32] },
    /// Pull type with no known payload; nothing follows the id.
    Other(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AscPullAck {
    pub id: u64,
    pub payload: AscPullAckPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AscPullAckPayload {
    /// Blocks up to (not including) the Not-A-Block terminator.
    Blocks(Vec<BlockBody>),
    AccountInfo(AccountInfo),
    Other(u8),
}

/// Asc pull ack account info payload (144 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountInfo {
    pub account: [u8; 32],
    pub open: [u8; 32],
    pub head: [u8; 32],
    pub block_count: u64,
    pub confirmation_frontier: [u8; 32],
    pub confirmation_height: u64,
}

/// One bulk pull response or bulk push data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEntry {
    Block(BlockBody),
    /// Not-A-Block type byte: the stream is finished.
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierResponse {
    pub account: [u8; 32],
    pub frontier: [u8; 32],
}

impl FrontierResponse {
    /// An all-zero account and frontier terminates the response stream.
    pub fn is_end(&self) -> bool {
        self.account == [0u8; 32] && self.frontier == [0u8; 32]
    }
}

/// One entry of a bulk pull account response.
///
/// Layout depends on the flags of the request that started the stream:
///
/// | flags | frontier + balance | pending hash + amount | source |
/// |-------|--------------------|-----------------------|--------|
/// | 0x01  | yes                | no                    | yes    |
/// | 0x02  | yes                | yes                   | yes    |
/// | other | yes                | yes                   | no     |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPullAccountResponse {
    pub frontier: [u8; 32],
    pub balance: [u8; 16],
    pub pending: Option<PendingEntry>,
    pub source: Option<[u8; 32]>,
}

impl BulkPullAccountResponse {
    /// An all-zero pending hash terminates the stream. Address-only streams
    /// carry no pending hash and never terminate in-band.
    pub fn is_end(&self) -> bool {
        matches!(self.pending, Some(pending) if pending.hash == [0u8; 32])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingEntry {
    pub hash: [u8; 32],
    pub amount: [u8; 16],
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn packet_type_round_trips_through_byte() {
        for value in 0..=u8::MAX {
            assert_eq!(PacketType::from(value).as_u8(), value);
        }
        assert_eq!(PacketType::from(9), PacketType::BulkPullBlocks);
        assert_eq!(PacketType::from(42).name(), "Unknown");
    }

    #[test]
    fn block_type_unknown_values_are_preserved() {
        assert_eq!(BlockType::from(7), BlockType::Unknown(7));
        assert_eq!(BlockType::from(7).as_u8(), 7);
        assert_eq!(BlockType::from(1), BlockType::NotABlock);
    }

    #[test]
    fn network_from_magic() {
        assert_eq!(Network::from(*b"RC"), Network::Live);
        assert_eq!(Network::from(*b"RX").name(), "Nano Test Network");
        assert_eq!(Network::from(*b"ZZ").name(), "Unknown");
    }

    #[test]
    fn empty_peer_has_no_endpoint() {
        let peer = Peer {
            address: Ipv6Addr::UNSPECIFIED,
            port: 7075,
        };
        assert_eq!(peer.endpoint(), None);
        assert_eq!(peer.to_string(), "(none)");
    }

    #[test]
    fn ipv4_mapped_peer_renders_as_ipv4() {
        let peer = Peer {
            address: Ipv4Addr::new(127, 0, 0, 1).to_ipv6_mapped(),
            port: 16923,
        };
        assert_eq!(peer.to_string(), "127.0.0.1:16923");
    }

    #[test]
    fn ipv6_peer_renders_bracketed() {
        let peer = Peer {
            address: "2001:db8::1".parse().unwrap(),
            port: 7075,
        };
        assert_eq!(peer.to_string(), "[2001:db8::1]:7075");
    }

    #[test]
    fn bulk_pull_account_response_end_requires_pending_entry() {
        let mut entry = BulkPullAccountResponse {
            frontier: [1u8; 32],
            balance: [0u8; 16],
            pending: None,
            source: Some([2u8; 32]),
        };
        assert!(!entry.is_end());

        entry.pending = Some(PendingEntry {
            hash: [0u8; 32],
            amount: [9u8; 16],
        });
        assert!(entry.is_end());
    }

    #[test]
    fn telemetry_timestamp_converts_milliseconds() {
        let ack = TelemetryAck {
            signature: [0u8; 64],
            node_id: [0u8; 32],
            block_count: 0,
            cemented_count: 0,
            unchecked_count: 0,
            account_count: 0,
            bandwidth_cap: 0,
            peer_count: 0,
            protocol_version: 0,
            uptime: 0,
            genesis_block: [0u8; 32],
            major_version: 0,
            minor_version: 0,
            patch_version: 0,
            pre_release_version: 0,
            maker: 0,
            timestamp_ms: 1_700_000_000_123,
            active_difficulty: 0,
            declared_size: 0,
        };
        let ts = ack.timestamp().unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert_eq!(ts.timestamp_subsec_millis(), 123);
    }
}
