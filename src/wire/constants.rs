/// TCP port Nano nodes listen on for realtime and bootstrap traffic.
///
/// Not IANA registered. The side of a connection bound to this port (or to
/// whichever port the conversation was first seen on) is treated as the
/// server when deciding the direction of headerless messages.
pub const NANO_TCP_PORT: u16 = 17075;

/// Length of the fixed message header.
///
/// ```text
/// [magic:2][version_max:1][version_using:1][version_min:1][packet_type:1][extensions:2 LE]
/// ```
pub const HEADER_LENGTH: usize = 8;

/// Network identifiers carried in the first two header bytes.
///
/// - `RA`: dev network
/// - `RB`: beta network
/// - `RC`: live network
/// - `RX`: test network
pub const MAGIC_DEV: [u8; 2] = *b"RA";
pub const MAGIC_BETA: [u8; 2] = *b"RB";
pub const MAGIC_LIVE: [u8; 2] = *b"RC";
pub const MAGIC_TEST: [u8; 2] = *b"RX";

// Opaque field widths shared by blocks and message bodies.
pub const ACCOUNT_SIZE: usize = 32;
pub const HASH_SIZE: usize = 32;
pub const BALANCE_SIZE: usize = 16;
pub const SIGNATURE_SIZE: usize = 64;
pub const WORK_SIZE: usize = 8;

/// Serialized sizes of the five block variants (without a leading type byte).
pub const BLOCK_SIZE_SEND: usize =
    HASH_SIZE + ACCOUNT_SIZE + BALANCE_SIZE + SIGNATURE_SIZE + WORK_SIZE;
pub const BLOCK_SIZE_RECEIVE: usize = HASH_SIZE + HASH_SIZE + SIGNATURE_SIZE + WORK_SIZE;
pub const BLOCK_SIZE_OPEN: usize =
    HASH_SIZE + ACCOUNT_SIZE + ACCOUNT_SIZE + SIGNATURE_SIZE + WORK_SIZE;
pub const BLOCK_SIZE_CHANGE: usize = HASH_SIZE + ACCOUNT_SIZE + SIGNATURE_SIZE + WORK_SIZE;
pub const BLOCK_SIZE_STATE: usize =
    ACCOUNT_SIZE + HASH_SIZE + ACCOUNT_SIZE + BALANCE_SIZE + HASH_SIZE + SIGNATURE_SIZE + WORK_SIZE;

/// Extensions bits 8-11: block type (Publish, Confirm Req, Confirm Ack).
pub const EXT_BLOCK_TYPE_MASK: u16 = 0x0f00;
pub const EXT_BLOCK_TYPE_SHIFT: u16 = 8;

/// Extensions bits 12-15: item count when the block type is Not-A-Block.
pub const EXT_ITEM_COUNT_MASK: u16 = 0xf000;
pub const EXT_ITEM_COUNT_SHIFT: u16 = 12;

/// Node ID handshake flags.
pub const EXT_QUERY_FLAG: u16 = 0x0001;
pub const EXT_RESPONSE_FLAG: u16 = 0x0002;

/// Frontier req: confirmed frontiers only.
pub const EXT_CONFIRMED_PRESENT_FLAG: u16 = 0x0002;

/// Bulk pull: extended parameters follow the start/end pair.
pub const EXT_EXTENDED_PARAMS_FLAG: u16 = 0x0001;

/// Telemetry ack: declared payload size (bits 0-9). Informational only.
pub const EXT_TELEMETRY_SIZE_MASK: u16 = 0x03ff;

/// Keepalive carries exactly this many peers, each a 16-byte IPv6 address
/// followed by a little-endian port.
pub const KEEPALIVE_PEERS: usize = 8;
pub const PEER_ENTRY_SIZE: usize = 16 + 2;

/// Account, signature and little-endian sequence prefix of every vote.
pub const VOTE_COMMON_SIZE: usize = ACCOUNT_SIZE + SIGNATURE_SIZE + 8;

/// Fixed size of a telemetry ack body.
///
/// ```text
/// signature 64, node id 32, block/cemented/unchecked/account counts 8 each,
/// bandwidth cap 8, peer count 4, protocol version 1, uptime 8, genesis 32,
/// major/minor/patch/pre-release 1 each, maker 1, timestamp 8, difficulty 8
/// ```
pub const TELEMETRY_ACK_SIZE: usize =
    SIGNATURE_SIZE + ACCOUNT_SIZE + 8 * 4 + 8 + 4 + 1 + 8 + HASH_SIZE + 4 + 1 + 8 + 8;

/// Bulk pull request: start account + end account/hash.
pub const BULK_PULL_SIZE: usize = ACCOUNT_SIZE + HASH_SIZE;
/// Extended bulk pull parameters: zero byte, LE count, three reserved bytes.
pub const BULK_PULL_EXTENDED_SIZE: usize = 1 + 4 + 3;

/// Bulk pull account request: account + minimum amount + flags.
pub const BULK_PULL_ACCOUNT_SIZE: usize = ACCOUNT_SIZE + BALANCE_SIZE + 1;

/// Frontier req: start account + age + count.
pub const FRONTIER_REQ_SIZE: usize = ACCOUNT_SIZE + 4 + 4;

/// Frontier response: account + frontier hash.
pub const FRONTIER_RESPONSE_SIZE: usize = ACCOUNT_SIZE + HASH_SIZE;

/// Node ID handshake query cookie.
pub const HANDSHAKE_QUERY_SIZE: usize = 32;
/// Node ID handshake response: account + signature.
pub const HANDSHAKE_RESPONSE_SIZE: usize = ACCOUNT_SIZE + SIGNATURE_SIZE;

/// Bulk pull account response flags captured from the request. Any other
/// value means pending hash and amount only.
pub const BULK_PULL_ACCOUNT_PENDING_ADDRESS_ONLY: u8 = 0x01;
pub const BULK_PULL_ACCOUNT_PENDING_INCLUDE_ADDRESS: u8 = 0x02;

/// Ascending bootstrap: pull type byte + big-endian id.
pub const ASC_PULL_PREFIX_SIZE: usize = 1 + 8;
pub const ASC_PULL_TYPE_BLOCKS: u8 = 1;
pub const ASC_PULL_TYPE_ACCOUNT_INFO: u8 = 2;
pub const ASC_PULL_REQ_BLOCKS_SIZE: usize = HASH_SIZE + 1;
pub const ASC_PULL_REQ_ACCOUNT_INFO_SIZE: usize = HASH_SIZE;
pub const ASC_PULL_ACK_ACCOUNT_INFO_SIZE: usize = ACCOUNT_SIZE + HASH_SIZE * 3 + 8 + 8;

/// Protocol versions written into headers this crate builds.
pub const PROTOCOL_VERSION_MAX: u8 = 0x13;
pub const PROTOCOL_VERSION_USING: u8 = 0x13;
pub const PROTOCOL_VERSION_MIN: u8 = 0x12;
