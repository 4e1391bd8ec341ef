use std::io::{Cursor, Read};
use std::net::Ipv6Addr;

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use tracing::warn;

use crate::wire::block::decode_block;
use crate::wire::constants::{
    ASC_PULL_TYPE_ACCOUNT_INFO, ASC_PULL_TYPE_BLOCKS, KEEPALIVE_PEERS,
};
use crate::wire::extensions::{ConfirmSelector, DecodedExtensions, Extensions};
use crate::wire::message::{
    AccountInfo, AscPullAck, AscPullAckPayload, AscPullReq, AscPullReqPayload, BlockBody,
    BlockType, BulkPull, BulkPullAccount, BulkPullAccountResponse, BulkPullExtended, ConfirmAck,
    ConfirmReq, Decode, FrontierReq, FrontierResponse, HandshakeResponse, HashPair, Header,
    Message, NodeIdHandshake, PacketType, Peer, PendingEntry, StreamEntry, TelemetryAck,
    VoteCommon, VotePayload,
};
use crate::wire::size::BulkPullAccountLayout;
use crate::{Error, Result};

/// Bounds-checked sequential reader over one message's bytes.
///
/// Every read names the field it is reading so a short buffer reports
/// exactly where it ran out.
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn ensure(&self, need: usize, context: &'static str) -> Result<()> {
        let have = self.remaining();
        if have < need {
            return Err(Error::InsufficientData {
                need,
                have,
                context,
            });
        }
        Ok(())
    }

    pub fn peek_u8(&self) -> Option<u8> {
        self.cursor.get_ref().get(self.position()).copied()
    }

    pub fn u8(&mut self, context: &'static str) -> Result<u8> {
        self.ensure(1, context)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn u16_le(&mut self, context: &'static str) -> Result<u16> {
        self.ensure(2, context)?;
        Ok(self.cursor.read_u16::<LittleEndian>()?)
    }

    pub fn u32_le(&mut self, context: &'static str) -> Result<u32> {
        self.ensure(4, context)?;
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn u32_be(&mut self, context: &'static str) -> Result<u32> {
        self.ensure(4, context)?;
        Ok(self.cursor.read_u32::<BigEndian>()?)
    }

    pub fn u64_le(&mut self, context: &'static str) -> Result<u64> {
        self.ensure(8, context)?;
        Ok(self.cursor.read_u64::<LittleEndian>()?)
    }

    pub fn u64_be(&mut self, context: &'static str) -> Result<u64> {
        self.ensure(8, context)?;
        Ok(self.cursor.read_u64::<BigEndian>()?)
    }

    pub fn array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        self.ensure(N, context)?;
        let mut out = [0u8; N];
        self.cursor.read_exact(&mut out)?;
        Ok(out)
    }

    /// Takes everything left in the buffer.
    pub fn rest(&mut self) -> Vec<u8> {
        let buf = *self.cursor.get_ref();
        let start = self.position().min(buf.len());
        self.cursor.set_position(buf.len() as u64);
        buf[start..].to_vec()
    }
}

/// Decodes the 8-byte header. Never fails on unknown values, only on a
/// short buffer.
pub fn decode_header(r: &mut Reader<'_>) -> Result<Header> {
    Ok(Header {
        magic: r.array("header: magic")?,
        version_max: r.u8("header: version_max")?,
        version_using: r.u8("header: version_using")?,
        version_min: r.u8("header: version_min")?,
        packet_type: PacketType::from(r.u8("header: packet_type")?),
        extensions: Extensions::new(r.u16_le("header: extensions")?),
    })
}

/// Decodes the body that follows `header`.
///
/// Pure: session state changes implied by the message are applied by the
/// dispatcher in [`crate::wire::codec`].
pub fn decode_body(header: &Header, r: &mut Reader<'_>) -> Result<Message> {
    let message = match (header.packet_type, header.extensions.decode(header.packet_type)) {
        (PacketType::Keepalive, _) => Message::Keepalive(decode_keepalive(r)?),
        (PacketType::Publish, DecodedExtensions::Publish { block_type }) => {
            Message::Publish(decode_block_body(block_type, r)?)
        }
        (PacketType::ConfirmReq, DecodedExtensions::Confirm(selector)) => {
            Message::ConfirmReq(decode_confirm_req(selector, r)?)
        }
        (PacketType::ConfirmAck, DecodedExtensions::Confirm(selector)) => {
            Message::ConfirmAck(decode_confirm_ack(selector, r)?)
        }
        (PacketType::BulkPull, DecodedExtensions::BulkPull { extended }) => {
            Message::BulkPull(decode_bulk_pull(extended, r)?)
        }
        (PacketType::BulkPush, _) => Message::BulkPush,
        (PacketType::FrontierReq, DecodedExtensions::FrontierReq { confirmed_present }) => {
            Message::FrontierReq(decode_frontier_req(confirmed_present, r)?)
        }
        (
            PacketType::NodeIdHandshake,
            DecodedExtensions::NodeIdHandshake {
                is_query,
                is_response,
            },
        ) => Message::NodeIdHandshake(decode_node_id_handshake(is_query, is_response, r)?),
        (PacketType::BulkPullAccount, _) => Message::BulkPullAccount(BulkPullAccount::decode(r)?),
        (PacketType::TelemetryReq, _) => Message::TelemetryReq,
        (PacketType::TelemetryAck, DecodedExtensions::TelemetryAck { payload_size }) => {
            Message::TelemetryAck(Box::new(decode_telemetry_ack(payload_size, r)?))
        }
        (PacketType::AscPullReq, _) => Message::AscPullReq(decode_asc_pull_req(r)?),
        (PacketType::AscPullAck, _) => Message::AscPullAck(decode_asc_pull_ack(r)?),
        (packet_type, _) => Message::Unsupported {
            packet_type,
            payload: r.rest(),
        },
    };

    Ok(message)
}

/// Decodes a block slot, turning an unsizable block type into
/// [`BlockBody::Unrecognized`] instead of an error.
fn decode_block_body(block_type: BlockType, r: &mut Reader<'_>) -> Result<BlockBody> {
    match decode_block(block_type, r) {
        Ok(block) => Ok(BlockBody::Block(block)),
        Err(Error::UnrecognizedBlockType(value)) => {
            warn!(block_type = value, "unrecognized block type, skipping block");
            Ok(BlockBody::Unrecognized(block_type))
        }
        Err(e) => Err(e),
    }
}

fn decode_keepalive(r: &mut Reader<'_>) -> Result<Vec<Peer>> {
    let mut peers = Vec::with_capacity(KEEPALIVE_PEERS);

    for _ in 0..KEEPALIVE_PEERS {
        peers.push(Peer::decode(r)?);
    }

    Ok(peers)
}

impl Decode for Peer {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let address = Ipv6Addr::from(r.array::<16>("keepalive: peer address")?);
        let port = r.u16_le("keepalive: peer port")?;
        Ok(Peer { address, port })
    }
}

impl Decode for HashPair {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(HashPair {
            hash: r.array("confirm_req: hash")?,
            root: r.array("confirm_req: root")?,
        })
    }
}

fn decode_confirm_req(selector: ConfirmSelector, r: &mut Reader<'_>) -> Result<ConfirmReq> {
    match selector {
        ConfirmSelector::ByHash { count } => {
            let mut pairs = Vec::with_capacity(count as usize);
            for _ in 0..count {
                pairs.push(HashPair::decode(r)?);
            }
            Ok(ConfirmReq::ByHash(pairs))
        }
        ConfirmSelector::Block(block_type) => {
            Ok(ConfirmReq::Block(decode_block_body(block_type, r)?))
        }
    }
}

impl Decode for VoteCommon {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(VoteCommon {
            account: r.array("vote: account")?,
            signature: r.array("vote: signature")?,
            sequence: r.u64_le("vote: sequence")?,
        })
    }
}

fn decode_confirm_ack(selector: ConfirmSelector, r: &mut Reader<'_>) -> Result<ConfirmAck> {
    let vote = VoteCommon::decode(r)?;

    let payload = match selector {
        ConfirmSelector::ByHash { count } => {
            let mut hashes = Vec::with_capacity(count as usize);
            for _ in 0..count {
                hashes.push(r.array("confirm_ack: hash")?);
            }
            VotePayload::Hashes(hashes)
        }
        ConfirmSelector::Block(block_type) => VotePayload::Block(decode_block_body(block_type, r)?),
    };

    Ok(ConfirmAck { vote, payload })
}

impl Decode for BulkPullExtended {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(BulkPullExtended {
            zero: r.u8("bulk_pull: extended zero")?,
            count: r.u32_le("bulk_pull: extended count")?,
            reserved: r.array("bulk_pull: extended reserved")?,
        })
    }
}

fn decode_bulk_pull(extended: bool, r: &mut Reader<'_>) -> Result<BulkPull> {
    let start = r.array("bulk_pull: start")?;
    let end = r.array("bulk_pull: end")?;

    let extended = if extended {
        Some(BulkPullExtended::decode(r)?)
    } else {
        None
    };

    Ok(BulkPull {
        start,
        end,
        extended,
    })
}

fn decode_frontier_req(confirmed_only: bool, r: &mut Reader<'_>) -> Result<FrontierReq> {
    Ok(FrontierReq {
        start: r.array("frontier_req: start account")?,
        age: r.u32_le("frontier_req: age")?,
        count: r.u32_le("frontier_req: count")?,
        confirmed_only,
    })
}

impl Decode for HandshakeResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(HandshakeResponse {
            account: r.array("node_id_handshake: account")?,
            signature: r.array("node_id_handshake: signature")?,
        })
    }
}

fn decode_node_id_handshake(
    is_query: bool,
    is_response: bool,
    r: &mut Reader<'_>,
) -> Result<NodeIdHandshake> {
    let query = if is_query {
        Some(r.array("node_id_handshake: cookie")?)
    } else {
        None
    };

    let response = if is_response {
        Some(HandshakeResponse::decode(r)?)
    } else {
        None
    };

    Ok(NodeIdHandshake { query, response })
}

impl Decode for BulkPullAccount {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(BulkPullAccount {
            account: r.array("bulk_pull_account: account")?,
            minimum_amount: r.array("bulk_pull_account: minimum amount")?,
            flags: r.u8("bulk_pull_account: flags")?,
        })
    }
}

fn decode_telemetry_ack(declared_size: u16, r: &mut Reader<'_>) -> Result<TelemetryAck> {
    Ok(TelemetryAck {
        signature: r.array("telemetry: signature")?,
        node_id: r.array("telemetry: node id")?,
        block_count: r.u64_be("telemetry: block count")?,
        cemented_count: r.u64_be("telemetry: cemented count")?,
        unchecked_count: r.u64_be("telemetry: unchecked count")?,
        account_count: r.u64_be("telemetry: account count")?,
        bandwidth_cap: r.u64_be("telemetry: bandwidth cap")?,
        peer_count: r.u32_be("telemetry: peer count")?,
        protocol_version: r.u8("telemetry: protocol version")?,
        uptime: r.u64_be("telemetry: uptime")?,
        genesis_block: r.array("telemetry: genesis block")?,
        major_version: r.u8("telemetry: major version")?,
        minor_version: r.u8("telemetry: minor version")?,
        patch_version: r.u8("telemetry: patch version")?,
        pre_release_version: r.u8("telemetry: pre-release version")?,
        maker: r.u8("telemetry: maker")?,
        timestamp_ms: r.u64_be("telemetry: timestamp")?,
        active_difficulty: r.u64_be("telemetry: active difficulty")?,
        declared_size,
    })
}

fn decode_asc_pull_req(r: &mut Reader<'_>) -> Result<AscPullReq> {
    let pull_type = r.u8("asc_pull_req: type")?;
    let id = r.u64_be("asc_pull_req: id")?;

    let payload = match pull_type {
        ASC_PULL_TYPE_BLOCKS => AscPullReqPayload::Blocks {
            start: r.array("asc_pull_req: blocks start")?,
            count: r.u8("asc_pull_req: blocks count")?,
        },
        ASC_PULL_TYPE_ACCOUNT_INFO => AscPullReqPayload::AccountInfo {
            target: r.array("asc_pull_req: account info target")?,
        },
        other => AscPullReqPayload::Other(other),
    };

    Ok(AscPullReq { id, payload })
}

impl Decode for AccountInfo {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(AccountInfo {
            account: r.array("account_info: account")?,
            open: r.array("account_info: open")?,
            head: r.array("account_info: head")?,
            block_count: r.u64_be("account_info: block count")?,
            confirmation_frontier: r.array("account_info: confirmation frontier")?,
            confirmation_height: r.u64_be("account_info: confirmation height")?,
        })
    }
}

fn decode_asc_pull_ack(r: &mut Reader<'_>) -> Result<AscPullAck> {
    let pull_type = r.u8("asc_pull_ack: type")?;
    let id = r.u64_be("asc_pull_ack: id")?;

    let payload = match pull_type {
        ASC_PULL_TYPE_BLOCKS => AscPullAckPayload::Blocks(decode_asc_pull_ack_blocks(r)?),
        ASC_PULL_TYPE_ACCOUNT_INFO => AscPullAckPayload::AccountInfo(AccountInfo::decode(r)?),
        other => AscPullAckPayload::Other(other),
    };

    Ok(AscPullAck { id, payload })
}

/// Type-prefixed blocks up to a Not-A-Block byte, which is then consumed as
/// the terminator.
fn decode_asc_pull_ack_blocks(r: &mut Reader<'_>) -> Result<Vec<BlockBody>> {
    let mut blocks = Vec::new();

    loop {
        r.ensure(1, "asc_pull_ack: block type")?;
        if r.peek_u8().map(BlockType::from) == Some(BlockType::NotABlock) {
            break;
        }

        let block_type = BlockType::from(r.u8("asc_pull_ack: block type")?);
        let body = decode_block_body(block_type, r)?;
        let stop = matches!(body, BlockBody::Unrecognized(_));
        blocks.push(body);

        if stop {
            return Ok(blocks);
        }
    }

    r.u8("asc_pull_ack: terminator")?;
    Ok(blocks)
}

/// One bulk pull response or bulk push data message: a block type byte,
/// then either the block or nothing for the end sentinel.
pub fn decode_stream_entry(r: &mut Reader<'_>) -> Result<StreamEntry> {
    let block_type = BlockType::from(r.u8("stream: block type")?);

    if block_type == BlockType::NotABlock {
        return Ok(StreamEntry::End);
    }

    Ok(StreamEntry::Block(decode_block_body(block_type, r)?))
}

impl Decode for FrontierResponse {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        Ok(FrontierResponse {
            account: r.array("frontier_response: account")?,
            frontier: r.array("frontier_response: frontier hash")?,
        })
    }
}

pub fn decode_bulk_pull_account_response(
    flags: u8,
    r: &mut Reader<'_>,
) -> Result<BulkPullAccountResponse> {
    let layout = BulkPullAccountLayout::from_flags(flags);

    let frontier = r.array("bulk_pull_account_response: frontier")?;
    let balance = r.array("bulk_pull_account_response: balance")?;

    let pending = if layout.pending {
        Some(PendingEntry {
            hash: r.array("bulk_pull_account_response: pending hash")?,
            amount: r.array("bulk_pull_account_response: pending amount")?,
        })
    } else {
        None
    };

    let source = if layout.source {
        Some(r.array("bulk_pull_account_response: source")?)
    } else {
        None
    };

    Ok(BulkPullAccountResponse {
        frontier,
        balance,
        pending,
        source,
    })
}
