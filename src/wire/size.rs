//! Message lengths.
//!
//! Every length the framer reports comes from here, and the decoders read
//! the same extension bits and flags through the same helpers, so a framed
//! message and its decoded body always agree on size.
//!
//! Functions take the bytes seen so far. When those are too few to know
//! the length, they return [`Error::InsufficientData`] with `need` counted
//! from the start of the slice they were given.
use crate::session::SessionState;
use crate::wire::block::block_size;
use crate::wire::constants::{
    ACCOUNT_SIZE, ASC_PULL_ACK_ACCOUNT_INFO_SIZE, ASC_PULL_PREFIX_SIZE,
    ASC_PULL_REQ_ACCOUNT_INFO_SIZE, ASC_PULL_REQ_BLOCKS_SIZE, ASC_PULL_TYPE_ACCOUNT_INFO,
    ASC_PULL_TYPE_BLOCKS, BALANCE_SIZE, BULK_PULL_ACCOUNT_PENDING_ADDRESS_ONLY,
    BULK_PULL_ACCOUNT_PENDING_INCLUDE_ADDRESS, BULK_PULL_ACCOUNT_SIZE, BULK_PULL_EXTENDED_SIZE,
    BULK_PULL_SIZE, FRONTIER_REQ_SIZE, FRONTIER_RESPONSE_SIZE, HANDSHAKE_QUERY_SIZE,
    HANDSHAKE_RESPONSE_SIZE, HASH_SIZE, KEEPALIVE_PEERS, PEER_ENTRY_SIZE, TELEMETRY_ACK_SIZE,
    VOTE_COMMON_SIZE,
};
use crate::wire::extensions::{ConfirmSelector, DecodedExtensions};
use crate::wire::message::{BlockType, Header, PacketType};
use crate::{Error, Result};

/// Which optional parts each bulk pull account response entry carries,
/// chosen by the flags byte of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkPullAccountLayout {
    /// Pending hash + amount.
    pub pending: bool,
    /// Source account.
    pub source: bool,
}

impl BulkPullAccountLayout {
    pub fn from_flags(flags: u8) -> Self {
        match flags {
            BULK_PULL_ACCOUNT_PENDING_ADDRESS_ONLY => Self {
                pending: false,
                source: true,
            },
            BULK_PULL_ACCOUNT_PENDING_INCLUDE_ADDRESS => Self {
                pending: true,
                source: true,
            },
            _ => Self {
                pending: true,
                source: false,
            },
        }
    }

    pub fn size(self) -> usize {
        let mut size = HASH_SIZE + BALANCE_SIZE;
        if self.pending {
            size += HASH_SIZE + BALANCE_SIZE;
        }
        if self.source {
            size += ACCOUNT_SIZE;
        }
        size
    }
}

fn insufficient(need: usize, have: usize, context: &'static str) -> Error {
    Error::InsufficientData {
        need,
        have,
        context,
    }
}

fn block_length(block_type: BlockType) -> Result<usize> {
    block_size(block_type).ok_or(Error::UnrecognizedBlockType(block_type.as_u8()))
}

/// Length of the body following `header`, given the body bytes buffered so
/// far.
///
/// Packet types without a known layout return
/// [`Error::UnknownPacketType`]; block slots of an unsizable type return
/// [`Error::UnrecognizedBlockType`].
pub fn body_length(header: &Header, body: &[u8]) -> Result<usize> {
    match (header.packet_type, header.extensions.decode(header.packet_type)) {
        (PacketType::Keepalive, _) => Ok(KEEPALIVE_PEERS * PEER_ENTRY_SIZE),
        (PacketType::Publish, DecodedExtensions::Publish { block_type }) => {
            block_length(block_type)
        }
        (PacketType::ConfirmReq, DecodedExtensions::Confirm(selector)) => {
            confirm_req_length(selector)
        }
        (PacketType::ConfirmAck, DecodedExtensions::Confirm(selector)) => {
            confirm_ack_length(selector)
        }
        (PacketType::BulkPull, DecodedExtensions::BulkPull { extended }) => {
            Ok(bulk_pull_length(extended))
        }
        (PacketType::BulkPush, _) => Ok(0),
        (PacketType::FrontierReq, _) => Ok(FRONTIER_REQ_SIZE),
        (
            PacketType::NodeIdHandshake,
            DecodedExtensions::NodeIdHandshake {
                is_query,
                is_response,
            },
        ) => Ok(node_id_handshake_length(is_query, is_response)),
        (PacketType::BulkPullAccount, _) => Ok(BULK_PULL_ACCOUNT_SIZE),
        (PacketType::TelemetryReq, _) => Ok(0),
        (PacketType::TelemetryAck, _) => Ok(TELEMETRY_ACK_SIZE),
        (PacketType::AscPullReq, _) => asc_pull_req_length(body),
        (PacketType::AscPullAck, _) => asc_pull_ack_length(body),
        (packet_type, _) => Err(Error::UnknownPacketType(packet_type.as_u8())),
    }
}

pub fn confirm_req_length(selector: ConfirmSelector) -> Result<usize> {
    match selector {
        ConfirmSelector::ByHash { count } => Ok(count as usize * (HASH_SIZE + HASH_SIZE)),
        ConfirmSelector::Block(block_type) => block_length(block_type),
    }
}

pub fn confirm_ack_length(selector: ConfirmSelector) -> Result<usize> {
    let payload = match selector {
        ConfirmSelector::ByHash { count } => count as usize * HASH_SIZE,
        ConfirmSelector::Block(block_type) => block_length(block_type)?,
    };
    Ok(VOTE_COMMON_SIZE + payload)
}

pub fn bulk_pull_length(extended: bool) -> usize {
    if extended {
        BULK_PULL_SIZE + BULK_PULL_EXTENDED_SIZE
    } else {
        BULK_PULL_SIZE
    }
}

pub fn node_id_handshake_length(is_query: bool, is_response: bool) -> usize {
    let mut size = 0;
    if is_query {
        size += HANDSHAKE_QUERY_SIZE;
    }
    if is_response {
        size += HANDSHAKE_RESPONSE_SIZE;
    }
    size
}

fn asc_pull_req_length(body: &[u8]) -> Result<usize> {
    let pull_type = *body.first().ok_or(insufficient(
        ASC_PULL_PREFIX_SIZE,
        body.len(),
        "asc_pull_req: type",
    ))?;

    let payload = match pull_type {
        ASC_PULL_TYPE_BLOCKS => ASC_PULL_REQ_BLOCKS_SIZE,
        ASC_PULL_TYPE_ACCOUNT_INFO => ASC_PULL_REQ_ACCOUNT_INFO_SIZE,
        _ => 0,
    };

    Ok(ASC_PULL_PREFIX_SIZE + payload)
}

/// Account info acks have a fixed size. Block acks are scanned entry by
/// entry up to the Not-A-Block terminator, which is counted.
fn asc_pull_ack_length(body: &[u8]) -> Result<usize> {
    let pull_type = *body.first().ok_or(insufficient(
        ASC_PULL_PREFIX_SIZE,
        body.len(),
        "asc_pull_ack: type",
    ))?;

    match pull_type {
        ASC_PULL_TYPE_BLOCKS => {
            let mut offset = ASC_PULL_PREFIX_SIZE;
            loop {
                let Some(&type_byte) = body.get(offset) else {
                    return Err(insufficient(offset + 1, body.len(), "asc_pull_ack: block type"));
                };

                let block_type = BlockType::from(type_byte);
                if block_type == BlockType::NotABlock {
                    return Ok(offset + 1);
                }

                offset += 1 + block_length(block_type)?;
            }
        }
        ASC_PULL_TYPE_ACCOUNT_INFO => Ok(ASC_PULL_PREFIX_SIZE + ASC_PULL_ACK_ACCOUNT_INFO_SIZE),
        _ => Ok(ASC_PULL_PREFIX_SIZE),
    }
}

/// Length of the next headerless message in a conversation whose pending
/// request expects one.
///
/// Direction does not enter into it: whichever side sent the bytes, they are
/// sized by the pending request.
pub fn headerless_length(state: &SessionState, buf: &[u8]) -> Result<usize> {
    match state.pending_client_request {
        PacketType::BulkPull | PacketType::BulkPush => stream_entry_length(buf),
        PacketType::FrontierReq => Ok(FRONTIER_RESPONSE_SIZE),
        PacketType::BulkPullAccount => {
            Ok(BulkPullAccountLayout::from_flags(state.bulk_pull_account_flags).size())
        }
        other => Err(Error::UnknownPacketType(other.as_u8())),
    }
}

/// A type byte, then the block unless the type is Not-A-Block.
fn stream_entry_length(buf: &[u8]) -> Result<usize> {
    let type_byte = *buf
        .first()
        .ok_or(insufficient(1, buf.len(), "stream: block type"))?;

    match BlockType::from(type_byte) {
        BlockType::NotABlock => Ok(1),
        block_type => Ok(1 + block_length(block_type)?),
    }
}
