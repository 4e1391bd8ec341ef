//! The five fixed-layout block variants.
//!
//! Every field is an opaque byte string; nothing here validates signatures,
//! work or balances.
use crate::wire::constants::{
    BLOCK_SIZE_CHANGE, BLOCK_SIZE_OPEN, BLOCK_SIZE_RECEIVE, BLOCK_SIZE_SEND, BLOCK_SIZE_STATE,
};
use crate::wire::decode::Reader;
use crate::wire::message::{BlockType, Decode};
use crate::{Error, Result};

/// A signed ledger record, tagged by its block type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Send(SendBlock),
    Receive(ReceiveBlock),
    Open(OpenBlock),
    Change(ChangeBlock),
    State(StateBlock),
}

/// Legacy send block (152 bytes).
///
/// ```text
/// 32 bytes  previous
/// 32 bytes  destination
/// 16 bytes  balance
/// 64 bytes  signature
///  8 bytes  work
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendBlock {
    pub previous: [u8; 32],
    pub destination: [u8; 32],
    pub balance: [u8; 16],
    pub signature: [u8; 64],
    pub work: [u8; 8],
}

/// Legacy receive block (136 bytes): previous, source, signature, work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveBlock {
    pub previous: [u8; 32],
    pub source: [u8; 32],
    pub signature: [u8; 64],
    pub work: [u8; 8],
}

/// Legacy open block (168 bytes): source, representative, account,
/// signature, work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBlock {
    pub source: [u8; 32],
    pub representative: [u8; 32],
    pub account: [u8; 32],
    pub signature: [u8; 64],
    pub work: [u8; 8],
}

/// Legacy change block (136 bytes): previous, representative, signature,
/// work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBlock {
    pub previous: [u8; 32],
    pub representative: [u8; 32],
    pub signature: [u8; 64],
    pub work: [u8; 8],
}

/// Universal state block (216 bytes).
///
/// ```text
/// 32 bytes  account
/// 32 bytes  previous
/// 32 bytes  representative
/// 16 bytes  balance
/// 32 bytes  link
/// 64 bytes  signature
///  8 bytes  work
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBlock {
    pub account: [u8; 32],
    pub previous: [u8; 32],
    pub representative: [u8; 32],
    pub balance: [u8; 16],
    pub link: [u8; 32],
    pub signature: [u8; 64],
    pub work: [u8; 8],
}

impl Block {
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::Send(_) => BlockType::Send,
            Block::Receive(_) => BlockType::Receive,
            Block::Open(_) => BlockType::Open,
            Block::Change(_) => BlockType::Change,
            Block::State(_) => BlockType::State,
        }
    }
}

/// Serialized size of a block of the given type, or `None` when the type
/// has no block layout (Invalid, Not-A-Block, unknown values).
pub fn block_size(block_type: BlockType) -> Option<usize> {
    match block_type {
        BlockType::Send => Some(BLOCK_SIZE_SEND),
        BlockType::Receive => Some(BLOCK_SIZE_RECEIVE),
        BlockType::Open => Some(BLOCK_SIZE_OPEN),
        BlockType::Change => Some(BLOCK_SIZE_CHANGE),
        BlockType::State => Some(BLOCK_SIZE_STATE),
        BlockType::Invalid | BlockType::NotABlock | BlockType::Unknown(_) => None,
    }
}

/// Decodes one block of `block_type`.
///
/// Consumes exactly [`block_size`] bytes. For a type with no block layout
/// nothing is consumed and [`Error::UnrecognizedBlockType`] is returned.
pub fn decode_block(block_type: BlockType, reader: &mut Reader<'_>) -> Result<Block> {
    match block_type {
        BlockType::Send => Ok(Block::Send(SendBlock::decode(reader)?)),
        BlockType::Receive => Ok(Block::Receive(ReceiveBlock::decode(reader)?)),
        BlockType::Open => Ok(Block::Open(OpenBlock::decode(reader)?)),
        BlockType::Change => Ok(Block::Change(ChangeBlock::decode(reader)?)),
        BlockType::State => Ok(Block::State(StateBlock::decode(reader)?)),
        other => Err(Error::UnrecognizedBlockType(other.as_u8())),
    }
}

/// Serializes a block body (without a leading type byte).
pub fn encode_block(block: &Block) -> Vec<u8> {
    let mut out = Vec::with_capacity(block_size(block.block_type()).unwrap_or_default());
    encode_block_into(block, &mut out);
    out
}

pub fn encode_block_into(block: &Block, out: &mut Vec<u8>) {
    match block {
        Block::Send(b) => {
            out.extend_from_slice(&b.previous);
            out.extend_from_slice(&b.destination);
            out.extend_from_slice(&b.balance);
            out.extend_from_slice(&b.signature);
            out.extend_from_slice(&b.work);
        }
        Block::Receive(b) => {
            out.extend_from_slice(&b.previous);
            out.extend_from_slice(&b.source);
            out.extend_from_slice(&b.signature);
            out.extend_from_slice(&b.work);
        }
        Block::Open(b) => {
            out.extend_from_slice(&b.source);
            out.extend_from_slice(&b.representative);
            out.extend_from_slice(&b.account);
            out.extend_from_slice(&b.signature);
            out.extend_from_slice(&b.work);
        }
        Block::Change(b) => {
            out.extend_from_slice(&b.previous);
            out.extend_from_slice(&b.representative);
            out.extend_from_slice(&b.signature);
            out.extend_from_slice(&b.work);
        }
        Block::State(b) => {
            out.extend_from_slice(&b.account);
            out.extend_from_slice(&b.previous);
            out.extend_from_slice(&b.representative);
            out.extend_from_slice(&b.balance);
            out.extend_from_slice(&b.link);
            out.extend_from_slice(&b.signature);
            out.extend_from_slice(&b.work);
        }
    }
}

impl Decode for SendBlock {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.ensure(BLOCK_SIZE_SEND, "send block")?;
        Ok(SendBlock {
            previous: r.array("send: previous")?,
            destination: r.array("send: destination")?,
            balance: r.array("send: balance")?,
            signature: r.array("send: signature")?,
            work: r.array("send: work")?,
        })
    }
}

impl Decode for ReceiveBlock {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.ensure(BLOCK_SIZE_RECEIVE, "receive block")?;
        Ok(ReceiveBlock {
            previous: r.array("receive: previous")?,
            source: r.array("receive: source")?,
            signature: r.array("receive: signature")?,
            work: r.array("receive: work")?,
        })
    }
}

impl Decode for OpenBlock {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.ensure(BLOCK_SIZE_OPEN, "open block")?;
        Ok(OpenBlock {
            source: r.array("open: source")?,
            representative: r.array("open: representative")?,
            account: r.array("open: account")?,
            signature: r.array("open: signature")?,
            work: r.array("open: work")?,
        })
    }
}

impl Decode for ChangeBlock {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.ensure(BLOCK_SIZE_CHANGE, "change block")?;
        Ok(ChangeBlock {
            previous: r.array("change: previous")?,
            representative: r.array("change: representative")?,
            signature: r.array("change: signature")?,
            work: r.array("change: work")?,
        })
    }
}

impl Decode for StateBlock {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        r.ensure(BLOCK_SIZE_STATE, "state block")?;
        Ok(StateBlock {
            account: r.array("state: account")?,
            previous: r.array("state: previous")?,
            representative: r.array("state: representative")?,
            balance: r.array("state: balance")?,
            link: r.array("state: link")?,
            signature: r.array("state: signature")?,
            work: r.array("state: work")?,
        })
    }
}
