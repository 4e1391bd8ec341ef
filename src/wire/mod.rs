//! Nano TCP wire protocol primitives.
//!
//! This module provides the pieces needed to find message boundaries in a
//! Nano byte stream and to decode each message into a typed value.
//!
//! It implements:
//! - Parsing of the 8-byte message header and its packet-type-dependent
//!   extensions field
//! - Decoding of the five fixed-layout block variants
//! - One body decoder per packet type, plus the headerless continuation
//!   messages of the bootstrap protocols
//! - A framer that computes the exact length of the next message from a
//!   partial buffer and the connection's session state
//!
//! Sizes are computed in one place, [`size`], and both the framer and the
//! decoders go through it.
pub mod codec;

pub mod block;
pub mod decode;
pub mod extensions;
pub mod message;
pub mod payload;
pub mod size;

pub mod constants;

pub use block::{block_size, decode_block, encode_block, Block};
pub use codec::{decode_message, frame_length, Decoded, FrameLength};
pub use extensions::{ConfirmSelector, DecodedExtensions, Extensions};
pub use message::{BlockBody, BlockType, Header, Message, Network, PacketType};
pub use payload::{
    build_bulk_pull, build_bulk_pull_account, build_frontier_req, build_keepalive,
    build_node_id_query, encode_header, header_for,
};
