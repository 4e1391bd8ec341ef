//! Decoder for the Nano cryptocurrency peer-to-peer protocol as carried over TCP.
//!
//! The crate turns a raw, possibly fragmented byte stream between two peers
//! into typed messages. Three pieces cooperate:
//!
//! - [`wire::frame_length`] tells the reassembly layer how many bytes the next
//!   message spans, including the headerless continuation messages used by the
//!   bootstrap sub-protocols (bulk pull, bulk push, frontier and bulk pull
//!   account streams).
//! - [`wire::decode_message`] decodes exactly those bytes and updates the
//!   connection's [`SessionState`].
//! - [`Conversation`] is a ready-made reassembly buffer that drives the two
//!   in a loop for both directions of one connection.
//!
//! Protocol reference:
//! https://docs.nano.org/protocol-design/networking/
pub mod error;
pub mod session;
pub mod wire;

pub use error::{Error, Result};
pub use session::{ConnectionKey, Conversation, ConversationTable, Direction, SessionState};
