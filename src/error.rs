//! Error types for framing and decoding Nano messages.

use thiserror::Error;

/// Failures that can occur while framing or decoding a single message.
///
/// None of these outlive the message that produced them: the conversation
/// always advances past the framed bytes and keeps decoding.
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer bytes are buffered than the message needs. The caller should
    /// gather more and retry.
    #[error("insufficient data: need {need} bytes, have {have} ({context})")]
    InsufficientData {
        need: usize,
        have: usize,
        context: &'static str,
    },

    /// A block type byte outside Send, Receive, Open, Change and State.
    #[error("unrecognized block type {0}")]
    UnrecognizedBlockType(u8),

    /// A packet type whose body length cannot be derived.
    #[error("packet type {0} has no known body layout")]
    UnknownPacketType(u8),

    /// The framer and a body decoder disagreed on the size of a message.
    #[error("framing desynchronized: framed {framed} bytes, decoder consumed {consumed}")]
    Desynchronized { framed: usize, consumed: usize },

    /// A line of replay input could not be parsed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
