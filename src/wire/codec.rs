use tracing::{debug, warn};

use crate::session::{Direction, SessionState};
use crate::wire::constants::HEADER_LENGTH;
use crate::wire::decode::{
    decode_body, decode_bulk_pull_account_response, decode_header, decode_stream_entry, Reader,
};
use crate::wire::message::{Decode, FrontierResponse, Header, Message, PacketType, StreamEntry};
use crate::wire::size::{body_length, headerless_length};
use crate::{Error, Result};

/// Result of asking the framer how long the next message is.
#[derive(Debug)]
pub enum FrameLength {
    /// The next message is this many bytes and all of them are buffered.
    Complete(usize),
    /// At least `need` bytes in total are required before the length is
    /// known or the message is complete.
    Incomplete { need: usize },
    /// The length cannot be derived from the protocol. The whole of
    /// `available` should be handed to the decoder as one message.
    Unframable { available: usize, reason: Error },
}

/// Computes the length of the next message at the start of `buf`.
///
/// This is the reassembly layer's callback: it looks only at bytes and the
/// session state, never at which side sent them, and it never mutates the
/// state. When a pending request expects a headerless continuation every
/// message is sized as one.
///
/// ```text
/// headered:    [ header: 8 ][ body: derived from packet type + extensions ]
/// headerless:  [ body: derived from the pending request ]
/// ```
///
/// # Example
///
/// ```
/// use nano_network::wire::{self, FrameLength};
/// use nano_network::SessionState;
///
/// let state = SessionState::default();
///
/// // Telemetry req: header only.
/// let bytes = [b'R', b'C', 0x13, 0x13, 0x12, 0x0c, 0x00, 0x00];
///
/// assert!(matches!(wire::frame_length(&state, &bytes), FrameLength::Complete(8)));
/// assert!(matches!(
///     wire::frame_length(&state, &bytes[..5]),
///     FrameLength::Incomplete { need: 8 }
/// ));
/// ```
pub fn frame_length(state: &SessionState, buf: &[u8]) -> FrameLength {
    let result = if state.expects_headerless() {
        headerless_length(state, buf)
    } else {
        headered_length(buf)
    };

    match result {
        Ok(length) if length <= buf.len() => FrameLength::Complete(length),
        Ok(length) => FrameLength::Incomplete { need: length },
        Err(Error::InsufficientData { need, .. }) => FrameLength::Incomplete { need },
        Err(reason) => FrameLength::Unframable {
            available: buf.len(),
            reason,
        },
    }
}

fn headered_length(buf: &[u8]) -> Result<usize> {
    let mut r = Reader::new(buf);
    let header = decode_header(&mut r).map_err(|_| Error::InsufficientData {
        need: HEADER_LENGTH,
        have: buf.len(),
        context: "header",
    })?;

    match body_length(&header, &buf[HEADER_LENGTH..]) {
        Ok(length) => Ok(HEADER_LENGTH + length),
        Err(Error::InsufficientData {
            need,
            have,
            context,
        }) => Err(Error::InsufficientData {
            need: HEADER_LENGTH + need,
            have: HEADER_LENGTH + have,
            context,
        }),
        Err(e) => Err(e),
    }
}

/// One decoded message and how many bytes it spanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// `None` for headerless continuation messages.
    pub header: Option<Header>,
    pub message: Message,
    pub direction: Direction,
    pub length: usize,
}

/// Decodes exactly one framed message and applies its effect on the
/// session state.
///
/// `bytes` must be the span the framer reported. Headered requests that
/// open a continuation record themselves as the pending request (bulk pull
/// account also records its flags); every other headered message clears it.
/// A continuation's end sentinel clears it too.
///
/// When the decoder and framer disagree on the length,
/// [`Error::Desynchronized`] is returned, unless decoding stopped early on a
/// block type it could not size.
pub fn decode_message(
    state: &mut SessionState,
    direction: Direction,
    bytes: &[u8],
) -> Result<Decoded> {
    let mut r = Reader::new(bytes);

    let (header, message) = if state.expects_headerless() {
        let message = decode_headerless(state, direction, &mut r)?;
        (None, message)
    } else {
        let header = decode_header(&mut r)?;
        let message = decode_body(&header, &mut r)?;
        record_request(state, &header, &message);
        (Some(header), message)
    };

    let consumed = r.position();
    if consumed != bytes.len() && !message.is_partial() {
        warn!(
            framed = bytes.len(),
            consumed,
            message = %message.summary(),
            "decoder and framer disagree on message length"
        );
        return Err(Error::Desynchronized {
            framed: bytes.len(),
            consumed,
        });
    }

    debug!(%direction, length = bytes.len(), message = %message.summary(), "decoded message");

    Ok(Decoded {
        header,
        message,
        direction,
        length: bytes.len(),
    })
}

fn record_request(state: &mut SessionState, header: &Header, message: &Message) {
    if header.packet_type.starts_continuation() {
        debug!(
            request = header.packet_type.name(),
            "request opens headerless continuation"
        );
        state.pending_client_request = header.packet_type;
    } else {
        state.pending_client_request = PacketType::Invalid;
    }

    if let Message::BulkPullAccount(request) = message {
        state.bulk_pull_account_flags = request.flags;
    }
}

fn end_continuation(state: &mut SessionState, next: PacketType) {
    debug!(
        request = state.pending_client_request.name(),
        "continuation finished"
    );
    state.pending_client_request = next;
}

fn decode_headerless(
    state: &mut SessionState,
    direction: Direction,
    r: &mut Reader<'_>,
) -> Result<Message> {
    let pending = state.pending_client_request;

    let message = match (pending, direction) {
        (PacketType::BulkPull, Direction::ServerToClient) => {
            let entry = decode_stream_entry(r)?;
            if entry == StreamEntry::End {
                end_continuation(state, PacketType::NotAType);
            }
            Message::BulkPullResponse(entry)
        }
        (PacketType::BulkPush, Direction::ClientToServer) => {
            let entry = decode_stream_entry(r)?;
            if entry == StreamEntry::End {
                end_continuation(state, PacketType::NotAType);
            }
            Message::BulkPushData(entry)
        }
        (PacketType::FrontierReq, Direction::ServerToClient) => {
            let response = FrontierResponse::decode(r)?;
            if response.is_end() {
                end_continuation(state, PacketType::Invalid);
            }
            Message::FrontierResponse(response)
        }
        (PacketType::BulkPullAccount, Direction::ServerToClient) => {
            let response = decode_bulk_pull_account_response(state.bulk_pull_account_flags, r)?;
            if response.is_end() {
                end_continuation(state, PacketType::Invalid);
            }
            Message::BulkPullAccountResponse(response)
        }
        _ => {
            warn!(
                %direction,
                pending = pending.name(),
                "headerless message in unexpected direction"
            );
            Message::UnexpectedHeaderless {
                direction,
                payload: r.rest(),
            }
        }
    };

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::block::encode_block;
    use crate::wire::block::tests::sample_state_block;
    use crate::wire::message::{BlockBody, BlockType};
    use crate::wire::payload::{
        build_bulk_pull_account, build_frontier_req, encode_header, header_for,
    };

    fn framed(state: &SessionState, buf: &[u8]) -> usize {
        match frame_length(state, buf) {
            FrameLength::Complete(length) => length,
            other => panic!("expected complete frame, got {other:?}"),
        }
    }

    #[test]
    fn short_header_needs_eight_bytes() {
        let state = SessionState::default();
        assert!(matches!(
            frame_length(&state, &[b'R']),
            FrameLength::Incomplete { need: 8 }
        ));
    }

    #[test]
    fn incomplete_body_reports_total_length() {
        let state = SessionState::default();
        let bytes = encode_header(&header_for(PacketType::Keepalive, 0));

        assert!(matches!(
            frame_length(&state, &bytes),
            FrameLength::Incomplete { need: 152 }
        ));
    }

    #[test]
    fn unknown_packet_type_is_unframable() {
        let state = SessionState::default();
        let mut bytes = encode_header(&header_for(PacketType::Unknown(0x42), 0));
        bytes.extend_from_slice(&[0u8; 10]);

        match frame_length(&state, &bytes) {
            FrameLength::Unframable { available, reason } => {
                assert_eq!(available, 18);
                assert!(matches!(reason, Error::UnknownPacketType(0x42)));
            }
            other => panic!("expected unframable, got {other:?}"),
        }
    }

    #[test]
    fn asc_pull_ack_incomplete_scan_reports_header_relative_need() {
        let state = SessionState::default();
        let mut bytes = encode_header(&header_for(PacketType::AscPullAck, 0));
        bytes.push(1);
        bytes.extend_from_slice(&[0u8; 8]);

        assert!(matches!(
            frame_length(&state, &bytes),
            FrameLength::Incomplete { need: 18 }
        ));
    }

    #[test]
    fn publish_records_no_continuation() {
        let mut state = SessionState::default();
        state.pending_client_request = PacketType::NotAType;

        let mut bytes = encode_header(&header_for(PacketType::Publish, 0x0600));
        bytes.extend(encode_block(&sample_state_block(3)));

        let length = framed(&state, &bytes);
        assert_eq!(length, 224);

        let decoded = decode_message(&mut state, Direction::ClientToServer, &bytes).unwrap();
        assert_eq!(decoded.length, 224);
        assert!(decoded.header.is_some());
        assert_eq!(state.pending_client_request, PacketType::Invalid);
    }

    #[test]
    fn bulk_pull_account_records_flags() {
        let mut state = SessionState::default();
        let bytes = build_bulk_pull_account([1u8; 32], [0u8; 16], 0x02);

        decode_message(&mut state, Direction::ClientToServer, &bytes).unwrap();
        assert_eq!(state.pending_client_request, PacketType::BulkPullAccount);
        assert_eq!(state.bulk_pull_account_flags, 0x02);

        let response = [5u8; 128];
        assert_eq!(framed(&state, &response), 128);

        let decoded = decode_message(&mut state, Direction::ServerToClient, &response).unwrap();
        assert!(decoded.header.is_none());
        assert!(matches!(
            decoded.message,
            Message::BulkPullAccountResponse(entry) if entry.source == Some([5u8; 32])
        ));
        assert_eq!(state.pending_client_request, PacketType::BulkPullAccount);

        let end = [0u8; 128];
        decode_message(&mut state, Direction::ServerToClient, &end).unwrap();
        assert_eq!(state.pending_client_request, PacketType::Invalid);
    }

    #[test]
    fn frontier_stream_ends_on_zero_entry() {
        let mut state = SessionState::default();
        let request = build_frontier_req([0u8; 32], u32::MAX, u32::MAX, false);

        decode_message(&mut state, Direction::ClientToServer, &request).unwrap();
        assert_eq!(state.pending_client_request, PacketType::FrontierReq);

        let mut entry = [0u8; 64];
        entry[0] = 1;
        let decoded = decode_message(&mut state, Direction::ServerToClient, &entry).unwrap();
        assert_eq!(decoded.message.summary(), "Frontier Response");
        assert_eq!(state.pending_client_request, PacketType::FrontierReq);

        decode_message(&mut state, Direction::ServerToClient, &[0u8; 64]).unwrap();
        assert_eq!(state.pending_client_request, PacketType::Invalid);
    }

    #[test]
    fn headerless_in_wrong_direction_is_kept_raw() {
        let mut state = SessionState::default();
        state.pending_client_request = PacketType::FrontierReq;

        let bytes = [7u8; 64];
        let decoded = decode_message(&mut state, Direction::ClientToServer, &bytes).unwrap();

        assert_eq!(
            decoded.message,
            Message::UnexpectedHeaderless {
                direction: Direction::ClientToServer,
                payload: bytes.to_vec(),
            }
        );
        assert_eq!(
            decoded.message.summary(),
            "UNKNOWN HEADERLESS [CLIENT] Packet"
        );
        assert_eq!(state.pending_client_request, PacketType::FrontierReq);
    }

    #[test]
    fn unrecognized_stream_block_is_partial_not_desynchronized() {
        let mut state = SessionState::default();
        state.pending_client_request = PacketType::BulkPull;

        let bytes = [0x0au8, 0xff, 0xff, 0xff];
        assert!(matches!(
            frame_length(&state, &bytes),
            FrameLength::Unframable { available: 4, .. }
        ));

        let decoded = decode_message(&mut state, Direction::ServerToClient, &bytes).unwrap();
        assert_eq!(
            decoded.message,
            Message::BulkPullResponse(StreamEntry::Block(BlockBody::Unrecognized(
                BlockType::Unknown(10)
            )))
        );
        assert_eq!(decoded.length, 4);
    }

    #[test]
    fn length_mismatch_is_desynchronized() {
        let mut state = SessionState::default();
        let mut bytes = encode_header(&header_for(PacketType::TelemetryReq, 0));
        bytes.extend_from_slice(&[0u8; 3]);

        let err = decode_message(&mut state, Direction::ClientToServer, &bytes).unwrap_err();
        assert!(matches!(
            err,
            Error::Desynchronized {
                framed: 11,
                consumed: 8
            }
        ));
    }
}
