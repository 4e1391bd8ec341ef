//! Per-connection state and stream reassembly.
//!
//! A Nano TCP connection starts with headered messages. Four requests
//! (bulk pull, bulk push, frontier req, bulk pull account) switch it into a
//! mode where the following messages carry no header and can only be sized
//! and decoded by remembering that request. [`SessionState`] is that memory,
//! and [`Conversation`] feeds both directions of one connection through the
//! framer and decoder while keeping it current.
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::wire::codec::{decode_message, frame_length, Decoded, FrameLength};
use crate::wire::constants::NANO_TCP_PORT;
use crate::wire::message::PacketType;
use crate::Result;

/// Which side of the connection sent a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToServer => write!(f, "client -> server"),
            Direction::ServerToClient => write!(f, "server -> client"),
        }
    }
}

/// State one connection carries between messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// Last request that opened a headerless continuation, or
    /// [`PacketType::Invalid`] / [`PacketType::NotAType`] when none is open.
    pub pending_client_request: PacketType,
    /// Flags of the most recent bulk pull account request.
    pub bulk_pull_account_flags: u8,
    /// Port the server side listens on.
    pub server_port: u16,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(NANO_TCP_PORT)
    }
}

impl SessionState {
    pub fn new(server_port: u16) -> Self {
        Self {
            pending_client_request: PacketType::Invalid,
            bulk_pull_account_flags: 0,
            server_port,
        }
    }

    /// Traffic addressed to the server port comes from the client.
    pub fn direction_of(&self, destination_port: u16) -> Direction {
        if destination_port == self.server_port {
            Direction::ClientToServer
        } else {
            Direction::ServerToClient
        }
    }

    /// True when the next message on the connection has no header.
    pub fn expects_headerless(&self) -> bool {
        self.pending_client_request.starts_continuation()
    }
}

/// Reassembles and decodes both directions of one TCP connection.
///
/// Bytes are appended per direction; every complete message is decoded as
/// soon as it is buffered. Session state is shared by both directions, since
/// a request in one direction changes how the other is framed.
#[derive(Debug)]
pub struct Conversation {
    state: SessionState,
    client: BytesMut,
    server: BytesMut,
}

impl Conversation {
    pub fn new(server_port: u16) -> Self {
        Self {
            state: SessionState::new(server_port),
            client: BytesMut::with_capacity(4 * 1024),
            server: BytesMut::with_capacity(4 * 1024),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Bytes buffered in `direction` that do not yet form a full message.
    pub fn buffered(&self, direction: Direction) -> usize {
        match direction {
            Direction::ClientToServer => self.client.len(),
            Direction::ServerToClient => self.server.len(),
        }
    }

    /// Appends `data` sent in `direction` and decodes every message now
    /// complete.
    ///
    /// A message that fails to decode is reported in place and skipped; the
    /// buffer always advances past its framed length, so one bad message
    /// never stalls the rest of the stream.
    pub fn feed(&mut self, direction: Direction, data: &[u8]) -> Vec<Result<Decoded>> {
        let buffer = match direction {
            Direction::ClientToServer => &mut self.client,
            Direction::ServerToClient => &mut self.server,
        };
        buffer.extend_from_slice(data);

        let mut messages = Vec::new();

        while !buffer.is_empty() {
            let length = match frame_length(&self.state, buffer) {
                FrameLength::Complete(length) => length,
                FrameLength::Incomplete { need } => {
                    debug!(%direction, need, have = buffer.len(), "waiting for more data");
                    break;
                }
                FrameLength::Unframable { available, reason } => {
                    warn!(
                        %direction,
                        available,
                        %reason,
                        "cannot size message, taking all buffered bytes"
                    );
                    available
                }
            };

            let result = decode_message(&mut self.state, direction, &buffer[..length]);
            if let Err(e) = &result {
                warn!(%direction, length, error = %e, "failed to decode message");
            }
            messages.push(result);

            buffer.advance(length);
        }

        messages
    }
}

/// Identifies a connection by its two endpoints, whichever way a segment
/// travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    low: SocketAddr,
    high: SocketAddr,
}

impl ConnectionKey {
    pub fn new(a: SocketAddr, b: SocketAddr) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn endpoints(&self) -> (SocketAddr, SocketAddr) {
        (self.low, self.high)
    }
}

/// Conversations of many connections, created on first sight.
///
/// Entries live until [`ConversationTable::remove`] is called; callers drop
/// a conversation once its connection closes.
#[derive(Debug)]
pub struct ConversationTable {
    server_port: u16,
    conversations: HashMap<ConnectionKey, Conversation>,
}

impl Default for ConversationTable {
    fn default() -> Self {
        Self::new(NANO_TCP_PORT)
    }
}

impl ConversationTable {
    pub fn new(server_port: u16) -> Self {
        Self {
            server_port,
            conversations: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<&Conversation> {
        self.conversations.get(key)
    }

    /// Feeds one TCP segment payload travelling from `source` to
    /// `destination`.
    ///
    /// A new conversation takes its server port from the table when either
    /// endpoint uses it, and otherwise from the destination of its first
    /// segment.
    pub fn feed(
        &mut self,
        source: SocketAddr,
        destination: SocketAddr,
        data: &[u8],
    ) -> Vec<Result<Decoded>> {
        let key = ConnectionKey::new(source, destination);
        let server_port = if source.port() == self.server_port {
            source.port()
        } else {
            destination.port()
        };

        let conversation = self.conversations.entry(key).or_insert_with(|| {
            debug!(%source, %destination, server_port, "new conversation");
            Conversation::new(server_port)
        });

        let direction = conversation.state().direction_of(destination.port());
        conversation.feed(direction, data)
    }

    /// Drops a finished connection.
    pub fn remove(&mut self, key: &ConnectionKey) -> Option<Conversation> {
        self.conversations.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::message::{Message, StreamEntry};
    use crate::wire::payload::{build_bulk_pull, build_keepalive};

    #[test]
    fn direction_follows_server_port() {
        let state = SessionState::new(17075);
        assert_eq!(state.direction_of(17075), Direction::ClientToServer);
        assert_eq!(state.direction_of(54000), Direction::ServerToClient);
    }

    #[test]
    fn new_session_expects_headers() {
        let state = SessionState::default();
        assert_eq!(state.server_port, NANO_TCP_PORT);
        assert!(!state.expects_headerless());
    }

    #[test]
    fn feed_buffers_partial_messages() {
        let mut conversation = Conversation::new(17075);
        let bytes = build_keepalive(&[]);

        assert!(conversation
            .feed(Direction::ClientToServer, &bytes[..100])
            .is_empty());
        assert_eq!(conversation.buffered(Direction::ClientToServer), 100);

        let decoded = conversation.feed(Direction::ClientToServer, &bytes[100..]);
        assert_eq!(decoded.len(), 1);
        assert!(matches!(
            decoded[0].as_ref().unwrap().message,
            Message::Keepalive(_)
        ));
        assert_eq!(conversation.buffered(Direction::ClientToServer), 0);
    }

    #[test]
    fn directions_are_buffered_separately() {
        let mut conversation = Conversation::new(17075);
        let bytes = build_keepalive(&[]);

        conversation.feed(Direction::ClientToServer, &bytes[..10]);
        conversation.feed(Direction::ServerToClient, &bytes[..20]);

        assert_eq!(conversation.buffered(Direction::ClientToServer), 10);
        assert_eq!(conversation.buffered(Direction::ServerToClient), 20);
    }

    #[test]
    fn bulk_pull_switches_server_to_headerless() {
        let mut conversation = Conversation::new(17075);

        let request = build_bulk_pull([1u8; 32], [0u8; 32], None);
        let decoded = conversation.feed(Direction::ClientToServer, &request);
        assert_eq!(decoded.len(), 1);
        assert!(conversation.state().expects_headerless());

        let decoded = conversation.feed(Direction::ServerToClient, &[0x01]);
        assert_eq!(decoded.len(), 1);
        assert_eq!(
            decoded[0].as_ref().unwrap().message,
            Message::BulkPullResponse(StreamEntry::End)
        );
        assert_eq!(
            conversation.state().pending_client_request,
            PacketType::NotAType
        );
    }

    #[test]
    fn table_keys_segments_by_endpoint_pair() {
        let client: SocketAddr = "10.0.0.2:50000".parse().unwrap();
        let server: SocketAddr = "10.0.0.1:17075".parse().unwrap();
        let mut table = ConversationTable::new(17075);

        let request = build_bulk_pull([1u8; 32], [0u8; 32], None);
        table.feed(client, server, &request);
        let decoded = table.feed(server, client, &[0x01]);

        assert_eq!(table.len(), 1);
        assert_eq!(
            decoded[0].as_ref().unwrap().message,
            Message::BulkPullResponse(StreamEntry::End)
        );

        let key = ConnectionKey::new(server, client);
        assert_eq!(key, ConnectionKey::new(client, server));
        assert!(table.get(&key).is_some());
        assert!(table.remove(&key).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn server_port_comes_from_first_segment_when_unconfigured() {
        let client: SocketAddr = "10.0.0.2:50000".parse().unwrap();
        let server: SocketAddr = "10.0.0.1:7075".parse().unwrap();
        let mut table = ConversationTable::new(17075);

        let request = build_bulk_pull([1u8; 32], [0u8; 32], None);
        let decoded = table.feed(client, server, &request);
        assert_eq!(decoded[0].as_ref().unwrap().direction, Direction::ClientToServer);

        let decoded = table.feed(server, client, &[0x01]);
        assert_eq!(table.len(), 1);
        assert_eq!(decoded.len(), 1);
        let response = decoded[0].as_ref().unwrap();
        assert_eq!(response.direction, Direction::ServerToClient);
        assert_eq!(response.message, Message::BulkPullResponse(StreamEntry::End));

        let conversation = table.get(&ConnectionKey::new(client, server)).unwrap();
        assert_eq!(conversation.state().server_port, 7075);
        assert_eq!(conversation.buffered(Direction::ServerToClient), 0);
    }

    #[test]
    fn configured_port_wins_when_server_speaks_first() {
        let client: SocketAddr = "10.0.0.2:50000".parse().unwrap();
        let server: SocketAddr = "10.0.0.1:17075".parse().unwrap();
        let mut table = ConversationTable::new(17075);

        let decoded = table.feed(server, client, &build_keepalive(&[]));
        assert_eq!(decoded[0].as_ref().unwrap().direction, Direction::ServerToClient);

        let conversation = table.get(&ConnectionKey::new(client, server)).unwrap();
        assert_eq!(conversation.state().server_port, 17075);
    }
}
