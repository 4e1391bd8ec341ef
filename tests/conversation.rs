use nano_network::wire::block::{SendBlock, StateBlock};
use nano_network::wire::message::{AscPullAckPayload, ConfirmReq, StreamEntry, VotePayload};
use nano_network::wire::{
    build_bulk_pull, build_bulk_pull_account, build_frontier_req, build_keepalive, encode_block,
    encode_header, frame_length, header_for, Block, BlockBody, BlockType, Decoded, FrameLength,
    Message, PacketType,
};
use nano_network::{Conversation, Direction, SessionState};
use proptest::prelude::*;

const CLIENT: Direction = Direction::ClientToServer;
const SERVER: Direction = Direction::ServerToClient;

fn state_block(seed: u8) -> Block {
    Block::State(StateBlock {
        account: [seed; 32],
        previous: [seed ^ 0x01; 32],
        representative: [seed ^ 0x02; 32],
        balance: [seed ^ 0x03; 16],
        link: [seed ^ 0x04; 32],
        signature: [seed ^ 0x05; 64],
        work: [seed ^ 0x06; 8],
    })
}

fn send_block(seed: u8) -> Block {
    Block::Send(SendBlock {
        previous: [seed; 32],
        destination: [seed ^ 0x10; 32],
        balance: [seed ^ 0x20; 16],
        signature: [seed ^ 0x30; 64],
        work: [seed ^ 0x40; 8],
    })
}

fn typed_block(block: &Block) -> Vec<u8> {
    let mut out = vec![block.block_type().as_u8()];
    out.extend(encode_block(block));
    out
}

fn message_with(packet_type: PacketType, extensions: u16, body: &[u8]) -> Vec<u8> {
    let mut out = encode_header(&header_for(packet_type, extensions));
    out.extend_from_slice(body);
    out
}

fn feed_ok(conversation: &mut Conversation, direction: Direction, bytes: &[u8]) -> Vec<Decoded> {
    conversation
        .feed(direction, bytes)
        .into_iter()
        .map(|result| result.expect("message should decode"))
        .collect()
}

fn messages(decoded: &[Decoded]) -> Vec<&Message> {
    decoded.iter().map(|d| &d.message).collect()
}

#[test]
fn bulk_pull_response_ends_on_not_a_block() {
    let mut conversation = Conversation::new(17075);

    let request = hex::decode(concat!(
        "5243131312060000",
        "0000000000000000000000000000000000000000000000000000000000000000",
        "0000000000000000000000000000000000000000000000000000000000000000",
    ))
    .unwrap();

    let decoded = feed_ok(&mut conversation, CLIENT, &request);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].message.summary(), "Bulk Pull Request");
    assert_eq!(
        conversation.state().pending_client_request,
        PacketType::BulkPull
    );

    let decoded = feed_ok(&mut conversation, SERVER, &typed_block(&state_block(1)));
    assert_eq!(
        decoded[0].message,
        Message::BulkPullResponse(StreamEntry::Block(BlockBody::Block(state_block(1))))
    );
    assert!(decoded[0].header.is_none());

    let decoded = feed_ok(&mut conversation, SERVER, &[0x01]);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].length, 1);
    assert_eq!(
        decoded[0].message.summary(),
        "Bulk Pull Response [BULK PULL RESPONSE END]"
    );
    assert_eq!(
        conversation.state().pending_client_request,
        PacketType::NotAType
    );

    // Headers are expected again.
    let decoded = feed_ok(&mut conversation, SERVER, &build_keepalive(&[]));
    assert!(matches!(decoded[0].message, Message::Keepalive(_)));
}

#[test]
fn keepalive_with_ipv4_mapped_peer() {
    let mut conversation = Conversation::new(17075);

    let mut bytes = hex::decode("5243131312020000").unwrap();
    bytes.extend_from_slice(&[0u8; 18]);
    bytes.extend(hex::decode("00000000000000000000ffff7f0000011b42").unwrap());
    bytes.extend_from_slice(&[0u8; 18 * 6]);

    let decoded = feed_ok(&mut conversation, CLIENT, &bytes);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].length, 152);

    let Message::Keepalive(peers) = &decoded[0].message else {
        panic!("expected keepalive");
    };
    assert_eq!(peers[0].to_string(), "(none)");
    assert_eq!(peers[1].to_string(), "127.0.0.1:16923");
}

#[test]
fn frontier_stream_in_one_segment() {
    let mut conversation = Conversation::new(17075);

    feed_ok(
        &mut conversation,
        CLIENT,
        &build_frontier_req([0u8; 32], u32::MAX, u32::MAX, false),
    );

    let mut stream = Vec::new();
    stream.extend_from_slice(&[0xA1u8; 64]);
    stream.extend_from_slice(&[0xB2u8; 64]);
    stream.extend_from_slice(&[0u8; 64]);

    let decoded = feed_ok(&mut conversation, SERVER, &stream);
    assert_eq!(decoded.len(), 3);

    let Message::FrontierResponse(last) = &decoded[2].message else {
        panic!("expected frontier response");
    };
    assert!(last.is_end());
    assert_eq!(
        conversation.state().pending_client_request,
        PacketType::Invalid
    );
}

#[test]
fn bulk_push_blocks_then_end() {
    let mut conversation = Conversation::new(17075);

    let mut bytes = message_with(PacketType::BulkPush, 0, &[]);
    bytes.extend(typed_block(&state_block(7)));
    bytes.extend(typed_block(&send_block(8)));
    bytes.push(BlockType::NotABlock.as_u8());

    let decoded = feed_ok(&mut conversation, CLIENT, &bytes);
    assert_eq!(
        messages(&decoded),
        vec![
            &Message::BulkPush,
            &Message::BulkPushData(StreamEntry::Block(BlockBody::Block(state_block(7)))),
            &Message::BulkPushData(StreamEntry::Block(BlockBody::Block(send_block(8)))),
            &Message::BulkPushData(StreamEntry::End),
        ]
    );
    assert_eq!(decoded[3].message.summary(), "Bulk Push Data [BULK PUSH END]");
    assert_eq!(
        conversation.state().pending_client_request,
        PacketType::NotAType
    );
}

#[test]
fn bulk_pull_account_entry_sizes_follow_request_flags() {
    for (flags, size) in [(0x00u8, 96usize), (0x01, 80), (0x02, 128), (0x09, 96)] {
        let mut conversation = Conversation::new(17075);
        feed_ok(
            &mut conversation,
            CLIENT,
            &build_bulk_pull_account([3u8; 32], [0u8; 16], flags),
        );

        let entry = vec![0x5Au8; size];
        let mut stream = entry.clone();
        stream.extend_from_slice(&entry);

        let decoded = feed_ok(&mut conversation, SERVER, &stream);
        assert_eq!(decoded.len(), 2, "flags {flags:#04x}");
        assert!(decoded.iter().all(|d| d.length == size), "flags {flags:#04x}");
        assert_eq!(conversation.buffered(SERVER), 0);
    }
}

#[test]
fn bulk_pull_account_zero_pending_hash_ends_stream() {
    let mut conversation = Conversation::new(17075);
    feed_ok(
        &mut conversation,
        CLIENT,
        &build_bulk_pull_account([3u8; 32], [0u8; 16], 0x00),
    );

    let mut end = vec![0x11u8; 48];
    end.extend_from_slice(&[0u8; 48]);

    let decoded = feed_ok(&mut conversation, SERVER, &end);
    let Message::BulkPullAccountResponse(entry) = &decoded[0].message else {
        panic!("expected bulk pull account response");
    };
    assert!(entry.is_end());
    assert_eq!(
        conversation.state().pending_client_request,
        PacketType::Invalid
    );
}

#[test]
fn node_id_handshake_body_sizes() {
    for (extensions, body) in [(0x0000u16, 0usize), (0x0001, 32), (0x0002, 96), (0x0003, 128)] {
        let state = SessionState::default();
        let bytes = message_with(PacketType::NodeIdHandshake, extensions, &vec![9u8; body]);

        assert!(matches!(
            frame_length(&state, &bytes),
            FrameLength::Complete(n) if n == 8 + body
        ));
    }
}

#[test]
fn confirm_messages_by_hash_sized_by_item_count() {
    let mut conversation = Conversation::new(17075);

    let req = message_with(PacketType::ConfirmReq, 0x2100, &[0x44u8; 128]);
    let ack = message_with(PacketType::ConfirmAck, 0x4100, &[0x55u8; 104 + 128]);
    let mut bytes = req.clone();
    bytes.extend_from_slice(&ack);

    let decoded = feed_ok(&mut conversation, CLIENT, &bytes);
    assert_eq!(decoded.len(), 2);
    assert_eq!(decoded[0].length, 8 + 128);
    assert_eq!(decoded[1].length, 8 + 232);

    assert!(matches!(
        &decoded[0].message,
        Message::ConfirmReq(ConfirmReq::ByHash(pairs)) if pairs.len() == 2
    ));
    assert!(matches!(
        &decoded[1].message,
        Message::ConfirmAck(ack) if matches!(&ack.payload, VotePayload::Hashes(h) if h.len() == 4)
    ));
    assert_eq!(decoded[1].message.summary(), "Confirm Ack (4 Blocks)");
}

#[test]
fn asc_pull_ack_blocks_across_segments() {
    let mut conversation = Conversation::new(17075);

    let mut body = vec![1u8];
    body.extend_from_slice(&5u64.to_be_bytes());
    body.extend(typed_block(&state_block(1)));
    body.extend(typed_block(&send_block(2)));
    body.push(1);
    let bytes = message_with(PacketType::AscPullAck, 0, &body);

    let (first, second) = bytes.split_at(100);
    assert!(feed_ok(&mut conversation, SERVER, first).is_empty());

    let decoded = feed_ok(&mut conversation, SERVER, second);
    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].length, bytes.len());

    let Message::AscPullAck(ack) = &decoded[0].message else {
        panic!("expected asc pull ack");
    };
    assert_eq!(ack.id, 5);
    assert_eq!(
        ack.payload,
        AscPullAckPayload::Blocks(vec![
            BlockBody::Block(state_block(1)),
            BlockBody::Block(send_block(2)),
        ])
    );
}

#[test]
fn publish_with_unknown_block_type_does_not_stall() {
    let mut conversation = Conversation::new(17075);

    let bytes = message_with(PacketType::Publish, 0x0a00, &[0xEEu8; 40]);
    let decoded = feed_ok(&mut conversation, CLIENT, &bytes);

    assert_eq!(decoded.len(), 1);
    assert_eq!(decoded[0].length, 48);
    assert_eq!(
        decoded[0].message,
        Message::Publish(BlockBody::Unrecognized(BlockType::Unknown(10)))
    );
    assert_eq!(conversation.buffered(CLIENT), 0);

    let decoded = feed_ok(&mut conversation, CLIENT, &build_keepalive(&[]));
    assert!(matches!(decoded[0].message, Message::Keepalive(_)));
}

fn sample_session() -> Vec<(Direction, Vec<u8>)> {
    let publish_body = encode_block(&state_block(4));

    vec![
        (CLIENT, build_keepalive(&["10.1.2.3:7075".parse().unwrap()])),
        (CLIENT, message_with(PacketType::Publish, 0x0600, &publish_body)),
        (CLIENT, message_with(PacketType::TelemetryReq, 0, &[])),
        (CLIENT, build_bulk_pull([2u8; 32], [0u8; 32], Some(2))),
        (SERVER, typed_block(&send_block(1))),
        (SERVER, typed_block(&state_block(2))),
        (SERVER, vec![0x01]),
        (SERVER, message_with(PacketType::ConfirmAck, 0x1100, &[6u8; 136])),
    ]
}

#[test]
fn one_byte_delivery_matches_whole_segments() {
    let mut whole = Conversation::new(17075);
    let mut expected = Vec::new();
    for (direction, bytes) in sample_session() {
        expected.extend(feed_ok(&mut whole, direction, &bytes));
    }
    assert_eq!(expected.len(), 8);

    let mut trickled = Conversation::new(17075);
    let mut actual = Vec::new();
    for (direction, bytes) in sample_session() {
        for byte in bytes {
            actual.extend(feed_ok(&mut trickled, direction, &[byte]));
        }
    }

    assert_eq!(actual, expected);
    assert_eq!(trickled.state(), whole.state());
}

fn fixed_size_message() -> impl Strategy<Value = (PacketType, u16, usize)> {
    prop_oneof![
        Just((PacketType::Keepalive, 0u16, 144usize)),
        Just((PacketType::FrontierReq, 0x0002, 40)),
        Just((PacketType::BulkPull, 0x0000, 64)),
        Just((PacketType::BulkPull, 0x0001, 72)),
        Just((PacketType::BulkPullAccount, 0, 49)),
        Just((PacketType::TelemetryAck, 0x00ca, 202)),
        Just((PacketType::Publish, 0x0400, 168)),
        (0u16..16).prop_map(|n| {
            let size = 104 + n as usize * 32;
            (PacketType::ConfirmAck, (n << 12) | 0x0100, size)
        }),
        (0u16..16).prop_map(|n| (PacketType::ConfirmReq, (n << 12) | 0x0100, n as usize * 64)),
        (0u16..4).prop_map(|flags| {
            let size = [0, 32, 96, 128][flags as usize];
            (PacketType::NodeIdHandshake, flags, size)
        }),
    ]
}

proptest! {
    #[test]
    fn frame_length_ignores_body_content(
        case in fixed_size_message(),
        content in prop::collection::vec(any::<u8>(), 0..512),
        trailing in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let (packet_type, extensions, size) = case;
        let mut body = content;
        body.resize(size, 0xAB);
        let mut bytes = message_with(packet_type, extensions, &body);
        bytes.extend_from_slice(&trailing);

        let state = SessionState::default();
        prop_assert!(matches!(
            frame_length(&state, &bytes),
            FrameLength::Complete(n) if n == 8 + size
        ));

        let mut conversation = Conversation::new(17075);
        let first = conversation.feed(CLIENT, &bytes[..8 + size]);
        prop_assert_eq!(first.len(), 1);
        prop_assert!(first[0].is_ok());
    }
}
