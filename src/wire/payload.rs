use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use rand::Rng;

use crate::wire::constants::{
    EXT_CONFIRMED_PRESENT_FLAG, EXT_EXTENDED_PARAMS_FLAG, EXT_QUERY_FLAG, HEADER_LENGTH,
    KEEPALIVE_PEERS, MAGIC_LIVE, PROTOCOL_VERSION_MAX, PROTOCOL_VERSION_MIN,
    PROTOCOL_VERSION_USING,
};
use crate::wire::extensions::Extensions;
use crate::wire::message::{Header, PacketType};

/// A live-network header with this crate's protocol versions.
pub fn header_for(packet_type: PacketType, extensions: u16) -> Header {
    Header {
        magic: MAGIC_LIVE,
        version_max: PROTOCOL_VERSION_MAX,
        version_using: PROTOCOL_VERSION_USING,
        version_min: PROTOCOL_VERSION_MIN,
        packet_type,
        extensions: Extensions::new(extensions),
    }
}

/// Serializes a message header.
///
/// ```text
/// [magic:2][version_max:1][version_using:1][version_min:1][packet_type:1][extensions:2 LE]
/// ```
pub fn encode_header(header: &Header) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LENGTH);

    out.extend_from_slice(&header.magic);
    out.push(header.version_max);
    out.push(header.version_using);
    out.push(header.version_min);
    out.push(header.packet_type.as_u8());
    out.extend_from_slice(&header.extensions.raw().to_le_bytes());

    out
}

/// Builds a complete keepalive message.
///
/// At most eight peers are sent; missing slots are zero-filled. IPv4 peers
/// are written in their IPv4-mapped IPv6 form.
///
/// # Example
///
/// ```
/// use nano_network::wire::payload::build_keepalive;
///
/// let bytes = build_keepalive(&["127.0.0.1:7075".parse().unwrap()]);
/// assert_eq!(bytes.len(), 8 + 144);
/// ```
pub fn build_keepalive(peers: &[SocketAddr]) -> Vec<u8> {
    let mut out = encode_header(&header_for(PacketType::Keepalive, 0));

    for slot in 0..KEEPALIVE_PEERS {
        let (address, port) = match peers.get(slot) {
            Some(peer) => {
                let address = match peer.ip() {
                    IpAddr::V4(v4) => v4.to_ipv6_mapped(),
                    IpAddr::V6(v6) => v6,
                };
                (address, peer.port())
            }
            None => (Ipv6Addr::UNSPECIFIED, 0),
        };

        out.extend_from_slice(&address.octets());
        out.extend_from_slice(&port.to_le_bytes());
    }

    out
}

/// Builds a bulk pull request for the chain from `start` down to `end`.
///
/// With `count`, the extended parameters are appended and extensions bit 0
/// is set.
pub fn build_bulk_pull(start: [u8; 32], end: [u8; 32], count: Option<u32>) -> Vec<u8> {
    let extensions = if count.is_some() {
        EXT_EXTENDED_PARAMS_FLAG
    } else {
        0
    };

    let mut out = encode_header(&header_for(PacketType::BulkPull, extensions));
    out.extend_from_slice(&start);
    out.extend_from_slice(&end);

    if let Some(count) = count {
        out.push(0);
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&[0u8; 3]);
    }

    out
}

/// Builds a frontier request starting at account `start`.
///
/// `age` and `count` of `u32::MAX` mean "no limit".
pub fn build_frontier_req(start: [u8; 32], age: u32, count: u32, confirmed_only: bool) -> Vec<u8> {
    let extensions = if confirmed_only {
        EXT_CONFIRMED_PRESENT_FLAG
    } else {
        0
    };

    let mut out = encode_header(&header_for(PacketType::FrontierReq, extensions));
    out.extend_from_slice(&start);
    out.extend_from_slice(&age.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());

    out
}

pub fn build_bulk_pull_account(account: [u8; 32], minimum_amount: [u8; 16], flags: u8) -> Vec<u8> {
    let mut out = encode_header(&header_for(PacketType::BulkPullAccount, 0));
    out.extend_from_slice(&account);
    out.extend_from_slice(&minimum_amount);
    out.push(flags);
    out
}

/// Builds a node ID handshake query with a random cookie.
///
/// Returns the cookie alongside the message so the response signature can
/// be matched against it.
pub fn build_node_id_query() -> ([u8; 32], Vec<u8>) {
    let cookie: [u8; 32] = rand::thread_rng().r#gen();

    let mut out = encode_header(&header_for(PacketType::NodeIdHandshake, EXT_QUERY_FLAG));
    out.extend_from_slice(&cookie);

    (cookie, out)
}
