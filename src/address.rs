// Copyright 2023 litep2p developers
//
// Permission is hereby granted, free of charge, to any person obtaining a
// copy of this software and associated documentation files (the "Software"),
// to deal in the Software without restriction, including without limitation
// the rights to use, copy, modify, merge, publish, distribute, sublicense,
// and/or sell copies of the Software, and to permit persons to whom the
// Software is furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

//! Dial candidate address records and the default dial-order sorter.

use crate::PeerId;

use indexmap::IndexMap;
use multiaddr::{Multiaddr, Protocol};

use std::cmp::Ordering;

/// A candidate address for a dial attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRecord {
    /// The address itself.
    pub address: Multiaddr,

    /// Whether the address came from a signed peer record.
    pub certified: bool,
}

impl AddressRecord {
    /// Create a new, uncertified address record.
    pub fn new(address: Multiaddr) -> AddressRecord {
        AddressRecord {
            address,
            certified: false,
        }
    }

    /// Create a certified address record.
    pub fn certified(address: Multiaddr) -> AddressRecord {
        AddressRecord {
            address,
            certified: true,
        }
    }
}

/// Extract the peer ID embedded in `address`, if any.
pub fn peer_id_of(address: &Multiaddr) -> Option<PeerId> {
    address.iter().find_map(|protocol| match protocol {
        Protocol::P2p(multihash) => PeerId::from_multihash(multihash).ok(),
        _ => None,
    })
}

/// Whether `address` is routed through a circuit relay.
pub fn is_circuit(address: &Multiaddr) -> bool {
    address.iter().any(|protocol| std::matches!(protocol, Protocol::P2pCircuit))
}

/// Whether the terminal protocol of `address` is path-based.
///
/// Path-based addresses cannot be suffixed with a `/p2p` component.
fn ends_with_path(address: &Multiaddr) -> bool {
    std::matches!(address.iter().last(), Some(Protocol::Unix(_)))
}

/// Append `/p2p/<peer>` to `address` unless it is path-based or already
/// carries a peer ID.
pub fn append_peer_id(address: Multiaddr, peer: &PeerId) -> Multiaddr {
    if ends_with_path(&address) || peer_id_of(&address).is_some() {
        return address;
    }

    address.with(Protocol::P2p(peer.multihash()))
}

/// Deduplicate `records` by exact string form, preserving first-seen order.
///
/// `certified` is sticky: if any duplicate of an address was certified, the
/// surviving record is certified.
pub fn deduplicate(records: Vec<AddressRecord>) -> Vec<AddressRecord> {
    let mut deduplicated: IndexMap<String, AddressRecord> = IndexMap::with_capacity(records.len());

    for record in records {
        deduplicated
            .entry(record.address.to_string())
            .and_modify(|existing| existing.certified |= record.certified)
            .or_insert(record);
    }

    deduplicated.into_values().collect()
}

/// Rank of the outermost transport protocol, lower dials first.
fn transport_rank(address: &Multiaddr) -> usize {
    let mut rank = 3;

    for protocol in address.iter() {
        match protocol {
            Protocol::Wss(_) => return 0,
            Protocol::Ws(_) => rank = rank.min(1),
            Protocol::Tcp(_) => rank = rank.min(2),
            _ => {}
        }
    }

    rank
}

/// Default dial-order comparator.
///
/// Prefers certified addresses, then direct addresses over circuit relays,
/// then secure WebSocket over WebSocket over TCP over anything else. Used
/// with a stable sort so ties retain their calculated order.
pub fn default_address_sorter(lhs: &AddressRecord, rhs: &AddressRecord) -> Ordering {
    rhs.certified
        .cmp(&lhs.certified)
        .then_with(|| is_circuit(&lhs.address).cmp(&is_circuit(&rhs.address)))
        .then_with(|| transport_rank(&lhs.address).cmp(&transport_rank(&rhs.address)))
}
