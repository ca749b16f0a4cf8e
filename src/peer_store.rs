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

//! Peer store contract and dial-feedback metadata keys.
//!
//! The dial queue reads known addresses of a peer before dialing and writes
//! per-attempt feedback after, so future dial decisions can take past
//! outcomes into account.

use crate::{address::AddressRecord, PeerId};

use multiaddr::Multiaddr;

use std::collections::HashMap;

/// Metadata key recording the timestamp of the most recent successful dial.
pub const LAST_DIAL_SUCCESS_KEY: &str = "last-dial-success";

/// Metadata key recording the timestamp of the most recent failed dial.
pub const LAST_DIAL_FAILURE_KEY: &str = "last-dial-failure";

/// Stored view of a peer.
#[derive(Debug, Clone, Default)]
pub struct PeerRecord {
    /// Known addresses of the peer.
    pub addresses: Vec<AddressRecord>,

    /// Arbitrary metadata attached to the peer.
    ///
    /// Timestamps under [`LAST_DIAL_SUCCESS_KEY`]/[`LAST_DIAL_FAILURE_KEY`]
    /// are UTF-8 decimal milliseconds since the epoch, readable without a
    /// schema.
    pub metadata: HashMap<String, Vec<u8>>,
}

/// Partial peer update merged into an existing record.
#[derive(Debug, Clone, Default)]
pub struct PeerUpdate {
    /// Addresses to add to the peer's known set.
    pub addresses: Vec<Multiaddr>,

    /// Metadata entries to insert or overwrite.
    pub metadata: HashMap<String, Vec<u8>>,
}

/// Interface the dial queue requires from the peer store.
#[mockall::automock]
#[async_trait::async_trait]
pub trait PeerStore: Send + Sync {
    /// Load the record of `peer`.
    ///
    /// Returns [`crate::Error::PeerDoesntExist`] for unknown peers.
    async fn get(&self, peer: &PeerId) -> crate::Result<PeerRecord>;

    /// Merge `update` into the record of `peer`, creating it if missing.
    async fn merge(&self, peer: &PeerId, update: PeerUpdate) -> crate::Result<()>;
}
