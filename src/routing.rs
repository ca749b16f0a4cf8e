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

//! Peer routing contract.

use crate::PeerId;

use multiaddr::Multiaddr;
use tokio_util::sync::CancellationToken;

/// Addresses discovered for a peer through routing.
#[derive(Debug, Clone)]
pub struct PeerInfo {
    /// Identity of the peer.
    pub peer: PeerId,

    /// Addresses the peer is reachable at.
    pub addresses: Vec<Multiaddr>,
}

/// Interface the dial queue requires from the peer routing subsystem.
///
/// Used as a fallback when neither the caller nor the peer store knows any
/// address for the target peer.
#[mockall::automock]
#[async_trait::async_trait]
pub trait PeerRouting: Send + Sync {
    /// Look up addresses of `peer`.
    ///
    /// Returns [`crate::Error::NoPeerRouters`] when no routing backend is
    /// configured.
    async fn find_peer(&self, peer: &PeerId, token: CancellationToken) -> crate::Result<PeerInfo>;
}
