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

//! Connection gating policy.

use crate::PeerId;

use multiaddr::Multiaddr;

/// Policy hooks that can veto outbound dial attempts.
///
/// Both hooks default to allowing everything so implementers override only
/// what they police. Gating by peer happens once per dial job, gating by
/// address once per candidate address after resolution.
#[mockall::automock]
pub trait ConnectionGater: Send + Sync {
    /// Whether dialing `peer` at all should be denied.
    fn deny_dial_peer(&self, peer: &PeerId) -> bool {
        let _ = peer;
        false
    }

    /// Whether dialing the candidate `address` should be denied.
    fn deny_dial_multiaddr(&self, address: &Multiaddr) -> bool {
        let _ = address;
        false
    }
}
