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

//! Transport manager contract.
//!
//! The dial queue decides *what* to dial and in which order; the transport
//! manager owns the installed transports and performs the actual connection
//! establishment and upgrade.

use crate::connection::Connection;

use multiaddr::Multiaddr;
use tokio_util::sync::CancellationToken;

/// Interface the dial queue requires from the transport subsystem.
#[mockall::automock]
#[async_trait::async_trait]
pub trait TransportManager: Send + Sync {
    /// Dial `address` and upgrade the resulting stream into a [`Connection`].
    ///
    /// Implementations must stop work promptly when `token` is cancelled.
    async fn dial(
        &self,
        address: &Multiaddr,
        token: CancellationToken,
    ) -> crate::Result<Connection>;

    /// Whether any installed transport can dial `address`.
    fn supports_dial(&self, address: &Multiaddr) -> bool;
}
