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

//! Error types.
//!
//! A dial job has many waiters, each of which observes the same outcome, so
//! the error type is `Clone`. I/O failures are carried as [`ErrorKind`] for
//! the same reason.

use crate::PeerId;

use multiaddr::Multiaddr;
use multihash::Multihash;

use std::io::ErrorKind;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("Peer `{0}` does not exist")]
    PeerDoesntExist(PeerId),
    #[error("Tried to dial self")]
    TriedToDialSelf,
    #[error("Dial queue is full")]
    DialQueueFull,
    #[error("Peer had more than `{0}` addresses to dial")]
    TooManyDialAddresses(usize),
    #[error("Connection gater denied the dial request: {0}")]
    DialDenied(&'static str),
    #[error("No valid addresses for dial request")]
    NoValidAddresses,
    #[error("No peer routers configured")]
    NoPeerRouters,
    #[error("Mixed peer IDs in dial request: `{0}` and `{1}`")]
    PeerIdMismatch(PeerId, PeerId),
    #[error("Transport not supported for `{0}`")]
    TransportNotSupported(Multiaddr),
    #[error("Address error: `{0}`")]
    AddressError(#[from] AddressError),
    #[error("DNS address resolution failed")]
    DnsAddressResolutionFailed,
    #[error("Operation timed out")]
    Timeout,
    #[error("Dial aborted")]
    Aborted,
    #[error("All multiaddr dials failed")]
    AllDialsFailed(Vec<Error>),
    #[error("I/O error: `{0}`")]
    IoError(ErrorKind),
    #[error("Essential task closed")]
    EssentialTaskClosed,
    #[error("Invalid data")]
    InvalidData,
    #[error("Other error occurred: `{0}`")]
    Other(String),
}

/// Error type for address handling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AddressError {
    /// The provided address does not correspond to a supported protocol stack.
    #[error("Invalid address for protocol")]
    InvalidProtocol,
    /// The provided address does not include a peer ID.
    #[error("`PeerId` missing from the address")]
    PeerIdMissing,
    /// The provided address contains an invalid multihash.
    #[error("Multihash does not contain a valid peer ID: `{0:?}`")]
    InvalidPeerId(Multihash),
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Error {
        Error::IoError(error.kind())
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Error {
        Error::EssentialTaskClosed
    }
}

impl Error {
    /// Whether the error stems from cancellation rather than a genuine dial
    /// failure. Such errors are filtered from job failure reporting.
    pub fn is_aborted(&self) -> bool {
        std::matches!(self, Error::Aborted)
    }
}
