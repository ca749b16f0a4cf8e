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

//! Connection establishment scheduler for peer-to-peer networks.
//!
//! `litedial` owns the outbound half of connection management: callers hand
//! it a peer ID and/or a set of multiaddresses and receive at most one open,
//! upgraded connection back. The queue coordinates address discovery,
//! resolution and ordering, bounds dial parallelism, coalesces overlapping
//! requests onto one in-flight job, and composes user cancellation, per-dial
//! timeouts and shutdown into a single signal.
//!
//! Transports, the peer store, peer routing and connection gating are
//! borrowed through the trait seams in [`transport`], [`peer_store`],
//! [`routing`] and [`gater`].

mod abort;

pub mod address;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod gater;
pub mod peer_id;
pub mod peer_store;
pub mod queue;
pub mod resolver;
pub mod routing;
pub mod transport;
pub mod types;

pub use address::AddressRecord;
pub use config::Config;
pub use connection::{Connection, ConnectionMap, ConnectionStatus};
pub use error::Error;
pub use peer_id::PeerId;
pub use queue::{Components, DialOptions, DialProgress, DialQueue, DialTarget};

/// Public result type.
pub type Result<T> = std::result::Result<T, Error>;
