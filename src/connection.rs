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

//! Handle to an upgraded transport connection.
//!
//! The dial queue produces and deduplicates these handles but does not own
//! the connection lifecycle. The component that does shares the handles with
//! the queue through a [`ConnectionMap`].

use crate::{address::is_circuit, types::ConnectionId, PeerId};

use multiaddr::Multiaddr;
use parking_lot::RwLock;

use std::{collections::HashMap, sync::Arc};

/// Map from peer ID to that peer's currently known connections.
///
/// Owned by the connection lifecycle component, read by the dial queue.
pub type ConnectionMap = Arc<RwLock<HashMap<PeerId, Vec<Connection>>>>;

/// Connection state.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Connection is open and usable.
    Open,

    /// Connection is being shut down.
    Closing,

    /// Connection is closed.
    Closed,
}

#[derive(Debug)]
struct ConnectionInner {
    id: ConnectionId,
    remote_peer: PeerId,
    remote_addr: Multiaddr,
    status: RwLock<ConnectionStatus>,
}

/// Handle to an open, upgraded connection.
///
/// Cheap to clone; all clones observe the same status.
#[derive(Debug, Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Create a new open connection handle.
    pub fn new(id: ConnectionId, remote_peer: PeerId, remote_addr: Multiaddr) -> Connection {
        Connection {
            inner: Arc::new(ConnectionInner {
                id,
                remote_peer,
                remote_addr,
                status: RwLock::new(ConnectionStatus::Open),
            }),
        }
    }

    /// Connection ID.
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Identity of the remote peer.
    pub fn remote_peer(&self) -> PeerId {
        self.inner.remote_peer
    }

    /// Address the connection was established over.
    pub fn remote_addr(&self) -> &Multiaddr {
        &self.inner.remote_addr
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.read()
    }

    /// Update connection status. Called by the connection lifecycle owner.
    pub fn set_status(&self, status: ConnectionStatus) {
        *self.inner.status.write() = status;
    }

    /// Whether the connection runs over a circuit relay and is therefore
    /// limited in what it can carry.
    pub fn is_limited(&self) -> bool {
        is_circuit(&self.inner.remote_addr)
    }

    /// Whether `self` and `other` are handles to the same connection.
    pub fn ptr_eq(&self, other: &Connection) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
