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

//! Multihash-backed peer identity.

use crate::error::Error;

use multihash::Multihash;

use std::{fmt, str::FromStr};

/// Multihash code for the identity hash function.
const MULTIHASH_IDENTITY_CODE: u64 = 0x00;

/// Multihash code for sha2-256.
const MULTIHASH_SHA256_CODE: u64 = 0x12;

/// Maximum length of an inlined (identity-hashed) peer ID digest.
const MAX_INLINE_KEY_LENGTH: usize = 42;

/// Identity of a peer in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId {
    multihash: Multihash,
}

impl PeerId {
    /// Generate random peer ID.
    pub fn random() -> PeerId {
        let digest = rand::random::<[u8; 32]>();

        PeerId {
            multihash: Multihash::wrap(MULTIHASH_IDENTITY_CODE, &digest)
                .expect("digest size to fit multihash"),
        }
    }

    /// Try to convert `Multihash` into [`PeerId`].
    ///
    /// Succeeds only for multihash codes that can carry a peer identity,
    /// returning the original multihash otherwise.
    pub fn from_multihash(multihash: Multihash) -> Result<PeerId, Multihash> {
        match multihash.code() {
            MULTIHASH_SHA256_CODE => Ok(PeerId { multihash }),
            MULTIHASH_IDENTITY_CODE if multihash.digest().len() <= MAX_INLINE_KEY_LENGTH =>
                Ok(PeerId { multihash }),
            _ => Err(multihash),
        }
    }

    /// Try to parse [`PeerId`] from its canonical byte representation.
    pub fn from_bytes(data: &[u8]) -> crate::Result<PeerId> {
        let multihash = Multihash::from_bytes(data).map_err(|_| Error::InvalidData)?;

        PeerId::from_multihash(multihash).map_err(|_| Error::InvalidData)
    }

    /// Get canonical byte representation of [`PeerId`].
    pub fn to_bytes(&self) -> Vec<u8> {
        self.multihash.to_bytes()
    }

    /// Get the backing `Multihash`, e.g., for embedding the peer ID into a
    /// `/p2p` multiaddress component.
    pub fn multihash(&self) -> Multihash {
        self.multihash
    }
}

impl From<PeerId> for Multihash {
    fn from(peer: PeerId) -> Multihash {
        peer.multihash
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&bs58::encode(self.to_bytes()).into_string())
    }
}

impl FromStr for PeerId {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(string).into_vec().map_err(|_| Error::InvalidData)?;

        PeerId::from_bytes(&bytes)
    }
}
