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

//! Dial queue configuration.

use crate::{
    address::AddressRecord,
    resolver::{DnsAddrResolver, Resolver, ResolverRegistry},
};

use std::{cmp::Ordering, sync::Arc, time::Duration};

/// Default number of dial jobs allowed to run concurrently.
pub const MAX_PARALLEL_DIALS: usize = 100;

/// Default bound on the number of dial jobs queued or running at once.
pub const MAX_DIAL_QUEUE_LENGTH: usize = 500;

/// Default cap on the number of addresses attempted within one dial job.
pub const MAX_PEER_ADDRS_TO_DIAL: usize = 25;

/// Default per-job dial timeout, measured from when the job starts running.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default priority of a dial job. Higher priorities run first.
pub const DIAL_PRIORITY: u8 = 50;

/// Comparator deciding the order in which candidate addresses are dialed.
pub type AddressSorter =
    Arc<dyn Fn(&AddressRecord, &AddressRecord) -> Ordering + Send + Sync>;

/// Dial queue configuration.
pub struct Config {
    /// Maximum number of dial jobs running concurrently.
    pub max_parallel_dials: usize,

    /// Maximum number of dial jobs queued or running at once. Submissions
    /// past the bound fail immediately.
    pub max_dial_queue_length: usize,

    /// Maximum number of addresses attempted within one dial job.
    pub max_peer_addrs_to_dial: usize,

    /// Per-job dial timeout.
    pub dial_timeout: Duration,

    /// Custom address sorter, `None` for the default dial-order sorter.
    pub address_sorter: Option<AddressSorter>,

    /// Resolvers keyed by protocol name.
    pub resolvers: ResolverRegistry,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_parallel_dials: MAX_PARALLEL_DIALS,
            max_dial_queue_length: MAX_DIAL_QUEUE_LENGTH,
            max_peer_addrs_to_dial: MAX_PEER_ADDRS_TO_DIAL,
            dial_timeout: DIAL_TIMEOUT,
            address_sorter: None,
            resolvers: ResolverRegistry::from([(
                "dnsaddr".to_string(),
                Arc::new(DnsAddrResolver::default()) as Arc<dyn Resolver>,
            )]),
        }
    }
}
