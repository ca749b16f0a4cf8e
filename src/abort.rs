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

//! Composite cancellation for a dial job.
//!
//! A running job must stop when any of three sources fires: the per-job dial
//! timeout, queue shutdown, or the job's own token (cancelled once every
//! waiter has abandoned the job). The sources are composed into a single
//! token handed down to address resolution and transport dials.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use std::time::Duration;

/// Composite cancellation source for one dial job.
///
/// The forwarding listener is detached by [`DialAbort::clear`] (or on drop)
/// so repeated dials do not accumulate background tasks.
#[derive(Debug)]
pub(crate) struct DialAbort {
    token: CancellationToken,
    forwarder: JoinHandle<()>,
}

impl DialAbort {
    /// Compose `timeout`, `shutdown` and `job` into a fresh token.
    ///
    /// The timeout starts now, which is when the job begins executing, not
    /// when it was submitted.
    pub fn new(timeout: Duration, shutdown: CancellationToken, job: CancellationToken) -> DialAbort {
        let token = CancellationToken::new();
        let composite = token.clone();

        let forwarder = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => {}
                _ = shutdown.cancelled() => {}
                _ = job.cancelled() => {}
            }

            composite.cancel();
        });

        DialAbort { token, forwarder }
    }

    /// The composed token.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Detach the forwarding listener.
    pub fn clear(&self) {
        self.forwarder.abort();
    }
}

impl Drop for DialAbort {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}
