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

//! Address resolution.
//!
//! Resolvers are registered per protocol name and passed to the dial queue
//! in its configuration; there is no process-wide registry. Resolution is
//! recursive since a resolved address may itself be resolvable (`dnsaddr`
//! records routinely point at further `dnsaddr` records).

use crate::{address::peer_id_of, error::Error};

use futures::future::BoxFuture;
use multiaddr::{Multiaddr, Protocol};
use tokio_util::sync::CancellationToken;
use trust_dns_resolver::{
    config::{ResolverConfig, ResolverOpts},
    TokioAsyncResolver,
};

use std::{collections::HashMap, sync::Arc};

/// Logging target for the file.
const LOG_TARGET: &str = "litedial::resolver";

/// Maximum recursion depth when a resolved address is itself resolvable.
const MAX_RECURSIVE_DEPTH: usize = 32;

/// Map from protocol name to the resolver handling it.
pub type ResolverRegistry = HashMap<String, Arc<dyn Resolver>>;

/// Protocol-specific address resolver.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve `address` into zero or more dialable addresses.
    ///
    /// Returning the input address unchanged as the only element marks the
    /// address as final and stops recursion.
    async fn resolve(
        &self,
        address: &Multiaddr,
        token: CancellationToken,
    ) -> crate::Result<Vec<Multiaddr>>;
}

/// Name under which a resolver for `protocol` is looked up, for the protocols
/// that can carry resolvable names.
fn protocol_name(protocol: &Protocol<'_>) -> Option<&'static str> {
    match protocol {
        Protocol::Dnsaddr(_) => Some("dnsaddr"),
        Protocol::Dns(_) => Some("dns"),
        Protocol::Dns4(_) => Some("dns4"),
        Protocol::Dns6(_) => Some("dns6"),
        _ => None,
    }
}

/// Find the first registered resolver matching a protocol of `address`.
fn matching_resolver(address: &Multiaddr, resolvers: &ResolverRegistry) -> Option<Arc<dyn Resolver>> {
    address
        .iter()
        .find_map(|protocol| protocol_name(&protocol).and_then(|name| resolvers.get(name)))
        .cloned()
}

/// Resolve `address` through the registered resolvers, recursively.
pub(crate) async fn resolve_multiaddrs(
    address: &Multiaddr,
    resolvers: &ResolverRegistry,
    token: &CancellationToken,
) -> crate::Result<Vec<Multiaddr>> {
    resolve_recursive(address.clone(), resolvers, token.clone(), MAX_RECURSIVE_DEPTH).await
}

fn resolve_recursive(
    address: Multiaddr,
    resolvers: &ResolverRegistry,
    token: CancellationToken,
    depth: usize,
) -> BoxFuture<'_, crate::Result<Vec<Multiaddr>>> {
    Box::pin(async move {
        let Some(resolver) = matching_resolver(&address, resolvers) else {
            return Ok(vec![address]);
        };

        if depth == 0 {
            tracing::debug!(target: LOG_TARGET, ?address, "maximum resolution depth reached");
            return Err(Error::DnsAddressResolutionFailed);
        }

        let resolved = resolver.resolve(&address, token.clone()).await?;

        if resolved.len() == 1 && resolved[0] == address {
            return Ok(resolved);
        }

        let mut output = Vec::with_capacity(resolved.len());
        for resolved_address in resolved {
            output.extend(
                resolve_recursive(resolved_address, resolvers, token.clone(), depth - 1).await?,
            );
        }

        Ok(output)
    })
}

/// Resolver for `dnsaddr` addresses.
///
/// Queries the `_dnsaddr.<host>` TXT records and returns the multiaddresses
/// found in `dnsaddr=` entries. When the input address names a peer, only
/// records for that peer are kept since a single hostname commonly serves
/// records for a whole fleet of bootstrap nodes.
#[derive(Debug, Default)]
pub struct DnsAddrResolver {}

impl DnsAddrResolver {
    /// Parse one TXT record value into a multiaddress.
    fn parse_txt_record(value: &str) -> Option<Multiaddr> {
        value.strip_prefix("dnsaddr=")?.parse().ok()
    }
}

#[async_trait::async_trait]
impl Resolver for DnsAddrResolver {
    async fn resolve(
        &self,
        address: &Multiaddr,
        token: CancellationToken,
    ) -> crate::Result<Vec<Multiaddr>> {
        let Some(host) = address.iter().find_map(|protocol| match protocol {
            Protocol::Dnsaddr(host) => Some(host.to_string()),
            _ => None,
        }) else {
            return Ok(vec![address.clone()]);
        };

        let target_peer = peer_id_of(address);
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

        let lookup = tokio::select! {
            _ = token.cancelled() => return Err(Error::Aborted),
            lookup = resolver.txt_lookup(format!("_dnsaddr.{host}")) => lookup.map_err(|error| {
                tracing::debug!(target: LOG_TARGET, %host, ?error, "TXT lookup failed");
                Error::DnsAddressResolutionFailed
            })?,
        };

        let addresses: Vec<Multiaddr> = lookup
            .iter()
            .filter_map(|record| Self::parse_txt_record(&record.to_string()))
            .filter(|resolved| match (target_peer, peer_id_of(resolved)) {
                (Some(target), Some(found)) => target == found,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();

        tracing::trace!(
            target: LOG_TARGET,
            %host,
            count = addresses.len(),
            "dnsaddr records resolved",
        );

        Ok(addresses)
    }
}
