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

//! Dial queue.
//!
//! Entry point for establishing outbound connections. Given a peer and/or a
//! set of addresses, the queue produces at most one open, upgraded
//! [`Connection`], coordinating address discovery, resolution, gating,
//! concurrency limits, deduplication of in-flight attempts and cancellation.

use crate::{
    abort::DialAbort,
    address::{
        append_peer_id, deduplicate, default_address_sorter, is_circuit, peer_id_of, AddressRecord,
    },
    config::Config,
    connection::{Connection, ConnectionMap, ConnectionStatus},
    error::Error,
    executor::{DefaultExecutor, Executor},
    gater::ConnectionGater,
    peer_store::{PeerStore, PeerUpdate, LAST_DIAL_FAILURE_KEY, LAST_DIAL_SUCCESS_KEY},
    resolver::{resolve_multiaddrs, ResolverRegistry},
    routing::PeerRouting,
    transport::TransportManager,
    PeerId,
};

use multiaddr::Multiaddr;
use tokio_util::sync::CancellationToken;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

pub(crate) mod scheduler;

use scheduler::{JobRunner, JobSnapshot, Scheduler};

/// Logging target for the file.
const LOG_TARGET: &str = "litedial::queue";

/// Progress milestones of a dial request, delivered best-effort to the
/// caller's progress callback.
#[derive(Debug, Clone)]
pub enum DialProgress {
    /// An open connection to the target already existed.
    AlreadyConnected,

    /// The request joined a dial job that was already in flight.
    AlreadyInDialQueue,

    /// The request was queued as a new dial job.
    AddToDialQueue,

    /// The dial job started executing.
    StartDial,

    /// Candidate addresses were calculated, in dial order.
    CalculatedAddresses(Vec<AddressRecord>),
}

/// Progress callback.
pub type ProgressFn = Arc<dyn Fn(DialProgress) + Send + Sync>;

/// Target of a dial request.
#[derive(Debug, Clone)]
pub enum DialTarget {
    /// Dial a peer, discovering its addresses from the peer store or peer
    /// routing.
    Peer(PeerId),

    /// Dial the given addresses. If any of them embed a peer ID, they must
    /// all embed the same one.
    Addresses(Vec<Multiaddr>),
}

impl From<PeerId> for DialTarget {
    fn from(peer: PeerId) -> DialTarget {
        DialTarget::Peer(peer)
    }
}

impl From<Multiaddr> for DialTarget {
    fn from(address: Multiaddr) -> DialTarget {
        DialTarget::Addresses(vec![address])
    }
}

impl From<Vec<Multiaddr>> for DialTarget {
    fn from(addresses: Vec<Multiaddr>) -> DialTarget {
        DialTarget::Addresses(addresses)
    }
}

/// Per-call dial options.
#[derive(Clone)]
pub struct DialOptions {
    /// Dial even when an open connection to the target already exists.
    pub force: bool,

    /// Job priority, higher runs first.
    pub priority: u8,

    /// Caller-owned cancellation token. Aborting it detaches only this
    /// caller; the job keeps running for any other waiters.
    pub token: Option<CancellationToken>,

    /// Progress callback.
    pub on_progress: Option<ProgressFn>,

    /// Whether a connection over a circuit relay satisfies
    /// [`DialQueue::is_dialable`].
    pub run_on_limited_connection: bool,
}

impl Default for DialOptions {
    fn default() -> DialOptions {
        DialOptions {
            force: false,
            priority: crate::config::DIAL_PRIORITY,
            token: None,
            on_progress: None,
            run_on_limited_connection: true,
        }
    }
}

/// External collaborators the dial queue borrows.
pub struct Components {
    /// Transport subsystem performing the actual dials.
    pub transport_manager: Arc<dyn TransportManager>,

    /// Persistent peer knowledge, read for addresses and written with dial
    /// feedback.
    pub peer_store: Arc<dyn PeerStore>,

    /// Address discovery fallback.
    pub peer_routing: Option<Arc<dyn PeerRouting>>,

    /// Dial policy hooks.
    pub connection_gater: Option<Arc<dyn ConnectionGater>>,

    /// Currently known connections, owned by the connection lifecycle
    /// component.
    pub connections: ConnectionMap,
}

struct DialQueueInner {
    local_peer_id: PeerId,
    components: Components,
    max_peer_addrs_to_dial: usize,
    dial_timeout: Duration,
    address_sorter: Option<crate::config::AddressSorter>,
    resolvers: ResolverRegistry,
}

/// Connection establishment scheduler.
pub struct DialQueue {
    inner: Arc<DialQueueInner>,
    scheduler: Scheduler,
}

impl DialQueue {
    /// Create a new [`DialQueue`], spawning its scheduler on the default
    /// executor.
    pub fn new(local_peer_id: PeerId, components: Components, config: Config) -> DialQueue {
        DialQueue::with_executor(local_peer_id, components, config, &DefaultExecutor)
    }

    /// Create a new [`DialQueue`], spawning its scheduler on `executor`.
    pub fn with_executor(
        local_peer_id: PeerId,
        components: Components,
        config: Config,
        executor: &dyn Executor,
    ) -> DialQueue {
        let scheduler = Scheduler::new(config.max_parallel_dials, config.max_dial_queue_length);
        let inner = Arc::new(DialQueueInner {
            local_peer_id,
            components,
            max_peer_addrs_to_dial: config.max_peer_addrs_to_dial,
            dial_timeout: config.dial_timeout,
            address_sorter: config.address_sorter,
            resolvers: config.resolvers,
        });

        let runner: JobRunner = {
            let inner = inner.clone();
            Arc::new(move |snapshot: JobSnapshot| {
                let inner = inner.clone();
                Box::pin(async move { inner.execute(snapshot).await })
            })
        };
        executor.run_with_name("dial-queue", Box::pin(scheduler.clone().run(runner)));

        DialQueue { inner, scheduler }
    }

    /// Dial `target`, returning an open, upgraded connection.
    ///
    /// Returns the existing connection if one is already open (unless
    /// `force` is set), joins an overlapping in-flight dial job if there is
    /// one, and otherwise queues a new job.
    pub async fn dial(
        &self,
        target: impl Into<DialTarget>,
        options: DialOptions,
    ) -> crate::Result<Connection> {
        let (peer, addresses) = resolve_target(target.into())?;

        tracing::debug!(target: LOG_TARGET, ?peer, ?addresses, "dial requested");

        if !options.force {
            if let Some(connection) = self.find_existing(peer, &addresses) {
                emit(&options.on_progress, DialProgress::AlreadyConnected);
                return Ok(connection);
            }
        }

        let outcome = self.scheduler.submit(
            peer,
            addresses.into_iter().collect(),
            options.priority,
            options.on_progress.clone(),
        )?;
        emit(
            &options.on_progress,
            if outcome.joined {
                DialProgress::AlreadyInDialQueue
            } else {
                DialProgress::AddToDialQueue
            },
        );

        match options.token {
            Some(user) => {
                let mut rx = outcome.rx;

                tokio::select! {
                    result = &mut rx => result?,
                    _ = user.cancelled() => {
                        self.scheduler.abandon(outcome.job, outcome.waiter);
                        Err(Error::Aborted)
                    }
                }
            }
            None => outcome.rx.await?,
        }
    }

    /// Whether `addresses` would survive address calculation and could be
    /// dialed. Side-effect free; never touches the peer store or routing.
    ///
    /// With `run_on_limited_connection` unset, at least one address must not
    /// be routed through a circuit relay.
    pub async fn is_dialable(&self, addresses: Vec<Multiaddr>, options: DialOptions) -> bool {
        let token = CancellationToken::new();

        match self.inner.calculate_multiaddrs(None, addresses, &token).await {
            Ok(records) => {
                options.run_on_limited_connection
                    || records.iter().any(|record| !is_circuit(&record.address))
            }
            Err(error) => {
                tracing::trace!(target: LOG_TARGET, ?error, "address is not dialable");
                false
            }
        }
    }

    /// Number of dial jobs currently queued or running.
    pub fn len(&self) -> usize {
        self.scheduler.len()
    }

    /// Whether the queue has no live dial jobs.
    pub fn is_empty(&self) -> bool {
        self.scheduler.len() == 0
    }

    /// Stop the queue: abort running jobs, fail pending jobs and reject new
    /// submissions until [`DialQueue::start`] is called.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    /// Restart a stopped queue with a fresh shutdown token.
    pub fn start(&self) {
        self.scheduler.start();
    }

    fn find_existing(&self, peer: Option<PeerId>, addresses: &[Multiaddr]) -> Option<Connection> {
        let connections = self.inner.components.connections.read();

        if let Some(peer) = peer {
            if let Some(existing) = connections
                .get(&peer)
                .and_then(|list| list.iter().find(|c| c.status() == ConnectionStatus::Open))
            {
                return Some(existing.clone());
            }
        }

        if !addresses.is_empty() {
            for list in connections.values() {
                for connection in list {
                    if connection.status() == ConnectionStatus::Open
                        && addresses.iter().any(|address| address == connection.remote_addr())
                    {
                        return Some(connection.clone());
                    }
                }
            }
        }

        None
    }
}

impl Drop for DialQueue {
    fn drop(&mut self) {
        self.scheduler.close();
    }
}

impl DialQueueInner {
    /// Execute one dial job under a composite cancellation token.
    async fn execute(&self, snapshot: JobSnapshot) -> crate::Result<Connection> {
        let abort = DialAbort::new(
            self.dial_timeout,
            snapshot.shutdown.clone(),
            snapshot.job_token.clone(),
        );
        let token = abort.token();

        let result = self.run_job(&snapshot, &token).await;
        abort.clear();

        result
    }

    async fn run_job(
        &self,
        snapshot: &JobSnapshot,
        token: &CancellationToken,
    ) -> crate::Result<Connection> {
        emit(&snapshot.progress, DialProgress::StartDial);

        let records = self
            .calculate_multiaddrs(snapshot.peer, snapshot.addresses.clone(), token)
            .await?;

        tracing::trace!(
            target: LOG_TARGET,
            peer = ?snapshot.peer,
            count = records.len(),
            "candidate addresses calculated",
        );
        emit(&snapshot.progress, DialProgress::CalculatedAddresses(records.clone()));

        self.dial_addresses(snapshot.peer, records, token).await
    }

    /// Produce the ordered list of candidate addresses for a dial job.
    async fn calculate_multiaddrs(
        &self,
        peer: Option<PeerId>,
        addresses: Vec<Multiaddr>,
        token: &CancellationToken,
    ) -> crate::Result<Vec<AddressRecord>> {
        let mut records: Vec<AddressRecord> =
            addresses.into_iter().map(AddressRecord::new).collect();

        if let Some(peer) = peer {
            if peer == self.local_peer_id {
                return Err(Error::TriedToDialSelf);
            }

            if let Some(gater) = &self.components.connection_gater {
                if gater.deny_dial_peer(&peer) {
                    return Err(Error::DialDenied("refused to dial peer"));
                }
            }

            // Discovery runs only when the caller supplied no addresses:
            // first the peer store, then peer routing as a fallback. Lookup
            // failures must not mask the dial outcome.
            if records.is_empty() {
                match self.components.peer_store.get(&peer).await {
                    Ok(record) => records.extend(record.addresses),
                    Err(Error::PeerDoesntExist(_)) => {}
                    Err(error) => tracing::debug!(
                        target: LOG_TARGET,
                        %peer,
                        ?error,
                        "failed to load peer record",
                    ),
                }
            }

            if records.is_empty() {
                if let Some(routing) = &self.components.peer_routing {
                    match routing.find_peer(&peer, token.clone()).await {
                        Ok(info) =>
                            records.extend(info.addresses.into_iter().map(AddressRecord::new)),
                        Err(Error::NoPeerRouters) => {}
                        Err(error) => tracing::warn!(
                            target: LOG_TARGET,
                            %peer,
                            ?error,
                            "peer routing lookup failed",
                        ),
                    }
                }
            }
        }

        // Resolution. An address resolving to exactly itself keeps its
        // record, preserving the certification flag; anything else enters
        // uncertified.
        let mut resolved_records = Vec::with_capacity(records.len());
        for record in records {
            let resolved = resolve_multiaddrs(&record.address, &self.resolvers, token).await?;

            if resolved.len() == 1 && resolved[0] == record.address {
                resolved_records.push(record);
            } else {
                resolved_records.extend(resolved.into_iter().map(AddressRecord::new));
            }
        }
        let mut records = resolved_records;

        if let Some(peer) = peer {
            for record in &mut records {
                record.address = append_peer_id(record.address.clone(), &peer);
            }
        }

        records.retain(|record| {
            let supported = self.components.transport_manager.supports_dial(&record.address);
            if !supported {
                tracing::trace!(
                    target: LOG_TARGET,
                    address = %record.address,
                    "no transport for address",
                );
            }

            supported
        });

        // Resolving a shared bootstrap hostname can surface addresses of
        // other peers; drop any record naming somebody else.
        if let Some(peer) = peer {
            records.retain(|record| match peer_id_of(&record.address) {
                Some(found) => found == peer,
                None => true,
            });
        }

        let mut records = deduplicate(records);

        if records.is_empty() {
            return Err(Error::NoValidAddresses);
        }

        if let Some(gater) = &self.components.connection_gater {
            records.retain(|record| !gater.deny_dial_multiaddr(&record.address));
        }

        if records.is_empty() {
            return Err(Error::DialDenied("refused to dial all resolved addresses"));
        }

        match &self.address_sorter {
            Some(sorter) => records.sort_by(|lhs, rhs| sorter(lhs, rhs)),
            None => records.sort_by(default_address_sorter),
        }

        Ok(records)
    }

    /// Walk the sorted candidate addresses serially; the first successful
    /// upgrade wins and the remaining candidates are never attempted.
    async fn dial_addresses(
        &self,
        peer: Option<PeerId>,
        records: Vec<AddressRecord>,
        token: &CancellationToken,
    ) -> crate::Result<Connection> {
        let mut errors = Vec::new();
        let mut dialed = 0usize;

        for record in records {
            if dialed == self.max_peer_addrs_to_dial {
                return Err(Error::TooManyDialAddresses(self.max_peer_addrs_to_dial));
            }
            dialed += 1;

            tracing::trace!(target: LOG_TARGET, address = %record.address, "dialing address");

            // The dial branch is polled first so a transport honoring the
            // token reports its own abort before the fallback fires for
            // transports that ignore it.
            let attempt = tokio::select! {
                biased;
                result = self.components.transport_manager.dial(&record.address, token.clone()) => result,
                _ = token.cancelled() => Err(Error::Timeout),
            };

            match attempt {
                Ok(connection) => {
                    self.record_outcome(
                        connection.remote_peer(),
                        PeerUpdate {
                            addresses: vec![connection.remote_addr().clone()],
                            metadata: HashMap::from([(
                                LAST_DIAL_SUCCESS_KEY.to_string(),
                                now_millis_bytes(),
                            )]),
                        },
                    )
                    .await;

                    return Ok(connection);
                }
                Err(error) => {
                    if let Some(peer) = peer {
                        self.record_outcome(
                            peer,
                            PeerUpdate {
                                addresses: Vec::new(),
                                metadata: HashMap::from([(
                                    LAST_DIAL_FAILURE_KEY.to_string(),
                                    now_millis_bytes(),
                                )]),
                            },
                        )
                        .await;
                    }

                    if token.is_cancelled() {
                        return Err(Error::Timeout);
                    }

                    tracing::debug!(
                        target: LOG_TARGET,
                        address = %record.address,
                        ?error,
                        "failed to dial address",
                    );
                    errors.push(error);
                }
            }
        }

        match errors.len() {
            1 => Err(errors.into_iter().next().expect("error to exist")),
            _ => Err(Error::AllDialsFailed(errors)),
        }
    }

    /// Record dial feedback in the peer store. Failures are logged and
    /// swallowed; they must not mask the dial outcome.
    async fn record_outcome(&self, peer: PeerId, update: PeerUpdate) {
        if let Err(error) = self.components.peer_store.merge(&peer, update).await {
            tracing::debug!(target: LOG_TARGET, %peer, ?error, "failed to update peer store");
        }
    }
}

/// Split a dial target into the target peer and the seed address set.
///
/// Addresses embedding conflicting peer IDs are rejected.
fn resolve_target(target: DialTarget) -> crate::Result<(Option<PeerId>, Vec<Multiaddr>)> {
    match target {
        DialTarget::Peer(peer) => Ok((Some(peer), Vec::new())),
        DialTarget::Addresses(addresses) => {
            let mut peer = None;

            for address in &addresses {
                if let Some(found) = peer_id_of(address) {
                    match peer {
                        None => peer = Some(found),
                        Some(existing) if existing != found =>
                            return Err(Error::PeerIdMismatch(existing, found)),
                        _ => {}
                    }
                }
            }

            Ok((peer, addresses))
        }
    }
}

fn emit(progress: &Option<ProgressFn>, event: DialProgress) {
    if let Some(callback) = progress {
        callback(event);
    }
}

/// Current time as UTF-8 decimal milliseconds since the epoch.
fn now_millis_bytes() -> Vec<u8> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .to_string()
        .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gater::MockConnectionGater,
        peer_store::{MockPeerStore, PeerRecord},
        routing::{MockPeerRouting, PeerInfo},
        transport::MockTransportManager,
        types::ConnectionId,
    };

    use mockall::predicate;
    use parking_lot::RwLock;

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }

    fn empty_store() -> MockPeerStore {
        let mut store = MockPeerStore::new();
        store
            .expect_get()
            .returning(|peer| Err(Error::PeerDoesntExist(*peer)));
        store.expect_merge().returning(|_, _| Ok(()));
        store
    }

    fn permissive_transport() -> MockTransportManager {
        let mut transport = MockTransportManager::new();
        transport.expect_supports_dial().returning(|_| true);
        transport
    }

    fn inner_with(
        local_peer_id: PeerId,
        transport: MockTransportManager,
        store: MockPeerStore,
        routing: Option<MockPeerRouting>,
        gater: Option<MockConnectionGater>,
    ) -> DialQueueInner {
        let config = Config::default();

        DialQueueInner {
            local_peer_id,
            components: Components {
                transport_manager: Arc::new(transport),
                peer_store: Arc::new(store),
                peer_routing: routing.map(|routing| Arc::new(routing) as Arc<dyn PeerRouting>),
                connection_gater: gater.map(|gater| Arc::new(gater) as Arc<dyn ConnectionGater>),
                connections: Arc::new(RwLock::new(HashMap::new())),
            },
            max_peer_addrs_to_dial: config.max_peer_addrs_to_dial,
            dial_timeout: config.dial_timeout,
            address_sorter: None,
            resolvers: ResolverRegistry::new(),
        }
    }

    #[tokio::test]
    async fn tried_to_dial_self() {
        init_logging();

        let local_peer_id = PeerId::random();
        let inner = inner_with(
            local_peer_id,
            permissive_transport(),
            empty_store(),
            None,
            None,
        );

        let result = inner
            .calculate_multiaddrs(Some(local_peer_id), Vec::new(), &CancellationToken::new())
            .await;

        assert!(std::matches!(result, Err(Error::TriedToDialSelf)));
    }

    #[tokio::test]
    async fn gater_denies_peer_before_discovery() {
        init_logging();

        let peer = PeerId::random();
        let mut gater = MockConnectionGater::new();
        gater
            .expect_deny_dial_peer()
            .with(predicate::eq(peer))
            .returning(|_| true);

        // Peer store must not be consulted for a denied peer.
        let store = MockPeerStore::new();
        let inner =
            inner_with(PeerId::random(), permissive_transport(), store, None, Some(gater));

        let result = inner
            .calculate_multiaddrs(Some(peer), Vec::new(), &CancellationToken::new())
            .await;

        assert!(std::matches!(result, Err(Error::DialDenied(_))));
    }

    #[tokio::test]
    async fn addresses_discovered_from_peer_store() {
        init_logging();

        let peer = PeerId::random();
        let stored: Multiaddr = "/ip4/1.2.3.4/tcp/1000/ws".parse().unwrap();

        let mut store = MockPeerStore::new();
        let stored_clone = stored.clone();
        store.expect_get().with(predicate::eq(peer)).returning(move |_| {
            Ok(PeerRecord {
                addresses: vec![AddressRecord::certified(stored_clone.clone())],
                metadata: HashMap::new(),
            })
        });

        let inner = inner_with(PeerId::random(), permissive_transport(), store, None, None);
        let records = inner
            .calculate_multiaddrs(Some(peer), Vec::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].certified);
        assert_eq!(peer_id_of(&records[0].address), Some(peer));
    }

    #[tokio::test]
    async fn peer_routing_is_discovery_fallback() {
        init_logging();

        let peer = PeerId::random();
        let routed: Multiaddr = "/ip4/5.6.7.8/tcp/1000".parse().unwrap();

        let mut routing = MockPeerRouting::new();
        let routed_clone = routed.clone();
        routing.expect_find_peer().with(predicate::eq(peer), predicate::always()).returning(
            move |peer, _| {
                Ok(PeerInfo {
                    peer: *peer,
                    addresses: vec![routed_clone.clone()],
                })
            },
        );

        let inner =
            inner_with(PeerId::random(), permissive_transport(), empty_store(), Some(routing), None);
        let records = inner
            .calculate_multiaddrs(Some(peer), Vec::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(peer_id_of(&records[0].address), Some(peer));
    }

    #[tokio::test]
    async fn missing_peer_routers_leaves_no_addresses() {
        init_logging();

        let mut routing = MockPeerRouting::new();
        routing.expect_find_peer().returning(|_, _| Err(Error::NoPeerRouters));

        let inner =
            inner_with(PeerId::random(), permissive_transport(), empty_store(), Some(routing), None);
        let result = inner
            .calculate_multiaddrs(Some(PeerId::random()), Vec::new(), &CancellationToken::new())
            .await;

        assert!(std::matches!(result, Err(Error::NoValidAddresses)));
    }

    #[tokio::test]
    async fn peer_id_appended_to_bare_addresses() {
        init_logging();

        let peer = PeerId::random();
        let inner =
            inner_with(PeerId::random(), permissive_transport(), empty_store(), None, None);

        let records = inner
            .calculate_multiaddrs(
                Some(peer),
                vec!["/ip4/1.2.3.4/tcp/1000".parse().unwrap()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(
            records[0].address,
            format!("/ip4/1.2.3.4/tcp/1000/p2p/{peer}").parse().unwrap(),
        );
    }

    #[tokio::test]
    async fn unsupported_transports_are_filtered() {
        init_logging();

        let mut transport = MockTransportManager::new();
        transport.expect_supports_dial().returning(|address| {
            !address.to_string().contains("/ws")
        });

        let inner = inner_with(PeerId::random(), transport, empty_store(), None, None);
        let records = inner
            .calculate_multiaddrs(
                None,
                vec![
                    "/ip4/1.2.3.4/tcp/1000/ws".parse().unwrap(),
                    "/ip4/1.2.3.4/tcp/1001".parse().unwrap(),
                ],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address.to_string(), "/ip4/1.2.3.4/tcp/1001");
    }

    #[tokio::test]
    async fn conflicting_embedded_peer_ids_are_filtered() {
        init_logging();

        let peer = PeerId::random();
        let other = PeerId::random();
        let inner =
            inner_with(PeerId::random(), permissive_transport(), empty_store(), None, None);

        let records = inner
            .calculate_multiaddrs(
                Some(peer),
                vec![
                    format!("/ip4/1.2.3.4/tcp/1000/p2p/{other}").parse().unwrap(),
                    format!("/ip4/5.6.7.8/tcp/1000/p2p/{peer}").parse().unwrap(),
                ],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(peer_id_of(&records[0].address), Some(peer));
    }

    #[tokio::test]
    async fn no_valid_addresses_when_everything_is_filtered() {
        init_logging();

        let mut transport = MockTransportManager::new();
        transport.expect_supports_dial().returning(|_| false);

        let inner = inner_with(PeerId::random(), transport, empty_store(), None, None);
        let result = inner
            .calculate_multiaddrs(
                None,
                vec!["/ip4/1.2.3.4/tcp/1000".parse().unwrap()],
                &CancellationToken::new(),
            )
            .await;

        assert!(std::matches!(result, Err(Error::NoValidAddresses)));
    }

    #[tokio::test]
    async fn gater_denying_all_addresses_fails_the_dial() {
        init_logging();

        let mut gater = MockConnectionGater::new();
        gater.expect_deny_dial_multiaddr().returning(|_| true);

        let inner = inner_with(
            PeerId::random(),
            permissive_transport(),
            empty_store(),
            None,
            Some(gater),
        );
        let result = inner
            .calculate_multiaddrs(
                None,
                vec!["/ip4/1.2.3.4/tcp/1000".parse().unwrap()],
                &CancellationToken::new(),
            )
            .await;

        assert!(std::matches!(result, Err(Error::DialDenied(_))));
    }

    #[tokio::test]
    async fn custom_address_sorter_overrides_default() {
        init_logging();

        let mut inner =
            inner_with(PeerId::random(), permissive_transport(), empty_store(), None, None);
        // Reverse of the default: plain TCP first.
        inner.address_sorter = Some(Arc::new(|lhs, rhs| {
            default_address_sorter(rhs, lhs)
        }));

        let records = inner
            .calculate_multiaddrs(
                None,
                vec![
                    "/ip4/1.2.3.4/tcp/443/wss".parse().unwrap(),
                    "/ip4/1.2.3.4/tcp/1000".parse().unwrap(),
                ],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(records[0].address.to_string(), "/ip4/1.2.3.4/tcp/1000");
    }

    #[tokio::test]
    async fn first_address_failure_falls_through_to_second() {
        init_logging();

        let peer = PeerId::random();
        let first: Multiaddr = format!("/ip4/1.2.3.4/tcp/1000/p2p/{peer}").parse().unwrap();
        let second: Multiaddr = format!("/ip4/5.6.7.8/tcp/1000/p2p/{peer}").parse().unwrap();

        let mut transport = permissive_transport();
        let first_clone = first.clone();
        transport
            .expect_dial()
            .withf(move |address, _| *address == first_clone)
            .returning(|_, _| Err(Error::IoError(std::io::ErrorKind::ConnectionRefused)));
        let second_clone = second.clone();
        transport
            .expect_dial()
            .withf(move |address, _| *address == second_clone)
            .returning(move |address, _| {
                Ok(Connection::new(ConnectionId::from(1usize), peer, address.clone()))
            });

        let mut store = MockPeerStore::new();
        let merges = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let merges_clone = merges.clone();
        store.expect_merge().returning(move |_, update| {
            merges_clone.lock().push(update);
            Ok(())
        });

        let inner = inner_with(PeerId::random(), transport, store, None, None);
        let records = vec![AddressRecord::new(first), AddressRecord::new(second.clone())];
        let connection = inner
            .dial_addresses(Some(peer), records, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(connection.remote_addr(), &second);

        let merges = merges.lock();
        assert_eq!(merges.len(), 2);
        assert!(merges[0].metadata.contains_key(LAST_DIAL_FAILURE_KEY));
        assert!(merges[1].metadata.contains_key(LAST_DIAL_SUCCESS_KEY));
        assert_eq!(merges[1].addresses, vec![second]);
    }

    #[tokio::test]
    async fn single_transport_error_propagates_unwrapped() {
        init_logging();

        let mut transport = permissive_transport();
        transport
            .expect_dial()
            .returning(|_, _| Err(Error::IoError(std::io::ErrorKind::ConnectionRefused)));

        let inner = inner_with(PeerId::random(), transport, empty_store(), None, None);
        let records = vec![AddressRecord::new("/ip4/1.2.3.4/tcp/1000".parse().unwrap())];
        let result = inner.dial_addresses(None, records, &CancellationToken::new()).await;

        assert!(std::matches!(
            result,
            Err(Error::IoError(std::io::ErrorKind::ConnectionRefused))
        ));
    }

    #[tokio::test]
    async fn multiple_failures_are_aggregated() {
        init_logging();

        let mut transport = permissive_transport();
        transport
            .expect_dial()
            .returning(|_, _| Err(Error::IoError(std::io::ErrorKind::ConnectionRefused)));

        let inner = inner_with(PeerId::random(), transport, empty_store(), None, None);
        let records = vec![
            AddressRecord::new("/ip4/1.2.3.4/tcp/1000".parse().unwrap()),
            AddressRecord::new("/ip4/5.6.7.8/tcp/1000".parse().unwrap()),
        ];
        let result = inner.dial_addresses(None, records, &CancellationToken::new()).await;

        match result {
            Err(Error::AllDialsFailed(errors)) => assert_eq!(errors.len(), 2),
            result => panic!("expected aggregate error, got {result:?}"),
        }
    }

    #[tokio::test]
    async fn address_attempts_are_capped() {
        init_logging();

        let mut transport = permissive_transport();
        transport
            .expect_dial()
            .times(1)
            .returning(|_, _| Err(Error::IoError(std::io::ErrorKind::ConnectionRefused)));

        let mut inner = inner_with(PeerId::random(), transport, empty_store(), None, None);
        inner.max_peer_addrs_to_dial = 1;

        let records = vec![
            AddressRecord::new("/ip4/1.2.3.4/tcp/1000".parse().unwrap()),
            AddressRecord::new("/ip4/5.6.7.8/tcp/1000".parse().unwrap()),
        ];
        let result = inner.dial_addresses(None, records, &CancellationToken::new()).await;

        assert!(std::matches!(result, Err(Error::TooManyDialAddresses(1))));
    }

    #[tokio::test]
    async fn aborted_attempt_surfaces_as_timeout() {
        init_logging();

        let token = CancellationToken::new();
        let mut transport = permissive_transport();
        transport.expect_dial().returning(|_, token| {
            Err(if token.is_cancelled() {
                Error::Aborted
            } else {
                Error::IoError(std::io::ErrorKind::ConnectionRefused)
            })
        });

        let inner = inner_with(PeerId::random(), transport, empty_store(), None, None);
        token.cancel();

        let records = vec![AddressRecord::new("/ip4/1.2.3.4/tcp/1000".parse().unwrap())];
        let result = inner.dial_addresses(None, records, &token).await;

        assert!(std::matches!(result, Err(Error::Timeout)));
    }

    #[tokio::test]
    async fn mixed_peer_ids_in_target_are_rejected() {
        let first = PeerId::random();
        let second = PeerId::random();

        let result = resolve_target(DialTarget::Addresses(vec![
            format!("/ip4/1.2.3.4/tcp/1000/p2p/{first}").parse().unwrap(),
            format!("/ip4/5.6.7.8/tcp/1000/p2p/{second}").parse().unwrap(),
        ]));

        assert!(std::matches!(result, Err(Error::PeerIdMismatch(_, _))));
    }

    #[tokio::test]
    async fn target_peer_id_extracted_from_addresses() {
        let peer = PeerId::random();

        let (found, addresses) = resolve_target(DialTarget::Addresses(vec![
            format!("/ip4/1.2.3.4/tcp/1000/p2p/{peer}").parse().unwrap(),
            "/ip4/5.6.7.8/tcp/1000".parse().unwrap(),
        ]))
        .unwrap();

        assert_eq!(found, Some(peer));
        assert_eq!(addresses.len(), 2);
    }
}
