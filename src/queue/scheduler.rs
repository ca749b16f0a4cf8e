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

//! Bounded-concurrency dial job scheduler.
//!
//! Jobs wait in priority order (higher first, FIFO for ties) and at most
//! `max_parallel` run at once. A job carries any number of waiters; all of
//! them observe the same outcome. A waiter can abandon its job individually,
//! and once the last waiter is gone the job itself is cancelled.

use crate::{
    connection::Connection,
    error::Error,
    queue::ProgressFn,
    types::JobId,
    PeerId,
};

use futures::{future::BoxFuture, stream::FuturesUnordered, StreamExt};
use multiaddr::Multiaddr;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::sync::{oneshot, Notify};
use tokio_util::sync::CancellationToken;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

/// Logging target for the file.
const LOG_TARGET: &str = "litedial::scheduler";

/// Snapshot of a job handed to the job runner when the job starts executing.
///
/// The address set is frozen at execution time so that callers joining a
/// still-pending job contribute their addresses.
pub(crate) struct JobSnapshot {
    /// Job ID.
    pub id: JobId,

    /// Target peer, if known.
    pub peer: Option<PeerId>,

    /// Addresses accumulated for the job so far.
    pub addresses: Vec<Multiaddr>,

    /// Progress callback of the submitting caller.
    pub progress: Option<ProgressFn>,

    /// Cancelled once every waiter has abandoned the job.
    pub job_token: CancellationToken,

    /// Queue-wide shutdown token active when the job started.
    pub shutdown: CancellationToken,
}

/// Function producing the future that executes one dial job.
pub(crate) type JobRunner =
    Arc<dyn Fn(JobSnapshot) -> BoxFuture<'static, crate::Result<Connection>> + Send + Sync>;

/// Outcome of submitting a dial request to the scheduler.
pub(crate) struct SubmitOutcome {
    /// Job the caller is attached to.
    pub job: JobId,

    /// The caller's waiter ID within the job.
    pub waiter: u64,

    /// Whether the caller joined a job that was already in flight.
    pub joined: bool,

    /// Channel on which the job outcome is delivered.
    pub rx: oneshot::Receiver<crate::Result<Connection>>,
}

enum JobState {
    /// Job is waiting for a free slot.
    Pending,

    /// Job is executing.
    Running,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<crate::Result<Connection>>,
}

struct DialJob {
    peer: Option<PeerId>,
    addresses: HashSet<Multiaddr>,
    priority: u8,
    state: JobState,
    waiters: SmallVec<[Waiter; 4]>,
    token: CancellationToken,
    progress: Option<ProgressFn>,
}

struct State {
    /// All live jobs, pending and running.
    jobs: HashMap<JobId, DialJob>,

    /// Shutdown token distributed to jobs as they start.
    shutdown: CancellationToken,

    /// Whether the queue has been stopped. New submissions are rejected and
    /// no pending job is admitted until `start()` is called again.
    stopped: bool,

    /// Whether the scheduler is shutting down for good.
    closed: bool,

    next_job: u64,
    next_waiter: u64,
}

struct SchedulerInner {
    max_parallel: usize,
    max_queue_length: usize,
    state: Mutex<State>,
    notify: Notify,
}

/// Handle to the dial job scheduler.
#[derive(Clone)]
pub(crate) struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Create a new [`Scheduler`]. The event loop must be driven separately
    /// through [`Scheduler::run`].
    pub fn new(max_parallel: usize, max_queue_length: usize) -> Scheduler {
        Scheduler {
            inner: Arc::new(SchedulerInner {
                max_parallel,
                max_queue_length,
                state: Mutex::new(State {
                    jobs: HashMap::new(),
                    shutdown: CancellationToken::new(),
                    stopped: false,
                    closed: false,
                    next_job: 0u64,
                    next_waiter: 0u64,
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Submit a dial request.
    ///
    /// The request joins an in-flight job when the target overlaps it, the
    /// peer IDs are compatible (equal, or at least one side unknown), in
    /// which case the request's addresses are merged into the job. Otherwise
    /// a new job is created, subject to the queue length bound.
    pub fn submit(
        &self,
        peer: Option<PeerId>,
        addresses: HashSet<Multiaddr>,
        priority: u8,
        progress: Option<ProgressFn>,
    ) -> crate::Result<SubmitOutcome> {
        let mut state = self.inner.state.lock();

        if state.stopped || state.closed {
            return Err(Error::Aborted);
        }

        let matched = state.jobs.iter().find_map(|(id, job)| {
            let compatible = match (job.peer, peer) {
                (Some(existing), Some(target)) => existing == target,
                _ => true,
            };
            let overlap = (job.peer.is_some() && job.peer == peer)
                || !job.addresses.is_disjoint(&addresses);

            (compatible && overlap).then_some(*id)
        });

        if let Some(id) = matched {
            let waiter = state.next_waiter;
            state.next_waiter += 1;

            let (tx, rx) = oneshot::channel();
            let job = state.jobs.get_mut(&id).expect("matched job to exist");
            job.addresses.extend(addresses);
            job.peer = job.peer.or(peer);
            job.waiters.push(Waiter { id: waiter, tx });

            tracing::trace!(target: LOG_TARGET, job = ?id, waiter, "joined in-flight dial job");

            return Ok(SubmitOutcome {
                job: id,
                waiter,
                joined: true,
                rx,
            });
        }

        if state.jobs.len() >= self.inner.max_queue_length {
            return Err(Error::DialQueueFull);
        }

        let id = JobId::from(state.next_job);
        state.next_job += 1;
        let waiter = state.next_waiter;
        state.next_waiter += 1;

        let (tx, rx) = oneshot::channel();
        state.jobs.insert(
            id,
            DialJob {
                peer,
                addresses,
                priority,
                state: JobState::Pending,
                waiters: SmallVec::from_iter([Waiter { id: waiter, tx }]),
                token: CancellationToken::new(),
                progress,
            },
        );
        drop(state);

        tracing::trace!(target: LOG_TARGET, job = ?id, ?peer, priority, "dial job queued");
        self.inner.notify.notify_one();

        Ok(SubmitOutcome {
            job: id,
            waiter,
            joined: false,
            rx,
        })
    }

    /// Detach `waiter` from `job`.
    ///
    /// Once the last waiter is detached the job is cancelled: removed
    /// outright while pending, aborted through its token while running.
    pub fn abandon(&self, job: JobId, waiter: u64) {
        let mut state = self.inner.state.lock();

        let Some(entry) = state.jobs.get_mut(&job) else {
            return;
        };

        entry.waiters.retain(|existing| existing.id != waiter);
        if entry.waiters.is_empty() {
            tracing::trace!(target: LOG_TARGET, job = ?job, "all waiters gone, cancelling job");

            entry.token.cancel();
            if std::matches!(entry.state, JobState::Pending) {
                state.jobs.remove(&job);
            }
        }
    }

    /// Number of live jobs, pending and running.
    pub fn len(&self) -> usize {
        self.inner.state.lock().jobs.len()
    }

    /// Number of currently executing jobs.
    pub fn running(&self) -> usize {
        self.inner
            .state
            .lock()
            .jobs
            .values()
            .filter(|job| std::matches!(job.state, JobState::Running))
            .count()
    }

    /// Stop the scheduler: reject new submissions, abort running jobs via the
    /// shutdown token and fail all pending jobs.
    pub fn stop(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            state.stopped = true;
            state.shutdown.cancel();

            let pending: Vec<JobId> = state
                .jobs
                .iter()
                .filter(|(_, job)| std::matches!(job.state, JobState::Pending))
                .map(|(id, _)| *id)
                .collect();

            pending
                .into_iter()
                .filter_map(|id| state.jobs.remove(&id))
                .collect::<Vec<_>>()
        };

        tracing::debug!(target: LOG_TARGET, drained = drained.len(), "dial scheduler stopped");

        for job in drained {
            for waiter in job.waiters {
                let _ = waiter.tx.send(Err(Error::Aborted));
            }
        }
    }

    /// Restart a stopped scheduler with a fresh shutdown token.
    pub fn start(&self) {
        let mut state = self.inner.state.lock();
        state.stopped = false;
        state.shutdown = CancellationToken::new();
    }

    /// Shut the scheduler down for good, failing every live job.
    pub fn close(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.stopped = true;
            state.shutdown.cancel();

            state.jobs.drain().map(|(_, job)| job).collect::<Vec<_>>()
        };

        for job in drained {
            job.token.cancel();
            for waiter in job.waiters {
                let _ = waiter.tx.send(Err(Error::Aborted));
            }
        }

        self.inner.notify.notify_one();
    }

    /// Admit pending jobs up to the concurrency bound, highest priority
    /// first, FIFO among equal priorities.
    fn take_ready(&self) -> Vec<JobSnapshot> {
        let mut state = self.inner.state.lock();

        if state.stopped || state.closed {
            return Vec::new();
        }

        let running = state
            .jobs
            .values()
            .filter(|job| std::matches!(job.state, JobState::Running))
            .count();
        let capacity = self.inner.max_parallel.saturating_sub(running);
        if capacity == 0 {
            return Vec::new();
        }

        let mut pending: Vec<(u8, JobId)> = state
            .jobs
            .iter()
            .filter(|(_, job)| std::matches!(job.state, JobState::Pending))
            .map(|(id, job)| (job.priority, *id))
            .collect();
        pending.sort_by(|lhs, rhs| rhs.0.cmp(&lhs.0).then_with(|| lhs.1.cmp(&rhs.1)));

        let shutdown = state.shutdown.clone();
        pending
            .into_iter()
            .take(capacity)
            .map(|(_, id)| {
                let job = state.jobs.get_mut(&id).expect("pending job to exist");
                job.state = JobState::Running;

                JobSnapshot {
                    id,
                    peer: job.peer,
                    addresses: job.addresses.iter().cloned().collect(),
                    progress: job.progress.clone(),
                    job_token: job.token.clone(),
                    shutdown: shutdown.clone(),
                }
            })
            .collect()
    }

    /// Distribute the outcome of a finished job to its waiters.
    fn complete(&self, id: JobId, result: crate::Result<Connection>) {
        let waiters = {
            let mut state = self.inner.state.lock();
            state.jobs.remove(&id).map(|job| job.waiters)
        };

        // Job was drained by `close()` while executing.
        let Some(waiters) = waiters else { return };

        match &result {
            Ok(connection) => tracing::trace!(
                target: LOG_TARGET,
                job = ?id,
                peer = %connection.remote_peer(),
                "dial job succeeded",
            ),
            Err(error) if error.is_aborted() => {
                tracing::trace!(target: LOG_TARGET, job = ?id, "dial job aborted")
            }
            Err(error) => {
                tracing::debug!(target: LOG_TARGET, job = ?id, ?error, "dial job failed")
            }
        }

        for waiter in waiters {
            let _ = waiter.tx.send(result.clone());
        }
    }

    /// Run the scheduler event loop.
    pub async fn run(self, runner: JobRunner) {
        let mut running_jobs: FuturesUnordered<
            BoxFuture<'static, (JobId, crate::Result<Connection>)>,
        > = FuturesUnordered::new();

        loop {
            if self.inner.state.lock().closed {
                return;
            }

            for snapshot in self.take_ready() {
                let id = snapshot.id;
                let runner = runner.clone();

                tracing::trace!(target: LOG_TARGET, job = ?id, "dial job starting");
                running_jobs.push(Box::pin(async move { (id, (runner)(snapshot).await) }));
            }

            tokio::select! {
                _ = self.inner.notify.notified() => {}
                (id, result) = running_jobs.select_next_some(), if !running_jobs.is_empty() => {
                    self.complete(id, result);
                }
            }
        }
    }
}
