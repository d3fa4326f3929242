//! One shared, time-ordered queue of deferred jobs.
//!
//! A single worker task drains the queue strictly one job at a time: peek
//! the earliest, sleep until it is due (waking early when something sooner
//! arrives), pop exactly one, run it synchronously. Job failures are logged
//! and the worker moves on; only [`Scheduler::stop`] ends it.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::lock::lock;

type JobFn = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// A deferred callback and the earliest instant it may run.
pub struct Job {
    run_at: Instant,
    run: JobFn,
}

impl Job {
    pub fn at<F>(run_at: Instant, f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            run_at,
            run: Box::new(f),
        }
    }

    pub fn after<F>(delay: Duration, f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        Self::at(Instant::now() + delay, f)
    }

    pub fn run_at(&self) -> Instant {
        self.run_at
    }
}

struct Queued {
    run_at: Instant,
    /// Insertion sequence; ties on `run_at` run in add order.
    seq: u64,
    run: JobFn,
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.run_at == other.run_at && self.seq == other.seq
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.run_at
            .cmp(&other.run_at)
            .then(self.seq.cmp(&other.seq))
    }
}

#[derive(Default)]
struct QueueState {
    heap: BinaryHeap<Reverse<Queued>>,
    next_seq: u64,
}

pub struct Scheduler {
    state: Mutex<QueueState>,
    bell: Notify,
    shutdown: watch::Sender<bool>,
}

impl Scheduler {
    /// Create the queue and spawn its worker. Must be called from within a
    /// tokio runtime.
    pub fn start() -> Arc<Scheduler> {
        let (shutdown, _) = watch::channel(false);
        let scheduler = Arc::new(Scheduler {
            state: Mutex::new(QueueState::default()),
            bell: Notify::new(),
            shutdown,
        });
        tokio::spawn(Arc::clone(&scheduler).run());
        scheduler
    }

    /// Queue a job. Never waits on the worker. After [`Scheduler::stop`]
    /// the queue accepts nothing; late jobs are dropped.
    pub fn add(&self, job: Job) {
        if *self.shutdown.borrow() {
            debug!("scheduler stopped, dropping job");
            return;
        }
        {
            let mut state = lock(&self.state);
            let seq = state.next_seq;
            state.next_seq += 1;
            state.heap.push(Reverse(Queued {
                run_at: job.run_at,
                seq,
                run: job.run,
            }));
        }
        self.bell.notify_one();
    }

    /// Ask the worker to exit. Idempotent; extra calls are no-ops.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
        self.bell.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }

    async fn run(self: Arc<Self>) {
        let mut shutdown = self.shutdown.subscribe();
        debug!("scheduler worker running");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let next_due = lock(&self.state).heap.peek().map(|Reverse(q)| q.run_at);

            match next_due {
                None => {
                    tokio::select! {
                        _ = self.bell.notified() => {}
                        _ = shutdown.changed() => {}
                    }
                    continue;
                }
                Some(at) if at > Instant::now() => {
                    tokio::select! {
                        _ = sleep_until(at) => {}
                        // Something sooner may have been queued.
                        _ = self.bell.notified() => continue,
                        _ = shutdown.changed() => continue,
                    }
                }
                Some(_) => {}
            }

            let due = {
                let mut state = lock(&self.state);
                let now = Instant::now();
                match state.heap.peek() {
                    Some(Reverse(q)) if q.run_at <= now => {
                        state.heap.pop().map(|Reverse(q)| q)
                    }
                    _ => None,
                }
            };

            // One at a time: a slow job delays the queue, never corrupts it.
            if let Some(job) = due {
                if let Err(err) = (job.run)() {
                    warn!(error = %err, "scheduled job failed");
                }
            }
        }

        debug!("scheduler worker stopped");
    }
}
