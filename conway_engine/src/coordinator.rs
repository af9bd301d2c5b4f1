// coordinator.rs - Shared run mode, worker registry and the per-cell checkpoint

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

/// Granularity of `tokio::time::sleep`.
const TIMER_RESOLUTION: Duration = Duration::from_millis(1);

/// Tri-state run mode shared by every worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Running,
    Paused,
    Stopped,
}

impl RunMode {
    pub fn label(self) -> &'static str {
        match self {
            RunMode::Running => "running",
            RunMode::Paused  => "paused",
            RunMode::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Marker returned by a checkpoint that observed `Stopped`.
///
/// Not an error: it is how a worker learns to unwind and unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Throttle applied at every checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delay {
    /// Only the cooperative yield.
    None,
    /// Busy-wait for the given number of iterations.
    Spin(u32),
    /// Timed sleep; cut short by `stop`. Sleeps below the timer's
    /// millisecond resolution wait on a deadline instead.
    #[serde(rename = "sleep_us")]
    Sleep(#[serde(with = "micros")] Duration),
}

impl Delay {
    /// About half a second per generation on a single worker: the half
    /// second spread over every cell as a per-cell sleep.
    pub fn default_for(side: usize) -> Self {
        let cells = side.max(1).saturating_mul(side.max(1)) as u64;
        Delay::Sleep(Duration::from_nanos((500_000_000 / cells).max(1)))
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Delay::None => true,
            Delay::Spin(iterations) => *iterations > 0,
            Delay::Sleep(duration) => !duration.is_zero(),
        }
    }
}

mod micros {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_micros() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

/// Process-wide controller: single source of truth for whether workers
/// continue, wait, or unwind.
///
/// Mode changes go through a watch channel, so each one is visible at every
/// worker's next checkpoint and a single send wakes all waiters.
#[derive(Debug)]
pub struct Coordinator {
    mode: watch::Sender<RunMode>,
    active: watch::Sender<usize>,
    delay: Delay,
    step: AtomicBool,
}

impl Coordinator {
    /// New coordinator in `Stopped` mode with no registered workers.
    pub fn new(delay: Delay) -> Self {
        let (mode, _) = watch::channel(RunMode::Stopped);
        let (active, _) = watch::channel(0);
        Self { mode, active, delay, step: AtomicBool::new(false) }
    }

    pub fn mode(&self) -> RunMode {
        *self.mode.borrow()
    }

    pub fn delay(&self) -> Delay {
        self.delay
    }

    pub fn active_workers(&self) -> usize {
        *self.active.borrow()
    }

    /// Record a worker as active until the returned guard is dropped.
    pub fn register(&self) -> Registration<'_> {
        self.active.send_modify(|count| *count += 1);
        Registration { coordinator: self }
    }

    fn unregister(&self) {
        self.active.send_modify(|count| *count = count.saturating_sub(1));
    }

    /// Wait until every registered worker has unregistered.
    pub async fn wait_idle(&self) {
        let mut active = self.active.subscribe();
        let _ = active.wait_for(|count| *count == 0).await;
    }

    /// STOPPED → RUNNING.
    pub fn start(&self) -> bool {
        self.transition(RunMode::Stopped, RunMode::Running)
    }

    /// RUNNING → PAUSED; ignored in any other mode.
    pub fn pause(&self) -> bool {
        self.transition(RunMode::Running, RunMode::Paused)
    }

    /// PAUSED → RUNNING, waking every worker blocked in a checkpoint.
    pub fn resume(&self) -> bool {
        self.transition(RunMode::Paused, RunMode::Running)
    }

    /// Any mode → STOPPED, waking every blocked or sleeping worker.
    pub fn stop(&self) -> bool {
        let stopped = self.mode.send_if_modified(|mode| {
            let changed = *mode != RunMode::Stopped;
            *mode = RunMode::Stopped;
            changed
        });
        self.step.store(false, Ordering::SeqCst);
        if stopped { info!("simulation stopped"); }
        stopped
    }

    fn transition(&self, from: RunMode, to: RunMode) -> bool {
        let changed = self.mode.send_if_modified(|mode| {
            if *mode != from { return false; }
            *mode = to;
            true
        });
        if changed { debug!(%from, %to, "run mode changed"); }
        changed
    }

    /// Ask the run loop to pause after the next completed generation.
    pub fn request_step(&self) {
        self.step.store(true, Ordering::SeqCst);
    }

    pub fn take_step(&self) -> bool {
        self.step.swap(false, Ordering::SeqCst)
    }

    /// Per-worker checkpoint handle.
    pub fn subscribe(&self) -> Checkpoint {
        Checkpoint { mode: self.mode.subscribe(), delay: self.delay }
    }

    /// One-off checkpoint for callers that do not keep a handle.
    pub async fn checkpoint(&self) -> Result<(), Cancelled> {
        self.subscribe().hesitate().await
    }
}

/// Guard for a registered worker; unregisters on every exit path.
#[derive(Debug)]
pub struct Registration<'a> {
    coordinator: &'a Coordinator,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.coordinator.unregister();
    }
}

/// A worker's view of the coordinator.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    mode: watch::Receiver<RunMode>,
    delay: Delay,
}

impl Checkpoint {
    /// Called before every cell update. Returns `Err(Cancelled)` once the
    /// mode is `Stopped`, blocks while `Paused`, and otherwise applies the
    /// throttle and yields to the other tasks on this thread.
    pub async fn hesitate(&mut self) -> Result<(), Cancelled> {
        let mode = *self.mode.borrow_and_update();
        match mode {
            RunMode::Stopped => return Err(Cancelled),
            RunMode::Paused => {
                let resumed = *self
                    .mode
                    .wait_for(|mode| *mode != RunMode::Paused)
                    .await
                    .map_err(|_| Cancelled)?;
                if resumed == RunMode::Stopped { return Err(Cancelled); }
            }
            RunMode::Running => {}
        }

        match self.delay {
            Delay::None => {}
            Delay::Spin(iterations) => {
                for _ in 0..iterations { std::hint::spin_loop(); }
            }
            Delay::Sleep(duration) if duration < TIMER_RESOLUTION => {
                let deadline = Instant::now() + duration;
                while Instant::now() < deadline { std::hint::spin_loop(); }
            }
            Delay::Sleep(duration) => {
                tokio::select! {
                    _ = tokio::time::sleep(duration) => {}
                    _ = self.mode.wait_for(|mode| *mode == RunMode::Stopped) => return Err(Cancelled),
                }
            }
        }

        tokio::task::yield_now().await;
        Ok(())
    }
}
