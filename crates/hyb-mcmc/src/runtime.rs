use std::env;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

/// Monotonic wall-clock source.
pub trait Clock: fmt::Debug + Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Starts a clock at the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock advanced by hand. Clones share the same reading.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the reading forward.
    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Position of this worker within the pool of independent processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkerPool {
    /// Index of this worker, `0..size`.
    pub rank: usize,
    /// Number of workers, at least 1.
    pub size: usize,
}

const LAUNCHER_VARIABLES: [(&str, &str); 4] = [
    ("OMPI_COMM_WORLD_SIZE", "OMPI_COMM_WORLD_RANK"),
    ("PMI_SIZE", "PMI_RANK"),
    ("PMIX_SIZE", "PMIX_RANK"),
    ("SLURM_NTASKS", "SLURM_PROCID"),
];

impl WorkerPool {
    /// Creates a pool descriptor. A size of zero is clamped to one.
    pub fn new(rank: usize, size: usize) -> Self {
        let size = size.max(1);
        Self {
            rank: rank.min(size - 1),
            size,
        }
    }

    /// A pool containing only this process.
    pub fn single() -> Self {
        Self::new(0, 1)
    }

    /// Reads the pool from the launcher environment of this process.
    pub fn discover() -> Self {
        Self::discover_from(|name| env::var(name).ok())
    }

    /// Reads the pool through `lookup`, trying the MPI launchers before SLURM.
    pub fn discover_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        for (size_var, rank_var) in LAUNCHER_VARIABLES {
            let Some(raw) = lookup(size_var) else {
                continue;
            };
            let Ok(size) = raw.trim().parse::<usize>() else {
                debug!(variable = size_var, value = %raw, "ignoring unparsable pool size");
                continue;
            };
            let rank = lookup(rank_var)
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let pool = Self::new(rank, size);
            debug!(variable = size_var, rank = pool.rank, size = pool.size, "discovered worker pool");
            return pool;
        }
        debug!("no launcher environment found, running as a single worker");
        Self::single()
    }
}

/// Process-global inputs of an engine.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    clock: Arc<dyn Clock>,
    pool: WorkerPool,
}

impl RuntimeContext {
    /// Combines a clock and a pool descriptor.
    pub fn new(clock: Arc<dyn Clock>, pool: WorkerPool) -> Self {
        Self { clock, pool }
    }

    /// System clock and the discovered worker pool.
    pub fn from_environment() -> Self {
        Self::new(Arc::new(SystemClock::new()), WorkerPool::discover())
    }

    /// Current clock reading.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// This worker's pool descriptor.
    pub fn pool(&self) -> WorkerPool {
        self.pool
    }
}
