//! Block time and other time-related types.
use std::sync::atomic;
use std::time::{SystemTime, UNIX_EPOCH};

use super::{BlockTime, Height};

/// Maximum a block timestamp can exceed the local time before the
/// retargeting code stops trusting it and falls back to the median time
/// past (2 hours).
pub const MAX_FUTURE_BLOCK_TIME: BlockTime = 60 * 60 * 2;

/// Number of previous blocks to look at when determining the median
/// block time.
pub const MEDIAN_TIME_SPAN: Height = 11;

/// Clock that tells the time.
pub trait Clock: Clone {
    /// Return the local time as seconds since Epoch.
    /// This is the same representation as used in block header timestamps.
    fn block_time(&self) -> BlockTime;
    /// Tell the time in local time.
    fn local_time(&self) -> LocalTime;
    /// Create a clock from a block time.
    fn from_block_time(t: BlockTime) -> Self;
}

/// Local time.
///
/// This clock is monotonic.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Ord, PartialOrd, Default)]
pub struct LocalTime {
    /// Seconds since Epoch.
    secs: u64,
}

impl std::fmt::Display for LocalTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_secs())
    }
}

impl LocalTime {
    /// Construct a local time from the current system time.
    pub fn now() -> Self {
        static LAST: atomic::AtomicU64 = atomic::AtomicU64::new(0);

        let now = Self::from(SystemTime::now()).as_secs();
        let last = LAST.load(atomic::Ordering::SeqCst);

        // If the current time is in the past, return the last recorded time instead.
        if now < last {
            Self::from_secs(last)
        } else {
            LAST.store(now, atomic::Ordering::SeqCst);
            LocalTime::from_secs(now)
        }
    }

    /// Construct a local time from whole seconds since Epoch.
    pub const fn from_secs(secs: u64) -> Self {
        Self { secs }
    }

    /// Return the local time as whole seconds since Epoch.
    pub const fn as_secs(&self) -> u64 {
        self.secs
    }

    /// Elapse time by the given number of seconds.
    pub fn elapse(&mut self, secs: u64) {
        self.secs += secs
    }
}

/// Convert a `SystemTime` into a local time.
impl From<SystemTime> for LocalTime {
    fn from(system: SystemTime) -> Self {
        let secs = system.duration_since(UNIX_EPOCH).unwrap().as_secs();

        Self { secs }
    }
}

impl Clock for LocalTime {
    fn block_time(&self) -> BlockTime {
        self.as_secs() as BlockTime
    }

    fn local_time(&self) -> LocalTime {
        *self
    }

    fn from_block_time(t: BlockTime) -> Self {
        LocalTime::from_secs(u64::from(t))
    }
}
