//! Time sources for event timestamps.
//!
//! All keepers report nanoseconds relative to the moment they were created,
//! so that timestamps from different threads land on one axis.

use std::cell::Cell;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use thread_local::ThreadLocal;

use crate::config::ClockSource;
use crate::error::{Result, TraceError};

pub trait TimeKeeper: Send + Sync {
    /// Nanoseconds since the session zero point.
    fn normalized_nanos(&self) -> u64;

    /// Re-bases the calling thread. Called whenever a root event starts.
    fn reset_time_base(&self);

    /// Wall-clock time of the session zero point, in epoch milliseconds.
    fn zero_time_millis(&self) -> u64;
}

/// Picks the keeper for `source`, probing the platform clock first.
pub fn detect(source: ClockSource) -> Result<Box<dyn TimeKeeper>> {
    match source {
        ClockSource::Wall => Ok(Box::new(WallClock::new())),
        ClockSource::ProcessCpu => Ok(Box::new(ProcessCpuClock::new()?)),
        ClockSource::ThreadCpu => Ok(Box::new(ThreadCpuClock::new()?)),
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(unix)]
fn cpu_time_nanos(clock_id: libc::clockid_t) -> Option<u64> {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    let rc = unsafe { libc::clock_gettime(clock_id, &mut ts) };
    if rc != 0 {
        return None;
    }
    Some(ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64)
}

#[cfg(unix)]
fn process_cpu_nanos() -> Option<u64> {
    cpu_time_nanos(libc::CLOCK_PROCESS_CPUTIME_ID)
}

#[cfg(unix)]
fn thread_cpu_nanos() -> Option<u64> {
    cpu_time_nanos(libc::CLOCK_THREAD_CPUTIME_ID)
}

#[cfg(not(unix))]
fn process_cpu_nanos() -> Option<u64> {
    None
}

#[cfg(not(unix))]
fn thread_cpu_nanos() -> Option<u64> {
    None
}

/// Monotonic wall time.
pub struct WallClock {
    zero: Instant,
    zero_millis: u64,
}

impl WallClock {
    pub fn new() -> Self {
        WallClock {
            zero: Instant::now(),
            zero_millis: epoch_millis(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeKeeper for WallClock {
    fn normalized_nanos(&self) -> u64 {
        self.zero.elapsed().as_nanos() as u64
    }

    fn reset_time_base(&self) {}

    fn zero_time_millis(&self) -> u64 {
        self.zero_millis
    }
}

/// Cumulative CPU time of the whole process.
pub struct ProcessCpuClock {
    zero_nanos: u64,
    zero_millis: u64,
}

impl ProcessCpuClock {
    pub fn new() -> Result<Self> {
        let zero_nanos =
            process_cpu_nanos().ok_or(TraceError::ClockUnavailable(ClockSource::ProcessCpu.as_str()))?;
        Ok(ProcessCpuClock {
            zero_nanos,
            zero_millis: epoch_millis(),
        })
    }
}

impl TimeKeeper for ProcessCpuClock {
    fn normalized_nanos(&self) -> u64 {
        // probed at construction; a later failure reads as "no progress"
        process_cpu_nanos()
            .unwrap_or(self.zero_nanos)
            .saturating_sub(self.zero_nanos)
    }

    fn reset_time_base(&self) {}

    fn zero_time_millis(&self) -> u64 {
        self.zero_millis
    }
}

/// CPU time of the calling thread.
///
/// Every thread's CPU clock starts at zero whenever that thread was
/// created, so each thread carries an offset that maps its CPU clock onto
/// session wall time at the start of every root event. Inside one root the
/// timeline is compressed (waiting is not counted), but roots stay in
/// chronological order.
pub struct ThreadCpuClock {
    zero: Instant,
    zero_millis: u64,
    offsets: ThreadLocal<Cell<i64>>,
}

impl ThreadCpuClock {
    pub fn new() -> Result<Self> {
        thread_cpu_nanos().ok_or(TraceError::ClockUnavailable(ClockSource::ThreadCpu.as_str()))?;
        Ok(ThreadCpuClock {
            zero: Instant::now(),
            zero_millis: epoch_millis(),
            offsets: ThreadLocal::new(),
        })
    }

    fn current_offset(&self) -> i64 {
        let wall = self.zero.elapsed().as_nanos() as i64;
        wall - thread_cpu_nanos().unwrap_or(0) as i64
    }
}

impl TimeKeeper for ThreadCpuClock {
    fn normalized_nanos(&self) -> u64 {
        let offset = self
            .offsets
            .get_or(|| Cell::new(self.current_offset()))
            .get();
        let cpu = thread_cpu_nanos().unwrap_or(0) as i64;
        (cpu + offset).max(0) as u64
    }

    fn reset_time_base(&self) {
        let offset = self.current_offset();
        self.offsets.get_or(|| Cell::new(offset)).set(offset);
    }

    fn zero_time_millis(&self) -> u64 {
        self.zero_millis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn wall_clock_is_monotonic() {
        let clock = WallClock::new();
        let first = clock.normalized_nanos();
        std::thread::sleep(Duration::from_millis(2));
        let second = clock.normalized_nanos();
        assert!(second > first);
        assert!(clock.zero_time_millis() > 0);
    }

    #[cfg(unix)]
    #[test]
    fn process_cpu_clock_advances_with_work() {
        let clock = detect(ClockSource::ProcessCpu).expect("process cpu clock");
        let before = clock.normalized_nanos();
        let mut acc = 0u64;
        for i in 0..2_000_000u64 {
            acc = acc.wrapping_mul(31).wrapping_add(i);
        }
        std::hint::black_box(acc);
        assert!(clock.normalized_nanos() >= before);
    }

    #[cfg(unix)]
    #[test]
    fn thread_cpu_clock_rebases_to_wall_time() {
        let clock = ThreadCpuClock::new().expect("thread cpu clock");
        std::thread::sleep(Duration::from_millis(20));
        clock.reset_time_base();
        // after a reset the thread's normalized time tracks session wall time
        let now = clock.normalized_nanos();
        assert!(now >= Duration::from_millis(20).as_nanos() as u64);

        let other = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    clock.reset_time_base();
                    clock.normalized_nanos()
                })
                .join()
                .expect("join")
        });
        assert!(other >= now);
    }
}
