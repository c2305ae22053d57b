use core::fmt;

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A monotonic wall-clock reading.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
pub struct Timestamp {
    pub secs: u64,
    pub nanos: u32,
}

impl Timestamp {
    pub const fn new(secs: u64, nanos: u32) -> Timestamp {
        Timestamp { secs, nanos }
    }

    /// Time from `self` (taken before a call) to `server` (stamped by the
    /// peer while handling it).
    ///
    /// When the nanosecond component of `server` is smaller than ours the
    /// nanoseconds borrow a second, and the seconds delta is taken as
    /// `server.secs + 1 - self.secs`. Nothing is normalized here; the sum of
    /// many deltas is normalized when reported.
    pub fn elapsed_until(&self, server: Timestamp) -> Elapsed {
        let (pre_ns, srv_ns) = (self.nanos as u64, server.nanos as u64);
        if pre_ns > srv_ns {
            Elapsed {
                secs: server.secs.saturating_add(1).saturating_sub(self.secs),
                nanos: srv_ns + NANOS_PER_SEC - pre_ns,
            }
        } else {
            Elapsed {
                secs: server.secs.saturating_sub(self.secs),
                nanos: srv_ns - pre_ns,
            }
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}s", self.secs, self.nanos)
    }
}

/// An un-normalized duration: `nanos` may exceed one second.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Elapsed {
    pub secs: u64,
    pub nanos: u64,
}

impl Elapsed {
    pub const fn new(secs: u64, nanos: u64) -> Elapsed {
        Elapsed { secs, nanos }
    }
}

pub trait ClockSource {
    fn now(&self) -> Timestamp;
    fn cycles(&self) -> u64;
}

impl<C: ClockSource + ?Sized> ClockSource for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn cycles(&self) -> u64 {
        (**self).cycles()
    }
}

/// `CLOCK_MONOTONIC` for wall time and the time-stamp counter for cycles.
#[derive(Debug, Copy, Clone, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> MonotonicClock {
        MonotonicClock
    }
}

impl ClockSource for MonotonicClock {
    fn now(&self) -> Timestamp {
        // SAFETY: an all-zero timespec is valid and CLOCK_MONOTONIC always exists.
        let mut tp: libc::timespec = unsafe { core::mem::zeroed() };
        let ret = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut tp) };
        debug_assert_eq!(ret, 0);
        Timestamp::new(tp.tv_sec as u64, tp.tv_nsec as u32)
    }

    #[inline]
    fn cycles(&self) -> u64 {
        read_cycles()
    }
}

#[cfg(target_arch = "x86_64")]
#[inline]
pub fn read_cycles() -> u64 {
    unsafe {
        core::arch::x86_64::_mm_lfence();
        let tsc = core::arch::x86_64::_rdtsc();
        core::arch::x86_64::_mm_lfence();
        tsc
    }
}

#[cfg(not(target_arch = "x86_64"))]
#[inline]
pub fn read_cycles() -> u64 {
    // no portable cycle counter; nanoseconds keep the same unit everywhere
    let ts = MonotonicClock.now();
    ts.secs * NANOS_PER_SEC + ts.nanos as u64
}
