use core::fmt;
use std::time::Duration;

use common::clock::{Elapsed, NANOS_PER_SEC};

/// Running totals kept by the client. Nanoseconds are summed without carrying
/// into seconds; [`Accumulator::report`] normalizes them.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Accumulator {
    elapsed_secs: u64,
    elapsed_nanos: u64,
    cycles: u64,
    completed: u64,
}

impl Accumulator {
    pub fn new() -> Accumulator {
        Accumulator::default()
    }

    /// Account for one successful round trip.
    pub fn record(&mut self, elapsed: Elapsed, cycles: u64) {
        self.elapsed_secs += elapsed.secs;
        self.elapsed_nanos += elapsed.nanos;
        self.cycles += cycles;
        self.completed += 1;
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn elapsed(&self) -> Elapsed {
        Elapsed::new(self.elapsed_secs, self.elapsed_nanos)
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Totals and per-call averages, or `None` before the first round trip.
    pub fn report(&self) -> Option<Report> {
        let n = self.completed;
        if n == 0 {
            return None;
        }
        let carry = self.elapsed_nanos / NANOS_PER_SEC;
        let nanos = self.elapsed_nanos % NANOS_PER_SEC;
        let secs = self.elapsed_secs + carry;

        let avg_secs = secs / n;
        let spill = (secs % n) as u128 * NANOS_PER_SEC as u128 + nanos as u128;
        let avg_nanos = (spill / n as u128) as u64;

        Some(Report {
            iterations: n,
            total: Duration::new(secs, nanos as u32),
            average: Duration::from_secs(avg_secs) + Duration::from_nanos(avg_nanos),
            average_cycles: self.cycles / n,
        })
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Report {
    pub iterations: u64,
    pub total: Duration,
    pub average: Duration,
    pub average_cycles: u64,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Total call time          : {:5}.{:09}s",
            self.total.as_secs(),
            self.total.subsec_nanos()
        )?;
        writeln!(
            f,
            "AVG call time            : {:5}.{:09}s",
            self.average.as_secs(),
            self.average.subsec_nanos()
        )?;
        writeln!(f, "AVG round-trip cycles    : {:15}", self.average_cycles)
    }
}
