use common::{Caller, ChannelError, ClockSource, Mailbox, Timestamp};

use crate::config::RetryPolicy;
use crate::error::BenchError;
use crate::report::Accumulator;

/// Drives round trips against the server and accounts for each one.
pub struct Client<T, C> {
    caller: T,
    clock: C,
    retry: RetryPolicy,
}

fn server_timestamp(reply: &Mailbox) -> Result<Timestamp, ChannelError> {
    reply.timestamp().ok_or(ChannelError::Malformed {
        words: reply.tag().words(),
    })
}

impl<T: Caller, C: ClockSource> Client<T, C> {
    pub fn new(caller: T, clock: C, retry: RetryPolicy) -> Self {
        Client {
            caller,
            clock,
            retry,
        }
    }

    /// Complete `iterations` successful round trips. A failed call is logged
    /// and the same iteration is retried with fresh samples; it never counts
    /// toward `iterations`.
    pub fn run(&mut self, iterations: u64) -> Result<Accumulator, BenchError> {
        let mut acc = Accumulator::new();
        let mut mailbox = Mailbox::empty();
        let mut failures: u32 = 0;
        while acc.completed() < iterations {
            let pre = self.clock.now();
            let start = self.clock.cycles();
            let result = self.caller.call(mailbox);
            let end = self.clock.cycles();

            match result.and_then(|reply| Ok((reply, server_timestamp(&reply)?))) {
                Ok((reply, server)) => {
                    failures = 0;
                    mailbox = reply;
                    acc.record(pre.elapsed_until(server), end.wrapping_sub(start));
                }
                Err(error) => {
                    log::error!("client: IPC error: {error} ({:#x})", error.code());
                    failures = failures.saturating_add(1);
                    if self.retry.exhausted(failures) {
                        return Err(BenchError::RetriesExhausted {
                            attempts: failures,
                            source: error,
                        });
                    }
                }
            }

            mailbox.clear();
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::clock::Elapsed;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Hands out a fixed sequence of `now()` readings; cycles advance by 100
    /// per reading.
    struct ScriptedClock {
        times: RefCell<VecDeque<Timestamp>>,
        cycles: RefCell<u64>,
    }

    impl ScriptedClock {
        fn new(times: &[Timestamp]) -> Self {
            ScriptedClock {
                times: RefCell::new(times.iter().copied().collect()),
                cycles: RefCell::new(0),
            }
        }
    }

    impl ClockSource for ScriptedClock {
        fn now(&self) -> Timestamp {
            self.times.borrow_mut().pop_front().expect("clock script ran out")
        }

        fn cycles(&self) -> u64 {
            let mut cycles = self.cycles.borrow_mut();
            *cycles += 100;
            *cycles
        }
    }

    /// Replies from a script of results and checks every request is empty.
    struct ScriptedCaller {
        results: VecDeque<Result<Mailbox, ChannelError>>,
        calls: usize,
    }

    impl ScriptedCaller {
        fn new(results: Vec<Result<Mailbox, ChannelError>>) -> Self {
            ScriptedCaller {
                results: results.into(),
                calls: 0,
            }
        }
    }

    impl Caller for ScriptedCaller {
        fn call(&mut self, request: Mailbox) -> Result<Mailbox, ChannelError> {
            assert_eq!(request.tag().words(), 0);
            assert_eq!((request.word(0), request.word(1)), (Some(0), Some(0)));
            self.calls += 1;
            self.results.pop_front().expect("caller script ran out")
        }
    }

    fn stamp(secs: u64, nanos: u32) -> Result<Mailbox, ChannelError> {
        Ok(Mailbox::from_timestamp(Timestamp::new(secs, nanos)))
    }

    #[test]
    fn test_accumulates_successful_calls() {
        let clock = ScriptedClock::new(&[
            Timestamp::new(10, 0),
            Timestamp::new(20, 500_000_000),
            Timestamp::new(30, 0),
        ]);
        let caller = ScriptedCaller::new(vec![
            stamp(10, 100_000_000),
            stamp(20, 700_000_000),
            stamp(31, 0),
        ]);
        let mut client = Client::new(caller, clock, RetryPolicy::FOREVER);
        let acc = client.run(3).unwrap();
        assert_eq!(acc.completed(), 3);
        assert_eq!(acc.elapsed(), Elapsed::new(1, 300_000_000));
        assert_eq!(acc.cycles(), 300);

        let report = acc.report().unwrap();
        assert_eq!(report.total, Duration::new(1, 300_000_000));
        assert_eq!(report.average, Duration::new(0, 433_333_333));
        assert_eq!(report.average_cycles, 100);
    }

    #[test]
    fn test_error_retries_with_fresh_sample() {
        let clock = ScriptedClock::new(&[
            Timestamp::new(5, 0),
            Timestamp::new(9, 0),
        ]);
        let caller = ScriptedCaller::new(vec![Err(ChannelError::Aborted), stamp(9, 250)]);
        let mut client = Client::new(caller, clock, RetryPolicy::FOREVER);
        let acc = client.run(1).unwrap();
        assert_eq!(acc.completed(), 1);
        // measured from the retry's sample, not the failed attempt's
        assert_eq!(acc.elapsed(), Elapsed::new(0, 250));
        assert_eq!(client.caller.calls, 2);
    }

    #[test]
    fn test_errors_do_not_count() {
        let clock = ScriptedClock::new(&[Timestamp::new(1, 0); 6]);
        let caller = ScriptedCaller::new(vec![
            Err(ChannelError::Closed),
            stamp(1, 10),
            Err(ChannelError::Aborted),
            Err(ChannelError::Aborted),
            Err(ChannelError::NoPendingCaller),
            stamp(1, 20),
        ]);
        let mut client = Client::new(caller, clock, RetryPolicy::FOREVER);
        let acc = client.run(2).unwrap();
        assert_eq!(acc.completed(), 2);
        assert_eq!(acc.elapsed(), Elapsed::new(0, 30));
        assert_eq!(client.caller.calls, 6);
    }

    #[test]
    fn test_short_reply_is_retried() {
        let clock = ScriptedClock::new(&[Timestamp::new(1, 0); 2]);
        let caller = ScriptedCaller::new(vec![Ok(Mailbox::empty()), stamp(2, 0)]);
        let mut client = Client::new(caller, clock, RetryPolicy::FOREVER);
        let acc = client.run(1).unwrap();
        assert_eq!(acc.completed(), 1);
        assert_eq!(acc.elapsed(), Elapsed::new(1, 0));
    }

    #[test]
    fn test_bounded_retry_gives_up() {
        let clock = ScriptedClock::new(&[Timestamp::new(1, 0); 4]);
        let caller = ScriptedCaller::new(vec![
            stamp(1, 5),
            Err(ChannelError::Closed),
            Err(ChannelError::Closed),
            Err(ChannelError::Closed),
        ]);
        let mut client = Client::new(caller, clock, RetryPolicy::bounded(3));
        let error = client.run(2).unwrap_err();
        assert!(matches!(
            error,
            BenchError::RetriesExhausted {
                attempts: 3,
                source: ChannelError::Closed
            }
        ));
    }
}
