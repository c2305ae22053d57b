use common::{ChannelError, ClockSource, Mailbox, Responder};

use crate::config::RetryPolicy;
use crate::error::BenchError;

/// Answers every request with the time it was received.
pub struct Server<R, C> {
    responder: R,
    clock: C,
    retry: RetryPolicy,
    served: u64,
}

impl<R: Responder, C: ClockSource> Server<R, C> {
    pub fn new(responder: R, clock: C, retry: RetryPolicy) -> Self {
        Server {
            responder,
            clock,
            retry,
            served: 0,
        }
    }

    pub fn served(&self) -> u64 {
        self.served
    }

    /// Serve requests until every endpoint is gone, returning the number of
    /// requests answered. Other errors are retried until the policy gives up.
    pub fn run(&mut self) -> Result<u64, BenchError> {
        let mut failures: u32 = 0;
        let mut next = self.responder.wait();
        loop {
            match next {
                Ok((request, caller)) => {
                    failures = 0;
                    log::trace!("{caller} sent {} words", request.tag().words());
                    let reply = Mailbox::from_timestamp(self.clock.now());
                    self.served += 1;
                    next = self.responder.reply_and_wait(reply);
                }
                Err(ChannelError::Closed) => {
                    log::debug!("server: channel closed after {} requests", self.served);
                    return Ok(self.served);
                }
                Err(error) => {
                    log::error!("server: IPC error: {error} ({:#x})", error.code());
                    failures = failures.saturating_add(1);
                    if self.retry.exhausted(failures) {
                        return Err(BenchError::RetriesExhausted {
                            attempts: failures,
                            source: error,
                        });
                    }
                    next = self.responder.wait();
                }
            }
        }
    }

    pub fn into_inner(self) -> (R, C) {
        (self.responder, self.clock)
    }
}
