//! A synchronous, unbuffered call/reply channel between threads.
//!
//! A [`Receiver`] owns a port; any number of [`Endpoint`]s address it. A call
//! blocks the calling thread until the receiver replies, and the receiver
//! blocks in [`Receiver::wait`] until a call arrives. [`Receiver::reply_and_wait`]
//! answers the current caller and waits for the next one in a single step.
//!
//! Nothing is copied between threads except the mailbox handed to the
//! channel; the caller gets its reply back as a fresh mailbox value.

use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, Thread};

use snafu::prelude::*;

use crate::error::{ChannelError, ClosedSnafu, MalformedSnafu, NoPendingCallerSnafu};
use crate::message::Mailbox;
use crate::util::spinlock::SpinLock;

/// Identifies the caller a request came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CallerId(u64);

impl CallerId {
    pub const fn new(raw: u64) -> CallerId {
        CallerId(raw)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "caller#{}", self.0)
    }
}

/// The client side of a rendezvous.
pub trait Caller {
    /// Send `request` and block until it is answered.
    fn call(&mut self, request: Mailbox) -> Result<Mailbox, ChannelError>;
}

/// The server side of a rendezvous.
pub trait Responder {
    /// Block until a request arrives.
    fn wait(&mut self) -> Result<(Mailbox, CallerId), ChannelError>;

    /// Answer the caller whose request was returned last, then block until
    /// the next request arrives.
    fn reply_and_wait(&mut self, reply: Mailbox) -> Result<(Mailbox, CallerId), ChannelError>;
}

#[derive(Debug)]
struct Reply {
    value: Option<Result<Mailbox, ChannelError>>,
    waiter: Thread,
}

type ReplySlot = Arc<SpinLock<Reply>>;

fn complete(slot: &ReplySlot, value: Result<Mailbox, ChannelError>) {
    let waiter = {
        let mut reply = slot.lock();
        debug_assert!(reply.value.is_none());
        reply.value = Some(value);
        reply.waiter.clone()
    };
    waiter.unpark();
}

#[derive(Debug)]
struct PendingCall {
    id: CallerId,
    request: Mailbox,
    reply: ReplySlot,
}

#[derive(Debug)]
struct Port {
    queue: VecDeque<PendingCall>,
    receiver: Option<Thread>,
    endpoints: usize,
    closed: bool,
    next_id: u64,
}

pub fn channel() -> (Endpoint, Receiver) {
    let port = Arc::new(SpinLock::new(Port {
        queue: VecDeque::new(),
        receiver: None,
        endpoints: 1,
        closed: false,
        next_id: 0,
    }));
    (
        Endpoint { port: port.clone() },
        Receiver {
            port,
            current: None,
        },
    )
}

#[derive(Debug)]
pub struct Endpoint {
    port: Arc<SpinLock<Port>>,
}

impl Endpoint {
    pub fn call(&self, request: Mailbox) -> Result<Mailbox, ChannelError> {
        let tag = request.tag();
        ensure!(tag.is_valid(), MalformedSnafu { words: tag.words() });

        let slot = Arc::new(SpinLock::new(Reply {
            value: None,
            waiter: thread::current(),
        }));
        let receiver = {
            let mut port = self.port.lock();
            ensure!(!port.closed, ClosedSnafu);
            let id = CallerId(port.next_id);
            port.next_id += 1;
            port.queue.push_back(PendingCall {
                id,
                request: request.transferred(),
                reply: slot.clone(),
            });
            port.receiver.take()
        };
        if let Some(receiver) = receiver {
            receiver.unpark();
        }

        loop {
            let value = slot.lock().value.take();
            if let Some(value) = value {
                return value;
            }
            thread::park();
        }
    }
}

impl Clone for Endpoint {
    fn clone(&self) -> Self {
        self.port.lock().endpoints += 1;
        Endpoint {
            port: self.port.clone(),
        }
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        let receiver = {
            let mut port = self.port.lock();
            port.endpoints -= 1;
            if port.endpoints == 0 {
                port.receiver.take()
            } else {
                None
            }
        };
        if let Some(receiver) = receiver {
            receiver.unpark();
        }
    }
}

impl Caller for Endpoint {
    fn call(&mut self, request: Mailbox) -> Result<Mailbox, ChannelError> {
        Endpoint::call(self, request)
    }
}

#[derive(Debug)]
struct Current {
    id: CallerId,
    reply: ReplySlot,
}

#[derive(Debug)]
pub struct Receiver {
    port: Arc<SpinLock<Port>>,
    current: Option<Current>,
}

impl Receiver {
    /// A new endpoint addressing this receiver.
    pub fn endpoint(&self) -> Endpoint {
        self.port.lock().endpoints += 1;
        Endpoint {
            port: self.port.clone(),
        }
    }

    /// The caller still waiting for a reply, if any.
    pub fn pending(&self) -> Option<CallerId> {
        self.current.as_ref().map(|current| current.id)
    }

    /// Block until a request arrives. A caller left unanswered by the
    /// previous request is released with [`ChannelError::Aborted`].
    pub fn wait(&mut self) -> Result<(Mailbox, CallerId), ChannelError> {
        if let Some(current) = self.current.take() {
            log::debug!("abandoning {} without a reply", current.id);
            complete(&current.reply, Err(ChannelError::Aborted));
        }

        loop {
            {
                let mut port = self.port.lock();
                if let Some(call) = port.queue.pop_front() {
                    self.current = Some(Current {
                        id: call.id,
                        reply: call.reply,
                    });
                    return Ok((call.request, call.id));
                }
                ensure!(port.endpoints > 0, ClosedSnafu);
                port.receiver = Some(thread::current());
            }
            thread::park();
        }
    }

    pub fn reply_and_wait(&mut self, reply: Mailbox) -> Result<(Mailbox, CallerId), ChannelError> {
        let tag = reply.tag();
        ensure!(tag.is_valid(), MalformedSnafu { words: tag.words() });
        let current = self.current.take().context(NoPendingCallerSnafu)?;
        complete(&current.reply, Ok(reply.transferred()));
        self.wait()
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        let abandoned: Vec<ReplySlot> = {
            let mut port = self.port.lock();
            port.closed = true;
            port.queue.drain(..).map(|call| call.reply).collect()
        };
        let current = self.current.take().map(|current| current.reply);
        for slot in current.iter().chain(abandoned.iter()) {
            complete(slot, Err(ChannelError::Aborted));
        }
    }
}

impl Responder for Receiver {
    fn wait(&mut self) -> Result<(Mailbox, CallerId), ChannelError> {
        Receiver::wait(self)
    }

    fn reply_and_wait(&mut self, reply: Mailbox) -> Result<(Mailbox, CallerId), ChannelError> {
        Receiver::reply_and_wait(self, reply)
    }
}
