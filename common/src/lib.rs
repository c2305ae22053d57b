//! Protocol core shared by the benchmark: the two-word message envelope, the
//! rendezvous channel that carries it, and the clock it timestamps with.

pub mod clock;
pub mod error;
pub mod message;
pub mod rendezvous;
pub mod util;

pub use clock::{ClockSource, Elapsed, MonotonicClock, Timestamp};
pub use error::ChannelError;
pub use message::{Mailbox, MessageTag, Word};
pub use rendezvous::{channel, Caller, CallerId, Endpoint, Receiver, Responder};
