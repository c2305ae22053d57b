use crate::clock::Timestamp;

pub type Word = usize;

/// Number of payload words a message can carry.
pub const MAX_WORDS: usize = 2;

/// Describes how many leading payload words of a mailbox are part of the
/// message.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct MessageTag {
    words: usize,
}

impl MessageTag {
    pub const CALL: MessageTag = MessageTag { words: 0 };
    pub const REPLY: MessageTag = MessageTag { words: MAX_WORDS };

    pub const fn new(words: usize) -> MessageTag {
        MessageTag { words }
    }

    pub const fn words(&self) -> usize {
        self.words
    }

    pub const fn is_valid(&self) -> bool {
        self.words <= MAX_WORDS
    }
}

/// The message buffer a thread hands to the channel and gets back from it.
///
/// Only the words named by the tag are transferred; the remaining words of a
/// delivered mailbox are always zero.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct Mailbox {
    tag: MessageTag,
    words: [Word; MAX_WORDS],
}

impl Mailbox {
    /// An empty call envelope.
    pub const fn empty() -> Mailbox {
        Mailbox {
            tag: MessageTag::CALL,
            words: [0; MAX_WORDS],
        }
    }

    pub const fn reply(word0: Word, word1: Word) -> Mailbox {
        Mailbox {
            tag: MessageTag::REPLY,
            words: [word0, word1],
        }
    }

    /// Build a mailbox with an arbitrary tag. Tags larger than [`MAX_WORDS`]
    /// are kept as-is and rejected by the channel on transfer.
    pub const fn with_tag(tag: MessageTag, words: [Word; MAX_WORDS]) -> Mailbox {
        Mailbox { tag, words }
    }

    pub fn from_timestamp(ts: Timestamp) -> Mailbox {
        Mailbox::reply(ts.secs as Word, ts.nanos as Word)
    }

    pub fn tag(&self) -> MessageTag {
        self.tag
    }

    pub fn words(&self) -> &[Word] {
        &self.words[..self.tag.words.min(MAX_WORDS)]
    }

    /// The raw word at `index`, regardless of the tag.
    pub fn word(&self, index: usize) -> Option<Word> {
        self.words.get(index).copied()
    }

    /// Interpret a two-word reply as `(seconds, nanoseconds)`.
    pub fn timestamp(&self) -> Option<Timestamp> {
        match *self.words() {
            [secs, nanos] => Some(Timestamp::new(secs as u64, nanos as u32)),
            _ => None,
        }
    }

    /// Reset the payload to the `(0, 0)` sentinel and the tag to an empty call.
    pub fn clear(&mut self) {
        *self = Mailbox::empty();
    }

    /// The mailbox as seen by the receiver: untransferred words read as zero.
    pub(crate) fn transferred(&self) -> Mailbox {
        let mut out = Mailbox {
            tag: self.tag,
            words: [0; MAX_WORDS],
        };
        let n = self.tag.words.min(MAX_WORDS);
        out.words[..n].copy_from_slice(&self.words[..n]);
        out
    }
}
