use snafu::prelude::*;

#[derive(Snafu, Debug, Copy, Clone, Eq, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum ChannelError {
    #[snafu(display("the receiving endpoint is closed"))]
    Closed,
    #[snafu(display("the call was abandoned before a reply was sent"))]
    Aborted,
    #[snafu(display("there is no caller awaiting a reply"))]
    NoPendingCaller,
    #[snafu(display("a message may carry at most 2 words, not {words}"))]
    Malformed { words: usize },
}

impl ChannelError {
    /// Numeric code reported alongside the error in logs.
    pub fn code(&self) -> u32 {
        match self {
            ChannelError::Closed => 0x1,
            ChannelError::Aborted => 0x2,
            ChannelError::NoPendingCaller => 0x3,
            ChannelError::Malformed { .. } => 0x4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = [
            ChannelError::Closed,
            ChannelError::Aborted,
            ChannelError::NoPendingCaller,
            ChannelError::Malformed { words: 3 },
        ];
        for (i, a) in errors.iter().enumerate() {
            assert_ne!(a.code(), 0);
            for b in &errors[i + 1..] {
                assert_ne!(a.code(), b.code());
            }
        }
    }

    #[test]
    fn test_display() {
        let error = ChannelError::Malformed { words: 5 };
        assert_eq!(error.to_string(), "a message may carry at most 2 words, not 5");
    }
}
