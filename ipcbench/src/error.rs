use common::ChannelError;
use snafu::prelude::*;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum BenchError {
    #[snafu(display("giving up after {attempts} consecutive failures, last: {source}"))]
    RetriesExhausted { attempts: u32, source: ChannelError },
    #[snafu(display("could not create the server thread"))]
    Spawn { source: std::io::Error },
    #[snafu(display("invalid configuration: {reason}"))]
    InvalidConfig { reason: String },
    #[snafu(display("no round trips were measured"))]
    NothingMeasured,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Accumulator;

    #[test]
    fn test_empty_run_is_not_a_config_error() {
        let error = Accumulator::new().report().context(NothingMeasuredSnafu).unwrap_err();
        assert!(matches!(error, BenchError::NothingMeasured));
        assert_eq!(error.to_string(), "no round trips were measured");
    }
}
