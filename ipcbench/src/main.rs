use anyhow::Context;
use clap::Parser;
use common::MonotonicClock;
use ipcbench::{BenchConfig, BenchContext, RetryPolicy};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of successful round trips to measure
    #[clap(long, default_value_t = 100_000)]
    iterations: u64,
    /// CPU the server thread is migrated to
    #[clap(long, default_value_t = 1)]
    server_core: usize,
    /// CPU to pin the calling thread to (left to the scheduler by default)
    #[clap(long)]
    client_core: Option<usize>,
    /// Run the server under SCHED_FIFO at this priority
    #[clap(long)]
    priority: Option<i32>,
    /// Give up after this many consecutive failed calls (retries forever by default)
    #[clap(long)]
    max_attempts: Option<u32>,
}

impl From<Args> for BenchConfig {
    fn from(args: Args) -> Self {
        BenchConfig {
            iterations: args.iterations,
            server_core: args.server_core,
            client_core: args.client_core,
            priority: args.priority,
            retry: RetryPolicy {
                max_attempts: args.max_attempts,
            },
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = BenchConfig::from(args);

    let context =
        BenchContext::start(config, MonotonicClock::new()).context("benchmark startup failed")?;
    let report = context.run()?;
    print!("{report}");
    let served = context.shutdown()?;
    log::debug!("server answered {served} requests");
    Ok(())
}
