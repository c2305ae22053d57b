use std::thread::{self, JoinHandle};

use common::{channel, ClockSource, Endpoint};
use snafu::prelude::*;

use crate::affinity;
use crate::client::Client;
use crate::config::BenchConfig;
use crate::error::{BenchError, NothingMeasuredSnafu, SpawnSnafu};
use crate::report::Report;
use crate::server::Server;

/// Everything the benchmark needs after startup: the server's endpoint, the
/// clock and the configuration.
pub struct BenchContext<C> {
    endpoint: Endpoint,
    clock: C,
    config: BenchConfig,
    server: JoinHandle<Result<u64, BenchError>>,
}

impl<C: ClockSource + Clone + Send + 'static> BenchContext<C> {
    /// Spawn the server thread, migrate it to its core and pin the calling
    /// thread if configured. Only failing to create the thread is fatal.
    pub fn start(config: BenchConfig, clock: C) -> Result<Self, BenchError> {
        config.validate()?;
        let cores = affinity::online_cores();
        if config.server_core >= cores {
            log::warn!(
                "server CPU {:02} is not among the {cores} online cores",
                config.server_core
            );
        }
        let (endpoint, receiver) = channel();

        let server_clock = clock.clone();
        let retry = config.retry;
        let server = thread::Builder::new()
            .name("ipc-server".into())
            .spawn(move || {
                log::debug!("server running on core {:?}", affinity::current_core());
                Server::new(receiver, server_clock, retry).run()
            })
            .context(SpawnSnafu)?;

        match affinity::pin_thread(&server, config.server_core, config.priority) {
            Ok(()) => log::info!("migrated server thread -> CPU {:02}", config.server_core),
            Err(e) => log::warn!(
                "error migrating server thread to CPU {:02}: {e}",
                config.server_core
            ),
        }
        if let Some(core) = config.client_core {
            match affinity::pin_current(core) {
                Ok(()) => log::info!("pinned client thread -> CPU {core:02}"),
                Err(e) => log::warn!("error pinning client thread to CPU {core:02}: {e}"),
            }
        }

        Ok(BenchContext {
            endpoint,
            clock,
            config,
            server,
        })
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Run the configured number of round trips and summarize them.
    pub fn run(&self) -> Result<Report, BenchError> {
        log::info!(
            "measuring {} round trips to CPU {:02}",
            self.config.iterations,
            self.config.server_core
        );
        let mut client = Client::new(self.endpoint.clone(), &self.clock, self.config.retry);
        let acc = client.run(self.config.iterations)?;
        acc.report().context(NothingMeasuredSnafu)
    }

    /// Close the channel and join the server thread, returning how many
    /// requests it answered.
    pub fn shutdown(self) -> Result<u64, BenchError> {
        let BenchContext {
            endpoint, server, ..
        } = self;
        drop(endpoint);
        server
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
    }
}
