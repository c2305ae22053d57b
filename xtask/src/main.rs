use std::{
    path::{Path, PathBuf},
    sync::{LazyLock, OnceLock},
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use xshell::{cmd, Shell};

static CARGO: LazyLock<String> =
    LazyLock::new(|| std::env::var("CARGO").unwrap_or("cargo".to_string()));
static WORKSPACE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: SubCommand,
}

#[derive(Args, Clone)]
struct BenchArgs {
    /// Build and run in release mode
    #[clap(long, default_value_t = false)]
    release: bool,
    /// Number of successful round trips to measure
    #[clap(long, default_value_t = 100_000)]
    iterations: u64,
    /// Run the server under SCHED_FIFO at this priority
    #[clap(long)]
    priority: Option<i32>,
}

#[derive(Subcommand)]
enum SubCommand {
    /// Run the benchmark once
    Bench {
        #[command(flatten)]
        args: BenchArgs,
        /// CPU the server thread is migrated to
        #[clap(long, default_value_t = 1)]
        server_core: usize,
        /// CPU to pin the calling thread to
        #[clap(long)]
        client_core: Option<usize>,
    },
    /// Run the benchmark with the client on one core and the server on every
    /// other online core in turn
    Sweep {
        #[command(flatten)]
        args: BenchArgs,
        /// CPU to pin the calling thread to
        #[clap(long, default_value_t = 0)]
        client_core: usize,
    },
}

fn build(sh: &Shell, release: bool) -> Result<PathBuf> {
    let profile = if release { "release" } else { "dev" };
    let cargo: &str = &CARGO;
    cmd!(sh, "{cargo} build -p ipcbench --profile {profile}").run()?;
    let dir = if release { "release" } else { "debug" };
    Ok(WORKSPACE
        .get()
        .context("workspace root is not set")?
        .join(format!("target/{dir}/ipcbench")))
}

fn bench(
    sh: &Shell,
    binary: &Path,
    args: &BenchArgs,
    server_core: usize,
    client_core: Option<usize>,
) -> Result<()> {
    let iterations = args.iterations.to_string();
    let server_core = server_core.to_string();
    let mut command = cmd!(
        sh,
        "{binary} --iterations {iterations} --server-core {server_core}"
    );
    if let Some(core) = client_core {
        command = command.args(["--client-core".to_string(), core.to_string()]);
    }
    if let Some(priority) = args.priority {
        command = command.args(["--priority".to_string(), priority.to_string()]);
    }
    Ok(command.run()?)
}

fn main() -> Result<()> {
    let sh = Shell::new()?;
    let cargo: &str = &CARGO;
    let cli = Cli::parse();

    let root = {
        let info = cmd!(sh, "{cargo} locate-project --workspace").read()?;
        let info = json::parse(&info)?;
        let manifest = info["root"]
            .as_str()
            .context("could not find workspace root")?;
        PathBuf::from(manifest)
            .parent()
            .context("workspace manifest has no parent directory")?
            .to_path_buf()
    };
    WORKSPACE
        .set(root)
        .map_err(|_| anyhow::anyhow!("workspace root was already set"))?;

    match cli.command {
        SubCommand::Bench {
            args,
            server_core,
            client_core,
        } => {
            let binary = build(&sh, args.release)?;
            bench(&sh, &binary, &args, server_core, client_core)
        }
        SubCommand::Sweep { args, client_core } => {
            let binary = build(&sh, args.release)?;
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            for server_core in (0..cores).filter(|&core| core != client_core) {
                println!("== server on CPU {server_core:02}, client on CPU {client_core:02}");
                bench(&sh, &binary, &args, server_core, Some(client_core))?;
            }
            Ok(())
        }
    }
}
