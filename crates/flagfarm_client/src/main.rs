mod hfi_cache;
mod remote;
mod runner;
mod scheduler;
mod uploader;

use clap::Parser;
use remote::RemoteSession;
use scheduler::{Scheduler, SchedulerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uploader::FlagUploader;

/// Wave-scheduled exploit runner: repeatedly runs one exploit against every
/// team in the competition and ships captured flags to the farm server.
#[derive(Parser, Debug)]
#[command(name = "flagfarm-client", about = "Flag farm client: wave scheduler + exploit runner")]
struct Cli {
    /// Path to the exploit script or binary to run against every team.
    exploit: PathBuf,

    /// Base URL of the farm server, e.g. http://farm.internal:5000
    #[arg(long)]
    server_url: String,

    /// Password used to authenticate against the farm server.
    #[arg(long)]
    server_pass: String,

    /// Per-run hard timeout, in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Failure count above which a team starts getting randomly skipped.
    #[arg(long, default_value_t = 4)]
    failure_threshold: u32,

    /// Failure counter ceiling — skip odds never get worse than this caps.
    #[arg(long, default_value_t = 12)]
    max_failures: u32,

    /// Disable the failure-based skip entirely; always attempt every team.
    #[arg(long)]
    always_retry: bool,

    /// Interpreter to invoke the exploit with, if it is not itself executable.
    #[arg(long)]
    interpreter: Option<String>,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = flagfarm_logging::init_logging(flagfarm_logging::LogConfig {
        app_name: "flagfarm_client",
        verbose: cli.verbose,
    }) {
        eprintln!("fatal: could not initialize logging: {err}");
        std::process::exit(-1);
    }

    if !cli.exploit.exists() {
        tracing::error!(path = %cli.exploit.display(), "exploit path does not exist");
        std::process::exit(-1);
    }

    if let Err(err) = run(cli).await {
        tracing::error!(error = %err, "fatal: client startup failed");
        std::process::exit(-1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let timeout = Duration::from_secs(cli.timeout);

    let session = Arc::new(RemoteSession::authenticate(&cli.server_url, &cli.server_pass, timeout).await?);
    tracing::info!(server = %cli.server_url, "authenticated against farm server");

    let exploit_name = flagfarm_protocol::naming::exploit_name_from_path(&cli.exploit);
    let uploader = Arc::new(FlagUploader::new(session.clone(), exploit_name));

    let (os, arch) = (hfi_cache::local_os(), hfi_cache::local_arch());
    match hfi_cache::ensure_fresh(session.client(), session.base_url(), os, arch, timeout).await {
        Ok(path) => tracing::info!(path = %path.display(), "hfi helper is up to date"),
        Err(err) => tracing::warn!(error = %err, "could not refresh hfi helper, continuing without it"),
    }

    let scheduler = Scheduler::new(
        SchedulerConfig {
            exploit_path: cli.exploit,
            interpreter: cli.interpreter,
            timeout,
            failure_threshold: cli.failure_threshold,
            max_failures: cli.max_failures,
            always_retry: cli.always_retry,
        },
        session,
        uploader,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut scheduler_handle = tokio::spawn(async move { scheduler.run(shutdown_rx).await });

    tokio::select! {
        result = &mut scheduler_handle => {
            result??;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining in-flight exploit runs");
            let _ = shutdown_tx.send(true);
        }
    }

    scheduler_handle.await??;
    Ok(())
}
