use clap::Parser;
use flagfarm_server::state::AppState;
use flagfarm_server::{app, config, worker};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "flagfarm-server", about = "Flag farm server: flag lifecycle + upstream submission")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, default_value = "farm.yml")]
    config: PathBuf,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    flagfarm_logging::init_logging(flagfarm_logging::LogConfig {
        app_name: "flagfarm_server",
        verbose: cli.verbose,
    })?;

    let config = match config::load(&cli.config) {
        Ok(config) => Arc::new(config),
        Err(err) => {
            tracing::error!(error = %err, "fatal: could not load configuration");
            std::process::exit(1);
        }
    };

    let pool = flagfarm_db::create_pool(&config.database).await?;
    flagfarm_db::migrate(&pool).await?;
    let flags = flagfarm_db::FlagStore::new(pool.clone());
    let hfi = flagfarm_db::HfiRegistry::new(pool);

    let submitter: Arc<dyn flagfarm_submit::Submitter> = Arc::from(flagfarm_submit::build_submitter(
        &config.system_url,
        &config.team_token,
        config.submit_timeout_secs,
    )?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = worker::SubmissionWorker::new(flags.clone(), submitter, config.clone());
    let worker_handle = tokio::spawn(worker.run(shutdown_rx.clone()));
    let sweep_handle = tokio::spawn(worker::run_periodic_sweep(flags.clone(), config.clone(), shutdown_rx));

    let state = AppState {
        config: config.clone(),
        flags,
        hfi,
    };
    let router = app::build_router(state);

    let addr = format!("{}:{}", config.address, config.port);
    tracing::info!(%addr, "flag farm server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tokio::select! {
        result = axum::serve(listener, router) => {
            if let Err(err) = result {
                tracing::error!(error = %err, "server exited with error");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, draining workers");
        }
    }

    let _ = shutdown_tx.send(true);
    let _ = worker_handle.await;
    let _ = sweep_handle.await;

    Ok(())
}
