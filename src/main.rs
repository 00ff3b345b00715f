//! strm-mirror: mirror a 123pan drive into a local media library.
//!
//! Walks the remote tree depth-first from a starting directory. Video files
//! become `.strm` pointer files addressed at a direct-link service; subtitles
//! are downloaded with resume support and exponential-backoff retries.
//! Requests are paced so the drive's rate limits are not tripped.

#![warn(clippy::all)]

mod cli;
mod config;
mod logging;
mod remote;
pub mod retry;
mod shutdown;
mod sync;
mod types;

#[cfg(test)]
mod test_support;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;

use config::Config;
use remote::Pan123Client;
use sync::error::SyncError;
use sync::Synchronizer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    let config = match Config::from_cli(cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    let (logger, _guard) = match logging::build_dispatch(config.log_level, config.log_file.as_deref()) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error: could not set up logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(config, logger.clone()).with_subscriber(logger.clone()).await;

    tracing::dispatcher::with_default(&logger, || match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<SyncError>() {
            Some(SyncError::Interrupted) => {
                tracing::warn!("Sync interrupted");
                ExitCode::from(shutdown::INTERRUPTED_EXIT_CODE)
            }
            _ => {
                tracing::error!("Fatal error: {:#}", e);
                ExitCode::FAILURE
            }
        },
    })
}

async fn run(config: Config, logger: tracing::Dispatch) -> anyhow::Result<()> {
    tracing::debug!(?config, "Loaded configuration");

    // Signals keep their default behavior while the prompt is up.
    let password = match config.password.clone() {
        Some(pw) => pw,
        None => tokio::task::spawn_blocking(|| rpassword::prompt_password("123pan Password: "))
            .await??,
    };

    let shutdown_token = shutdown::install_signal_handler()?;

    tracing::info!("Signing in as {}", config.passport);
    let client = sign_in(&config, &password, &shutdown_token).await?;
    drop(password);

    if !config.dry_run {
        tokio::fs::create_dir_all(&config.local_root).await?;
    }
    tracing::info!(
        root = %config.local_root.display(),
        parent_id = config.parent_id,
        "Starting sync"
    );
    if config.dry_run {
        tracing::info!("[DRY RUN] Nothing will be written locally");
    }

    let download_client = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()?;

    let synchronizer = Synchronizer::new(Arc::new(client), download_client, config.sync_config())
        .with_logger(logger);
    synchronizer.run(config.parent_id, shutdown_token).await?;

    Ok(())
}

/// Sign in to 123pan, giving up early if shutdown is requested.
async fn sign_in(
    config: &Config,
    password: &str,
    shutdown_token: &CancellationToken,
) -> anyhow::Result<Pan123Client> {
    tokio::select! {
        biased;
        _ = shutdown_token.cancelled() => Err(SyncError::Interrupted.into()),
        client = Pan123Client::sign_in(
            &config.login_base,
            &config.api_base,
            &config.passport,
            password,
            config.timeout,
        ) => Ok(client?),
    }
}
