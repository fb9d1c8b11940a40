//! Shared runtime services for the MC gateway controller: the in-process
//! message bus, the in-memory gateway store and logging.
mod bus;
mod logger;
mod store;

pub use bus::MCMessageBus;
pub use logger::Logger;
pub use mc_gateway_error::{MCError, MCResult};
pub use store::MCGatewayStore;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

/// Apply the configured runtime directory by switching the process working directory.
pub fn apply_runtime_dir(runtime_dir: &str) -> MCResult<()> {
    let dir = runtime_dir.trim();
    if dir.is_empty() || dir == "." {
        return Ok(());
    }

    std::fs::create_dir_all(dir)
        .map_err(|e| MCError::from(format!("Failed to create runtime_dir {}: {}", dir, e)))?;

    std::env::set_current_dir(dir).map_err(|e| {
        MCError::from(format!(
            "Failed to set current_dir to runtime_dir {}: {}",
            dir, e
        ))
    })?;

    Ok(())
}

/// Resolve once the process is asked to terminate
pub async fn shutdown_signal() -> MCResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;
        let mut sigquit = signal(SignalKind::quit())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM signal");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT signal");
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP signal");
            }
            _ = sigquit.recv() => {
                info!("Received SIGQUIT signal");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received ctrl-c signal");
    }

    Ok(())
}
