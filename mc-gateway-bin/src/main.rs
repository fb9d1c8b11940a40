use clap::Parser;
use mc_adapter_virtual::VirtualAdapterFactory;
use mc_gateway_common::{
    apply_runtime_dir, shutdown_signal, Logger, MCGatewayStore, MCMessageBus,
};
use mc_gateway_core::MCController;
use mc_gateway_error::{MCError, MCResult};
use mc_gateway_models::{constants::DEFAULT_CONFIG_FILE_NAME, settings::Settings};
use mc_gateway_sdk::AdapterRegistry;
use std::{env::current_dir, path::PathBuf, sync::Arc};
use tracing::{error, info};

/// MC Gateway - IoT gateway controller
///
/// Runs protocol adapters for the configured gateways, moves messages
/// between them and the message bus, and reconnects gateways that go down.
#[derive(Parser)]
#[command(name = "mc-gateway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "MC Gateway", long_about = None)]
struct Cli {
    /// Sets a custom config file with full path
    ///
    /// If not specified, the controller looks for 'controller.toml'
    /// in the current working directory.
    #[arg(short, long, env = "MC_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> MCResult<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(p) => p,
        None => {
            let dir = current_dir()
                .map_err(|e| MCError::from(format!("Failed to get current directory: {e}")))?;
            dir.join(DEFAULT_CONFIG_FILE_NAME)
        }
    };
    let settings = Settings::new(&config_path.to_string_lossy())?;

    apply_runtime_dir(&settings.general.runtime_dir)?;

    let mut logger = Logger::new(Some(Logger::parse_level(&settings.log.level)?));
    logger.initialize()?;
    info!(config = %config_path.display(), "Configuration loaded");

    let bus = Arc::new(MCMessageBus::new());
    let store = Arc::new(MCGatewayStore::with_gateways(settings.gateways.clone()));
    let adapters = AdapterRegistry::new();
    adapters
        .register_factory(Arc::new(VirtualAdapterFactory))
        .map_err(|e| MCError::AdapterError(e.to_string()))?;

    let controller = MCController::new(settings, bus, store, adapters);
    if let Err(e) = controller.start().await {
        error!(error = %e, "Failed to start controller");
        controller.stop().await?;
        return Err(e);
    }

    shutdown_signal().await?;
    controller.stop().await
}
