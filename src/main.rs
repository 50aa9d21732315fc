use anyhow::Result;
use clap::Parser;
use cv_generator::app_log;
use cv_generator::cli::{handle_command, Cli};
use cv_generator::core::ConfigManager;
use cv_generator::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging first
    init_logging()?;

    let cli = Cli::parse();
    let config = ConfigManager::load()?;

    app_log!(
        info,
        "Environment: {}, templates: {}",
        config.environment.name,
        config.environment.templates_path.display()
    );

    handle_command(cli, config).await
}
