use anyhow::Result;
use layout_fix::config::Config;
use layout_fix::telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = Config::config_path()?;
    let config = Config::load_from(&config_path)?;

    telemetry::init(config.telemetry.enabled, &config.telemetry.log_path)?;
    tracing::info!(config = %config_path.display(), "layout-fix starting");

    #[cfg(target_os = "macos")]
    {
        layout_fix::app::run(config, config_path).await
    }

    #[cfg(not(target_os = "macos"))]
    {
        anyhow::bail!("layout-fix drives the macOS pasteboard and keyboard and only runs on macOS")
    }
}
