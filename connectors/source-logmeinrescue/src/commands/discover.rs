use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use tap_logmeinrescue::client::RescueClient;
use tap_logmeinrescue::config::Config;
use tap_logmeinrescue::discovery;
use tap_logmeinrescue::report::SyncWindow;
use tap_logmeinrescue::streams::StreamRegistry;

/// Execute discovery: print the catalog JSON to stdout.
pub async fn execute(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    let client = RescueClient::new(&config)?;
    let window = SyncWindow::new(config.start_date, Utc::now());

    let catalog = discovery::discover(&client, &StreamRegistry::default(), window).await?;
    discovery::write_catalog(&catalog, std::io::stdout().lock())?;

    Ok(())
}
