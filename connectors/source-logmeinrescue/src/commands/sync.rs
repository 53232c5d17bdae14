use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use rescue_tap_types::catalog::Catalog;
use tap_logmeinrescue::client::RescueClient;
use tap_logmeinrescue::config::Config;
use tap_logmeinrescue::emitter::SingerEmitter;
use tap_logmeinrescue::selection::resolve_plan;
use tap_logmeinrescue::streams::StreamRegistry;
use tap_logmeinrescue::sync::{load_state, SyncContext};
use tap_logmeinrescue::TapError;

/// Execute a sync: emit Singer messages for every selected stream.
pub async fn execute(
    config_path: &Path,
    catalog_path: Option<&Path>,
    state_path: Option<&Path>,
) -> Result<()> {
    let run_started_at = Utc::now();

    // 1. Config first: missing keys abort before anything else runs
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    // 2. Catalog and plan
    let catalog_path = catalog_path.ok_or_else(|| {
        TapError::Config("a catalog is required to sync (pass --catalog)".to_string())
    })?;
    let raw = std::fs::read_to_string(catalog_path)
        .with_context(|| format!("Failed to read catalog: {}", catalog_path.display()))?;
    let catalog: Catalog = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse catalog: {}", catalog_path.display()))?;

    let plan = resolve_plan(&catalog, &StreamRegistry::default())?;
    if plan.is_empty() {
        tracing::warn!("No streams selected in catalog; nothing to sync");
        return Ok(());
    }

    // 3. State
    let mut state = load_state(state_path).with_context(|| match state_path {
        Some(path) => format!("Failed to load state: {}", path.display()),
        None => "Failed to initialise state".to_string(),
    })?;

    // 4. Run
    let client = RescueClient::new(&config)?;
    let mut emitter = SingerEmitter::new(std::io::stdout());
    let summary = SyncContext {
        client: &client,
        state: &mut state,
        emitter: &mut emitter,
        start_date: config.start_date,
        run_started_at,
    }
    .run(&plan)
    .await?;

    tracing::info!(
        streams = ?plan.stream_names(),
        records = summary.total_records(),
        "Sync finished"
    );
    Ok(())
}
