use std::sync::Arc;

use clap::Parser;
use tracing::info;

use shiftbook::cli::{self, Cli};
use shiftbook::clock::SystemClock;
use shiftbook::config::Settings;
use shiftbook::store::ShiftStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so command output stays pipeable.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Cli::parse();
    let settings = Settings::from_env();
    info!("  data_dir: {}", settings.data_dir.display());
    info!("  timezone: {}", settings.timezone);
    info!("  max_instances: {}", settings.limits.max_instances);

    let store = ShiftStore::open(settings, Arc::new(SystemClock))?;
    let mut stdout = std::io::stdout().lock();
    let result = cli::run(args.command, &store, &mut stdout).await;

    // Persist whatever made it into memory, even if the command failed.
    if let Err(e) = store.flush().await {
        tracing::error!("flush failed: {e}");
    }
    result
}
