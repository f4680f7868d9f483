use anyhow::Result;
use tracing::{error, info};

use grafana_pg_migrate::config::Config;
use grafana_pg_migrate::migration::MigrationPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter())
        .init();

    info!("grafana-pg-migrate v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = MigrationPipeline::new(config.migration_options(), Box::new(config.on_errors));
    match pipeline.run().await {
        Ok(report) => {
            let stats = &report.applied.import.stats;
            info!(
                "Executed {} of {} statements ({} duplicates skipped, {} recovered as bytea)",
                stats.executed, stats.statements, stats.duplicates_skipped, stats.recovered
            );
            info!("All done!");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            std::process::exit(1);
        }
    }
}
