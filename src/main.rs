use duckdb_postal::postal_load::{launch_import, ImportConfig};

fn main() {
    // Pick up a local .env before reading the environment
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match ImportConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    match launch_import(config) {
        Ok(report) => {
            log::info!(
                "import finished: {} read, {} inserted, {} skipped",
                report.rows_read,
                report.rows_inserted,
                report.rows_skipped
            );
        }
        Err(e) => {
            log::error!("import failed: {}", e);
            std::process::exit(1);
        }
    }
}
