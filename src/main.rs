mod classify;
mod config;
mod db;
mod error;
mod import;
mod ledger;
mod models;
mod run;

use anyhow::Result;

fn main() -> Result<()> {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        run::print_usage();
        return Ok(());
    }

    let config_file = config::config_path()?;
    let settings = config::Settings::load(Some(config_file.as_path()))?;
    let classifier = classify::Classifier::new(&settings.classifier)?;
    let mut db = db::Database::open(&config::db_path()?)?;

    let mut shop = run::Shop::new(&mut db, &settings, &classifier);
    run::as_cli(&args, &mut shop)
}

/// Diagnostics go to stderr so command output stays clean. `RUST_LOG`
/// overrides the default level.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cashdesk=info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
