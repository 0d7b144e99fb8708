// Entrypoint for the CLI application.
// - Keeps `main` small: parse settings, start logging, hand over to the UI.
// - Returns `anyhow::Result` so setup errors print and exit non-zero.

use cannibal_cli::settings::Settings;
use cannibal_cli::ui::{main_menu, run_file};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> anyhow::Result<()> {
    let settings = Settings::parse();
    setup_logging(settings.effective_log_level());
    settings.validate()?;

    tracing::info!("cannibal-cli v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(site = %settings.site_url, start = %settings.start_date, end = %settings.end_date);

    match &settings.file {
        Some(path) => {
            run_file(&settings, path)?;
        }
        // Blocks until the user picks "Exit".
        None => main_menu(&settings)?,
    }
    Ok(())
}

/// Initialise the global `tracing` subscriber on stderr.
fn setup_logging(log_level: &str) {
    let normalised = match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(normalised));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}
