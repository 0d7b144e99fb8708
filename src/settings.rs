// Command-line / environment configuration. Everything the analysis
// needs to know about the site and the date window lives here; the
// constants of the query itself (dimensions, row limit) live in `api`.

use crate::error::{AppError, Result};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// OAuth scope the token file must have been issued for.
pub const WEBMASTERS_SCOPE: &str = "https://www.googleapis.com/auth/webmasters";

/// Keyword cannibalization analysis over Search Console data
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cannibal-cli",
    about = "Fetch per-URL search queries from Search Console and show keyword overlap",
    version
)]
pub struct Settings {
    /// Search Console property to query
    #[arg(long, env = "GSC_SITE_URL", default_value = "https://www.website.dk/")]
    pub site_url: String,

    /// First day of the reporting window (YYYY-MM-DD)
    #[arg(long, env = "GSC_START_DATE", default_value = "2022-10-18")]
    pub start_date: NaiveDate,

    /// Last day of the reporting window (YYYY-MM-DD)
    #[arg(long, env = "GSC_END_DATE", default_value = "2024-02-17")]
    pub end_date: NaiveDate,

    /// Authorized-user token file
    #[arg(long, env = "GSC_TOKEN_FILE", default_value = "token_gsc.json")]
    pub token_file: PathBuf,

    /// API root, overridable for a local stub
    #[arg(
        long,
        env = "GSC_API_BASE_URL",
        default_value = "https://searchconsole.googleapis.com"
    )]
    pub api_base_url: String,

    /// Spreadsheet with a URL column; runs once without prompting
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Give up on a URL at the first authentication or client error
    #[arg(long)]
    pub retry_transient_only: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Reject combinations clap cannot express on its own.
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(AppError::Config(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.site_url.trim().is_empty() {
            return Err(AppError::Config("site URL is empty".into()));
        }
        Ok(())
    }

    /// Level string handed to the logging bootstrap.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Token path with a leading `~/` resolved against the home directory.
    pub fn token_path(&self) -> PathBuf {
        expand_home(&self.token_file)
    }
}

/// Expand a leading `~/` the way a shell would.
pub fn expand_home(path: &std::path::Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    }
}
