// UI layer: a small interactive menu using `dialoguer`, plus a one-shot
// mode for `--file`. All of the work happens in `pipeline::run_analysis`;
// this module only picks the file, loads the credential, shows the spinner
// and prints what came back.

use crate::api::{QueryParams, SearchConsoleClient};
use crate::credentials::load_credentials;
use crate::fetch::RetryPolicy;
use crate::pipeline::{run_analysis, AnalysisReport, Progress};
use crate::settings::{expand_home, Settings, WEBMASTERS_SCOPE};
use crate::spreadsheet::{filter_locale_urls, read_url_column};
use anyhow::Result;
use chrono::Utc;
use crossterm::style::Stylize;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where the operator is in the upload → run cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    FileLoaded,
    Authenticating,
    Fetching,
    Done,
}

/// The URL list currently loaded and the stage of the cycle.
#[derive(Debug)]
pub struct Session {
    stage: Stage,
    source: Option<PathBuf>,
    urls: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            stage: Stage::Idle,
            source: None,
            urls: Vec::new(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Replace the URL list with `urls` minus locale variants. Returns how
    /// many were dropped. Not allowed while a run is in progress.
    pub fn load_urls(&mut self, source: PathBuf, urls: Vec<String>) -> Option<usize> {
        match self.stage {
            Stage::Authenticating | Stage::Fetching => None,
            _ => {
                let total = urls.len();
                self.urls = filter_locale_urls(urls);
                self.source = Some(source);
                self.stage = Stage::FileLoaded;
                Some(total - self.urls.len())
            }
        }
    }

    /// Start a run. Only possible once a file has been loaded.
    pub fn begin_run(&mut self) -> bool {
        match self.stage {
            Stage::FileLoaded | Stage::Done => {
                self.stage = Stage::Authenticating;
                true
            }
            _ => false,
        }
    }

    /// The credential was unusable: back to the start.
    pub fn auth_failed(&mut self) {
        if self.stage == Stage::Authenticating {
            self.stage = Stage::Idle;
            self.urls.clear();
            self.source = None;
        }
    }

    pub fn auth_ok(&mut self) {
        if self.stage == Stage::Authenticating {
            self.stage = Stage::Fetching;
        }
    }

    pub fn finish(&mut self) {
        if self.stage == Stage::Fetching {
            self.stage = Stage::Done;
        }
    }
}

/// Main interactive menu. Runs a select loop until the user picks "Exit".
pub fn main_menu(settings: &Settings) -> Result<()> {
    println!("{}", "Keyword Cannibalization Analysis".bold());
    let mut session = Session::new();
    loop {
        let items = vec!["Upload URL file", "Run analysis", "Exit"];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => {
                if let Some(path) = choose_file()? {
                    if let Err(e) = upload(&mut session, &path) {
                        println!("{}", e.to_string().red());
                    }
                }
            }
            1 => {
                if session.stage() == Stage::Idle {
                    println!("Upload a URL file first.");
                    continue;
                }
                run(settings, &mut session)?;
            }
            2 => break,
            _ => {}
        }
    }
    Ok(())
}

/// Non-interactive path for `--file`: load, run once, print.
pub fn run_file(settings: &Settings, path: &Path) -> Result<Option<AnalysisReport>> {
    let mut session = Session::new();
    upload(&mut session, &expand_home(path))?;
    run(settings, &mut session)
}

/// Ask for a spreadsheet, either through a native dialog or typed in.
fn choose_file() -> Result<Option<PathBuf>> {
    let items = vec!["Browse...", "Type a path", "Cancel"];
    match Select::new().items(&items).default(0).interact()? {
        0 => Ok(rfd::FileDialog::new()
            .add_filter("Spreadsheet", &["xlsx", "xls", "xlsb", "ods"])
            .pick_file()),
        1 => {
            let path: String = Input::new().with_prompt("Spreadsheet path").interact_text()?;
            Ok(Some(expand_home(Path::new(path.trim()))))
        }
        _ => Ok(None),
    }
}

fn upload(session: &mut Session, path: &Path) -> Result<()> {
    let urls = read_url_column(path)?;
    let dropped = session.load_urls(path.to_path_buf(), urls).unwrap_or(0);
    println!(
        "Loaded {} URLs from {} ({} locale variants skipped)",
        session.urls().len(),
        path.display(),
        dropped
    );
    Ok(())
}

/// Authenticate, fetch every loaded URL and print the combined table.
fn run(settings: &Settings, session: &mut Session) -> Result<Option<AnalysisReport>> {
    if !session.begin_run() {
        return Ok(None);
    }

    let credential = match load_credentials(&settings.token_path(), &[WEBMASTERS_SCOPE], Utc::now()) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(error = %e, "credential unusable");
            println!("{}", "Please authenticate to access Google Search Console.".yellow());
            session.auth_failed();
            return Ok(None);
        }
    };
    let client = match SearchConsoleClient::new(&settings.api_base_url, &credential) {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e.to_string().red());
            session.auth_failed();
            return Ok(None);
        }
    };
    session.auth_ok();

    let params = QueryParams {
        site_url: settings.site_url.clone(),
        start_date: settings.start_date,
        end_date: settings.end_date,
    };
    let policy = if settings.retry_transient_only {
        RetryPolicy::transient_only()
    } else {
        RetryPolicy::default()
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("Fetching keyword data...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let report = run_analysis(&client, &params, session.urls(), &policy, |event| match event {
        Progress::Started { index, total, url } => {
            spinner.set_message(format!("Fetching keyword data... ({}/{}) {}", index + 1, total, url));
        }
        Progress::Failed(failure) => spinner.println(failure.to_string().red().to_string()),
    });
    spinner.finish_and_clear();
    session.finish();

    if let Some(table) = &report.table {
        println!("{}", "Keyword data fetched successfully!".green());
        print!("{}", table.render());
    }
    Ok(Some(report))
}
