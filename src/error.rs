// Error types shared by the library modules. The binary and the UI layer
// wrap these in `anyhow` at the boundary, like the rest of the CLI.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while loading inputs (credential file, spreadsheet)
/// and validating configuration.
#[derive(Error, Debug)]
pub enum AppError {
    /// No token file at the configured path.
    #[error("Credential file not found: {0}")]
    CredentialMissing(PathBuf),

    /// The token file exists but cannot be used as-is.
    #[error("Credential is not valid: {0}")]
    CredentialInvalid(String),

    /// The token file is not an authorized-user JSON document.
    #[error("Failed to parse credential file {path}: {source}")]
    CredentialParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The workbook could not be opened or has no worksheet.
    #[error("Failed to read spreadsheet {path}: {message}")]
    Spreadsheet { path: PathBuf, message: String },

    /// The first worksheet has no header cell named `URL`.
    #[error("No column named URL in {0}")]
    MissingUrlColumn(PathBuf),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
