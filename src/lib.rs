// Library root
// -----------
// This crate exposes the analysis as a library; the binary (`main.rs`)
// only parses settings, sets up logging and hands over to `ui`.
//
// Module responsibilities:
// - `settings`: CLI / environment configuration.
// - `credentials`: loads the authorized-user token file.
// - `api`: the Search Console query call and its request/response types.
// - `fetch`: bounded-retry wrapper around a single page query.
// - `table`: turns responses into the combined keyword/url table.
// - `spreadsheet`: reads the URL column of an uploaded workbook.
// - `pipeline`: runs fetch + aggregation over a URL list.
// - `ui`: terminal menu, spinner and status messages.
pub mod api;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod settings;
pub mod spreadsheet;
pub mod table;
pub mod ui;
