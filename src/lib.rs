// Library root
// -----------
// Administrative procedures for the storefront backend. The binary
// (`main.rs`) parses the command line, builds one `ApiClient` and hands it to
// the matching `ui` handler.
//
// Module responsibilities:
// - `api`: the shared client context (HTTP client, endpoints, project,
//   credentials) plus request/error plumbing.
// - `accounts`, `catalog`, `storage`: the three remote services, each behind
//   a trait implemented by `ApiClient`.
// - `fetch`, `migrate`, `patch`: image download, the migration fold and the
//   single-record patch.
// - `ui`: operator-facing flows, console output and exit codes.
pub mod accounts;
pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod migrate;
pub mod patch;
pub mod storage;
pub mod ui;

#[cfg(test)]
mod testing;

pub use error::{AdminError, Result};
