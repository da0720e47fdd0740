// Library root
// -----------
// The `secret-post` binary is a thin wrapper around these modules:
// - `api`: blocking HTTP client for the message store (store, fetch,
//   cleanup) and its wire types.
// - `config`: command-line flags, environment fallbacks and validation.
// - `ui`: console flows that call `api` and decide the exit outcome.
pub mod api;
pub mod config;
pub mod ui;
