//! edugrades - fetch, print, and serve Edupage grades with persistent
//! local authentication.
//!
//! The heart of the crate is the session subsystem in [`auth`]: sealed
//! credential storage, plaintext session persistence, and the tiered
//! resolution that decides on each run whether to reuse a saved session,
//! log in from stored credentials, or report that neither is possible.
//! Everything else (console printer, HTTP API) is thin glue over that
//! subsystem and the portal client in [`api`].

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod output;
pub mod server;
