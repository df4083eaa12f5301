//! # PTT server
//! The HTTP front end of the PTT engine. It is responsible for:
//! * Exchanging API keys for short-lived access tokens and checking those tokens on every `/api` request.
//! * Enforcing the coarse role checks for each route. Finer rules (who may act on which token) live in the engine.
//! * Turning maker requests on gated actions into pending actions for a checker.
//! * Cancelling stale token requests in the background.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: Returns 200 OK.
//! * `/auth`: Exchanges the API key in the `ptt_api_key` header for an access token.
//! * `/api/...`: Everything else. See [routes](routes/index.html).

pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
