//! Job status listener library.
//!
//! Exposes the building blocks (config, state, error handling, request
//! decoding, routes) so integration tests and the binary entrypoint can
//! both access them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod request;
pub mod router;
pub mod routes;
pub mod state;
