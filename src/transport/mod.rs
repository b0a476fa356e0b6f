//! The `transport` module exposes the broker over HTTP.
//!
//! It contains the REST handlers, the WebSocket stream endpoint, the router
//! that mounts them under `/api/v1`, and the server lifecycle helpers.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use router::{API_PREFIX, build_router};
pub use server::{ServerError, bind, serve};
pub use state::AppState;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod websocket_tests;
