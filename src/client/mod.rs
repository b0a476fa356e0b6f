//! The `client` module defines the representation of a streaming client.
//!
//! A [`StreamClient`] is a subscriber whose deliveries are pushed into a
//! per-connection channel; the transport drains that channel into the
//! client's socket.

pub mod stream_client;
pub use stream_client::StreamClient;
