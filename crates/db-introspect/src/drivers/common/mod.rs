//! Shared driver utilities.

pub mod tls;

pub use tls::{build_client_config, SslMode};
