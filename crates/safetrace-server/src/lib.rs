//! Process-level pieces of the SafeTrace server: configuration and the
//! outbound notification transports. The binary in `main.rs` wires them to
//! a store and the API router.

pub mod config;
pub mod transport;

pub use config::ServerConfig;
