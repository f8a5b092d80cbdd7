//! Core types and trait definitions for SafeTrace.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backends, the JSON API and the server binary all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod contact;
pub mod error;
pub mod event;
pub mod location;
pub mod memory;
pub mod notify;
pub mod profile;
pub mod service;
pub mod store;

pub use error::{Error, ErrorKind, Result};
