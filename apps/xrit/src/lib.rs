//! # XRIT Runtime
//!
//! Async plumbing around `xrit-core`: configuration loading, the TCP frame
//! transport, the per-connection loop, and the two ends of the control
//! channel.
//!
//! ```text
//!   Node (mock)                              Service
//!  ┌────────────┐   [flags][len][payload]  ┌──────────────────────┐
//!  │ node.rs    │ ◄──────── TCP ─────────► │ service.rs           │
//!  │ MockNode   │                          │ ConfigurationService │
//!  └─────┬──────┘                          └──────────┬───────────┘
//!        │ connection.rs (ChunkedChannel + select loop) │
//!        └─────────────────────┬────────────────────────┘
//!                              ▼
//!                      backend.rs (MemoryBackend)
//! ```
//!
//! ## Modules
//!
//! - [`config`] - TOML configuration with `XRIT_*` overrides
//! - [`transport`] - length-prefixed frame codec
//! - [`connection`] - connection loop and [`connection::MessageHandler`]
//! - [`backend`] - in-memory [`xrit_core::SourceBackend`]
//! - [`service`] - the Service end, reconnecting to the Node
//! - [`node`] - a mock Node that pushes a configuration

pub mod backend;
pub mod config;
pub mod connection;
pub mod node;
pub mod service;
pub mod transport;
