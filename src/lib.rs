//! pswproxy is a single-upstream HTTP reverse proxy.
//!
//! It listens on a local port (6749 by default), forwards every request
//! to one fixed upstream (`https://pswww.slac.stanford.edu` by default),
//! rewrites the `Host` header to the upstream's host, and streams the
//! response back unchanged. Unreachable upstreams yield `502`, slow ones
//! `504`; a listener that cannot bind aborts startup.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, init, validate, health).
//! - [`config`] -- Config model, file parsing, flag layering, and validation.
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`health`] -- `GET /health` handler served on the optional admin port.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`proxy`] -- Core HTTP forwarding: URI composition, header rewriting,
//!   and streaming with an idle deadline.
//! - [`server`] -- [`ForwardingListener`](server::ForwardingListener)
//!   lifecycle, shared application state, the pooled TLS client, and
//!   graceful shutdown.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `yaml` | YAML config file support _(enabled by default)_ |
//! | `json` | JSON config file support |
//! | `toml` | TOML config file support |
//! | `file-backends` | All file format backends |

// Binary crate: public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod proxy;
pub mod server;
