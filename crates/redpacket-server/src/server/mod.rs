//! Server-side components of the red packet HTTP service.
//!
//! ## Submodules
//!
//! - [`config`] - CLI/environment configuration.
//! - [`routes`] - HTTP handlers over a shared [`redpacket::PacketService`].
//! - [`error`] - HTTP rendering of engine errors.
//! - [`telemetry`] - Logging, tracing and metrics initialization.

pub mod config;
pub mod error;
pub mod routes;
pub mod telemetry;
