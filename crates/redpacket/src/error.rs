//! Error types for the red packet engine.
//!
//! This module defines the central `Error` enum, which captures every
//! reportable failure of the engine. Claiming an unknown or exhausted packet is
//! deliberately *not* represented here: it is a normal outcome and surfaces as
//! a claimed amount of `0`.
//!
//! ## Error Cases
//! - `InvalidRequest`: Creation parameters failed validation. Nothing was
//!   registered.
//! - `ChannelError`: An internal communication failure between a caller and a
//!   shard worker.
//! - `ClaimTimeout`: The caller stopped waiting for a claim. The share may
//!   still have been consumed by the worker.
//! - `ServiceShutdown`: A claim arrived while the service was shutting down.

use crate::types::PacketId;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the red packet engine.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The request was malformed or violated a creation constraint.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Internal channel send/receive failure (e.g. a shard worker has exited).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The caller's deadline expired before the shard worker replied.
    #[error("Claim on packet {packet_id} timed out")]
    ClaimTimeout { packet_id: PacketId },

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}
