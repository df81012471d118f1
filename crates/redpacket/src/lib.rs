//! # `redpacket`: concurrent lucky-money distribution
//!
//! A red packet is a fixed amount of money pre-split into a fixed number of
//! shares. Claimants race to take one share each; no share may be lost,
//! duplicated or handed out twice.
//!
//! ## Highlights
//!
//! - **Randomized split**: [`split`] produces exhaustive, strictly positive
//!   shares in one pass.
//! - **Single-writer shards**: every packet id maps to exactly one shard
//!   worker ([`dispatch`]), so no per-packet lock and no table-wide mutex are
//!   needed on the claim path.
//! - **One-shot replies**: callers await only their own claim
//!   ([`ClaimRouter`]), optionally under a deadline.
//! - **Graceful shutdown**: claims accepted before shutdown are always served.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use redpacket::{PacketService, ServiceConfig};
//!
//! # async fn run() -> redpacket::Result<()> {
//! let service = PacketService::new(ServiceConfig::default())?;
//! let packet = service.create_packet(1, 10_000, 10)?;
//! let amount = service.claim_packet(packet.id, 42).await?;
//! assert!(amount > 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! - `tracing`: emit `tracing` events and spans from the engine.
//! - `serde`: derive `Serialize`/`Deserialize` for snapshot types.

mod config;
pub mod dispatch;
mod error;
mod router;
mod service;
pub mod split;
mod store;
mod types;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::router::*;
pub use crate::service::*;
pub use crate::store::*;
pub use crate::types::*;
