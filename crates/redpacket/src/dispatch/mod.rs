//! Sharded single-writer dispatch.
//!
//! ## Structure
//!
//! - [`pool`] - [`ShardPool`](pool::ShardPool): owns every shard queue, routes
//!   by packet id and coordinates shutdown.
//! - [`worker`] - The per-shard event loop that extracts shares.
//! - [`request`] - Messages understood by shard workers.

pub mod pool;
pub mod request;
pub mod worker;
