//! Claim routing.
//!
//! [`ClaimRouter`] turns a claim into a [`ShardRequest::Claim`] on the shard
//! owning the packet and awaits the one-shot reply. Only the calling task is
//! suspended; other shards keep serving.

use crate::{
    dispatch::{pool::ShardPool, request::ShardRequest},
    error::{Error, Result},
    types::{Amount, ClaimantId, PacketId},
};
use core::time::Duration;
use std::sync::Arc;
use tokio::{sync::oneshot, time::timeout};

#[derive(Clone)]
pub struct ClaimRouter {
    pool: Arc<ShardPool>,
    claim_timeout: Option<Duration>,
}

impl ClaimRouter {
    pub const fn new(pool: Arc<ShardPool>, claim_timeout: Option<Duration>) -> Self {
        Self {
            pool,
            claim_timeout,
        }
    }

    /// Claims one share of `packet_id`, honouring the configured timeout.
    ///
    /// Returns `0` if the packet is unknown or exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] if the pool is shutting down.
    /// - [`Error::ChannelError`] if the shard is gone.
    /// - [`Error::ClaimTimeout`] if a timeout is configured and expired.
    pub async fn claim(&self, packet_id: PacketId, claimant_id: ClaimantId) -> Result<Amount> {
        match self.claim_timeout {
            Some(deadline) => {
                self.claim_with_deadline(packet_id, claimant_id, deadline)
                    .await
            }
            None => {
                let reply = self.submit(packet_id, claimant_id)?;
                Self::await_reply(packet_id, reply).await
            }
        }
    }

    /// Claims one share of `packet_id`, waiting at most `deadline`.
    ///
    /// On timeout the worker still completes the claim: the share may be
    /// consumed even though the caller receives [`Error::ClaimTimeout`].
    ///
    /// # Errors
    ///
    /// See [`ClaimRouter::claim`].
    pub async fn claim_with_deadline(
        &self,
        packet_id: PacketId,
        claimant_id: ClaimantId,
        deadline: Duration,
    ) -> Result<Amount> {
        let reply = self.submit(packet_id, claimant_id)?;
        match timeout(deadline, Self::await_reply(packet_id, reply)).await {
            Ok(result) => result,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(packet_id, ?deadline, "Claim timed out");
                Err(Error::ClaimTimeout { packet_id })
            }
        }
    }

    fn submit(
        &self,
        packet_id: PacketId,
        claimant_id: ClaimantId,
    ) -> Result<oneshot::Receiver<Amount>> {
        let (response, reply) = oneshot::channel();
        self.pool.send_to_shard(
            packet_id,
            ShardRequest::Claim {
                packet_id,
                claimant_id,
                response,
            },
        )?;
        Ok(reply)
    }

    async fn await_reply(packet_id: PacketId, reply: oneshot::Receiver<Amount>) -> Result<Amount> {
        reply.await.map_err(|_| Error::ChannelError {
            context: format!("Shard dropped reply for packet {packet_id}"),
        })
    }
}
