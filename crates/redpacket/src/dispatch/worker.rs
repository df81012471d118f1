use super::request::ShardRequest;
use crate::{
    store::PacketStore,
    types::{Amount, PacketId},
};
use rand::Rng;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Shard worker task responsible for processing [`ShardRequest`] messages.
///
/// The worker is the only writer for every packet whose id maps to
/// `shard_id`, which is what makes claims on the same packet race-free
/// without a per-packet lock. It owns its own RNG for picking shares.
///
/// Designed to be spawned as a Tokio task. Runs until a
/// [`ShardRequest::Shutdown`] is received or every sender is dropped.
pub async fn worker_loop<R>(
    shard_id: usize,
    mut rx: mpsc::UnboundedReceiver<ShardRequest>,
    store: Arc<PacketStore>,
    mut rng: R,
) where
    R: Rng + Send,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Shard {shard_id} started");

    while let Some(request) = rx.recv().await {
        match request {
            ShardRequest::Claim {
                packet_id,
                claimant_id: _claimant_id,
                response,
            } => {
                let amount = claim_share(&store, packet_id, &mut rng);

                #[cfg(feature = "tracing")]
                tracing::debug!(
                    shard_id,
                    packet_id,
                    claimant_id = _claimant_id,
                    amount,
                    "Claim served"
                );

                // The share stays consumed even if the caller stopped waiting.
                if response.send(amount).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        "Shard {shard_id} dropped reply for packet {packet_id} ({amount} consumed)"
                    );
                }
            }
            ShardRequest::Shutdown { response } => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Shard {shard_id} received shutdown signal");

                if response.send(()).is_err() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Shard {shard_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Shard {shard_id} stopped");
}

/// Removes one uniformly random share from `packet_id` and returns it.
///
/// Returns `0` if the packet is unknown or already exhausted. The packet is
/// removed from the store once its last share is taken.
///
/// Must only be called by the worker owning `packet_id`.
pub(crate) fn claim_share<R>(store: &PacketStore, packet_id: PacketId, rng: &mut R) -> Amount
where
    R: Rng + ?Sized,
{
    store.take_share(packet_id, rng).unwrap_or(0)
}
