use crate::types::{Amount, ClaimantId, PacketId};
use tokio::sync::oneshot;

/// A message sent from the shard pool to an individual shard worker.
///
/// [`ShardRequest`]s are sent over unbounded channels and consumed by the
/// worker's main loop in arrival order.
#[derive(Debug)]
pub enum ShardRequest {
    /// Extract one random share from `packet_id`.
    ///
    /// - `claimant_id`: Who is claiming. Informational only.
    /// - `response`: Receives the claimed amount, or `0` if the packet is
    ///   unknown or exhausted.
    Claim {
        packet_id: PacketId,
        claimant_id: ClaimantId,
        response: oneshot::Sender<Amount>,
    },

    /// Request the worker to shut down once every earlier message is served.
    ///
    /// - `response`: One-shot channel acknowledging that the worker stopped.
    Shutdown { response: oneshot::Sender<()> },
}
