//! Fixed pool of single-writer shard workers.
//!
//! This module defines the [`ShardPool`] struct, which owns the inbound queue
//! of every shard worker. Unlike a round-robin pool, requests are routed by
//! packet id: a packet always maps to the same shard, so exactly one worker
//! ever mutates it.
//!
//! Each worker listens on its own unbounded [`mpsc::UnboundedReceiver`] and
//! serves requests strictly in arrival order. Unrelated packets that map to
//! the same shard are served one after another.

use super::{request::ShardRequest, worker::worker_loop};
use crate::{
    error::{Error, Result},
    store::PacketStore,
    types::PacketId,
};
use core::time::Duration;
use rand::{SeedableRng, rngs::StdRng};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

pub struct ShardPool {
    shards: Vec<mpsc::UnboundedSender<ShardRequest>>,
    shutdown_token: CancellationToken,
    shutdown_timeout: Duration,
}

impl ShardPool {
    /// Constructs a new [`ShardPool`] from initialized shard channels and a
    /// shared cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `shards` is empty.
    pub fn new(
        shards: Vec<mpsc::UnboundedSender<ShardRequest>>,
        shutdown_token: CancellationToken,
        shutdown_timeout: Duration,
    ) -> Result<Self> {
        if shards.is_empty() {
            return Err(Error::invalid("A shard pool needs at least one shard"));
        }
        Ok(Self {
            shards,
            shutdown_token,
            shutdown_timeout,
        })
    }

    /// Spawns `num_shards` worker tasks over `store` and returns the pool
    /// feeding them.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `num_shards` is zero. No worker is
    /// spawned then.
    pub fn spawn(
        num_shards: usize,
        store: &Arc<PacketStore>,
        shutdown_timeout: Duration,
    ) -> Result<Self> {
        if num_shards == 0 {
            return Err(Error::invalid("A shard pool needs at least one shard"));
        }

        let mut shards = Vec::with_capacity(num_shards);
        let mut seed_rng = rand::rng();

        for shard_id in 0..num_shards {
            let (tx, rx) = mpsc::unbounded_channel();
            shards.push(tx);

            let rng = StdRng::from_rng(&mut seed_rng);
            tokio::spawn(worker_loop(shard_id, rx, Arc::clone(store), rng));
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Spawned {num_shards} shard workers");

        Self::new(shards, CancellationToken::new(), shutdown_timeout)
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Returns the shard that owns `packet_id`.
    pub fn shard_index(&self, packet_id: PacketId) -> usize {
        packet_id as usize % self.shards.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Enqueues `request` on the shard owning `packet_id`.
    ///
    /// Never waits: shard queues are unbounded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The service is shutting down (`shutdown_token` was cancelled).
    /// - The shard's channel is closed.
    pub fn send_to_shard(&self, packet_id: PacketId, request: ShardRequest) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let shard_idx = self.shard_index(packet_id);
        self.shards[shard_idx]
            .send(request)
            .map_err(|_| Error::ChannelError {
                context: format!("Shard {shard_idx} channel closed"),
            })
    }

    /// Gracefully shuts down all shard workers.
    ///
    /// - Cancels the shared [`CancellationToken`] to refuse new claims.
    /// - Sends a [`ShardRequest::Shutdown`] to each shard. It queues behind
    ///   every claim already accepted, so those are still served.
    /// - Waits (up to `shutdown_timeout` per shard) for acknowledgements.
    pub async fn shutdown(&self) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::info!("Refusing new claims");
        self.shutdown_token.cancel();

        #[cfg(feature = "tracing")]
        tracing::debug!("Notifying all shards to shut down");
        let mut shutdown_handles = Vec::with_capacity(self.shards.len());

        for (i, shard) in self.shards.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if let Err(_e) = shard.send(ShardRequest::Shutdown { response: tx }) {
                #[cfg(feature = "tracing")]
                tracing::debug!("Shard {i} already stopped: {_e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        let shutdown_timeout = self.shutdown_timeout;
        let timeout_futures = shutdown_handles.into_iter().map(|(_i, rx)| async move {
            match timeout(shutdown_timeout, rx).await {
                Ok(Ok(())) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Shard {_i} shutdown acknowledged");
                }
                Ok(Err(_e)) => {
                    #[cfg(feature = "tracing")]
                    tracing::error!("Shard {_i} returned error: {_e}");
                }
                Err(_) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Shard {_i} shutdown timed out");
                }
            }
        });

        futures::future::join_all(timeout_futures).await;

        #[cfg(feature = "tracing")]
        tracing::info!("Shard pool shutdown complete");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Packet;

    fn claim_request(packet_id: PacketId) -> (ShardRequest, oneshot::Receiver<u64>) {
        let (response, rx) = oneshot::channel();
        let request = ShardRequest::Claim {
            packet_id,
            claimant_id: 1,
            response,
        };
        (request, rx)
    }

    #[test]
    fn routes_by_modulo() {
        let shards = (0..16).map(|_| mpsc::unbounded_channel().0).collect();
        let pool =
            ShardPool::new(shards, CancellationToken::new(), Duration::from_secs(1)).unwrap();
        assert_eq!(pool.num_shards(), 16);
        assert_eq!(pool.shard_index(0), 0);
        assert_eq!(pool.shard_index(17), 1);
        assert_eq!(pool.shard_index(u32::MAX), 15);
    }

    #[test]
    fn same_packet_always_lands_on_same_queue() {
        let mut receivers = Vec::new();
        let mut senders = Vec::new();
        for _ in 0..4 {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            receivers.push(rx);
        }
        let pool =
            ShardPool::new(senders, CancellationToken::new(), Duration::from_secs(1)).unwrap();

        for _ in 0..3 {
            let (request, _rx) = claim_request(6);
            pool.send_to_shard(6, request).unwrap();
        }
        let queued: Vec<_> = receivers.iter().map(|rx| rx.len()).collect();
        assert_eq!(queued, vec![0, 0, 3, 0]);
    }

    #[test]
    fn closed_shard_is_a_channel_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let pool =
            ShardPool::new(vec![tx], CancellationToken::new(), Duration::from_secs(1)).unwrap();
        let (request, _rx) = claim_request(1);
        assert!(matches!(
            pool.send_to_shard(1, request),
            Err(Error::ChannelError { .. })
        ));
    }

    #[tokio::test]
    async fn empty_pool_is_rejected() {
        let result = ShardPool::new(Vec::new(), CancellationToken::new(), Duration::from_secs(1));
        assert!(matches!(result, Err(Error::InvalidRequest { .. })));

        let store = Arc::new(PacketStore::new());
        let result = ShardPool::spawn(0, &store, Duration::from_secs(1));
        assert!(matches!(result, Err(Error::InvalidRequest { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shutdown_serves_queued_claims_then_refuses() {
        let store = Arc::new(PacketStore::new());
        store.register(2, Packet::new(1, vec![3, 4, 5])).unwrap();
        let pool = ShardPool::spawn(2, &store, Duration::from_secs(1)).unwrap();

        let replies: Vec<_> = (0..3)
            .map(|_| {
                let (request, rx) = claim_request(2);
                pool.send_to_shard(2, request).unwrap();
                rx
            })
            .collect();

        pool.shutdown().await.unwrap();
        assert!(pool.is_shutting_down());

        let mut claimed = Vec::new();
        for rx in replies {
            claimed.push(rx.await.unwrap());
        }
        claimed.sort_unstable();
        assert_eq!(claimed, vec![3, 4, 5]);

        let (request, _rx) = claim_request(2);
        assert_eq!(pool.send_to_shard(2, request), Err(Error::ServiceShutdown));

        // A second shutdown finds every shard already stopped.
        pool.shutdown().await.unwrap();
    }
}
