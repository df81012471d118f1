//! Process-scoped red packet service.
//!
//! [`PacketService`] owns the packet table, the shard pool and the claim
//! router. It is constructed once at startup and cloned into whatever layer
//! serves requests. Clones share the same state.

use crate::{
    config::ServiceConfig,
    dispatch::pool::ShardPool,
    error::{Error, Result},
    router::ClaimRouter,
    split,
    store::PacketStore,
    types::{Amount, ClaimantId, CreatedPacket, OwnerId, Packet, PacketId, PacketSummary},
};
use rand::Rng;
use std::{collections::BTreeMap, sync::Arc};

#[derive(Clone)]
pub struct PacketService {
    config: ServiceConfig,
    store: Arc<PacketStore>,
    pool: Arc<ShardPool>,
    router: ClaimRouter,
}

impl PacketService {
    /// Creates a new `PacketService` and spawns one worker task per shard.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `config` is invalid.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(PacketStore::new());
        let pool = Arc::new(ShardPool::spawn(
            config.num_shards,
            &store,
            config.shutdown_timeout,
        )?);
        let router = ClaimRouter::new(Arc::clone(&pool), config.claim_timeout);

        Ok(Self {
            config,
            store,
            pool,
            router,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Splits `total_amount` into `share_count` shares and registers a new
    /// packet under a fresh non-zero id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `owner_id` is zero or the amount
    /// cannot cover one minor unit per share. Nothing is registered then.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn create_packet(
        &self,
        owner_id: OwnerId,
        total_amount: Amount,
        share_count: usize,
    ) -> Result<CreatedPacket> {
        if owner_id < 1 {
            return Err(Error::invalid("Owner id must be greater than 0"));
        }
        let shares = split::split(total_amount, share_count)?;

        let mut rng = rand::rng();
        let mut packet = Packet::new(owner_id, shares);
        let id = loop {
            let id: PacketId = rng.random_range(1..=PacketId::MAX);
            match self.store.register(id, packet) {
                Ok(()) => break id,
                Err(rejected) => packet = rejected,
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(packet_id = id, "Packet registered");

        Ok(CreatedPacket::new(id, owner_id, share_count))
    }

    /// Claims one share of `packet_id` for `claimant_id`.
    ///
    /// Returns `0` when the packet is unknown or exhausted, or when either id
    /// is zero.
    ///
    /// # Errors
    ///
    /// Fails only for service-level problems: shutdown, a lost shard, or an
    /// expired claim timeout.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub async fn claim_packet(
        &self,
        packet_id: PacketId,
        claimant_id: ClaimantId,
    ) -> Result<Amount> {
        if packet_id < 1 || claimant_id < 1 {
            #[cfg(feature = "tracing")]
            tracing::debug!("Rejected claim with invalid ids");
            return Ok(0);
        }
        self.router.claim(packet_id, claimant_id).await
    }

    /// Snapshot of every live packet. Exhausted packets are not listed.
    pub fn list_packets(&self) -> BTreeMap<PacketId, PacketSummary> {
        self.store.snapshot()
    }

    pub fn packet(&self, packet_id: PacketId) -> Option<PacketSummary> {
        self.store.summary(packet_id)
    }

    /// Initiates a graceful shutdown of the shard pool.
    ///
    /// Claims accepted before shutdown are still served; later claims fail
    /// with [`Error::ServiceShutdown`].
    pub async fn shutdown(&self) -> Result<()> {
        self.pool.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use futures::future::join_all;

    fn service() -> PacketService {
        PacketService::new(ServiceConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn single_share_packet() {
        let service = service();
        let created = service.create_packet(1, 100, 1).unwrap();
        assert_ne!(created.id, 0);

        assert_eq!(service.claim_packet(created.id, 2).await, Ok(100));
        assert_eq!(service.claim_packet(created.id, 3).await, Ok(0));
    }

    #[tokio::test]
    async fn serial_claims_drain_total() {
        let service = service();
        let created = service.create_packet(1, 10_000, 37).unwrap();

        let mut sum = 0;
        for claimant in 1..=37 {
            let amount = service.claim_packet(created.id, claimant).await.unwrap();
            assert!(amount >= 1);
            sum += amount;
        }
        assert_eq!(sum, 10_000);
        assert_eq!(service.claim_packet(created.id, 38).await, Ok(0));
        assert!(service.list_packets().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_claims_are_a_permutation_of_the_split() {
        let service = service();
        let created = service.create_packet(9, 50_000, 200).unwrap();
        let mut expected = service.store.get(created.id).unwrap();

        let claims = (1..=200).map(|claimant| {
            let service = service.clone();
            tokio::spawn(async move { service.claim_packet(created.id, claimant).await })
        });
        let mut claimed: Vec<Amount> = join_all(claims)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();

        expected.sort_unstable();
        claimed.sort_unstable();
        assert_eq!(claimed, expected);
        assert_eq!(claimed.iter().sum::<Amount>(), 50_000);
        assert_eq!(service.claim_packet(created.id, 201).await, Ok(0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn oversubscribed_claims_never_exceed_total() {
        let service = service();
        let packets: Vec<_> = (0..8)
            .map(|_| service.create_packet(1, 1_000, 10).unwrap().id)
            .collect();

        let claims = packets.iter().flat_map(|&id| {
            (1..=15).map({
                let service = service.clone();
                move |claimant| {
                    let service = service.clone();
                    tokio::spawn(async move { (id, service.claim_packet(id, claimant).await) })
                }
            })
        });
        let results = join_all(claims).await;

        for &id in &packets {
            let amounts: Vec<Amount> = results
                .iter()
                .map(|r| r.as_ref().unwrap())
                .filter(|(packet_id, _)| *packet_id == id)
                .map(|(_, amount)| *amount.as_ref().unwrap())
                .collect();
            assert_eq!(amounts.iter().filter(|&&a| a > 0).count(), 10);
            assert_eq!(amounts.iter().sum::<Amount>(), 1_000);
        }
        assert!(service.list_packets().is_empty());
    }

    #[tokio::test]
    async fn list_packets_reports_remaining() {
        let service = service();
        let created = service.create_packet(5, 300, 3).unwrap();

        let before = service.list_packets()[&created.id];
        assert_eq!(before.remaining_count, 3);
        assert_eq!(before.remaining_amount, 300);
        assert_eq!(before.owner_id, 5);

        let amount = service.claim_packet(created.id, 1).await.unwrap();
        let after = service.packet(created.id).unwrap();
        assert_eq!(after.remaining_count, 2);
        assert_eq!(after.remaining_amount, 300 - amount);
    }

    #[tokio::test]
    async fn create_validation_registers_nothing() {
        let service = service();
        for (owner, total, count) in [(0, 100, 1), (1, 0, 1), (1, 100, 0), (1, 2, 3)] {
            assert!(matches!(
                service.create_packet(owner, total, count),
                Err(Error::InvalidRequest { .. })
            ));
        }
        assert!(service.list_packets().is_empty());
    }

    #[tokio::test]
    async fn invalid_claim_ids_claim_nothing() {
        let service = service();
        let created = service.create_packet(1, 10, 2).unwrap();
        assert_eq!(service.claim_packet(0, 1).await, Ok(0));
        assert_eq!(service.claim_packet(created.id, 0).await, Ok(0));
        assert_eq!(service.packet(created.id).unwrap().remaining_count, 2);
    }

    #[tokio::test]
    async fn claims_after_shutdown_are_refused() {
        let service = service();
        let created = service.create_packet(1, 10, 2).unwrap();
        service.shutdown().await.unwrap();
        assert_eq!(
            service.claim_packet(created.id, 1).await,
            Err(Error::ServiceShutdown)
        );
    }

    #[tokio::test]
    async fn configured_timeout_allows_prompt_claims() {
        let service = PacketService::new(ServiceConfig {
            claim_timeout: Some(Duration::from_secs(5)),
            ..ServiceConfig::default()
        })
        .unwrap();
        let created = service.create_packet(1, 3, 3).unwrap();
        assert_eq!(service.claim_packet(created.id, 1).await, Ok(1));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = PacketService::new(ServiceConfig {
            num_shards: 0,
            ..ServiceConfig::default()
        });
        assert!(matches!(result, Err(Error::InvalidRequest { .. })));
    }
}
