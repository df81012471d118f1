//! Concurrent packet table.
//!
//! [`PacketStore`] is a sharded concurrent map: operations on different
//! packet ids only contend when they hash to the same internal shard, and
//! never on a table-wide lock. It does not order mutations of the same
//! packet: after registration, a packet's shares must only be taken,
//! replaced or removed by the shard worker that owns its identifier.

use crate::types::{Amount, Packet, PacketId, PacketSummary};
use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct PacketStore {
    packets: DashMap<PacketId, Packet>,
}

impl PacketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `packet` under `id` if no live packet uses that id.
    ///
    /// # Errors
    ///
    /// Hands `packet` back, leaving the existing packet untouched, if `id` is
    /// already taken.
    pub fn register(&self, id: PacketId, packet: Packet) -> Result<(), Packet> {
        match self.packets.entry(id) {
            Entry::Occupied(_) => Err(packet),
            Entry::Vacant(slot) => {
                slot.insert(packet);
                Ok(())
            }
        }
    }

    /// Returns a copy of the unclaimed shares of packet `id`.
    pub fn get(&self, id: PacketId) -> Option<Vec<Amount>> {
        self.packets.get(&id).map(|p| p.shares.clone())
    }

    /// Removes one uniformly random share of packet `id` in place and returns
    /// it, dropping the packet once its last share is gone.
    ///
    /// Returns `None` if the packet is unknown or already exhausted.
    pub(crate) fn take_share<R>(&self, id: PacketId, rng: &mut R) -> Option<Amount>
    where
        R: Rng + ?Sized,
    {
        let (amount, exhausted) = {
            let mut packet = self.packets.get_mut(&id)?;
            let amount = if packet.shares.is_empty() {
                None
            } else {
                let index = rng.random_range(0..packet.shares.len());
                Some(packet.shares.swap_remove(index))
            };
            (amount, packet.shares.is_empty())
        };

        // The entry guard must be released before removing from the same map.
        if exhausted {
            self.packets.remove(&id);
        }
        amount
    }

    /// Overwrites the unclaimed shares of a live packet.
    ///
    /// Returns `false` if `id` is not registered.
    pub fn replace(&self, id: PacketId, shares: Vec<Amount>) -> bool {
        match self.packets.get_mut(&id) {
            Some(mut packet) => {
                packet.shares = shares;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: PacketId) -> Option<Packet> {
        self.packets.remove(&id).map(|(_, packet)| packet)
    }

    pub fn contains(&self, id: PacketId) -> bool {
        self.packets.contains_key(&id)
    }

    pub fn summary(&self, id: PacketId) -> Option<PacketSummary> {
        self.packets.get(&id).map(|p| p.summary())
    }

    /// View of every live packet, ordered by id.
    ///
    /// Each entry is read under its own shard lock, so the view is consistent
    /// per packet but not across packets.
    pub fn snapshot(&self) -> BTreeMap<PacketId, PacketSummary> {
        self.packets
            .iter()
            .map(|entry| (*entry.key(), entry.value().summary()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}
