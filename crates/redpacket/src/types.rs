//! # Shared packet types
//!
//! Every amount in the engine is expressed in integer minor currency units
//! (e.g. cents) using the single [`Amount`] type. Registration, replacement,
//! claims and snapshots all use it, so a share can never be read back with a
//! different representation than the one it was stored with.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Opaque packet identifier. Always non-zero for registered packets.
pub type PacketId = u32;

/// Integer amount in minor currency units.
pub type Amount = u64;

/// Identifier of the user who created a packet.
pub type OwnerId = u64;

/// Identifier of the user claiming a share.
pub type ClaimantId = u64;

/// A single red packet: a fixed total pre-split into a fixed number of shares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub owner_id: OwnerId,
    pub total_amount: Amount,
    pub share_count: usize,
    /// Unclaimed shares. Only the owning shard worker mutates this after
    /// registration.
    pub shares: Vec<Amount>,
}

impl Packet {
    /// Builds a freshly split packet whose shares are all still unclaimed.
    pub fn new(owner_id: OwnerId, shares: Vec<Amount>) -> Self {
        Self {
            owner_id,
            total_amount: shares.iter().sum(),
            share_count: shares.len(),
            shares,
        }
    }

    pub fn remaining_amount(&self) -> Amount {
        self.shares.iter().sum()
    }

    pub fn is_exhausted(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn summary(&self) -> PacketSummary {
        PacketSummary {
            owner_id: self.owner_id,
            total_amount: self.total_amount,
            share_count: self.share_count,
            remaining_count: self.shares.len(),
            remaining_amount: self.remaining_amount(),
        }
    }
}

/// Read-only diagnostic view of a live packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PacketSummary {
    pub owner_id: OwnerId,
    pub total_amount: Amount,
    pub share_count: usize,
    pub remaining_count: usize,
    pub remaining_amount: Amount,
}

/// Result of a successful packet creation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CreatedPacket {
    pub id: PacketId,
    /// Relative claim URL embedding the packet id.
    pub claim_url: String,
}

impl CreatedPacket {
    pub(crate) fn new(id: PacketId, owner_id: OwnerId, share_count: usize) -> Self {
        Self {
            id,
            claim_url: format!("/get?id={id}&uid={owner_id}&num={share_count}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_summary_tracks_remaining_shares() {
        let mut packet = Packet::new(7, vec![40, 50, 10]);
        assert_eq!(packet.total_amount, 100);
        assert_eq!(packet.share_count, 3);

        packet.shares.swap_remove(0);
        let summary = packet.summary();
        assert_eq!(summary.remaining_count, 2);
        assert_eq!(summary.remaining_amount, 60);
        assert_eq!(summary.total_amount, 100);
        assert!(!packet.is_exhausted());
    }

    #[test]
    fn claim_url_embeds_id() {
        let created = CreatedPacket::new(1_162_763_031, 1, 100);
        assert_eq!(created.claim_url, "/get?id=1162763031&uid=1&num=100");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn summary_serializes_with_field_names() {
        let summary = Packet::new(1, vec![3, 4]).summary();
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["remaining_amount"], 7);
        assert_eq!(json["remaining_count"], 2);
    }
}
