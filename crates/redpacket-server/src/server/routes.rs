//! HTTP routes.
//!
//! - `GET /` - every live packet as `{ "<id>": [remaining_count,
//!   remaining_amount] }`.
//! - `GET /set?uid=&money=&num=` - create a packet; `money` is in major
//!   currency units and may carry two decimals.
//! - `GET /get?id=&uid=` - claim one share.

use super::{
    error::ApiError,
    telemetry::{
        increment_claim_errors, increment_packets_created, record_claim, record_claim_duration,
    },
};
use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    routing::get,
};
use redpacket::{Amount, ClaimantId, OwnerId, PacketId, PacketService};
use serde::Deserialize;
use std::{collections::BTreeMap, time::Instant};
use tower_http::cors::{Any, CorsLayer};

/// Minor units per major currency unit.
const MINOR_UNITS: f64 = 100.0;

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    pub uid: OwnerId,
    pub money: f64,
    pub num: usize,
}

#[derive(Debug, Deserialize)]
pub struct ClaimParams {
    pub id: PacketId,
    pub uid: ClaimantId,
}

pub fn router(service: PacketService) -> Router {
    Router::new()
        .route("/", get(list_packets))
        .route("/set", get(create_packet))
        .route("/get", get(claim_packet))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}

async fn list_packets(
    State(service): State<PacketService>,
) -> Json<BTreeMap<PacketId, [Amount; 2]>> {
    let packets = service
        .list_packets()
        .into_iter()
        .map(|(id, summary)| {
            (
                id,
                [summary.remaining_count as Amount, summary.remaining_amount],
            )
        })
        .collect();
    Json(packets)
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
async fn create_packet(
    State(service): State<PacketService>,
    params: Result<Query<CreateParams>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadParams(e.body_text()))?;
    let total_amount = to_minor_units(params.money)?;

    let created = service.create_packet(params.uid, total_amount, params.num)?;
    increment_packets_created();

    #[cfg(feature = "tracing")]
    tracing::info!(
        packet_id = created.id,
        owner_id = params.uid,
        total_amount,
        share_count = params.num,
        "Packet created"
    );

    Ok(format!("{}\n", created.claim_url))
}

#[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
async fn claim_packet(
    State(service): State<PacketService>,
    params: Result<Query<ClaimParams>, QueryRejection>,
) -> Result<String, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadParams(e.body_text()))?;

    let start = Instant::now();
    let amount = service
        .claim_packet(params.id, params.uid)
        .await
        .inspect_err(|_e| {
            increment_claim_errors();
            #[cfg(feature = "tracing")]
            tracing::warn!(packet_id = params.id, "Claim failed: {_e}");
        })?;
    record_claim_duration(start.elapsed().as_secs_f64() * 1_000.0);
    record_claim(amount);

    if amount == 0 {
        Ok(format!("Sorry, nothing left to claim in packet {}\n", params.id))
    } else {
        Ok(format!("Congratulations, you claimed {amount}\n"))
    }
}

/// Converts a major-unit amount into minor units, rounding to the nearest
/// unit.
fn to_minor_units(money: f64) -> Result<Amount, ApiError> {
    let minor = (money * MINOR_UNITS).round();
    if !minor.is_finite() || minor < 0.0 || minor > Amount::MAX as f64 {
        return Err(ApiError::BadParams(format!("money out of range: {money}")));
    }
    Ok(minor as Amount)
}
