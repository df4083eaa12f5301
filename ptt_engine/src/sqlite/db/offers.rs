//! Discount offers made by funders on the marketplace.
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{DiscountOffer, Money, OfferStatus},
    traits::PttFlowError,
};

pub async fn insert_offer(
    ptt_id: i64,
    funder_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<DiscountOffer, sqlx::Error> {
    let offer: DiscountOffer = sqlx::query_as(
        "INSERT INTO discount_offers (ptt_id, funder_org, offer_amount) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(ptt_id)
    .bind(funder_id)
    .bind(amount)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Offer #{} of {amount} by org #{funder_id} on PTT #{ptt_id}", offer.id);
    Ok(offer)
}

pub async fn fetch_offer(offer_id: i64, conn: &mut SqliteConnection) -> Result<Option<DiscountOffer>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM discount_offers WHERE id = $1").bind(offer_id).fetch_optional(conn).await
}

pub async fn fetch_offers_for_ptt(ptt_id: i64, conn: &mut SqliteConnection) -> Result<Vec<DiscountOffer>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM discount_offers WHERE ptt_id = $1 ORDER BY id ASC").bind(ptt_id).fetch_all(conn).await
}

/// Closes an `open` offer with the given status.
pub async fn close_offer(
    offer_id: i64,
    status: OfferStatus,
    conn: &mut SqliteConnection,
) -> Result<DiscountOffer, PttFlowError> {
    let offer: Option<DiscountOffer> = sqlx::query_as(
        r#"
            UPDATE discount_offers SET status = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND status = 'open'
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(offer_id)
    .fetch_optional(conn)
    .await?;
    offer.ok_or(PttFlowError::OfferNotOpen(offer_id))
}

/// Rejects every other open offer on the token, returning their ids.
pub async fn reject_competing_offers(
    ptt_id: i64,
    accepted_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
            UPDATE discount_offers SET status = 'rejected', updated_at = CURRENT_TIMESTAMP
            WHERE ptt_id = $1 AND id <> $2 AND status = 'open'
            RETURNING id;
        "#,
    )
    .bind(ptt_id)
    .bind(accepted_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Rejects every open offer on the token. Used once the token can no longer be discounted.
pub async fn reject_open_offers(ptt_id: i64, conn: &mut SqliteConnection) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
            UPDATE discount_offers SET status = 'rejected', updated_at = CURRENT_TIMESTAMP
            WHERE ptt_id = $1 AND status = 'open'
            RETURNING id;
        "#,
    )
    .bind(ptt_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
