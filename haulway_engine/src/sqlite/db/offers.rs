use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{DealActuality, DealId, NewOffer, Offer, OfferId, OfferStatus},
    transitions::OfferMatcher,
};

#[derive(Debug, FromRow)]
struct OfferWithDeal {
    deal_id: DealId,
    #[sqlx(flatten)]
    offer: Offer,
}

const OFFER_COLUMNS: &str = "id, client_id, parcel_id, status, origin, amount, created_at, last_modified";

/// Returns the deal's embedded offers in insertion order.
pub async fn fetch_offers_for_deal(deal_id: &DealId, conn: &mut SqliteConnection) -> Result<Vec<Offer>, sqlx::Error> {
    let offers =
        sqlx::query_as(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE deal_id = $1 ORDER BY rowid ASC"))
            .bind(deal_id.as_str())
            .fetch_all(conn)
            .await?;
    Ok(offers)
}

pub async fn fetch_offer(
    deal_id: &DealId,
    offer_id: &OfferId,
    conn: &mut SqliteConnection,
) -> Result<Option<Offer>, sqlx::Error> {
    let offer = sqlx::query_as(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE deal_id = $1 AND id = $2"))
        .bind(deal_id.as_str())
        .bind(offer_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(offer)
}

/// Looks an offer up by id alone. Ids are UUIDs, so at most one row matches in practice.
pub async fn find_offer(offer_id: &OfferId, conn: &mut SqliteConnection) -> Result<Option<(DealId, Offer)>, sqlx::Error> {
    let row: Option<OfferWithDeal> =
        sqlx::query_as(&format!("SELECT deal_id, {OFFER_COLUMNS} FROM offers WHERE id = $1 LIMIT 1"))
            .bind(offer_id.as_str())
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|r| (r.deal_id, r.offer)))
}

/// The client's offers across deals in the given actuality group, newest first.
pub async fn fetch_offers_for_client(
    client_id: &str,
    actuality: DealActuality,
    conn: &mut SqliteConnection,
) -> Result<Vec<(DealId, Offer)>, sqlx::Error> {
    let statuses = actuality.statuses().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
    let sql = format!(
        r#"
            SELECT o.deal_id, o.id, o.client_id, o.parcel_id, o.status, o.origin, o.amount, o.created_at, o.last_modified
            FROM offers o
            INNER JOIN deals d ON d.id = o.deal_id
            WHERE o.client_id = $1 AND d.status IN ({statuses})
            ORDER BY o.created_at DESC;
        "#
    );
    trace!("🗃️ Executing query: {sql}");
    let rows: Vec<OfferWithDeal> = sqlx::query_as(&sql).bind(client_id).fetch_all(conn).await?;
    Ok(rows.into_iter().map(|r| (r.deal_id, r.offer)).collect())
}

/// Appends one offer to the deal, assigning a fresh offer id and timestamps.
pub async fn insert_offer(deal_id: &DealId, offer: NewOffer, conn: &mut SqliteConnection) -> Result<Offer, sqlx::Error> {
    let now = Utc::now();
    let stored = sqlx::query_as(&format!(
        r#"
            INSERT INTO offers (deal_id, id, client_id, parcel_id, status, origin, amount, created_at, last_modified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {OFFER_COLUMNS};
        "#
    ))
    .bind(deal_id.as_str())
    .bind(OfferId::new())
    .bind(offer.client_id)
    .bind(offer.parcel_id)
    .bind(offer.status.to_string())
    .bind(offer.origin.to_string())
    .bind(offer.amount)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(stored)
}

/// Stamps every offer of the deal with `status`. Returns the number of offers touched.
pub async fn update_all_statuses(
    deal_id: &DealId,
    status: OfferStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE offers SET status = $1, last_modified = $2 WHERE deal_id = $3")
        .bind(status.to_string())
        .bind(now)
        .bind(deal_id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Stamps only the offers picked out by `matcher`. Siblings are not written at all. Returns the
/// number of offers touched, which is zero when nothing matched.
pub async fn update_matched_statuses(
    deal_id: &DealId,
    matcher: &OfferMatcher,
    status: OfferStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let (column, value) = match matcher {
        OfferMatcher::ById(id) => ("id", id.as_str().to_string()),
        OfferMatcher::ByParcel(id) => ("parcel_id", id.as_str().to_string()),
        OfferMatcher::ByClient(client_id) => ("client_id", client_id.clone()),
    };
    let sql = format!("UPDATE offers SET status = $1, last_modified = $2 WHERE deal_id = $3 AND {column} = $4");
    trace!("🗃️ Executing query: {sql}");
    let result = sqlx::query(&sql)
        .bind(status.to_string())
        .bind(now)
        .bind(deal_id.as_str())
        .bind(value)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
