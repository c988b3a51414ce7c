use chrono::{DateTime, Utc};
use hw_common::{GeoPoint, Money};
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{BaggageType, DealId, NewParcel, OfferId, Parcel, ParcelId, ParcelPatch},
    traits::{DealMarketError, DealQueryError},
};

#[derive(Debug, Clone, FromRow)]
struct ParcelRow {
    id: ParcelId,
    client_id: String,
    description: Option<String>,
    baggage_types: String,
    address_from: String,
    address_to: String,
    lat_from: f64,
    lng_from: f64,
    lat_to: f64,
    lng_to: f64,
    departure_date: DateTime<Utc>,
    declared_value: Money,
    offer_id: Option<OfferId>,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl ParcelRow {
    fn into_parcel(self) -> Result<Parcel, DealQueryError> {
        let baggage_types: Vec<BaggageType> = serde_json::from_str(&self.baggage_types)
            .map_err(|e| DealQueryError::CorruptRecord(format!("parcel [{}] baggage profile: {e}", self.id)))?;
        Ok(Parcel {
            id: self.id,
            client_id: self.client_id,
            description: self.description,
            baggage_types,
            address_from: self.address_from,
            address_to: self.address_to,
            location_from: GeoPoint { lat: self.lat_from, lng: self.lng_from },
            location_to: GeoPoint { lat: self.lat_to, lng: self.lng_to },
            departure_date: self.departure_date,
            declared_value: self.declared_value,
            offer_id: self.offer_id,
            created_at: self.created_at,
            last_modified: self.last_modified,
        })
    }
}

fn into_parcels(rows: Vec<ParcelRow>) -> Result<Vec<Parcel>, DealQueryError> {
    rows.into_iter().map(ParcelRow::into_parcel).collect()
}

pub async fn insert_parcel(parcel: NewParcel, conn: &mut SqliteConnection) -> Result<Parcel, DealMarketError> {
    let baggage = serde_json::to_string(&parcel.baggage_types)
        .map_err(|e| DealMarketError::ValidationError(format!("baggage profile: {e}")))?;
    let now = Utc::now();
    let row: ParcelRow = sqlx::query_as(
        r#"
            INSERT INTO parcels (
                id,
                client_id,
                description,
                baggage_types,
                address_from,
                address_to,
                lat_from,
                lng_from,
                lat_to,
                lng_to,
                departure_date,
                declared_value,
                created_at,
                last_modified
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING *;
        "#,
    )
    .bind(ParcelId::new())
    .bind(parcel.client_id)
    .bind(parcel.description)
    .bind(baggage)
    .bind(parcel.address_from)
    .bind(parcel.address_to)
    .bind(parcel.location_from.lat)
    .bind(parcel.location_from.lng)
    .bind(parcel.location_to.lat)
    .bind(parcel.location_to.lng)
    .bind(parcel.departure_date)
    .bind(parcel.declared_value)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row.into_parcel()?)
}

pub async fn fetch_parcel(id: &ParcelId, conn: &mut SqliteConnection) -> Result<Option<Parcel>, DealQueryError> {
    let row: Option<ParcelRow> =
        sqlx::query_as("SELECT * FROM parcels WHERE id = $1").bind(id.as_str()).fetch_optional(conn).await?;
    row.map(ParcelRow::into_parcel).transpose()
}

/// Replaces the describable fields and stamps `last_modified`. The `client_id` and `offer_id`
/// columns are deliberately absent from the SET clause.
pub async fn update_parcel(
    id: &ParcelId,
    patch: ParcelPatch,
    conn: &mut SqliteConnection,
) -> Result<Parcel, DealMarketError> {
    let baggage = serde_json::to_string(&patch.baggage_types)
        .map_err(|e| DealMarketError::ValidationError(format!("baggage profile: {e}")))?;
    let row: Option<ParcelRow> = sqlx::query_as(
        r#"
            UPDATE parcels SET
                description = $2,
                baggage_types = $3,
                address_from = $4,
                address_to = $5,
                lat_from = $6,
                lng_from = $7,
                lat_to = $8,
                lng_to = $9,
                departure_date = $10,
                declared_value = $11,
                last_modified = $12
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(patch.description)
    .bind(baggage)
    .bind(patch.address_from)
    .bind(patch.address_to)
    .bind(patch.location_from.lat)
    .bind(patch.location_from.lng)
    .bind(patch.location_to.lat)
    .bind(patch.location_to.lng)
    .bind(patch.departure_date)
    .bind(patch.declared_value)
    .bind(Utc::now())
    .fetch_optional(conn)
    .await?;
    let row = row.ok_or_else(|| DealMarketError::ParcelNotFound(id.clone()))?;
    Ok(row.into_parcel()?)
}

pub async fn fetch_parcels_for_client(
    client_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Parcel>, DealQueryError> {
    let rows: Vec<ParcelRow> = sqlx::query_as("SELECT * FROM parcels WHERE client_id = $1 ORDER BY created_at DESC")
        .bind(client_id)
        .fetch_all(conn)
        .await?;
    into_parcels(rows)
}

/// The parcels linked (through their offer back-reference) to the given deal. Offer ids are
/// only unique per deal, so the join carries the deal filter.
pub async fn fetch_parcels_for_deal(deal_id: &DealId, conn: &mut SqliteConnection) -> Result<Vec<Parcel>, DealQueryError> {
    let rows: Vec<ParcelRow> = sqlx::query_as(
        r#"
            SELECT p.* FROM parcels p
            INNER JOIN offers o ON o.id = p.offer_id AND o.parcel_id = p.id
            WHERE o.deal_id = $1
            ORDER BY p.created_at ASC;
        "#,
    )
    .bind(deal_id.as_str())
    .fetch_all(conn)
    .await?;
    into_parcels(rows)
}

/// Writes the offer back-reference. This is the parcel half of the link protocol.
pub async fn set_offer_link(
    parcel_id: &ParcelId,
    offer_id: &OfferId,
    conn: &mut SqliteConnection,
) -> Result<Parcel, DealMarketError> {
    let row: Option<ParcelRow> =
        sqlx::query_as("UPDATE parcels SET offer_id = $2, last_modified = $3 WHERE id = $1 RETURNING *")
            .bind(parcel_id.as_str())
            .bind(offer_id.as_str())
            .bind(Utc::now())
            .fetch_optional(conn)
            .await?;
    let row = row.ok_or_else(|| DealMarketError::ParcelNotFound(parcel_id.clone()))?;
    Ok(row.into_parcel()?)
}
