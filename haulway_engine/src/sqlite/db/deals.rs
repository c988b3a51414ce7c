use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{FromRow, QueryBuilder, SqliteConnection};

use crate::{
    api::{DealQueryFilter, SearchCriteria},
    db_types::{baggage_types_intersect, BaggageType, Deal, DealId, DealStatus, NewDeal, Offer, RoutePatch, Transport},
    sqlite::db::offers,
    traits::{DealMarketError, DealQueryError},
};
use hw_common::GeoPoint;

/// The raw `deals` row. Coordinates are stored as two REAL columns per point and the baggage
/// profile as a JSON array; [`DealRow::into_deal`] reassembles the domain type.
#[derive(Debug, Clone, FromRow)]
struct DealRow {
    id: DealId,
    transporter_id: String,
    status: DealStatus,
    description: Option<String>,
    transport: Transport,
    baggage_types: String,
    address_from: String,
    address_to: String,
    lat_from: f64,
    lng_from: f64,
    lat_to: f64,
    lng_to: f64,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_modified: DateTime<Utc>,
}

impl DealRow {
    fn into_deal(self, offers: Vec<Offer>) -> Result<Deal, DealQueryError> {
        let baggage_types: Vec<BaggageType> = serde_json::from_str(&self.baggage_types)
            .map_err(|e| DealQueryError::CorruptRecord(format!("deal [{}] baggage profile: {e}", self.id)))?;
        Ok(Deal {
            id: self.id,
            transporter_id: self.transporter_id,
            status: self.status,
            description: self.description,
            transport: self.transport,
            baggage_types,
            address_from: self.address_from,
            address_to: self.address_to,
            location_from: GeoPoint { lat: self.lat_from, lng: self.lng_from },
            location_to: GeoPoint { lat: self.lat_to, lng: self.lng_to },
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
            last_modified: self.last_modified,
            offers,
        })
    }
}

async fn assemble(row: DealRow, conn: &mut SqliteConnection) -> Result<Deal, DealQueryError> {
    let offers = offers::fetch_offers_for_deal(&row.id, conn).await?;
    row.into_deal(offers)
}

async fn assemble_all(rows: Vec<DealRow>, conn: &mut SqliteConnection) -> Result<Vec<Deal>, DealQueryError> {
    let mut deals = Vec::with_capacity(rows.len());
    for row in rows {
        deals.push(assemble(row, conn).await?);
    }
    Ok(deals)
}

/// Inserts a brand-new deal with `BeingFormed` status and no offers.
pub async fn insert_deal(deal: NewDeal, conn: &mut SqliteConnection) -> Result<Deal, DealMarketError> {
    let baggage = serde_json::to_string(&deal.baggage_types)
        .map_err(|e| DealMarketError::ValidationError(format!("baggage profile: {e}")))?;
    let now = Utc::now();
    let row: DealRow = sqlx::query_as(
        r#"
            INSERT INTO deals (
                id,
                transporter_id,
                status,
                description,
                transport,
                baggage_types,
                address_from,
                address_to,
                lat_from,
                lng_from,
                lat_to,
                lng_to,
                start_date,
                end_date,
                created_at,
                last_modified
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING *;
        "#,
    )
    .bind(DealId::new())
    .bind(deal.transporter_id)
    .bind(DealStatus::BeingFormed.to_string())
    .bind(deal.description)
    .bind(deal.transport)
    .bind(baggage)
    .bind(deal.address_from)
    .bind(deal.address_to)
    .bind(deal.location_from.lat)
    .bind(deal.location_from.lng)
    .bind(deal.location_to.lat)
    .bind(deal.location_to.lng)
    .bind(deal.start_date)
    .bind(deal.end_date)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(row.into_deal(Vec::new())?)
}

pub async fn fetch_deal(id: &DealId, conn: &mut SqliteConnection) -> Result<Option<Deal>, DealQueryError> {
    let row: Option<DealRow> =
        sqlx::query_as("SELECT * FROM deals WHERE id = $1").bind(id.as_str()).fetch_optional(&mut *conn).await?;
    match row {
        Some(row) => Ok(Some(assemble(row, conn).await?)),
        None => Ok(None),
    }
}

pub async fn fetch_deals_for_transporter(
    transporter_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<Deal>, DealQueryError> {
    let rows: Vec<DealRow> = sqlx::query_as("SELECT * FROM deals WHERE transporter_id = $1 ORDER BY created_at DESC")
        .bind(transporter_id)
        .fetch_all(&mut *conn)
        .await?;
    assemble_all(rows, conn).await
}

/// Fetches deals according to criteria specified in the `DealQueryFilter`.
///
/// Resulting deals are ordered by `start_date` in ascending order.
pub async fn search_deals(query: DealQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Deal>, DealQueryError> {
    let mut builder = QueryBuilder::new(
        r#"
    SELECT * FROM deals
    "#,
    );
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(transporter_id) = query.transporter_id {
        where_clause.push("transporter_id = ");
        where_clause.push_bind_unseparated(transporter_id);
    }
    if let Some(client_id) = query.client_id {
        where_clause.push("EXISTS (SELECT 1 FROM offers o WHERE o.deal_id = deals.id AND o.client_id = ");
        where_clause.push_bind_unseparated(client_id);
        where_clause.push_unseparated(")");
    }
    if let Some(parcel_id) = query.parcel_id {
        where_clause.push("EXISTS (SELECT 1 FROM offers o WHERE o.deal_id = deals.id AND o.parcel_id = ");
        where_clause.push_bind_unseparated(parcel_id.as_str().to_string());
        where_clause.push_unseparated(")");
    }
    if let Some(address_from) = query.address_from {
        where_clause.push("address_from = ");
        where_clause.push_bind_unseparated(address_from);
    }
    if let Some(address_to) = query.address_to {
        where_clause.push("address_to = ");
        where_clause.push_bind_unseparated(address_to);
    }
    if let Some(transport) = query.transport {
        where_clause.push("transport = ");
        where_clause.push_bind_unseparated(transport.to_string());
    }
    if let Some(after) = query.departing_after {
        where_clause.push("start_date >= ");
        where_clause.push_bind_unseparated(after);
    }
    if let Some(before) = query.departing_before {
        where_clause.push("start_date <= ");
        where_clause.push_bind_unseparated(before);
    }
    if let Some(statuses) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let statuses = statuses.iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
        where_clause.push(format!("status IN ({statuses})"));
    }
    builder.push(" ORDER BY start_date ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let rows: Vec<DealRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    assemble_all(rows, conn).await
}

/// Replaces the route fields, forces the status back to `BeingFormed` and stamps
/// `last_modified`. The offers table is not touched.
pub async fn update_route(id: &DealId, patch: RoutePatch, conn: &mut SqliteConnection) -> Result<Deal, DealMarketError> {
    let baggage = serde_json::to_string(&patch.baggage_types)
        .map_err(|e| DealMarketError::ValidationError(format!("baggage profile: {e}")))?;
    let row: Option<DealRow> = sqlx::query_as(
        r#"
            UPDATE deals SET
                status = $2,
                description = $3,
                transport = $4,
                baggage_types = $5,
                address_from = $6,
                address_to = $7,
                lat_from = $8,
                lng_from = $9,
                lat_to = $10,
                lng_to = $11,
                start_date = $12,
                end_date = $13,
                last_modified = $14
            WHERE id = $1
            RETURNING *;
        "#,
    )
    .bind(id.as_str())
    .bind(DealStatus::BeingFormed.to_string())
    .bind(patch.description)
    .bind(patch.transport)
    .bind(baggage)
    .bind(patch.address_from)
    .bind(patch.address_to)
    .bind(patch.location_from.lat)
    .bind(patch.location_from.lng)
    .bind(patch.location_to.lat)
    .bind(patch.location_to.lng)
    .bind(patch.start_date)
    .bind(patch.end_date)
    .bind(Utc::now())
    .fetch_optional(&mut *conn)
    .await?;
    let row = row.ok_or_else(|| DealMarketError::DealNotFound(id.clone()))?;
    Ok(assemble(row, conn).await?)
}

/// Sets the deal status and stamps `last_modified`. Returns `false` when no such deal exists.
pub(crate) async fn set_deal_status(
    id: &DealId,
    status: DealStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE deals SET status = $1, last_modified = $2 WHERE id = $3")
        .bind(status.to_string())
        .bind(now)
        .bind(id.as_str())
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Moves every `BeingFormed` deal whose departure is at or before `now` to `OnMyWay`,
/// returning the deals that changed. A second run with the same `now` is a no-op.
pub async fn advance_elapsed(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Deal>, DealMarketError> {
    let rows: Vec<DealRow> = sqlx::query_as(
        r#"
            UPDATE deals SET status = $1, last_modified = $2
            WHERE status = $3 AND start_date <= $2
            RETURNING *;
        "#,
    )
    .bind(DealStatus::OnMyWay.to_string())
    .bind(now)
    .bind(DealStatus::BeingFormed.to_string())
    .fetch_all(&mut *conn)
    .await?;
    Ok(assemble_all(rows, conn).await?)
}

/// The departure search. A bounding-box prefilter runs in SQL against the indexed
/// `(lat_from, lng_from)` pair; the exact great-circle distance and the baggage profile are
/// checked in Rust on the survivors.
pub async fn find_departures_near(
    criteria: &SearchCriteria,
    conn: &mut SqliteConnection,
) -> Result<Vec<Deal>, DealQueryError> {
    let (lat_min, lat_max, lng_min, lng_max) = criteria.origin.bounding_box_km(criteria.radius_km);
    let active =
        DealStatus::active_group().iter().map(|s| format!("'{s}'")).collect::<Vec<String>>().join(",");
    let mut builder = QueryBuilder::new(format!("SELECT * FROM deals WHERE status IN ({active})"));
    builder.push(" AND lat_from >= ");
    builder.push_bind(lat_min);
    builder.push(" AND lat_from <= ");
    builder.push_bind(lat_max);
    builder.push(" AND lng_from >= ");
    builder.push_bind(lng_min);
    builder.push(" AND lng_from <= ");
    builder.push_bind(lng_max);
    if let Some(after) = criteria.departing_after {
        // The bound is exclusive: a deal departing exactly at `after` does not match.
        builder.push(" AND start_date > ");
        builder.push_bind(after);
    }
    builder.push(" ORDER BY start_date ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let rows: Vec<DealRow> = builder.build_query_as().fetch_all(&mut *conn).await?;
    let candidates = assemble_all(rows, conn).await?;
    let matches = candidates
        .into_iter()
        .filter(|d| d.location_from.within_radius_km(&criteria.origin, criteria.radius_km))
        .filter(|d| {
            criteria.baggage_types.is_empty() || baggage_types_intersect(&d.baggage_types, &criteria.baggage_types)
        })
        .collect();
    Ok(matches)
}
