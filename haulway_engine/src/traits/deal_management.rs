use thiserror::Error;

use crate::{
    api::{DealQueryFilter, SearchCriteria},
    db_types::{Deal, DealActuality, DealId, Offer, OfferId},
};

/// The `DealManagement` trait is the read path of the deal collection. Every method is a pure
/// query; nothing here mutates.
#[allow(async_fn_in_trait)]
pub trait DealManagement {
    /// Fetches the deal with the given id, embedded offers included, in insertion order.
    /// Returns `None` if no deal with that id exists.
    async fn fetch_deal(&self, id: &DealId) -> Result<Option<Deal>, DealQueryError>;

    /// Returns every deal created by the given transporter, newest first.
    async fn deals_for_transporter(&self, transporter_id: &str) -> Result<Vec<Deal>, DealQueryError>;

    /// Returns deals matching the given filter. An empty filter matches everything.
    async fn search_deals(&self, filter: DealQueryFilter) -> Result<Vec<Deal>, DealQueryError>;

    /// Fetches a single embedded offer by deal and offer id.
    async fn fetch_offer(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<Option<Offer>, DealQueryError>;

    /// Looks an offer up by id alone, returning the parent deal id alongside it. Offer ids are
    /// minted as UUIDs so collisions across deals do not arise in practice; if one ever did,
    /// the first match wins.
    async fn find_offer(&self, offer_id: &OfferId) -> Result<Option<(DealId, Offer)>, DealQueryError>;

    /// Every offer the given client holds, restricted to deals in the given actuality group
    /// (still in play, or archived). Newest first.
    async fn offers_for_client(
        &self,
        client_id: &str,
        actuality: DealActuality,
    ) -> Result<Vec<(DealId, Offer)>, DealQueryError>;

    /// Returns active deals departing within the criteria's radius of the origin point, with a
    /// compatible baggage profile. When a departure bound is set it is exclusive. An empty
    /// result is a normal outcome, never an error.
    async fn find_departures_near(&self, criteria: &SearchCriteria) -> Result<Vec<Deal>, DealQueryError>;
}

#[derive(Debug, Clone, Error)]
pub enum DealQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Could not deserialize a stored record: {0}")]
    CorruptRecord(String),
}

impl From<sqlx::Error> for DealQueryError {
    fn from(e: sqlx::Error) -> Self {
        DealQueryError::DatabaseError(e.to_string())
    }
}
