use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Deal, DealId, NewDeal, NewOffer, Offer, OfferId, Parcel, ParcelId, RoutePatch},
    traits::DealQueryError,
    transitions::{OfferMatcher, Transition},
};

/// This trait defines the write-path behaviour for backends supporting the Haulway engine.
///
/// This behaviour includes:
/// * Creating deals and appending offers to them.
/// * Applying status transitions, either to every embedded offer or to the offers picked out by
///   a match predicate, atomically with the deal's own status.
/// * The parcel side of the two-write link protocol.
/// * The timed advance of deals whose departure has elapsed.
#[allow(async_fn_in_trait)]
pub trait DealMarketDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a brand-new deal with `BeingFormed` status and no offers, returning the stored
    /// record. The route-overlap conflict check happens above this call, in the flow API.
    async fn create_deal(&self, deal: NewDeal) -> Result<Deal, DealMarketError>;

    /// Replaces the deal's route fields and stamps `last_modified`. As a side effect the deal
    /// status is forced back to `BeingFormed`. The embedded offers are never touched.
    ///
    /// Returns the updated deal, or `DealNotFound`.
    async fn update_route(&self, id: &DealId, patch: RoutePatch) -> Result<Deal, DealMarketError>;

    /// Appends one offer to the deal's embedded sequence, assigning it a fresh offer id and
    /// timestamps. Sibling offers are untouched. Returns the stored offer.
    async fn insert_offer(&self, deal_id: &DealId, offer: NewOffer) -> Result<Offer, DealMarketError>;

    /// Applies `transition` to the deal and every embedded offer in one atomic write: the deal
    /// status (when the transition carries one), every offer's status, and both `last_modified`
    /// stamps. Returns the updated deal.
    async fn apply_to_all_offers(&self, deal_id: &DealId, transition: Transition) -> Result<Deal, DealMarketError>;

    /// Applies `transition` to the deal and only the embedded offers matching `matcher`, in one
    /// atomic write. Offers that do not match are byte-for-byte unchanged. Returns the updated
    /// deal; fails with `OfferNotFound` when nothing matches.
    async fn apply_to_matched_offers(
        &self,
        deal_id: &DealId,
        matcher: &OfferMatcher,
        transition: Transition,
    ) -> Result<Deal, DealMarketError>;

    /// Sets the parcel's offer back-reference. This is the second, independent write of the
    /// link protocol; it is **not** atomic with any deal write.
    async fn set_parcel_offer_link(&self, parcel_id: &ParcelId, offer_id: &OfferId)
        -> Result<Parcel, DealMarketError>;

    /// Advances every deal whose departure time has elapsed and whose status is still
    /// `BeingFormed` to `OnMyWay`, returning the deals that changed. Idempotent: a second run
    /// with the same `now` changes nothing and returns an empty vector.
    async fn advance_elapsed_deals(&self, now: DateTime<Utc>) -> Result<Vec<Deal>, DealMarketError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), DealMarketError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum DealMarketError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("The requested deal {0} does not exist")]
    DealNotFound(DealId),
    #[error("No offer in the deal matches the given predicate")]
    OfferNotFound(DealId),
    #[error("The requested parcel {0} does not exist")]
    ParcelNotFound(ParcelId),
    #[error("The transporter already has a deal with an equal or overlapping route window: {0}")]
    OverlappingDeal(DealId),
    #[error("Parcel {0} is already linked to an offer")]
    ParcelAlreadyLinked(ParcelId),
    #[error("Parcel {0} does not belong to the requesting client")]
    NotParcelOwner(ParcelId),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("{0}")]
    QueryError(#[from] DealQueryError),
    #[error("{0} is not supported")]
    UnsupportedAction(String),
}

impl From<sqlx::Error> for DealMarketError {
    fn from(e: sqlx::Error) -> Self {
        DealMarketError::DatabaseError(e.to_string())
    }
}
