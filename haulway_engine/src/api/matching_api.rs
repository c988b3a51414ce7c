use std::fmt::Debug;

use log::*;

use crate::{
    api::{DealQueryFilter, SearchCriteria},
    db_types::{Deal, DealActuality, DealId, Offer, OfferId, Parcel},
    traits::{DealManagement, DealQueryError},
};

/// `MatchingApi` answers the shipper's question: which active deals could carry my parcel?
///
/// Matching is read-only and best-effort. An empty result is a normal answer, never an error.
pub struct MatchingApi<B> {
    db: B,
}

impl<B> Debug for MatchingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchingApi")
    }
}

impl<B> MatchingApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> MatchingApi<B>
where B: DealManagement
{
    /// Active deals departing within the criteria's radius of the origin, with a compatible
    /// baggage profile.
    pub async fn find_compatible_deals(&self, criteria: &SearchCriteria) -> Result<Vec<Deal>, DealQueryError> {
        let deals = self.db.find_departures_near(criteria).await?;
        debug!("🔍️ Departure search ({criteria}) matched {} deal(s)", deals.len());
        Ok(deals)
    }

    /// Convenience wrapper: build the search criteria from a parcel's origin and baggage
    /// profile, departing strictly after the parcel's own departure date.
    pub async fn find_deals_for_parcel(&self, parcel: &Parcel, radius_km: f64) -> Result<Vec<Deal>, DealQueryError> {
        let mut criteria = SearchCriteria::new(parcel.location_from, radius_km).departing_after(parcel.departure_date);
        criteria.baggage_types = parcel.baggage_types.clone();
        self.find_compatible_deals(&criteria).await
    }

    /// Attribute-filtered deal listing, for browsing rather than geo search.
    pub async fn search_deals(&self, filter: DealQueryFilter) -> Result<Vec<Deal>, DealQueryError> {
        let deals = self.db.search_deals(filter).await?;
        Ok(deals)
    }

    /// The client's offers, split by whether the parent deal is still in play or archived.
    /// Each entry carries the parent deal id, since offer ids only mean something next to one.
    pub async fn my_offers(
        &self,
        client_id: &str,
        actuality: DealActuality,
    ) -> Result<Vec<(DealId, Offer)>, DealQueryError> {
        self.db.offers_for_client(client_id, actuality).await
    }

    /// Global offer lookup, for callers holding nothing but an offer id.
    pub async fn find_offer(&self, offer_id: &OfferId) -> Result<Option<(DealId, Offer)>, DealQueryError> {
        self.db.find_offer(offer_id).await
    }
}
