//! `SqliteDatabase` is a concrete implementation of a Haulway engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module. A deal and its embedded offers are always written inside one
//! transaction, which is what gives the engine its per-document atomicity guarantee. Parcel
//! writes run in their own transactions on purpose. Every write commits before its method
//! returns: an `Ok` from a mutation means the change is already visible to other connections.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{db_url, deals, new_pool, offers, parcels};
use crate::{
    api::{DealQueryFilter, SearchCriteria},
    db_types::{
        Deal,
        DealActuality,
        DealId,
        NewDeal,
        NewOffer,
        NewParcel,
        Offer,
        OfferId,
        Parcel,
        ParcelId,
        ParcelPatch,
        RoutePatch,
    },
    traits::{DealManagement, DealMarketDatabase, DealMarketError, DealQueryError, ParcelManagement},
    transitions::{OfferMatcher, Transition},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API handle with a connection pool of size `max_connections`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl DealMarketDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_deal(&self, deal: NewDeal) -> Result<Deal, DealMarketError> {
        let mut tx = self.pool.begin().await?;
        let deal = deals::insert_deal(deal, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Deal [{}] has been saved in the DB", deal.id);
        Ok(deal)
    }

    async fn update_route(&self, id: &DealId, patch: RoutePatch) -> Result<Deal, DealMarketError> {
        let mut tx = self.pool.begin().await?;
        let deal = deals::update_route(id, patch, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Deal [{id}] route replaced. {} offer(s) were left untouched", deal.offers.len());
        Ok(deal)
    }

    async fn insert_offer(&self, deal_id: &DealId, offer: NewOffer) -> Result<Offer, DealMarketError> {
        let mut tx = self.pool.begin().await?;
        if deals::fetch_deal(deal_id, &mut tx).await?.is_none() {
            return Err(DealMarketError::DealNotFound(deal_id.clone()));
        }
        let offer = offers::insert_offer(deal_id, offer, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Offer [{}] appended to deal [{deal_id}]", offer.id);
        Ok(offer)
    }

    async fn apply_to_all_offers(&self, deal_id: &DealId, transition: Transition) -> Result<Deal, DealMarketError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        if let Some(status) = transition.deal_status {
            if !deals::set_deal_status(deal_id, status, now, &mut tx).await? {
                return Err(DealMarketError::DealNotFound(deal_id.clone()));
            }
        } else if deals::fetch_deal(deal_id, &mut tx).await?.is_none() {
            return Err(DealMarketError::DealNotFound(deal_id.clone()));
        }
        let n = offers::update_all_statuses(deal_id, transition.offer_status, now, &mut tx).await?;
        let deal = deals::fetch_deal(deal_id, &mut tx)
            .await?
            .ok_or_else(|| DealMarketError::DealNotFound(deal_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Deal [{deal_id}] is now {}. {n} offer(s) stamped {}", deal.status, transition.offer_status);
        Ok(deal)
    }

    async fn apply_to_matched_offers(
        &self,
        deal_id: &DealId,
        matcher: &OfferMatcher,
        transition: Transition,
    ) -> Result<Deal, DealMarketError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        if deals::fetch_deal(deal_id, &mut tx).await?.is_none() {
            return Err(DealMarketError::DealNotFound(deal_id.clone()));
        }
        let n = offers::update_matched_statuses(deal_id, matcher, transition.offer_status, now, &mut tx).await?;
        if n == 0 {
            // Roll back rather than commit a deal-status write with no matching offer.
            warn!("🗃️ No offer on deal [{deal_id}] matched {matcher}");
            return Err(DealMarketError::OfferNotFound(deal_id.clone()));
        }
        if let Some(status) = transition.deal_status {
            deals::set_deal_status(deal_id, status, now, &mut tx).await?;
        }
        let deal = deals::fetch_deal(deal_id, &mut tx)
            .await?
            .ok_or_else(|| DealMarketError::DealNotFound(deal_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ {n} offer(s) on deal [{deal_id}] ({matcher}) stamped {}", transition.offer_status);
        Ok(deal)
    }

    async fn set_parcel_offer_link(&self, parcel_id: &ParcelId, offer_id: &OfferId) -> Result<Parcel, DealMarketError> {
        let mut tx = self.pool.begin().await?;
        let parcel = parcels::set_offer_link(parcel_id, offer_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Parcel [{parcel_id}] now references offer [{offer_id}]");
        Ok(parcel)
    }

    async fn advance_elapsed_deals(&self, now: DateTime<Utc>) -> Result<Vec<Deal>, DealMarketError> {
        let mut tx = self.pool.begin().await?;
        let departed = deals::advance_elapsed(now, &mut tx).await?;
        tx.commit().await?;
        if !departed.is_empty() {
            debug!("🗃️ {} deal(s) advanced to OnMyWay", departed.len());
        }
        Ok(departed)
    }

    async fn close(&mut self) -> Result<(), DealMarketError> {
        self.pool.close().await;
        Ok(())
    }
}

impl DealManagement for SqliteDatabase {
    async fn fetch_deal(&self, id: &DealId) -> Result<Option<Deal>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        deals::fetch_deal(id, &mut conn).await
    }

    async fn deals_for_transporter(&self, transporter_id: &str) -> Result<Vec<Deal>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        deals::fetch_deals_for_transporter(transporter_id, &mut conn).await
    }

    async fn search_deals(&self, filter: DealQueryFilter) -> Result<Vec<Deal>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        deals::search_deals(filter, &mut conn).await
    }

    async fn fetch_offer(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<Option<Offer>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        let offer = offers::fetch_offer(deal_id, offer_id, &mut conn).await?;
        Ok(offer)
    }

    async fn find_offer(&self, offer_id: &OfferId) -> Result<Option<(DealId, Offer)>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        let found = offers::find_offer(offer_id, &mut conn).await?;
        Ok(found)
    }

    async fn offers_for_client(
        &self,
        client_id: &str,
        actuality: DealActuality,
    ) -> Result<Vec<(DealId, Offer)>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        let offers = offers::fetch_offers_for_client(client_id, actuality, &mut conn).await?;
        Ok(offers)
    }

    async fn find_departures_near(&self, criteria: &SearchCriteria) -> Result<Vec<Deal>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        deals::find_departures_near(criteria, &mut conn).await
    }
}

impl ParcelManagement for SqliteDatabase {
    async fn create_parcel(&self, parcel: NewParcel) -> Result<Parcel, DealMarketError> {
        let mut tx = self.pool.begin().await?;
        let parcel = parcels::insert_parcel(parcel, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Parcel [{}] has been saved in the DB", parcel.id);
        Ok(parcel)
    }

    async fn fetch_parcel(&self, id: &ParcelId) -> Result<Option<Parcel>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        parcels::fetch_parcel(id, &mut conn).await
    }

    async fn update_parcel(&self, id: &ParcelId, patch: ParcelPatch) -> Result<Parcel, DealMarketError> {
        let mut tx = self.pool.begin().await?;
        let parcel = parcels::update_parcel(id, patch, &mut tx).await?;
        tx.commit().await?;
        Ok(parcel)
    }

    async fn parcels_for_client(&self, client_id: &str) -> Result<Vec<Parcel>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        parcels::fetch_parcels_for_client(client_id, &mut conn).await
    }

    async fn parcels_for_deal(&self, deal_id: &DealId) -> Result<Vec<Parcel>, DealQueryError> {
        let mut conn = self.pool.acquire().await?;
        parcels::fetch_parcels_for_deal(deal_id, &mut conn).await
    }
}
