use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{DealId, NewOffer, NewParcel, Parcel, ParcelId, ParcelPatch},
    traits::{
        DealManagement,
        DealMarketDatabase,
        DealMarketError,
        DealQueryError,
        ParcelManagement,
        RejectedParcel,
        SubscribedParcel,
        SubscriptionRejection,
        SubscriptionResult,
    },
};

/// `ParcelLinkApi` owns the parcel side of the marketplace: parcel CRUD and the batch
/// subscription flows that stitch parcels onto a deal as embedded offers.
///
/// A batch subscription is **not** a transaction. Each parcel is attempted on its own, so one
/// call can subscribe some parcels and reject others; the result reports both lists and the
/// caller decides how to present a partial success.
pub struct ParcelLinkApi<B> {
    db: B,
}

impl<B> Debug for ParcelLinkApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ParcelLinkApi")
    }
}

impl<B> ParcelLinkApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> ParcelLinkApi<B>
where B: DealMarketDatabase + DealManagement + ParcelManagement
{
    /// Store a brand-new, unlinked parcel.
    pub async fn create_parcel(&self, parcel: NewParcel) -> Result<Parcel, DealMarketError> {
        let parcel = self.db.create_parcel(parcel).await?;
        debug!("📦️ Parcel [{}] created for client [{}]", parcel.id, parcel.client_id);
        Ok(parcel)
    }

    pub async fn fetch_parcel(&self, id: &ParcelId) -> Result<Option<Parcel>, DealQueryError> {
        self.db.fetch_parcel(id).await
    }

    /// Replace a parcel's describable fields. The owner and the offer link cannot change here.
    pub async fn update_parcel(&self, id: &ParcelId, patch: ParcelPatch) -> Result<Parcel, DealMarketError> {
        let parcel = self.db.update_parcel(id, patch).await?;
        debug!("📦️ Parcel [{id}] updated");
        Ok(parcel)
    }

    pub async fn my_parcels(&self, client_id: &str) -> Result<Vec<Parcel>, DealQueryError> {
        self.db.parcels_for_client(client_id).await
    }

    pub async fn parcels_for_deal(&self, deal_id: &DealId) -> Result<Vec<Parcel>, DealQueryError> {
        self.db.parcels_for_deal(deal_id).await
    }

    /// A client subscribes a batch of their parcels to a deal.
    ///
    /// For each parcel that exists, belongs to `client_id` and is not already linked, a
    /// client-initiated offer (status `AgreeClient`) is appended to the deal and the parcel's
    /// back-reference is written. Parcels failing any check land in `rejected` with the reason;
    /// the rest of the batch carries on.
    pub async fn subscribe_parcels_as_client(
        &self,
        deal_id: &DealId,
        client_id: &str,
        parcel_ids: &[ParcelId],
    ) -> Result<SubscriptionResult, DealMarketError> {
        self.require_deal(deal_id).await?;
        let mut result = SubscriptionResult::default();
        for parcel_id in parcel_ids {
            let parcel = match self.checked_parcel(parcel_id, Some(client_id)).await {
                Ok(p) => p,
                Err(reason) => {
                    result.rejected.push(RejectedParcel { parcel_id: parcel_id.clone(), reason });
                    continue;
                },
            };
            let offer = NewOffer::client_initiated(client_id, Some(parcel.id.clone()), parcel.declared_value);
            match self.db.insert_offer(deal_id, offer).await {
                Ok(offer) => {
                    if let Err(e) = self.db.set_parcel_offer_link(&parcel.id, &offer.id).await {
                        error!(
                            "🔗️ Offer [{}] was appended to deal [{deal_id}] but linking parcel [{}] failed: {e}",
                            offer.id, parcel.id
                        );
                        result
                            .rejected
                            .push(RejectedParcel { parcel_id: parcel_id.clone(), reason: SubscriptionRejection::Store(e.to_string()) });
                        continue;
                    }
                    result.subscribed.push(SubscribedParcel { parcel_id: parcel_id.clone(), offer });
                },
                Err(e) => {
                    result
                        .rejected
                        .push(RejectedParcel { parcel_id: parcel_id.clone(), reason: SubscriptionRejection::Store(e.to_string()) });
                },
            }
        }
        info!(
            "📦️ Client [{client_id}] subscription to deal [{deal_id}]: {} subscribed for {}, {} rejected",
            result.subscribed.len(),
            result.total_priced(),
            result.rejected.len()
        );
        Ok(result)
    }

    /// The transporter proposes to carry a batch of parcels.
    ///
    /// Each parcel gains a transporter-initiated offer (status `AgreeShifter`) on behalf of the
    /// parcel's owner, priced at the parcel's declared value. The parcel back-reference is
    /// **not** written here; it only appears once the owner accepts and the link protocol runs.
    pub async fn subscribe_parcels_as_transporter(
        &self,
        deal_id: &DealId,
        parcel_ids: &[ParcelId],
    ) -> Result<SubscriptionResult, DealMarketError> {
        self.require_deal(deal_id).await?;
        let mut result = SubscriptionResult::default();
        for parcel_id in parcel_ids {
            let parcel = match self.checked_parcel(parcel_id, None).await {
                Ok(p) => p,
                Err(reason) => {
                    result.rejected.push(RejectedParcel { parcel_id: parcel_id.clone(), reason });
                    continue;
                },
            };
            let offer =
                NewOffer::transporter_initiated(parcel.client_id.clone(), Some(parcel.id.clone()), parcel.declared_value);
            match self.db.insert_offer(deal_id, offer).await {
                Ok(offer) => result.subscribed.push(SubscribedParcel { parcel_id: parcel_id.clone(), offer }),
                Err(e) => {
                    result
                        .rejected
                        .push(RejectedParcel { parcel_id: parcel_id.clone(), reason: SubscriptionRejection::Store(e.to_string()) });
                },
            }
        }
        info!(
            "📦️ Transporter subscription to deal [{deal_id}]: {} proposed for {}, {} rejected",
            result.subscribed.len(),
            result.total_priced(),
            result.rejected.len()
        );
        Ok(result)
    }

    async fn require_deal(&self, deal_id: &DealId) -> Result<(), DealMarketError> {
        match self.db.fetch_deal(deal_id).await? {
            Some(_) => Ok(()),
            None => Err(DealMarketError::DealNotFound(deal_id.clone())),
        }
    }

    /// Fetches a parcel and runs the subscription checks: existence, ownership (when an owner
    /// is asserted) and no existing link.
    async fn checked_parcel(&self, parcel_id: &ParcelId, owner: Option<&str>) -> Result<Parcel, SubscriptionRejection> {
        let parcel = match self.db.fetch_parcel(parcel_id).await {
            Ok(Some(p)) => p,
            Ok(None) => return Err(SubscriptionRejection::ParcelNotFound),
            Err(e) => return Err(SubscriptionRejection::Store(e.to_string())),
        };
        if let Some(owner) = owner {
            if parcel.client_id != owner {
                warn!("📦️ Parcel [{parcel_id}] does not belong to client [{owner}]");
                return Err(SubscriptionRejection::NotOwner);
            }
        }
        if parcel.offer_id.is_some() {
            debug!("📦️ Parcel [{parcel_id}] is already linked to an offer");
            return Err(SubscriptionRejection::AlreadyLinked);
        }
        Ok(parcel)
    }
}
