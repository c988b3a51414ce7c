use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{Deal, DealId, NewDeal, NewOffer, Offer, OfferId, ParcelId, RoutePatch},
    events::{DealDepartedEvent, DealFinishedEvent, EventProducers, OfferAcceptedEvent},
    traits::{DealManagement, DealMarketDatabase, DealMarketError, LinkOutcome},
    transitions::{DealAction, OfferMatcher, TransitionScope},
};

/// `DealFlowApi` is the primary API for driving a deal through its lifecycle: creation, route
/// edits, offer insertion, and every named negotiation action a transporter or client can take.
///
/// Each action resolves through the [`DealAction`] transition table and lands on the store as a
/// single atomic deal write. The one deliberate exception is [`Self::second_side_agrees`], which
/// performs a second, independent parcel write after the deal write commits.
pub struct DealFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for DealFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DealFlowApi")
    }
}

impl<B> DealFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> DealFlowApi<B>
where B: DealMarketDatabase + DealManagement
{
    /// Submit a brand-new deal.
    ///
    /// Before storing, the transporter's existing deals are checked for a route conflict: the
    /// same address pair with an equal or intersecting departure window. A conflicting deal is
    /// rejected with [`DealMarketError::OverlappingDeal`] and nothing is written.
    pub async fn create_deal(&self, deal: NewDeal) -> Result<Deal, DealMarketError> {
        let existing = self.db.deals_for_transporter(&deal.transporter_id).await?;
        if let Some(clash) = existing.iter().find(|d| deal.conflicts_with(d)) {
            debug!(
                "🔄️🚚️ Rejecting new deal for transporter [{}]. It overlaps with deal [{}]",
                deal.transporter_id, clash.id
            );
            return Err(DealMarketError::OverlappingDeal(clash.id.clone()));
        }
        let deal = self.db.create_deal(deal).await?;
        debug!("🔄️🚚️ Deal [{}] created for transporter [{}]", deal.id, deal.transporter_id);
        Ok(deal)
    }

    /// Replace a deal's route fields. The status drops back to `BeingFormed` and the embedded
    /// offers survive untouched.
    pub async fn update_route(&self, id: &DealId, patch: RoutePatch) -> Result<Deal, DealMarketError> {
        let deal = self.db.update_route(id, patch).await?;
        debug!("🔄️🚚️ Deal [{id}] route updated. Status is back to {}", deal.status);
        Ok(deal)
    }

    /// Append one offer to a deal. Siblings are untouched.
    pub async fn insert_offer(&self, deal_id: &DealId, offer: NewOffer) -> Result<Offer, DealMarketError> {
        let offer = self.db.insert_offer(deal_id, offer).await?;
        trace!("🔄️🚚️ Offer [{}] appended to deal [{deal_id}]", offer.id);
        Ok(offer)
    }

    /// The transporter agrees to the whole deal. Every offer is stamped `AgreeShifter`.
    pub async fn transporter_agrees(&self, deal_id: &DealId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::TransporterAgrees, None).await
    }

    /// A client subscribes to one of their offers on the deal.
    pub async fn client_subscribes(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::ClientSubscribes, Some(OfferMatcher::ById(offer_id.clone()))).await
    }

    /// The second side accepts an offer, making it binding.
    ///
    /// Two writes happen here, and only the first is atomic. The deal write stamps the offer
    /// `AgreeAll` and commits. Then, if the offer carries a parcel id, the parcel's
    /// back-reference is written in its own transaction. When that second write fails the deal
    /// write is **not** rolled back; the outcome records `parcel_linked: false` and the
    /// half-written link is left for the next subscription attempt to repair.
    pub async fn second_side_agrees(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<LinkOutcome, DealMarketError> {
        let matcher = OfferMatcher::ById(offer_id.clone());
        let deal = self.db.apply_to_matched_offers(deal_id, &matcher, DealAction::BothAgree.transition()).await?;
        let offer = deal.offer_by_id(offer_id).cloned().ok_or_else(|| DealMarketError::OfferNotFound(deal_id.clone()))?;
        let parcel_linked = match &offer.parcel_id {
            Some(parcel_id) => match self.db.set_parcel_offer_link(parcel_id, offer_id).await {
                Ok(_) => true,
                Err(e) => {
                    error!(
                        "🔗️ Offer [{offer_id}] on deal [{deal_id}] is binding, but linking parcel [{parcel_id}] \
                         failed: {e}. The parcel still shows as unlinked."
                    );
                    false
                },
            },
            None => {
                debug!("🔗️ Offer [{offer_id}] on deal [{deal_id}] carries no parcel. Nothing to link.");
                false
            },
        };
        let outcome = LinkOutcome { deal, offer, parcel_linked };
        self.call_offer_accepted_hook(&outcome).await;
        Ok(outcome)
    }

    /// Agreement across the board. Every offer in the deal is stamped `AgreeAll` at once; no
    /// parcel back-references are written here.
    pub async fn agree_all(&self, deal_id: &DealId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::AllPartiesAgree, None).await
    }

    /// A client backs out of their offer.
    pub async fn client_disagrees(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::ClientDisagrees, Some(OfferMatcher::ById(offer_id.clone()))).await
    }

    /// A client walks away from the deal entirely. Every offer they hold on it is stamped
    /// `DisagreeClient` in one write.
    pub async fn client_withdraws(&self, deal_id: &DealId, client_id: &str) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::ClientDisagrees, Some(OfferMatcher::ByClient(client_id.to_string())))
            .await
    }

    /// The transporter backs out of the whole deal's offers.
    pub async fn transporter_disagrees(&self, deal_id: &DealId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::TransporterDisagrees, None).await
    }

    /// The transporter withdraws the offer covering one parcel.
    pub async fn transporter_cancels_parcel(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::TransporterCancelsParcel, Some(OfferMatcher::ById(offer_id.clone())))
            .await
    }

    /// The same withdrawal, targeted by the parcel when the offer id is not at hand.
    pub async fn transporter_cancels_for_parcel(
        &self,
        deal_id: &DealId,
        parcel_id: &ParcelId,
    ) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::TransporterCancelsParcel, Some(OfferMatcher::ByParcel(parcel_id.clone())))
            .await
    }

    /// A client withdraws their parcel from the deal. The target offer is found through the
    /// parcel back-reference, not the offer id.
    pub async fn client_cancels_parcel(&self, deal_id: &DealId, parcel_id: &ParcelId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::ClientCancelsParcel, Some(OfferMatcher::ByParcel(parcel_id.clone())))
            .await
    }

    /// The transporter aborts the deal. The deal moves to `DealIsCrash`.
    pub async fn transporter_crashes_deal(&self, deal_id: &DealId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::TransporterCrashesDeal, None).await
    }

    /// The transporter cancels the deal outright. The deal moves to `DealIsCancel`.
    pub async fn transporter_cancels_deal(&self, deal_id: &DealId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::TransporterCancelsDeal, None).await
    }

    /// A client reports their delivery never arrived. The deal closes as `DealIsOver` with the
    /// client's offer stamped `DisagreeClient`.
    pub async fn client_did_not_receive(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::ClientDidNotReceive, Some(OfferMatcher::ById(offer_id.clone()))).await
    }

    /// The transporter confirms delivery and closes the deal.
    pub async fn finish_deal(&self, deal_id: &DealId) -> Result<Deal, DealMarketError> {
        let deal = self.apply_action(deal_id, DealAction::FinishDeal, None).await?;
        self.call_deal_finished_hook(&deal).await;
        Ok(deal)
    }

    /// A client re-subscribes to an offer after an earlier disagreement. Offer-only; the deal
    /// status is untouched.
    pub async fn client_resubscribes(&self, deal_id: &DealId, offer_id: &OfferId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::ClientResubscribes, Some(OfferMatcher::ById(offer_id.clone()))).await
    }

    /// The transporter walks away from every offer without changing the deal status.
    pub async fn transporter_refuses(&self, deal_id: &DealId) -> Result<Deal, DealMarketError> {
        self.apply_action(deal_id, DealAction::TransporterRefuses, None).await
    }

    /// The periodic refresher. Every `BeingFormed` deal whose departure time is at or before
    /// `now` moves to `OnMyWay`. Running it twice with the same `now` is a no-op the second
    /// time.
    pub async fn refresh_elapsed_deals(&self, now: DateTime<Utc>) -> Result<Vec<Deal>, DealMarketError> {
        let departed = self.db.advance_elapsed_deals(now).await?;
        if departed.is_empty() {
            trace!("🔄️⏰️ Refresher ran at {now}. No deals were due");
        } else {
            info!("🔄️⏰️ Refresher ran at {now}. {} deal(s) are now on their way", departed.len());
            self.call_deal_departed_hook(&departed).await;
        }
        Ok(departed)
    }

    /// Dispatches an action through the transition table. Single-offer actions need a matcher;
    /// all-offer actions must not carry one.
    async fn apply_action(
        &self,
        deal_id: &DealId,
        action: DealAction,
        matcher: Option<OfferMatcher>,
    ) -> Result<Deal, DealMarketError> {
        let transition = action.transition();
        let deal = match (action.scope(), matcher) {
            (TransitionScope::AllOffers, None) => self.db.apply_to_all_offers(deal_id, transition).await?,
            (TransitionScope::SingleOffer, Some(matcher)) => {
                self.db.apply_to_matched_offers(deal_id, &matcher, transition).await?
            },
            (scope, _) => {
                return Err(DealMarketError::UnsupportedAction(format!("{action} with {scope:?} scope")));
            },
        };
        debug!("🔄️🚚️ {action} applied to deal [{deal_id}]. Deal status is {}", deal.status);
        Ok(deal)
    }

    async fn call_offer_accepted_hook(&self, outcome: &LinkOutcome) {
        for emitter in &self.producers.offer_accepted_producer {
            debug!("🔄️🚚️ Notifying offer accepted hook subscribers");
            let event =
                OfferAcceptedEvent::new(outcome.deal.clone(), outcome.offer.clone(), outcome.parcel_linked);
            emitter.publish_event(event).await;
        }
    }

    async fn call_deal_finished_hook(&self, deal: &Deal) {
        for emitter in &self.producers.deal_finished_producer {
            debug!("🔄️🚚️ Notifying deal finished hook subscribers");
            let event = DealFinishedEvent::new(deal.clone());
            emitter.publish_event(event).await;
        }
    }

    async fn call_deal_departed_hook(&self, deals: &[Deal]) {
        for emitter in &self.producers.deal_departed_producer {
            debug!("🔄️⏰️ Notifying deal departed hook subscribers");
            for deal in deals {
                let event = DealDepartedEvent::new(deal.clone());
                emitter.publish_event(event).await;
            }
        }
    }
}
