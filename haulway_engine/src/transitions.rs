//! The action → status transition table.
//!
//! Every "button press" in the marketplace is one [`DealAction`]. An action resolves to a
//! [`Transition`] (the deal status to set, if any, and the offer status to stamp) and a
//! [`TransitionScope`] (every embedded offer, or only the offers picked out by an
//! [`OfferMatcher`]).
//!
//! The table is deliberately permissive: an action may be applied whatever the deal's current
//! status. Legality is defined by this table alone, not by the prior state. Tightening that
//! would be a behavioural change for existing clients, so callers that want guards must add
//! them on top.

use std::fmt::Display;

use crate::db_types::{DealStatus, Offer, OfferId, OfferStatus, ParcelId};

//--------------------------------------    Transition      ----------------------------------------------------------
/// The effect of one action: an optional deal-level status and the offer status to stamp on the
/// targeted offers. `deal_status: None` leaves the deal status untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub deal_status: Option<DealStatus>,
    pub offer_status: OfferStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionScope {
    /// The action stamps every offer embedded in the deal.
    AllOffers,
    /// The action stamps only the offers picked out by a match predicate.
    SingleOffer,
}

//--------------------------------------     DealAction     ----------------------------------------------------------
/// Every named action a transporter or client can take against a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealAction {
    /// The transporter agrees to / subscribes to the whole deal.
    TransporterAgrees,
    /// A client subscribes to one offer.
    ///
    /// Note: this sets the deal status to `DealIsCrash`, which reads like a misnomer next to the
    /// neighbouring subscription actions. It is long-observed behaviour that clients depend on,
    /// so the table keeps it.
    ClientSubscribes,
    /// The second side accepted; the offer becomes binding.
    BothAgree,
    /// Agreement across the board: every offer in the deal becomes binding at once.
    AllPartiesAgree,
    ClientDisagrees,
    TransporterDisagrees,
    /// The transporter withdraws a single parcel's offer.
    TransporterCancelsParcel,
    /// A client withdraws their parcel.
    ClientCancelsParcel,
    TransporterCrashesDeal,
    TransporterCancelsDeal,
    /// The client reports the delivery never arrived.
    ClientDidNotReceive,
    /// The transporter confirms delivery and closes the deal.
    FinishDeal,
    /// A client re-subscribes after an earlier disagreement. Offer-only; the deal status stays.
    ClientResubscribes,
    /// The transporter walks away from the deal without changing its status.
    TransporterRefuses,
}

impl DealAction {
    pub fn transition(self) -> Transition {
        use DealAction::*;
        use DealStatus::*;
        use OfferStatus::*;
        let (deal_status, offer_status) = match self {
            TransporterAgrees => (Some(BeingFormed), AgreeShifter),
            ClientSubscribes => (Some(DealIsCrash), AgreeClient),
            BothAgree => (Some(BeingFormed), AgreeAll),
            AllPartiesAgree => (Some(BeingFormed), AgreeAll),
            ClientDisagrees => (Some(BeingFormed), DisagreeClient),
            TransporterDisagrees => (Some(BeingFormed), DisagreeShifter),
            TransporterCancelsParcel => (Some(BeingFormed), CancelShifter),
            ClientCancelsParcel => (Some(BeingFormed), CancelClient),
            TransporterCrashesDeal => (Some(DealIsCrash), CancelShifter),
            TransporterCancelsDeal => (Some(DealIsCancel), CancelShifter),
            ClientDidNotReceive => (Some(DealIsOver), DisagreeClient),
            FinishDeal => (Some(DealIsOver), ConfirmedDeliveryShifter),
            ClientResubscribes => (None, AgreeClient),
            TransporterRefuses => (None, CancelShifter),
        };
        Transition { deal_status, offer_status }
    }

    pub fn scope(self) -> TransitionScope {
        use DealAction::*;
        match self {
            TransporterAgrees | AllPartiesAgree | TransporterDisagrees | TransporterCrashesDeal
            | TransporterCancelsDeal | FinishDeal | TransporterRefuses => TransitionScope::AllOffers,
            ClientSubscribes | BothAgree | ClientDisagrees | TransporterCancelsParcel | ClientCancelsParcel
            | ClientDidNotReceive | ClientResubscribes => TransitionScope::SingleOffer,
        }
    }
}

impl Display for DealAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

//--------------------------------------    OfferMatcher    ----------------------------------------------------------
/// The predicate that picks out the target offer(s) of a single-offer transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferMatcher {
    ById(OfferId),
    ByParcel(ParcelId),
    ByClient(String),
}

impl OfferMatcher {
    pub fn matches(&self, offer: &Offer) -> bool {
        match self {
            OfferMatcher::ById(id) => &offer.id == id,
            OfferMatcher::ByParcel(parcel_id) => offer.parcel_id.as_ref() == Some(parcel_id),
            OfferMatcher::ByClient(client_id) => &offer.client_id == client_id,
        }
    }
}

impl Display for OfferMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferMatcher::ById(id) => write!(f, "offer id {id}"),
            OfferMatcher::ByParcel(id) => write!(f, "parcel id {id}"),
            OfferMatcher::ByClient(id) => write!(f, "client id {id}"),
        }
    }
}

#[cfg(test)]
mod test {
    use hw_common::Money;

    use super::*;
    use crate::db_types::OfferOrigin;

    #[test]
    fn all_offer_actions_set_deal_and_offer_status() {
        let cases = [
            (DealAction::TransporterAgrees, Some(DealStatus::BeingFormed), OfferStatus::AgreeShifter),
            (DealAction::AllPartiesAgree, Some(DealStatus::BeingFormed), OfferStatus::AgreeAll),
            (DealAction::TransporterDisagrees, Some(DealStatus::BeingFormed), OfferStatus::DisagreeShifter),
            (DealAction::TransporterCrashesDeal, Some(DealStatus::DealIsCrash), OfferStatus::CancelShifter),
            (DealAction::TransporterCancelsDeal, Some(DealStatus::DealIsCancel), OfferStatus::CancelShifter),
            (DealAction::FinishDeal, Some(DealStatus::DealIsOver), OfferStatus::ConfirmedDeliveryShifter),
            (DealAction::TransporterRefuses, None, OfferStatus::CancelShifter),
        ];
        for (action, deal_status, offer_status) in cases {
            let t = action.transition();
            assert_eq!(t.deal_status, deal_status, "{action}");
            assert_eq!(t.offer_status, offer_status, "{action}");
            assert_eq!(action.scope(), TransitionScope::AllOffers, "{action}");
        }
    }

    #[test]
    fn single_offer_actions_set_deal_and_offer_status() {
        let cases = [
            (DealAction::ClientSubscribes, Some(DealStatus::DealIsCrash), OfferStatus::AgreeClient),
            (DealAction::BothAgree, Some(DealStatus::BeingFormed), OfferStatus::AgreeAll),
            (DealAction::ClientDisagrees, Some(DealStatus::BeingFormed), OfferStatus::DisagreeClient),
            (DealAction::TransporterCancelsParcel, Some(DealStatus::BeingFormed), OfferStatus::CancelShifter),
            (DealAction::ClientCancelsParcel, Some(DealStatus::BeingFormed), OfferStatus::CancelClient),
            (DealAction::ClientDidNotReceive, Some(DealStatus::DealIsOver), OfferStatus::DisagreeClient),
            (DealAction::ClientResubscribes, None, OfferStatus::AgreeClient),
        ];
        for (action, deal_status, offer_status) in cases {
            let t = action.transition();
            assert_eq!(t.deal_status, deal_status, "{action}");
            assert_eq!(t.offer_status, offer_status, "{action}");
            assert_eq!(action.scope(), TransitionScope::SingleOffer, "{action}");
        }
    }

    fn offer(id: &str, client: &str, parcel: Option<&str>) -> Offer {
        Offer {
            id: OfferId::from(id),
            client_id: client.to_string(),
            parcel_id: parcel.map(ParcelId::from),
            status: OfferStatus::AgreeClient,
            origin: OfferOrigin::ClientInitiated,
            amount: Money::from(1000),
            created_at: chrono::Utc::now(),
            last_modified: chrono::Utc::now(),
        }
    }

    #[test]
    fn matcher_predicates() {
        let o = offer("o-1", "c-1", Some("p-1"));
        assert!(OfferMatcher::ById(OfferId::from("o-1")).matches(&o));
        assert!(!OfferMatcher::ById(OfferId::from("o-2")).matches(&o));
        assert!(OfferMatcher::ByParcel(ParcelId::from("p-1")).matches(&o));
        assert!(!OfferMatcher::ByParcel(ParcelId::from("p-2")).matches(&o));
        assert!(OfferMatcher::ByClient("c-1".to_string()).matches(&o));

        let unlinked = offer("o-3", "c-2", None);
        assert!(!OfferMatcher::ByParcel(ParcelId::from("p-1")).matches(&unlinked));
    }
}
