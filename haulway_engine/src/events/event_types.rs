use serde::{Deserialize, Serialize};

use crate::db_types::{Deal, Offer};

/// Fired when both sides have agreed on an offer and it has become binding.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferAcceptedEvent {
    pub deal: Deal,
    pub offer: Offer,
    /// Whether the parcel back-reference write also succeeded. `false` means the link is
    /// half-written and the parcel still shows as unlinked.
    pub parcel_linked: bool,
}

impl OfferAcceptedEvent {
    pub fn new(deal: Deal, offer: Offer, parcel_linked: bool) -> Self {
        Self { deal, offer, parcel_linked }
    }
}

/// Fired when a transporter confirms delivery and the deal moves to `DealIsOver`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealFinishedEvent {
    pub deal: Deal,
}

impl DealFinishedEvent {
    pub fn new(deal: Deal) -> Self {
        Self { deal }
    }
}

/// Fired for every deal the refresher moves from `BeingFormed` to `OnMyWay`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealDepartedEvent {
    pub deal: Deal,
}

impl DealDepartedEvent {
    pub fn new(deal: Deal) -> Self {
        Self { deal }
    }
}
