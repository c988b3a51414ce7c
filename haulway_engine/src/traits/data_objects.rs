use hw_common::Money;
use serde::{Deserialize, Serialize};

use crate::db_types::{Deal, Offer, ParcelId};

/// The result of a batch subscription call. The batch is not a transaction: each parcel is
/// attempted independently, so a single call can produce both subscribed and rejected entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionResult {
    pub subscribed: Vec<SubscribedParcel>,
    pub rejected: Vec<RejectedParcel>,
}

impl SubscriptionResult {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }

    /// The combined price of the offers this batch created.
    pub fn total_priced(&self) -> Money {
        self.subscribed.iter().map(|s| s.offer.amount).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscribedParcel {
    pub parcel_id: ParcelId,
    pub offer: Offer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedParcel {
    pub parcel_id: ParcelId,
    pub reason: SubscriptionRejection,
}

/// Why a parcel was left out of a batch subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionRejection {
    /// The parcel already carries an offer back-reference.
    AlreadyLinked,
    /// The parcel does not belong to the requesting client.
    NotOwner,
    ParcelNotFound,
    /// The store rejected the write.
    Store(String),
}

/// The outcome of the two-write link protocol. The deal-side write has already committed when
/// this value exists; `parcel_linked` records whether the second, independent parcel write also
/// succeeded.
#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub deal: Deal,
    pub offer: Offer,
    pub parcel_linked: bool,
}
