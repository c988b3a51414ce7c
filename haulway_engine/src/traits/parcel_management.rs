use crate::{
    db_types::{DealId, NewParcel, Parcel, ParcelId, ParcelPatch},
    traits::{DealMarketError, DealQueryError},
};

/// The `ParcelManagement` trait owns the parcel collection: creation, lookup, patching and the
/// per-client and per-deal listings. The offer back-reference is written elsewhere
/// ([`super::DealMarketDatabase::set_parcel_offer_link`]); a [`crate::db_types::ParcelPatch`]
/// can never touch it.
#[allow(async_fn_in_trait)]
pub trait ParcelManagement {
    /// Stores a brand-new, unlinked parcel and returns the stored record.
    async fn create_parcel(&self, parcel: NewParcel) -> Result<Parcel, DealMarketError>;

    /// Fetches a parcel by id. Returns `None` if no parcel with that id exists.
    async fn fetch_parcel(&self, id: &ParcelId) -> Result<Option<Parcel>, DealQueryError>;

    /// Replaces the parcel's describable fields and stamps `last_modified`. The owner and the
    /// offer link are untouched. Returns the updated parcel, or `ParcelNotFound`.
    async fn update_parcel(&self, id: &ParcelId, patch: ParcelPatch) -> Result<Parcel, DealMarketError>;

    /// Returns every parcel owned by the given client, newest first.
    async fn parcels_for_client(&self, client_id: &str) -> Result<Vec<Parcel>, DealQueryError>;

    /// Returns the parcels linked (through their offer) to the given deal.
    async fn parcels_for_deal(&self, deal_id: &DealId) -> Result<Vec<Parcel>, DealQueryError>;
}
