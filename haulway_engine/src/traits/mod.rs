//! # Storage backend contracts.
//!
//! This module defines the behaviour a document store must expose to act as a backend for the
//! Haulway engine. The store's obligations are small: atomic read-modify-write per deal document
//! (a deal and its embedded offers always change together, in one transaction), targeted updates
//! of single embedded offers via a match predicate, and indexed queries. There is deliberately
//! no cross-document atomicity requirement: the parcel to offer link protocol is built on top of
//! two independent single-document writes (see [`crate::DealFlowApi`]).
//!
//! * [`DealMarketDatabase`] is the write path: deal creation, route patches, offer insertion,
//!   bulk and targeted status transitions, the parcel back-reference write and the timed
//!   status advance.
//! * [`DealManagement`] is the read path: deal, offer and departure-search queries.
//! * [`ParcelManagement`] owns the parcel collection.
mod data_objects;
mod deal_management;
mod deal_market_database;
mod parcel_management;

pub use data_objects::{LinkOutcome, RejectedParcel, SubscribedParcel, SubscriptionRejection, SubscriptionResult};
pub use deal_management::{DealManagement, DealQueryError};
pub use deal_market_database::{DealMarketDatabase, DealMarketError};
pub use parcel_management::ParcelManagement;
