//! Haulway Engine
//!
//! The Haulway engine is the core of a three-party logistics marketplace: transporters publish
//! deals (route offers with a departure window and a baggage profile), shippers publish parcels,
//! and the two negotiate through offers embedded inside each deal. This library contains the
//! engine's full logic and is transport-agnostic; an HTTP or bot front end sits above it.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You
//!    should never need to access the database directly. Instead, use the public API provided by
//!    the engine. The exception is the data types stored in the database, which are defined in
//!    the [`mod@db_types`] module and are public.
//! 2. The backend contracts ([`mod@traits`]). A storage backend implements these traits to act
//!    as a backend for the engine. The key guarantee a backend provides is that a deal and its
//!    embedded offers always change together, atomically.
//! 3. The engine public API: [`DealFlowApi`] drives the deal lifecycle through the
//!    [`transitions`] table, [`ParcelLinkApi`] owns parcels and the batch subscription flows,
//!    and [`MatchingApi`] answers departure searches.
//!
//! The engine also provides a set of events that can be subscribed to. These events are emitted
//! when certain actions occur: an offer becomes binding, a deal finishes, or the refresher moves
//! a deal onto the road. A simple actor framework is used so that you can easily hook into these
//! events and perform custom actions.
mod api;

pub mod db_types;
pub mod events;
pub mod traits;
pub mod transitions;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use api::{DealFlowApi, DealQueryFilter, MatchingApi, ParcelLinkApi, SearchCriteria};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{DealManagement, DealMarketDatabase, DealMarketError, DealQueryError, ParcelManagement};
