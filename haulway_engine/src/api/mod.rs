mod deal_flow_api;
mod deal_objects;
mod matching_api;
mod parcel_link_api;

pub use deal_flow_api::DealFlowApi;
pub use deal_objects::{DealQueryFilter, SearchCriteria};
pub use matching_api::MatchingApi;
pub use parcel_link_api::ParcelLinkApi;
