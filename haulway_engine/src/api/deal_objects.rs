use std::fmt::Display;

use chrono::{DateTime, Utc};
use hw_common::GeoPoint;
use serde::{Deserialize, Serialize};

use crate::db_types::{BaggageType, DealStatus, ParcelId, Transport};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DealQueryFilter {
    pub transporter_id: Option<String>,
    /// Deals in which this client holds an offer.
    pub client_id: Option<String>,
    /// Deals with an offer referencing this parcel.
    pub parcel_id: Option<ParcelId>,
    pub address_from: Option<String>,
    pub address_to: Option<String>,
    pub transport: Option<Transport>,
    pub departing_after: Option<DateTime<Utc>>,
    pub departing_before: Option<DateTime<Utc>>,
    pub status: Option<Vec<DealStatus>>,
}

impl DealQueryFilter {
    pub fn with_transporter_id(mut self, transporter_id: String) -> Self {
        self.transporter_id = Some(transporter_id);
        self
    }

    pub fn with_client_id(mut self, client_id: String) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn with_parcel_id(mut self, parcel_id: ParcelId) -> Self {
        self.parcel_id = Some(parcel_id);
        self
    }

    pub fn with_address_from(mut self, address: String) -> Self {
        self.address_from = Some(address);
        self
    }

    pub fn with_address_to(mut self, address: String) -> Self {
        self.address_to = Some(address);
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn departing_after(mut self, after: DateTime<Utc>) -> Self {
        self.departing_after = Some(after);
        self
    }

    pub fn departing_before(mut self, before: DateTime<Utc>) -> Self {
        self.departing_before = Some(before);
        self
    }

    pub fn with_status(mut self, status: DealStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    /// A filter matching the deals a shipper can still join.
    pub fn active_only() -> Self {
        let mut filter = Self::default();
        filter.status = Some(DealStatus::active_group().to_vec());
        filter
    }

    pub fn is_empty(&self) -> bool {
        self.transporter_id.is_none() &&
            self.client_id.is_none() &&
            self.parcel_id.is_none() &&
            self.address_from.is_none() &&
            self.address_to.is_none() &&
            self.transport.is_none() &&
            self.departing_after.is_none() &&
            self.departing_before.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

impl Display for DealQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "No filters.")?;
            return Ok(());
        }
        if let Some(transporter_id) = &self.transporter_id {
            write!(f, "transporter_id: {transporter_id}. ")?;
        }
        if let Some(client_id) = &self.client_id {
            write!(f, "client_id: {client_id}. ")?;
        }
        if let Some(parcel_id) = &self.parcel_id {
            write!(f, "parcel_id: {parcel_id}. ")?;
        }
        if let Some(address_from) = &self.address_from {
            write!(f, "from: {address_from}. ")?;
        }
        if let Some(address_to) = &self.address_to {
            write!(f, "to: {address_to}. ")?;
        }
        if let Some(transport) = &self.transport {
            write!(f, "transport: {transport}. ")?;
        }
        if let Some(after) = &self.departing_after {
            write!(f, "departing after {after}. ")?;
        }
        if let Some(before) = &self.departing_before {
            write!(f, "departing before {before}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}

/// What a shipper is looking for: active deals departing near `origin`, able to carry at least
/// one of the given baggage types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub origin: GeoPoint,
    pub radius_km: f64,
    /// Empty means any baggage profile is acceptable.
    pub baggage_types: Vec<BaggageType>,
    /// Exclusive lower bound on the departure time.
    pub departing_after: Option<DateTime<Utc>>,
}

impl SearchCriteria {
    pub fn new(origin: GeoPoint, radius_km: f64) -> Self {
        Self { origin, radius_km, baggage_types: Vec::new(), departing_after: None }
    }

    pub fn with_baggage_type(mut self, baggage: BaggageType) -> Self {
        self.baggage_types.push(baggage);
        self
    }

    pub fn departing_after(mut self, after: DateTime<Utc>) -> Self {
        self.departing_after = Some(after);
        self
    }
}

impl Display for SearchCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "within {} km of ({}, {})", self.radius_km, self.origin.lat, self.origin.lng)?;
        if !self.baggage_types.is_empty() {
            let types = self.baggage_types.iter().map(|b| format!("{b:?}")).collect::<Vec<String>>().join(",");
            write!(f, ", carrying [{types}]")?;
        }
        if let Some(after) = &self.departing_after {
            write!(f, ", departing after {after}")?;
        }
        Ok(())
    }
}
