use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use hw_common::{GeoPoint, Money};
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(pub String);

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Mints a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(DealId);
id_type!(OfferId);
id_type!(ParcelId);

//--------------------------------------    DealStatus      ----------------------------------------------------------
/// The lifecycle status of a deal as a whole.
///
/// `BeingFormed` and `OnMyWay` make up the *active* group used by listing filters; the remaining
/// statuses are the *archive* group and no further transitions are expected from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DealStatus {
    /// Negotiation is open. Editing a deal always drops it back to this status.
    BeingFormed,
    /// The departure time has elapsed and the transporter is assumed to be under way.
    OnMyWay,
    /// The deal completed (delivery confirmed or disputed after delivery).
    DealIsOver,
    /// The transporter cancelled the deal.
    DealIsCancel,
    /// The deal collapsed.
    DealIsCrash,
}

impl DealStatus {
    pub fn active_group() -> &'static [DealStatus] {
        &[DealStatus::BeingFormed, DealStatus::OnMyWay]
    }

    pub fn archive_group() -> &'static [DealStatus] {
        &[DealStatus::DealIsOver, DealStatus::DealIsCancel, DealStatus::DealIsCrash]
    }

    pub fn is_active(&self) -> bool {
        Self::active_group().contains(self)
    }
}

/// The coarse split used by listing queries: deals still in play versus the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealActuality {
    Active,
    Archived,
}

impl DealActuality {
    pub fn statuses(self) -> &'static [DealStatus] {
        match self {
            DealActuality::Active => DealStatus::active_group(),
            DealActuality::Archived => DealStatus::archive_group(),
        }
    }
}

impl Display for DealStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DealStatus::BeingFormed => write!(f, "BeingFormed"),
            DealStatus::OnMyWay => write!(f, "OnMyWay"),
            DealStatus::DealIsOver => write!(f, "DealIsOver"),
            DealStatus::DealIsCancel => write!(f, "DealIsCancel"),
            DealStatus::DealIsCrash => write!(f, "DealIsCrash"),
        }
    }
}

impl FromStr for DealStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BeingFormed" => Ok(Self::BeingFormed),
            "OnMyWay" => Ok(Self::OnMyWay),
            "DealIsOver" => Ok(Self::DealIsOver),
            "DealIsCancel" => Ok(Self::DealIsCancel),
            "DealIsCrash" => Ok(Self::DealIsCrash),
            s => Err(ConversionError(format!("Invalid deal status: {s}"))),
        }
    }
}

impl From<String> for DealStatus {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid deal status: {value}. But this conversion cannot fail. Defaulting to BeingFormed");
            DealStatus::BeingFormed
        })
    }
}

//--------------------------------------    OfferStatus     ----------------------------------------------------------
/// The negotiation status of a single offer embedded in a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OfferStatus {
    /// The transporter has agreed to carry the linked parcel.
    AgreeShifter,
    /// The client has subscribed to the route with a parcel.
    AgreeClient,
    /// Both sides agreed; the offer is binding.
    AgreeAll,
    DisagreeShifter,
    DisagreeClient,
    CancelShifter,
    CancelClient,
    /// The transporter confirmed delivery at the end of the route.
    ConfirmedDeliveryShifter,
}

impl Display for OfferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OfferStatus::AgreeShifter => "AgreeShifter",
            OfferStatus::AgreeClient => "AgreeClient",
            OfferStatus::AgreeAll => "AgreeAll",
            OfferStatus::DisagreeShifter => "DisagreeShifter",
            OfferStatus::DisagreeClient => "DisagreeClient",
            OfferStatus::CancelShifter => "CancelShifter",
            OfferStatus::CancelClient => "CancelClient",
            OfferStatus::ConfirmedDeliveryShifter => "ConfirmedDeliveryShifter",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OfferStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AgreeShifter" => Ok(Self::AgreeShifter),
            "AgreeClient" => Ok(Self::AgreeClient),
            "AgreeAll" => Ok(Self::AgreeAll),
            "DisagreeShifter" => Ok(Self::DisagreeShifter),
            "DisagreeClient" => Ok(Self::DisagreeClient),
            "CancelShifter" => Ok(Self::CancelShifter),
            "CancelClient" => Ok(Self::CancelClient),
            "ConfirmedDeliveryShifter" => Ok(Self::ConfirmedDeliveryShifter),
            s => Err(ConversionError(format!("Invalid offer status: {s}"))),
        }
    }
}

//--------------------------------------    OfferOrigin     ----------------------------------------------------------
/// Which side created the offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OfferOrigin {
    TransporterInitiated,
    ClientInitiated,
}

impl Display for OfferOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OfferOrigin::TransporterInitiated => write!(f, "TransporterInitiated"),
            OfferOrigin::ClientInitiated => write!(f, "ClientInitiated"),
        }
    }
}

impl FromStr for OfferOrigin {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TransporterInitiated" => Ok(Self::TransporterInitiated),
            "ClientInitiated" => Ok(Self::ClientInitiated),
            s => Err(ConversionError(format!("Invalid offer origin: {s}"))),
        }
    }
}

//--------------------------------------    BaggageType     ----------------------------------------------------------
/// What a deal is willing to carry, and what a parcel contains. Persisted as a JSON array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaggageType {
    Documents,
    SmallBox,
    LargeBox,
    Suitcase,
    SportsEquipment,
    Fragile,
    Furniture,
}

/// True when the two sets share at least one baggage type.
pub fn baggage_types_intersect(a: &[BaggageType], b: &[BaggageType]) -> bool {
    a.iter().any(|t| b.contains(t))
}

//--------------------------------------     Transport      ----------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Transport {
    Car,
    Van,
    Truck,
    Train,
    Plane,
}

impl Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Car => write!(f, "Car"),
            Transport::Van => write!(f, "Van"),
            Transport::Truck => write!(f, "Truck"),
            Transport::Train => write!(f, "Train"),
            Transport::Plane => write!(f, "Plane"),
        }
    }
}

impl FromStr for Transport {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Car" => Ok(Self::Car),
            "Van" => Ok(Self::Van),
            "Truck" => Ok(Self::Truck),
            "Train" => Ok(Self::Train),
            "Plane" => Ok(Self::Plane),
            s => Err(ConversionError(format!("Invalid transport type: {s}"))),
        }
    }
}

//--------------------------------------        Offer       ----------------------------------------------------------
/// A negotiation proposal embedded in a deal. Offer ids are unique within their parent deal only;
/// the `(deal_id, offer_id)` pair is what a linked parcel carries.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    /// The client negotiating with the deal's transporter.
    pub client_id: String,
    /// Set once the offer is tied to a concrete parcel.
    pub parcel_id: Option<ParcelId>,
    pub status: OfferStatus,
    pub origin: OfferOrigin,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

//--------------------------------------      NewOffer      ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewOffer {
    pub client_id: String,
    pub parcel_id: Option<ParcelId>,
    pub status: OfferStatus,
    pub origin: OfferOrigin,
    pub amount: Money,
}

impl NewOffer {
    /// An offer created by a client subscribing to a deal.
    pub fn client_initiated(client_id: impl Into<String>, parcel_id: Option<ParcelId>, amount: Money) -> Self {
        Self {
            client_id: client_id.into(),
            parcel_id,
            status: OfferStatus::AgreeClient,
            origin: OfferOrigin::ClientInitiated,
            amount,
        }
    }

    /// An offer created by the transporter proposing to carry a parcel.
    pub fn transporter_initiated(client_id: impl Into<String>, parcel_id: Option<ParcelId>, amount: Money) -> Self {
        Self {
            client_id: client_id.into(),
            parcel_id,
            status: OfferStatus::AgreeShifter,
            origin: OfferOrigin::TransporterInitiated,
            amount,
        }
    }
}

//--------------------------------------        Deal        ----------------------------------------------------------
/// A transporter's route offer, owning its embedded offers in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub transporter_id: String,
    pub status: DealStatus,
    pub description: Option<String>,
    pub transport: Transport,
    pub baggage_types: Vec<BaggageType>,
    pub address_from: String,
    pub address_to: String,
    pub location_from: GeoPoint,
    pub location_to: GeoPoint,
    /// Departure time. The window `[start_date, end_date]` is what the overlap check compares.
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub offers: Vec<Offer>,
}

impl Deal {
    pub fn offer_by_id(&self, offer_id: &OfferId) -> Option<&Offer> {
        self.offers.iter().find(|o| &o.id == offer_id)
    }

    fn window_end(&self) -> DateTime<Utc> {
        self.end_date.unwrap_or(self.start_date)
    }
}

//--------------------------------------      NewDeal       ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewDeal {
    pub transporter_id: String,
    pub description: Option<String>,
    pub transport: Transport,
    pub baggage_types: Vec<BaggageType>,
    pub address_from: String,
    pub address_to: String,
    pub location_from: GeoPoint,
    pub location_to: GeoPoint,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl NewDeal {
    /// True when this deal covers the same route as `other` with an equal or intersecting
    /// departure window. A transporter may not hold two such deals at once.
    pub fn conflicts_with(&self, other: &Deal) -> bool {
        if self.address_from != other.address_from || self.address_to != other.address_to {
            return false;
        }
        let self_end = self.end_date.unwrap_or(self.start_date);
        self.start_date <= other.window_end() && other.start_date <= self_end
    }
}

//--------------------------------------     RoutePatch     ----------------------------------------------------------
/// A full replacement of a deal's route fields. Applying it never touches the embedded offers,
/// and always forces the deal status back to `BeingFormed`: editing a deal re-opens negotiation.
#[derive(Debug, Clone)]
pub struct RoutePatch {
    pub description: Option<String>,
    pub transport: Transport,
    pub baggage_types: Vec<BaggageType>,
    pub address_from: String,
    pub address_to: String,
    pub location_from: GeoPoint,
    pub location_to: GeoPoint,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl From<NewDeal> for RoutePatch {
    fn from(deal: NewDeal) -> Self {
        Self {
            description: deal.description,
            transport: deal.transport,
            baggage_types: deal.baggage_types,
            address_from: deal.address_from,
            address_to: deal.address_to,
            location_from: deal.location_from,
            location_to: deal.location_to,
            start_date: deal.start_date,
            end_date: deal.end_date,
        }
    }
}

//--------------------------------------       Parcel       ----------------------------------------------------------
/// A client's shipment request. Independent of any deal until an offer links it; the link is a
/// weak back-reference only (`offer_id` here, `parcel_id` on the offer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub id: ParcelId,
    pub client_id: String,
    pub description: Option<String>,
    pub baggage_types: Vec<BaggageType>,
    pub address_from: String,
    pub address_to: String,
    pub location_from: GeoPoint,
    pub location_to: GeoPoint,
    pub departure_date: DateTime<Utc>,
    pub declared_value: Money,
    pub offer_id: Option<OfferId>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

//--------------------------------------     NewParcel      ----------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewParcel {
    pub client_id: String,
    pub description: Option<String>,
    pub baggage_types: Vec<BaggageType>,
    pub address_from: String,
    pub address_to: String,
    pub location_from: GeoPoint,
    pub location_to: GeoPoint,
    pub departure_date: DateTime<Utc>,
    pub declared_value: Money,
}

//--------------------------------------    ParcelPatch     ----------------------------------------------------------
/// Editable parcel fields. The owner and the offer link are deliberately absent: updates must
/// never re-home a parcel or silently break an established link.
#[derive(Debug, Clone)]
pub struct ParcelPatch {
    pub description: Option<String>,
    pub baggage_types: Vec<BaggageType>,
    pub address_from: String,
    pub address_to: String,
    pub location_from: GeoPoint,
    pub location_to: GeoPoint,
    pub departure_date: DateTime<Utc>,
    pub declared_value: Money,
}

#[cfg(test)]
mod test {
    use super::*;

    fn deal(from: &str, to: &str, start: &str, end: Option<&str>) -> Deal {
        Deal {
            id: DealId::new(),
            transporter_id: "t-1".to_string(),
            status: DealStatus::BeingFormed,
            description: None,
            transport: Transport::Van,
            baggage_types: vec![BaggageType::Suitcase],
            address_from: from.to_string(),
            address_to: to.to_string(),
            location_from: GeoPoint::new(0.0, 0.0),
            location_to: GeoPoint::new(1.0, 1.0),
            start_date: start.parse().unwrap(),
            end_date: end.map(|e| e.parse().unwrap()),
            created_at: Utc::now(),
            last_modified: Utc::now(),
            offers: vec![],
        }
    }

    fn new_deal(from: &str, to: &str, start: &str, end: Option<&str>) -> NewDeal {
        NewDeal {
            transporter_id: "t-1".to_string(),
            description: None,
            transport: Transport::Van,
            baggage_types: vec![BaggageType::Suitcase],
            address_from: from.to_string(),
            address_to: to.to_string(),
            location_from: GeoPoint::new(0.0, 0.0),
            location_to: GeoPoint::new(1.0, 1.0),
            start_date: start.parse().unwrap(),
            end_date: end.map(|e| e.parse().unwrap()),
        }
    }

    #[test]
    fn identical_route_and_window_conflicts() {
        let existing = deal("Lyon", "Geneva", "2024-03-01T08:00:00Z", None);
        let incoming = new_deal("Lyon", "Geneva", "2024-03-01T08:00:00Z", None);
        assert!(incoming.conflicts_with(&existing));
    }

    #[test]
    fn overlapping_window_conflicts() {
        let existing = deal("Lyon", "Geneva", "2024-03-01T08:00:00Z", Some("2024-03-05T08:00:00Z"));
        let incoming = new_deal("Lyon", "Geneva", "2024-03-04T08:00:00Z", Some("2024-03-08T08:00:00Z"));
        assert!(incoming.conflicts_with(&existing));
    }

    #[test]
    fn different_route_never_conflicts() {
        let existing = deal("Lyon", "Geneva", "2024-03-01T08:00:00Z", None);
        let incoming = new_deal("Lyon", "Turin", "2024-03-01T08:00:00Z", None);
        assert!(!incoming.conflicts_with(&existing));
    }

    #[test]
    fn disjoint_window_never_conflicts() {
        let existing = deal("Lyon", "Geneva", "2024-03-01T08:00:00Z", Some("2024-03-02T08:00:00Z"));
        let incoming = new_deal("Lyon", "Geneva", "2024-03-10T08:00:00Z", None);
        assert!(!incoming.conflicts_with(&existing));
    }

    #[test]
    fn status_round_trips() {
        for s in ["BeingFormed", "OnMyWay", "DealIsOver", "DealIsCancel", "DealIsCrash"] {
            let parsed: DealStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("NotAStatus".parse::<DealStatus>().is_err());
        assert!(DealStatus::OnMyWay.is_active());
        assert!(!DealStatus::DealIsCrash.is_active());
    }
}
