mod geo;
mod money;

pub use geo::{GeoPoint, EARTH_RADIUS_KM};
pub use money::Money;
