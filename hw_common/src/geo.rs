use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

//--------------------------------------     GeoPoint      -----------------------------------------------------------
/// A WGS84 coordinate pair. Stored as two REAL columns in the database, so there is no sqlx
/// wrapper here; the row helpers assemble it from its parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometres (haversine formula).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lng = (other.lng - self.lng).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }

    pub fn within_radius_km(&self, center: &GeoPoint, radius_km: f64) -> bool {
        self.distance_km(center) <= radius_km
    }

    /// A square bounding box (lat_min, lat_max, lng_min, lng_max) that fully contains the circle of
    /// `radius_km` around this point. Used as an index-friendly prefilter; candidates still need
    /// the exact [`distance_km`] check. The longitude span degenerates near the poles, so the box
    /// falls back to the full longitude range there.
    pub fn bounding_box_km(&self, radius_km: f64) -> (f64, f64, f64, f64) {
        let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let cos_lat = self.lat.to_radians().cos();
        let lng_delta = if cos_lat.abs() < 1e-6 {
            180.0
        } else {
            (radius_km / (EARTH_RADIUS_KM * cos_lat)).to_degrees()
        };
        (self.lat - lat_delta, self.lat + lat_delta, self.lng - lng_delta, self.lng + lng_delta)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn haversine_known_distances() {
        // Paris - London is roughly 344 km.
        let paris = GeoPoint::new(48.8566, 2.3522);
        let london = GeoPoint::new(51.5074, -0.1278);
        let d = paris.distance_km(&london);
        assert!((d - 344.0).abs() < 5.0, "unexpected distance: {d}");
        assert_eq!(paris.distance_km(&paris), 0.0);
    }

    #[test]
    fn bounding_box_contains_radius() {
        let center = GeoPoint::new(45.0, 7.0);
        let (lat_min, lat_max, lng_min, lng_max) = center.bounding_box_km(50.0);
        let edge = GeoPoint::new(45.0, 7.0 + (lng_max - 7.0) * 0.99);
        assert!(edge.lat >= lat_min && edge.lat <= lat_max);
        assert!(center.within_radius_km(&center, 1.0));
        assert!(lng_max > lng_min && lat_max > lat_min);
    }
}
