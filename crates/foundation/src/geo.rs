/// Mean Earth radius (kilometers), as used by all great-circle math.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic coordinate in degrees.
///
/// Values are plain `f64`s; use [`LatLng::checked`] at trust boundaries
/// (user guesses) and the plain constructor for catalog data that is
/// validated at ingest.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LatLng {
    pub lat_deg: f64,
    pub lng_deg: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CoordinateError {
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl std::fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoordinateError::LatitudeOutOfRange(v) => {
                write!(f, "latitude {v} outside [-90, 90]")
            }
            CoordinateError::LongitudeOutOfRange(v) => {
                write!(f, "longitude {v} outside [-180, 180]")
            }
        }
    }
}

impl std::error::Error for CoordinateError {}

impl LatLng {
    pub fn new(lat_deg: f64, lng_deg: f64) -> Self {
        Self { lat_deg, lng_deg }
    }

    /// Validates ranges: lat in [-90, 90], lng in [-180, 180].
    ///
    /// NaN fails the range test and is rejected like any out-of-range value.
    pub fn checked(lat_deg: f64, lng_deg: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&lat_deg) {
            return Err(CoordinateError::LatitudeOutOfRange(lat_deg));
        }
        if !(-180.0..=180.0).contains(&lng_deg) {
            return Err(CoordinateError::LongitudeOutOfRange(lng_deg));
        }
        Ok(Self { lat_deg, lng_deg })
    }
}

/// Haversine great-circle distance in kilometers.
///
/// Total for well-formed input, symmetric, and zero for identical points.
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    let lat_a = a.lat_deg.to_radians();
    let lat_b = b.lat_deg.to_radians();
    let d_lat = (b.lat_deg - a.lat_deg).to_radians();
    let d_lng = (b.lng_deg - a.lng_deg).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Degrees of latitude spanning `km` kilometers along a meridian.
///
/// For two points on the same meridian the haversine distance reduces to
/// the plain arc, so this is exact (up to float error) for constructing
/// points at a known distance.
pub fn lat_degrees_for_km(km: f64) -> f64 {
    km / (EARTH_RADIUS_KM * std::f64::consts::PI / 180.0)
}

#[cfg(test)]
mod tests {
    use super::{CoordinateError, LatLng, distance_km, lat_degrees_for_km};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn identical_points_are_zero_distance() {
        let p = LatLng::new(48.8566, 2.3522);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let london = LatLng::new(51.5074, -0.1278);
        let paris = LatLng::new(48.8566, 2.3522);
        assert_close(distance_km(london, paris), distance_km(paris, london), 1e-9);
    }

    #[test]
    fn london_to_paris_is_about_343_km() {
        let london = LatLng::new(51.5074, -0.1278);
        let paris = LatLng::new(48.8566, 2.3522);
        let d = distance_km(london, paris);
        assert!((341.0..347.0).contains(&d), "got {d}");
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(1.0, 0.0);
        assert_close(distance_km(a, b), 111.1949, 1e-3);
    }

    #[test]
    fn antipodal_points_are_half_circumference() {
        let a = LatLng::new(0.0, 0.0);
        let b = LatLng::new(0.0, 180.0);
        assert_close(distance_km(a, b), 6371.0 * std::f64::consts::PI, 1e-6);
    }

    #[test]
    fn lat_degrees_round_trip_through_haversine() {
        let deg = lat_degrees_for_km(5.0);
        let d = distance_km(LatLng::new(0.0, 0.0), LatLng::new(deg, 0.0));
        assert_close(d, 5.0, 1e-9);
    }

    #[test]
    fn checked_accepts_the_full_valid_range() {
        assert!(LatLng::checked(90.0, 180.0).is_ok());
        assert!(LatLng::checked(-90.0, -180.0).is_ok());
        assert!(LatLng::checked(0.0, 0.0).is_ok());
    }

    #[test]
    fn checked_rejects_out_of_range() {
        assert_eq!(
            LatLng::checked(90.5, 0.0),
            Err(CoordinateError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            LatLng::checked(0.0, -180.5),
            Err(CoordinateError::LongitudeOutOfRange(-180.5))
        );
    }

    #[test]
    fn checked_rejects_nan() {
        assert!(LatLng::checked(f64::NAN, 0.0).is_err());
        assert!(LatLng::checked(0.0, f64::NAN).is_err());
    }
}
