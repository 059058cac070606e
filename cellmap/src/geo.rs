//! Great-circle distances and geographic bounding boxes.
//!
//! All distances use the spherical-earth haversine formula. The engine always
//! works in meters ([`distance_meters`]); the kilometre variant
//! ([`distance_km`]) uses the IUGG mean radius and is only used by survey
//! filters.

/// Earth radius used by the interpolation engine, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// IUGG mean Earth radius, in kilometres.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0088;

/// Approximate length of one degree of latitude, in kilometres.
const KM_PER_DEG_LAT: f64 = 110.574;

/// Approximate length of one degree of longitude at the equator, in kilometres.
const KM_PER_DEG_LON_EQUATOR: f64 = 111.320;

/// Central angle between two points, in radians.
///
/// The square-root argument is clamped to `[0, 1]` so that rounding near
/// antipodal points cannot push `asin` out of its domain.
fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);

    2.0 * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Great-circle distance between two points, in meters.
///
/// Symmetric in its arguments and exactly zero for identical points.
///
/// # Examples
///
/// ```
/// use cellmap::geo::distance_meters;
///
/// assert_eq!(distance_meters(32.1, 35.19, 32.1, 35.19), 0.0);
///
/// // One thousandth of a degree of latitude is roughly 111 m.
/// let d = distance_meters(0.0, 0.0, 0.001, 0.0);
/// assert!((d - 111.19).abs() < 0.01);
/// ```
pub fn distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    central_angle(lat1, lon1, lat2, lon2) * EARTH_RADIUS_M
}

/// Great-circle distance between two points, in kilometres (mean radius).
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    central_angle(lat1, lon1, lat2, lon2) * EARTH_MEAN_RADIUS_KM
}

/// A geographic bounding box.
///
/// Coordinates are in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum latitude (southern boundary).
    pub min_lat: f64,
    /// Minimum longitude (western boundary).
    pub min_lon: f64,
    /// Maximum latitude (northern boundary).
    pub max_lat: f64,
    /// Maximum longitude (eastern boundary).
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// # Arguments
    ///
    /// * `min_lat` - Southern boundary latitude
    /// * `min_lon` - Western boundary longitude
    /// * `max_lat` - Northern boundary latitude
    /// * `max_lon` - Eastern boundary longitude
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Tight box around a set of `(lat, lon)` points.
    ///
    /// Returns `None` when the iterator is empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        points.into_iter().fold(None, |acc, (lat, lon)| {
            Some(match acc {
                None => Self::new(lat, lon, lat, lon),
                Some(b) => Self::new(
                    b.min_lat.min(lat),
                    b.min_lon.min(lon),
                    b.max_lat.max(lat),
                    b.max_lon.max(lon),
                ),
            })
        })
    }

    /// Approximate box enclosing a circle of `radius_km` around a centre.
    ///
    /// Used as a cheap pre-filter before an exact [`distance_km`] check.
    pub fn around(center_lat: f64, center_lon: f64, radius_km: f64) -> Self {
        let dlat = radius_km / KM_PER_DEG_LAT;
        let dlon = radius_km / (KM_PER_DEG_LON_EQUATOR * center_lat.to_radians().cos());
        Self::new(
            center_lat - dlat,
            center_lon - dlon,
            center_lat + dlat,
            center_lon + dlon,
        )
    }

    /// Grow the box by `margin_deg` on every side.
    pub fn expand(&self, margin_deg: f64) -> Self {
        Self::new(
            self.min_lat - margin_deg,
            self.min_lon - margin_deg,
            self.max_lat + margin_deg,
            self.max_lon + margin_deg,
        )
    }

    /// Check whether a point lies inside the box (boundaries included).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// North-south extent in degrees.
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// East-west extent in degrees.
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }
}
