//! WGS84 conversions and small vector helpers shared by the geocoding core.

/// WGS84 semi-major axis (m)
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 first eccentricity squared
pub const WGS84_E2: f64 = 0.00669437999014;
/// WGS84 semi-minor axis (m)
pub const WGS84_B: f64 = 6_356_752.314245;

/// Ground point with geodetic coordinates and its ECEF position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
    /// Earth-centered, Earth-fixed position in meters
    pub position: [f64; 3],
}

impl GroundPoint {
    pub fn from_geodetic(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
            position: geodetic_to_ecef(latitude, longitude, elevation),
        }
    }

    /// Distance from the Earth's centre in meters
    pub fn earth_centre_distance(&self) -> f64 {
        norm(&self.position)
    }
}

/// Convert lat/lon (degrees) and ellipsoid height (m) to ECEF coordinates
pub fn geodetic_to_ecef(lat: f64, lon: f64, elevation: f64) -> [f64; 3] {
    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();

    let n = WGS84_A / (1.0 - WGS84_E2 * lat_rad.sin().powi(2)).sqrt();

    let x = (n + elevation) * lat_rad.cos() * lon_rad.cos();
    let y = (n + elevation) * lat_rad.cos() * lon_rad.sin();
    let z = (n * (1.0 - WGS84_E2) + elevation) * lat_rad.sin();

    [x, y, z]
}

/// Convert ECEF coordinates to (lat, lon, height), degrees and meters.
///
/// Fixed-point iteration on latitude; converges to well below a millimeter
/// for points near the Earth's surface.
pub fn ecef_to_geodetic(position: &[f64; 3]) -> (f64, f64, f64) {
    let [x, y, z] = *position;
    let lon = y.atan2(x);
    let p = (x * x + y * y).sqrt();

    if p < 1e-9 {
        let lat = if z >= 0.0 { 90.0 } else { -90.0 };
        return (lat, lon.to_degrees(), z.abs() - WGS84_B);
    }

    let mut lat = z.atan2(p * (1.0 - WGS84_E2));
    let mut height = 0.0;
    for _ in 0..10 {
        let sin_lat = lat.sin();
        let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        height = p / lat.cos() - n;
        lat = z.atan2(p * (1.0 - WGS84_E2 * n / (n + height)));
    }

    (lat.to_degrees(), lon.to_degrees(), height)
}

/// Outward ellipsoid normal (unit vector) at a geodetic position
pub fn ellipsoid_normal(lat: f64, lon: f64) -> [f64; 3] {
    let lat_rad = lat.to_radians();
    let lon_rad = lon.to_radians();
    [
        lat_rad.cos() * lon_rad.cos(),
        lat_rad.cos() * lon_rad.sin(),
        lat_rad.sin(),
    ]
}

pub fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

pub fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    norm(&sub(a, b))
}

/// Unit vector in the direction of `a`; the zero vector is returned unchanged
pub fn normalize(a: &[f64; 3]) -> [f64; 3] {
    let magnitude = norm(a);
    if magnitude > 0.0 {
        [a[0] / magnitude, a[1] / magnitude, a[2] / magnitude]
    } else {
        *a
    }
}
