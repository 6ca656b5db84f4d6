use crate::core::geometry::{
    cross, dot, ellipsoid_normal, geodetic_to_ecef, normalize, sub, GroundPoint,
};

/// 3x3 DEM window around a target pixel.
///
/// `elevations[row][col]` with row 0 on the "up" side of the raster. The
/// neighbor coordinates are (latitude, longitude) of the pixels adjacent to
/// the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationNeighborhood {
    pub elevations: [[f64; 3]; 3],
    pub left: (f64, f64),
    pub right: (f64, f64),
    pub up: (f64, f64),
    pub down: (f64, f64),
}

/// Incidence angles (degrees) at a terrain point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LocalIncidenceResult {
    pub local_incidence_angle: Option<f64>,
    pub projected_local_incidence_angle: Option<f64>,
}

/// Local and projected local incidence angles from the terrain around `centre`.
///
/// The surface normal comes from the cross product of the left-right and
/// up-down tangents built from averaged DEM columns/rows. The projected
/// angle uses the normal projected into the plane spanned by the line of
/// sight and the Earth-centre direction.
pub fn compute(
    centre: &GroundPoint,
    neighborhood: &ElevationNeighborhood,
    sensor_position: &[f64; 3],
    dem_no_data: f64,
) -> LocalIncidenceResult {
    let h = &neighborhood.elevations;
    if h.iter().flatten().any(|&e| e == dem_no_data || !e.is_finite()) {
        return LocalIncidenceResult::default();
    }

    let left_height = (h[0][0] + h[1][0] + h[2][0]) / 3.0;
    let right_height = (h[0][2] + h[1][2] + h[2][2]) / 3.0;
    let up_height = (h[0][0] + h[0][1] + h[0][2]) / 3.0;
    let down_height = (h[2][0] + h[2][1] + h[2][2]) / 3.0;

    let left = geodetic_to_ecef(neighborhood.left.0, neighborhood.left.1, left_height);
    let right = geodetic_to_ecef(neighborhood.right.0, neighborhood.right.1, right_height);
    let up = geodetic_to_ecef(neighborhood.up.0, neighborhood.up.1, up_height);
    let down = geodetic_to_ecef(neighborhood.down.0, neighborhood.down.1, down_height);

    let a = sub(&right, &left);
    let b = sub(&down, &up);
    let mut n = normalize(&cross(&a, &b));
    if dot(&n, &centre.position) < 0.0 {
        n = [-n[0], -n[1], -n[2]];
    }

    let s = normalize(&sub(sensor_position, &centre.position));
    let local = angle_between(&n, &s);

    let m = normalize(&cross(&s, &centre.position));
    let m_dot_n = dot(&m, &n);
    let n1 = normalize(&[
        n[0] - m[0] * m_dot_n,
        n[1] - m[1] * m_dot_n,
        n[2] - m[2] * m_dot_n,
    ]);
    let projected = angle_between(&n1, &s);

    LocalIncidenceResult {
        local_incidence_angle: Some(local),
        projected_local_incidence_angle: Some(projected),
    }
}

/// Incidence angle (degrees) relative to the WGS84 ellipsoid normal
pub fn incidence_angle_from_ellipsoid(centre: &GroundPoint, sensor_position: &[f64; 3]) -> f64 {
    let normal = ellipsoid_normal(centre.latitude, centre.longitude);
    let s = normalize(&sub(sensor_position, &centre.position));
    angle_between(&normal, &s)
}

fn angle_between(u: &[f64; 3], v: &[f64; 3]) -> f64 {
    dot(u, v).clamp(-1.0, 1.0).acos().to_degrees()
}
