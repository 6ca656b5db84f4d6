//! Synthetic acquisition used by the integration tests: a straight polar
//! orbit over the equator looking right, a 1000x500 source raster with 10 m
//! range and 5 m azimuth spacing, and a flat WGS84 Earth.
#![allow(dead_code)]

use rdgeocode::core::geometry::{ecef_to_geodetic, WGS84_A, WGS84_B};
use rdgeocode::types::{SECONDS_PER_DAY, SPEED_OF_LIGHT};
use rdgeocode::{
    AcquisitionTiming, GroundPoint, OrbitStateVector, RangeDopplerParams, RangeReference,
};

pub const FIRST_LINE_TIME: f64 = 58849.5;
/// 2^-27 days, so every line time is exact on the MJD time base
pub const LINE_INTERVAL_DAYS: f64 = 1.0 / 134_217_728.0;
pub const SENSOR_X: f64 = WGS84_A + 700_000.0;
pub const NEAR_RANGE: f64 = 800_000.0;
pub const RANGE_SPACING: f64 = 10.0;
pub const AZIMUTH_SPACING: f64 = 5.0;
pub const WIDTH: usize = 1000;
pub const HEIGHT: usize = 500;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn line_seconds() -> f64 {
    LINE_INTERVAL_DAYS * SECONDS_PER_DAY
}

/// Along-track speed giving one azimuth pixel per line
pub fn speed() -> f64 {
    AZIMUTH_SPACING / line_seconds()
}

pub fn slant_range_params() -> RangeDopplerParams {
    RangeDopplerParams {
        wavelength: 0.0555,
        range_spacing: RANGE_SPACING,
        azimuth_spacing: AZIMUTH_SPACING,
        timing: AcquisitionTiming::new(FIRST_LINE_TIME, LINE_INTERVAL_DAYS),
        width: WIDTH,
        height: HEIGHT,
        range_reference: RangeReference::SlantRange {
            near_edge_slant_range: NEAR_RANGE,
        },
    }
}

/// Five state vectors, 256 lines apart, spanning the image and its margins
pub fn state_vectors() -> Vec<OrbitStateVector> {
    (0..5)
        .map(|k| {
            let line = (k as f64 - 1.0) * 256.0;
            OrbitStateVector::new(
                FIRST_LINE_TIME + line * LINE_INTERVAL_DAYS,
                [SENSOR_X, 0.0, speed() * line * line_seconds()],
                [0.0, 0.0, speed()],
            )
        })
        .collect()
}

/// Ellipsoid point imaged at source pixel (range, azimuth), two-way light
/// time included
pub fn imaged_point(range: f64, azimuth: f64) -> GroundPoint {
    let slant_range = NEAR_RANGE + RANGE_SPACING * range;

    let mut perpendicular = slant_range;
    for _ in 0..6 {
        let along_track = speed() * 2.0 * perpendicular / SPEED_OF_LIGHT;
        perpendicular = (slant_range * slant_range - along_track * along_track).sqrt();
    }

    let zero_doppler_seconds = azimuth * line_seconds() - 2.0 * perpendicular / SPEED_OF_LIGHT;
    let z = speed() * zero_doppler_seconds;
    let rho2 = WGS84_A * WGS84_A * (1.0 - z * z / (WGS84_B * WGS84_B));
    let x = (SENSOR_X * SENSOR_X + rho2 - perpendicular * perpendicular) / (2.0 * SENSOR_X);
    let y = (rho2 - x * x).sqrt();

    let (lat, lon, h) = ecef_to_geodetic(&[x, y, z]);
    GroundPoint::from_geodetic(lat, lon, h)
}
