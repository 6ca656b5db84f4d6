//! Geocoding of ground range detected products through SRGR polynomials

mod common;

use approx::assert_abs_diff_eq;
use ndarray::Array2;

use common::*;
use rdgeocode::core::SlantRangeModel;
use rdgeocode::{
    BandData, BandUnit, ConstantElevation, ElevationCache, GeoTransform, GeocodingConfig,
    RangeDopplerParams, RangeReference, SourceBand, SrgrCoefficientSet, TerrainCorrector,
    TileRect,
};

fn last_line_time() -> f64 {
    FIRST_LINE_TIME + (HEIGHT - 1) as f64 * LINE_INTERVAL_DAYS
}

fn srgr_set(time: f64, origin: f64, coefficients: &[f64]) -> SrgrCoefficientSet {
    SrgrCoefficientSet {
        time,
        ground_range_origin: origin,
        coefficients: coefficients.to_vec(),
    }
}

fn ground_range_params(srgr: Vec<SrgrCoefficientSet>) -> RangeDopplerParams {
    RangeDopplerParams {
        range_reference: RangeReference::GroundRange { srgr },
        ..slant_range_params()
    }
}

fn corrector(srgr: Vec<SrgrCoefficientSet>) -> TerrainCorrector {
    TerrainCorrector::new(
        GeocodingConfig::default(),
        ground_range_params(srgr),
        &state_vectors(),
        None,
    )
    .expect("valid ground range geometry")
}

#[test]
fn test_linear_srgr_inverts_within_tolerance() {
    let model = SlantRangeModel::new(
        RangeReference::GroundRange {
            srgr: vec![srgr_set(FIRST_LINE_TIME, 0.0, &[800_000.0, 1.0])],
        },
        RANGE_SPACING,
        WIDTH,
        FIRST_LINE_TIME,
        last_line_time(),
    )
    .unwrap();

    for ground_range in [0.5, 1234.5, 9990.0] {
        let slant_range = 800_000.0 + ground_range;
        let recovered = model.ground_range(FIRST_LINE_TIME, slant_range).unwrap();
        assert_abs_diff_eq!(recovered, ground_range, epsilon = 0.1);
    }

    // Beyond the image swath and outside the acquisition
    assert!(model.ground_range(FIRST_LINE_TIME, 820_000.0).is_none());
    assert!(model.range_index(FIRST_LINE_TIME - 1.0, 801_000.0).is_none());
}

#[test]
fn test_linear_srgr_matches_slant_range_geometry() {
    init_logging();

    // R = R0 + g makes ground range pixels identical to slant range pixels
    let corrector = corrector(vec![
        srgr_set(FIRST_LINE_TIME, 0.0, &[800_000.0, 1.0]),
        srgr_set(last_line_time(), 0.0, &[800_000.0, 1.0]),
    ]);

    for (range, azimuth) in [(10.0, 20.0), (500.0, 250.0), (990.0, 480.0)] {
        let coordinates = corrector
            .sensor_coordinates(&imaged_point(range, azimuth))
            .expect("point inside the image");
        assert_abs_diff_eq!(coordinates.index.range, range, epsilon = 0.02);
        assert_abs_diff_eq!(coordinates.index.azimuth, azimuth, epsilon = 1e-3);
    }
}

#[test]
fn test_quadratic_srgr() {
    init_logging();

    let coefficients = [800_000.0, 0.9, 1e-6];
    let corrector = corrector(vec![srgr_set(FIRST_LINE_TIME, 0.0, &coefficients)]);

    let range = 300.0;
    let slant_offset = RANGE_SPACING * range;
    let ground_range =
        (-0.9 + (0.81 + 4.0 * 1e-6 * slant_offset).sqrt()) / (2.0 * 1e-6);

    let coordinates = corrector
        .sensor_coordinates(&imaged_point(range, 100.0))
        .expect("point inside the image");
    assert_abs_diff_eq!(
        coordinates.index.range,
        ground_range / RANGE_SPACING,
        epsilon = 0.02
    );
}

#[test]
fn test_srgr_sets_are_blended_in_time() {
    init_logging();

    // The near-range slant offset drifts by 100 m over the acquisition
    let corrector = corrector(vec![
        srgr_set(FIRST_LINE_TIME, 0.0, &[800_000.0, 1.0]),
        srgr_set(last_line_time(), 0.0, &[800_100.0, 1.0]),
    ]);

    let (range, azimuth) = (400.0, 250.0);
    let mu = azimuth / (HEIGHT - 1) as f64;
    let expected = (RANGE_SPACING * range - 100.0 * mu) / RANGE_SPACING;

    let coordinates = corrector
        .sensor_coordinates(&imaged_point(range, azimuth))
        .expect("point inside the image");
    assert_abs_diff_eq!(coordinates.index.range, expected, epsilon = 0.02);
}

#[test]
fn test_ground_range_tile_geocodes() {
    init_logging();

    let corrector = corrector(vec![srgr_set(FIRST_LINE_TIME, 0.0, &[800_000.0, 1.0])]);
    let grid = GeoTransform::north_up(3.33, 0.015, 0.002, 0.002);
    let source = Array2::from_shape_fn((HEIGHT, WIDTH), |(_, x)| x as f32);
    let bands = [SourceBand::new(
        "Amplitude_VV",
        BandUnit::Amplitude,
        0.0,
        BandData::Real(&source),
    )];

    let tile = TileRect::new(0, 0, 8, 4);
    let mut cache = ElevationCache::new(60).unwrap();
    let output = corrector
        .process_tile(&tile, &bands, &grid, &ConstantElevation::new(0.0), &mut cache)
        .unwrap();

    assert_eq!(output.valid_pixels, tile.pixel_count());
    let data = &output.band("Amplitude_VV").unwrap().data;
    for row in data.rows() {
        for pair in row.as_slice().unwrap().windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }
}
