use ndarray::{Array1, Array2};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::calibrate::{RadiometricConfig, RadiometricNormalizer};
use crate::core::dem_cache::ElevationCache;
use crate::core::doppler::ZeroDopplerSolver;
use crate::core::geometry::{norm, GroundPoint};
use crate::core::local_geometry::{self, LocalIncidenceResult};
use crate::core::orbit::OrbitInterpolator;
use crate::core::resample::{
    CorrectedSample, NeighborCorrection, Resampler, ResamplingMethod, SourceBand,
};
use crate::core::slant_range::{RangeReference, SlantRangeModel};
use crate::io::dem::ElevationModel;
use crate::io::raster::TargetGeocoding;
use crate::types::{
    AcquisitionTiming, BandUnit, OrbitStateVector, Polarization, SarError, SarRealImage,
    SarResult, TileRect, SPEED_OF_LIGHT,
};

/// Default elevation cache size: a 512x512 tile plus its halo
pub const DEFAULT_ELEVATION_CACHE_CAPACITY: usize = 514 * 514;

/// Indices at most this far (pixels) outside the image snap onto its edge
pub const EDGE_INDEX_TOLERANCE: f64 = 1e-4;

/// Geocoding options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    pub resampling: ResamplingMethod,
    pub save_elevation: bool,
    pub save_local_incidence_angle: bool,
    pub save_projected_local_incidence_angle: bool,
    pub save_incidence_angle_from_ellipsoid: bool,
    pub apply_radiometric_normalization: bool,
    /// Source range lines are stored far-to-near
    pub flip_range_index: bool,
    /// Source azimuth lines are stored last-to-first
    pub flip_azimuth_index: bool,
    pub elevation_cache_capacity: usize,
    pub radiometric: RadiometricConfig,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            resampling: ResamplingMethod::Bilinear,
            save_elevation: false,
            save_local_incidence_angle: false,
            save_projected_local_incidence_angle: false,
            save_incidence_angle_from_ellipsoid: false,
            apply_radiometric_normalization: false,
            flip_range_index: false,
            flip_azimuth_index: false,
            elevation_cache_capacity: DEFAULT_ELEVATION_CACHE_CAPACITY,
            radiometric: RadiometricConfig::default(),
        }
    }
}

impl GeocodingConfig {
    /// Parse an XML parameter document; missing elements keep their defaults
    pub fn from_xml(xml: &str) -> SarResult<Self> {
        let config: GeocodingConfig = quick_xml::de::from_str(xml).map_err(|e| {
            SarError::InvalidConfiguration(format!("Failed to parse geocoding parameters: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SarResult<()> {
        if self.elevation_cache_capacity == 0 {
            return Err(SarError::InvalidConfiguration(
                "Elevation cache capacity must be positive".to_string(),
            ));
        }
        self.radiometric.validate()
    }

    fn needs_local_geometry(&self) -> bool {
        self.save_local_incidence_angle
            || self.save_projected_local_incidence_angle
            || self.apply_radiometric_normalization
    }
}

/// Source product geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeDopplerParams {
    /// Radar wavelength (m)
    pub wavelength: f64,
    /// Range pixel spacing (m)
    pub range_spacing: f64,
    /// Azimuth pixel spacing (m)
    pub azimuth_spacing: f64,
    pub timing: AcquisitionTiming,
    /// Source width in range pixels
    pub width: usize,
    /// Source height in azimuth lines
    pub height: usize,
    pub range_reference: RangeReference,
}

impl RangeDopplerParams {
    pub fn validate(&self) -> SarResult<()> {
        if !(self.wavelength > 0.0) {
            return Err(SarError::InvalidConfiguration(format!(
                "Radar wavelength must be positive, got {}",
                self.wavelength
            )));
        }
        if !(self.range_spacing > 0.0) || !(self.azimuth_spacing > 0.0) {
            return Err(SarError::InvalidConfiguration(format!(
                "Pixel spacing must be positive, got range {} azimuth {}",
                self.range_spacing, self.azimuth_spacing
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SarError::InvalidConfiguration(format!(
                "Source image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        self.timing.validate()
    }

    pub fn last_line_time(&self) -> f64 {
        self.timing.line_time((self.height - 1) as f64)
    }
}

/// Sensor state at the imaging time of a ground point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagingSolution {
    /// Time (MJD) at which the sensor Doppler toward the point is zero
    pub zero_doppler_time: f64,
    /// Imaging time (MJD), zero-Doppler time plus the two-way light time
    pub imaging_time: f64,
    /// Slant range at the imaging time (m)
    pub slant_range: f64,
    pub sensor_position: [f64; 3],
    pub sensor_velocity: [f64; 3],
}

/// Fractional position in the source raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterIndex {
    pub range: f64,
    pub azimuth: f64,
}

impl RasterIndex {
    /// Inside `[0, width-1] x [0, height-1]` up to [`EDGE_INDEX_TOLERANCE`]
    pub fn is_valid(&self, width: usize, height: usize) -> bool {
        let last_range = (width - 1) as f64;
        let last_azimuth = (height - 1) as f64;
        self.range >= -EDGE_INDEX_TOLERANCE
            && self.range <= last_range + EDGE_INDEX_TOLERANCE
            && self.azimuth >= -EDGE_INDEX_TOLERANCE
            && self.azimuth <= last_azimuth + EDGE_INDEX_TOLERANCE
    }

    /// Index snapped onto the image, `None` when it lies outside
    pub fn clamped(self, width: usize, height: usize) -> Option<Self> {
        if !self.is_valid(width, height) {
            return None;
        }
        Some(Self {
            range: self.range.clamp(0.0, (width - 1) as f64),
            azimuth: self.azimuth.clamp(0.0, (height - 1) as f64),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCoordinates {
    pub solution: ImagingSolution,
    pub index: RasterIndex,
}

/// One geocoded band of a tile
#[derive(Debug, Clone)]
pub struct GeocodedBand {
    pub name: String,
    pub no_data_value: f64,
    pub data: SarRealImage,
}

/// Outputs of one target tile, arrays shaped (height, width) of the tile
#[derive(Debug, Clone)]
pub struct GeocodedTile {
    pub rect: TileRect,
    pub bands: Vec<GeocodedBand>,
    pub elevation: Option<SarRealImage>,
    pub local_incidence_angle: Option<SarRealImage>,
    pub projected_local_incidence_angle: Option<SarRealImage>,
    pub incidence_angle_from_ellipsoid: Option<SarRealImage>,
    /// Pixels that mapped inside the source image
    pub valid_pixels: usize,
}

impl GeocodedTile {
    fn empty(rect: TileRect, bands: &[SourceBand<'_>], config: &GeocodingConfig) -> Self {
        let shape = (rect.height, rect.width);
        let ancillary = |enabled: bool| enabled.then(|| Array2::from_elem(shape, f32::NAN));
        Self {
            rect,
            bands: bands
                .iter()
                .map(|band| GeocodedBand {
                    name: band.name.clone(),
                    no_data_value: band.no_data_value,
                    data: Array2::from_elem(shape, band.no_data_value as f32),
                })
                .collect(),
            elevation: ancillary(config.save_elevation),
            local_incidence_angle: ancillary(config.save_local_incidence_angle),
            projected_local_incidence_angle: ancillary(config.save_projected_local_incidence_angle),
            incidence_angle_from_ellipsoid: ancillary(config.save_incidence_angle_from_ellipsoid),
            valid_pixels: 0,
        }
    }

    pub fn band(&self, name: &str) -> Option<&GeocodedBand> {
        self.bands.iter().find(|band| band.name == name)
    }
}

/// Per-row results gathered before they are written into the tile arrays
struct RowOutput {
    bands: Vec<Vec<f32>>,
    elevation: Vec<f32>,
    local_incidence_angle: Vec<f32>,
    projected_local_incidence_angle: Vec<f32>,
    incidence_angle_from_ellipsoid: Vec<f32>,
    valid_pixels: usize,
}

/// Undoes a legacy calibration for every neighbor read by the resampler
struct PixelRetroCorrection<'a> {
    normalizer: &'a RadiometricNormalizer,
    slant_range: &'a SlantRangeModel,
    time: f64,
    sensor_height: f64,
    earth_centre_distance: f64,
    polarization: Polarization,
    /// Source width when range indices are flipped
    flipped_width: Option<usize>,
}

impl NeighborCorrection for PixelRetroCorrection<'_> {
    fn correct(&self, value: f64, unit: BandUnit, x: usize, _y: usize) -> CorrectedSample {
        let range_index = match self.flipped_width {
            Some(width) => (width - 1 - x) as f64,
            None => x as f64,
        };
        let slant_range = self.slant_range.slant_range_for_index(self.time, range_index);
        self.normalizer.retro_correct(
            value,
            slant_range,
            self.sensor_height,
            self.earth_centre_distance,
            self.polarization,
            unit,
        )
    }
}

/// Range-Doppler terrain correction processor
pub struct TerrainCorrector {
    config: GeocodingConfig,
    params: RangeDopplerParams,
    orbit: OrbitInterpolator,
    solver: ZeroDopplerSolver,
    slant_range: SlantRangeModel,
    resampler: Resampler,
    normalizer: Option<RadiometricNormalizer>,
    leading_margin: i64,
}

impl TerrainCorrector {
    /// Set up the geocoder for one source product.
    ///
    /// A supplied `normalizer` runs with the settings in `config.radiometric`.
    pub fn new(
        config: GeocodingConfig,
        params: RangeDopplerParams,
        state_vectors: &[OrbitStateVector],
        normalizer: Option<RadiometricNormalizer>,
    ) -> SarResult<Self> {
        config.validate()?;
        params.validate()?;

        if config.apply_radiometric_normalization && normalizer.is_none() {
            return Err(SarError::InvalidConfiguration(
                "Radiometric normalization requested without calibration tables".to_string(),
            ));
        }
        if !config.apply_radiometric_normalization && normalizer.is_some() {
            log::warn!("Calibration tables supplied but radiometric normalization is disabled");
        }
        let normalizer = normalizer.map(|n| n.with_config(config.radiometric.clone()));

        let orbit = OrbitInterpolator::new(state_vectors)?;
        let slant_range = SlantRangeModel::new(
            params.range_reference.clone(),
            params.range_spacing,
            params.width,
            params.timing.first_line_time,
            params.last_line_time(),
        )?;

        // Imaging time trails zero-Doppler time by up to the far-edge light time
        let far_range = slant_range.far_edge_slant_range();
        let light_time_lines =
            2.0 * far_range / (SPEED_OF_LIGHT * params.timing.line_interval_seconds());
        let leading_margin = light_time_lines.ceil() as i64 + 1;

        let solver = ZeroDopplerSolver::new(
            &orbit,
            params.timing,
            params.wavelength,
            -leading_margin,
            params.height as i64 - 1,
        )?;

        let resampler =
            Resampler::new(config.resampling).with_linear_output(config.apply_radiometric_normalization);

        log::info!(
            "Range-Doppler geocoder: {}x{} source, {} resampling, {} of {} orbit vectors",
            params.width,
            params.height,
            config.resampling,
            orbit.vector_count(),
            state_vectors.len()
        );
        log::debug!(
            "Far edge slant range {:.1} m, Doppler search starts {} lines before the first line",
            far_range,
            leading_margin
        );

        Ok(Self {
            config,
            params,
            orbit,
            solver,
            slant_range,
            resampler,
            normalizer,
            leading_margin,
        })
    }

    pub fn config(&self) -> &GeocodingConfig {
        &self.config
    }

    pub fn params(&self) -> &RangeDopplerParams {
        &self.params
    }

    pub fn orbit(&self) -> &OrbitInterpolator {
        &self.orbit
    }

    pub fn slant_range_model(&self) -> &SlantRangeModel {
        &self.slant_range
    }

    /// Lines searched before the first image line
    pub fn leading_margin(&self) -> i64 {
        self.leading_margin
    }

    /// Source raster position that imaged `ground`, `None` when outside the image
    pub fn sensor_coordinates(&self, ground: &GroundPoint) -> Option<SensorCoordinates> {
        let timing = &self.params.timing;
        let zero_doppler_line = self.solver.solve_line(&ground.position)?;
        let zero_doppler_time = timing.line_time(zero_doppler_line);
        let (zero_doppler_range, _) =
            SlantRangeModel::slant_range_at(&self.orbit, zero_doppler_time, &ground.position);

        // The echo is recorded one two-way light time after zero Doppler
        let light_time = 2.0 * zero_doppler_range / SPEED_OF_LIGHT;
        let line = zero_doppler_line + light_time / timing.line_interval_seconds();
        let last_line = (self.params.height - 1) as f64;
        if line < -EDGE_INDEX_TOLERANCE || line > last_line + EDGE_INDEX_TOLERANCE {
            return None;
        }
        let line = line.clamp(0.0, last_line);

        let imaging_time = timing.line_time(line);
        let (slant_range, sensor_position) =
            SlantRangeModel::slant_range_at(&self.orbit, imaging_time, &ground.position);
        let sensor_velocity = self.orbit.velocity_at(imaging_time);

        let mut range = self.slant_range.range_index(imaging_time, slant_range)?;
        let mut azimuth = line;
        if self.config.flip_range_index {
            range = (self.params.width - 1) as f64 - range;
        }
        if self.config.flip_azimuth_index {
            azimuth = (self.params.height - 1) as f64 - azimuth;
        }

        let index =
            RasterIndex { range, azimuth }.clamped(self.params.width, self.params.height)?;

        Some(SensorCoordinates {
            solution: ImagingSolution {
                zero_doppler_time,
                imaging_time,
                slant_range,
                sensor_position,
                sensor_velocity,
            },
            index,
        })
    }

    /// Fail before any pixel work when the bands cannot be geocoded
    fn check_bands(&self, bands: &[SourceBand<'_>]) -> SarResult<()> {
        for band in bands {
            let dims = band.dimensions()?;
            if dims != (self.params.width, self.params.height) {
                return Err(SarError::InvalidConfiguration(format!(
                    "Band {} is {}x{}, source geometry is {}x{}",
                    band.name, dims.0, dims.1, self.params.width, self.params.height
                )));
            }

            if let Some(normalizer) = self.calibration() {
                let polarization = band.polarization.ok_or_else(|| {
                    SarError::InvalidConfiguration(format!(
                        "Band {} has no polarization, cannot calibrate",
                        band.name
                    ))
                })?;
                normalizer.check_polarizations(&[polarization])?;
            }
        }
        Ok(())
    }

    fn calibration(&self) -> Option<&RadiometricNormalizer> {
        if self.config.apply_radiometric_normalization {
            self.normalizer.as_ref()
        } else {
            None
        }
    }

    /// Geocode one target tile.
    ///
    /// `cache` is refilled for the tile; pixels without elevation or outside
    /// the source image keep the band no-data value (NaN for angle and
    /// elevation outputs).
    pub fn process_tile(
        &self,
        tile: &TileRect,
        bands: &[SourceBand<'_>],
        geocoding: &dyn TargetGeocoding,
        dem: &dyn ElevationModel,
        cache: &mut ElevationCache,
    ) -> SarResult<GeocodedTile> {
        self.check_bands(bands)?;

        let mut output = GeocodedTile::empty(*tile, bands, &self.config);
        if tile.pixel_count() == 0 {
            return Ok(output);
        }

        let valid_elevations = cache.fill(tile, geocoding, dem)?;
        if valid_elevations == 0 {
            log::debug!(
                "Skipping tile ({}, {}) {}x{}: no valid elevation",
                tile.x0,
                tile.y0,
                tile.width,
                tile.height
            );
            return Ok(output);
        }

        let cache: &ElevationCache = cache;
        let process_row = |row: usize| self.process_row(tile, row, bands, cache);

        #[cfg(feature = "parallel")]
        let rows: Vec<RowOutput> = (0..tile.height).into_par_iter().map(process_row).collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<RowOutput> = (0..tile.height).map(process_row).collect();

        for (row, result) in rows.into_iter().enumerate() {
            for (band, values) in output.bands.iter_mut().zip(result.bands) {
                band.data.row_mut(row).assign(&Array1::from(values));
            }
            let ancillary = [
                (&mut output.elevation, result.elevation),
                (&mut output.local_incidence_angle, result.local_incidence_angle),
                (
                    &mut output.projected_local_incidence_angle,
                    result.projected_local_incidence_angle,
                ),
                (
                    &mut output.incidence_angle_from_ellipsoid,
                    result.incidence_angle_from_ellipsoid,
                ),
            ];
            for (target, values) in ancillary {
                if let Some(target) = target {
                    target.row_mut(row).assign(&Array1::from(values));
                }
            }
            output.valid_pixels += result.valid_pixels;
        }

        log::info!(
            "Tile ({}, {}) {}x{}: {:.1}% coverage",
            tile.x0,
            tile.y0,
            tile.width,
            tile.height,
            100.0 * output.valid_pixels as f64 / tile.pixel_count() as f64
        );

        Ok(output)
    }

    fn process_row(
        &self,
        tile: &TileRect,
        row: usize,
        bands: &[SourceBand<'_>],
        cache: &ElevationCache,
    ) -> RowOutput {
        let width = tile.width;
        let mut out = RowOutput {
            bands: bands
                .iter()
                .map(|band| vec![band.no_data_value as f32; width])
                .collect(),
            elevation: vec![f32::NAN; width],
            local_incidence_angle: vec![f32::NAN; width],
            projected_local_incidence_angle: vec![f32::NAN; width],
            incidence_angle_from_ellipsoid: vec![f32::NAN; width],
            valid_pixels: 0,
        };

        let y = (tile.y0 + row) as i64;
        for col in 0..width {
            let x = (tile.x0 + col) as i64;

            let (sample, elevation) = match (cache.get(x, y), cache.elevation(x, y)) {
                (Some(sample), Some(elevation)) => (sample, elevation),
                _ => continue,
            };
            out.elevation[col] = elevation as f32;

            let ground = GroundPoint::from_geodetic(sample.latitude, sample.longitude, elevation);
            let coordinates = match self.sensor_coordinates(&ground) {
                Some(coordinates) => coordinates,
                None => continue,
            };
            let solution = &coordinates.solution;

            let incidence = if self.config.needs_local_geometry() {
                cache
                    .neighborhood(x, y)
                    .map(|neighborhood| {
                        local_geometry::compute(
                            &ground,
                            &neighborhood,
                            &solution.sensor_position,
                            cache.no_data_value(),
                        )
                    })
                    .unwrap_or_default()
            } else {
                LocalIncidenceResult::default()
            };

            out.local_incidence_angle[col] = to_output(incidence.local_incidence_angle);
            out.projected_local_incidence_angle[col] =
                to_output(incidence.projected_local_incidence_angle);
            if self.config.save_incidence_angle_from_ellipsoid {
                out.incidence_angle_from_ellipsoid[col] =
                    local_geometry::incidence_angle_from_ellipsoid(&ground, &solution.sensor_position)
                        as f32;
            }

            for (b, band) in bands.iter().enumerate() {
                if let Some(value) = self.geocode_sample(band, &ground, &coordinates, &incidence) {
                    out.bands[b][col] = value as f32;
                }
            }
            out.valid_pixels += 1;
        }

        out
    }

    fn geocode_sample(
        &self,
        band: &SourceBand<'_>,
        ground: &GroundPoint,
        coordinates: &SensorCoordinates,
        incidence: &LocalIncidenceResult,
    ) -> Option<f64> {
        let solution = &coordinates.solution;
        let index = &coordinates.index;

        let normalizer = match self.calibration() {
            Some(normalizer) => normalizer,
            None => return self.resampler.sample(band, index.range, index.azimuth, None),
        };

        let polarization = band.polarization?;
        let sensor_height = norm(&solution.sensor_position);
        let earth_centre_distance = ground.earth_centre_distance();

        let retro = normalizer
            .has_legacy_calibration(polarization)
            .then(|| PixelRetroCorrection {
                normalizer,
                slant_range: &self.slant_range,
                time: solution.imaging_time,
                sensor_height,
                earth_centre_distance,
                polarization,
                flipped_width: self.config.flip_range_index.then_some(self.params.width),
            });
        let correction = retro.as_ref().map(|c| c as &dyn NeighborCorrection);

        let value = self
            .resampler
            .sample(band, index.range, index.azimuth, correction)?;
        let projected_incidence_angle = incidence.projected_local_incidence_angle?;

        normalizer.normalize(
            value,
            solution.slant_range,
            sensor_height,
            earth_centre_distance,
            projected_incidence_angle,
            polarization,
            self.resampler.output_unit(band),
        )
    }
}

fn to_output(angle: Option<f64>) -> f32 {
    angle.map_or(f32::NAN, |a| a as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::{ecef_to_geodetic, WGS84_A, WGS84_B};
    use crate::types::SECONDS_PER_DAY;

    const FIRST_LINE_TIME: f64 = 58849.5;
    const LINE_INTERVAL_DAYS: f64 = 1.0 / 134_217_728.0;
    const SENSOR_X: f64 = WGS84_A + 700_000.0;

    fn line_seconds() -> f64 {
        LINE_INTERVAL_DAYS * SECONDS_PER_DAY
    }

    fn speed() -> f64 {
        5.0 / line_seconds()
    }

    fn params() -> RangeDopplerParams {
        RangeDopplerParams {
            wavelength: 0.0555,
            range_spacing: 10.0,
            azimuth_spacing: 5.0,
            timing: AcquisitionTiming::new(FIRST_LINE_TIME, LINE_INTERVAL_DAYS),
            width: 1000,
            height: 500,
            range_reference: RangeReference::SlantRange {
                near_edge_slant_range: 800_000.0,
            },
        }
    }

    fn state_vectors() -> Vec<OrbitStateVector> {
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

    /// Ellipsoid point imaged at source pixel (range, azimuth)
    fn imaged_point(range: f64, azimuth: f64) -> GroundPoint {
        let slant_range = 800_000.0 + 10.0 * range;
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

    #[test]
    fn test_default_config() {
        let config = GeocodingConfig::default();
        assert_eq!(config.resampling, ResamplingMethod::Bilinear);
        assert_eq!(config.radiometric.range_spreading_exponent, 3.0);
        assert!(config.validate().is_ok());
        assert!(!config.needs_local_geometry());
    }

    #[test]
    fn test_config_from_xml() {
        let xml = r#"
            <parameters>
                <resampling>bicubic_interpolation</resampling>
                <save_local_incidence_angle>true</save_local_incidence_angle>
                <flip_range_index>true</flip_range_index>
                <radiometric>
                    <range_spreading_exponent>4.0</range_spreading_exponent>
                </radiometric>
            </parameters>
        "#;
        let config = GeocodingConfig::from_xml(xml).unwrap();
        assert_eq!(config.resampling, ResamplingMethod::Bicubic);
        assert!(config.save_local_incidence_angle);
        assert!(config.flip_range_index);
        assert!(!config.flip_azimuth_index);
        assert_eq!(config.radiometric.range_spreading_exponent, 4.0);
        assert_eq!(config.radiometric.reference_slant_range, 800_000.0);
        assert_eq!(config.elevation_cache_capacity, DEFAULT_ELEVATION_CACHE_CAPACITY);

        let bad = "<parameters><resampling>lanczos</resampling></parameters>";
        assert!(GeocodingConfig::from_xml(bad).is_err());
    }

    #[test]
    fn test_params_validation() {
        let mut p = params();
        assert!(p.validate().is_ok());
        p.wavelength = 0.0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.height = 0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.timing.line_time_interval = 0.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_setup_errors() {
        assert!(TerrainCorrector::new(GeocodingConfig::default(), params(), &[], None).is_err());

        let config = GeocodingConfig {
            apply_radiometric_normalization: true,
            ..GeocodingConfig::default()
        };
        assert!(TerrainCorrector::new(config, params(), &state_vectors(), None).is_err());
    }

    #[test]
    fn test_leading_margin_covers_light_time() {
        let corrector =
            TerrainCorrector::new(GeocodingConfig::default(), params(), &state_vectors(), None).unwrap();
        // 2 * 809990 m / c is 8.4 lines
        assert_eq!(corrector.leading_margin(), 10);
    }

    #[test]
    fn test_sensor_coordinates_round_trip() {
        let corrector =
            TerrainCorrector::new(GeocodingConfig::default(), params(), &state_vectors(), None).unwrap();

        for &(range, azimuth) in &[(0.5, 0.5), (500.25, 250.75), (998.0, 497.5)] {
            let ground = imaged_point(range, azimuth);
            let coords = corrector.sensor_coordinates(&ground).unwrap();
            assert!((coords.index.range - range).abs() < 1e-3, "range {}", coords.index.range);
            assert!((coords.index.azimuth - azimuth).abs() < 1e-3, "azimuth {}", coords.index.azimuth);
            assert!((coords.solution.slant_range - (800_000.0 + 10.0 * range)).abs() < 1e-2);
        }

        // Beyond the far edge
        assert!(corrector.sensor_coordinates(&imaged_point(1005.0, 100.0)).is_none());
    }

    #[test]
    fn test_index_flips() {
        let config = GeocodingConfig {
            flip_range_index: true,
            flip_azimuth_index: true,
            ..GeocodingConfig::default()
        };
        let corrector = TerrainCorrector::new(config, params(), &state_vectors(), None).unwrap();
        let coords = corrector.sensor_coordinates(&imaged_point(100.0, 50.0)).unwrap();
        assert!((coords.index.range - 899.0).abs() < 1e-3);
        assert!((coords.index.azimuth - 449.0).abs() < 1e-3);
    }

    #[test]
    fn test_exact_corners_are_covered() {
        let corrector =
            TerrainCorrector::new(GeocodingConfig::default(), params(), &state_vectors(), None).unwrap();

        for &(range, azimuth) in &[(0.0, 0.0), (999.0, 0.0), (0.0, 499.0), (999.0, 499.0)] {
            let coords = corrector
                .sensor_coordinates(&imaged_point(range, azimuth))
                .unwrap_or_else(|| panic!("corner ({}, {}) not covered", range, azimuth));
            assert!((coords.index.range - range).abs() < 1e-3);
            assert!((coords.index.azimuth - azimuth).abs() < 1e-3);
            assert!(coords.index.range >= 0.0 && coords.index.range <= 999.0);
            assert!(coords.index.azimuth >= 0.0 && coords.index.azimuth <= 499.0);
        }

        // A pixel outside is still rejected
        assert!(corrector.sensor_coordinates(&imaged_point(-1.0, 100.0)).is_none());
        assert!(corrector.sensor_coordinates(&imaged_point(100.0, 500.0)).is_none());
    }

    #[test]
    fn test_raster_index_edge_tolerance() {
        let noisy = RasterIndex {
            range: -1e-9,
            azimuth: 499.0 + 1e-9,
        };
        assert!(noisy.is_valid(1000, 500));
        let snapped = noisy.clamped(1000, 500).unwrap();
        assert_eq!(snapped.range, 0.0);
        assert_eq!(snapped.azimuth, 499.0);

        let outside = RasterIndex {
            range: -0.01,
            azimuth: 10.0,
        };
        assert!(!outside.is_valid(1000, 500));
        assert!(outside.clamped(1000, 500).is_none());
    }

    #[test]
    fn test_imaging_time_trails_zero_doppler_time() {
        let corrector =
            TerrainCorrector::new(GeocodingConfig::default(), params(), &state_vectors(), None).unwrap();
        let coords = corrector.sensor_coordinates(&imaged_point(300.0, 200.0)).unwrap();
        let solution = coords.solution;

        let delay_seconds = (solution.imaging_time - solution.zero_doppler_time) * SECONDS_PER_DAY;
        let expected = 2.0 * solution.slant_range / SPEED_OF_LIGHT;
        assert!((delay_seconds - expected).abs() < 1e-5, "delay {}", delay_seconds);

        // Velocity comes from the orbit at the imaging time
        assert!((solution.sensor_velocity[2] - speed()).abs() < 1e-3);
        assert!(solution.sensor_velocity[0].abs() < 1e-3);
    }
}
