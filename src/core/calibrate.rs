use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::resample::{CorrectedSample, SubSwathIndex};
use crate::types::{BandUnit, Polarization, SarError, SarResult};

/// Reference slant range for range spreading loss (m)
pub const REFERENCE_SLANT_RANGE: f64 = 800_000.0;

/// Angular step of antenna pattern tables (degrees)
pub const ANTENNA_PATTERN_STEP: f64 = 0.05;

/// Half-width of an antenna pattern table around its reference angle (degrees)
pub const ANTENNA_PATTERN_HALF_WIDTH: f64 = 5.0;

/// Radiometric normalization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiometricConfig {
    /// Exponent of the range spreading loss term (4.0 for products with a
    /// two-way spreading correction)
    pub range_spreading_exponent: f64,
    pub reference_slant_range: f64,
    /// Write calibrated values in dB
    pub output_in_db: bool,
}

impl Default for RadiometricConfig {
    fn default() -> Self {
        Self {
            range_spreading_exponent: 3.0,
            reference_slant_range: REFERENCE_SLANT_RANGE,
            output_in_db: false,
        }
    }
}

impl RadiometricConfig {
    pub fn validate(&self) -> SarResult<()> {
        if !self.range_spreading_exponent.is_finite() {
            return Err(SarError::InvalidConfiguration(
                "Range spreading exponent is not finite".to_string(),
            ));
        }
        if !(self.reference_slant_range > 0.0) {
            return Err(SarError::InvalidConfiguration(format!(
                "Reference slant range must be positive, got {}",
                self.reference_slant_range
            )));
        }
        Ok(())
    }
}

/// Elevation antenna pattern of one sub-swath.
///
/// Gains are tabulated in dB every [`ANTENNA_PATTERN_STEP`] degrees starting
/// [`ANTENNA_PATTERN_HALF_WIDTH`] below the reference elevation angle.
#[derive(Debug, Clone, PartialEq)]
pub struct AntennaPattern {
    reference_elevation_angle: f64,
    linear_gains: Vec<f64>,
}

impl AntennaPattern {
    pub fn new(reference_elevation_angle: f64, gains_db: &[f64]) -> SarResult<Self> {
        if gains_db.len() < 2 {
            return Err(SarError::Calibration(format!(
                "Antenna pattern needs at least two samples, got {}",
                gains_db.len()
            )));
        }
        if !reference_elevation_angle.is_finite() || gains_db.iter().any(|g| !g.is_finite()) {
            return Err(SarError::Calibration(
                "Antenna pattern contains non-finite values".to_string(),
            ));
        }

        Ok(Self {
            reference_elevation_angle,
            linear_gains: gains_db.iter().map(|g| 10f64.powf(g / 10.0)).collect(),
        })
    }

    pub fn reference_elevation_angle(&self) -> f64 {
        self.reference_elevation_angle
    }

    /// Linear two-way gain at an elevation angle (degrees)
    pub fn gain(&self, elevation_angle: f64) -> f64 {
        let start = self.reference_elevation_angle - ANTENNA_PATTERN_HALF_WIDTH;
        let position = (elevation_angle - start) / ANTENNA_PATTERN_STEP;
        let last = self.linear_gains.len() - 2;

        let k0 = if position <= 0.0 {
            0
        } else {
            (position.floor() as usize).min(last)
        };
        let lambda = (position - k0 as f64).clamp(0.0, 1.0);

        (1.0 - lambda) * self.linear_gains[k0] + lambda * self.linear_gains[k0 + 1]
    }
}

/// Antenna patterns for every sub-swath of an acquisition
#[derive(Debug, Clone, PartialEq)]
pub struct GainTable {
    patterns: Vec<AntennaPattern>,
}

impl GainTable {
    pub fn new(patterns: Vec<AntennaPattern>) -> SarResult<Self> {
        if patterns.is_empty() {
            return Err(SarError::Calibration("Gain table without antenna patterns".to_string()));
        }
        Ok(Self { patterns })
    }

    /// Single-beam table
    pub fn single(pattern: AntennaPattern) -> Self {
        Self {
            patterns: vec![pattern],
        }
    }

    /// Sub-swath whose reference elevation angle is closest to `elevation_angle`
    pub fn select(&self, elevation_angle: f64) -> (SubSwathIndex, &AntennaPattern) {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, pattern) in self.patterns.iter().enumerate() {
            let distance = (pattern.reference_elevation_angle - elevation_angle).abs();
            if distance < best_distance {
                best = i;
                best_distance = distance;
            }
        }
        (SubSwathIndex(best), &self.patterns[best])
    }

    /// Linear gain and the sub-swath it came from
    pub fn gain(&self, elevation_angle: f64) -> (f64, SubSwathIndex) {
        let (index, pattern) = self.select(elevation_angle);
        (pattern.gain(elevation_angle), index)
    }
}

/// Calibration constant and antenna gains for one polarization
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSet {
    pub calibration_constant: f64,
    pub gain_table: GainTable,
}

impl CalibrationSet {
    pub fn new(calibration_constant: f64, gain_table: GainTable) -> SarResult<Self> {
        if !(calibration_constant > 0.0) {
            return Err(SarError::Calibration(format!(
                "Calibration constant must be positive, got {}",
                calibration_constant
            )));
        }
        Ok(Self {
            calibration_constant,
            gain_table,
        })
    }
}

/// Look angle from the sensor (degrees) between nadir and the ground point.
///
/// `sensor_height` and `earth_centre_distance` are distances from the Earth's
/// centre to the sensor and to the ground point.
pub fn elevation_angle(slant_range: f64, sensor_height: f64, earth_centre_distance: f64) -> f64 {
    let cos_angle = (slant_range * slant_range + sensor_height * sensor_height
        - earth_centre_distance * earth_centre_distance)
        / (2.0 * slant_range * sensor_height);
    cos_angle.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Converts resampled values to calibrated sigma nought
#[derive(Debug, Clone, Default)]
pub struct RadiometricNormalizer {
    config: RadiometricConfig,
    calibration: HashMap<Polarization, CalibrationSet>,
    legacy: HashMap<Polarization, CalibrationSet>,
}

impl RadiometricNormalizer {
    pub fn new(config: RadiometricConfig) -> SarResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            calibration: HashMap::new(),
            legacy: HashMap::new(),
        })
    }

    pub fn with_calibration(mut self, polarization: Polarization, set: CalibrationSet) -> Self {
        self.calibration.insert(polarization, set);
        self
    }

    /// Archived calibration applied to the product, undone by [`RadiometricNormalizer::retro_correct`]
    pub fn with_legacy_calibration(mut self, polarization: Polarization, set: CalibrationSet) -> Self {
        self.legacy.insert(polarization, set);
        self
    }

    pub fn config(&self) -> &RadiometricConfig {
        &self.config
    }

    /// Replace the normalization settings, keeping the calibration sets
    pub fn with_config(mut self, config: RadiometricConfig) -> Self {
        log::debug!(
            "Radiometric normalization: range spreading exponent {}, reference slant range {:.0} m",
            config.range_spreading_exponent,
            config.reference_slant_range
        );
        self.config = config;
        self
    }

    pub fn has_calibration(&self, polarization: Polarization) -> bool {
        self.calibration.contains_key(&polarization)
    }

    pub fn has_legacy_calibration(&self, polarization: Polarization) -> bool {
        self.legacy.contains_key(&polarization)
    }

    fn range_spreading(&self, slant_range: f64) -> f64 {
        (slant_range / self.config.reference_slant_range).powf(self.config.range_spreading_exponent)
    }

    /// Calibrated backscatter from a resampled value in `unit`.
    ///
    /// `None` when the polarization has no calibration set or the result is
    /// not representable (non-positive gain, non-positive value in dB output).
    #[allow(clippy::too_many_arguments)]
    pub fn normalize(
        &self,
        raw: f64,
        slant_range: f64,
        sensor_height: f64,
        earth_centre_distance: f64,
        projected_incidence_angle: f64,
        polarization: Polarization,
        unit: BandUnit,
    ) -> Option<f64> {
        let set = self.calibration.get(&polarization)?;

        let intensity = unit.to_intensity(raw);
        let theta = elevation_angle(slant_range, sensor_height, earth_centre_distance);
        let (gain, _) = set.gain_table.gain(theta);
        if !(gain > 0.0) {
            return None;
        }

        let sigma0 = intensity / set.calibration_constant / (gain * gain)
            * self.range_spreading(slant_range)
            * projected_incidence_angle.abs().to_radians().sin();

        if self.config.output_in_db {
            if sigma0 <= 0.0 {
                return None;
            }
            return Some(10.0 * sigma0.log10());
        }
        Some(sigma0)
    }

    /// Undo the legacy calibration of one source sample.
    ///
    /// Without a legacy set for `polarization` the value passes through untagged.
    pub fn retro_correct(
        &self,
        value: f64,
        slant_range: f64,
        sensor_height: f64,
        earth_centre_distance: f64,
        polarization: Polarization,
        unit: BandUnit,
    ) -> CorrectedSample {
        let set = match self.legacy.get(&polarization) {
            Some(set) => set,
            None => {
                return CorrectedSample {
                    value,
                    sub_swath: None,
                }
            }
        };

        let theta = elevation_angle(slant_range, sensor_height, earth_centre_distance);
        let (gain, sub_swath) = set.gain_table.gain(theta);
        let intensity = unit.to_intensity(value);
        let raw_intensity =
            intensity * set.calibration_constant * gain * gain / self.range_spreading(slant_range);

        CorrectedSample {
            value: unit.from_intensity(raw_intensity),
            sub_swath: Some(sub_swath),
        }
    }

    /// Fail when any of `polarizations` lacks a calibration set
    pub fn check_polarizations(&self, polarizations: &[Polarization]) -> SarResult<()> {
        for polarization in polarizations {
            if !self.has_calibration(*polarization) {
                return Err(SarError::InvalidConfiguration(format!(
                    "No calibration tables for polarization {}",
                    polarization
                )));
            }
        }
        Ok(())
    }
}
