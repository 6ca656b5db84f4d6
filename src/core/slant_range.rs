use serde::{Deserialize, Serialize};

use crate::core::geometry::distance;
use crate::core::orbit::OrbitInterpolator;
use crate::types::{
    evaluate_polynomial, SarError, SarResult, SrgrCoefficientSet, SECONDS_PER_DAY,
};

/// Ground range bisection stops once the polynomial is within this distance (m) of the target
pub const GROUND_RANGE_TOLERANCE: f64 = 0.1;

const MAX_BISECTION_STEPS: usize = 100;

/// Slack (days, 10 µs) on the acquisition window for times rounded onto an edge line
const TIME_WINDOW_TOLERANCE: f64 = 1e-5 / SECONDS_PER_DAY;

/// How source range pixels relate to slant range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RangeReference {
    /// Slant range product, pixels evenly spaced in slant range
    SlantRange { near_edge_slant_range: f64 },
    /// Ground range product described by time-ordered SRGR polynomials
    GroundRange { srgr: Vec<SrgrCoefficientSet> },
}

/// Conversions between slant range, ground range and source range index
#[derive(Debug, Clone)]
pub struct SlantRangeModel {
    reference: RangeReference,
    range_spacing: f64,
    width: usize,
    first_line_time: f64,
    last_line_time: f64,
}

impl SlantRangeModel {
    pub fn new(
        reference: RangeReference,
        range_spacing: f64,
        width: usize,
        first_line_time: f64,
        last_line_time: f64,
    ) -> SarResult<Self> {
        if !(range_spacing > 0.0) {
            return Err(SarError::InvalidConfiguration(format!(
                "Range pixel spacing must be positive, got {}",
                range_spacing
            )));
        }
        if width == 0 {
            return Err(SarError::InvalidConfiguration(
                "Source image width is zero".to_string(),
            ));
        }
        if !(last_line_time >= first_line_time) {
            return Err(SarError::InvalidConfiguration(format!(
                "Last line time {} precedes first line time {}",
                last_line_time, first_line_time
            )));
        }

        match &reference {
            RangeReference::SlantRange {
                near_edge_slant_range,
            } => {
                if !(*near_edge_slant_range > 0.0) {
                    return Err(SarError::InvalidConfiguration(format!(
                        "Near edge slant range must be positive, got {}",
                        near_edge_slant_range
                    )));
                }
            }
            RangeReference::GroundRange { srgr } => {
                if srgr.is_empty() {
                    return Err(SarError::InvalidConfiguration(
                        "Ground range product without SRGR coefficients".to_string(),
                    ));
                }
                if srgr.iter().any(|set| set.coefficients.is_empty()) {
                    return Err(SarError::InvalidConfiguration(
                        "SRGR coefficient set without coefficients".to_string(),
                    ));
                }
                for pair in srgr.windows(2) {
                    if !(pair[1].time > pair[0].time) {
                        return Err(SarError::InvalidConfiguration(format!(
                            "SRGR coefficient sets are not strictly time-ordered ({} followed by {})",
                            pair[0].time, pair[1].time
                        )));
                    }
                }
            }
        }

        Ok(Self {
            reference,
            range_spacing,
            width,
            first_line_time,
            last_line_time,
        })
    }

    pub fn reference(&self) -> &RangeReference {
        &self.reference
    }

    /// Slant range and sensor position for `ground` at `time` (MJD)
    pub fn slant_range_at(
        orbit: &OrbitInterpolator,
        time: f64,
        ground: &[f64; 3],
    ) -> (f64, [f64; 3]) {
        let position = orbit.position_at(time);
        (distance(&position, ground), position)
    }

    /// Fractional source range index for a slant range at `time` (MJD)
    pub fn range_index(&self, time: f64, slant_range: f64) -> Option<f64> {
        if time < self.first_line_time - TIME_WINDOW_TOLERANCE
            || time > self.last_line_time + TIME_WINDOW_TOLERANCE
        {
            return None;
        }

        match &self.reference {
            RangeReference::SlantRange {
                near_edge_slant_range,
            } => Some((slant_range - near_edge_slant_range) / self.range_spacing),
            RangeReference::GroundRange { srgr } => {
                let polynomial = BlendedPolynomial::at(srgr, time);
                let ground_range = self.invert_polynomial(&polynomial, slant_range)?;
                Some((ground_range - polynomial.origin) / self.range_spacing)
            }
        }
    }

    /// Ground range (m) for a slant range at `time`; only defined for ground range products
    pub fn ground_range(&self, time: f64, slant_range: f64) -> Option<f64> {
        match &self.reference {
            RangeReference::SlantRange { .. } => None,
            RangeReference::GroundRange { srgr } => {
                let polynomial = BlendedPolynomial::at(srgr, time);
                self.invert_polynomial(&polynomial, slant_range)
            }
        }
    }

    /// Slant range (m) at a ground range measured on the SRGR ground range axis
    pub fn slant_range_for_ground_range(&self, time: f64, ground_range: f64) -> f64 {
        match &self.reference {
            RangeReference::SlantRange {
                near_edge_slant_range,
            } => near_edge_slant_range + ground_range,
            RangeReference::GroundRange { srgr } => {
                let polynomial = BlendedPolynomial::at(srgr, time);
                polynomial.evaluate(ground_range - polynomial.origin)
            }
        }
    }

    /// Slant range (m) at a fractional source range index
    pub fn slant_range_for_index(&self, time: f64, index: f64) -> f64 {
        match &self.reference {
            RangeReference::SlantRange {
                near_edge_slant_range,
            } => near_edge_slant_range + index * self.range_spacing,
            RangeReference::GroundRange { srgr } => {
                BlendedPolynomial::at(srgr, time).evaluate(index * self.range_spacing)
            }
        }
    }

    /// Largest slant range covered by the image
    pub fn far_edge_slant_range(&self) -> f64 {
        let far_offset = (self.width - 1) as f64 * self.range_spacing;
        match &self.reference {
            RangeReference::SlantRange {
                near_edge_slant_range,
            } => near_edge_slant_range + far_offset,
            RangeReference::GroundRange { srgr } => srgr
                .iter()
                .flat_map(|set| [set.slant_range(0.0), set.slant_range(far_offset)])
                .fold(f64::MIN, f64::max),
        }
    }

    /// Bisection for the ground range whose slant range matches `slant_range`
    fn invert_polynomial(&self, polynomial: &BlendedPolynomial, slant_range: f64) -> Option<f64> {
        let mut lower = polynomial.origin;
        let mut upper = polynomial.origin + self.width as f64 * self.range_spacing;

        let r_lower = polynomial.evaluate(lower - polynomial.origin);
        let r_upper = polynomial.evaluate(upper - polynomial.origin);
        if slant_range < r_lower.min(r_upper) || slant_range > r_lower.max(r_upper) {
            return None;
        }
        let increasing = r_upper >= r_lower;

        for _ in 0..MAX_BISECTION_STEPS {
            let mid = 0.5 * (lower + upper);
            let r_mid = polynomial.evaluate(mid - polynomial.origin);
            if (r_mid - slant_range).abs() < GROUND_RANGE_TOLERANCE {
                return Some(mid);
            }
            if (r_mid < slant_range) == increasing {
                lower = mid;
            } else {
                upper = mid;
            }
        }

        None
    }
}

/// SRGR polynomial interpolated to one azimuth time
#[derive(Debug, Clone)]
struct BlendedPolynomial {
    origin: f64,
    coefficients: Vec<f64>,
}

impl BlendedPolynomial {
    fn at(srgr: &[SrgrCoefficientSet], time: f64) -> Self {
        let mut idx = srgr
            .iter()
            .rposition(|set| set.time <= time)
            .unwrap_or(0);

        if srgr.len() == 1 {
            return Self {
                origin: srgr[0].ground_range_origin,
                coefficients: srgr[0].coefficients.clone(),
            };
        }
        if idx == srgr.len() - 1 {
            idx -= 1;
        }

        let current = &srgr[idx];
        let next = &srgr[idx + 1];
        let mu = ((time - current.time) / (next.time - current.time)).clamp(0.0, 1.0);

        let degree = current.coefficients.len().max(next.coefficients.len());
        let coefficients = (0..degree)
            .map(|i| {
                let c0 = current.coefficients.get(i).copied().unwrap_or(0.0);
                let c1 = next.coefficients.get(i).copied().unwrap_or(0.0);
                c0 + mu * (c1 - c0)
            })
            .collect();

        Self {
            origin: current.ground_range_origin,
            coefficients,
        }
    }

    fn evaluate(&self, ground_range_from_origin: f64) -> f64 {
        evaluate_polynomial(&self.coefficients, ground_range_from_origin)
    }
}
