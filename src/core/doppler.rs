use crate::core::geometry::{dot, norm, sub};
use crate::core::orbit::OrbitInterpolator;
use crate::types::{AcquisitionTiming, SarError, SarResult};

/// Zero-Doppler time search over a window of scan lines.
///
/// Sensor position and velocity are tabulated once per line; a query brackets
/// the sign change of the Doppler frequency with integer-line bisection and
/// finishes with a single secant step inside the last one-line bracket.
#[derive(Debug, Clone)]
pub struct ZeroDopplerSolver {
    orbit: OrbitInterpolator,
    timing: AcquisitionTiming,
    wavelength: f64,
    /// Offset of line 0 from the orbit reference time (s)
    line_zero_offset: f64,
    line_interval: f64,
    first_line: i64,
    positions: Vec<[f64; 3]>,
    velocities: Vec<[f64; 3]>,
}

impl ZeroDopplerSolver {
    /// Tabulate sensor states for lines `first_line..=last_line`.
    ///
    /// `first_line` may be negative to search before the first image line.
    pub fn new(
        orbit: &OrbitInterpolator,
        timing: AcquisitionTiming,
        wavelength: f64,
        first_line: i64,
        last_line: i64,
    ) -> SarResult<Self> {
        timing.validate()?;
        if !(wavelength > 0.0) {
            return Err(SarError::InvalidConfiguration(format!(
                "Radar wavelength must be positive, got {}",
                wavelength
            )));
        }
        if last_line <= first_line {
            return Err(SarError::InvalidConfiguration(format!(
                "Doppler search window needs at least two lines ({}..={})",
                first_line, last_line
            )));
        }

        let line_zero_offset = orbit.offset_seconds(timing.first_line_time);
        let line_interval = timing.line_interval_seconds();

        let (positions, velocities): (Vec<_>, Vec<_>) = (first_line..=last_line)
            .map(|line| orbit.state_at_offset(line_zero_offset + line as f64 * line_interval))
            .unzip();

        log::debug!(
            "Tabulated {} sensor states for lines {}..={}",
            positions.len(),
            first_line,
            last_line
        );

        Ok(Self {
            orbit: orbit.clone(),
            timing,
            wavelength,
            line_zero_offset,
            line_interval,
            first_line,
            positions,
            velocities,
        })
    }

    pub fn first_line(&self) -> i64 {
        self.first_line
    }

    pub fn last_line(&self) -> i64 {
        self.first_line + self.positions.len() as i64 - 1
    }

    pub fn timing(&self) -> &AcquisitionTiming {
        &self.timing
    }

    pub fn wavelength(&self) -> f64 {
        self.wavelength
    }

    /// Sensor position and velocity at a fractional line index
    pub fn sensor_state_at_line(&self, line: f64) -> ([f64; 3], [f64; 3]) {
        self.orbit
            .state_at_offset(self.line_zero_offset + line * self.line_interval)
    }

    /// Doppler frequency (Hz) toward `ground` at a fractional line index
    pub fn doppler_at_line(&self, line: f64, ground: &[f64; 3]) -> f64 {
        let (position, velocity) = self.sensor_state_at_line(line);
        doppler_frequency(&position, &velocity, ground, self.wavelength)
    }

    /// Fractional line index at which the Doppler frequency toward `ground` is zero
    pub fn solve_line(&self, ground: &[f64; 3]) -> Option<f64> {
        let mut lower = 0usize;
        let mut upper = self.positions.len() - 1;

        let mut f_lower = self.tabulated_doppler(lower, ground);
        let mut f_upper = self.tabulated_doppler(upper, ground);

        if f_lower == 0.0 {
            return Some(self.line_of(lower));
        }
        if f_upper == 0.0 {
            return Some(self.line_of(upper));
        }
        if !(f_lower * f_upper < 0.0) {
            return None;
        }

        while upper - lower > 1 {
            let mid = (lower + upper) / 2;
            let f_mid = self.tabulated_doppler(mid, ground);
            if f_mid == 0.0 {
                return Some(self.line_of(mid));
            }
            if f_mid * f_lower > 0.0 {
                lower = mid;
                f_lower = f_mid;
            } else {
                upper = mid;
                f_upper = f_mid;
            }
        }

        let offset = -f_lower * (upper - lower) as f64 / (f_upper - f_lower);
        Some(self.line_of(lower) + offset)
    }

    /// Zero-Doppler time (MJD) toward `ground`
    pub fn solve(&self, ground: &[f64; 3]) -> Option<f64> {
        self.solve_line(ground)
            .map(|line| self.timing.line_time(line))
    }

    fn tabulated_doppler(&self, index: usize, ground: &[f64; 3]) -> f64 {
        doppler_frequency(
            &self.positions[index],
            &self.velocities[index],
            ground,
            self.wavelength,
        )
    }

    fn line_of(&self, index: usize) -> f64 {
        (self.first_line + index as i64) as f64
    }
}

/// Doppler frequency `2 v·(s - g) / (|s - g| λ)`
pub fn doppler_frequency(
    position: &[f64; 3],
    velocity: &[f64; 3],
    ground: &[f64; 3],
    wavelength: f64,
) -> f64 {
    let look = sub(position, ground);
    2.0 * dot(velocity, &look) / (norm(&look) * wavelength)
}
