use crate::core::geometry::norm;
use crate::types::{OrbitStateVector, SarError, SarResult, SECONDS_PER_DAY};

/// Maximum number of state vectors used for the Lagrange fit
pub const MAX_INTERPOLATION_VECTORS: usize = 5;

/// Satellite trajectory fitted with a Lagrange polynomial through a handful
/// of orbit state vectors.
///
/// Sample times are stored in seconds relative to the first selected vector so
/// that evaluation does not lose precision on the MJD time base.
#[derive(Debug, Clone)]
pub struct OrbitInterpolator {
    reference_time: f64,
    times: Vec<f64>,
    positions: Vec<[f64; 3]>,
    velocities: Vec<[f64; 3]>,
}

impl OrbitInterpolator {
    /// Build the interpolator from time-ordered state vectors
    pub fn new(state_vectors: &[OrbitStateVector]) -> SarResult<Self> {
        if state_vectors.is_empty() {
            return Err(SarError::InvalidConfiguration(
                "No orbit state vectors supplied".to_string(),
            ));
        }

        for pair in state_vectors.windows(2) {
            if !(pair[1].time > pair[0].time) {
                return Err(SarError::InvalidConfiguration(format!(
                    "Orbit state vectors are not strictly time-ordered ({} followed by {})",
                    pair[0].time, pair[1].time
                )));
            }
        }

        validate_orbit_sanity(state_vectors);

        let selected = select_interpolation_vectors(state_vectors);
        if selected.len() < 2 {
            log::warn!("Not enough state vectors for interpolation, orbit will be held constant");
        }

        let reference_time = selected[0].time;
        let times = selected
            .iter()
            .map(|sv| (sv.time - reference_time) * SECONDS_PER_DAY)
            .collect();
        let positions = selected.iter().map(|sv| sv.position).collect();
        let velocities = selected.iter().map(|sv| sv.velocity).collect();

        log::debug!(
            "Orbit interpolator uses {} of {} state vectors",
            selected.len(),
            state_vectors.len()
        );

        Ok(Self {
            reference_time,
            times,
            positions,
            velocities,
        })
    }

    /// MJD time that offsets passed to [`OrbitInterpolator::state_at_offset`] are relative to
    pub fn reference_time(&self) -> f64 {
        self.reference_time
    }

    /// Seconds between the reference time and `time` (MJD)
    pub fn offset_seconds(&self, time: f64) -> f64 {
        (time - self.reference_time) * SECONDS_PER_DAY
    }

    /// Number of state vectors retained for the fit
    pub fn vector_count(&self) -> usize {
        self.times.len()
    }

    /// Satellite position at `time` (MJD)
    pub fn position_at(&self, time: f64) -> [f64; 3] {
        lagrange_interpolate(&self.times, &self.positions, self.offset_seconds(time))
    }

    /// Satellite velocity at `time` (MJD)
    pub fn velocity_at(&self, time: f64) -> [f64; 3] {
        lagrange_interpolate(&self.times, &self.velocities, self.offset_seconds(time))
    }

    /// Position and velocity at `time` (MJD)
    pub fn state_at(&self, time: f64) -> ([f64; 3], [f64; 3]) {
        self.state_at_offset(self.offset_seconds(time))
    }

    /// Position and velocity `seconds` after the reference time
    pub fn state_at_offset(&self, seconds: f64) -> ([f64; 3], [f64; 3]) {
        (
            lagrange_interpolate(&self.times, &self.positions, seconds),
            lagrange_interpolate(&self.times, &self.velocities, seconds),
        )
    }
}

/// Pick up to [`MAX_INTERPOLATION_VECTORS`] evenly spaced vectors; first and last are always kept
fn select_interpolation_vectors(state_vectors: &[OrbitStateVector]) -> Vec<OrbitStateVector> {
    let count = state_vectors.len();
    let used = count.min(MAX_INTERPOLATION_VECTORS);
    if used == count {
        return state_vectors.to_vec();
    }

    (0..used)
        .map(|i| {
            let idx = ((i * (count - 1)) as f64 / (used - 1) as f64).round() as usize;
            state_vectors[idx]
        })
        .collect()
}

/// Lagrange polynomial interpolation, one polynomial per coordinate
fn lagrange_interpolate(times: &[f64], values: &[[f64; 3]], target_time: f64) -> [f64; 3] {
    let n = times.len();
    let mut result = [0.0; 3];

    for i in 0..n {
        let ti = times[i];
        let mut li = 1.0;

        for (j, &tj) in times.iter().enumerate() {
            if i != j {
                li *= (target_time - tj) / (ti - tj);
            }
        }

        for coord in 0..3 {
            result[coord] += li * values[i][coord];
        }
    }

    result
}

/// Warn about state vectors that do not look like a low Earth orbit
fn validate_orbit_sanity(state_vectors: &[OrbitStateVector]) {
    for sv in state_vectors {
        let speed = norm(&sv.velocity);
        if !(6000.0..=9000.0).contains(&speed) {
            log::warn!("Unusual orbital velocity: {:.1} m/s at MJD {:.6}", speed, sv.time);
        }

        let radius = norm(&sv.position);
        if !(6_500_000.0..=7_500_000.0).contains(&radius) {
            log::warn!(
                "Unusual orbital radius: {:.1} km at MJD {:.6}",
                radius / 1000.0,
                sv.time
            );
        }
    }
}
