use chrono::{DateTime, Utc};
use num_complex::Complex;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Complex-valued SAR data type (I + jQ)
pub type SarComplex = Complex<f32>;

/// Real-valued intensity or amplitude data
pub type SarReal = f32;

/// 2D complex SAR data array (azimuth x range)
pub type SarImage = Array2<SarComplex>;

/// 2D real SAR data array (azimuth x range)
pub type SarRealImage = Array2<SarReal>;

/// Speed of light in vacuum (m/s)
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Seconds per day, used to move between MJD days and seconds
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Unix epoch (1970-01-01T00:00:00Z) expressed as a Modified Julian Date
pub const MJD_UNIX_EPOCH: f64 = 40_587.0;

/// Polarization modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    VV,
    VH,
    HV,
    HH,
}

impl std::fmt::Display for Polarization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Polarization::VV => write!(f, "VV"),
            Polarization::VH => write!(f, "VH"),
            Polarization::HV => write!(f, "HV"),
            Polarization::HH => write!(f, "HH"),
        }
    }
}

impl std::str::FromStr for Polarization {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "VV" => Ok(Polarization::VV),
            "VH" => Ok(Polarization::VH),
            "HV" => Ok(Polarization::HV),
            "HH" => Ok(Polarization::HH),
            _ => Err(SarError::InvalidConfiguration(format!(
                "Invalid polarization: {}",
                s
            ))),
        }
    }
}

/// Physical unit of a source band sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BandUnit {
    Amplitude,
    Intensity,
    Real,
    Imaginary,
    IntensityDb,
}

impl BandUnit {
    /// Convert a sample in this unit to linear intensity
    pub fn to_intensity(self, value: f64) -> f64 {
        match self {
            BandUnit::Amplitude => value * value,
            BandUnit::Intensity | BandUnit::Real | BandUnit::Imaginary => value,
            BandUnit::IntensityDb => 10f64.powf(value / 10.0),
        }
    }

    /// Convert linear intensity back to this unit
    pub fn from_intensity(self, intensity: f64) -> f64 {
        match self {
            BandUnit::Amplitude => intensity.max(0.0).sqrt(),
            BandUnit::Intensity | BandUnit::Real | BandUnit::Imaginary => intensity,
            BandUnit::IntensityDb => 10.0 * intensity.log10(),
        }
    }
}

/// Orbit state vector on a continuous MJD time base
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitStateVector {
    /// Time in Modified Julian Days (fractional)
    pub time: f64,
    pub position: [f64; 3], // [x, y, z] in meters
    pub velocity: [f64; 3], // [vx, vy, vz] in m/s
}

impl OrbitStateVector {
    pub fn new(time: f64, position: [f64; 3], velocity: [f64; 3]) -> Self {
        Self {
            time,
            position,
            velocity,
        }
    }

    /// Build a state vector from a UTC timestamp
    pub fn from_utc(time: DateTime<Utc>, position: [f64; 3], velocity: [f64; 3]) -> Self {
        Self::new(utc_to_mjd(time), position, velocity)
    }
}

/// Convert a UTC timestamp to a fractional Modified Julian Date
pub fn utc_to_mjd(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + time.timestamp_subsec_nanos() as f64 * 1e-9;
    MJD_UNIX_EPOCH + seconds / SECONDS_PER_DAY
}

/// Azimuth time base of the source image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionTiming {
    /// Zero-Doppler time of the first line (MJD)
    pub first_line_time: f64,
    /// Time between consecutive lines (days)
    pub line_time_interval: f64,
}

impl AcquisitionTiming {
    pub fn new(first_line_time: f64, line_time_interval: f64) -> Self {
        Self {
            first_line_time,
            line_time_interval,
        }
    }

    /// Build the timing from a UTC first-line time and a line interval in seconds
    pub fn from_utc(first_line_time: DateTime<Utc>, line_interval_seconds: f64) -> Self {
        Self::new(
            utc_to_mjd(first_line_time),
            line_interval_seconds / SECONDS_PER_DAY,
        )
    }

    /// Line interval in seconds
    pub fn line_interval_seconds(&self) -> f64 {
        self.line_time_interval * SECONDS_PER_DAY
    }

    /// MJD time of a (fractional) line index
    pub fn line_time(&self, line: f64) -> f64 {
        self.first_line_time + line * self.line_time_interval
    }

    /// Fractional line index of an MJD time
    pub fn line_at(&self, time: f64) -> f64 {
        (time - self.first_line_time) / self.line_time_interval
    }

    pub fn validate(&self) -> SarResult<()> {
        if !self.first_line_time.is_finite() {
            return Err(SarError::InvalidConfiguration(
                "First line time is not finite".to_string(),
            ));
        }
        if !(self.line_time_interval > 0.0) {
            return Err(SarError::InvalidConfiguration(format!(
                "Line time interval must be positive, got {}",
                self.line_time_interval
            )));
        }
        Ok(())
    }
}

/// Slant-range-to-ground-range polynomial valid at one azimuth time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrgrCoefficientSet {
    /// Time in Modified Julian Days
    pub time: f64,
    /// Ground range origin in meters
    pub ground_range_origin: f64,
    /// Polynomial coefficients, lowest degree first
    pub coefficients: Vec<f64>,
}

impl SrgrCoefficientSet {
    /// Evaluate slant range for a ground range measured from the origin (Horner)
    pub fn slant_range(&self, ground_range_from_origin: f64) -> f64 {
        evaluate_polynomial(&self.coefficients, ground_range_from_origin)
    }
}

/// Horner evaluation, coefficients lowest degree first
pub fn evaluate_polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Geospatial transformation parameters (GDAL ordering)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up geographic grid anchored at the upper-left corner
    pub fn north_up(top_left_lon: f64, top_left_lat: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            top_left_x: top_left_lon,
            pixel_width,
            rotation_x: 0.0,
            top_left_y: top_left_lat,
            rotation_y: 0.0,
            pixel_height: -pixel_height.abs(),
        }
    }

    /// Map (column, row) in grid coordinates to (lon, lat); integer values address pixel corners
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let lon = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let lat = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (lon, lat)
    }

    /// Inverse of [`GeoTransform::apply`], returning fractional (column, row)
    pub fn invert(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        let det = self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y;
        if det.abs() < f64::EPSILON {
            return None;
        }
        let dx = lon - self.top_left_x;
        let dy = lat - self.top_left_y;
        let col = (dx * self.pixel_height - dy * self.rotation_x) / det;
        let row = (dy * self.pixel_width - dx * self.rotation_y) / det;
        Some((col, row))
    }
}

/// Rectangle of the target raster processed in one call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

impl TileRect {
    pub fn new(x0: usize, y0: usize, width: usize, height: usize) -> Self {
        Self {
            x0,
            y0,
            width,
            height,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

/// Error types for SAR geocoding
#[derive(Debug, thiserror::Error)]
pub enum SarError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Elevation lookup failed: {0}")]
    Elevation(String),

    #[error("Calibration error: {0}")]
    Calibration(String),
}

/// Result type for SAR operations
pub type SarResult<T> = Result<T, SarError>;
