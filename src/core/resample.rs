use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::io::raster::SampleSource;
use crate::types::{BandUnit, Polarization, SarError, SarImage, SarResult};

/// Interpolation methods for SAR data resampling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResamplingMethod {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

impl ResamplingMethod {
    pub fn name(self) -> &'static str {
        match self {
            ResamplingMethod::Nearest => "nearest",
            ResamplingMethod::Bilinear => "bilinear",
            ResamplingMethod::Bicubic => "bicubic",
        }
    }
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResamplingMethod {
    type Err = SarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "nearest_neighbour" => Ok(ResamplingMethod::Nearest),
            "bilinear" | "bilinear_interpolation" => Ok(ResamplingMethod::Bilinear),
            "bicubic" | "bicubic_interpolation" => Ok(ResamplingMethod::Bicubic),
            _ => Err(SarError::InvalidConfiguration(format!(
                "Unsupported resampling method: {}",
                s
            ))),
        }
    }
}

impl TryFrom<String> for ResamplingMethod {
    type Error = SarError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResamplingMethod> for String {
    fn from(method: ResamplingMethod) -> Self {
        method.name().to_string()
    }
}

/// Antenna sub-swath a gain sample belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubSwathIndex(pub usize);

/// A neighbor value after per-sample correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectedSample {
    pub value: f64,
    pub sub_swath: Option<SubSwathIndex>,
}

/// Per-neighbor correction applied before interpolation
pub trait NeighborCorrection {
    /// Correct `value` (in `unit`) read at source pixel (x, y)
    fn correct(&self, value: f64, unit: BandUnit, x: usize, y: usize) -> CorrectedSample;
}

/// Sample storage of a source band
#[derive(Clone, Copy)]
pub enum BandData<'a> {
    Real(&'a dyn SampleSource),
    /// Complex band stored as separate I and Q rasters
    Complex {
        i: &'a dyn SampleSource,
        q: &'a dyn SampleSource,
    },
    ComplexArray(&'a SarImage),
}

/// One source band handed to the geocoder
#[derive(Clone)]
pub struct SourceBand<'a> {
    pub name: String,
    pub unit: BandUnit,
    pub no_data_value: f64,
    pub polarization: Option<Polarization>,
    pub data: BandData<'a>,
}

impl<'a> SourceBand<'a> {
    pub fn new(name: &str, unit: BandUnit, no_data_value: f64, data: BandData<'a>) -> Self {
        Self {
            name: name.to_string(),
            unit,
            no_data_value,
            polarization: None,
            data,
        }
    }

    pub fn with_polarization(mut self, polarization: Polarization) -> Self {
        self.polarization = Some(polarization);
        self
    }

    pub fn is_complex(&self) -> bool {
        !matches!(self.data, BandData::Real(_))
    }

    /// Unit of the values fed to interpolation; complex bands become intensity
    pub fn sample_unit(&self) -> BandUnit {
        if self.is_complex() {
            BandUnit::Intensity
        } else {
            self.unit
        }
    }

    /// (width, height) of the band, failing if I and Q disagree
    pub fn dimensions(&self) -> SarResult<(usize, usize)> {
        match self.data {
            BandData::Real(source) => Ok(source.dimensions()),
            BandData::Complex { i, q } => {
                if i.dimensions() != q.dimensions() {
                    return Err(SarError::InvalidConfiguration(format!(
                        "Band {}: I {:?} and Q {:?} dimensions differ",
                        self.name,
                        i.dimensions(),
                        q.dimensions()
                    )));
                }
                Ok(i.dimensions())
            }
            BandData::ComplexArray(image) => Ok((image.ncols(), image.nrows())),
        }
    }

    /// Raw sample at (x, y), intensity for complex bands; `None` on no-data
    pub fn raw_sample(&self, x: usize, y: usize) -> Option<f64> {
        match self.data {
            BandData::Real(source) => {
                let v = source.sample(x, y);
                (!self.is_no_data(v)).then_some(v)
            }
            BandData::Complex { i, q } => {
                let (iv, qv) = (i.sample(x, y), q.sample(x, y));
                (!self.is_no_data(iv) && !self.is_no_data(qv)).then(|| iv * iv + qv * qv)
            }
            BandData::ComplexArray(image) => {
                let c = image[[y, x]];
                let (iv, qv) = (c.re as f64, c.im as f64);
                (!self.is_no_data(iv) && !self.is_no_data(qv)).then(|| iv * iv + qv * qv)
            }
        }
    }

    fn is_no_data(&self, v: f64) -> bool {
        v == self.no_data_value || (self.no_data_value.is_nan() && v.is_nan())
    }
}

impl std::fmt::Debug for SourceBand<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceBand")
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("no_data_value", &self.no_data_value)
            .field("polarization", &self.polarization)
            .field("complex", &self.is_complex())
            .finish()
    }
}

/// 1-D interpolation stencil along one axis
#[derive(Debug, Clone, Copy)]
struct Stencil {
    indices: [usize; 4],
    weights: [f64; 4],
    len: usize,
    /// Slot of the neighbor closest to the sample position
    nearest: usize,
}

impl Stencil {
    fn new(method: ResamplingMethod, coord: f64, size: usize) -> Self {
        let last = size.saturating_sub(1) as isize;
        let clamp = |i: isize| i.clamp(0, last) as usize;

        match method {
            ResamplingMethod::Nearest => Self {
                indices: [clamp(coord.round() as isize), 0, 0, 0],
                weights: [1.0, 0.0, 0.0, 0.0],
                len: 1,
                nearest: 0,
            },
            ResamplingMethod::Bilinear => {
                let base = coord.floor();
                let d = coord - base;
                let i0 = base as isize;
                Self {
                    indices: [clamp(i0), clamp(i0 + 1), 0, 0],
                    weights: [1.0 - d, d, 0.0, 0.0],
                    len: 2,
                    nearest: if d < 0.5 { 0 } else { 1 },
                }
            }
            ResamplingMethod::Bicubic => {
                let base = coord.floor();
                let d = coord - base;
                let i0 = base as isize;
                Self {
                    indices: [clamp(i0 - 1), clamp(i0), clamp(i0 + 1), clamp(i0 + 2)],
                    weights: [keys(d + 1.0), keys(d), keys(1.0 - d), keys(2.0 - d)],
                    len: 4,
                    nearest: if d < 0.5 { 1 } else { 2 },
                }
            }
        }
    }
}

/// Keys cubic convolution kernel with a = -0.5
fn keys(t: f64) -> f64 {
    let t = t.abs();
    if t <= 1.0 {
        1.5 * t * t * t - 2.5 * t * t + 1.0
    } else if t < 2.0 {
        -0.5 * t * t * t + 2.5 * t * t - 4.0 * t + 2.0
    } else {
        0.0
    }
}

/// Reconstructs source values at fractional (range, azimuth) positions
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    method: ResamplingMethod,
    linear_output: bool,
}

impl Resampler {
    pub fn new(method: ResamplingMethod) -> Self {
        Self {
            method,
            linear_output: false,
        }
    }

    /// Keep dB bands in linear intensity after interpolation (calibration input)
    pub fn with_linear_output(mut self, linear_output: bool) -> Self {
        self.linear_output = linear_output;
        self
    }

    pub fn method(&self) -> ResamplingMethod {
        self.method
    }

    /// Unit of the values returned by [`Resampler::sample`] for `band`
    pub fn output_unit(&self, band: &SourceBand<'_>) -> BandUnit {
        let unit = band.sample_unit();
        if unit == BandUnit::IntensityDb && self.linear_output {
            BandUnit::Intensity
        } else {
            unit
        }
    }

    /// Interpolated value at (`range_index`, `azimuth_index`).
    ///
    /// `None` when any neighbor is no-data. When the correction tags
    /// neighbors with different sub-swaths, the nearest neighbor's corrected
    /// value is returned without interpolation.
    pub fn sample(
        &self,
        band: &SourceBand<'_>,
        range_index: f64,
        azimuth_index: f64,
        correction: Option<&dyn NeighborCorrection>,
    ) -> Option<f64> {
        let (width, height) = match band.data {
            BandData::Real(source) => source.dimensions(),
            BandData::Complex { i, .. } => i.dimensions(),
            BandData::ComplexArray(image) => (image.ncols(), image.nrows()),
        };
        if width == 0 || height == 0 {
            return None;
        }

        let sx = Stencil::new(self.method, range_index, width);
        let sy = Stencil::new(self.method, azimuth_index, height);
        let unit = band.sample_unit();
        let is_db = unit == BandUnit::IntensityDb;

        let mut values = [[0.0f64; 4]; 4];
        let mut first_tag = None;
        let mut seam = false;

        for j in 0..sy.len {
            for i in 0..sx.len {
                let (x, y) = (sx.indices[i], sy.indices[j]);
                let raw = band.raw_sample(x, y)?;

                let value = match correction {
                    Some(correction) => {
                        let corrected = correction.correct(raw, unit, x, y);
                        match first_tag {
                            None => first_tag = Some(corrected.sub_swath),
                            Some(tag) if tag != corrected.sub_swath => seam = true,
                            _ => {}
                        }
                        corrected.value
                    }
                    None => raw,
                };

                values[j][i] = if is_db {
                    BandUnit::IntensityDb.to_intensity(value)
                } else {
                    value
                };
            }
        }

        let interpolated = if seam {
            values[sy.nearest][sx.nearest]
        } else {
            let mut sum = 0.0;
            for j in 0..sy.len {
                for i in 0..sx.len {
                    sum += sy.weights[j] * sx.weights[i] * values[j][i];
                }
            }
            sum
        };

        if is_db && !self.linear_output {
            if interpolated <= 0.0 {
                return None;
            }
            return Some(BandUnit::IntensityDb.from_intensity(interpolated));
        }

        Some(interpolated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};
    use num_complex::Complex;

    fn ramp(width: usize, height: usize) -> Array2<f32> {
        Array2::from_shape_fn((height, width), |(y, x)| (x + 10 * y) as f32)
    }

    #[test]
    fn test_method_names() {
        assert_eq!("nearest_neighbour".parse::<ResamplingMethod>().unwrap(), ResamplingMethod::Nearest);
        assert_eq!("Bilinear".parse::<ResamplingMethod>().unwrap(), ResamplingMethod::Bilinear);
        assert_eq!(
            ResamplingMethod::try_from("bicubic_interpolation".to_string()).unwrap(),
            ResamplingMethod::Bicubic
        );
        assert!("lanczos".parse::<ResamplingMethod>().is_err());
        assert_eq!(String::from(ResamplingMethod::Bicubic), "bicubic");
    }

    #[test]
    fn test_nearest_rounds() {
        let data = ramp(5, 5);
        let band = SourceBand::new("ramp", BandUnit::Intensity, -1.0, BandData::Real(&data));
        let resampler = Resampler::new(ResamplingMethod::Nearest);
        assert_eq!(resampler.sample(&band, 1.6, 2.4, None), Some(22.0));
    }

    #[test]
    fn test_linear_field_is_reproduced() {
        let data = ramp(6, 6);
        let band = SourceBand::new("ramp", BandUnit::Intensity, -1.0, BandData::Real(&data));
        for method in [ResamplingMethod::Bilinear, ResamplingMethod::Bicubic] {
            let value = Resampler::new(method).sample(&band, 2.25, 2.75, None).unwrap();
            assert!((value - 29.75).abs() < 1e-9, "{} gave {}", method, value);
        }
    }

    #[test]
    fn test_edges_are_clamped() {
        let data = ramp(4, 4);
        let band = SourceBand::new("ramp", BandUnit::Intensity, -1.0, BandData::Real(&data));
        let value = Resampler::new(ResamplingMethod::Bilinear)
            .sample(&band, 3.0, 3.0, None)
            .unwrap();
        assert_eq!(value, 33.0);
        let value = Resampler::new(ResamplingMethod::Bicubic)
            .sample(&band, 0.0, 0.0, None)
            .unwrap();
        assert!(value.abs() < 1e-12);
    }

    #[test]
    fn test_no_data_propagates_for_every_method() {
        let mut data = ramp(6, 6);
        data[[3, 3]] = -1.0;
        let band = SourceBand::new("ramp", BandUnit::Intensity, -1.0, BandData::Real(&data));
        assert!(Resampler::new(ResamplingMethod::Nearest).sample(&band, 3.2, 2.9, None).is_none());
        assert!(Resampler::new(ResamplingMethod::Bilinear).sample(&band, 2.5, 2.5, None).is_none());
        assert!(Resampler::new(ResamplingMethod::Bicubic).sample(&band, 1.5, 1.5, None).is_none());
        // Stencil clear of the hole
        assert!(Resampler::new(ResamplingMethod::Bicubic).sample(&band, 0.5, 0.5, None).is_some());
    }

    #[test]
    fn test_complex_bands_use_intensity() {
        let i = array![[3.0f32, 3.0], [3.0, 3.0]];
        let q = array![[4.0f32, 4.0], [4.0, 4.0]];
        let band = SourceBand::new("iq", BandUnit::Real, 0.0, BandData::Complex { i: &i, q: &q });
        assert_eq!(band.sample_unit(), BandUnit::Intensity);
        let value = Resampler::new(ResamplingMethod::Bilinear).sample(&band, 0.5, 0.5, None);
        assert_eq!(value, Some(25.0));

        let slc: SarImage = Array2::from_elem((2, 2), Complex::new(1.0, 2.0));
        let band = SourceBand::new("slc", BandUnit::Real, 0.0, BandData::ComplexArray(&slc));
        let value = Resampler::new(ResamplingMethod::Nearest).sample(&band, 1.0, 1.0, None);
        assert_eq!(value, Some(5.0));

        let mut q = q.clone();
        q[[0, 0]] = 0.0;
        let band = SourceBand::new("iq", BandUnit::Real, 0.0, BandData::Complex { i: &i, q: &q });
        assert!(Resampler::new(ResamplingMethod::Bilinear).sample(&band, 0.5, 0.5, None).is_none());
    }

    #[test]
    fn test_db_interpolated_in_linear_domain() {
        let data = array![[10.0f32, 20.0], [10.0, 20.0]];
        let band = SourceBand::new("db", BandUnit::IntensityDb, -999.0, BandData::Real(&data));
        let resampler = Resampler::new(ResamplingMethod::Bilinear);
        let value = resampler.sample(&band, 0.5, 0.0, None).unwrap();
        // mean of 10 and 100 in linear
        assert!((value - 10.0 * 55f64.log10()).abs() < 1e-9);

        let linear = resampler.with_linear_output(true);
        assert_eq!(linear.output_unit(&band), BandUnit::Intensity);
        let value = linear.sample(&band, 0.5, 0.0, None).unwrap();
        assert!((value - 55.0).abs() < 1e-9);
    }

    struct SwathSplit {
        boundary: usize,
    }

    impl NeighborCorrection for SwathSplit {
        fn correct(&self, value: f64, _unit: BandUnit, x: usize, _y: usize) -> CorrectedSample {
            let swath = if x < self.boundary { 0 } else { 1 };
            CorrectedSample {
                value: value * (swath + 2) as f64,
                sub_swath: Some(SubSwathIndex(swath)),
            }
        }
    }

    #[test]
    fn test_sub_swath_seam_returns_nearest_corrected_neighbor() {
        let data = ramp(6, 6);
        let band = SourceBand::new("ramp", BandUnit::Intensity, -1.0, BandData::Real(&data));
        let correction = SwathSplit { boundary: 3 };

        let bilinear = Resampler::new(ResamplingMethod::Bilinear);
        // Neighbors x = 2 (swath 0) and x = 3 (swath 1); nearest is x = 3, y = 1
        let value = bilinear.sample(&band, 2.7, 1.2, Some(&correction)).unwrap();
        assert_eq!(value, 13.0 * 3.0);
        let value = bilinear.sample(&band, 2.3, 1.2, Some(&correction)).unwrap();
        assert_eq!(value, 12.0 * 2.0);

        let bicubic = Resampler::new(ResamplingMethod::Bicubic);
        let value = bicubic.sample(&band, 2.7, 1.6, Some(&correction)).unwrap();
        assert_eq!(value, 23.0 * 3.0);

        // Same swath everywhere: ordinary interpolation of corrected values
        let value = bilinear.sample(&band, 0.5, 0.5, Some(&correction)).unwrap();
        assert!((value - 5.5 * 2.0).abs() < 1e-12);
    }

    /// Four sub-swaths meeting at (2, 2), each with its own gain
    struct QuadrantSplit;

    impl NeighborCorrection for QuadrantSplit {
        fn correct(&self, value: f64, _unit: BandUnit, x: usize, y: usize) -> CorrectedSample {
            let swath = usize::from(x >= 2) + 2 * usize::from(y >= 2);
            CorrectedSample {
                value: value * (swath + 2) as f64,
                sub_swath: Some(SubSwathIndex(swath)),
            }
        }
    }

    #[test]
    fn test_four_swath_corner_picks_single_neighbor() {
        let data = ramp(4, 4);
        let band = SourceBand::new("ramp", BandUnit::Intensity, -1.0, BandData::Real(&data));

        let bilinear = Resampler::new(ResamplingMethod::Bilinear);
        // Stencil spans all four swaths; nearest is x = 1, y = 2 (swath 2)
        let value = bilinear.sample(&band, 1.3, 1.8, Some(&QuadrantSplit)).unwrap();
        assert_eq!(value, 21.0 * 4.0);
        // Nearest is x = 2, y = 1 (swath 1)
        let value = bilinear.sample(&band, 1.7, 1.2, Some(&QuadrantSplit)).unwrap();
        assert_eq!(value, 12.0 * 3.0);

        let bicubic = Resampler::new(ResamplingMethod::Bicubic);
        let value = bicubic.sample(&band, 1.6, 1.4, Some(&QuadrantSplit)).unwrap();
        assert_eq!(value, 12.0 * 3.0);
        let value = bicubic.sample(&band, 1.2, 1.1, Some(&QuadrantSplit)).unwrap();
        assert_eq!(value, 11.0 * 2.0);

        // Stencil inside swath 3 only
        let value = bilinear.sample(&band, 2.2, 2.6, Some(&QuadrantSplit)).unwrap();
        assert!((value - 28.2 * 5.0).abs() < 1e-9);
    }
}
