//! rdgeocode: Range-Doppler terrain geocoding for SAR imagery
//!
//! Maps every pixel of a geographic target raster back into the (range,
//! azimuth) geometry of a SAR image and resamples the source bands there.
//! The per-pixel inversion interpolates the orbit, solves the zero-Doppler
//! equation, converts slant range to a source range index, and optionally
//! normalizes the result to calibrated backscatter with local incidence
//! angles computed from a DEM.
//!
//! The crate is driven tile by tile: [`TerrainCorrector::process_tile`]
//! geocodes one rectangle of the target raster using a caller-owned
//! [`ElevationCache`].

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    AcquisitionTiming, BandUnit, GeoTransform, OrbitStateVector, Polarization, SarError,
    SarImage, SarRealImage, SarResult, SrgrCoefficientSet, TileRect,
};

pub use crate::core::{
    BandData, ElevationCache, GeocodedTile, GeocodingConfig, GroundPoint, RadiometricConfig,
    RadiometricNormalizer, RangeDopplerParams, RangeReference, ResamplingMethod, SourceBand,
    TerrainCorrector,
};
pub use io::{ConstantElevation, ElevationModel, GriddedDem, SampleSource, TargetGeocoding};
