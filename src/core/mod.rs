//! Core geocoding modules

pub mod calibrate;
pub mod dem_cache;
pub mod doppler;
pub mod geometry;
pub mod local_geometry;
pub mod orbit;
pub mod resample;
pub mod slant_range;
pub mod terrain_correction;

// Re-export main types
pub use calibrate::{
    AntennaPattern, CalibrationSet, GainTable, RadiometricConfig, RadiometricNormalizer,
};
pub use dem_cache::{CachedSample, ElevationCache};
pub use doppler::ZeroDopplerSolver;
pub use geometry::{ecef_to_geodetic, geodetic_to_ecef, GroundPoint};
pub use local_geometry::{ElevationNeighborhood, LocalIncidenceResult};
pub use orbit::OrbitInterpolator;
pub use resample::{
    BandData, CorrectedSample, NeighborCorrection, Resampler, ResamplingMethod, SourceBand,
    SubSwathIndex,
};
pub use slant_range::{RangeReference, SlantRangeModel};
pub use terrain_correction::{
    GeocodedBand, GeocodedTile, GeocodingConfig, ImagingSolution, RangeDopplerParams,
    RasterIndex, SensorCoordinates, TerrainCorrector,
};
