//! Collaborator interfaces for rasters and elevation data

pub mod dem;
pub mod raster;

pub use dem::{ConstantElevation, ElevationModel, GriddedDem};
pub use raster::{SampleSource, TargetGeocoding};
