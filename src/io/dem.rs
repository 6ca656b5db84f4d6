use ndarray::Array2;

use crate::types::{GeoTransform, SarError, SarResult};

/// No-data marker used by SRTM-style DEMs
pub const DEFAULT_DEM_NO_DATA: f64 = -32768.0;

/// Source of terrain heights above the WGS84 ellipsoid
pub trait ElevationModel: Sync {
    /// Value returned where the model has no coverage
    fn no_data_value(&self) -> f64;

    /// Elevation (m) at geodetic coordinates in degrees.
    ///
    /// Points without coverage return [`ElevationModel::no_data_value`]; an
    /// error means the lookup itself failed.
    fn elevation(&self, lat: f64, lon: f64) -> SarResult<f64>;
}

/// In-memory DEM on a geographic grid, sampled bilinearly
#[derive(Debug, Clone)]
pub struct GriddedDem {
    data: Array2<f32>,
    transform: GeoTransform,
    no_data_value: f32,
}

impl GriddedDem {
    pub fn new(data: Array2<f32>, transform: GeoTransform, no_data_value: f32) -> SarResult<Self> {
        let (height, width) = data.dim();
        if width == 0 || height == 0 {
            return Err(SarError::InvalidConfiguration("DEM raster is empty".to_string()));
        }
        if transform.invert(transform.top_left_x, transform.top_left_y).is_none() {
            return Err(SarError::InvalidConfiguration(
                "DEM geotransform is not invertible".to_string(),
            ));
        }

        log::debug!("DEM size: {}x{}", width, height);
        log::debug!("DEM geotransform: {:?}", transform);

        Ok(Self {
            data,
            transform,
            no_data_value,
        })
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    fn is_void(&self, value: f32) -> bool {
        value == self.no_data_value || !value.is_finite()
    }
}

impl ElevationModel for GriddedDem {
    fn no_data_value(&self) -> f64 {
        self.no_data_value as f64
    }

    fn elevation(&self, lat: f64, lon: f64) -> SarResult<f64> {
        let (col, row) = self
            .transform
            .invert(lon, lat)
            .ok_or_else(|| SarError::Elevation("DEM geotransform is not invertible".to_string()))?;

        // Sample centres sit half a pixel inside the corner-based transform
        let dem_x = col - 0.5;
        let dem_y = row - 0.5;

        let (dem_height, dem_width) = self.data.dim();
        if dem_x < 0.0
            || dem_y < 0.0
            || dem_x > (dem_width - 1) as f64
            || dem_y > (dem_height - 1) as f64
        {
            return Ok(self.no_data_value());
        }

        let x1 = dem_x.floor() as usize;
        let y1 = dem_y.floor() as usize;
        let x2 = (x1 + 1).min(dem_width - 1);
        let y2 = (y1 + 1).min(dem_height - 1);

        let v11 = self.data[[y1, x1]];
        let v12 = self.data[[y2, x1]];
        let v21 = self.data[[y1, x2]];
        let v22 = self.data[[y2, x2]];

        if self.is_void(v11) || self.is_void(v12) || self.is_void(v21) || self.is_void(v22) {
            return Ok(self.no_data_value());
        }

        let dx = dem_x - x1 as f64;
        let dy = dem_y - y1 as f64;

        let v1 = v11 as f64 * (1.0 - dx) + v21 as f64 * dx;
        let v2 = v12 as f64 * (1.0 - dx) + v22 as f64 * dx;
        Ok(v1 * (1.0 - dy) + v2 * dy)
    }
}

/// Constant terrain height, e.g. geocoding onto the bare ellipsoid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantElevation {
    pub height: f64,
}

impl ConstantElevation {
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl ElevationModel for ConstantElevation {
    fn no_data_value(&self) -> f64 {
        DEFAULT_DEM_NO_DATA
    }

    fn elevation(&self, _lat: f64, _lon: f64) -> SarResult<f64> {
        Ok(self.height)
    }
}
