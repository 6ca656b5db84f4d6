#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::core::local_geometry::ElevationNeighborhood;
use crate::io::dem::ElevationModel;
use crate::io::raster::TargetGeocoding;
use crate::types::{SarError, SarResult, TileRect};

/// Geodetic position and terrain height of one target pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedSample {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: f64,
}

/// Bounded per-tile buffer of target pixel positions and DEM heights.
///
/// Holds one tile plus a one-pixel halo so that 3x3 terrain neighborhoods are
/// available at the tile border. Filling replaces the previous contents.
#[derive(Debug, Clone)]
pub struct ElevationCache {
    capacity: usize,
    origin_x: i64,
    origin_y: i64,
    width: usize,
    height: usize,
    samples: Vec<CachedSample>,
    no_data_value: f64,
    valid_count: usize,
}

impl ElevationCache {
    /// Cache holding at most `capacity` samples, halo included
    pub fn new(capacity: usize) -> SarResult<Self> {
        if capacity == 0 {
            return Err(SarError::InvalidConfiguration(
                "Elevation cache capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            origin_x: 0,
            origin_y: 0,
            width: 0,
            height: 0,
            samples: Vec::new(),
            no_data_value: f64::NAN,
            valid_count: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples a tile needs, halo included
    pub fn required_capacity(tile: &TileRect) -> usize {
        (tile.width + 2) * (tile.height + 2)
    }

    /// Drop the cached tile
    pub fn clear(&mut self) {
        self.samples.clear();
        self.width = 0;
        self.height = 0;
        self.valid_count = 0;
    }

    /// Load positions and heights for `tile` and its halo.
    ///
    /// Returns the number of samples with a valid elevation. Failed DEM
    /// lookups are stored as no-data.
    pub fn fill(
        &mut self,
        tile: &TileRect,
        geocoding: &dyn TargetGeocoding,
        dem: &dyn ElevationModel,
    ) -> SarResult<usize> {
        let required = Self::required_capacity(tile);
        if required > self.capacity {
            return Err(SarError::InvalidConfiguration(format!(
                "Tile {}x{} needs {} elevation samples, cache holds {}",
                tile.width, tile.height, required, self.capacity
            )));
        }

        self.clear();
        self.origin_x = tile.x0 as i64 - 1;
        self.origin_y = tile.y0 as i64 - 1;
        self.width = tile.width + 2;
        self.height = tile.height + 2;
        self.no_data_value = dem.no_data_value();

        let (origin_x, origin_y, width) = (self.origin_x, self.origin_y, self.width);
        let load_row = |row: usize| -> (Vec<CachedSample>, usize) {
            let y = origin_y + row as i64;
            let mut failures = 0;
            let samples = (0..width)
                .map(|col| {
                    let x = origin_x + col as i64;
                    let (latitude, longitude) = geocoding.pixel_to_geo(x as f64, y as f64);
                    let elevation = match dem.elevation(latitude, longitude) {
                        Ok(h) => h,
                        Err(e) => {
                            if failures == 0 {
                                log::debug!("DEM lookup failed at ({:.6}, {:.6}): {}", latitude, longitude, e);
                            }
                            failures += 1;
                            dem.no_data_value()
                        }
                    };
                    CachedSample {
                        latitude,
                        longitude,
                        elevation,
                    }
                })
                .collect();
            (samples, failures)
        };

        #[cfg(feature = "parallel")]
        let rows: Vec<_> = (0..self.height).into_par_iter().map(load_row).collect();
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<_> = (0..self.height).map(load_row).collect();

        let mut failures = 0;
        self.samples.reserve(required);
        for (samples, row_failures) in rows {
            self.samples.extend(samples);
            failures += row_failures;
        }

        if failures > 0 {
            log::warn!(
                "{} of {} DEM lookups failed for tile at ({}, {}), treated as no-data",
                failures,
                required,
                tile.x0,
                tile.y0
            );
        }

        let no_data = self.no_data_value;
        self.valid_count = self
            .samples
            .iter()
            .filter(|s| is_valid_elevation(s.elevation, no_data))
            .count();

        log::debug!(
            "Elevation cache filled for tile ({}, {}) {}x{}: {} of {} samples valid",
            tile.x0,
            tile.y0,
            tile.width,
            tile.height,
            self.valid_count,
            required
        );

        Ok(self.valid_count)
    }

    pub fn no_data_value(&self) -> f64 {
        self.no_data_value
    }

    pub fn valid_count(&self) -> usize {
        self.valid_count
    }

    pub fn has_valid_elevation(&self) -> bool {
        self.valid_count > 0
    }

    /// Cached sample at target pixel (x, y), halo included
    pub fn get(&self, x: i64, y: i64) -> Option<&CachedSample> {
        let col = x - self.origin_x;
        let row = y - self.origin_y;
        if col < 0 || row < 0 || col >= self.width as i64 || row >= self.height as i64 {
            return None;
        }
        self.samples.get(row as usize * self.width + col as usize)
    }

    /// Elevation at (x, y), `None` for no-data or outside the cache
    pub fn elevation(&self, x: i64, y: i64) -> Option<f64> {
        self.get(x, y)
            .map(|s| s.elevation)
            .filter(|&h| is_valid_elevation(h, self.no_data_value))
    }

    /// 3x3 terrain window centred on target pixel (x, y)
    pub fn neighborhood(&self, x: i64, y: i64) -> Option<ElevationNeighborhood> {
        let mut elevations = [[0.0; 3]; 3];
        for (r, row) in elevations.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.get(x + c as i64 - 1, y + r as i64 - 1)?.elevation;
            }
        }

        let position = |dx: i64, dy: i64| {
            self.get(x + dx, y + dy)
                .map(|s| (s.latitude, s.longitude))
        };

        Some(ElevationNeighborhood {
            elevations,
            left: position(-1, 0)?,
            right: position(1, 0)?,
            up: position(0, -1)?,
            down: position(0, 1)?,
        })
    }
}

fn is_valid_elevation(elevation: f64, no_data: f64) -> bool {
    elevation.is_finite() && elevation != no_data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::dem::ConstantElevation;
    use crate::types::GeoTransform;

    struct FailingDem;

    impl ElevationModel for FailingDem {
        fn no_data_value(&self) -> f64 {
            -32768.0
        }

        fn elevation(&self, lat: f64, _lon: f64) -> SarResult<f64> {
            if lat > 49.99 {
                Err(SarError::Elevation("tile missing".to_string()))
            } else {
                Ok(lat)
            }
        }
    }

    fn grid() -> GeoTransform {
        GeoTransform::north_up(10.0, 50.0, 0.001, 0.001)
    }

    #[test]
    fn test_fill_with_halo() {
        let mut cache = ElevationCache::new(64).unwrap();
        let tile = TileRect::new(2, 3, 4, 4);
        let valid = cache.fill(&tile, &grid(), &ConstantElevation::new(100.0)).unwrap();
        assert_eq!(valid, 36);
        assert!(cache.has_valid_elevation());

        // Halo corners are present, beyond them nothing
        assert!(cache.get(1, 2).is_some());
        assert!(cache.get(6, 7).is_some());
        assert!(cache.get(0, 2).is_none());
        assert!(cache.get(7, 7).is_none());

        let sample = cache.get(2, 3).unwrap();
        assert!((sample.longitude - 10.0025).abs() < 1e-9);
        assert!((sample.latitude - 49.9965).abs() < 1e-9);

        let n = cache.neighborhood(2, 3).unwrap();
        assert_eq!(n.elevations, [[100.0; 3]; 3]);
        assert!(n.left.1 < n.right.1);
        assert!(n.up.0 > n.down.0);
        assert!(cache.neighborhood(1, 3).is_none());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let mut cache = ElevationCache::new(35).unwrap();
        let tile = TileRect::new(0, 0, 4, 4);
        assert!(cache.fill(&tile, &grid(), &ConstantElevation::new(0.0)).is_err());
        assert!(ElevationCache::new(0).is_err());
    }

    #[test]
    fn test_failed_lookups_become_no_data() {
        let mut cache = ElevationCache::new(100).unwrap();
        // Rows -1..=9 lie north of 49.99 and fail
        let tile = TileRect::new(0, 0, 2, 20);
        let valid = cache.fill(&tile, &grid(), &FailingDem).unwrap();
        assert!(valid > 0 && valid < 4 * 22);
        assert_eq!(cache.elevation(0, 0), None);
        assert!(cache.elevation(0, 19).is_some());

        cache.clear();
        assert!(!cache.has_valid_elevation());
        assert!(cache.get(0, 19).is_none());
    }
}
