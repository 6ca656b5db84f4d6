use ndarray::Array2;
use num_traits::AsPrimitive;

use crate::types::GeoTransform;

/// Random access to the samples of one source band.
///
/// `x` is the range column and `y` the azimuth line.
pub trait SampleSource: Sync {
    /// (width, height) in pixels
    fn dimensions(&self) -> (usize, usize);

    fn sample(&self, x: usize, y: usize) -> f64;
}

impl<T> SampleSource for Array2<T>
where
    T: AsPrimitive<f64> + Sync,
{
    fn dimensions(&self) -> (usize, usize) {
        let (rows, cols) = self.dim();
        (cols, rows)
    }

    fn sample(&self, x: usize, y: usize) -> f64 {
        self[[y, x]].as_()
    }
}

/// Geographic position of target raster pixels
pub trait TargetGeocoding: Sync {
    /// (latitude, longitude) in degrees of the centre of pixel (x, y)
    fn pixel_to_geo(&self, x: f64, y: f64) -> (f64, f64);
}

impl TargetGeocoding for GeoTransform {
    fn pixel_to_geo(&self, x: f64, y: f64) -> (f64, f64) {
        let (lon, lat) = self.apply(x + 0.5, y + 0.5);
        (lat, lon)
    }
}
