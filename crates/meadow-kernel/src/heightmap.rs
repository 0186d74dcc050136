//! Heightmap sampling from an 8-bit image.
//!
//! Only the red channel is read. Samples are normalized to `[0, 1]` and
//! scaled by `max_height` on query.
//!
//! The border rows and columns are averaged once at construction so that
//! the first and last row (and column) hold identical values. Tile
//! coordinates wrap modulo the block size, so the quad joining the last
//! pixel back to the first stays seamless.

use std::path::Path;

use image::RgbaImage;
use meadow_common::HeightmapError;
use tracing::{debug, info};

/// Immutable grid of normalized height samples.
#[derive(Debug, Clone)]
pub struct Heightmap {
    width: u32,
    height: u32,
    samples: Vec<f32>,
    max_height: f32,
}

impl Heightmap {
    /// Loads a heightmap image from `path`.
    pub fn load<P: AsRef<Path>>(path: P, max_height: f32) -> Result<Self, HeightmapError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| HeightmapError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| HeightmapError::Decode(e.to_string()))?;

        let heightmap = Self::from_image(&image.to_rgba8(), max_height)?;
        info!(
            "Loaded heightmap {} ({}x{}, max height {})",
            path.display(),
            heightmap.width,
            heightmap.height,
            max_height
        );
        Ok(heightmap)
    }

    /// Builds a heightmap from the red channel of a decoded image.
    pub fn from_image(image: &RgbaImage, max_height: f32) -> Result<Self, HeightmapError> {
        let (width, height) = image.dimensions();
        let red: Vec<u8> = image.pixels().map(|p| p[0]).collect();
        Self::from_red_channel(width, height, &red, max_height)
    }

    /// Builds a heightmap from row-major 8-bit samples.
    pub fn from_red_channel(
        width: u32,
        height: u32,
        red: &[u8],
        max_height: f32,
    ) -> Result<Self, HeightmapError> {
        if width == 0 || height == 0 {
            return Err(HeightmapError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if red.len() != expected {
            return Err(HeightmapError::SampleCount {
                expected,
                actual: red.len(),
            });
        }

        let mut heightmap = Self {
            width,
            height,
            samples: red.iter().map(|&r| f32::from(r) / 255.0).collect(),
            max_height,
        };
        heightmap.average_borders();
        Ok(heightmap)
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Scale applied to normalized samples.
    #[must_use]
    pub const fn max_height(&self) -> f32 {
        self.max_height
    }

    /// Terrain height at pixel `(x, y)`, in `[0, max_height]`.
    ///
    /// `x < width` and `y < height` must hold.
    #[must_use]
    pub fn height_at(&self, x: u32, y: u32) -> f32 {
        self.sample(x, y) * self.max_height
    }

    /// Normalized sample at pixel `(x, y)`.
    #[must_use]
    pub fn sample(&self, x: u32, y: u32) -> f32 {
        self.samples[self.index(x, y)]
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of range");
        y as usize * self.width as usize + x as usize
    }

    fn set_sample(&mut self, x: u32, y: u32, value: f32) {
        let idx = self.index(x, y);
        self.samples[idx] = value;
    }

    /// Evens out opposite borders: top with bottom, then left with right.
    fn average_borders(&mut self) {
        let last_x = self.width - 1;
        let last_y = self.height - 1;

        for x in 0..self.width {
            let avg = (self.sample(x, 0) + self.sample(x, last_y)) / 2.0;
            self.set_sample(x, 0, avg);
            self.set_sample(x, last_y, avg);
        }

        for y in 0..self.height {
            let avg = (self.sample(0, y) + self.sample(last_x, y)) / 2.0;
            self.set_sample(0, y, avg);
            self.set_sample(last_x, y, avg);
        }

        debug!("Averaged heightmap borders ({}x{})", self.width, self.height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_bad_input() {
        assert!(matches!(
            Heightmap::from_red_channel(0, 4, &[], 1.0),
            Err(HeightmapError::Empty { .. })
        ));
        assert!(matches!(
            Heightmap::from_red_channel(2, 2, &[0, 0, 0], 1.0),
            Err(HeightmapError::SampleCount { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_borders_match_after_averaging() {
        #[rustfmt::skip]
        let red = [
            255,  10,  20,   0,
             30, 128, 128,  40,
             50, 128, 128,  60,
              0,  70,  80, 255,
        ];
        let map = Heightmap::from_red_channel(4, 4, &red, 10.0).expect("valid heightmap");

        for x in 0..4 {
            assert_eq!(map.sample(x, 0), map.sample(x, 3));
        }
        for y in 0..4 {
            assert_eq!(map.sample(0, y), map.sample(3, y));
        }
        // interior untouched
        assert!((map.height_at(1, 1) - 10.0 * 128.0 / 255.0).abs() < 1e-5);
        // all four corners collapse to the mean of the originals
        assert!((map.sample(0, 0) - 0.5).abs() < 1e-6);
        assert!((map.sample(3, 3) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_top_bottom_average() {
        #[rustfmt::skip]
        let red = [
            0, 100, 200,
            9,   9,   9,
            0, 200, 100,
        ];
        let map = Heightmap::from_red_channel(3, 3, &red, 255.0).expect("valid heightmap");
        assert!((map.height_at(1, 0) - 150.0).abs() < 1e-4);
        assert!((map.height_at(1, 2) - 150.0).abs() < 1e-4);
        assert!((map.height_at(1, 1) - 9.0).abs() < 1e-4);
    }

    #[test]
    fn test_load_png_reads_red_channel() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("heightmap.png");
        let mut image = RgbaImage::from_pixel(4, 4, Rgba([0, 255, 255, 255]));
        image.put_pixel(1, 1, Rgba([255, 0, 0, 255]));
        image.save(&path).expect("write png");

        let map = Heightmap::load(&path, 2.0).expect("load heightmap");
        assert_eq!((map.width(), map.height()), (4, 4));
        assert!((map.height_at(1, 1) - 2.0).abs() < 1e-6);
        assert_eq!(map.height_at(2, 2), 0.0);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Heightmap::load("/nonexistent/heightmap.png", 1.0).unwrap_err();
        assert!(matches!(err, HeightmapError::Io { .. }));
    }

    #[test]
    fn test_load_garbage() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("heightmap.png");
        std::fs::write(&path, b"not an image").expect("write file");
        assert!(matches!(
            Heightmap::load(&path, 1.0),
            Err(HeightmapError::Decode(_))
        ));
    }
}
