use crate::core::config::SortConfig;
use crate::core::profile::{ProfileError, Size};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, RgbImage};
use std::path::Path;

/// Read access to a grid of RGB pixels.
pub trait PixelSource {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Channels of the pixel at `(x, y)`. Callers stay within bounds.
    fn rgb(&self, x: u32, y: u32) -> [u8; 3];

    /// Opaque packed color `(255<<24)|(R<<16)|(G<<8)|B` as a signed integer.
    fn argb(&self, x: u32, y: u32) -> i32 {
        pack_argb(self.rgb(x, y))
    }

    /// HSV hue angle in degrees, `[0, 360)`. Greys report 0.
    fn hue(&self, x: u32, y: u32) -> f32 {
        hue_degrees(self.rgb(x, y))
    }
}

pub fn pack_argb([r, g, b]: [u8; 3]) -> i32 {
    (0xFF00_0000u32 | (r as u32) << 16 | (g as u32) << 8 | b as u32) as i32
}

pub fn hue_degrees([r, g, b]: [u8; 3]) -> f32 {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    if delta == 0.0 {
        return 0.0;
    }

    let hue = if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    if hue < 0.0 { hue + 360.0 } else { hue }
}

/// Downscaled pixels of one image.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    buffer: RgbImage,
    fast_path: bool,
}

impl PixelGrid {
    /// Takes an 8-bit RGB buffer over as-is and converts every other layout.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(buffer) => Self {
                buffer,
                fast_path: true,
            },
            other => Self {
                buffer: other.to_rgb8(),
                fast_path: false,
            },
        }
    }

    /// Whether the buffer was taken over without a pixel format conversion.
    pub fn fast_path(&self) -> bool {
        self.fast_path
    }
}

impl PixelSource for PixelGrid {
    fn width(&self) -> u32 {
        self.buffer.width()
    }

    fn height(&self) -> u32 {
        self.buffer.height()
    }

    fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let raw = self.buffer.as_raw();
        let offset = (y as usize * self.buffer.width() as usize + x as usize) * 3;
        [raw[offset], raw[offset + 1], raw[offset + 2]]
    }
}

/// Original size of an image plus its downscaled pixels.
#[derive(Debug, Clone)]
pub struct SampledImage {
    pub size: Size,
    pub grid: PixelGrid,
}

/// Decode `path` and downscale it. The full-resolution bitmap is released
/// before returning.
pub fn sample_file(path: &Path, config: &SortConfig) -> Result<SampledImage, ProfileError> {
    let image = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| ProfileError::DecodeFailure {
            path: path.to_path_buf(),
            source,
        })?;

    sample_image(image, config)
}

pub fn sample_image(image: DynamicImage, config: &SortConfig) -> Result<SampledImage, ProfileError> {
    let size = Size::new(image.width(), image.height());
    let required = config.required_side();
    if size.width < required || size.height < required {
        return Err(ProfileError::ImageTooSmall {
            width: size.width,
            height: size.height,
            required,
        });
    }

    let reduction = config.reduction.max(1);
    let resized = image.resize_exact(
        size.width / reduction,
        size.height / reduction,
        FilterType::Triangle,
    );
    drop(image);

    Ok(SampledImage {
        size,
        grid: PixelGrid::from_dynamic(resized),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Preset;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_pack_argb_is_opaque() {
        assert_eq!(pack_argb([0, 0, 0]), 0xFF00_0000u32 as i32);
        assert_eq!(pack_argb([255, 255, 255]), -1);
        assert_eq!(pack_argb([0x12, 0x34, 0x56]), 0xFF12_3456u32 as i32);
    }

    #[test]
    fn test_hue_degrees() {
        assert_eq!(hue_degrees([255, 0, 0]), 0.0);
        assert!((hue_degrees([0, 255, 0]) - 120.0).abs() < 1e-3);
        assert!((hue_degrees([0, 0, 255]) - 240.0).abs() < 1e-3);
        assert!((hue_degrees([255, 0, 255]) - 300.0).abs() < 1e-3);
        assert_eq!(hue_degrees([90, 90, 90]), 0.0);
    }

    #[test]
    fn test_rgb_image_takes_fast_path() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 24, Rgb([10, 20, 30])));
        let sampled = sample_image(image, &SortConfig::from_preset(Preset::Packed)).unwrap();

        assert_eq!(sampled.size, Size::new(40, 24));
        assert_eq!(sampled.grid.width(), 10);
        assert_eq!(sampled.grid.height(), 6);
        assert!(sampled.grid.fast_path());
        assert_eq!(sampled.grid.rgb(3, 2), [10, 20, 30]);
    }

    #[test]
    fn test_rgba_image_falls_back_transparently() {
        let image =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(40, 24, Rgba([10, 20, 30, 255])));
        let sampled = sample_image(image, &SortConfig::from_preset(Preset::Packed)).unwrap();

        assert!(!sampled.grid.fast_path());
        assert_eq!(sampled.grid.rgb(3, 2), [10, 20, 30]);
        assert_eq!(sampled.grid.argb(0, 0), pack_argb([10, 20, 30]));
    }

    #[test]
    fn test_rgb_indexing_is_row_major() {
        let mut buffer = RgbImage::new(3, 2);
        buffer.put_pixel(2, 0, Rgb([1, 2, 3]));
        buffer.put_pixel(0, 1, Rgb([4, 5, 6]));
        let grid = PixelGrid::from_dynamic(DynamicImage::ImageRgb8(buffer));

        assert_eq!(grid.rgb(2, 0), [1, 2, 3]);
        assert_eq!(grid.rgb(0, 1), [4, 5, 6]);
        assert_eq!(grid.rgb(1, 1), [0, 0, 0]);
    }

    #[test]
    fn test_too_small_image_is_rejected() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(9, 40));
        let err = sample_image(image, &SortConfig::from_preset(Preset::Blurred)).unwrap_err();

        match err {
            ProfileError::ImageTooSmall {
                width,
                height,
                required,
            } => {
                assert_eq!((width, height, required), (9, 40, 10));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sample_file_reports_decode_failure() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.png");
        fs::write(&path, b"definitely not a png").unwrap();

        let err = sample_file(&path, &SortConfig::default()).unwrap_err();
        assert!(matches!(err, ProfileError::DecodeFailure { .. }));
    }

    #[test]
    fn test_sample_file_reports_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.png");

        let err = sample_file(&path, &SortConfig::default()).unwrap_err();
        assert!(matches!(err, ProfileError::Io { .. }));
    }

    #[test]
    fn test_sample_file_reads_png() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tile.png");
        RgbImage::from_pixel(60, 30, Rgb([200, 10, 10]))
            .save(&path)
            .unwrap();

        let sampled = sample_file(&path, &SortConfig::default()).unwrap();
        assert_eq!(sampled.size, Size::new(60, 30));
        assert_eq!(sampled.grid.width(), 10);
        assert_eq!(sampled.grid.height(), 5);
        assert_eq!(sampled.grid.rgb(5, 2), [200, 10, 10]);
    }
}
