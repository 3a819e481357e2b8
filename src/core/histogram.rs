//! Dominant-color extraction over a tolerance-bucketed histogram.

use crate::core::config::{ColorMetric, PACKED_RANGE_MAX, PACKED_RANGE_MIN, SortConfig};
use crate::core::profile::ProfileError;
use crate::core::sampler::PixelSource;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBucket {
    pub representative_value: i32,
    pub count: usize,
}

/// Counts observations in buckets that absorb values within `tolerance`
/// of their key. Buckets keep creation order so ties resolve to the
/// earliest one.
#[derive(Debug, Clone)]
pub struct ColorHistogram {
    buckets: IndexMap<i32, usize>,
    tolerance: i32,
}

impl ColorHistogram {
    pub fn new(tolerance: i32) -> Self {
        Self {
            buckets: IndexMap::new(),
            tolerance: tolerance.max(0),
        }
    }

    /// Record `value`, returning the key of the bucket that absorbed it.
    ///
    /// Candidates are probed nearest first, `value + i` before `value - i`.
    pub fn insert(&mut self, value: i32) -> i32 {
        for i in 0..=self.tolerance {
            for key in [value.saturating_add(i), value.saturating_sub(i)] {
                if let Some(count) = self.buckets.get_mut(&key) {
                    *count += 1;
                    return key;
                }
            }
        }

        self.buckets.insert(value, 1);
        value
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn count(&self, key: i32) -> Option<usize> {
        self.buckets.get(&key).copied()
    }

    pub fn buckets(&self) -> impl Iterator<Item = ColorBucket> + '_ {
        self.buckets
            .iter()
            .map(|(&representative_value, &count)| ColorBucket {
                representative_value,
                count,
            })
    }

    /// Bucket with the highest count, earliest-created on ties.
    pub fn dominant(&self) -> Option<ColorBucket> {
        let mut best: Option<ColorBucket> = None;
        for bucket in self.buckets() {
            match best {
                Some(current) if current.count >= bucket.count => {}
                _ => best = Some(bucket),
            }
        }
        best
    }

    pub fn into_dominant(self) -> Option<ColorBucket> {
        self.dominant()
    }
}

/// Scan the interior of `grid` (x outer, y inner) and return the
/// representative of its dominant bucket.
pub fn extract_dominant_color<P: PixelSource>(
    grid: &P,
    config: &SortConfig,
) -> Result<i32, ProfileError> {
    let margin = config.margin();
    let (width, height) = (grid.width(), grid.height());
    if width <= 2 * margin || height <= 2 * margin {
        return Err(ProfileError::EmptyPixelGrid { width, height });
    }

    let mut histogram = ColorHistogram::new(config.max_color_difference);
    for x in margin..width - margin {
        for y in margin..height - margin {
            let value = observe(grid, x, y, config);
            if config.metric.uses_range_filter()
                && !(PACKED_RANGE_MIN < value && value < PACKED_RANGE_MAX)
            {
                continue;
            }
            histogram.insert(value);
        }
    }

    histogram
        .into_dominant()
        .map(|bucket| bucket.representative_value)
        .ok_or(ProfileError::NoColorSamples)
}

fn observe<P: PixelSource>(grid: &P, x: u32, y: u32, config: &SortConfig) -> i32 {
    match config.metric {
        ColorMetric::BlurredArgb => window_average(grid, x, y, config.blur_radius),
        ColorMetric::Argb => grid.argb(x, y),
        ColorMetric::Hue => (grid.hue(x, y).round() as i32) % 360,
    }
}

/// Mean packed value over the `2r x 2r` window starting `r` pixels
/// before `(x, y)` on both axes. Truncates toward zero.
fn window_average<P: PixelSource>(grid: &P, x: u32, y: u32, radius: u32) -> i32 {
    if radius == 0 {
        return grid.argb(x, y);
    }

    let mut sum: i64 = 0;
    for i in x - radius..x + radius {
        for j in y - radius..y + radius {
            sum += grid.argb(i, j) as i64;
        }
    }
    let samples = (2 * radius as i64) * (2 * radius as i64);
    (sum / samples) as i32
}

/// Human-readable form of a dominant-color scalar.
pub fn describe_color(value: i32, metric: ColorMetric) -> String {
    match metric {
        ColorMetric::Hue => format!("{value}°"),
        ColorMetric::BlurredArgb | ColorMetric::Argb => {
            format!("#{:06X}", value as u32 & 0x00FF_FFFF)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Preset;
    use crate::core::sampler::pack_argb;

    /// Row-major test grid.
    struct TestGrid {
        width: u32,
        height: u32,
        pixels: Vec<[u8; 3]>,
    }

    impl TestGrid {
        fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
            Self {
                width,
                height,
                pixels: vec![rgb; (width * height) as usize],
            }
        }

        fn set(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
            self.pixels[(y * self.width + x) as usize] = rgb;
        }
    }

    impl PixelSource for TestGrid {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
            self.pixels[(y * self.width + x) as usize]
        }
    }

    // Packs to exactly -10_000_000.
    const IN_RANGE: [u8; 3] = [0x67, 0x69, 0x80];

    #[test]
    fn test_in_range_constant_is_accepted() {
        let value = pack_argb(IN_RANGE);
        assert!(PACKED_RANGE_MIN < value && value < PACKED_RANGE_MAX);
    }

    #[test]
    fn test_same_value_twice_shares_bucket() {
        let mut histogram = ColorHistogram::new(10);
        histogram.insert(500);
        histogram.insert(500);

        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram.count(500), Some(2));
    }

    #[test]
    fn test_values_within_tolerance_are_absorbed() {
        let mut histogram = ColorHistogram::new(10);
        assert_eq!(histogram.insert(100), 100);
        assert_eq!(histogram.insert(110), 100);
        assert_eq!(histogram.insert(90), 100);
        assert_eq!(histogram.insert(111), 111);

        assert_eq!(histogram.len(), 2);
        assert_eq!(histogram.count(100), Some(3));
        assert_eq!(histogram.count(111), Some(1));
    }

    #[test]
    fn test_nearest_bucket_wins_and_plus_side_first() {
        let mut histogram = ColorHistogram::new(10);
        histogram.insert(100);
        histogram.insert(120);

        // 110 is 10 away from both; 110 + 10 is probed before 110 - 10
        assert_eq!(histogram.insert(110), 120);
        // 104 reaches 100 at distance 4 before 120 at 16
        assert_eq!(histogram.insert(104), 100);
    }

    #[test]
    fn test_no_two_buckets_within_tolerance() {
        let mut histogram = ColorHistogram::new(20);
        for value in (0..2_000).map(|v| (v * 37) % 997 - 500) {
            histogram.insert(value);
        }

        let keys: Vec<i32> = histogram.buckets().map(|b| b.representative_value).collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert!((a - b).abs() > 20, "buckets {a} and {b} overlap");
            }
        }
    }

    #[test]
    fn test_saturating_probe_at_extremes() {
        let mut histogram = ColorHistogram::new(10);
        histogram.insert(i32::MAX);
        histogram.insert(i32::MIN);

        assert_eq!(histogram.insert(i32::MAX - 3), i32::MAX);
        assert_eq!(histogram.insert(i32::MIN + 3), i32::MIN);
    }

    #[test]
    fn test_dominant_prefers_highest_count() {
        let mut histogram = ColorHistogram::new(0);
        histogram.insert(1);
        histogram.insert(2);
        histogram.insert(2);

        assert_eq!(
            histogram.dominant(),
            Some(ColorBucket {
                representative_value: 2,
                count: 2
            })
        );
    }

    #[test]
    fn test_dominant_tie_goes_to_first_bucket() {
        let mut histogram = ColorHistogram::new(0);
        histogram.insert(7);
        histogram.insert(3);
        histogram.insert(3);
        histogram.insert(7);

        assert_eq!(histogram.into_dominant().map(|b| b.representative_value), Some(7));
    }

    #[test]
    fn test_empty_histogram_has_no_dominant() {
        assert!(ColorHistogram::new(10).dominant().is_none());
    }

    #[test]
    fn test_extract_argb_dominant() {
        let mut grid = TestGrid::filled(8, 8, IN_RANGE);
        grid.set(0, 0, [0x60, 0x00, 0x00]);
        let config = SortConfig::from_preset(Preset::Packed);

        assert_eq!(extract_dominant_color(&grid, &config).unwrap(), pack_argb(IN_RANGE));
    }

    #[test]
    fn test_extract_is_deterministic() {
        let mut grid = TestGrid::filled(12, 9, IN_RANGE);
        for x in 0..12 {
            grid.set(x, x % 9, [0x66, 0x10, (x * 20) as u8]);
        }
        let config = SortConfig::from_preset(Preset::Packed);

        let first = extract_dominant_color(&grid, &config).unwrap();
        let second = extract_dominant_color(&grid, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_out_of_range_values_are_ignored() {
        // White and black both fall outside the accepted packed range
        let mut grid = TestGrid::filled(6, 6, [255, 255, 255]);
        grid.set(1, 1, [0, 0, 0]);
        grid.set(2, 3, IN_RANGE);
        let config = SortConfig::from_preset(Preset::Packed);

        assert_eq!(extract_dominant_color(&grid, &config).unwrap(), pack_argb(IN_RANGE));
    }

    #[test]
    fn test_all_values_filtered_reports_no_samples() {
        let grid = TestGrid::filled(6, 6, [255, 255, 255]);
        let config = SortConfig::from_preset(Preset::Packed);

        let err = extract_dominant_color(&grid, &config).unwrap_err();
        assert!(matches!(err, ProfileError::NoColorSamples));
    }

    #[test]
    fn test_margin_consumes_whole_grid() {
        let grid = TestGrid::filled(4, 20, IN_RANGE);
        let config = SortConfig::from_preset(Preset::Blurred);

        let err = extract_dominant_color(&grid, &config).unwrap_err();
        assert!(matches!(
            err,
            ProfileError::EmptyPixelGrid {
                width: 4,
                height: 20
            }
        ));
    }

    #[test]
    fn test_blurred_metric_averages_neighbours() {
        // 5x5 interior pixel at (2, 2) with radius 2 averages the 4x4 window
        // x in 0..4, y in 0..4; the centre alone would read IN_RANGE.
        let mut grid = TestGrid::filled(5, 5, IN_RANGE);
        let other = [0x67, 0x69, 0x90];
        for x in 0..4 {
            for y in 0..2 {
                grid.set(x, y, other);
            }
        }
        let config = SortConfig::from_preset(Preset::Blurred);

        let expected = ((pack_argb(IN_RANGE) as i64 + pack_argb(other) as i64) / 2) as i32;
        assert_eq!(extract_dominant_color(&grid, &config).unwrap(), expected);
    }

    #[test]
    fn test_window_average_of_uniform_grid_is_identity() {
        let grid = TestGrid::filled(9, 9, IN_RANGE);
        assert_eq!(window_average(&grid, 4, 4, 2), pack_argb(IN_RANGE));
    }

    #[test]
    fn test_hue_metric_has_no_range_filter() {
        let mut grid = TestGrid::filled(6, 6, [0, 0, 255]);
        grid.set(0, 0, [255, 255, 255]);
        let config = SortConfig::from_preset(Preset::Hue);

        assert_eq!(extract_dominant_color(&grid, &config).unwrap(), 240);
    }

    #[test]
    fn test_hue_rounding_wraps_to_zero() {
        // Hue of (255, 0, 1) is about 359.76 degrees
        let grid = TestGrid::filled(4, 4, [255, 0, 1]);
        let config = SortConfig::from_preset(Preset::Hue);

        assert_eq!(extract_dominant_color(&grid, &config).unwrap(), 0);
    }

    #[test]
    fn test_describe_color() {
        assert_eq!(describe_color(pack_argb([0x12, 0xAB, 0x03]), ColorMetric::Argb), "#12AB03");
        assert_eq!(describe_color(240, ColorMetric::Hue), "240°");
    }
}
