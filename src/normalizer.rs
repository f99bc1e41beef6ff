//! Display range estimation.

use crate::volume::Volume;

/// Upper bound on the number of voxels scanned for the ceiling.
pub const SAMPLE_COUNT: usize = 10_000;

/// Rank of the ceiling in the sorted samples (99.99th percentile).
pub const CEILING_RANK: usize = 9_999;

/// Raw value shown at full brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayCeiling(f64);

impl DisplayCeiling {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    /// Estimate the ceiling from the primary channel of a volume.
    pub fn from_volume(volume: &Volume) -> Self {
        let primary = volume.data().primary();
        let ceiling = Self::from_values(primary.iter().copied(), primary.len());
        tracing::trace!(ceiling = ceiling.0, "display ceiling");
        ceiling
    }

    /// Estimate the ceiling from `len` values scanned at a fixed stride.
    ///
    /// The stride rounds up, so at most `SAMPLE_COUNT` values are kept and
    /// `CEILING_RANK` is the last of them once the scan is full.
    pub fn from_values(values: impl Iterator<Item = f32>, len: usize) -> Self {
        let stride = len.div_ceil(SAMPLE_COUNT).max(1);
        let mut samples: Vec<f32> = values.step_by(stride).filter(|v| v.is_finite()).collect();
        samples.sort_unstable_by(f32::total_cmp);

        let value = samples
            .get(CEILING_RANK)
            .or_else(|| samples.last())
            .copied()
            .map_or(0.0, f64::from);
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Map a raw value to `0..=255`.
    #[inline]
    pub fn scale(&self, raw: f64) -> u8 {
        if raw.is_nan() {
            return 0;
        }
        if self.0 <= 0.0 {
            return if raw > 0.0 { 255 } else { 0 };
        }
        (255.0 * raw / self.0).clamp(0.0, 255.0) as u8
    }
}
