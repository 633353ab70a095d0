use crate::core::filters::median_filter;
use crate::types::{split_channels, OffsetError, OffsetGrid, OffsetResult, OutlierMask};
use ndarray::{s, Zip};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Named median-residual presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FilterPreset {
    /// Kernel 9, threshold 1 pixel
    Preset1,
    /// Kernel 15, threshold 0.5 pixel
    Preset2,
}

impl FilterPreset {
    pub fn from_id(id: u8) -> OffsetResult<Self> {
        match id {
            1 => Ok(FilterPreset::Preset1),
            2 => Ok(FilterPreset::Preset2),
            other => Err(OffsetError::InvalidConfiguration(format!(
                "unknown offset filter preset {} (expected 1 or 2)",
                other
            ))),
        }
    }

    pub fn id(self) -> u8 {
        match self {
            FilterPreset::Preset1 => 1,
            FilterPreset::Preset2 => 2,
        }
    }

    pub fn kernel_size(self) -> usize {
        match self {
            FilterPreset::Preset1 => 9,
            FilterPreset::Preset2 => 15,
        }
    }

    pub fn threshold(self) -> f32 {
        match self {
            FilterPreset::Preset1 => 1.0,
            FilterPreset::Preset2 => 0.5,
        }
    }
}

impl Default for FilterPreset {
    fn default() -> Self {
        FilterPreset::Preset1
    }
}

impl TryFrom<u8> for FilterPreset {
    type Error = OffsetError;

    fn try_from(id: u8) -> OffsetResult<Self> {
        Self::from_id(id)
    }
}

impl From<FilterPreset> for u8 {
    fn from(preset: FilterPreset) -> u8 {
        preset.id()
    }
}

/// Median-residual outlier detector
#[derive(Debug, Clone)]
pub struct OutlierMaskBuilder {
    kernel_size: usize,
    threshold: f32,
}

impl OutlierMaskBuilder {
    pub fn new(kernel_size: usize, threshold: f32) -> OffsetResult<Self> {
        if kernel_size == 0 || kernel_size % 2 == 0 {
            return Err(OffsetError::InvalidConfiguration(format!(
                "median kernel size must be odd, got {}",
                kernel_size
            )));
        }
        if !(threshold >= 0.0) {
            return Err(OffsetError::InvalidConfiguration(format!(
                "residual threshold must be non-negative, got {}",
                threshold
            )));
        }
        Ok(Self {
            kernel_size,
            threshold,
        })
    }

    pub fn from_preset(preset: FilterPreset) -> Self {
        Self {
            kernel_size: preset.kernel_size(),
            threshold: preset.threshold(),
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Flag cells whose residual against the channel median exceeds the
    /// threshold in either channel, and every cell with a zero component.
    pub fn build(&self, grid: &OffsetGrid) -> OffsetResult<OutlierMask> {
        log::debug!(
            "Building outlier mask: kernel {}, threshold {}",
            self.kernel_size,
            self.threshold
        );
        let (range, azimuth) = split_channels(grid);
        let range_median = median_filter(&range, self.kernel_size)?;
        let azimuth_median = median_filter(&azimuth, self.kernel_size)?;
        let threshold = self.threshold;

        let mask = Zip::from(grid)
            .and(&range_median)
            .and(&azimuth_median)
            .map_collect(|value, &mr, &ma| {
                value.re == 0.0
                    || value.im == 0.0
                    || (value.re - mr).abs() > threshold
                    || (value.im - ma).abs() > threshold
            });

        log::debug!(
            "Outlier mask flags {} of {} cells",
            mask.iter().filter(|&&m| m).count(),
            mask.len()
        );
        Ok(mask)
    }
}

/// Force the outermost `width` rows and columns of a mask to `true`.
/// Returns the number of cells newly flagged.
pub fn flag_border(mask: &mut OutlierMask, width: usize) -> usize {
    let (rows, cols) = mask.dim();
    let before = mask.iter().filter(|&&m| m).count();
    let wr = width.min(rows);
    let wc = width.min(cols);
    mask.slice_mut(s![..wr, ..]).fill(true);
    mask.slice_mut(s![rows - wr.., ..]).fill(true);
    mask.slice_mut(s![.., ..wc]).fill(true);
    mask.slice_mut(s![.., cols - wc..]).fill(true);
    mask.iter().filter(|&&m| m).count() - before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OffsetComplex;
    use ndarray::Array2;

    #[test]
    fn test_presets() {
        assert_eq!(FilterPreset::from_id(1).unwrap().kernel_size(), 9);
        assert_eq!(FilterPreset::from_id(2).unwrap().threshold(), 0.5);
        assert!(matches!(
            FilterPreset::from_id(3),
            Err(OffsetError::InvalidConfiguration(_))
        ));
        let json = serde_json::to_string(&FilterPreset::Preset2).unwrap();
        assert_eq!(json, "2");
        assert!(serde_json::from_str::<FilterPreset>("7").is_err());
    }

    #[test]
    fn test_zero_component_always_flagged() {
        let mut grid = Array2::from_elem((11, 11), OffsetComplex::new(2.0, 3.0));
        grid[[5, 5]] = OffsetComplex::new(2.0, 0.0);
        grid[[4, 6]] = OffsetComplex::new(0.0, 3.0);
        let builder = OutlierMaskBuilder::new(3, 1e6).unwrap();
        let mask = builder.build(&grid).unwrap();
        assert!(mask[[5, 5]]);
        assert!(mask[[4, 6]]);
        assert!(!mask[[5, 4]]);
    }

    #[test]
    fn test_spike_flagged() {
        let mut grid = Array2::from_elem((15, 15), OffsetComplex::new(2.0, 3.0));
        grid[[7, 7]] = OffsetComplex::new(2.0, 9.0);
        let mask = OutlierMaskBuilder::from_preset(FilterPreset::Preset1)
            .build(&grid)
            .unwrap();
        assert!(mask[[7, 7]]);
        assert!(!mask[[7, 8]]);
    }

    #[test]
    fn test_flag_border() {
        let mut mask = Array2::from_elem((6, 7), false);
        let added = flag_border(&mut mask, 2);
        assert_eq!(added, 6 * 7 - 2 * 3);
        assert!(mask[[0, 3]] && mask[[5, 3]] && mask[[1, 1]] && mask[[3, 5]]);
        assert!(!mask[[2, 2]] && !mask[[3, 4]]);

        let mut tiny = Array2::from_elem((3, 3), false);
        flag_border(&mut tiny, 2);
        assert!(tiny.iter().all(|&m| m));
    }

    #[test]
    fn test_invalid_builder() {
        assert!(OutlierMaskBuilder::new(8, 1.0).is_err());
        assert!(OutlierMaskBuilder::new(9, -1.0).is_err());
    }
}
