//! Offset-field cleaning: outlier masking, isolated-value removal, smoothing,
//! optional gap filling, trend removal and regridding to the interferogram grid.
//!
//! Within the cleaner NaN means "missing". Zero is the on-disk "no data" value
//! and is restored for every missing cell before the trend is removed.

use crate::core::fill::{fill_gaps, GapFillParams};
use crate::core::filters::{boxcar_filter, median_filter};
use crate::core::outlier_mask::{flag_border, FilterPreset, OutlierMaskBuilder};
use crate::core::resample::{regrid_complex, target_shape, ResampleMethod};
use crate::core::trend::TrendSurface;
use crate::io::OffsetParams;
use crate::types::{
    join_channels, split_channels, ChannelGrid, OffsetError, OffsetGrid, OffsetResult,
};
use ndarray::Zip;
use serde::{Deserialize, Serialize};

/// Offset cleaning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerParams {
    /// Median-residual outlier preset
    pub preset: FilterPreset,
    /// Rows/columns flagged on every edge
    pub border_width: usize,
    /// Median kernel of the isolated-value test
    pub isolation_kernel: usize,
    /// Median kernel of the light smoothing pass
    pub smoothing_kernel: usize,
    /// Boxcar kernel, `None` disables boxcar smoothing
    pub boxcar: Option<usize>,
    /// Gap filling, `None` leaves holes empty
    pub fill: Option<GapFillParams>,
    /// Output spacing `(range, azimuth)`, `None` keeps the native spacing
    pub target_spacing: Option<(i64, i64)>,
    pub resampling: ResampleMethod,
}

impl Default for CleanerParams {
    fn default() -> Self {
        Self {
            preset: FilterPreset::Preset1,
            border_width: 2,
            isolation_kernel: 5,
            smoothing_kernel: 3,
            boxcar: None,
            fill: None,
            target_spacing: None,
            resampling: ResampleMethod::Bilinear,
        }
    }
}

impl CleanerParams {
    /// Boxcar smoothing with the standard 7x7 kernel
    pub fn with_boxcar(mut self) -> Self {
        self.boxcar = Some(7);
        self
    }

    /// Gap filling with default search distance and smoothing passes
    pub fn with_fill(mut self) -> Self {
        self.fill = Some(GapFillParams::default());
        self
    }

    pub fn validate(&self) -> OffsetResult<()> {
        let kernels = [
            ("isolation", Some(self.isolation_kernel)),
            ("smoothing", Some(self.smoothing_kernel)),
            ("boxcar", self.boxcar),
        ];
        for (name, kernel) in kernels {
            if let Some(k) = kernel {
                if k == 0 || k % 2 == 0 {
                    return Err(OffsetError::InvalidConfiguration(format!(
                        "{} kernel must be odd, got {}",
                        name, k
                    )));
                }
            }
        }
        if let Some(fill) = &self.fill {
            if fill.max_search_dist == 0 {
                return Err(OffsetError::InvalidConfiguration(
                    "gap-fill search distance must be at least 1".to_string(),
                ));
            }
        }
        if let Some((rg, az)) = self.target_spacing {
            if rg <= 0 || az <= 0 {
                return Err(OffsetError::InvalidConfiguration(format!(
                    "target spacing must be positive, got {}x{}",
                    rg, az
                )));
            }
        }
        Ok(())
    }
}

/// Per-run counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub input_shape: (usize, usize),
    pub output_shape: (usize, usize),
    /// Cells flagged by the median-residual test (zero components included)
    pub flagged_cells: usize,
    /// Additional cells flagged on the grid border
    pub border_cells: usize,
    /// Cells removed by the isolated-value test only
    pub isolated_cells: usize,
    /// Cells recovered by gap filling
    pub filled_cells: usize,
    /// Cells carrying data before regridding
    pub valid_cells: usize,
}

/// Cleaned grid with its updated header
#[derive(Debug, Clone)]
pub struct CleanedOffsets {
    pub grid: OffsetGrid,
    pub params: OffsetParams,
    pub report: CleaningReport,
}

/// Offset-field cleaner
pub struct OffsetCleaner {
    params: CleanerParams,
    mask_builder: OutlierMaskBuilder,
}

impl OffsetCleaner {
    pub fn new(params: CleanerParams) -> OffsetResult<Self> {
        params.validate()?;
        let mask_builder = OutlierMaskBuilder::from_preset(params.preset);
        Ok(Self {
            params,
            mask_builder,
        })
    }

    pub fn params(&self) -> &CleanerParams {
        &self.params
    }

    /// Clean `grid`, described by `header`, and return the regridded result.
    pub fn clean(&self, grid: &OffsetGrid, header: &OffsetParams) -> OffsetResult<CleanedOffsets> {
        if grid.dim() != header.shape() {
            return Err(OffsetError::InvalidFormat(format!(
                "offset grid {:?} does not match header shape {:?}",
                grid.dim(),
                header.shape()
            )));
        }
        let mut report = CleaningReport {
            input_shape: grid.dim(),
            ..CleaningReport::default()
        };
        log::info!("Cleaning {:?} offset grid (preset {})", grid.dim(), self.params.preset.id());
        log::debug!("Cleaner parameters: {:?}", self.params);

        // Trend on the native estimation grid
        let trend = TrendSurface::evaluate(header);

        // Median-residual outliers plus border
        let mut mask = self.mask_builder.build(grid)?;
        report.flagged_cells = count(&mask);
        report.border_cells = flag_border(&mut mask, self.params.border_width);

        let (mut range, mut azimuth) = split_channels(grid);
        Zip::from(&mut range)
            .and(&mut azimuth)
            .and(&mask)
            .for_each(|r, a, &m| {
                if m {
                    *r = 0.0;
                    *a = 0.0;
                }
            });

        // Isolated values: mostly surrounded by holes
        let k = self.params.isolation_kernel;
        let range_iso = median_filter(&range, k)?;
        let azimuth_iso = median_filter(&azimuth, k)?;
        Zip::from(&mut range)
            .and(&mut azimuth)
            .and(&mask)
            .and(&range_iso)
            .and(&azimuth_iso)
            .for_each(|r, a, &m, &ri, &ai| {
                let isolated = ri == 0.0 || ai == 0.0;
                if m || isolated {
                    if !m {
                        report.isolated_cells += 1;
                    }
                    *r = f32::NAN;
                    *a = f32::NAN;
                }
            });
        log::debug!(
            "Masked {} outliers, {} border cells, {} isolated cells",
            report.flagged_cells,
            report.border_cells,
            report.isolated_cells
        );

        // Light smoothing; NaN stays inside the median window
        let mut range = median_filter(&range, self.params.smoothing_kernel)?;
        let mut azimuth = median_filter(&azimuth, self.params.smoothing_kernel)?;

        if let Some(kernel) = self.params.boxcar {
            log::debug!("Boxcar smoothing with {}x{} kernel", kernel, kernel);
            range = boxcar_filter(&range, kernel)?;
            azimuth = boxcar_filter(&azimuth, kernel)?;
        }

        // A zero in either axis is a dropped observation
        Zip::from(&mut range).and(&mut azimuth).for_each(|r, a| {
            if *r == 0.0 || *a == 0.0 {
                *r = f32::NAN;
                *a = f32::NAN;
            }
        });

        if let Some(fill) = &self.params.fill {
            let missing_before = count_nan(&range);
            range = fill_channel(&range, fill)?;
            azimuth = fill_channel(&azimuth, fill)?;
            report.filled_cells = missing_before.saturating_sub(count_nan(&range));
            log::debug!("Gap filling recovered {} cells", report.filled_cells);
        }

        // Remove the trend where data remain, restore zero elsewhere
        let mut valid_cells = 0usize;
        Zip::from(&mut range)
            .and(&mut azimuth)
            .and(&trend.ramp_x)
            .and(&trend.ramp_y)
            .for_each(|r, a, &rx, &ry| {
                if r.is_nan() || a.is_nan() {
                    *r = 0.0;
                    *a = 0.0;
                } else {
                    *r -= rx;
                    *a -= ry;
                    valid_cells += 1;
                }
            });
        report.valid_cells = valid_cells;

        let detrended = join_channels(&range, &azimuth)?;
        let mut params = header.clone();
        let grid = match self.params.target_spacing {
            Some(target) => {
                let new_shape = target_shape(detrended.dim(), (header.rgsp, header.azsp), target)?;
                let regridded = regrid_complex(&detrended, new_shape, self.params.resampling)?;
                params.set_grid(new_shape.1 as i64, new_shape.0 as i64, target.0, target.1)?;
                log::info!(
                    "Regridded to spacing {}x{}: {:?} -> {:?}",
                    target.1,
                    target.0,
                    detrended.dim(),
                    new_shape
                );
                regridded
            }
            None => detrended,
        };
        report.output_shape = grid.dim();

        log::info!(
            "Offset cleaning completed: {} of {} cells valid",
            report.valid_cells,
            report.input_shape.0 * report.input_shape.1
        );
        Ok(CleanedOffsets {
            grid,
            params,
            report,
        })
    }
}

fn count(mask: &ndarray::Array2<bool>) -> usize {
    mask.iter().filter(|&&m| m).count()
}

fn count_nan(channel: &ChannelGrid) -> usize {
    channel.iter().filter(|v| v.is_nan()).count()
}

fn fill_channel(channel: &ChannelGrid, fill: &GapFillParams) -> OffsetResult<ChannelGrid> {
    let valid = channel.mapv(|v| !v.is_nan());
    fill_gaps(channel, &valid, fill.max_search_dist, fill.smooth_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OffsetComplex;
    use ndarray::Array2;

    fn header(rows: i64, cols: i64) -> OffsetParams {
        let mut params = OffsetParams::default();
        params.x_start = 0;
        params.y_start = 0;
        params.set_grid(cols, rows, 10, 10).unwrap();
        params
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = CleanerParams {
            smoothing_kernel: 4,
            ..CleanerParams::default()
        };
        assert!(OffsetCleaner::new(params).is_err());
        let params = CleanerParams {
            target_spacing: Some((0, 10)),
            ..CleanerParams::default()
        };
        assert!(OffsetCleaner::new(params).is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let cleaner = OffsetCleaner::new(CleanerParams::default()).unwrap();
        let grid = Array2::from_elem((4, 4), OffsetComplex::new(1.0, 1.0));
        assert!(matches!(
            cleaner.clean(&grid, &header(5, 4)),
            Err(OffsetError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_constant_field_keeps_interior() {
        let grid = Array2::from_elem((16, 16), OffsetComplex::new(2.0, 3.0));
        let cleaner = OffsetCleaner::new(CleanerParams::default()).unwrap();
        let cleaned = cleaner.clean(&grid, &header(16, 16)).unwrap();
        assert_eq!(cleaned.grid[[8, 8]], OffsetComplex::new(2.0, 3.0));
        // Border cells carry no data
        assert_eq!(cleaned.grid[[0, 8]], OffsetComplex::new(0.0, 0.0));
        assert_eq!(cleaned.report.output_shape, (16, 16));
        assert!(cleaned.report.border_cells > 0);
    }

    #[test]
    fn test_detrend_and_regrid_update_header() {
        let grid = Array2::from_elem((20, 20), OffsetComplex::new(2.0, 3.0));
        let mut hdr = header(20, 20);
        hdr.xoff = [0.5, 0.0, 0.0];
        hdr.yoff = [1.0, 0.0, 0.0];
        let cleaner = OffsetCleaner::new(CleanerParams {
            target_spacing: Some((20, 20)),
            ..CleanerParams::default()
        })
        .unwrap();
        let cleaned = cleaner.clean(&grid, &hdr).unwrap();
        assert_eq!(cleaned.grid.dim(), (10, 10));
        assert_eq!((cleaned.params.npix, cleaned.params.nrec), (10, 10));
        assert_eq!(cleaned.params.x_end, 180);
        let centre = cleaned.grid[[5, 5]];
        assert!((centre.re - 1.5).abs() < 1e-5);
        assert!((centre.im - 2.0).abs() < 1e-5);
    }
}
