//! Image-warp style regridding between two regular grids covering the same extent.
//!
//! Source pixel centres sit at integer coordinates; destination pixel `j` maps to
//! source coordinate `(j + 0.5) * n_src / n_dst - 0.5`. Samples equal to `nodata`
//! (or NaN) never contribute: kernel weights are renormalised over the valid ones,
//! and a destination cell without any valid contribution is `nodata`.

use crate::core::filters::map_cells;
use crate::types::{
    join_channels, split_channels, ChannelGrid, OffsetError, OffsetGrid, OffsetResult,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interpolation kernel used by [`regrid`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    Nearest,
    Bilinear,
    /// Keys cubic convolution, a = -0.5
    Cubic,
    /// Area-weighted mean over the destination footprint
    Average,
}

impl Default for ResampleMethod {
    fn default() -> Self {
        ResampleMethod::Bilinear
    }
}

impl fmt::Display for ResampleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResampleMethod::Nearest => "nearest",
            ResampleMethod::Bilinear => "bilinear",
            ResampleMethod::Cubic => "cubic",
            ResampleMethod::Average => "average",
        };
        f.write_str(name)
    }
}

impl FromStr for ResampleMethod {
    type Err = OffsetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nearest" | "near" => Ok(ResampleMethod::Nearest),
            "bilinear" => Ok(ResampleMethod::Bilinear),
            "cubic" => Ok(ResampleMethod::Cubic),
            "average" | "area" => Ok(ResampleMethod::Average),
            other => Err(OffsetError::InvalidConfiguration(format!(
                "unknown resampling method '{}'",
                other
            ))),
        }
    }
}

/// Contributing source indices and weights for each destination index along one axis
type AxisWeights = Vec<Vec<(usize, f64)>>;

fn keys_cubic(t: f64) -> f64 {
    const A: f64 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

fn axis_weights(n_src: usize, n_dst: usize, method: ResampleMethod) -> AxisWeights {
    let scale = n_src as f64 / n_dst as f64;
    let last = n_src as isize - 1;
    let clamp = |i: isize| i.clamp(0, last) as usize;

    (0..n_dst)
        .map(|j| {
            let centre = (j as f64 + 0.5) * scale - 0.5;
            match method {
                ResampleMethod::Nearest => {
                    let i = ((j as f64 + 0.5) * scale).floor() as isize;
                    vec![(clamp(i), 1.0)]
                }
                ResampleMethod::Bilinear => {
                    let s = centre.clamp(0.0, last as f64);
                    let i0 = s.floor() as isize;
                    let t = s - i0 as f64;
                    if t > 0.0 {
                        vec![(clamp(i0), 1.0 - t), (clamp(i0 + 1), t)]
                    } else {
                        vec![(clamp(i0), 1.0)]
                    }
                }
                ResampleMethod::Cubic => {
                    let i0 = centre.floor() as isize;
                    (i0 - 1..=i0 + 2)
                        .map(|i| (clamp(i), keys_cubic(centre - i as f64)))
                        .filter(|&(_, w)| w != 0.0)
                        .collect()
                }
                ResampleMethod::Average => {
                    let lo = j as f64 * scale;
                    let hi = (j as f64 + 1.0) * scale;
                    let first = lo.floor() as usize;
                    let end = (hi.ceil() as usize).min(n_src);
                    (first..end)
                        .filter_map(|i| {
                            let overlap = hi.min(i as f64 + 1.0) - lo.max(i as f64);
                            (overlap > 0.0).then(|| (i, overlap))
                        })
                        .collect()
                }
            }
        })
        .collect()
}

/// Resample a real grid to `new_shape` (rows, cols).
pub fn regrid(
    array: &ChannelGrid,
    new_shape: (usize, usize),
    nodata: f32,
    method: ResampleMethod,
) -> OffsetResult<ChannelGrid> {
    let (rows, cols) = array.dim();
    if rows == 0 || cols == 0 || new_shape.0 == 0 || new_shape.1 == 0 {
        return Err(OffsetError::InvalidConfiguration(format!(
            "cannot regrid {:?} to {:?}",
            array.dim(),
            new_shape
        )));
    }
    if array.dim() == new_shape && method != ResampleMethod::Average {
        // Every kernel collapses onto the source pixel itself
        return Ok(array.mapv(|v| if v.is_nan() { nodata } else { v }));
    }
    log::debug!("Regridding {:?} -> {:?} ({})", array.dim(), new_shape, method);

    let row_weights = axis_weights(rows, new_shape.0, method);
    let col_weights = axis_weights(cols, new_shape.1, method);
    let is_valid = |v: f32| !v.is_nan() && v != nodata;

    Ok(map_cells(new_shape, |i, j| {
        let mut sum = 0.0f64;
        let mut weight = 0.0f64;
        for &(si, wi) in &row_weights[i] {
            for &(sj, wj) in &col_weights[j] {
                let value = array[[si, sj]];
                if is_valid(value) {
                    let w = wi * wj;
                    sum += w * value as f64;
                    weight += w;
                }
            }
        }
        if weight.abs() > 1e-12 {
            (sum / weight) as f32
        } else {
            nodata
        }
    }))
}

/// Resample a complex offset grid channel by channel, zero being "no data"
pub fn regrid_complex(
    grid: &OffsetGrid,
    new_shape: (usize, usize),
    method: ResampleMethod,
) -> OffsetResult<OffsetGrid> {
    let (range, azimuth) = split_channels(grid);
    let range = regrid(&range, new_shape, 0.0, method)?;
    let azimuth = regrid(&azimuth, new_shape, 0.0, method)?;
    join_channels(&range, &azimuth)
}

/// Grid shape `(rows, cols)` after changing spacing from `spacing` to `target`,
/// both given as `(range, azimuth)` pixels. Each axis keeps at least one sample.
pub fn target_shape(
    shape: (usize, usize),
    spacing: (i64, i64),
    target: (i64, i64),
) -> OffsetResult<(usize, usize)> {
    if target.0 <= 0 || target.1 <= 0 {
        return Err(OffsetError::InvalidConfiguration(format!(
            "target spacing must be positive, got {:?}",
            target
        )));
    }
    let cols = (shape.1 as i64 * spacing.0) / target.0;
    let rows = (shape.0 as i64 * spacing.1) / target.1;
    Ok((rows.max(1) as usize, cols.max(1) as usize))
}
