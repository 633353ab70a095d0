//! Window filters over one offset channel.
//!
//! Both filters are pure: every output cell depends only on the input array, so
//! the row-parallel path yields exactly the same bits as the sequential one.

use crate::types::{ChannelGrid, OffsetError, OffsetResult};
use ndarray::Array2;
use std::cmp::Ordering;

fn check_kernel(kernel: usize) -> OffsetResult<()> {
    if kernel == 0 || kernel % 2 == 0 {
        return Err(OffsetError::InvalidConfiguration(format!(
            "filter kernel size must be odd, got {}",
            kernel
        )));
    }
    Ok(())
}

/// NaN sorts after every number
fn nan_last(a: &f32, b: &f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
    }
}

/// Fill an output grid cell by cell, rows in parallel when enabled
pub(crate) fn map_cells<F>(shape: (usize, usize), cell: F) -> ChannelGrid
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    let mut out = Array2::zeros(shape);

    #[cfg(feature = "parallel")]
    {
        use ndarray::Axis;
        use rayon::prelude::*;
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .for_each(|(i, mut row)| {
                for (j, value) in row.iter_mut().enumerate() {
                    *value = cell(i, j);
                }
            });
    }

    #[cfg(not(feature = "parallel"))]
    {
        for ((i, j), value) in out.indexed_iter_mut() {
            *value = cell(i, j);
        }
    }

    out
}

/// 2-D median filter with a square `kernel` window.
///
/// Cells outside the grid count as zeros. NaN values stay in the window and
/// sort after every number, so a window that is mostly NaN yields NaN.
pub fn median_filter(image: &ChannelGrid, kernel: usize) -> OffsetResult<ChannelGrid> {
    check_kernel(kernel)?;
    let (height, width) = image.dim();
    let half = (kernel / 2) as isize;
    let mid = kernel * kernel / 2;

    Ok(map_cells((height, width), |i, j| {
        let mut window = Vec::with_capacity(kernel * kernel);
        for di in -half..=half {
            for dj in -half..=half {
                let ii = i as isize + di;
                let jj = j as isize + dj;
                if ii >= 0 && ii < height as isize && jj >= 0 && jj < width as isize {
                    window.push(image[[ii as usize, jj as usize]]);
                } else {
                    window.push(0.0);
                }
            }
        }
        let (_, median, _) = window.select_nth_unstable_by(mid, nan_last);
        *median
    }))
}

/// Normalized boxcar (moving average) filter with edge extension.
///
/// NaN cells are left out and the kernel renormalised over the rest; a window
/// without any finite value yields NaN.
pub fn boxcar_filter(image: &ChannelGrid, kernel: usize) -> OffsetResult<ChannelGrid> {
    check_kernel(kernel)?;
    let (height, width) = image.dim();
    if height == 0 || width == 0 {
        return Ok(image.clone());
    }
    let half = (kernel / 2) as isize;
    let clamp = |v: isize, n: usize| v.clamp(0, n as isize - 1) as usize;

    Ok(map_cells((height, width), |i, j| {
        let mut sum = 0.0f64;
        let mut count = 0usize;
        for di in -half..=half {
            let ii = clamp(i as isize + di, height);
            for dj in -half..=half {
                let jj = clamp(j as isize + dj, width);
                let value = image[[ii, jj]];
                if !value.is_nan() {
                    sum += value as f64;
                    count += 1;
                }
            }
        }
        if count > 0 {
            (sum / count as f64) as f32
        } else {
            f32::NAN
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    #[test]
    fn test_median_removes_spike() {
        let mut image = Array2::<f32>::from_elem((7, 7), 2.0);
        image[[3, 3]] = 50.0;
        let filtered = median_filter(&image, 3).unwrap();
        assert_eq!(filtered[[3, 3]], 2.0);
    }

    #[test]
    fn test_median_zero_pads_edges() {
        let image = Array2::<f32>::from_elem((5, 5), 2.0);
        let filtered = median_filter(&image, 3).unwrap();
        // Corner windows see 5 padded zeros out of 9
        assert_eq!(filtered[[0, 0]], 0.0);
        // Edge windows see 3 padded zeros out of 9
        assert_eq!(filtered[[0, 2]], 2.0);
        assert_eq!(filtered[[2, 2]], 2.0);
    }

    #[test]
    fn test_median_nan_sorts_last() {
        let image = Array::from_shape_vec(
            (3, 3),
            vec![1.0, 1.0, 1.0, 1.0, f32::NAN, f32::NAN, 1.0, f32::NAN, f32::NAN],
        )
        .unwrap();
        let filtered = median_filter(&image, 3).unwrap();
        // Centre window: 5 ones and 4 NaN -> middle element is a one
        assert_eq!(filtered[[1, 1]], 1.0);
        // Bottom-right window: 5 padded zeros, 4 NaN -> middle element is zero
        assert_eq!(filtered[[2, 2]], 0.0);

        let mostly_nan = Array2::<f32>::from_elem((3, 3), f32::NAN);
        assert!(median_filter(&mostly_nan, 3).unwrap()[[1, 1]].is_nan());
    }

    #[test]
    fn test_even_kernel_rejected() {
        let image = Array2::<f32>::zeros((4, 4));
        assert!(median_filter(&image, 4).is_err());
        assert!(boxcar_filter(&image, 0).is_err());
    }

    #[test]
    fn test_boxcar_extends_edges() {
        let image = Array::from_shape_vec((1, 3), vec![0.0, 3.0, 6.0]).unwrap();
        let filtered = boxcar_filter(&image, 3).unwrap();
        // Left edge window: [0, 0, 3]
        assert!((filtered[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((filtered[[0, 1]] - 3.0).abs() < 1e-6);
        // Right edge window: [3, 6, 6]
        assert!((filtered[[0, 2]] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_boxcar_interpolates_nan() {
        let mut image = Array2::<f32>::from_elem((5, 5), 4.0);
        image[[2, 2]] = f32::NAN;
        let filtered = boxcar_filter(&image, 3).unwrap();
        assert!((filtered[[2, 2]] - 4.0).abs() < 1e-6);

        let empty = Array2::<f32>::from_elem((2, 2), f32::NAN);
        assert!(boxcar_filter(&empty, 3).unwrap()[[0, 0]].is_nan());
    }
}
