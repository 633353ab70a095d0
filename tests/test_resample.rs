use approx::assert_abs_diff_eq;
use densoff::core::fill::fill_gaps;
use densoff::core::resample::target_shape;
use densoff::core::{regrid, regrid_complex, ResampleMethod};
use densoff::OffsetComplex;
use ndarray::Array2;

#[test]
fn test_constant_10x10_to_5x5() {
    let source = Array2::<f32>::from_elem((10, 10), -1.75);
    let out = regrid(&source, (5, 5), 0.0, ResampleMethod::Bilinear).expect("Failed to regrid");
    assert_eq!(out.dim(), (5, 5));
    for &v in out.iter() {
        assert_abs_diff_eq!(v, -1.75, epsilon = 1e-6);
    }

    let complex = Array2::from_elem((10, 10), OffsetComplex::new(2.0, 3.0));
    let out = regrid_complex(&complex, (5, 5), ResampleMethod::Average).expect("Failed to regrid");
    for v in out.iter() {
        assert_abs_diff_eq!(v.re, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(v.im, 3.0, epsilon = 1e-6);
    }
}

#[test]
fn test_upsampling_linear_ramp_bilinear() {
    // Source centres at 0..3, destination centres at (j + 0.5) / 2 - 0.5
    let source = Array2::from_shape_fn((1, 4), |(_, j)| j as f32 * 2.0);
    let out = regrid(&source, (1, 8), -999.0, ResampleMethod::Bilinear).unwrap();
    assert_abs_diff_eq!(out[[0, 0]], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(out[[0, 1]], 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(out[[0, 2]], 1.5, epsilon = 1e-6);
    assert_abs_diff_eq!(out[[0, 7]], 6.0, epsilon = 1e-6);
}

#[test]
fn test_nodata_region_stays_nodata() {
    let mut source = Array2::<f32>::from_elem((8, 8), 4.0);
    for i in 0..4 {
        for j in 0..4 {
            source[[i, j]] = 0.0;
        }
    }
    let out = regrid(&source, (4, 4), 0.0, ResampleMethod::Average).unwrap();
    assert_eq!(out[[0, 0]], 0.0);
    assert_eq!(out[[1, 1]], 0.0);
    assert_abs_diff_eq!(out[[3, 3]], 4.0, epsilon = 1e-6);
    // Footprint straddling the edge of the hole averages valid samples only
    let out = regrid(&source, (3, 3), 0.0, ResampleMethod::Average).unwrap();
    assert_abs_diff_eq!(out[[1, 1]], 4.0, epsilon = 1e-6);
}

#[test]
fn test_regridded_shape_truncates() {
    assert_eq!(target_shape((395, 319), (30, 30), (15, 15)).unwrap(), (790, 638));
    assert_eq!(target_shape((395, 319), (30, 30), (100, 100)).unwrap(), (118, 95));
}

#[test]
fn test_gap_fill_then_regrid() {
    let mut values = Array2::<f32>::from_elem((6, 6), 1.0);
    let mut valid = Array2::from_elem((6, 6), true);
    values[[2, 3]] = f32::NAN;
    valid[[2, 3]] = false;

    let filled = fill_gaps(&values, &valid, 1000, 10).expect("Failed to fill");
    assert!(filled.iter().all(|v| (v - 1.0).abs() < 1e-6));

    let out = regrid(&filled, (3, 3), 0.0, ResampleMethod::Cubic).unwrap();
    for &v in out.iter() {
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-5);
    }
}
