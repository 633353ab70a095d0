use crate::io::ampcor::{AmpcorHeader, MIN_OBSERVATION_BYTES};
use crate::io::{OffsetParams, SlcGeometry};
use crate::types::{
    OffsetComplex, OffsetError, OffsetGrid, OffsetObservation, OffsetResult, QualityGrid,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Settings of the matcher run whose observations are being stacked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackerParams {
    /// Initial constant offset `(r0, z0)`
    pub initial_offset: (i64, i64),
    /// Estimation window `(width, height)`
    pub window: (i64, i64),
    /// Matcher posting `(x_posting, y_posting)` in full-resolution pixels
    pub posting: (i64, i64),
    /// Value recorded as `offset_estimation_threshhold`
    pub threshold: f64,
}

impl Default for StackerParams {
    fn default() -> Self {
        Self {
            initial_offset: (0, 0),
            window: (64, 64),
            posting: (30, 30),
            threshold: 3.0,
        }
    }
}

impl StackerParams {
    /// Take posting, window and initial offset from a matcher input header
    pub fn from_header(header: &AmpcorHeader) -> Self {
        Self {
            initial_offset: header.initial_offset,
            window: header.window,
            posting: (header.x_posting(), header.y_posting()),
            ..Self::default()
        }
    }
}

/// Rasterized offsets with their quality grid and header
#[derive(Debug, Clone)]
pub struct StackedOffsets {
    pub grid: OffsetGrid,
    pub quality: QualityGrid,
    pub params: OffsetParams,
}

/// Scatter-to-grid rasterizer for matcher observations
pub struct ScatterStacker {
    params: StackerParams,
    geometry: Option<SlcGeometry>,
}

impl ScatterStacker {
    pub fn new(params: StackerParams) -> Self {
        Self {
            params,
            geometry: None,
        }
    }

    /// Also fill the interferogram bookkeeping fields from the reference SLC
    pub fn with_geometry(mut self, geometry: SlcGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn params(&self) -> &StackerParams {
        &self.params
    }

    /// Rasterize observations onto the regular estimation grid.
    ///
    /// Observations are written in order; when two land in the same cell the
    /// later one replaces the earlier one, no averaging takes place.
    pub fn stack(&self, observations: &[OffsetObservation]) -> OffsetResult<StackedOffsets> {
        let (x_posting, y_posting) = self.params.posting;
        if x_posting <= 0 || y_posting <= 0 {
            return Err(OffsetError::InvalidConfiguration(format!(
                "matcher posting must be positive, got {:?}",
                self.params.posting
            )));
        }
        if observations.is_empty() {
            return Err(OffsetError::InsufficientObservations {
                path: "observation set".to_string(),
                bytes: 0,
                minimum: MIN_OBSERVATION_BYTES,
            });
        }

        let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
        for (index, obs) in observations.iter().enumerate() {
            if !obs.range_center.is_finite() || !obs.azimuth_center.is_finite() {
                return Err(OffsetError::InvalidFormat(format!(
                    "observation {} has a non-finite centre ({}, {})",
                    index + 1,
                    obs.range_center,
                    obs.azimuth_center
                )));
            }
            xmin = xmin.min(obs.range_center);
            xmax = xmax.max(obs.range_center);
            ymin = ymin.min(obs.azimuth_center);
            ymax = ymax.max(obs.azimuth_center);
        }

        let xp = x_posting as f64;
        let yp = y_posting as f64;
        let n_pix = axis_cells(xmax - xmin, xp)?;
        let n_rec = axis_cells(ymax - ymin, yp)?;
        n_pix
            .checked_mul(n_rec)
            .and_then(|cells| cells.checked_mul(std::mem::size_of::<OffsetComplex>()))
            .ok_or_else(|| {
                OffsetError::InvalidFormat(format!(
                    "observation bounding box spans {}x{} cells, too large to allocate",
                    n_rec, n_pix
                ))
            })?;
        log::info!(
            "Stacking {} observations onto {}x{} grid (posting {}x{})",
            observations.len(),
            n_rec,
            n_pix,
            y_posting,
            x_posting
        );
        log::debug!("Bounding box: x {}..{}, y {}..{}", xmin, xmax, ymin, ymax);

        let mut grid = Array2::zeros((n_rec, n_pix));
        let mut quality = Array2::zeros((n_rec, n_pix));
        let mut clamped = 0usize;
        let mut collisions = 0usize;
        let mut occupied = Array2::from_elem((n_rec, n_pix), false);

        for obs in observations {
            let col = ((obs.range_center - xmin) / xp).round() as usize;
            let row = ((obs.azimuth_center - ymin) / yp).round() as usize;
            // Centres off the posting lattice can round one cell past the far edge
            if col >= n_pix || row >= n_rec {
                clamped += 1;
            }
            let col = col.min(n_pix - 1);
            let row = row.min(n_rec - 1);
            if occupied[[row, col]] {
                collisions += 1;
            }
            occupied[[row, col]] = true;
            grid[[row, col]] = obs.displacement();
            quality[[row, col]] = obs.snr;
        }
        if clamped > 0 {
            log::warn!("{} observations off the posting lattice clamped to the grid edge", clamped);
        }
        log::debug!("{} observations replaced an earlier one in the same cell", collisions);

        let params = self.build_params(xmin, ymin, n_pix, n_rec)?;
        Ok(StackedOffsets {
            grid,
            quality,
            params,
        })
    }

    fn build_params(
        &self,
        xmin: f64,
        ymin: f64,
        n_pix: usize,
        n_rec: usize,
    ) -> OffsetResult<OffsetParams> {
        let (r0, z0) = self.params.initial_offset;
        let (x_posting, y_posting) = self.params.posting;
        let mut params = OffsetParams {
            r0,
            z0,
            x_start: xmin.round() as i64,
            y_start: ymin.round() as i64,
            ofw_w: self.params.window.0,
            ofw_h: self.params.window.1,
            ofw_thr: self.params.threshold,
            xoff: [r0 as f64, 0.0, 0.0],
            yoff: [z0 as f64, 0.0, 0.0],
            ..OffsetParams::default()
        };
        params.set_grid(n_pix as i64, n_rec as i64, x_posting, y_posting)?;

        if let Some(geometry) = &self.geometry {
            params.snpix = geometry.range_samples;
            params.nrec_i = geometry.azimuth_lines / y_posting;
            params.npix_i = geometry.range_samples / x_posting;
            params.xnlook = x_posting;
            params.ynlook = y_posting;
            params.rgsp_i = x_posting as f64 * geometry.range_pixel_spacing;
            params.azsp_i = y_posting as f64 * geometry.azimuth_pixel_spacing;
        }
        Ok(params)
    }
}

/// Number of posting cells covering `span`
fn axis_cells(span: f64, posting: f64) -> OffsetResult<usize> {
    let cells = (span / posting).floor() + 1.0;
    if !(cells >= 1.0 && cells < i64::MAX as f64) {
        return Err(OffsetError::InvalidFormat(format!(
            "observation extent {} at posting {} does not fit a grid",
            span, posting
        )));
    }
    Ok(cells as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(x: f64, y: f64, dx: f32, dy: f32, snr: f32) -> OffsetObservation {
        OffsetObservation {
            range_center: x,
            azimuth_center: y,
            range_offset: dx,
            azimuth_offset: dy,
            snr,
            diagnostics: vec![],
        }
    }

    #[test]
    fn test_grid_shape_and_placement() {
        let stacker = ScatterStacker::new(StackerParams {
            posting: (10, 20),
            ..StackerParams::default()
        });
        let observations = vec![
            obs(100.0, 40.0, 1.0, 2.0, 5.0),
            obs(130.0, 80.0, 3.0, 4.0, 6.0),
        ];
        let stacked = stacker.stack(&observations).unwrap();
        assert_eq!(stacked.grid.dim(), (3, 4));
        assert_eq!(stacked.grid[[0, 0]], OffsetComplex::new(1.0, 2.0));
        assert_eq!(stacked.grid[[2, 3]], OffsetComplex::new(3.0, 4.0));
        assert_eq!(stacked.grid[[1, 1]], OffsetComplex::new(0.0, 0.0));
        assert_eq!(stacked.quality[[2, 3]], 6.0);
        assert_eq!(stacked.params.x_start, 100);
        assert_eq!(stacked.params.x_end, 130);
        assert_eq!(stacked.params.y_end, 80);
    }

    #[test]
    fn test_header_and_geometry_fields() {
        let stacker = ScatterStacker::new(StackerParams {
            initial_offset: (-4, 12),
            window: (64, 32),
            posting: (30, 15),
            threshold: 3.0,
        })
        .with_geometry(SlcGeometry {
            range_samples: 9000,
            azimuth_lines: 3000,
            range_pixel_spacing: 0.5,
            azimuth_pixel_spacing: 0.25,
        });
        let stacked = stacker.stack(&[obs(31.0, 16.0, 1.0, 1.0, 1.0)]).unwrap();
        let p = &stacked.params;
        assert_eq!((p.r0, p.z0), (-4, 12));
        assert_eq!(p.xoff, [-4.0, 0.0, 0.0]);
        assert_eq!(p.yoff, [12.0, 0.0, 0.0]);
        assert_eq!((p.ofw_w, p.ofw_h), (64, 32));
        assert_eq!(p.ofw_thr, 3.0);
        assert_eq!(p.npix_i, 300);
        assert_eq!(p.nrec_i, 200);
        assert_eq!((p.xnlook, p.ynlook), (30, 15));
        assert!((p.rgsp_i - 15.0).abs() < 1e-12);
        assert!((p.azsp_i - 3.75).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_centre_rejected() {
        let stacker = ScatterStacker::new(StackerParams::default());
        let observations = vec![
            obs(31.0, 45.0, 1.0, 2.0, 10.0),
            obs(f64::NAN, 75.0, 9.0, 9.0, 10.0),
        ];
        match stacker.stack(&observations) {
            Err(OffsetError::InvalidFormat(message)) => assert!(message.contains("observation 2")),
            other => panic!("expected InvalidFormat, got {:?}", other.map(|s| s.grid.dim())),
        }
    }

    #[test]
    fn test_oversized_extent_rejected() {
        let stacker = ScatterStacker::new(StackerParams {
            posting: (1, 1),
            ..StackerParams::default()
        });
        let observations = vec![
            obs(0.0, 0.0, 1.0, 1.0, 1.0),
            obs(1.0e12, 1.0e12, 1.0, 1.0, 1.0),
        ];
        assert!(matches!(
            stacker.stack(&observations),
            Err(OffsetError::InvalidFormat(_))
        ));

        let far = vec![obs(0.0, 0.0, 1.0, 1.0, 1.0), obs(1.0e300, 0.0, 1.0, 1.0, 1.0)];
        assert!(matches!(stacker.stack(&far), Err(OffsetError::InvalidFormat(_))));
    }

    #[test]
    fn test_empty_input_rejected() {
        let stacker = ScatterStacker::new(StackerParams::default());
        assert!(matches!(
            stacker.stack(&[]),
            Err(OffsetError::InsufficientObservations { .. })
        ));
    }
}
