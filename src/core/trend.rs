use crate::io::OffsetParams;
use crate::types::ChannelGrid;
use ndarray::Array2;

/// Large-scale offset trend evaluated on the estimation grid
#[derive(Debug, Clone)]
pub struct TrendSurface {
    /// Range component
    pub ramp_x: ChannelGrid,
    /// Azimuth component
    pub ramp_y: ChannelGrid,
}

impl TrendSurface {
    /// Evaluate `c0 + c1*x + c2*y` for both offset polynomials at every cell's
    /// full-resolution coordinate `(x_start + col*rgsp, y_start + row*azsp)`.
    pub fn evaluate(params: &OffsetParams) -> Self {
        let shape = params.shape();
        let mut ramp_x = Array2::zeros(shape);
        let mut ramp_y = Array2::zeros(shape);
        let [a0, a1, a2] = params.xoff;
        let [b0, b1, b2] = params.yoff;

        for ((row, col), value) in ramp_x.indexed_iter_mut() {
            let (x, y) = params.cell_coordinate(row, col);
            *value = (a0 + a1 * x + a2 * y) as f32;
        }
        for ((row, col), value) in ramp_y.indexed_iter_mut() {
            let (x, y) = params.cell_coordinate(row, col);
            *value = (b0 + b1 * x + b2 * y) as f32;
        }

        log::debug!(
            "Trend surface {:?}: range {:?}, azimuth {:?}",
            shape,
            params.xoff,
            params.yoff
        );
        Self { ramp_x, ramp_y }
    }

    pub fn is_flat_zero(&self) -> bool {
        self.ramp_x.iter().chain(self.ramp_y.iter()).all(|&v| v == 0.0)
    }
}
