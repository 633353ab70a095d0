use ndarray::Array2;
use num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complex offset sample: real = range displacement, imaginary = azimuth displacement
pub type OffsetComplex = Complex<f32>;

/// Offset grid, shape `(azimuth_samples, range_samples)`.
///
/// A cell that is exactly zero means "no observation", not "zero displacement".
/// The stacker, the mask builder and the cleaner all rely on this convention, so
/// a genuine zero displacement cannot be represented and is treated as missing.
pub type OffsetGrid = Array2<OffsetComplex>;

/// One real channel of an offset grid (range or azimuth). NaN marks missing data
/// while a grid is being cleaned.
pub type ChannelGrid = Array2<f32>;

/// Per-cell quality score (SNR) parallel to an `OffsetGrid`
pub type QualityGrid = Array2<f32>;

/// `true` marks a cell whose offset estimate must be discarded
pub type OutlierMask = Array2<bool>;

/// One raw matcher result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetObservation {
    /// Patch center, range direction (full-resolution pixels)
    pub range_center: f64,
    /// Patch center, azimuth direction (full-resolution pixels)
    pub azimuth_center: f64,
    pub range_offset: f32,
    pub azimuth_offset: f32,
    /// Signal-to-noise-like quality score
    pub snr: f32,
    /// Remaining matcher columns (covariance terms), kept verbatim
    pub diagnostics: Vec<f32>,
}

impl OffsetObservation {
    pub fn displacement(&self) -> OffsetComplex {
        OffsetComplex::new(self.range_offset, self.azimuth_offset)
    }
}

/// Error types for offset-map processing
#[derive(Debug, thiserror::Error)]
pub enum OffsetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing input file: {}", path.display())]
    MissingInputFile { path: PathBuf },

    #[error("Malformed header {path}: {message}")]
    MalformedHeader { path: String, message: String },

    #[error("Insufficient observations in {path}: {bytes} bytes (minimum {minimum})")]
    InsufficientObservations {
        path: String,
        bytes: usize,
        minimum: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OffsetError {
    pub(crate) fn header(path: impl Into<String>, message: impl Into<String>) -> Self {
        OffsetError::MalformedHeader {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for offset-map operations
pub type OffsetResult<T> = Result<T, OffsetError>;

/// Split a complex grid into its range (real) and azimuth (imaginary) channels
pub fn split_channels(grid: &OffsetGrid) -> (ChannelGrid, ChannelGrid) {
    (grid.mapv(|c| c.re), grid.mapv(|c| c.im))
}

/// Recombine range and azimuth channels into a complex grid
pub fn join_channels(range: &ChannelGrid, azimuth: &ChannelGrid) -> OffsetResult<OffsetGrid> {
    if range.dim() != azimuth.dim() {
        return Err(OffsetError::Processing(format!(
            "Channel shapes differ: {:?} vs {:?}",
            range.dim(),
            azimuth.dim()
        )));
    }
    Ok(ndarray::Zip::from(range)
        .and(azimuth)
        .map_collect(|&re, &im| OffsetComplex::new(re, im)))
}

/// Number of cells carrying an observation (not the all-zero "no data" value)
pub fn valid_cell_count(grid: &OffsetGrid) -> usize {
    use num_traits::Zero;
    grid.iter().filter(|c| !c.is_zero()).count()
}
