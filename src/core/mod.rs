//! Core offset-field processing modules

pub mod filters;
pub mod outlier_mask;
pub mod trend;
pub mod resample;
pub mod fill;
pub mod stacker;
pub mod cleaner;

// Re-export main types
pub use outlier_mask::{flag_border, FilterPreset, OutlierMaskBuilder};
pub use trend::TrendSurface;
pub use resample::{regrid, regrid_complex, ResampleMethod};
pub use fill::{fill_gaps, GapFillParams};
pub use stacker::{ScatterStacker, StackedOffsets, StackerParams};
pub use cleaner::{CleanedOffsets, CleanerParams, CleaningReport, OffsetCleaner};
