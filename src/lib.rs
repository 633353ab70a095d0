//! densoff: dense offset-map post-processing for InSAR pairs
//!
//! Turns the raw per-patch output of the AMPCOR matcher into a clean, detrended
//! offset map on the interferogram grid, together with its GAMMA ISP offset
//! parameter file and a script invoking the external interferogram former.
//!
//! Stages: [`core::ScatterStacker`] rasterizes matcher observations,
//! [`core::OffsetCleaner`] masks, smooths, detrends and regrids the field, and
//! [`pipeline`] wires both to the files exchanged with the external tools.

pub mod types;
pub mod config;
pub mod io;
pub mod core;
pub mod pipeline;

// Re-export main types and functions for easier access
pub use types::{
    ChannelGrid, OffsetComplex, OffsetError, OffsetGrid, OffsetObservation, OffsetResult,
    OutlierMask, QualityGrid,
};

pub use config::{PairConfig, PairPaths, Stage};
pub use io::{OffsetParams, SlcGeometry};
pub use core::{
    CleanedOffsets, CleanerParams, CleaningReport, FilterPreset, GapFillParams, OffsetCleaner,
    OutlierMaskBuilder, ResampleMethod, ScatterStacker, StackedOffsets, StackerParams,
};
pub use pipeline::{clean_pair, plan_ampcor, stack_pair};
