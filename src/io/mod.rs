//! I/O modules for offset-map headers, binary grids and matcher exchange files

pub mod par_file;
pub mod offset_par;
pub mod isp_par;
pub mod ampcor;
pub mod raster;
pub mod script;

pub use par_file::ParFile;
pub use offset_par::OffsetParams;
pub use isp_par::SlcGeometry;
pub use ampcor::{AmpcorHeader, AmpcorPlan, ColumnLayout};
pub use script::InterferogramScript;
