use crate::io::par_file::ParFile;
use crate::types::OffsetResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reference SLC geometry read from an ISP image parameter file (`<id>.par`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlcGeometry {
    pub range_samples: i64,
    pub azimuth_lines: i64,
    /// Range pixel spacing in meters
    pub range_pixel_spacing: f64,
    /// Azimuth pixel spacing in meters
    pub azimuth_pixel_spacing: f64,
}

impl SlcGeometry {
    pub fn load<P: AsRef<Path>>(path: P) -> OffsetResult<Self> {
        let par = ParFile::load(path)?;
        Self::from_par_file(&par)
    }

    pub fn from_par_file(par: &ParFile) -> OffsetResult<Self> {
        let geometry = Self {
            range_samples: par.require_i64("range_samples")?,
            azimuth_lines: par.require_i64("azimuth_lines")?,
            range_pixel_spacing: par.require_f64("range_pixel_spacing")?,
            azimuth_pixel_spacing: par.require_f64("azimuth_pixel_spacing")?,
        };
        log::debug!("SLC geometry from {}: {:?}", par.source(), geometry);
        Ok(geometry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_from_isp_par() {
        let text = "title:     ICEYE_X7_SLC\n\
range_samples:                 9600\n\
azimuth_lines:                 12000\n\
range_pixel_spacing:            0.499654   m\n\
azimuth_pixel_spacing:          0.250000   m\n";
        let geometry = SlcGeometry::from_par_file(&ParFile::parse(text, "ref.par")).unwrap();
        assert_eq!(geometry.range_samples, 9600);
        assert_eq!(geometry.azimuth_lines, 12000);
        assert!((geometry.azimuth_pixel_spacing - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_missing_spacing_fails() {
        let text = "range_samples: 9600\nazimuth_lines: 12000\n";
        assert!(SlcGeometry::from_par_file(&ParFile::parse(text, "ref.par")).is_err());
    }
}
