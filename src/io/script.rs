use crate::types::OffsetResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default interferogram-forming binary
pub const DEFAULT_INTERF_BIN: &str = "$ST_PATH/COMMON/GAMMA_OLD/bin/interf_offset64b";

/// Single-line shell invocation of the external interferogram former
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterferogramScript {
    pub interf_bin: String,
    pub ref_slc: String,
    pub sec_slc: String,
    pub ref_par: String,
    pub sec_par: String,
    pub offset_par: String,
    pub offset_grid: String,
    pub ref_power: String,
    pub sec_power: String,
    pub output: String,
    pub range_looks: i64,
    pub azimuth_looks: i64,
    pub range_step: i64,
    pub azimuth_step: i64,
}

impl InterferogramScript {
    /// Invocation for pair `reference-secondary`; looks are half the step, rounded down
    pub fn for_pair(
        interf_bin: &str,
        reference: &str,
        secondary: &str,
        offset_par: &str,
        offset_grid: &str,
        range_spacing: i64,
        azimuth_spacing: i64,
    ) -> Self {
        Self {
            interf_bin: interf_bin.to_string(),
            ref_slc: format!("{}.slc", reference),
            sec_slc: format!("{}.slc", secondary),
            ref_par: format!("{}.par", reference),
            sec_par: format!("{}.par", secondary),
            offset_par: offset_par.to_string(),
            offset_grid: offset_grid.to_string(),
            ref_power: format!("{}.pwr1", reference),
            sec_power: format!("{}.pwr2", secondary),
            output: format!("coco{}-{}.dat", reference, secondary),
            range_looks: range_spacing / 2,
            azimuth_looks: azimuth_spacing / 2,
            range_step: range_spacing,
            azimuth_step: azimuth_spacing,
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{} {} {} {} {} {} {} {} {} {} {} {} {} {}",
            self.interf_bin,
            self.ref_slc,
            self.sec_slc,
            self.ref_par,
            self.sec_par,
            self.offset_par,
            self.offset_grid,
            self.ref_power,
            self.sec_power,
            self.output,
            self.range_looks,
            self.azimuth_looks,
            self.range_step,
            self.azimuth_step
        )
    }

    /// Write the script and mark it executable
    pub fn write<P: AsRef<Path>>(&self, path: P) -> OffsetResult<()> {
        let path = path.as_ref();
        std::fs::write(path, self.render())?;
        set_mode(path, 0o777)?;
        log::info!("Interferogram script written: {}", path.display());
        Ok(())
    }
}

#[cfg(unix)]
pub(crate) fn set_mode(path: &Path, mode: u32) -> OffsetResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn set_mode(_path: &Path, _mode: u32) -> OffsetResult<()> {
    Ok(())
}
