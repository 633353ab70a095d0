//! Run configuration for one image pair.
//!
//! Every path is derived here, up front, from an explicit [`PairConfig`]; nothing
//! downstream consults the working directory or the environment.

use crate::core::{CleanerParams, StackerParams};
use crate::io::script::DEFAULT_INTERF_BIN;
use crate::io::ColumnLayout;
use crate::types::{OffsetError, OffsetResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default matcher binary used in the batch script
pub const DEFAULT_AMPCOR_BIN: &str = "ampcor";

/// Configuration for processing one reference/secondary pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairConfig {
    /// Directory holding the SLCs, their `.par` files and matcher outputs
    pub data_dir: PathBuf,
    /// Directory receiving offset maps; defaults to `data_dir`
    #[serde(default)]
    pub out_dir: Option<PathBuf>,
    pub reference: String,
    pub secondary: String,
    #[serde(default = "default_interf_bin")]
    pub interf_bin: String,
    #[serde(default = "default_ampcor_bin")]
    pub ampcor_bin: String,
    /// Number of parallel matcher jobs the scene is split into
    #[serde(default = "default_n_proc")]
    pub n_proc: usize,
    /// Initial constant offset `(r0, z0)` for matcher planning
    #[serde(default)]
    pub initial_offset: (i64, i64),
    #[serde(default)]
    pub layout: ColumnLayout,
    /// Stacker settings; when absent they are read from the first chunk header
    #[serde(default)]
    pub stacker: Option<StackerParams>,
    #[serde(default)]
    pub cleaner: CleanerParams,
}

fn default_interf_bin() -> String {
    DEFAULT_INTERF_BIN.to_string()
}

fn default_ampcor_bin() -> String {
    DEFAULT_AMPCOR_BIN.to_string()
}

fn default_n_proc() -> usize {
    4
}

impl PairConfig {
    pub fn new<P: Into<PathBuf>>(data_dir: P, reference: &str, secondary: &str) -> Self {
        Self {
            data_dir: data_dir.into(),
            out_dir: None,
            reference: reference.to_string(),
            secondary: secondary.to_string(),
            interf_bin: default_interf_bin(),
            ampcor_bin: default_ampcor_bin(),
            n_proc: default_n_proc(),
            initial_offset: (0, 0),
            layout: ColumnLayout::default(),
            stacker: None,
            cleaner: CleanerParams::default(),
        }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> OffsetResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(OffsetError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        let config: PairConfig = serde_json::from_str(&text)?;
        log::debug!("Loaded pair configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> OffsetResult<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Pair identifier `<reference>-<secondary>`
    pub fn pair_name(&self) -> String {
        format!("{}-{}", self.reference, self.secondary)
    }

    pub fn out_dir(&self) -> &Path {
        self.out_dir.as_deref().unwrap_or(&self.data_dir)
    }

    /// Check the configuration before touching any file
    pub fn validate(&self) -> OffsetResult<()> {
        for (role, id) in [("reference", &self.reference), ("secondary", &self.secondary)] {
            if id.is_empty() || id.contains(char::is_whitespace) || id.contains('/') {
                return Err(OffsetError::InvalidConfiguration(format!(
                    "{} id '{}' is not a valid scene identifier",
                    role, id
                )));
            }
        }
        if self.reference == self.secondary {
            return Err(OffsetError::InvalidConfiguration(format!(
                "reference and secondary are the same scene ({})",
                self.reference
            )));
        }
        if self.n_proc == 0 {
            return Err(OffsetError::InvalidConfiguration(
                "number of matcher processes must be positive".to_string(),
            ));
        }
        if let Some(stacker) = &self.stacker {
            if stacker.posting.0 <= 0 || stacker.posting.1 <= 0 {
                return Err(OffsetError::InvalidConfiguration(format!(
                    "matcher posting must be positive, got {:?}",
                    stacker.posting
                )));
            }
        }
        self.cleaner.validate()
    }
}

/// Processing stage whose inputs must exist before it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PlanAmpcor,
    Stack,
    Clean,
}

/// Every input and output path of one pair
#[derive(Debug, Clone, PartialEq)]
pub struct PairPaths {
    pub pair: String,
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
    pub ref_par: PathBuf,
    pub sec_par: PathBuf,
    /// First matcher input header (`<pair>.offmap_1.in`)
    pub ampcor_header: PathBuf,
    pub offmap_par: PathBuf,
    pub offmap_off: PathBuf,
    pub offmap_snr: PathBuf,
    pub interp_off: PathBuf,
    pub interp_par: PathBuf,
    pub interf_script: PathBuf,
}

impl PairPaths {
    /// Derive all paths and check that the inputs `stage` needs exist
    pub fn resolve(config: &PairConfig, stage: Stage) -> OffsetResult<Self> {
        config.validate()?;
        let pair = config.pair_name();
        let data_dir = config.data_dir.clone();
        let out_dir = config.out_dir().to_path_buf();
        let paths = Self {
            ref_par: data_dir.join(format!("{}.par", config.reference)),
            sec_par: data_dir.join(format!("{}.par", config.secondary)),
            ampcor_header: data_dir.join(format!("{}.offmap_1.in", pair)),
            offmap_par: out_dir.join(format!("{}.offmap.par", pair)),
            offmap_off: out_dir.join(format!("{}.offmap.off", pair)),
            offmap_snr: out_dir.join(format!("{}.offmap.snr", pair)),
            interp_off: out_dir.join(format!("{}.offmap.off.new.interp", pair)),
            interp_par: out_dir.join(format!("{}.offmap.par.interp", pair)),
            interf_script: data_dir.join(format!("bat_inter.{}", pair)),
            pair,
            data_dir,
            out_dir,
        };

        let required: Vec<&Path> = match stage {
            Stage::PlanAmpcor => vec![paths.ref_par.as_path(), paths.sec_par.as_path()],
            Stage::Stack if config.stacker.is_none() => vec![paths.ampcor_header.as_path()],
            Stage::Stack => vec![],
            Stage::Clean => vec![paths.offmap_par.as_path(), paths.offmap_off.as_path()],
        };
        if !paths.data_dir.is_dir() {
            return Err(OffsetError::MissingInputFile {
                path: paths.data_dir.clone(),
            });
        }
        for path in required {
            if !path.is_file() {
                return Err(OffsetError::MissingInputFile {
                    path: path.to_path_buf(),
                });
            }
        }
        log::debug!("Resolved paths for {} ({:?})", paths.pair, stage);
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_ids() {
        assert!(PairConfig::new("/data", "A", "B").validate().is_ok());
        assert!(PairConfig::new("/data", "A", "A").validate().is_err());
        assert!(PairConfig::new("/data", "", "B").validate().is_err());
        assert!(PairConfig::new("/data", "A b", "B").validate().is_err());
    }

    #[test]
    fn test_json_defaults() {
        let json = r#"{"data_dir": "/data", "reference": "R", "secondary": "S",
                       "cleaner": {"preset": 2, "boxcar": 7}}"#;
        let config: PairConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.interf_bin, DEFAULT_INTERF_BIN);
        assert_eq!(config.cleaner.preset.kernel_size(), 15);
        assert_eq!(config.cleaner.boxcar, Some(7));
        assert_eq!(config.cleaner.border_width, 2);
        assert_eq!(config.out_dir(), Path::new("/data"));

        let bad = r#"{"data_dir": "/data", "reference": "R", "secondary": "S",
                      "cleaner": {"preset": 3}}"#;
        assert!(serde_json::from_str::<PairConfig>(bad).is_err());
    }

    #[test]
    fn test_resolve_reports_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let config = PairConfig::new(dir.path(), "R", "S");
        let err = PairPaths::resolve(&config, Stage::Clean).unwrap_err();
        match err {
            OffsetError::MissingInputFile { path } => {
                assert!(path.ends_with("R-S.offmap.par"))
            }
            other => panic!("unexpected error: {}", other),
        }
        let paths = PairPaths::resolve(&config, Stage::Stack);
        assert!(paths.is_err());

        std::fs::write(dir.path().join("R-S.offmap_1.in"), "").unwrap();
        let paths = PairPaths::resolve(&config, Stage::Stack).unwrap();
        assert_eq!(paths.interf_script, dir.path().join("bat_inter.R-S"));
    }
}
