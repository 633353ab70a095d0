//! AMPCOR matcher exchange files: per-chunk input headers (`.offmap_<n>.in`)
//! and the raw observation rows each chunk produces (`.offmap_<n>`).

use crate::io::isp_par::SlcGeometry;
use crate::io::script::set_mode;
use crate::types::{OffsetError, OffsetObservation, OffsetResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Smallest retained observation stream (bytes) worth stacking
pub const MIN_OBSERVATION_BYTES: usize = 830;

/// Rows of 80 characters or fewer are matcher chatter, not observations
pub const MIN_OBSERVATION_LINE_LEN: usize = 80;

/// Parameters a matcher run was configured with, parsed from its `.in` file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmpcorHeader {
    pub ref_slc: String,
    pub sec_slc: String,
    pub output: String,
    /// Range samples of the reference and secondary SLC
    pub range_samples: (i64, i64),
    /// First line, last line, line posting
    pub azimuth: (i64, i64, i64),
    /// First pixel, last pixel, pixel posting
    pub range: (i64, i64, i64),
    /// Search window width, height
    pub window: (i64, i64),
    pub chip: (i64, i64),
    pub oversampling: (i64, i64),
    /// Initial constant offset `(r0, z0)`
    pub initial_offset: (i64, i64),
}

impl AmpcorHeader {
    /// Azimuth posting in full-resolution lines
    pub fn y_posting(&self) -> i64 {
        self.azimuth.2
    }

    /// Range posting in full-resolution pixels
    pub fn x_posting(&self) -> i64 {
        self.range.2
    }

    pub fn load<P: AsRef<Path>>(path: P) -> OffsetResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(OffsetError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, source: &str) -> OffsetResult<Self> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.len() < 10 {
            return Err(OffsetError::header(
                source,
                format!("expected at least 10 header lines, found {}", lines.len()),
            ));
        }

        let ints = |index: usize, count: usize| -> OffsetResult<Vec<i64>> {
            let tokens: Vec<&str> = lines[index].split_whitespace().collect();
            if tokens.len() < count {
                return Err(OffsetError::header(
                    source,
                    format!("line {} needs {} values: '{}'", index + 1, count, lines[index]),
                ));
            }
            tokens[..count]
                .iter()
                .map(|t| {
                    t.parse::<i64>().map_err(|_| {
                        OffsetError::header(
                            source,
                            format!("line {}: '{}' is not an integer", index + 1, t),
                        )
                    })
                })
                .collect()
        };

        let samples = ints(3, 2)?;
        let azimuth = ints(4, 3)?;
        let range = ints(5, 3)?;
        let window = ints(6, 2)?;
        let chip = ints(7, 2)?;
        let oversampling = ints(8, 2)?;
        let initial = ints(9, 2)?;

        let header = Self {
            ref_slc: lines[0].trim().to_string(),
            sec_slc: lines[1].trim().to_string(),
            output: lines[2].trim().to_string(),
            range_samples: (samples[0], samples[1]),
            azimuth: (azimuth[0], azimuth[1], azimuth[2]),
            range: (range[0], range[1], range[2]),
            window: (window[0], window[1]),
            chip: (chip[0], chip[1]),
            oversampling: (oversampling[0], oversampling[1]),
            initial_offset: (initial[0], initial[1]),
        };

        if header.x_posting() <= 0 || header.y_posting() <= 0 {
            return Err(OffsetError::header(
                source,
                format!(
                    "postings must be positive, got range {} azimuth {}",
                    header.x_posting(),
                    header.y_posting()
                ),
            ));
        }
        Ok(header)
    }

    /// Render the `.in` layout read by the matcher
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.ref_slc);
        let _ = writeln!(out, "{}", self.sec_slc);
        let _ = writeln!(out, "{}", self.output);
        let _ = writeln!(out, "{:5} {:5}", self.range_samples.0, self.range_samples.1);
        let _ = writeln!(out, "{:6} {:8} {:3}", self.azimuth.0, self.azimuth.1, self.azimuth.2);
        let _ = writeln!(out, "{:4} {:5} {:5}", self.range.0, self.range.1, self.range.2);
        let _ = writeln!(out, "{} {}", self.window.0, self.window.1);
        let _ = writeln!(out, "{} {}", self.chip.0, self.chip.1);
        let _ = writeln!(out, "{} {}", self.oversampling.0, self.oversampling.1);
        let _ = writeln!(out, "{:5} {:6}", self.initial_offset.0, self.initial_offset.1);
        out.push_str("0. 1.e10\n");
        out.push_str("f f\n");
        out
    }
}

/// Split of a reference scene into azimuth chunks processed by parallel matcher jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmpcorPlan {
    pub reference: String,
    pub secondary: String,
    pub ampcor_bin: String,
    pub n_proc: usize,
    pub range_spacing: i64,
    pub line_spacing: i64,
    pub search_window: i64,
    pub chip_size: i64,
}

impl AmpcorPlan {
    pub fn new(reference: &str, secondary: &str, ampcor_bin: &str, n_proc: usize) -> Self {
        Self {
            reference: reference.to_string(),
            secondary: secondary.to_string(),
            ampcor_bin: ampcor_bin.to_string(),
            n_proc,
            range_spacing: 30,
            line_spacing: 30,
            search_window: 64,
            chip_size: 32,
        }
    }

    fn pair(&self) -> String {
        format!("{}-{}", self.reference, self.secondary)
    }

    /// Chunk name `<ref>-<sec>.offmap_<n>` (1-based)
    pub fn chunk_name(&self, index: usize) -> String {
        format!("{}.offmap_{}", self.pair(), index + 1)
    }

    /// Build one header per chunk from both SLC geometries and the initial offset
    pub fn chunks(
        &self,
        reference: &SlcGeometry,
        secondary: &SlcGeometry,
        initial_offset: (i64, i64),
    ) -> OffsetResult<Vec<AmpcorHeader>> {
        if self.n_proc == 0 {
            return Err(OffsetError::InvalidConfiguration(
                "number of matcher processes must be positive".to_string(),
            ));
        }
        if self.line_spacing <= 0 || self.range_spacing <= 0 {
            return Err(OffsetError::InvalidConfiguration(format!(
                "postings must be positive, got range {} azimuth {}",
                self.range_spacing, self.line_spacing
            )));
        }
        if reference.azimuth_pixel_spacing == 0.0 {
            return Err(OffsetError::InvalidConfiguration(
                "reference azimuth pixel spacing is zero".to_string(),
            ));
        }

        let ls = self.line_spacing;
        let (x_off, z0) = initial_offset;
        let y_end = reference.azimuth_lines.max(secondary.azimuth_lines);
        let y_start = (((-z0 as f64) / ls as f64 + 1.5).trunc() as i64 * ls).max(0);
        let n_rec = y_end - y_start;
        let y_slope = (reference.azimuth_pixel_spacing - secondary.azimuth_pixel_spacing)
            / reference.azimuth_pixel_spacing;

        let nn = n_rec / ls / self.n_proc as i64;
        if nn <= 0 {
            return Err(OffsetError::InvalidConfiguration(format!(
                "{} azimuth lines cannot be split into {} chunks at posting {}",
                n_rec, self.n_proc, ls
            )));
        }
        log::info!(
            "Planning {} matcher chunks: azimuth {}..{}, {} offset lines per chunk, y_slope {:.6}",
            self.n_proc,
            y_start,
            y_end,
            nn,
            y_slope
        );

        let mut headers = Vec::with_capacity(self.n_proc);
        let mut y_curr = y_start;
        for index in 0..self.n_proc {
            let last_line = y_curr + ls * (nn - 1);
            let middle = (2.0 * y_curr as f64 + (ls * (nn - 1)) as f64) / 2.0;
            let z_chunk = (z0 as f64 + y_slope * middle + 0.5).trunc() as i64;
            headers.push(AmpcorHeader {
                ref_slc: format!("{}.slc", self.reference),
                sec_slc: format!("{}.slc", self.secondary),
                output: self.chunk_name(index),
                range_samples: (reference.range_samples, secondary.range_samples),
                azimuth: ((y_curr - 2 * ls).max(0), last_line, ls),
                range: (1, reference.range_samples, self.range_spacing),
                window: (self.search_window, self.search_window),
                chip: (self.chip_size, self.chip_size),
                oversampling: (1, 1),
                initial_offset: (x_off, z_chunk),
            });
            y_curr += ls * nn;
        }
        Ok(headers)
    }

    /// Write every chunk `.in` file and the batch script `bat_<ref>-<sec>` into `out_dir`
    pub fn write(&self, out_dir: &Path, headers: &[AmpcorHeader]) -> OffsetResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(headers.len() + 1);
        let mut batch = String::new();
        for (index, header) in headers.iter().enumerate() {
            let name = format!("{}.in", self.chunk_name(index));
            let path = out_dir.join(&name);
            std::fs::write(&path, header.render())?;
            set_mode(&path, 0o755)?;
            let _ = writeln!(batch, "{} {} old &", self.ampcor_bin, name);
            written.push(path);
        }
        let batch_path = out_dir.join(format!("bat_{}", self.pair()));
        std::fs::write(&batch_path, batch)?;
        set_mode(&batch_path, 0o755)?;
        log::info!("AMPCOR parameters written for {} chunks", headers.len());
        written.push(batch_path);
        Ok(written)
    }
}

/// Column order of matcher output rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColumnLayout {
    /// `range_center range_offset azimuth_center azimuth_offset snr ...` (AMPCOR output)
    #[default]
    Ampcor,
    /// `range_center azimuth_center range_offset azimuth_offset snr ...`
    CentersFirst,
}

/// Chunk outputs of a pair in stacking order: `_1 .. _9`, then `_10 ..`
pub fn find_chunk_outputs(dir: &Path, pair: &str) -> OffsetResult<Vec<PathBuf>> {
    let prefix = format!("{}.offmap_", pair);
    let mut chunks: Vec<(usize, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(suffix) = name.strip_prefix(&prefix) else {
            continue;
        };
        if let Ok(index) = suffix.parse::<usize>() {
            if path.is_file() {
                chunks.push((index, path.clone()));
            }
        }
    }
    chunks.sort_by_key(|(index, _)| *index);
    log::debug!("Found {} chunk outputs for {}", chunks.len(), pair);
    Ok(chunks.into_iter().map(|(_, path)| path).collect())
}

/// Concatenate chunk outputs, keeping only observation rows
pub fn concatenate_observations(paths: &[PathBuf]) -> OffsetResult<String> {
    let mut stream = String::new();
    for path in paths {
        if !path.is_file() {
            return Err(OffsetError::MissingInputFile { path: path.clone() });
        }
        let text = std::fs::read_to_string(path)?;
        for line in text.lines() {
            if line.contains('*') || line.len() <= MIN_OBSERVATION_LINE_LEN {
                continue;
            }
            stream.push_str(line);
            stream.push('\n');
        }
    }
    Ok(stream)
}

/// Reject streams too small to describe a usable offset field
pub fn check_stream_size(stream: &str, source: &str) -> OffsetResult<()> {
    if stream.len() < MIN_OBSERVATION_BYTES {
        return Err(OffsetError::InsufficientObservations {
            path: source.to_string(),
            bytes: stream.len(),
            minimum: MIN_OBSERVATION_BYTES,
        });
    }
    Ok(())
}

/// Parse whitespace-separated observation rows
pub fn parse_observations(
    stream: &str,
    layout: ColumnLayout,
) -> OffsetResult<Vec<OffsetObservation>> {
    let mut observations = Vec::new();
    for (number, line) in stream.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(|t| t.parse::<f64>())
            .collect::<Result<Vec<f64>, _>>()
            .map_err(|e| {
                OffsetError::InvalidFormat(format!(
                    "observation row {}: {} ('{}')",
                    number + 1,
                    e,
                    line
                ))
            })?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(OffsetError::InvalidFormat(format!(
                "observation row {} has a non-finite value ('{}')",
                number + 1,
                line
            )));
        }
        if values.len() < 5 {
            return Err(OffsetError::InvalidFormat(format!(
                "observation row {} has {} columns, need at least 5",
                number + 1,
                values.len()
            )));
        }

        let (range_center, range_offset, azimuth_center, azimuth_offset) = match layout {
            ColumnLayout::Ampcor => (values[0], values[1], values[2], values[3]),
            ColumnLayout::CentersFirst => (values[0], values[2], values[1], values[3]),
        };
        observations.push(OffsetObservation {
            range_center,
            azimuth_center,
            range_offset: range_offset as f32,
            azimuth_offset: azimuth_offset as f32,
            snr: values[4] as f32,
            diagnostics: values[5..].iter().take(3).map(|&v| v as f32).collect(),
        });
    }
    Ok(observations)
}

/// Read, filter, size-check and parse all chunk outputs of a pair
pub fn read_observations(
    paths: &[PathBuf],
    layout: ColumnLayout,
    source: &str,
) -> OffsetResult<Vec<OffsetObservation>> {
    let stream = concatenate_observations(paths)?;
    check_stream_size(&stream, source)?;
    let observations = parse_observations(&stream, layout)?;
    log::info!(
        "Read {} offset observations ({} bytes) from {} chunk files",
        observations.len(),
        stream.len(),
        paths.len()
    );
    Ok(observations)
}
