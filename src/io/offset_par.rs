use crate::io::par_file::ParFile;
use crate::types::{OffsetError, OffsetResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

const BANNER: &str = "Gamma Interferometric SAR Processor (ISP)\nInterferogram and Image Offset Parameter File\n\n";
const TRAILER: &str = "resampled_range_pixel_spacing:           0.000000   m\n\
resampled_azimuth_pixel_spacing:         0.000000   m\n\
resampled_starting_ground_range:         0.000000   m\n\
resampled_pixels_per_line:               0\n\
resampled_number_of_lines:               0\n\
\n\
*************** END OF ISP-OFFSET PARAMETERS ******************\n";

// Key column widths of the ISP offset parameter layout
const GEOMETRY_WIDTH: usize = 38;
const POLYNOMIAL_WIDTH: usize = 29;
const INTERFEROGRAM_WIDTH: usize = 42;
const SPACING_WIDTH: usize = 41;

/// Offset-map parameter record (ISP offset parameter file).
///
/// Grid origin, spacing and extents are in full-resolution SLC pixels. The
/// end coordinates obey `x_end = x_start + (npix - 1) * rgsp` and
/// `y_end = y_start + (nrec - 1) * azsp`; use [`OffsetParams::set_grid`] (or
/// `set_value` on one of the grid keys) so they are recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetParams {
    pub title: String,
    /// Initial range offset
    pub r0: i64,
    /// Initial azimuth offset
    pub z0: i64,
    pub sr0: i64,
    pub snpix: i64,
    pub x_start: i64,
    pub x_end: i64,
    pub npix: i64,
    pub rgsp: i64,
    pub y_start: i64,
    pub y_end: i64,
    pub nrec: i64,
    pub azsp: i64,
    pub ofw_w: i64,
    pub ofw_h: i64,
    pub ofw_thr: f64,
    /// Range offset polynomial: `c0 + c1 * range + c2 * azimuth`
    pub xoff: [f64; 3],
    /// Azimuth offset polynomial: `c0 + c1 * range + c2 * azimuth`
    pub yoff: [f64; 3],
    pub slc1: i64,
    pub nrec_i: i64,
    pub npix_i: i64,
    pub xno0_1st: i64,
    pub n_x0: i64,
    pub xnlook: i64,
    pub ynlook: i64,
    pub rgsp_i: f64,
    pub azsp_i: f64,
}

impl Default for OffsetParams {
    fn default() -> Self {
        Self {
            title: "interferogram parameters".to_string(),
            r0: 0,
            z0: 0,
            sr0: 0,
            snpix: 0,
            x_start: 0,
            x_end: 0,
            npix: 0,
            rgsp: 0,
            y_start: 0,
            y_end: 0,
            nrec: 0,
            azsp: 0,
            ofw_w: 0,
            ofw_h: 0,
            ofw_thr: 0.0,
            xoff: [0.0; 3],
            yoff: [0.0; 3],
            slc1: 0,
            nrec_i: 0,
            npix_i: 0,
            xno0_1st: 0,
            n_x0: 0,
            xnlook: 0,
            ynlook: 0,
            rgsp_i: 0.0,
            azsp_i: 0.0,
        }
    }
}

impl OffsetParams {
    /// Load an offset parameter file
    pub fn load<P: AsRef<Path>>(path: P) -> OffsetResult<Self> {
        let par = ParFile::load(path)?;
        Self::from_par_file(&par)
    }

    /// Parse offset parameters from text
    pub fn parse(text: &str, source: &str) -> OffsetResult<Self> {
        Self::from_par_file(&ParFile::parse(text, source))
    }

    pub fn from_par_file(par: &ParFile) -> OffsetResult<Self> {
        let params = Self {
            title: par.get("title").unwrap_or_default().to_string(),
            r0: par.require_i64("initial_range_offset")?,
            z0: par.require_i64("initial_azimuth_offset")?,
            sr0: par.optional_i64("slc1_starting_range_pixel", 0)?,
            snpix: par.optional_i64("number_of_slc_range_pixels", 0)?,
            x_start: par.require_i64("offset_estimation_starting_range")?,
            x_end: par.require_i64("offset_estimation_ending_range")?,
            npix: par.require_i64("offset_estimation_range_samples")?,
            rgsp: par.require_i64("offset_estimation_range_spacing")?,
            y_start: par.require_i64("offset_estimation_starting_azimuth")?,
            y_end: par.require_i64("offset_estimation_ending_azimuth")?,
            nrec: par.require_i64("offset_estimation_azimuth_samples")?,
            azsp: par.require_i64("offset_estimation_azimuth_spacing")?,
            ofw_w: par.require_i64("offset_estimation_window_width")?,
            ofw_h: par.require_i64("offset_estimation_window_height")?,
            ofw_thr: par.optional_f64("offset_estimation_threshhold", 0.0)?,
            xoff: par.require_f64_array::<3>("range_offset_polynomial")?,
            yoff: par.require_f64_array::<3>("azimuth_offset_polynomial")?,
            slc1: par.optional_i64("slc1_starting_azimuth_line", 0)?,
            nrec_i: par.optional_i64("interferogram_azimuth_lines", 0)?,
            npix_i: par.optional_i64("interferogram_width", 0)?,
            xno0_1st: par.optional_i64("first_nonzero_range_pixel", 0)?,
            n_x0: par.optional_i64("number_of_nonzero_range_pixels", 0)?,
            xnlook: par.optional_i64("interferogram_range_looks", 0)?,
            ynlook: par.optional_i64("interferogram_azimuth_looks", 0)?,
            rgsp_i: par.optional_f64("interferogram_range_pixel_spacing", 0.0)?,
            azsp_i: par.optional_f64("interferogram_azimuth_pixel_spacing", 0.0)?,
        };

        if params.npix <= 0 || params.nrec <= 0 {
            return Err(OffsetError::header(
                par.source(),
                format!("grid dimensions must be positive, got {}x{}", params.nrec, params.npix),
            ));
        }
        if params.rgsp <= 0 || params.azsp <= 0 {
            return Err(OffsetError::header(
                par.source(),
                format!("grid spacing must be positive, got {}x{}", params.azsp, params.rgsp),
            ));
        }
        if params.checked_cell_bytes().is_none() || params.checked_extents().is_none() {
            return Err(OffsetError::header(
                par.source(),
                format!(
                    "grid {}x{} with spacing {}x{} overflows the addressable size",
                    params.nrec, params.npix, params.azsp, params.rgsp
                ),
            ));
        }
        if params.x_end != params.expected_x_end() || params.y_end != params.expected_y_end() {
            log::warn!(
                "{}: stored grid end ({}, {}) differs from start + (n-1)*spacing ({}, {})",
                par.source(),
                params.x_end,
                params.y_end,
                params.expected_x_end(),
                params.expected_y_end()
            );
        }

        log::debug!(
            "Loaded offset parameters: {}x{} grid, spacing {}x{}",
            params.nrec,
            params.npix,
            params.azsp,
            params.rgsp
        );
        Ok(params)
    }

    /// Write the parameter file in the ISP fixed-width layout
    pub fn write<P: AsRef<Path>>(&self, path: P) -> OffsetResult<()> {
        log::debug!("Writing offset parameters: {}", path.as_ref().display());
        std::fs::write(path, self.render())?;
        Ok(())
    }

    /// Render the ISP fixed-width layout
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(2048);
        out.push_str(BANNER);
        let _ = writeln!(out, "title:     {}", self.title);

        let geometry: [(&str, String); 15] = [
            ("initial_range_offset", self.r0.to_string()),
            ("initial_azimuth_offset", self.z0.to_string()),
            ("slc1_starting_range_pixel", self.sr0.to_string()),
            ("number_of_slc_range_pixels", self.snpix.to_string()),
            ("offset_estimation_starting_range", self.x_start.to_string()),
            ("offset_estimation_ending_range", self.x_end.to_string()),
            ("offset_estimation_range_samples", self.npix.to_string()),
            ("offset_estimation_range_spacing", self.rgsp.to_string()),
            ("offset_estimation_starting_azimuth", self.y_start.to_string()),
            ("offset_estimation_ending_azimuth", self.y_end.to_string()),
            ("offset_estimation_azimuth_samples", self.nrec.to_string()),
            ("offset_estimation_azimuth_spacing", self.azsp.to_string()),
            ("offset_estimation_window_width", self.ofw_w.to_string()),
            ("offset_estimation_window_height", self.ofw_h.to_string()),
            ("offset_estimation_threshhold", format_scalar(self.ofw_thr)),
        ];
        for (key, value) in geometry.iter() {
            push_entry(&mut out, key, GEOMETRY_WIDTH, value);
        }

        for (key, coeffs) in [
            ("range_offset_polynomial", &self.xoff),
            ("azimuth_offset_polynomial", &self.yoff),
        ] {
            let value: String = coeffs.iter().map(|&c| format_exp(c, 14, 5)).collect();
            push_entry(&mut out, key, POLYNOMIAL_WIDTH, &value);
        }

        let interferogram: [(&str, i64); 7] = [
            ("slc1_starting_azimuth_line", self.slc1),
            ("interferogram_azimuth_lines", self.nrec_i),
            ("interferogram_width", self.npix_i),
            ("first_nonzero_range_pixel", self.xno0_1st),
            ("number_of_nonzero_range_pixels", self.n_x0),
            ("interferogram_range_looks", self.xnlook),
            ("interferogram_azimuth_looks", self.ynlook),
        ];
        for (key, value) in interferogram.iter() {
            push_entry(&mut out, key, INTERFEROGRAM_WIDTH, &value.to_string());
        }

        push_entry(
            &mut out,
            "interferogram_range_pixel_spacing",
            SPACING_WIDTH,
            &format_float(self.rgsp_i),
        );
        push_entry(
            &mut out,
            "interferogram_azimuth_pixel_spacing",
            SPACING_WIDTH,
            &format_float(self.azsp_i),
        );
        out.push_str(TRAILER);
        out
    }

    /// Keyed read access; the value text is what `write` would emit
    pub fn get_value(&self, key: &str) -> OffsetResult<String> {
        let value = match key {
            "title" => self.title.clone(),
            "initial_range_offset" => self.r0.to_string(),
            "initial_azimuth_offset" => self.z0.to_string(),
            "slc1_starting_range_pixel" => self.sr0.to_string(),
            "number_of_slc_range_pixels" => self.snpix.to_string(),
            "offset_estimation_starting_range" => self.x_start.to_string(),
            "offset_estimation_ending_range" => self.x_end.to_string(),
            "offset_estimation_range_samples" => self.npix.to_string(),
            "offset_estimation_range_spacing" => self.rgsp.to_string(),
            "offset_estimation_starting_azimuth" => self.y_start.to_string(),
            "offset_estimation_ending_azimuth" => self.y_end.to_string(),
            "offset_estimation_azimuth_samples" => self.nrec.to_string(),
            "offset_estimation_azimuth_spacing" => self.azsp.to_string(),
            "offset_estimation_window_width" => self.ofw_w.to_string(),
            "offset_estimation_window_height" => self.ofw_h.to_string(),
            "offset_estimation_threshhold" => format_scalar(self.ofw_thr),
            "range_offset_polynomial" => join_coeffs(&self.xoff),
            "azimuth_offset_polynomial" => join_coeffs(&self.yoff),
            "slc1_starting_azimuth_line" => self.slc1.to_string(),
            "interferogram_azimuth_lines" => self.nrec_i.to_string(),
            "interferogram_width" => self.npix_i.to_string(),
            "first_nonzero_range_pixel" => self.xno0_1st.to_string(),
            "number_of_nonzero_range_pixels" => self.n_x0.to_string(),
            "interferogram_range_looks" => self.xnlook.to_string(),
            "interferogram_azimuth_looks" => self.ynlook.to_string(),
            "interferogram_range_pixel_spacing" => format_float(self.rgsp_i),
            "interferogram_azimuth_pixel_spacing" => format_float(self.azsp_i),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Keyed partial update.
    ///
    /// Changing a grid start, dimension or spacing recomputes the end coordinates.
    /// The two ending keys are stored as given and logged when they break
    /// `end = start + (n - 1) * spacing`.
    pub fn set_value(&mut self, key: &str, value: &str) -> OffsetResult<()> {
        let holder = ParFile::parse(&format!("{}: {}\n", key, value), "set_value");
        match key {
            "title" => self.title = value.trim().to_string(),
            "initial_range_offset" => self.r0 = holder.require_i64(key)?,
            "initial_azimuth_offset" => self.z0 = holder.require_i64(key)?,
            "slc1_starting_range_pixel" => self.sr0 = holder.require_i64(key)?,
            "number_of_slc_range_pixels" => self.snpix = holder.require_i64(key)?,
            "offset_estimation_starting_range" => {
                self.x_start = holder.require_i64(key)?;
                self.sync_extents();
            }
            "offset_estimation_starting_azimuth" => {
                self.y_start = holder.require_i64(key)?;
                self.sync_extents();
            }
            "offset_estimation_ending_range" => {
                self.x_end = holder.require_i64(key)?;
                self.warn_stale_extents();
            }
            "offset_estimation_ending_azimuth" => {
                self.y_end = holder.require_i64(key)?;
                self.warn_stale_extents();
            }
            "offset_estimation_range_samples" => {
                let npix = holder.require_i64(key)?;
                self.set_grid(npix, self.nrec, self.rgsp, self.azsp)?;
            }
            "offset_estimation_azimuth_samples" => {
                let nrec = holder.require_i64(key)?;
                self.set_grid(self.npix, nrec, self.rgsp, self.azsp)?;
            }
            "offset_estimation_range_spacing" => {
                let rgsp = holder.require_i64(key)?;
                self.set_grid(self.npix, self.nrec, rgsp, self.azsp)?;
            }
            "offset_estimation_azimuth_spacing" => {
                let azsp = holder.require_i64(key)?;
                self.set_grid(self.npix, self.nrec, self.rgsp, azsp)?;
            }
            "offset_estimation_window_width" => self.ofw_w = holder.require_i64(key)?,
            "offset_estimation_window_height" => self.ofw_h = holder.require_i64(key)?,
            "offset_estimation_threshhold" => self.ofw_thr = holder.require_f64(key)?,
            "range_offset_polynomial" => self.xoff = holder.require_f64_array::<3>(key)?,
            "azimuth_offset_polynomial" => self.yoff = holder.require_f64_array::<3>(key)?,
            "slc1_starting_azimuth_line" => self.slc1 = holder.require_i64(key)?,
            "interferogram_azimuth_lines" => self.nrec_i = holder.require_i64(key)?,
            "interferogram_width" => self.npix_i = holder.require_i64(key)?,
            "first_nonzero_range_pixel" => self.xno0_1st = holder.require_i64(key)?,
            "number_of_nonzero_range_pixels" => self.n_x0 = holder.require_i64(key)?,
            "interferogram_range_looks" => self.xnlook = holder.require_i64(key)?,
            "interferogram_azimuth_looks" => self.ynlook = holder.require_i64(key)?,
            "interferogram_range_pixel_spacing" => self.rgsp_i = holder.require_f64(key)?,
            "interferogram_azimuth_pixel_spacing" => self.azsp_i = holder.require_f64(key)?,
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }

    /// Replace grid dimensions and spacing, recomputing `x_end`/`y_end`
    pub fn set_grid(&mut self, npix: i64, nrec: i64, rgsp: i64, azsp: i64) -> OffsetResult<()> {
        if npix <= 0 || nrec <= 0 || rgsp <= 0 || azsp <= 0 {
            return Err(OffsetError::InvalidConfiguration(format!(
                "grid {}x{} with spacing {}x{} is not valid",
                nrec, npix, azsp, rgsp
            )));
        }
        let candidate = Self {
            npix,
            nrec,
            rgsp,
            azsp,
            ..self.clone()
        };
        if candidate.checked_cell_bytes().is_none() || candidate.checked_extents().is_none() {
            return Err(OffsetError::InvalidConfiguration(format!(
                "grid {}x{} with spacing {}x{} overflows the addressable size",
                nrec, npix, azsp, rgsp
            )));
        }
        self.npix = npix;
        self.nrec = nrec;
        self.rgsp = rgsp;
        self.azsp = azsp;
        self.sync_extents();
        Ok(())
    }

    fn sync_extents(&mut self) {
        self.x_end = self.expected_x_end();
        self.y_end = self.expected_y_end();
    }

    fn warn_stale_extents(&self) {
        if self.x_end != self.expected_x_end() || self.y_end != self.expected_y_end() {
            log::warn!(
                "grid end ({}, {}) differs from start + (n-1)*spacing ({}, {})",
                self.x_end,
                self.y_end,
                self.expected_x_end(),
                self.expected_y_end()
            );
        }
    }

    fn checked_extents(&self) -> Option<(i64, i64)> {
        let x_end = (self.npix - 1).checked_mul(self.rgsp)?.checked_add(self.x_start)?;
        let y_end = (self.nrec - 1).checked_mul(self.azsp)?.checked_add(self.y_start)?;
        Some((x_end, y_end))
    }

    /// Size of the complex64 grid in bytes, if addressable
    pub fn checked_cell_bytes(&self) -> Option<usize> {
        let (rows, cols) = self.shape();
        rows.checked_mul(cols)?.checked_mul(8)
    }

    pub fn expected_x_end(&self) -> i64 {
        self.x_start + (self.npix - 1) * self.rgsp
    }

    pub fn expected_y_end(&self) -> i64 {
        self.y_start + (self.nrec - 1) * self.azsp
    }

    /// Grid shape as `(azimuth_samples, range_samples)`
    pub fn shape(&self) -> (usize, usize) {
        (self.nrec.max(0) as usize, self.npix.max(0) as usize)
    }

    /// Full-resolution coordinate of grid cell `(row, col)` as `(range, azimuth)`
    pub fn cell_coordinate(&self, row: usize, col: usize) -> (f64, f64) {
        (
            (self.x_start + col as i64 * self.rgsp) as f64,
            (self.y_start + row as i64 * self.azsp) as f64,
        )
    }

    /// Human-readable summary
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Offset map parameters ({})", self.title);
        let _ = writeln!(out, "  initial offset (r0, z0):   ({}, {})", self.r0, self.z0);
        let _ = writeln!(
            out,
            "  range:   start {:>8}  end {:>8}  samples {:>6}  spacing {:>4}",
            self.x_start, self.x_end, self.npix, self.rgsp
        );
        let _ = writeln!(
            out,
            "  azimuth: start {:>8}  end {:>8}  samples {:>6}  spacing {:>4}",
            self.y_start, self.y_end, self.nrec, self.azsp
        );
        let _ = writeln!(
            out,
            "  window:  {}x{}  threshold {}",
            self.ofw_w,
            self.ofw_h,
            format_scalar(self.ofw_thr)
        );
        let _ = writeln!(out, "  range polynomial:   {}", join_coeffs(&self.xoff));
        let _ = writeln!(out, "  azimuth polynomial: {}", join_coeffs(&self.yoff));
        let _ = writeln!(
            out,
            "  interferogram: {}x{} lines/width, looks {}x{}, spacing {} x {} m",
            self.nrec_i,
            self.npix_i,
            self.ynlook,
            self.xnlook,
            format_float(self.azsp_i),
            format_float(self.rgsp_i)
        );
        out
    }
}

fn unknown_key(key: &str) -> OffsetError {
    OffsetError::header("offset parameters", format!("unknown key '{}'", key))
}

fn push_entry(out: &mut String, key: &str, width: usize, value: &str) {
    let label = format!("{}:", key);
    let _ = writeln!(out, "{:<width$}{}", label, value, width = width);
}

fn join_coeffs(coeffs: &[f64; 3]) -> String {
    coeffs
        .iter()
        .map(|&c| format_exp(c, 14, 5).trim().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// C-style `%W.Pe` formatting (`-1.23450e-03`)
pub(crate) fn format_exp(value: f64, width: usize, precision: usize) -> String {
    let raw = format!("{:.*e}", precision, value);
    let text = match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exp: i32 = exponent.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    };
    format!("{:>width$}", text, width = width)
}

/// Float text with a mandatory fractional part (`6.0`, `0.35`)
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Integral values print without a fractional part (`3`), others as floats (`0.2`)
pub(crate) fn format_scalar(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OffsetParams {
        let mut params = OffsetParams {
            r0: -12,
            z0: 340,
            x_start: 33,
            y_start: 60,
            ofw_w: 64,
            ofw_h: 64,
            ofw_thr: 3.0,
            xoff: [-12.0, 1.5e-4, -2.25e-5],
            yoff: [340.0, 0.0, 3.125e-3],
            ..OffsetParams::default()
        };
        params.set_grid(200, 150, 30, 30).unwrap();
        params
    }

    #[test]
    fn test_exponent_format() {
        assert_eq!(format_exp(-1.2345e-3, 14, 5), "  -1.23450e-03");
        assert_eq!(format_exp(340.0, 14, 5), "   3.40000e+02");
        assert_eq!(format_exp(0.0, 14, 5), "   0.00000e+00");
    }

    #[test]
    fn test_float_formats() {
        assert_eq!(format_float(6.0), "6.0");
        assert_eq!(format_float(0.35), "0.35");
        assert_eq!(format_scalar(3.0), "3");
        assert_eq!(format_scalar(0.2), "0.2");
    }

    #[test]
    fn test_render_fixed_widths() {
        let text = sample().render();
        assert!(text.starts_with("Gamma Interferometric SAR Processor (ISP)\n"));
        assert!(text.contains("\ninitial_range_offset:                 -12\n"));
        assert!(text.contains("\noffset_estimation_ending_range:       6003\n"));
        assert!(text.contains(
            "\nrange_offset_polynomial:       -1.20000e+01   1.50000e-04  -2.25000e-05\n"
        ));
        assert!(text.contains("\ninterferogram_width:                      0\n"));
        assert!(text.contains("\ninterferogram_range_pixel_spacing:       0.0\n"));
        assert!(text.ends_with("*************** END OF ISP-OFFSET PARAMETERS ******************\n"));
    }

    #[test]
    fn test_parse_render_round_trip() {
        let params = sample();
        let parsed = OffsetParams::parse(&params.render(), "round-trip").unwrap();
        assert_eq!(parsed, params);
    }

    #[test]
    fn test_grid_keys_keep_extents_in_sync() {
        let mut params = sample();
        params.set_value("offset_estimation_range_spacing", "10").unwrap();
        assert_eq!(params.x_end, 33 + 199 * 10);
        params.set_value("offset_estimation_azimuth_samples", "75").unwrap();
        assert_eq!(params.y_end, 60 + 74 * 30);
        params.set_value("offset_estimation_starting_range", "0").unwrap();
        assert_eq!(params.x_end, 199 * 10);
        assert_eq!(params.get_value("offset_estimation_ending_azimuth").unwrap(), "2280");
    }

    #[test]
    fn test_overflowing_grid_rejected() {
        let mut params = OffsetParams::default();
        assert!(matches!(
            params.set_grid(1 << 40, 1 << 40, 30, 30),
            Err(OffsetError::InvalidConfiguration(_))
        ));
        assert!(params.set_grid(i64::MAX, 1, 30, 30).is_err());

        params.set_grid(4, 3, 30, 30).unwrap();
        let huge = 1i64 << 40;
        let text = params
            .render()
            .replace(
                "offset_estimation_range_samples:      4",
                &format!("offset_estimation_range_samples:      {}", huge),
            )
            .replace(
                "offset_estimation_azimuth_samples:    3",
                &format!("offset_estimation_azimuth_samples:    {}", huge),
            );
        assert!(matches!(
            OffsetParams::parse(&text, "huge.par"),
            Err(OffsetError::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_ending_keys_stored_as_given() {
        let mut params = OffsetParams::default();
        params.set_grid(4, 3, 30, 30).unwrap();
        params.set_value("offset_estimation_ending_range", "95").unwrap();
        assert_eq!(params.x_end, 95);
        assert_ne!(params.x_end, params.expected_x_end());

        params.set_value("offset_estimation_range_spacing", "30").unwrap();
        assert_eq!(params.x_end, params.expected_x_end());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut params = sample();
        assert!(params.get_value("no_such_key").is_err());
        assert!(params.set_value("no_such_key", "1").is_err());
        assert!(params.set_value("offset_estimation_range_samples", "0").is_err());
    }
}
