use crate::types::{OffsetError, OffsetResult};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

fn entry_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z0-9_]+)\s*:(.*)$").expect("static key/value pattern")
    })
}

/// Line-oriented `key: value [unit]` parameter file as written by GAMMA ISP tools.
///
/// Entries keep their file order. Lines without a `key:` prefix (banner lines,
/// blank lines, the closing `****` line) are ignored.
#[derive(Debug, Clone, Default)]
pub struct ParFile {
    source: String,
    entries: Vec<(String, String)>,
}

impl ParFile {
    /// Read and parse a parameter file
    pub fn load<P: AsRef<Path>>(path: P) -> OffsetResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(OffsetError::MissingInputFile {
                path: path.to_path_buf(),
            });
        }
        log::debug!("Reading parameter file: {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text, path.display().to_string()))
    }

    /// Parse parameter text; `source` names the origin in error messages
    pub fn parse(text: &str, source: impl Into<String>) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                entry_pattern()
                    .captures(line)
                    .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
            })
            .collect();

        Self {
            source: source.into(),
            entries,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Raw value text for `key` (units included), first occurrence wins
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Whitespace-separated value tokens for `key`
    pub fn tokens(&self, key: &str) -> OffsetResult<Vec<&str>> {
        self.get(key)
            .map(|v| v.split_whitespace().collect())
            .ok_or_else(|| OffsetError::header(&self.source, format!("missing key '{}'", key)))
    }

    /// First value token for `key`, trailing unit dropped
    pub fn require_str(&self, key: &str) -> OffsetResult<&str> {
        self.tokens(key)?
            .first()
            .copied()
            .ok_or_else(|| OffsetError::header(&self.source, format!("empty value for '{}'", key)))
    }

    pub fn require_f64(&self, key: &str) -> OffsetResult<f64> {
        let token = self.require_str(key)?;
        token.parse::<f64>().map_err(|_| {
            OffsetError::header(
                &self.source,
                format!("value '{}' for '{}' is not numeric", token, key),
            )
        })
    }

    /// Integer value; accepts float text such as `2500.0` the way ISP files sometimes carry it
    pub fn require_i64(&self, key: &str) -> OffsetResult<i64> {
        let token = self.require_str(key)?;
        if let Ok(value) = token.parse::<i64>() {
            return Ok(value);
        }
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value.trunc() as i64),
            _ => Err(OffsetError::header(
                &self.source,
                format!("value '{}' for '{}' is not an integer", token, key),
            )),
        }
    }

    /// Exactly `N` leading numeric tokens (polynomial coefficients)
    pub fn require_f64_array<const N: usize>(&self, key: &str) -> OffsetResult<[f64; N]> {
        let tokens = self.tokens(key)?;
        if tokens.len() < N {
            return Err(OffsetError::header(
                &self.source,
                format!("'{}' needs {} values, found {}", key, N, tokens.len()),
            ));
        }
        let mut values = [0.0; N];
        for (slot, token) in values.iter_mut().zip(tokens) {
            *slot = token.parse::<f64>().map_err(|_| {
                OffsetError::header(
                    &self.source,
                    format!("value '{}' for '{}' is not numeric", token, key),
                )
            })?;
        }
        Ok(values)
    }

    /// Optional integer: absent keys give `default`, present but malformed values still fail
    pub fn optional_i64(&self, key: &str, default: i64) -> OffsetResult<i64> {
        if self.contains(key) {
            self.require_i64(key)
        } else {
            Ok(default)
        }
    }

    pub fn optional_f64(&self, key: &str, default: f64) -> OffsetResult<f64> {
        if self.contains(key) {
            self.require_f64(key)
        } else {
            Ok(default)
        }
    }
}
