//! Multi-marker configuration text format.
//!
//! ```text
//! # comments and blank lines are ignored
//! 2                  # marker count
//!
//! 0                  # matrix code id
//! 40.0               # width
//!  1.0 0.0 0.0 -50.0 # marker → composite transform, 3 rows
//!  0.0 1.0 0.0   0.0
//!  0.0 0.0 1.0   0.0
//!
//! hiro.patt          # template pattern, resolved by name
//! 40.0
//!  1.0 0.0 0.0  50.0
//!  0.0 1.0 0.0   0.0
//!  0.0 0.0 1.0   0.0
//! ```
//!
//! A numeric pattern line is a matrix code id; values above `i32::MAX` are
//! 64-bit global ids. Anything else names a template pattern and is mapped
//! to a pattern id by a [`PatternResolver`].

use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use armarker_core::{Mat34, Real};
use log::debug;

use crate::config::validate;
use crate::{ConfigError, MarkerDescriptor, MultiMarkerConfig, PatternType};

/// Maps template pattern names to pattern ids and back.
pub trait PatternResolver {
    /// Pattern id for `name`, loading or registering it as needed.
    fn resolve(&mut self, name: &str) -> Option<i32>;

    /// Name registered for `id`, when known.
    fn name_of(&self, _id: i32) -> Option<&str> {
        None
    }
}

/// Resolver assigning consecutive ids to pattern names as they are first
/// seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternIdTable {
    names: Vec<String>,
}

impl PatternIdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Option<i32> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| i32::try_from(i).ok())
    }
}

impl PatternResolver for PatternIdTable {
    fn resolve(&mut self, name: &str) -> Option<i32> {
        if let Some(id) = self.id_of(name) {
            return Some(id);
        }
        let id = i32::try_from(self.names.len()).ok()?;
        self.names.push(name.to_string());
        Some(id)
    }

    fn name_of(&self, id: i32) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }
}

/// Non-empty lines with comments stripped, tagged with 1-based line numbers.
struct Lines<'a> {
    inner: std::iter::Enumerate<std::str::Lines<'a>>,
    last: usize,
}

impl<'a> Lines<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            inner: text.lines().enumerate(),
            last: 0,
        }
    }

    fn next_content(&mut self, what: &str) -> Result<(usize, &'a str), ConfigError> {
        for (idx, raw) in self.inner.by_ref() {
            let content = raw.split('#').next().unwrap_or("").trim();
            if !content.is_empty() {
                self.last = idx + 1;
                return Ok((idx + 1, content));
            }
        }
        Err(ConfigError::invalid(
            Some(self.last + 1),
            format!("unexpected end of file, expected {what}"),
        ))
    }
}

fn parse_numbers(line: usize, text: &str, count: usize, what: &str) -> Result<Vec<Real>, ConfigError> {
    let values: Vec<Real> = text
        .split_whitespace()
        .take(count)
        .map(|tok| tok.parse::<Real>())
        .collect::<Result<_, _>>()
        .map_err(|_| ConfigError::invalid(Some(line), format!("malformed {what}: '{text}'")))?;
    if values.len() < count || values.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::invalid(
            Some(line),
            format!("expected {count} numbers for {what}, got '{text}'"),
        ));
    }
    Ok(values)
}

impl MultiMarkerConfig {
    /// Load a configuration file.
    pub fn from_file(
        path: impl AsRef<Path>,
        resolver: &mut dyn PatternResolver,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigError::FileNotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;
        let config = Self::parse(&text, resolver)?;
        debug!("loaded {} markers from {}", config.len(), path.display());
        Ok(config)
    }

    /// Parse configuration text.
    pub fn parse(text: &str, resolver: &mut dyn PatternResolver) -> Result<Self, ConfigError> {
        let mut lines = Lines::new(text);

        let (line, count_text) = lines.next_content("marker count")?;
        let count: usize = count_text
            .split_whitespace()
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| {
                ConfigError::invalid(Some(line), format!("malformed marker count '{count_text}'"))
            })?;
        if count == 0 {
            return Err(ConfigError::invalid(
                Some(line),
                "at least one marker is required",
            ));
        }

        let mut markers = Vec::with_capacity(count);
        let mut pattern_lines = Vec::with_capacity(count);
        for i in 0..count {
            let (line, pattern) = lines.next_content(&format!("pattern of marker {i}"))?;
            pattern_lines.push(line);

            let (width_line, width_text) = lines.next_content(&format!("width of marker {i}"))?;
            let width = parse_numbers(width_line, width_text, 1, "marker width")?[0];

            let mut trans = Mat34::zeros();
            for r in 0..3 {
                let (row_line, row_text) =
                    lines.next_content(&format!("transform row {r} of marker {i}"))?;
                let row = parse_numbers(row_line, row_text, 4, "transform row")?;
                for (c, v) in row.into_iter().enumerate() {
                    trans[(r, c)] = v;
                }
            }

            let descriptor = match pattern.parse::<u64>() {
                Ok(code) if code > i32::MAX as u64 => {
                    MarkerDescriptor::with_global_id(width, trans, code)
                }
                Ok(code) => MarkerDescriptor::new(code as i32, PatternType::Matrix, width, trans),
                Err(_) => {
                    let id = resolver.resolve(pattern).ok_or_else(|| {
                        ConfigError::invalid(
                            Some(line),
                            format!("cannot resolve pattern '{pattern}'"),
                        )
                    })?;
                    MarkerDescriptor::new(id, PatternType::Template, width, trans)
                }
            };
            markers.push(descriptor);
        }

        validate(&markers)
            .map_err(|(idx, reason)| ConfigError::invalid(pattern_lines.get(idx).copied(), reason))?;
        Ok(Self::from_validated(markers))
    }

    /// Render the configuration in the text format accepted by
    /// [`MultiMarkerConfig::parse`].
    pub fn to_config_string(&self, resolver: &dyn PatternResolver) -> Result<String, ConfigError> {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "# multi-marker configuration\n{}", self.len());
        for (i, m) in self.markers().iter().enumerate() {
            let pattern = match (m.global_id, m.pattern_type) {
                (Some(g), _) => g.to_string(),
                (None, PatternType::Matrix) => m.pattern_id.to_string(),
                (None, PatternType::Template) => resolver
                    .name_of(m.pattern_id)
                    .ok_or_else(|| {
                        ConfigError::invalid(
                            None,
                            format!("marker {i}: no name for template pattern {}", m.pattern_id),
                        )
                    })?
                    .to_string(),
            };
            let _ = writeln!(out, "\n{pattern}\n{}", m.width);
            for r in 0..3 {
                let _ = writeln!(
                    out,
                    "{} {} {} {}",
                    m.trans[(r, 0)],
                    m.trans[(r, 1)],
                    m.trans[(r, 2)],
                    m.trans[(r, 3)]
                );
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_MARKERS: &str = "\
# composite
2

0
40.0
1.0 0.0 0.0 -50.0
0.0 1.0 0.0 0.0
0.0 0.0 1.0 0.0

hiro.patt   # template
40.0
1.0 0.0 0.0 50.0
0.0 1.0 0.0 0.0
0.0 0.0 1.0 0.0
";

    #[test]
    fn parses_matrix_and_template_markers() {
        let mut table = PatternIdTable::new();
        let cfg = MultiMarkerConfig::parse(TWO_MARKERS, &mut table).unwrap();
        assert_eq!(cfg.len(), 2);
        assert_eq!(cfg.markers()[0].pattern_type, PatternType::Matrix);
        assert_eq!(cfg.markers()[1].pattern_type, PatternType::Template);
        assert_eq!(table.id_of("hiro.patt"), Some(cfg.markers()[1].pattern_id));
        assert_relative_eq!(cfg.markers()[0].trans[(0, 3)], -50.0);
        assert_relative_eq!(cfg.markers()[1].pos3d[0].x, 30.0);
    }

    #[test]
    fn large_codes_are_global_ids() {
        let text = "1\n4294967296\n10\n1 0 0 0\n0 1 0 0\n0 0 1 0\n";
        let cfg = MultiMarkerConfig::parse(text, &mut PatternIdTable::new()).unwrap();
        let m = &cfg.markers()[0];
        assert_eq!(m.global_id, Some(4_294_967_296));
        assert_eq!(m.pattern_type, PatternType::Matrix);
    }

    #[test]
    fn zero_markers_is_invalid() {
        let err = MultiMarkerConfig::parse("# nothing\n0\n", &mut PatternIdTable::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { line: Some(2), .. }), "{err}");
    }

    #[test]
    fn truncated_file_reports_missing_item() {
        let text = "1\n5\n10\n1 0 0 0\n";
        let err = MultiMarkerConfig::parse(text, &mut PatternIdTable::new()).unwrap_err();
        match err {
            ConfigError::Invalid { reason, .. } => assert!(reason.contains("transform row 1")),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn malformed_row_reports_line() {
        let text = "1\n5\n10\n1 0 0 0\n0 1 x 0\n0 0 1 0\n";
        let err = MultiMarkerConfig::parse(text, &mut PatternIdTable::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { line: Some(5), .. }), "{err}");
    }

    #[test]
    fn duplicate_ids_point_at_second_marker() {
        let text = "2\n7\n10\n1 0 0 0\n0 1 0 0\n0 0 1 0\n7\n10\n1 0 0 9\n0 1 0 0\n0 0 1 0\n";
        let err = MultiMarkerConfig::parse(text, &mut PatternIdTable::new()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { line: Some(7), .. }), "{err}");
    }

    #[test]
    fn negative_width_is_invalid() {
        let text = "1\n5\n-10\n1 0 0 0\n0 1 0 0\n0 0 1 0\n";
        assert!(MultiMarkerConfig::parse(text, &mut PatternIdTable::new()).is_err());
    }

    #[test]
    fn text_round_trip() {
        let mut table = PatternIdTable::new();
        let cfg = MultiMarkerConfig::parse(TWO_MARKERS, &mut table).unwrap();
        let text = cfg.to_config_string(&table).unwrap();
        let again = MultiMarkerConfig::parse(&text, &mut table).unwrap();
        assert_eq!(cfg, again);
    }

    #[test]
    fn resolver_failure_is_reported() {
        struct Nothing;
        impl PatternResolver for Nothing {
            fn resolve(&mut self, _name: &str) -> Option<i32> {
                None
            }
        }
        let err = MultiMarkerConfig::parse(TWO_MARKERS, &mut Nothing).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { line: Some(10), .. }), "{err}");
    }
}
