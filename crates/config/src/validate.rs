//! Configuration validation engine.
//!
//! Validates TOML configuration files against the known schema, detects
//! unknown/misspelled fields, and reports semantic errors the type system
//! cannot (inverted thresholds, bad timezones, zero TTLs).

use std::{collections::HashMap, path::Path, str::FromStr};

use crate::schema::CastellanConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        })
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "semantic", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "risk.thresholds.hgh"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Schema tree for unknown-field detection ─────────────────────────────────

/// Represents the expected shape of the configuration schema.
enum KnownKeys {
    /// A struct with fixed field names.
    Struct(HashMap<&'static str, KnownKeys>),
    /// A map with dynamic keys (metrics labels) whose values have a known shape.
    Map(Box<KnownKeys>),
    /// Scalar value — stop recursion.
    Leaf,
}

/// Build the full schema map mirroring every field in `schema.rs`.
fn build_schema_map() -> KnownKeys {
    use KnownKeys::{Leaf, Map, Struct};

    let thresholds = || Struct(HashMap::from([("medium", Leaf), ("high", Leaf)]));

    let factors = || {
        Struct(HashMap::from([
            ("new_location", Leaf),
            ("outside_hours", Leaf),
            ("repeated_failures", Leaf),
            ("unknown_device", Leaf),
            ("impossible_travel", Leaf),
            ("flagged_network", Leaf),
        ]))
    };

    let business_hours = || {
        Struct(HashMap::from([
            ("start_hour", Leaf),
            ("end_hour", Leaf),
            ("weekdays_only", Leaf),
            ("timezone", Leaf),
        ]))
    };

    Struct(HashMap::from([
        (
            "risk",
            Struct(HashMap::from([
                ("thresholds", thresholds()),
                ("factors", factors()),
                ("failure_window_secs", Leaf),
                ("failure_threshold", Leaf),
                ("impossible_speed_kmh", Leaf),
                ("minor_travel_km", Leaf),
                ("unknown_history", Leaf),
                ("business_hours", business_hours()),
            ])),
        ),
        ("policy", Struct(HashMap::from([("seed_defaults", Leaf)]))),
        (
            "stepup",
            Struct(HashMap::from([
                ("ttl_secs", Leaf),
                ("otp_digits", Leaf),
                ("min_pin_len", Leaf),
            ])),
        ),
        ("audit", Struct(HashMap::from([("log_events", Leaf)]))),
        (
            "metrics",
            Struct(HashMap::from([
                ("enabled", Leaf),
                ("labels", Map(Box::new(Leaf))),
            ])),
        ),
    ]))
}

// ── Misspelling suggestions ─────────────────────────────────────────────────

/// Levenshtein edit distance, single rolling row.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut row: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let substituted = diag + usize::from(ca != cb);
            diag = row[j + 1];
            row[j + 1] = substituted.min(diag + 1).min(row[j] + 1);
        }
    }
    row[b_chars.len()]
}

/// The candidate closest to `needle`, if any lies within `max_distance`
/// edits. Exact matches are excluded; ties keep the first candidate.
fn closest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&candidate| (edit_distance(needle, candidate), candidate))
        .filter(|&(distance, _)| distance > 0 && distance <= max_distance)
        .min_by_key(|&(distance, _)| distance)
        .map(|(_, candidate)| candidate)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let Some(config_path) = path
        .map(Path::to_path_buf)
        .or_else(crate::loader::find_config_file)
    else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let mut result = match std::fs::read_to_string(&config_path) {
        Ok(content) => validate_toml_str(&content),
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: None,
        },
    };
    result.config_path = Some(config_path);
    result
}

/// Validate a TOML string without file-system side effects (useful for tests
/// and admin tooling).
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let mut diagnostics = Vec::new();

    match toml::from_str::<toml::Value>(toml_str) {
        // Nothing else is meaningful on a syntax error.
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message: format!("TOML syntax error: {e}"),
        }),
        Ok(tree) => {
            walk_unknown_keys(&tree, &build_schema_map(), "", &mut diagnostics);
            match toml::from_str::<CastellanConfig>(toml_str) {
                Ok(config) => check_semantic(&config, &mut diagnostics),
                Err(e) => diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    category: "type-error",
                    path: String::new(),
                    message: format!("type error: {e}"),
                }),
            }
        },
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn key_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Walk the TOML value tree against the schema tree and flag unknown keys.
fn walk_unknown_keys(
    value: &toml::Value,
    schema: &KnownKeys,
    prefix: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let toml::Value::Table(table) = value else {
        // Leaf or type mismatch; deserialization reports those.
        return;
    };

    match schema {
        KnownKeys::Leaf => {},
        KnownKeys::Map(inner) => {
            for (key, child) in table {
                walk_unknown_keys(child, inner, &key_path(prefix, key), diagnostics);
            }
        },
        KnownKeys::Struct(fields) => {
            for (key, child) in table {
                let path = key_path(prefix, key);
                match fields.get(key.as_str()) {
                    Some(child_schema) => {
                        walk_unknown_keys(child, child_schema, &path, diagnostics);
                    },
                    None => {
                        let known: Vec<&str> = fields.keys().copied().collect();
                        let mut message = if prefix.is_empty() {
                            String::from("unknown field at top level")
                        } else {
                            String::from("unknown field")
                        };
                        if let Some(best) = closest(key, &known, 3) {
                            message.push_str(&format!(" (did you mean \"{best}\"?)"));
                        }
                        diagnostics.push(Diagnostic {
                            severity: Severity::Error,
                            category: "unknown-field",
                            path,
                            message,
                        });
                    },
                }
            }
        },
    }
}

/// Run semantic checks on a successfully parsed config.
fn check_semantic(config: &CastellanConfig, diagnostics: &mut Vec<Diagnostic>) {
    let mut push = |severity: Severity, path: &str, message: String| {
        diagnostics.push(Diagnostic {
            severity,
            category: "semantic",
            path: path.to_string(),
            message,
        });
    };

    let risk = &config.risk;
    if risk.thresholds.medium >= risk.thresholds.high {
        push(
            Severity::Error,
            "risk.thresholds",
            format!(
                "medium threshold ({}) must be below high threshold ({})",
                risk.thresholds.medium, risk.thresholds.high
            ),
        );
    }
    if risk.thresholds.high > 100 {
        push(
            Severity::Error,
            "risk.thresholds.high",
            format!(
                "high threshold ({}) is above the score ceiling of 100",
                risk.thresholds.high
            ),
        );
    }

    for (name, points) in [
        ("new_location", risk.factors.new_location),
        ("outside_hours", risk.factors.outside_hours),
        ("repeated_failures", risk.factors.repeated_failures),
        ("unknown_device", risk.factors.unknown_device),
        ("impossible_travel", risk.factors.impossible_travel),
        ("flagged_network", risk.factors.flagged_network),
    ] {
        if points > 100 {
            push(
                Severity::Error,
                &format!("risk.factors.{name}"),
                format!("factor points ({points}) exceed the score ceiling of 100"),
            );
        }
    }

    if risk.failure_threshold == 0 {
        push(
            Severity::Warning,
            "risk.failure_threshold",
            "failure threshold of 0 makes the repeated-failures factor always trigger".into(),
        );
    }
    if risk.impossible_speed_kmh <= 0.0 {
        push(
            Severity::Error,
            "risk.impossible_speed_kmh",
            "impossible-travel speed threshold must be positive".into(),
        );
    }

    let hours = &risk.business_hours;
    if hours.start_hour >= hours.end_hour || hours.end_hour > 24 {
        push(
            Severity::Error,
            "risk.business_hours",
            format!(
                "invalid business-hours window {}..{}",
                hours.start_hour, hours.end_hour
            ),
        );
    }
    if chrono_tz::Tz::from_str(&hours.timezone).is_err() {
        push(
            Severity::Error,
            "risk.business_hours.timezone",
            format!("unknown IANA timezone \"{}\"", hours.timezone),
        );
    }

    if config.stepup.ttl_secs == 0 {
        push(
            Severity::Error,
            "stepup.ttl_secs",
            "challenge TTL must be non-zero".into(),
        );
    }
    if !(4..=10).contains(&config.stepup.otp_digits) {
        push(
            Severity::Warning,
            "stepup.otp_digits",
            format!(
                "one-time codes of {} digits are outside the supported 4-10 range",
                config.stepup.otp_digits
            ),
        );
    }
    if config.stepup.min_pin_len < 4 {
        push(
            Severity::Warning,
            "stepup.min_pin_len",
            "PINs shorter than 4 digits are trivially guessable".into(),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_clean() {
        let result = validate_toml_str("");
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn misspelled_field_suggests_correction() {
        let result = validate_toml_str("[risk.thresholds]\nhgih = 80\n");
        assert!(result.has_errors());
        let diag = result
            .diagnostics
            .iter()
            .find(|d| d.category == "unknown-field")
            .unwrap();
        assert_eq!(diag.path, "risk.thresholds.hgih");
        assert!(diag.message.contains("high"), "{}", diag.message);
    }

    #[test]
    fn unknown_top_level_section_is_flagged() {
        let result = validate_toml_str("[scoring]\nx = 1\n");
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "scoring" || d.path.starts_with("scoring."))
        );
    }

    #[test]
    fn inverted_thresholds_are_an_error() {
        let result = validate_toml_str("[risk.thresholds]\nmedium = 80\nhigh = 40\n");
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "risk.thresholds" && d.severity == Severity::Error)
        );
    }

    #[test]
    fn zero_ttl_is_an_error() {
        let result = validate_toml_str("[stepup]\nttl_secs = 0\n");
        assert!(result.has_errors());
    }

    #[test]
    fn bad_timezone_is_an_error() {
        let result = validate_toml_str("[risk.business_hours]\ntimezone = \"Mars/Olympus\"\n");
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "risk.business_hours.timezone")
        );
    }

    #[test]
    fn oversized_factor_points_are_an_error() {
        let result = validate_toml_str("[risk.factors]\nflagged_network = 150\n");
        assert!(result.has_errors());
    }

    #[test]
    fn short_pin_is_a_warning_not_error() {
        let result = validate_toml_str("[stepup]\nmin_pin_len = 2\n");
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn type_error_reported_for_wrong_value_kind() {
        let result = validate_toml_str("[stepup]\nttl_secs = \"soon\"\n");
        assert!(result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "type-error")
        );
    }

    #[test]
    fn metrics_labels_accept_arbitrary_keys() {
        let result = validate_toml_str("[metrics.labels]\nregion = \"us-east-1\"\n");
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("abc", "abd"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn closest_respects_max_distance() {
        let candidates = ["medium", "high"];
        assert_eq!(closest("mediun", &candidates, 2), Some("medium"));
        assert_eq!(closest("completely-off", &candidates, 2), None);
    }
}
