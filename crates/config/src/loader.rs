use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::CastellanConfig, validate::Severity};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "castellan.toml",
    "castellan.yaml",
    "castellan.yml",
    "castellan.json",
];

/// Load config from the given path (any supported format).
///
/// Misspelled keys deserialize silently with defaults applied, so TOML files
/// are run through the validator first and findings land in the log.
pub fn load_config(path: &Path) -> anyhow::Result<CastellanConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    if path.extension().and_then(|e| e.to_str()) == Some("toml") {
        for diag in crate::validate::validate_toml_str(&raw).diagnostics {
            match diag.severity {
                Severity::Error | Severity::Warning => {
                    warn!(severity = %diag.severity, path = %diag.path, "{}", diag.message);
                },
                Severity::Info => debug!(path = %diag.path, "{}", diag.message),
            }
        }
    }
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./castellan.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/castellan/castellan.{toml,yaml,yml,json}` (user-global)
///
/// Returns `CastellanConfig::default()` if no config file is found.
pub fn discover_and_load() -> CastellanConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    CastellanConfig::default()
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/castellan/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "castellan") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/castellan/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "castellan").map(|d| d.config_dir().to_path_buf())
}

/// Returns the path of an existing config file, or the default TOML path.
pub fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("castellan.toml")
}

/// Serialize `config` to TOML and write it to the user-global config path.
///
/// Creates parent directories if needed. Returns the path written to.
pub fn save_config(config: &CastellanConfig) -> anyhow::Result<PathBuf> {
    let path = find_or_default_config_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, toml_str)?;
    debug!(path = %path.display(), "saved config");
    Ok(path)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<CastellanConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn loads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castellan.toml");
        std::fs::write(&path, "[stepup]\nttl_secs = 120\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.stepup.ttl_secs, 120);
        assert_eq!(cfg.risk.thresholds.high, 75);
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castellan.json");
        std::fs::write(&path, r#"{"risk": {"failure_threshold": 5}}"#).unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.risk.failure_threshold, 5);
    }

    #[test]
    fn loads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castellan.yaml");
        std::fs::write(
            &path,
            "risk:\n  business_hours:\n    timezone: America/Argentina/Buenos_Aires\n",
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(
            cfg.risk.business_hours.timezone,
            "America/Argentina/Buenos_Aires"
        );
    }

    #[test]
    fn rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castellan.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn misspelled_key_still_loads_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("castellan.toml");
        std::fs::write(&path, "[risk]\nfailure_treshold = 9\n").unwrap();

        // The typo is logged by the validator but does not fail the load.
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.risk.failure_threshold, 3);
    }
}
