//! Configuration loading, validation, and env substitution.
//!
//! Config files: `castellan.toml`, `castellan.yaml`, or `castellan.json`
//! Searched in `./` then `~/.config/castellan/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        config_dir, discover_and_load, find_or_default_config_path, load_config, save_config,
    },
    schema::{
        AuditConfig, BusinessHoursConfig, CastellanConfig, FactorPoints, LevelThresholds,
        MetricsConfig, PolicyConfig, RiskConfig, StepUpConfig, UnknownHistory,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
