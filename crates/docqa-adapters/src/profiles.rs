//! Profile store: built-in profiles plus TOML overrides.
//!
//! A profile file is a partial profile. Its tables are merged recursively
//! onto a base profile, so a file that only sets
//! `categories.geometry.pass_threshold` keeps every other field of the base.
//! The optional top-level `extends` key names the built-in to start from.

use std::path::Path;

use anyhow::{Context, Result};
use docqa_core::{ConfigError, ConfigurationProfile};
use serde::Serialize;
use tracing::debug;

/// Key naming the built-in profile a file starts from.
pub const EXTENDS_KEY: &str = "extends";

/// Name and description of a built-in profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileSummary {
    /// Profile name.
    pub name: String,
    /// Profile description.
    pub description: String,
}

/// Lists the built-in profiles, default first.
#[must_use]
pub fn builtin_profiles() -> Vec<ProfileSummary> {
    ConfigurationProfile::BUILTIN_NAMES
        .iter()
        .filter_map(|name| ConfigurationProfile::builtin(name).ok())
        .map(|p| ProfileSummary {
            name: p.name,
            description: p.description,
        })
        .collect()
}

/// Resolves the profile to analyze with.
///
/// Starts from the built-in `name` (or the default), applies the overrides
/// file if given, then validates.
///
/// # Errors
///
/// Returns an error if the name is unknown, the file cannot be read or
/// parsed, or the merged profile is invalid.
pub fn resolve(name: Option<&str>, file: Option<&Path>) -> Result<ConfigurationProfile> {
    let base = match name {
        Some(name) => ConfigurationProfile::builtin(name)?,
        None => ConfigurationProfile::default(),
    };
    let profile = match file {
        Some(path) => load_file(path, name.is_some().then_some(&base))?,
        None => base,
    };
    profile.validate()?;
    Ok(profile)
}

/// Loads a profile file.
///
/// The base is `base` if given, else the file's `extends` built-in, else
/// the default profile.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not merge into a
/// valid profile shape.
pub fn load_file(path: &Path, base: Option<&ConfigurationProfile>) -> Result<ConfigurationProfile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read profile file: {}", path.display()))?;
    let profile = from_toml_str(&contents, base)
        .with_context(|| format!("Invalid profile file: {}", path.display()))?;
    debug!(path = %path.display(), profile = %profile.name, "loaded profile file");
    Ok(profile)
}

/// Parses overrides and merges them onto a base profile. Does not validate.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML or mistyped fields and
/// [`ConfigError::UnknownProfile`] for an unknown `extends` name.
pub fn from_toml_str(
    contents: &str,
    base: Option<&ConfigurationProfile>,
) -> Result<ConfigurationProfile, ConfigError> {
    let mut overrides: toml::Table =
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.message().to_string()))?;

    let extends = match overrides.remove(EXTENDS_KEY) {
        Some(toml::Value::String(name)) => Some(name),
        Some(_) => {
            return Err(ConfigError::invalid(EXTENDS_KEY, "must be a profile name"));
        }
        None => None,
    };
    let base = match (base, extends) {
        (Some(base), _) => base.clone(),
        (None, Some(name)) => ConfigurationProfile::builtin(&name)?,
        (None, None) => ConfigurationProfile::default(),
    };
    merge(&base, overrides)
}

/// Merges a table of overrides onto a profile.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the merged value is not a profile.
pub fn merge(
    base: &ConfigurationProfile,
    overrides: toml::Table,
) -> Result<ConfigurationProfile, ConfigError> {
    let toml::Value::Table(mut merged) =
        toml::Value::try_from(base).map_err(|e| ConfigError::Parse(e.to_string()))?
    else {
        return Err(ConfigError::Parse("profile is not a table".into()));
    };
    merge_tables(&mut merged, overrides);
    toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.message().to_string()))
}

/// Renders a profile as TOML.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_toml(profile: &ConfigurationProfile) -> Result<String> {
    toml::to_string_pretty(profile).context("Failed to serialize profile")
}

fn merge_tables(base: &mut toml::Table, overrides: toml::Table) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::Category;

    #[test]
    fn test_builtin_profiles_listed() {
        let names: Vec<_> = builtin_profiles().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            vec![
                "document_black_background_strict",
                "document_lenient",
                "archival_quality"
            ]
        );
    }

    #[test]
    fn test_partial_override_keeps_base_fields() {
        let profile = from_toml_str(
            r#"
name = "tight_skew"

[categories.geometry]
pass_threshold = 0.5
"#,
            None,
        )
        .unwrap_or_default();

        let base = ConfigurationProfile::strict();
        assert_eq!(profile.name, "tight_skew");
        assert!((profile.categories.geometry.pass_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(
            profile.categories.geometry.warn_threshold,
            base.categories.geometry.warn_threshold
        );
        assert!(profile.categories.geometry.critical);
        assert_eq!(profile.categories.sharpness, base.categories.sharpness);
    }

    #[test]
    fn test_extends_selects_base() {
        let profile = from_toml_str("extends = \"archival_quality\"\nname = \"mine\"\n", None)
            .unwrap_or_default();
        assert_eq!(profile.name, "mine");
        assert_eq!(
            profile.categories.resolution,
            ConfigurationProfile::archival().categories.resolution
        );
    }

    #[test]
    fn test_unknown_extends_is_error() {
        let err = from_toml_str("extends = \"nope\"", None).err();
        assert_eq!(err, Some(ConfigError::UnknownProfile("nope".into())));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = from_toml_str("[categories", None).err();
        assert!(matches!(err, Some(ConfigError::Parse(_))));
    }

    #[test]
    fn test_mistyped_field_is_parse_error() {
        let err = from_toml_str("[categories.noise]\nweight = \"heavy\"\n", None).err();
        assert!(matches!(err, Some(ConfigError::Parse(_))));
    }

    #[test]
    fn test_arrays_replace() {
        let profile = from_toml_str("[sla]\nrequired_pass_categories = [\"geometry\"]\n", None)
            .unwrap_or_default();
        assert_eq!(profile.sla.required_pass_categories, vec![Category::Geometry]);
    }

    #[test]
    fn test_resolve_validates() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("{e}"));
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[categories.sharpness]\nweight = -1.0\n")
            .unwrap_or_else(|e| panic!("{e}"));

        let err = resolve(None, Some(&path)).err().map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|e| e.contains("categories.sharpness.weight")));
    }

    #[test]
    fn test_toml_round_trip_of_builtin() {
        let text = to_toml(&ConfigurationProfile::lenient()).unwrap_or_default();
        let back = from_toml_str(&text, None).unwrap_or_default();
        assert_eq!(back, ConfigurationProfile::lenient());
    }
}
