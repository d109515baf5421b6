//! Settings file and command-line merging
//!
//! Settings are read from `~/.config/chartsmith/config.yaml` (or `--config`).
//! Values given on the command line or through environment variables win over
//! the file.

use chartsmith_core::DependencyOverride;
use chartsmith_exec::Credentials;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CliError, Result};

/// Default helm executable, resolved through `PATH`
pub const DEFAULT_HELM: &str = "helm";

/// Settings file contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Extra exclude patterns applied when scanning for charts
    #[serde(default)]
    pub excludes: Vec<String>,

    /// Path of the helm executable
    #[serde(default)]
    pub helm_executable: Option<PathBuf>,

    /// Registry URI replacing `file://` dependency repositories
    #[serde(default)]
    pub override_repository: Option<String>,

    /// Version written for overridden dependencies
    #[serde(default)]
    pub override_version: Option<String>,

    /// Registry credentials for push and login
    #[serde(default)]
    pub registry: Option<RegistrySettings>,
}

/// Registry section of the settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySettings {
    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Settings {
    /// Load settings, falling back to defaults when no file exists
    ///
    /// An explicitly requested file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load_from(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&content).map_err(|e| {
            CliError::configuration_with_help(
                format!("Invalid settings file {}: {}", path.display(), e),
                "expected keys: excludes, helmExecutable, overrideRepository, overrideVersion, registry",
            )
        })
    }

    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chartsmith").join("config.yaml"))
    }
}

/// Command-line values that can override the settings file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub chart_dir: PathBuf,
    pub excludes: Vec<String>,
    pub helm: Option<PathBuf>,
    pub override_repository: Option<String>,
    pub override_version: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
}

/// Fully merged configuration for one run
#[derive(Debug, Clone)]
pub struct Resolved {
    pub chart_dir: PathBuf,
    pub excludes: Vec<String>,
    pub helm: PathBuf,
    pub dependency_override: Option<DependencyOverride>,
    pub credentials: Option<Credentials>,
}

impl Resolved {
    /// Merge command-line values over the settings file
    ///
    /// The override is enabled as soon as a repository or a version is
    /// given; a version without a repository fails validation here, before
    /// anything on disk is touched.
    pub fn merge(settings: Settings, cli: Overrides) -> Result<Self> {
        let mut excludes = cli.excludes;
        excludes.extend(settings.excludes);

        let helm = cli
            .helm
            .or(settings.helm_executable)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HELM));

        let repository = cli.override_repository.or(settings.override_repository);
        let version = cli.override_version.or(settings.override_version);

        let dependency_override = match (repository, version) {
            (None, None) => None,
            (repository, version) => {
                let ov = DependencyOverride::new(repository.unwrap_or_default(), version);
                ov.validate()?;
                Some(ov)
            }
        };

        let credentials = match (cli.registry_username, cli.registry_password) {
            (Some(username), Some(password)) => Some(Credentials::basic(username, password)),
            (None, None) => settings.registry.and_then(|r| r.credentials),
            _ => {
                return Err(CliError::configuration_with_help(
                    "Registry username and password must be given together",
                    "pass both --registry-username and --registry-password",
                ));
            }
        };

        Ok(Self {
            chart_dir: cli.chart_dir,
            excludes,
            helm,
            dependency_override,
            credentials,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn overrides() -> Overrides {
        Overrides {
            chart_dir: PathBuf::from("charts"),
            ..Default::default()
        }
    }

    #[test]
    fn test_settings_deserialize() {
        let yaml = r#"
excludes:
  - "**/legacy/**"
helmExecutable: /opt/helm/bin/helm
overrideRepository: oci://registry.example.com/charts
registry:
  credentials:
    type: basic
    username: ci
    password: secret
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.excludes, vec!["**/legacy/**"]);
        assert_eq!(
            settings.helm_executable,
            Some(PathBuf::from("/opt/helm/bin/helm"))
        );
        assert!(settings.override_version.is_none());
        assert_eq!(
            settings.registry.unwrap().credentials,
            Some(Credentials::basic("ci", "secret"))
        );
    }

    #[test]
    fn test_cli_wins_over_file() {
        let settings = Settings {
            excludes: vec!["file/**".to_string()],
            helm_executable: Some(PathBuf::from("/file/helm")),
            override_repository: Some("oci://file".to_string()),
            ..Default::default()
        };
        let cli = Overrides {
            excludes: vec!["cli/**".to_string()],
            helm: Some(PathBuf::from("/cli/helm")),
            override_repository: Some("oci://cli".to_string()),
            ..overrides()
        };

        let resolved = Resolved::merge(settings, cli).unwrap();
        assert_eq!(resolved.helm, PathBuf::from("/cli/helm"));
        assert_eq!(resolved.excludes, vec!["cli/**", "file/**"]);
        assert_eq!(
            resolved.dependency_override,
            Some(DependencyOverride::new("oci://cli", None))
        );
    }

    #[test]
    fn test_defaults() {
        let resolved = Resolved::merge(Settings::default(), overrides()).unwrap();
        assert_eq!(resolved.helm, PathBuf::from(DEFAULT_HELM));
        assert!(resolved.dependency_override.is_none());
        assert!(resolved.credentials.is_none());
    }

    #[test]
    fn test_version_without_repository_rejected() {
        let cli = Overrides {
            override_version: Some("1.0.0".to_string()),
            ..overrides()
        };
        let err = Resolved::merge(Settings::default(), cli).unwrap_err();
        assert!(matches!(err, CliError::Configuration { .. }));
    }

    #[test]
    fn test_partial_registry_credentials_rejected() {
        let cli = Overrides {
            registry_username: Some("ci".to_string()),
            ..overrides()
        };
        assert!(Resolved::merge(Settings::default(), cli).is_err());
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
        assert!(matches!(err, CliError::Configuration { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "overrideVersion: 2.0.0\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.override_version.as_deref(), Some("2.0.0"));
    }
}
