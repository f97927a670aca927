//! Layered configuration loading on figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables `eventflow.toml`
//! - `yaml-config`: enables `eventflow.yaml` / `eventflow.yml`
//!
//! Both features can be enabled simultaneously; both formats are then
//! searched and merged.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Profile-specific config file (`eventflow.{profile}.toml` / `.yaml`)
//! 3. Main config file (`eventflow.toml` / `eventflow.yaml`)
//! 4. Environment variables (`EVENTFLOW_*`)
//! 5. Programmatic overrides
//!
//! Files come from the first search directory holding any of them; the
//! working directory and `~/.config/eventflow` are searched by default.
//!
//! # Environment Variable Mapping
//!
//! Environment variables use the `EVENTFLOW_` prefix with `__` as separator:
//!
//! - `EVENTFLOW_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `EVENTFLOW_BROKER__MAX_LISTENERS=50` → `broker.max_listeners = 50`
//! - `EVENTFLOW_BROKER__ERROR_POLICY__ON_EMIT_ERROR=stop`
//!
//! # Example
//!
//! ```rust,ignore
//! use eventflow_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .profile("production")
//!     .file("./config/eventflow.toml")
//!     .load()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "toml-config", feature = "yaml-config"))]
use figment::providers::Format;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace, warn};

use super::error::{ConfigError, ConfigResult};
use super::schema::EventFlowConfig;

const ENV_PREFIX: &str = "EVENTFLOW_";
const FILE_STEM: &str = "eventflow";

// =============================================================================
// Profile
// =============================================================================

/// Selects the `eventflow.{profile}.*` file merged below the main file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Production,
    Custom(String),
}

impl Profile {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev` and `prod` shorthands.
    pub fn parse(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "dev" | "development" => Self::Development,
            "prod" | "production" => Self::Production,
            _ => Self::Custom(name),
        }
    }

    /// Reads `EVENTFLOW_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var(format!("{ENV_PREFIX}PROFILE"))
            .map(|name| Self::parse(&name))
            .unwrap_or_default()
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// File formats
// =============================================================================

/// A configuration file format compiled in through a cargo feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    #[cfg(feature = "toml-config")]
    Toml,
    #[cfg(feature = "yaml-config")]
    Yaml,
}

impl FileFormat {
    const ENABLED: &'static [Self] = &[
        #[cfg(feature = "toml-config")]
        Self::Toml,
        #[cfg(feature = "yaml-config")]
        Self::Yaml,
    ];

    fn extensions(self) -> &'static [&'static str] {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => &["toml"],
            #[cfg(feature = "yaml-config")]
            Self::Yaml => &["yaml", "yml"],
        }
    }

    fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.extensions().contains(&ext))
    }

    #[cfg_attr(
        not(any(feature = "toml-config", feature = "yaml-config")),
        allow(unused_variables)
    )]
    fn merge(self, figment: Figment, path: &Path) -> Figment {
        match self {
            #[cfg(feature = "toml-config")]
            Self::Toml => figment.merge(figment::providers::Toml::file(path)),
            #[cfg(feature = "yaml-config")]
            Self::Yaml => figment.merge(figment::providers::Yaml::file(path)),
        }
    }

    /// Every `{stem}.{ext}` path in `dir` for the enabled formats.
    fn candidates<'a>(dir: &'a Path, stem: &'a str) -> impl Iterator<Item = (Self, PathBuf)> + 'a {
        Self::ENABLED.iter().flat_map(move |&format| {
            format
                .extensions()
                .iter()
                .map(move |ext| (format, dir.join(format!("{stem}.{ext}"))))
        })
    }
}

// =============================================================================
// ConfigLoader
// =============================================================================

/// Assembles an [`EventFlowConfig`] from defaults, files, the environment
/// and programmatic overrides.
pub struct ConfigLoader {
    profile: Profile,
    search_paths: Vec<PathBuf>,
    /// Skips the search when set.
    file: Option<PathBuf>,
    load_env: bool,
    /// Merged last.
    overrides: Figment,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader with the profile taken from `EVENTFLOW_PROFILE`.
    pub fn new() -> Self {
        Self {
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            file: None,
            load_env: true,
            overrides: Figment::new(),
        }
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a directory to search. Without any, the working directory and
    /// the user config directory are searched.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the user config directory (`~/.config/eventflow` on Linux).
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(dir) => self.search_path(dir.join(FILE_STEM)),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges `config` above every other source.
    pub fn merge(mut self, config: EventFlowConfig) -> Self {
        self.overrides = self.overrides.merge(Serialized::defaults(config));
        self
    }

    pub fn load(self) -> ConfigResult<EventFlowConfig> {
        let profile = self.profile.clone();
        let config: EventFlowConfig = self.into_figment()?.extract()?;

        debug!(
            %profile,
            level = %config.logging.level,
            logger = config.broker.logger,
            max_listeners = config.broker.max_listeners,
            "Configuration loaded"
        );
        Ok(config)
    }

    fn into_figment(self) -> ConfigResult<Figment> {
        let defaults = Figment::from(Serialized::defaults(EventFlowConfig::default()));

        let mut figment = match &self.file {
            Some(path) => merge_file(defaults, path)?,
            None => self.merge_discovered(defaults),
        };

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Merging environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["PROFILE"]).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    fn search_dirs(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join(FILE_STEM)))
            .collect()
    }

    /// Merges the files of the first search directory that has any.
    ///
    /// Within that directory profile files sit below the main files.
    fn merge_discovered(&self, figment: Figment) -> Figment {
        let profile_stem = format!("{FILE_STEM}.{}", self.profile);

        for dir in self.search_dirs() {
            let files: Vec<(FileFormat, PathBuf)> = FileFormat::candidates(&dir, &profile_stem)
                .chain(FileFormat::candidates(&dir, FILE_STEM))
                .filter(|(_, path)| path.is_file())
                .collect();

            if files.is_empty() {
                trace!(dir = %dir.display(), "No configuration files");
                continue;
            }

            return files.into_iter().fold(figment, |figment, (format, path)| {
                info!(path = %path.display(), "Loading configuration file");
                format.merge(figment, &path)
            });
        }

        warn!("No configuration file found, using defaults");
        figment
    }
}

fn merge_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let Some(format) = FileFormat::for_path(path) else {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        return Err(ConfigError::UnsupportedFormat(ext));
    };
    info!(path = %path.display(), "Loading configuration file");
    Ok(format.merge(figment, path))
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<EventFlowConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<EventFlowConfig> {
    ConfigLoader::new().file(path).load()
}

// =============================================================================
// Tests
// =============================================================================
