//! Layered configuration for texsort.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. built-in defaults,
//! 2. `config.toml`, `config.yaml` and `config.json` in the platform config
//!    directory (e.g. `~/.config/texsort/` on Linux),
//! 3. a file passed explicitly (`--config`),
//! 4. `TEXSORT_`-prefixed environment variables, with `__` separating
//!    nested keys (`TEXSORT_ORGANIZE__MODE=suggested`).
//!
//! The merged result is [validated](Config::validate) before it is returned.

pub mod error;

pub use crate::error::{Error, ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use texsort_learning::SuggestionEngine;
use texsort_learning::suggest::{DEFAULT_LEARN_WEIGHT, DEFAULT_LIMIT, DEFAULT_MODEL_WEIGHT};
use texsort_organize::{ConflictPolicy, Mode, Operation, Options, OrganizationStyle, StyleKind};

pub const ENV_PREFIX: &str = "TEXSORT_";
const APPLICATION: &str = "texsort";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where new learning profiles are saved and listed from.
    pub profiles_dir: PathBuf,
    pub organize: OrganizeConfig,
    pub suggestions: SuggestionConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self {
            profiles_dir: ProjectDirs::from("", "", APPLICATION)
                .map_or_else(|| PathBuf::from("profiles"), |dirs| dirs.data_dir().join("profiles")),
            organize: OrganizeConfig::default(),
            suggestions: SuggestionConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    pub extensions: Vec<String>,
    pub recursive: bool,
    pub style: StyleKind,
    /// Segments of the `custom` style.
    pub custom_template: Vec<String>,
    pub mode: Mode,
    pub conflict: ConflictPolicy,
    pub operation: Operation,
    pub learning: bool,
    pub dry_run: bool,
}
impl Default for OrganizeConfig {
    fn default() -> Self {
        let options = Options::default();
        Self {
            extensions: options.extensions,
            recursive: options.recursive,
            style: StyleKind::Flat,
            custom_template: Vec::new(),
            mode: options.mode,
            conflict: options.conflict,
            operation: options.operation,
            learning: options.learning,
            dry_run: options.dry_run,
        }
    }
}
impl OrganizeConfig {
    pub fn options(&self) -> Options {
        Options {
            extensions: self.extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect(),
            recursive: self.recursive,
            mode: self.mode,
            conflict: self.conflict,
            operation: self.operation,
            learning: self.learning,
            dry_run: self.dry_run,
        }
    }

    /// Builds the configured style, compiling custom templates.
    pub fn style(&self) -> Result<OrganizationStyle> {
        OrganizationStyle::new(self.style, self.custom_template.as_slice())
            .or_raise(|| ErrorKind::Invalid(format!("style `{}` cannot be built", self.style)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    pub learn_weight: f64,
    pub model_weight: f64,
    pub limit: usize,
}
impl Default for SuggestionConfig {
    fn default() -> Self {
        Self { learn_weight: DEFAULT_LEARN_WEIGHT, model_weight: DEFAULT_MODEL_WEIGHT, limit: DEFAULT_LIMIT }
    }
}
impl SuggestionConfig {
    pub fn engine(&self) -> SuggestionEngine {
        SuggestionEngine::new(self.learn_weight, self.model_weight, self.limit)
    }
}

/// The platform config directory, if the platform has one.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", APPLICATION).map(|dirs| dirs.config_dir().to_path_buf())
}

impl Config {
    /// Loads from every source; `explicit` must exist if given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(config_dir().as_deref(), explicit)?)
    }

    /// The merged sources, before extraction. `directory` is searched for
    /// `config.{toml,yaml,json}`; missing files there are skipped.
    pub fn figment(directory: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(directory) = directory {
            figment = figment
                .merge(Toml::file(directory.join("config.toml")))
                .merge(Yaml::file(directory.join("config.yaml")))
                .merge(Json::file(directory.join("config.json")));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
            figment = match extension.as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => exn::bail!(ErrorKind::Invalid(format!(
                    "unsupported config format: {} (expected .toml, .yaml or .json)",
                    path.display()
                ))),
            };
            tracing::debug!(path = %path.display(), "Using explicit config file");
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let SuggestionConfig { learn_weight, model_weight, limit } = self.suggestions;
        for (name, weight) in [("learn_weight", learn_weight), ("model_weight", model_weight)] {
            if !weight.is_finite() || weight < 0.0 {
                exn::bail!(ErrorKind::Invalid(format!("suggestions.{name} must be a non-negative number")));
            }
        }
        if learn_weight + model_weight <= 0.0 {
            exn::bail!(ErrorKind::Invalid("suggestion weights cannot both be zero".to_string()));
        }
        if limit == 0 {
            exn::bail!(ErrorKind::Invalid("suggestions.limit must be at least 1".to_string()));
        }
        if self.organize.extensions.iter().all(|e| e.trim_start_matches('.').trim().is_empty()) {
            exn::bail!(ErrorKind::Invalid("organize.extensions cannot be empty".to_string()));
        }
        if self.organize.style == StyleKind::Custom && self.organize.custom_template.is_empty() {
            exn::bail!(ErrorKind::Invalid("the custom style needs organize.custom_template".to_string()));
        }
        self.organize.style()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::ops::Deref;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.organize.style, StyleKind::Flat);
        assert_eq!(config.organize.options(), Options::default());
        assert_eq!(config.suggestions.limit, 5);
    }

    #[test]
    fn test_sources_are_layered() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[organize]\nstyle = \"sims\"\nmode = \"suggested\"\n")?;
            jail.create_file("config.json", r#"{"suggestions": {"limit": 3}}"#)?;
            jail.create_file("explicit.yaml", "organize:\n  mode: manual\n  operation: copy\n")?;
            jail.set_env("TEXSORT_ORGANIZE__CONFLICT", "skip");

            let figment = Config::figment(Some(jail.directory()), Some(Path::new("explicit.yaml"))).unwrap();
            let config = Config::from_figment(figment).unwrap();
            assert_eq!(config.organize.style, StyleKind::Sims);
            assert_eq!(config.organize.mode, Mode::Manual);
            assert_eq!(config.organize.operation, Operation::Copy);
            assert_eq!(config.organize.conflict, ConflictPolicy::Skip);
            assert_eq!(config.suggestions.limit, 3);
            assert!(config.organize.recursive);
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let error = Config::figment(None, Some(&missing)).unwrap_err();
        assert!(matches!(error.deref(), ErrorKind::NotFound(path) if *path == missing));
    }

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "mode=manual").unwrap();
        let error = Config::figment(None, Some(&path)).unwrap_err();
        assert!(matches!(error.deref(), ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_bad_values_fail_to_load() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[organize]\nmode = \"telepathic\"\n")?;
            let error = Config::from_figment(Config::figment(Some(jail.directory()), None).unwrap()).unwrap_err();
            assert!(matches!(error.deref(), ErrorKind::Load));
            Ok(())
        });
    }

    #[rstest]
    #[case::negative_weight(|c: &mut Config| c.suggestions.learn_weight = -1.0)]
    #[case::infinite_weight(|c: &mut Config| c.suggestions.model_weight = f64::INFINITY)]
    #[case::zero_weights(|c: &mut Config| { c.suggestions.learn_weight = 0.0; c.suggestions.model_weight = 0.0; })]
    #[case::zero_limit(|c: &mut Config| c.suggestions.limit = 0)]
    #[case::no_extensions(|c: &mut Config| c.organize.extensions.clear())]
    #[case::custom_without_template(|c: &mut Config| c.organize.style = StyleKind::Custom)]
    #[case::broken_template(|c: &mut Config| {
        c.organize.style = StyleKind::Custom;
        c.organize.custom_template = vec!["{{ category".to_string()];
    })]
    fn test_invalid(#[case] change: fn(&mut Config)) {
        let mut config = Config::default();
        change(&mut config);
        let error = config.validate().unwrap_err();
        assert!(matches!(error.deref(), ErrorKind::Invalid(_)));
    }

    #[test]
    fn test_custom_style_with_template() {
        let mut config = Config::default();
        config.organize.style = StyleKind::Custom;
        config.organize.custom_template = vec!["category".to_string(), "{{ lod }}".to_string()];
        assert!(config.validate().is_ok());
        assert_eq!(config.organize.style().unwrap().kind(), StyleKind::Custom);
    }

    #[test]
    fn test_options_normalise_extensions() {
        let mut config = OrganizeConfig::default();
        config.extensions = vec![".PNG".to_string(), "dds".to_string()];
        assert_eq!(config.options().extensions, ["png", "dds"]);
    }

    #[test]
    fn test_engine_from_config() {
        let engine = SuggestionConfig { limit: 2, ..SuggestionConfig::default() }.engine();
        assert_eq!(engine.limit(), 2);
    }
}
