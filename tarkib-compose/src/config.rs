//! Service declarations read from configuration.
//!
//! The `Services` section maps service type names to an optional
//! implementation type (`Type`) and lifetime (`Mode`):
//!
//! ```toml
//! [Services.ICalculator]
//! Type = "DefaultCalculator"
//! Mode = "Transient"
//!
//! [Services.IPrinter]
//! Mode = "Singleton"
//! ```
//!
//! [`ConfigLoader`] reads the section from a TOML file merged with
//! environment variables, e.g. `TARKIB_Services__IPrinter__Mode=Scoped`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use figment::value::Value;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::Result;

/// Name of the configuration section holding service declarations.
pub const SERVICES_SECTION: &str = "Services";

/// Default prefix of environment variables read by [`ConfigLoader`].
pub const CONFIG_ENV_PREFIX: &str = "TARKIB";

/// One child of the `Services` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServiceEntry {
    /// Implementation type name.
    #[serde(rename = "Type", alias = "type")]
    implementation: Option<String>,
    /// Lifetime token. Kept raw so that unknown values fall back to transient.
    #[serde(rename = "Mode", alias = "mode")]
    mode: Option<Value>,
}

impl ServiceEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_implementation(mut self, name: impl Into<String>) -> Self {
        self.implementation = Some(name.into());
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(Value::from(mode.into()));
        self
    }

    /// The implementation type name; an empty value counts as absent.
    pub fn implementation(&self) -> Option<&str> {
        self.implementation
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// The lifetime token, if it is a string.
    pub fn mode(&self) -> Option<&str> {
        self.mode.as_ref().and_then(Value::as_str)
    }
}

/// The `Services` section: service type name to entry, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ServicesSection {
    entries: BTreeMap<String, ServiceEntry>,
}

impl ServicesSection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts `section` from `figment`. A missing section is empty.
    pub fn from_figment(figment: &Figment, section: &str) -> Result<Self> {
        if !figment.contains(section) {
            debug!(section, "No service section in configuration");
            return Ok(Self::default());
        }
        Ok(figment.extract_inner(section)?)
    }

    /// Parses the `Services` section of a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_figment(&Figment::from(Toml::string(toml)), SERVICES_SECTION)
    }

    /// Adds or replaces the entry for `service`.
    pub fn insert(&mut self, service: impl Into<String>, entry: ServiceEntry) -> &mut Self {
        self.entries.insert(service.into(), entry);
        self
    }

    /// Entries in enumeration order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ServiceEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn get(&self, service: &str) -> Option<&ServiceEntry> {
        self.entries.get(service)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Loads the services section from a TOML file and the environment.
///
/// Environment variables override the file. Nested keys are separated
/// by `__` and keep their case: `TARKIB_Services__ICalculator__Type`.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_prefix: String,
    section: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            config_path: None,
            env_prefix: CONFIG_ENV_PREFIX.to_string(),
            section: SERVICES_SECTION.to_string(),
        }
    }

    pub fn with_config_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn with_section<S: Into<String>>(mut self, section: S) -> Self {
        self.section = section.into();
        self
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// The merged configuration sources.
    pub fn figment(&self) -> Figment {
        let mut figment = Figment::new();

        if let Some(path) = &self.config_path {
            if path.exists() {
                debug!(path = %path.display(), "Loading service configuration file");
                figment = figment.merge(Toml::file(path));
            } else {
                warn!(path = %path.display(), "Service configuration file not found");
            }
        }

        figment.merge(
            Env::prefixed(&format!("{}_", self.env_prefix))
                .split("__")
                .lowercase(false),
        )
    }

    /// Reads the services section.
    pub fn load(&self) -> Result<ServicesSection> {
        let section = ServicesSection::from_figment(&self.figment(), &self.section)?;
        debug!(services = section.len(), "Service configuration loaded");
        Ok(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_type_and_mode() {
        let section = ServicesSection::from_toml_str(
            r#"
            [Services.ICalculator]
            Type = "DefaultCalculator"
            Mode = "Transient"

            [Services.IPrinter]
            mode = "singleton"
            "#,
        )
        .unwrap();

        let calculator = section.get("ICalculator").unwrap();
        assert_eq!(calculator.implementation(), Some("DefaultCalculator"));
        assert_eq!(calculator.mode(), Some("Transient"));

        let printer = section.get("IPrinter").unwrap();
        assert_eq!(printer.implementation(), None);
        assert_eq!(printer.mode(), Some("singleton"));
    }

    #[test]
    fn entries_are_ordered_by_name() {
        let section = ServicesSection::from_toml_str(
            r#"
            [Services.Zeta]
            [Services.Alpha]
            [Services.Mid]
            "#,
        )
        .unwrap();

        let names: Vec<&str> = section.entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);
    }

    #[test]
    fn empty_type_counts_as_absent() {
        let entry = ServiceEntry::new().with_implementation("  ");
        assert_eq!(entry.implementation(), None);
    }

    #[test]
    fn non_string_mode_is_ignored() {
        let section = ServicesSection::from_toml_str(
            r#"
            [Services.IPrinter]
            Mode = 3
            "#,
        )
        .unwrap();
        assert_eq!(section.get("IPrinter").unwrap().mode(), None);
    }

    #[test]
    fn missing_section_is_empty() {
        let section = ServicesSection::from_toml_str("[Logging]\nlevel = \"debug\"").unwrap();
        assert!(section.is_empty());
    }

    #[test]
    fn malformed_section_is_an_error() {
        let result = ServicesSection::from_toml_str("Services = 5");
        assert!(result.is_err());
    }

    #[test]
    fn loader_merges_file_and_environment() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "tarkib.toml",
                r#"
                [Services.ICalculator]
                Type = "DefaultCalculator"
                Mode = "Transient"
                "#,
            )?;
            jail.set_env("TARKIB_Services__ICalculator__Mode", "Singleton");
            jail.set_env("TARKIB_Services__IPrinter__Type", "ConsolePrinter");

            let section = ConfigLoader::new()
                .with_config_path("tarkib.toml")
                .load()
                .map_err(|err| err.to_string())?;

            let calculator = section.get("ICalculator").unwrap();
            assert_eq!(calculator.implementation(), Some("DefaultCalculator"));
            assert_eq!(calculator.mode(), Some("Singleton"));
            assert_eq!(
                section.get("IPrinter").and_then(ServiceEntry::implementation),
                Some("ConsolePrinter")
            );
            Ok(())
        });
    }

    #[test]
    fn loader_without_sources_is_empty() {
        figment::Jail::expect_with(|_| {
            let section = ConfigLoader::new()
                .with_config_path("missing.toml")
                .load()
                .map_err(|err| err.to_string())?;
            assert!(section.is_empty());
            Ok(())
        });
    }
}
