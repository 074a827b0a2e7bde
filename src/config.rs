//! Source URL configuration.
//!
//! Each source has a built-in default URL which can be overridden, in
//! increasing order of precedence, by a TOML secrets file, by environment
//! variables, and by the caller (CLI flags). Keys are the same everywhere:
//! `URL_CO2`, `URL_ENERGY`, `URL_GDP`, `URL_DISASTER`, `URL_TEMP`.
//!
//! ```toml
//! # secrets.toml
//! URL_CO2 = "https://example.org/co2_pcap_cons.csv"
//! URL_TEMP = "/data/temperature.xlsx"
//! ```

use crate::models::SourceId;
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Credit line shown next to the resolved source list.
pub const ATTRIBUTION: &str = "Data sources: Gapminder / World Bank / EM-DAT";

const RAW_BASE: &str = "https://raw.githubusercontent.com/williamgege/Envecon-105-data/main";

/// One URL (or local path) per source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUrls {
    pub co2: String,
    pub energy: String,
    pub gdp: String,
    pub disaster: String,
    pub temperature: String,
}

impl Default for SourceUrls {
    fn default() -> Self {
        Self {
            co2: format!("{RAW_BASE}/co2_pcap_cons.csv"),
            energy: format!("{RAW_BASE}/EnergyUse.csv"),
            gdp: format!("{RAW_BASE}/GDP.csv"),
            disaster: format!("{RAW_BASE}/NaturalDisaster.xlsx"),
            temperature: format!("{RAW_BASE}/temperature.xlsx"),
        }
    }
}

/// Keys recognized in a secrets file. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct Secrets {
    #[serde(rename = "URL_CO2")]
    co2: Option<String>,
    #[serde(rename = "URL_ENERGY")]
    energy: Option<String>,
    #[serde(rename = "URL_GDP")]
    gdp: Option<String>,
    #[serde(rename = "URL_DISASTER")]
    disaster: Option<String>,
    #[serde(rename = "URL_TEMP")]
    temperature: Option<String>,
}

impl SourceUrls {
    /// `(source, location)` pairs in reporting order.
    pub fn entries(&self) -> impl Iterator<Item = (SourceId, &str)> {
        SourceId::ALL.into_iter().map(move |id| (id, self.get(id)))
    }

    pub fn get(&self, id: SourceId) -> &str {
        match id {
            SourceId::Co2 => &self.co2,
            SourceId::Energy => &self.energy,
            SourceId::Gdp => &self.gdp,
            SourceId::Disaster => &self.disaster,
            SourceId::Temperature => &self.temperature,
        }
    }

    pub fn set(&mut self, id: SourceId, url: impl Into<String>) {
        let slot = match id {
            SourceId::Co2 => &mut self.co2,
            SourceId::Energy => &mut self.energy,
            SourceId::Gdp => &mut self.gdp,
            SourceId::Disaster => &mut self.disaster,
            SourceId::Temperature => &mut self.temperature,
        };
        *slot = url.into();
    }

    /// Override from the contents of a TOML secrets file.
    pub fn apply_secrets_str(&mut self, text: &str) -> Result<()> {
        let secrets: Secrets = toml::from_str(text).context("parse secrets")?;
        let pairs = [
            (SourceId::Co2, secrets.co2),
            (SourceId::Energy, secrets.energy),
            (SourceId::Gdp, secrets.gdp),
            (SourceId::Disaster, secrets.disaster),
            (SourceId::Temperature, secrets.temperature),
        ];
        for (id, value) in pairs {
            if let Some(url) = value.filter(|u| !u.trim().is_empty()) {
                self.set(id, url);
            }
        }
        Ok(())
    }

    /// Override from a secrets file. Returns `false` when the file does not exist.
    pub fn apply_secrets_file(&mut self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read secrets file {}", path.display()))?;
        self.apply_secrets_str(&text)
            .with_context(|| format!("in {}", path.display()))?;
        debug!("applied secrets from {}", path.display());
        Ok(true)
    }

    /// Override from a key lookup (the environment, in production).
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for id in SourceId::ALL {
            if let Some(url) = lookup(id.config_key()).filter(|u| !u.trim().is_empty()) {
                self.set(id, url);
            }
        }
    }

    pub fn apply_env(&mut self) {
        self.apply_env_with(|k| std::env::var(k).ok());
    }

    /// Defaults, then the secrets file (explicit path or the default location),
    /// then environment variables.
    pub fn resolve(secrets: Option<&Path>) -> Result<Self> {
        let mut urls = Self::default();
        match secrets {
            Some(path) => {
                if !urls.apply_secrets_file(path)? {
                    anyhow::bail!("secrets file {} not found", path.display());
                }
            }
            None => {
                if let Some(path) = default_secrets_path() {
                    urls.apply_secrets_file(&path)?;
                }
            }
        }
        urls.apply_env();
        Ok(urls)
    }
}

/// `<user config dir>/envdash/secrets.toml`, when a config dir exists.
pub fn default_secrets_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("envdash").join("secrets.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn entries_follow_reporting_order() {
        let mut urls = SourceUrls::default();
        urls.set(SourceId::Temperature, "/data/t.xlsx");
        let entries: Vec<(SourceId, &str)> = urls.entries().collect();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].0, SourceId::Co2);
        assert_eq!(entries[4], (SourceId::Temperature, "/data/t.xlsx"));
    }

    #[test]
    fn defaults_point_at_raw_files() {
        let u = SourceUrls::default();
        assert!(u.co2.ends_with("co2_pcap_cons.csv"));
        assert!(u.get(SourceId::Temperature).ends_with("temperature.xlsx"));
    }

    #[test]
    fn secrets_then_env_precedence() {
        let mut u = SourceUrls::default();
        u.apply_secrets_str(
            r#"
            URL_CO2 = "from-secrets.csv"
            URL_GDP = "gdp-secrets.csv"
            OTHER_KEY = "ignored"
            "#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [("URL_CO2", "from-env.csv"), ("URL_TEMP", "")].into();
        u.apply_env_with(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(u.co2, "from-env.csv");
        assert_eq!(u.gdp, "gdp-secrets.csv");
        // empty values never clear a URL
        assert_eq!(u.temperature, SourceUrls::default().temperature);
    }

    #[test]
    fn malformed_secrets_are_an_error() {
        let mut u = SourceUrls::default();
        assert!(u.apply_secrets_str("URL_CO2 = ").is_err());
    }

    #[test]
    fn missing_secrets_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut u = SourceUrls::default();
        assert!(!u.apply_secrets_file(&dir.path().join("nope.toml")).unwrap());
        assert!(SourceUrls::resolve(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn secrets_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("secrets.toml");
        std::fs::write(&p, "URL_ENERGY = \"energy.csv\"\n").unwrap();
        let mut u = SourceUrls::default();
        assert!(u.apply_secrets_file(&p).unwrap());
        assert_eq!(u.energy, "energy.csv");
    }
}
