//! `skugap.toml` loading and command-line overrides.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use skugap_model::{Period, Roster};
use skugap_normalize::LabelRules;
use skugap_source::{ColumnMap, SourceConfig};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = "skugap.toml";

/// Everything a report run needs besides the rows themselves.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    pub period: Option<Period>,
    pub roster: Roster,
    pub columns: ColumnMap,
    pub labels: LabelRules,
    pub source: SourceConfig,
}

/// Values given on the command line; each one replaces the file's.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub file: Option<PathBuf>,
    pub url: Option<String>,
    pub year: Option<i32>,
    pub month: Option<String>,
    pub roster: Vec<String>,
}

impl ReportConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file. A missing file is only an error when the path
    /// was given explicitly; otherwise built-in defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(path) => (path, true),
            None => (Path::new(DEFAULT_CONFIG), false),
        };

        if !explicit && !path.exists() {
            tracing::warn!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = Self::from_toml(&text)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        tracing::debug!(path = %path.display(), roster = config.roster.len(), "Loaded config");
        Ok(config)
    }

    pub fn apply(&mut self, overrides: Overrides) -> Result<()> {
        self.period = Some(resolve_period(
            self.period.take(),
            overrides.year,
            overrides.month.as_deref(),
        )?);

        if !overrides.roster.is_empty() {
            self.roster = Roster::new(overrides.roster);
        }

        // A file on the command line beats a configured URL and vice versa
        if let Some(file) = overrides.file {
            self.source.file = Some(file);
            self.source.url = None;
        } else if let Some(url) = overrides.url {
            self.source.url = Some(url);
            self.source.file = None;
        }

        Ok(())
    }
}

fn resolve_period(configured: Option<Period>, year: Option<i32>, month: Option<&str>) -> Result<Period> {
    match (configured, year, month) {
        (_, Some(year), Some(month)) => Ok(Period::new(year, month)),
        (Some(period), year, month) => Ok(Period::new(
            year.unwrap_or(period.year),
            month.unwrap_or(period.month.as_str()),
        )),
        (None, _, _) => bail!("No reporting period configured (set [period] or pass --year and --month)"),
    }
}
