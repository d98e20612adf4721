use crate::core::{CmsError, Result};
use crate::locale::LocaleConfig;
use crate::registry::DEFAULT_MAX_VERSIONS;
use std::env;

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CmsConfig {
    pub locales: LocaleConfig,
    /// Page size used when a listing does not ask for one
    pub default_page_limit: usize,
    /// Upper bound on any requested page size
    pub max_page_limit: usize,
    /// Retention for collections that do not set `max_versions`
    pub default_max_versions: u32,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            locales: LocaleConfig::default(),
            default_page_limit: 10,
            max_page_limit: 100,
            default_max_versions: DEFAULT_MAX_VERSIONS,
        }
    }
}

impl CmsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn locales(mut self, locales: LocaleConfig) -> Self {
        self.locales = locales;
        self
    }

    pub fn default_page_limit(mut self, limit: usize) -> Self {
        self.default_page_limit = limit;
        self
    }

    pub fn max_page_limit(mut self, limit: usize) -> Self {
        self.max_page_limit = limit;
        self
    }

    pub fn default_max_versions(mut self, max: u32) -> Self {
        self.default_max_versions = max;
        self
    }

    /// Reads `VERTEX_DEFAULT_LOCALE`, `VERTEX_LOCALES`, `VERTEX_PAGE_LIMIT`,
    /// `VERTEX_MAX_PAGE_LIMIT` and `VERTEX_MAX_VERSIONS`, falling back to the
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let supported: Vec<String> = match lookup("VERTEX_LOCALES") {
            Some(raw) => raw
                .split(',')
                .map(|code| code.trim().to_string())
                .filter(|code| !code.is_empty())
                .collect(),
            None => defaults.locales.supported.clone(),
        };
        let default_locale = lookup("VERTEX_DEFAULT_LOCALE")
            .unwrap_or_else(|| defaults.locales.default_locale.clone());

        let mut locales = LocaleConfig::new(default_locale, supported);
        for code in &locales.supported.clone() {
            if let Some(name) = defaults.locales.names.get(code) {
                locales = locales.with_name(code.clone(), name.clone());
            }
        }

        let config = Self {
            locales,
            default_page_limit: parse_var(&lookup, "VERTEX_PAGE_LIMIT", defaults.default_page_limit)?,
            max_page_limit: parse_var(&lookup, "VERTEX_MAX_PAGE_LIMIT", defaults.max_page_limit)?,
            default_max_versions: parse_var(
                &lookup,
                "VERTEX_MAX_VERSIONS",
                defaults.default_max_versions,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.locales.supported.is_empty() {
            return Err(CmsError::configuration("at least one locale must be supported"));
        }
        if !self.locales.is_supported(&self.locales.default_locale) {
            return Err(CmsError::configuration(format!(
                "default locale '{}' is not in the supported list",
                self.locales.default_locale
            )));
        }
        if self.default_page_limit == 0 || self.max_page_limit == 0 {
            return Err(CmsError::configuration("page limits must be > 0"));
        }
        if self.default_page_limit > self.max_page_limit {
            return Err(CmsError::configuration(
                "default page limit cannot exceed the maximum",
            ));
        }
        if self.default_max_versions == 0 {
            return Err(CmsError::configuration("default max versions must be > 0"));
        }
        Ok(())
    }

    /// Page size for a request: missing or zero means the default, anything
    /// above the maximum is capped.
    /// Never returns 0, even for a configuration that skipped `validate`.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        let max = self.max_page_limit.max(1);
        match requested {
            None | Some(0) => self.default_page_limit.clamp(1, max),
            Some(limit) => limit.min(max),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| CmsError::configuration(format!("invalid {}='{}'", key, raw))),
    }
}
