//! Site configuration registry.
//!
//! Resolves the extraction rules for a source identifier and answers
//! whether a source is on the known-paywall list.

use std::collections::HashSet;

use crate::models::{Config, SiteConfig};

/// Registry mapping source identifiers to [`SiteConfig`]s.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    sites: Vec<SiteConfig>,
    fallback: SiteConfig,
    known_paywall: HashSet<String>,
}

impl SiteRegistry {
    /// Create a registry. `sites` order is the substring match order.
    pub fn new<I, S>(sites: Vec<SiteConfig>, known_paywall: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sites,
            fallback: SiteConfig::fallback(),
            known_paywall: known_paywall.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.sites.clone(), config.paywall.known_sources.clone())
    }

    /// Resolve rules for a source.
    ///
    /// Exact key first, then the first registered key contained in `source`,
    /// then the generic fallback.
    pub fn get_config(&self, source: &str) -> &SiteConfig {
        if let Some(site) = self.sites.iter().find(|site| site.key == source) {
            return site;
        }

        match self
            .sites
            .iter()
            .find(|site| !site.key.is_empty() && source.contains(site.key.as_str()))
        {
            Some(site) => {
                log::debug!("Source '{}' matched site config '{}'", source, site.key);
                site
            }
            None => &self.fallback,
        }
    }

    /// Exact membership in the known-paywall list.
    pub fn is_known_paywall_source(&self, source: &str) -> bool {
        self.known_paywall.contains(source)
    }

    pub fn sites(&self) -> &[SiteConfig] {
        &self.sites
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
