//! Site configuration and asset map loading.
//!
//! Site-wide constants (organization name, phone numbers, contact URL, the
//! legacy domain) live in `data/site.json`. Two optional companions refine a
//! build:
//!
//! ```text
//! data/
//! ├── site.json        # required — SiteConfig
//! ├── site.local.json  # optional — field-wise overrides for SiteConfig
//! └── asset-map.json   # optional — legacy media URL → local path substitutions
//! ```
//!
//! ## site.json
//!
//! ```json
//! {
//!   "name": "Stepping Stones",
//!   "legalName": "Stepping Stones Community Resources, Inc.",
//!   "phone": "(910) 484-0176",
//!   "phoneTel": "+19104840176",
//!   "contactUrl": "/request-an-appointment/",
//!   "baseUrl": "https://steppingstonescri.net",
//!   "allowedServiceSlugs": ["recovery-services", "clinical-services"]
//! }
//! ```
//!
//! All fields have defaults, so a sparse file overrides only what it names.
//! Unknown keys are rejected to catch typos early.
//!
//! ## asset-map.json
//!
//! An ordered list of literal substitutions applied to every sanitized body.
//! The `remote` value must be the exact text form the CMS export uses — the
//! replacement is a plain substring match, not URL-aware.
//!
//! ```json
//! [
//!   { "remote": "https://cdn.example.com/uploads/logo.png",
//!     "local": "/assets/images/logo.png" }
//! ]
//! ```
//!
//! A missing optional file falls back to the documented default (empty map,
//! no overrides) rather than failing the build.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {file}: {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },
    #[error("JSON parse error in {file}: {source}")]
    Json {
        file: String,
        source: serde_json::Error,
    },
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site-wide constants for the duration of a build.
///
/// Loaded once and threaded explicitly through the pipeline — there is no
/// ambient global configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SiteConfig {
    /// Short display name used in the header logo and section copy.
    pub name: String,
    /// Full legal name. Also the needle that identifies the home-page lead
    /// block during section extraction.
    pub legal_name: String,
    /// Canonical display form of the organization phone number.
    pub phone: String,
    /// Tel-scheme form of the same number, used for `tel:` CTA links.
    pub phone_tel: String,
    /// URL of the appointment-request page, used by every CTA band.
    pub contact_url: String,
    /// The legacy domain. Absolute URLs on this host are relativized during
    /// sanitization, and sitemap/canonical URLs are built against it.
    pub base_url: String,
    /// Allow-list of service slugs surfaced on navigation-facing listings
    /// (home slider, services grid), in display order.
    pub allowed_service_slugs: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Stepping Stones".to_string(),
            legal_name: "Stepping Stones Community Resources, Inc.".to_string(),
            phone: "(910) 484-0176".to_string(),
            phone_tel: "+19104840176".to_string(),
            contact_url: "/request-an-appointment/".to_string(),
            base_url: "https://steppingstonescri.net".to_string(),
            allowed_service_slugs: vec![
                "recovery-services".to_string(),
                "clinical-services".to_string(),
                "wellness-programs".to_string(),
                "peer-support".to_string(),
                "housing-assistance".to_string(),
            ],
        }
    }
}

/// Field-wise override applied on top of `site.json` from `site.local.json`.
///
/// Every field is optional; only present fields replace the base value.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
struct SiteConfigOverride {
    name: Option<String>,
    legal_name: Option<String>,
    phone: Option<String>,
    phone_tel: Option<String>,
    contact_url: Option<String>,
    base_url: Option<String>,
    allowed_service_slugs: Option<Vec<String>>,
}

impl SiteConfig {
    /// Load `site.json` from the data directory and apply `site.local.json`
    /// overrides if present.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: SiteConfig = read_json(&data_dir.join("site.json"))?;

        let local = data_dir.join("site.local.json");
        if local.exists() {
            let overrides: SiteConfigOverride = read_json(&local)?;
            config.apply(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    fn apply(&mut self, overrides: SiteConfigOverride) {
        if let Some(v) = overrides.name {
            self.name = v;
        }
        if let Some(v) = overrides.legal_name {
            self.legal_name = v;
        }
        if let Some(v) = overrides.phone {
            self.phone = v;
        }
        if let Some(v) = overrides.phone_tel {
            self.phone_tel = v;
        }
        if let Some(v) = overrides.contact_url {
            self.contact_url = v;
        }
        if let Some(v) = overrides.base_url {
            self.base_url = v;
        }
        if let Some(v) = overrides.allowed_service_slugs {
            self.allowed_service_slugs = v;
        }
    }

    /// Validate config values the pipeline depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::Validation(format!(
                "baseUrl must be an absolute URL, got `{}`",
                self.base_url
            )));
        }
        let digits: String = self
            .phone_tel
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.len() < 10 {
            return Err(ConfigError::Validation(format!(
                "phoneTel must contain at least 10 digits, got `{}`",
                self.phone_tel
            )));
        }
        Ok(())
    }

    /// The ten significant digits of the organization phone number,
    /// country code stripped.
    pub fn phone_digits(&self) -> String {
        let digits: String = self
            .phone_tel
            .chars()
            .filter(|c| c.is_ascii_digit())
            .collect();
        if digits.len() == 11 && digits.starts_with('1') {
            digits[1..].to_string()
        } else {
            digits
        }
    }
}

/// One legacy-URL-to-local-path substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AssetMapping {
    /// Literal text form of the remote URL as it appears in the CMS export.
    pub remote: String,
    /// Local replacement path, typically under `/assets/`.
    pub local: String,
}

/// Ordered substitution table from `asset-map.json`.
#[derive(Debug, Clone, Default)]
pub struct AssetMap {
    pub mappings: Vec<AssetMapping>,
}

impl AssetMap {
    /// Load `asset-map.json` if present; an absent file is an empty map.
    pub fn load(data_dir: &Path) -> Result<Self, ConfigError> {
        let path = data_dir.join("asset-map.json");
        if !path.exists() {
            return Ok(Self::default());
        }
        let mappings: Vec<AssetMapping> = read_json(&path)?;
        Ok(Self { mappings })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let file = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        file: file.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Json { file, source })
}
