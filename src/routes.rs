//! Route derivation and classification.
//!
//! Every rendered document lives at `<root>/<path>/index.html`, where
//! `<path>` is the path component of the record's canonical URL with
//! leading and trailing slashes stripped. The root document (`/`) lands at
//! `<root>/index.html`.
//!
//! Classification maps a path onto the page-assembly strategy. The
//! predicates are ordered and the first match wins — a service whose route
//! also ends in the location suffix is still a service detail page. The
//! chain is deterministic and side-effect-free.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("not an absolute URL: `{url}` ({source})")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Which page-assembly strategy a route uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Home,
    ServicesIndex,
    ResourcesIndex,
    ServiceDetail,
    Location,
    Contact,
    Generic,
    Post,
    CategoryArchive,
}

/// Location pages follow the `<city>-nc/` slug convention.
const LOCATION_SUFFIX: &str = "-nc/";

/// Legacy path prefixes that were never migrated and must keep resolving
/// against the original host.
pub const EXCLUDED_PREFIXES: &[&str] = &["/wp-content", "/2016", "/feed"];

/// Path component of a canonical absolute URL.
pub fn url_path(link: &str) -> Result<String, RouteError> {
    let parsed = url::Url::parse(link).map_err(|source| RouteError::InvalidUrl {
        url: link.to_string(),
        source,
    })?;
    Ok(parsed.path().to_string())
}

/// Filesystem directory for a route; the document is `<dir>/index.html`.
pub fn output_dir(root: &Path, path: &str) -> PathBuf {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        root.to_path_buf()
    } else {
        root.join(trimmed)
    }
}

/// Classify a page path. First matching rule wins.
pub fn classify(path: &str, service_paths: &BTreeSet<String>) -> RouteKind {
    if path == "/" {
        return RouteKind::Home;
    }
    if path == "/services/" {
        return RouteKind::ServicesIndex;
    }
    if path == "/resources/" {
        return RouteKind::ResourcesIndex;
    }
    if service_paths.contains(path) {
        return RouteKind::ServiceDetail;
    }
    if path.ends_with(LOCATION_SUFFIX) || path == "/locations/" {
        return RouteKind::Location;
    }
    if path.contains("contact") || path.contains("request-an-appointment") {
        return RouteKind::Contact;
    }
    RouteKind::Generic
}

/// Rewrite a stored URL for use in chrome links (nav, footer).
///
/// Absolute URLs on the legacy host become site-relative paths unless their
/// path starts with an excluded prefix, in which case the fully-qualified
/// form is kept. Anything else passes through; an empty URL becomes `#`.
pub fn clean_url(raw: &str, base_url: &str) -> String {
    if raw.is_empty() {
        return "#".to_string();
    }
    if raw.starts_with(base_url) {
        if let Ok(parsed) = url::Url::parse(raw) {
            let path = parsed.path();
            if EXCLUDED_PREFIXES.iter().any(|p| path.starts_with(p)) {
                return raw.to_string();
            }
            return path.to_string();
        }
    }
    raw.to_string()
}
