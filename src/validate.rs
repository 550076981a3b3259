//! Post-build output validation.
//!
//! Two independent checkers walk the rendered tree:
//!
//! - [`check_links`] — every relative `href`/`src` must resolve to an
//!   existing file or a directory containing `index.html`
//! - [`check_output`] — every page must carry a title, meta description,
//!   canonical link, and a `tel:` phone CTA; every image needs alt text.
//!   External and legacy-looking image references and oversized assets are
//!   reported as warnings.
//!
//! Both produce itemized reports; the CLI prints them and exits non-zero on
//! failures. Nothing is rolled back — the output tree is left in place for
//! inspection.

use crate::config::SiteConfig;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

static LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href="([^"]+)"|src="([^"]+)""#).unwrap());
static EXTERNAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(https?:|mailto:|tel:|skype:)").unwrap());
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<title>[^<]+</title>").unwrap());
static META_DESC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<meta name="description" content="[^"]+"\s*/?>"#).unwrap());
static CANONICAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<link rel="canonical" href="[^"]+"\s*/?>"#).unwrap());
static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());
static ALT_IN_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)\salt=["']"#).unwrap());
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<img\b[^>]*src=["']([^"']+)["'][^>]*>"#).unwrap());
static CSS_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)url\(['"]?(https?:[^'")]+)['"]?\)"#).unwrap());
static SUSPICIOUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)wp-content|timthumb").unwrap());
static IMAGE_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(png|jpe?g|gif|svg|webp|avif)$").unwrap());

/// Images above this size are worth a warning.
const LARGE_IMAGE_KB: u64 = 500;

/// One flagged location: output-relative file plus the offending detail.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub file: String,
    pub detail: String,
}

impl Issue {
    fn new(dist: &Path, file: &Path, detail: impl Into<String>) -> Self {
        Self {
            file: relative_name(dist, file),
            detail: detail.into(),
        }
    }
}

fn relative_name(dist: &Path, file: &Path) -> String {
    file.strip_prefix(dist)
        .unwrap_or(file)
        .display()
        .to_string()
}

fn html_files(dist: &Path) -> Result<Vec<PathBuf>, ValidateError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dist) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "html")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    Ok(files)
}

// ============================================================================
// Link checking
// ============================================================================

#[derive(Debug, Default)]
pub struct LinkReport {
    pub broken: Vec<Issue>,
}

impl LinkReport {
    pub fn is_ok(&self) -> bool {
        self.broken.is_empty()
    }

    pub fn failures(&self) -> Vec<String> {
        self.broken
            .iter()
            .map(|issue| format!("- {}: {}", issue.file, issue.detail))
            .collect()
    }
}

/// Walk every rendered page and verify its relative references resolve.
pub fn check_links(dist: &Path) -> Result<LinkReport, ValidateError> {
    let mut report = LinkReport::default();
    for file in html_files(dist)? {
        let html = fs::read_to_string(&file)?;
        let current_dir = file.parent().unwrap_or(dist);
        for caps in LINK_RE.captures_iter(&html) {
            let url = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            if url.is_empty() || is_external(url) {
                continue;
            }
            let Some(target) = normalize(url, current_dir, dist) else {
                continue;
            };
            if !resolves(&target) {
                report.broken.push(Issue::new(dist, &file, url));
            }
        }
    }
    Ok(report)
}

fn is_external(url: &str) -> bool {
    EXTERNAL_RE.is_match(url) || url.starts_with("//")
}

/// Strip fragment and query, then anchor the path: site-absolute against
/// the output root, otherwise against the current page's directory.
/// Fragment-only and `javascript:` references are unchecked.
fn normalize(url: &str, current_dir: &Path, dist: &Path) -> Option<PathBuf> {
    if url.starts_with('#') || url.starts_with("javascript:") {
        return None;
    }
    let clean = url.split(['#', '?']).next().unwrap_or(url);
    if let Some(site_absolute) = clean.strip_prefix('/') {
        Some(dist.join(site_absolute.trim_end_matches('/')))
    } else {
        Some(current_dir.join(clean.trim_end_matches('/')))
    }
}

/// A reference resolves if it is a file, or a directory (explicit or
/// extensionless) containing an index document.
fn resolves(target: &Path) -> bool {
    if target.is_file() {
        return true;
    }
    if target.is_dir() {
        return target.join("index.html").is_file();
    }
    if target.extension().is_none() {
        return target.join("index.html").is_file();
    }
    false
}

// ============================================================================
// QA checking
// ============================================================================

#[derive(Debug, Default)]
pub struct QaReport {
    pub missing_title: Vec<String>,
    pub missing_description: Vec<String>,
    pub missing_canonical: Vec<String>,
    pub missing_phone_cta: Vec<String>,
    pub missing_alt: Vec<Issue>,
    pub external_images: Vec<Issue>,
    pub suspicious_images: Vec<Issue>,
    pub large_images: Vec<Issue>,
    pub sitemap_exists: bool,
    pub robots_exists: bool,
}

impl QaReport {
    pub fn is_ok(&self) -> bool {
        self.failures().is_empty()
    }

    /// Hard failures: metadata, alt text, external images, missing
    /// sitemap/robots.
    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut named = |label: &str, files: &[String]| {
            for file in files {
                out.push(format!("- {label}: {file}"));
            }
        };
        named("missing <title>", &self.missing_title);
        named("missing meta description", &self.missing_description);
        named("missing canonical", &self.missing_canonical);
        named("missing phone CTA (tel link)", &self.missing_phone_cta);
        for issue in &self.missing_alt {
            out.push(format!("- image missing alt in {}: {}", issue.file, issue.detail));
        }
        for issue in &self.external_images {
            out.push(format!("- external image in {}: {}", issue.file, issue.detail));
        }
        if !self.sitemap_exists {
            out.push("- missing sitemap.xml".to_string());
        }
        if !self.robots_exists {
            out.push("- missing robots.txt".to_string());
        }
        out
    }

    /// Soft findings: legacy-looking and oversized images.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for issue in &self.suspicious_images {
            out.push(format!("- suspicious image URL in {}: {}", issue.file, issue.detail));
        }
        for issue in &self.large_images {
            out.push(format!("- large image {}: {}", issue.file, issue.detail));
        }
        out
    }
}

/// Assert the rendered tree's page-level invariants.
pub fn check_output(dist: &Path, site: &SiteConfig) -> Result<QaReport, ValidateError> {
    let mut report = QaReport {
        sitemap_exists: dist.join("sitemap.xml").is_file(),
        robots_exists: dist.join("robots.txt").is_file(),
        ..QaReport::default()
    };
    let phone_needle = format!("tel:{}", site.phone_tel);

    for file in html_files(dist)? {
        let html = fs::read_to_string(&file)?;
        let name = relative_name(dist, &file);

        if !TITLE_RE.is_match(&html) {
            report.missing_title.push(name.clone());
        }
        if !META_DESC_RE.is_match(&html) {
            report.missing_description.push(name.clone());
        }
        if !CANONICAL_RE.is_match(&html) {
            report.missing_canonical.push(name.clone());
        }
        if !html.contains(&phone_needle) {
            report.missing_phone_cta.push(name.clone());
        }

        for tag in IMG_TAG_RE.find_iter(&html) {
            if !ALT_IN_TAG_RE.is_match(tag.as_str()) {
                report.missing_alt.push(Issue::new(dist, &file, tag.as_str()));
            }
        }

        for caps in IMG_SRC_RE.captures_iter(&html) {
            let src = &caps[1];
            if src.starts_with("http") && !src.starts_with(&site.base_url) {
                report.external_images.push(Issue::new(dist, &file, src));
            }
            if SUSPICIOUS_RE.is_match(src) {
                report.suspicious_images.push(Issue::new(dist, &file, src));
            }
        }
        for caps in CSS_URL_RE.captures_iter(&html) {
            let src = &caps[1];
            if !src.starts_with(&site.base_url) {
                report.external_images.push(Issue::new(dist, &file, src));
            }
        }
    }

    let assets_dir = dist.join("assets");
    if assets_dir.is_dir() {
        for entry in WalkDir::new(&assets_dir) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !IMAGE_EXT_RE.is_match(&path.display().to_string()) {
                continue;
            }
            let size_kb = entry.metadata()?.len() / 1024;
            if size_kb > LARGE_IMAGE_KB {
                report
                    .large_images
                    .push(Issue::new(dist, path, format!("{size_kb} KB")));
            }
        }
    }

    Ok(report)
}
