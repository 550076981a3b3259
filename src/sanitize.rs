//! Legacy HTML sanitization.
//!
//! Page and post bodies arrive as raw CMS-exported HTML: shortcode tokens,
//! stray `<script>`/`<style>` blocks, absolute URLs pointing at the legacy
//! host, un-attributed images. [`Sanitizer::sanitize`] rewrites a body into
//! markup safe for direct embedding.
//!
//! The passes run in a fixed order because later ones assume earlier ones
//! already ran (URL rewriting expects repaired attribute values; the alt
//! pass expects the asset map to have settled final image URLs):
//!
//! 1. strip `[shortcode]` tokens
//! 2. remove `<script>`/`<style>` blocks
//! 3. repair attribute values starting with stray whitespace
//! 4. re-qualify `/feed/` links against the legacy host
//! 5. re-qualify un-migrated path prefixes (`/wp-content`, `/2016`)
//! 6. relativize remaining absolute legacy-host URLs
//! 7. apply the asset map (literal substring replacement)
//! 8. canonicalize the organization phone number
//! 9. synthesize `alt` text for images lacking one
//! 10. add `loading="lazy" decoding="async"` to images lacking `loading`
//!
//! Failure policy: malformed legacy markup degrades, it never aborts. A URL
//! that fails to parse in pass 6 is left exactly as written.

use crate::config::{AssetMap, AssetMapping, SiteConfig};
use crate::routes::EXCLUDED_PREFIXES;
use regex::Regex;
use std::sync::LazyLock;

static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]+\]").unwrap());
static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").unwrap());
static STYLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<style.*?</style>").unwrap());
static ATTR_WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(href|src)=["']\s+/"#).unwrap());
static FEED_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)href=["']/feed/["']"#).unwrap());
static LEGACY_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)(href|src)=["'](/(?:wp-content|2016)[^"']*)["']"#).unwrap());
static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<img\b[^>]*>").unwrap());
static ALT_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)\salt\s*="#).unwrap());
static LOADING_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\sloading\s*="#).unwrap());
static SRC_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\ssrc=["']([^"']+)["']"#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Remove all tags and trim. Used for highlight text, meta descriptions,
/// and excerpt derivation.
pub fn strip_tags(html: &str) -> String {
    TAG_RE.replace_all(html, "").trim().to_string()
}

/// Collapse runs of whitespace to single spaces.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compiled rewrite pipeline. Build once per run from the site config and
/// asset map, then apply to every body.
pub struct Sanitizer {
    base_url: String,
    display_phone: String,
    generic_alt: String,
    /// Absolute URLs on the legacy host, any attribute.
    legacy_abs_re: Regex,
    /// Textual variants of the configured phone number.
    phone_re: Regex,
    mappings: Vec<AssetMapping>,
}

impl Sanitizer {
    pub fn new(site: &SiteConfig, assets: &AssetMap) -> Self {
        let host = url::Url::parse(&site.base_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| site.base_url.trim_start_matches("https://").to_string());
        let legacy_abs_re = Regex::new(&format!(
            r#"(?i)(href|src)=["'](https?://{}[^"']*)["']"#,
            regex::escape(&host)
        ))
        .unwrap();

        let digits = site.phone_digits();
        let (area, mid, last) = (&digits[..3], &digits[3..6], &digits[6..]);
        let phone_re = Regex::new(&format!(
            r"\({area}\)\s*{mid}-{last}|{area}-{mid}-{last}|{area}\.{mid}\.{last}"
        ))
        .unwrap();

        Self {
            base_url: site.base_url.clone(),
            display_phone: site.phone.clone(),
            generic_alt: format!("{} community photo", site.name),
            legacy_abs_re,
            phone_re,
            mappings: assets.mappings.clone(),
        }
    }

    /// Run every pass, in order.
    pub fn sanitize(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        let out = SHORTCODE_RE.replace_all(html, "").into_owned();
        let out = SCRIPT_RE.replace_all(&out, "").into_owned();
        let out = STYLE_RE.replace_all(&out, "").into_owned();
        let out = ATTR_WS_RE.replace_all(&out, r#"${1}="/"#).into_owned();
        let out = self.absolutize_feed_links(&out);
        let out = self.absolutize_legacy_prefixes(&out);
        let out = self.relativize_legacy_urls(&out);
        let out = self.apply_asset_map(out);
        let out = self.canonicalize_phone(&out);
        let out = self.fill_missing_alt(&out);
        self.defer_image_loading(&out)
    }

    /// Rewrite a bare URL the way passes 5 and 7 treat one inside markup:
    /// re-qualify un-migrated prefixes against the legacy host, then apply
    /// the asset map. Used for image URLs pulled out of legacy content by
    /// the section extractor.
    pub fn rewrite_asset_url(&self, raw: &str) -> String {
        let mut out = if EXCLUDED_PREFIXES.iter().any(|p| raw.starts_with(p)) {
            format!("{}{}", self.base_url, raw)
        } else {
            raw.to_string()
        };
        for mapping in &self.mappings {
            out = out.replace(&mapping.remote, &mapping.local);
        }
        out
    }

    /// Feed URLs must stay resolvable independent of the new routing, so
    /// they are the one link kind rewritten *to* the legacy host.
    fn absolutize_feed_links(&self, html: &str) -> String {
        FEED_LINK_RE
            .replace_all(html, format!(r#"href="{}/feed/""#, self.base_url))
            .into_owned()
    }

    /// Media uploads and dated archive paths are not migrated; keep serving
    /// them from the original host.
    fn absolutize_legacy_prefixes(&self, html: &str) -> String {
        LEGACY_PREFIX_RE
            .replace_all(html, |caps: &regex::Captures| {
                format!(r#"{}="{}{}""#, &caps[1], self.base_url, &caps[2])
            })
            .into_owned()
    }

    /// Remaining absolute legacy-host URLs become site-relative paths,
    /// except the excluded prefixes, which keep their fully-qualified form.
    /// An unparseable URL passes through unchanged.
    fn relativize_legacy_urls(&self, html: &str) -> String {
        self.legacy_abs_re
            .replace_all(html, |caps: &regex::Captures| {
                let attr = &caps[1];
                let raw = &caps[2];
                match url::Url::parse(raw) {
                    Ok(parsed) => {
                        let path = parsed.path();
                        if EXCLUDED_PREFIXES.iter().any(|p| path.starts_with(p)) {
                            format!(r#"{attr}="{raw}""#)
                        } else {
                            format!(r#"{attr}="{path}""#)
                        }
                    }
                    Err(_) => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    /// Literal, order-preserving substring replacement. Deliberately not
    /// URL-aware: the remote fragment is the exact text form of the CMS
    /// export.
    fn apply_asset_map(&self, html: String) -> String {
        let mut out = html;
        for mapping in &self.mappings {
            out = out.replace(&mapping.remote, &mapping.local);
        }
        out
    }

    /// `(XXX) XXX-XXXX`, `XXX-XXX-XXXX`, and `XXX.XXX.XXXX` all collapse to
    /// the configured display format.
    fn canonicalize_phone(&self, html: &str) -> String {
        self.phone_re
            .replace_all(html, self.display_phone.as_str())
            .into_owned()
    }

    fn fill_missing_alt(&self, html: &str) -> String {
        IMG_TAG_RE
            .replace_all(html, |caps: &regex::Captures| {
                let tag = &caps[0];
                if ALT_ATTR_RE.is_match(tag) {
                    return tag.to_string();
                }
                let derived = SRC_ATTR_RE
                    .captures(tag)
                    .map(|c| alt_from_src(&c[1]))
                    .filter(|alt| !alt.is_empty())
                    .unwrap_or_else(|| self.generic_alt.clone());
                inject_attr(tag, &format!(r#"alt="{derived}""#))
            })
            .into_owned()
    }

    fn defer_image_loading(&self, html: &str) -> String {
        IMG_TAG_RE
            .replace_all(html, |caps: &regex::Captures| {
                let tag = &caps[0];
                if LOADING_ATTR_RE.is_match(tag) {
                    return tag.to_string();
                }
                inject_attr(tag, r#"loading="lazy" decoding="async""#)
            })
            .into_owned()
    }
}

/// Human-readable text from an image URL: last path segment, extension
/// stripped, separators to spaces, each word title-cased. Non-alphanumeric
/// characters are dropped, so the result is always attribute-safe.
fn alt_from_src(src: &str) -> String {
    let name = src.rsplit('/').next().unwrap_or(src);
    let name = name.split(['?', '#']).next().unwrap_or(name);
    let stem = match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    };
    let mut words: Vec<String> = Vec::new();
    for word in stem.split(|c: char| !c.is_ascii_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let mut chars = word.chars();
        let first = chars.next().unwrap().to_ascii_uppercase();
        words.push(format!("{first}{}", chars.as_str()));
    }
    words.join(" ")
}

/// Insert an attribute before the tag's closing delimiter, handling both
/// `>` and `/>` forms.
fn inject_attr(tag: &str, attr: &str) -> String {
    if let Some(stripped) = tag.strip_suffix("/>") {
        format!("{} {attr}/>", stripped.trim_end())
    } else if let Some(stripped) = tag.strip_suffix('>') {
        format!("{} {attr}>", stripped.trim_end())
    } else {
        tag.to_string()
    }
}
