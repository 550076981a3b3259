//! Home-page section extraction.
//!
//! The legacy home page is one authored blob. Rendering it as-is would keep
//! the old single-column layout, so the composer needs it decomposed into
//! structured sections it can re-render:
//!
//! - **lead** — the first callout-wrap container naming the organization,
//!   kept as HTML for the intro section
//! - **highlight** — the "You know you can" callout, reduced to plain text
//!   for the banner band
//! - **cards** — three feature cards, each `(image, title, text)`, located
//!   by their bolded titles
//! - **remaining** — whatever is left after extraction and cleanup
//!
//! Matching is pattern-based, not a structural HTML parse, and deliberately
//! tolerant: markup that doesn't match the expected shapes skips that
//! section rather than failing the build. [`extract_home_sections`] is a
//! pure function, exercised by golden-input tests below.

use crate::sanitize::{collapse_whitespace, strip_tags};
use regex::Regex;
use std::sync::LazyLock;

/// Card titles in display order. Collection order follows this list, not
/// document order.
pub const FEATURE_CARD_TITLES: [&str; 3] =
    ["Recovery Services", "Clinical Services", "Wellness Programs"];

/// Phrase identifying the highlight callout.
const HIGHLIGHT_PHRASE: &str = "You know you can";

static CALLOUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<div[^>]*class="[^"]*callout-wrap[^"]*"[^>]*>.*?</div>"#).unwrap()
});
static PARA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
static IMG_SRC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?is)<img[^>]*\ssrc=["']([^"']+)["'][^>]*>"#).unwrap());
static EMPTY_PARA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(?:\s|&nbsp;|<br[^>]*>)*</p>").unwrap());
static DIVIDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<(?:div|hr)[^>]*class="[^"]*divider[^"]*"[^>]*>(?:\s*</div>)?"#).unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCard {
    pub image: String,
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct HomeSections {
    /// Intro callout HTML, verbatim. Sanitized separately by the caller.
    pub lead: Option<String>,
    /// Banner text, tags stripped.
    pub highlight: Option<String>,
    /// Cards in [`FEATURE_CARD_TITLES`] order; missing cards are omitted.
    pub cards: Vec<FeatureCard>,
    /// Body content left over after extraction and cleanup.
    pub remaining: String,
}

/// Decompose the raw home-page blob. `legal_name` identifies the lead
/// callout.
pub fn extract_home_sections(raw: &str, legal_name: &str) -> HomeSections {
    let mut rest = raw.to_string();

    let lead = take_callout(&mut rest, |text| text.contains(legal_name));
    let highlight = take_callout(&mut rest, |text| text.contains(HIGHLIGHT_PHRASE))
        .map(|html| collapse_whitespace(&strip_tags(&html)));

    let cards = FEATURE_CARD_TITLES
        .iter()
        .filter_map(|title| take_card(&mut rest, title))
        .collect();

    cleanup_remnants(&mut rest);

    HomeSections {
        lead,
        highlight,
        cards,
        remaining: rest.trim().to_string(),
    }
}

/// Remove and return the first callout whose visible text satisfies the
/// predicate.
fn take_callout(rest: &mut String, pred: impl Fn(&str) -> bool) -> Option<String> {
    let range = CALLOUT_RE
        .find_iter(rest)
        .find(|m| pred(&strip_tags(m.as_str())))
        .map(|m| m.range())?;
    let html = rest[range.clone()].to_string();
    rest.replace_range(range, "");
    Some(html)
}

/// Locate one feature card by its bolded title and cut its markup out of
/// the remainder. Returns `None` (and removes nothing) when the title or
/// its preceding image cannot be found.
fn take_card(rest: &mut String, title: &str) -> Option<FeatureCard> {
    let bold_re = Regex::new(&format!(
        r"(?is)<(?:strong|b)\b[^>]*>\s*{}\s*</(?:strong|b)>",
        regex::escape(title)
    ))
    .unwrap();
    let bold = bold_re.find(rest)?;
    let (bold_start, bold_end) = (bold.start(), bold.end());

    // Nearest image above the title.
    let img = IMG_SRC_RE.captures_iter(&rest[..bold_start]).last()?;
    let image = img.get(1).unwrap().as_str().to_string();
    let img_span = img.get(0).unwrap().range();

    // Descriptive text: the rest of the title's paragraph if it carries
    // visible text, otherwise the next full paragraph.
    let after = &rest[bold_end..];
    let (text, text_end_rel) = match after.find("</p>") {
        Some(close) => {
            let inline = collapse_whitespace(&strip_tags(&after[..close]));
            if !inline.is_empty() {
                (inline, close + "</p>".len())
            } else if let Some(caps) = PARA_RE.captures(&after[close + "</p>".len()..]) {
                let whole = caps.get(0).unwrap();
                (
                    collapse_whitespace(&strip_tags(&caps[1])),
                    close + "</p>".len() + whole.end(),
                )
            } else {
                (String::new(), close + "</p>".len())
            }
        }
        None => (String::new(), 0),
    };
    let region_end = bold_end + text_end_rel;

    // Reach back to the opening of the paragraph holding the title, unless
    // that paragraph already closed before the title.
    let region_start = match rest[..bold_start].rfind("<p") {
        Some(p) if !rest[p..bold_start].contains("</p>") => p,
        _ => bold_start,
    };

    if img_span.end <= region_start {
        rest.replace_range(region_start..region_end, "");
        rest.replace_range(img_span, "");
    } else {
        // Image sits inside the removed paragraph region.
        rest.replace_range(region_start..region_end, "");
    }

    Some(FeatureCard {
        image,
        title: title.to_string(),
        text,
    })
}

/// Drop emptied legacy wrappers: preview-promo callouts, layout dividers,
/// and paragraphs holding nothing but whitespace or clearing breaks.
fn cleanup_remnants(rest: &mut String) {
    loop {
        let range = CALLOUT_RE
            .find_iter(rest)
            .find(|m| m.as_str().to_ascii_lowercase().contains("preview"))
            .map(|m| m.range());
        match range {
            Some(r) => rest.replace_range(r, ""),
            None => break,
        }
    }
    *rest = DIVIDER_RE.replace_all(rest, "").into_owned();
    *rest = EMPTY_PARA_RE.replace_all(rest, "").into_owned();
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGAL_NAME: &str = "Stepping Stones Community Resources, Inc.";

    /// A representative legacy home-page export.
    fn golden_input() -> String {
        concat!(
            r#"<div class="callout-wrap"><p>Welcome to Stepping Stones Community Resources, Inc., "#,
            "serving the Cape Fear region since 1998.</p></div>\n",
            r#"<p><img src="/wp-content/uploads/recovery.jpg"></p>"#,
            "\n<p><strong>Recovery Services</strong></p>\n",
            "<p>Evidence-based recovery support for adults.</p>\n",
            r#"<p><img src="/wp-content/uploads/clinical.jpg"></p>"#,
            "\n<p><b>Clinical Services</b> Licensed clinicians provide outpatient care.</p>\n",
            r#"<div class="callout-wrap"><p>You know you can reach out any time.</p></div>"#,
            "\n",
            r#"<p><img src="/wp-content/uploads/wellness.jpg"></p>"#,
            "\n<p><strong>Wellness Programs</strong></p>\n",
            "<p>Community wellness classes and groups.</p>\n",
            r#"<div class="callout-wrap"><p><a href="/preview/launch/">Preview the new site</a></p></div>"#,
            "\n",
            r#"<hr class="layout-divider">"#,
            "\n<p>&nbsp;</p>\n<p><br></p>\n",
            "<p>Everything else stays.</p>"
        )
        .to_string()
    }

    #[test]
    fn lead_is_first_callout_naming_the_organization() {
        let sections = extract_home_sections(&golden_input(), LEGAL_NAME);
        let lead = sections.lead.unwrap();
        assert!(lead.starts_with(r#"<div class="callout-wrap">"#));
        assert!(lead.contains("serving the Cape Fear region"));
    }

    #[test]
    fn highlight_is_plain_text() {
        let sections = extract_home_sections(&golden_input(), LEGAL_NAME);
        assert_eq!(
            sections.highlight.as_deref(),
            Some("You know you can reach out any time.")
        );
    }

    #[test]
    fn all_three_cards_found_in_title_order() {
        let sections = extract_home_sections(&golden_input(), LEGAL_NAME);
        let titles: Vec<&str> = sections.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Recovery Services", "Clinical Services", "Wellness Programs"]
        );

        assert_eq!(sections.cards[0].image, "/wp-content/uploads/recovery.jpg");
        assert_eq!(
            sections.cards[0].text,
            "Evidence-based recovery support for adults."
        );
        // Inline description after the bolded title, same paragraph.
        assert_eq!(
            sections.cards[1].text,
            "Licensed clinicians provide outpatient care."
        );
        assert_eq!(sections.cards[2].image, "/wp-content/uploads/wellness.jpg");
    }

    #[test]
    fn cards_collected_in_title_order_regardless_of_document_order() {
        let reordered = concat!(
            r#"<p><img src="/w.jpg"></p><p><strong>Wellness Programs</strong></p><p>W text.</p>"#,
            r#"<p><img src="/r.jpg"></p><p><strong>Recovery Services</strong></p><p>R text.</p>"#,
        );
        let sections = extract_home_sections(reordered, LEGAL_NAME);
        let titles: Vec<&str> = sections.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Recovery Services", "Wellness Programs"]);
    }

    #[test]
    fn card_without_image_silently_omitted() {
        let input = "<p><strong>Recovery Services</strong></p><p>No image above.</p>";
        let sections = extract_home_sections(input, LEGAL_NAME);
        assert!(sections.cards.is_empty());
        // Nothing was removed: the paragraph survives in the remainder.
        assert!(sections.remaining.contains("Recovery Services"));
    }

    #[test]
    fn missing_title_omits_only_that_card() {
        let input = concat!(
            r#"<p><img src="/r.jpg"></p><p><strong>Recovery Services</strong></p><p>R text.</p>"#,
            r#"<p><img src="/c.jpg"></p><p><strong>Something Renamed</strong></p><p>C text.</p>"#,
        );
        let sections = extract_home_sections(input, LEGAL_NAME);
        let titles: Vec<&str> = sections.cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Recovery Services"]);
    }

    #[test]
    fn remaining_is_cleaned_of_legacy_wrappers() {
        let sections = extract_home_sections(&golden_input(), LEGAL_NAME);
        let remaining = &sections.remaining;
        assert!(remaining.contains("Everything else stays."));
        assert!(!remaining.contains("Preview the new site"));
        assert!(!remaining.contains("layout-divider"));
        assert!(!remaining.contains("&nbsp;"));
        assert!(!remaining.contains("You know you can"));
        assert!(!remaining.contains("Recovery Services"));
        assert!(!remaining.contains("recovery.jpg"));
    }

    #[test]
    fn unmatched_markup_skips_sections_not_the_build() {
        let sections = extract_home_sections("<p>Just a regular page body.</p>", LEGAL_NAME);
        assert!(sections.lead.is_none());
        assert!(sections.highlight.is_none());
        assert!(sections.cards.is_empty());
        assert_eq!(sections.remaining, "<p>Just a regular page body.</p>");
    }

    #[test]
    fn empty_input_yields_empty_sections() {
        let sections = extract_home_sections("", LEGAL_NAME);
        assert!(sections.lead.is_none());
        assert!(sections.remaining.is_empty());
    }
}
