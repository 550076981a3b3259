//! HTML components.
//!
//! All markup is generated with [maud](https://maud.lambda.xyz/) — the same
//! trade as hand-written template strings, without the stringly-typed
//! lookups: malformed HTML is a compile error and interpolation is
//! auto-escaped. The one deliberate escape hatch is `PreEscaped` for bodies
//! that already went through the sanitizer.
//!
//! Components mirror the site's section vocabulary: page shell, header and
//! footer chrome, hero and services sliders, card grids, FAQ accordion,
//! CTA bands, post lists. The composer decides which sections a route gets
//! and in what order; this module only knows how each one looks.

use crate::config::SiteConfig;
use crate::content::{Faq, FooterSection, HeroSlide, NavItem, Service};
use crate::extract::FeatureCard;
use crate::routes;
use maud::{DOCTYPE, Markup, PreEscaped, html};

/// Everything the document head needs.
pub struct PageShell<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub canonical: &'a str,
    pub page_class: &'a str,
    pub schema: Option<&'a serde_json::Value>,
}

/// A resolved listing card for one service (or a placeholder when the
/// allow-list names a slug with no backing record).
#[derive(Debug, Clone)]
pub struct ServiceCard {
    pub name: String,
    pub summary: String,
    pub image: String,
    pub path: String,
}

/// A resolved post reference for listings.
#[derive(Debug, Clone)]
pub struct PostCard {
    pub title: String,
    pub path: String,
    pub excerpt: String,
}

/// The full document: head, chrome, assembled main content.
pub fn document(shell: &PageShell, header: Markup, main: Markup, footer: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (shell.title) }
                meta name="description" content=(shell.description);
                link rel="canonical" href=(shell.canonical);
                link rel="stylesheet" href="/assets/styles.css";
                @if let Some(schema) = shell.schema {
                    script type="application/ld+json" { (PreEscaped(schema.to_string())) }
                }
            }
            body class=(shell.page_class) {
                (header)
                main { (main) }
                (footer)
                script src="/assets/site.js" defer {}
            }
        }
    }
}

pub fn site_header(nav: &[NavItem], site: &SiteConfig) -> Markup {
    html! {
        header.site-header {
            div.container.header-inner {
                a.logo href="/" { (site.name) }
                button.nav-toggle type="button" aria-label="Toggle navigation" { "Menu" }
                nav.site-nav { (nav_list(nav, 0, site)) }
            }
        }
    }
}

fn nav_list(items: &[NavItem], depth: usize, site: &SiteConfig) -> Markup {
    if items.is_empty() {
        return html! {};
    }
    let list_class = if depth == 0 { "nav-list" } else { "nav-sublist" };
    html! {
        ul class=(list_class) {
            @for item in items {
                @let item_class = if item.children.is_empty() { "nav-item" } else { "nav-item has-children" };
                li class=(item_class) {
                    a href=(routes::clean_url(&item.url, &site.base_url)) { (item.title) }
                    @if !item.children.is_empty() {
                        (nav_list(&item.children, depth + 1, site))
                    }
                }
            }
        }
    }
}

/// Footer chrome. Carries the `tel:` CTA link every page must have.
pub fn site_footer(sections: &[FooterSection], site: &SiteConfig) -> Markup {
    html! {
        footer.site-footer {
            div.container.footer-inner {
                div.footer-org {
                    h4 { (site.legal_name) }
                    p {
                        "Call "
                        a href={ "tel:" (site.phone_tel) } { (site.phone) }
                    }
                }
                @for section in sections {
                    div.footer-links {
                        h5 { (section.title) }
                        @for link in &section.links {
                            a href=(routes::clean_url(&link.url, &site.base_url)) { (link.title) }
                        }
                    }
                }
            }
        }
    }
}

pub fn page_hero(title: &str, lede: &str) -> Markup {
    html! {
        section.page-hero {
            div.container {
                h1 { (title) }
                @if !lede.is_empty() {
                    p { (lede) }
                }
            }
        }
    }
}

pub fn hero_slider(slides: &[HeroSlide], site: &SiteConfig) -> Markup {
    if slides.is_empty() {
        return html! {};
    }
    html! {
        section.hero-slider aria-label={ (site.name) " featured messages" } {
            div.hero-slider-track {
                @for (index, slide) in slides.iter().enumerate() {
                    article.hero-slide data-slide=(index) {
                        div.hero-slide-bg style={ "background-image:url('" (slide.image) "')" } {}
                        div.hero-slide-content {
                            p.hero-kicker { (site.name) }
                            h2 { (slide.title) }
                            p { (slide.summary) }
                            a.btn.btn-primary href=(slide.cta_url) { (slide.cta_text) }
                        }
                    }
                }
            }
            div.hero-slider-controls {
                button.slider-btn.prev type="button" aria-label="Previous slide" { (PreEscaped("&#8592;")) }
                div.slider-dots role="tablist" {}
                button.slider-btn.next type="button" aria-label="Next slide" { (PreEscaped("&#8594;")) }
            }
        }
    }
}

pub fn services_slider(cards: &[ServiceCard]) -> Markup {
    html! {
        section.services-slider {
            div.container {
                div.section-heading {
                    h2 { "Our Services" }
                    p { "Explore recovery, clinical, and wellness services designed for whole-person care." }
                }
                div.slider-shell {
                    button.slider-btn.prev type="button" aria-label="Previous services" { (PreEscaped("&#8592;")) }
                    div.slider aria-label="Services slider" {
                        div.slider-track {
                            @for card in cards {
                                article.service-slide {
                                    a.service-slide-link href=(card.path) {
                                        @if !card.image.is_empty() {
                                            img src=(card.image) alt=(card.name) loading="lazy" decoding="async";
                                        }
                                        div {
                                            h3 { (card.name) }
                                            p { (card.summary) }
                                        }
                                    }
                                }
                            }
                        }
                    }
                    button.slider-btn.next type="button" aria-label="Next services" { (PreEscaped("&#8594;")) }
                }
            }
        }
    }
}

pub fn services_grid(cards: &[ServiceCard]) -> Markup {
    html! {
        section.services-index {
            div.container {
                div.section-heading {
                    h2 { "Services" }
                    p { "Each service below links to a full overview, expectations, and FAQs." }
                }
                div.card-grid {
                    @for card in cards {
                        article.card {
                            @if !card.image.is_empty() {
                                img src=(card.image) alt=(card.name) loading="lazy" decoding="async";
                            }
                            div {
                                h3 { (card.name) }
                                p { (card.summary) }
                                a.text-link href=(card.path) { "Learn more" }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Intro callout extracted from the legacy home page. `lead_html` must
/// already be sanitized.
pub fn lead_section(lead_html: &str) -> Markup {
    html! {
        section.lead-section {
            div.container { (PreEscaped(lead_html)) }
        }
    }
}

pub fn feature_cards(cards: &[FeatureCard]) -> Markup {
    if cards.is_empty() {
        return html! {};
    }
    html! {
        section.feature-cards {
            div.container {
                div.card-grid {
                    @for card in cards {
                        article.card {
                            img src=(card.image) alt=(card.title) loading="lazy" decoding="async";
                            div {
                                h3 { (card.title) }
                                p { (card.text) }
                            }
                        }
                    }
                }
            }
        }
    }
}

pub fn highlight_band(text: &str) -> Markup {
    html! {
        section.highlight-band {
            div.container {
                p { (text) }
            }
        }
    }
}

/// Sanitized body content, embedded as-is.
pub fn content_section(body_html: &str) -> Markup {
    html! {
        section.content-section {
            div.container { (PreEscaped(body_html)) }
        }
    }
}

pub fn service_hero(service: &Service, display_name: &str) -> Markup {
    html! {
        section.service-hero {
            div.container.service-hero-inner {
                div {
                    p.hero-kicker { "Service" }
                    h1 { (display_name) }
                    p { (service.summary) }
                    a.btn.btn-primary href=(service.cta_url) { (service.cta_text) }
                }
                img src=(service.image) alt=(display_name);
            }
        }
    }
}

pub fn expectations_section(expectations: &[String]) -> Markup {
    if expectations.is_empty() {
        return html! {};
    }
    html! {
        section.expectations {
            div.container {
                h2 { "What to expect" }
                ul {
                    @for item in expectations {
                        li { (item) }
                    }
                }
            }
        }
    }
}

pub fn faq_section(faqs: &[Faq]) -> Markup {
    if faqs.is_empty() {
        return html! {};
    }
    html! {
        section.faq {
            div.container {
                h2 { "FAQ" }
                div.faq-list {
                    @for faq in faqs {
                        details {
                            summary { (faq.question) }
                            p { (faq.answer) }
                        }
                    }
                }
            }
        }
    }
}

/// Closing call-to-action band. Phone rendered as a `tel:` link.
pub fn cta_band(site: &SiteConfig, heading: &str, lede: &str) -> Markup {
    html! {
        section.cta {
            div.container {
                h2 { (heading) }
                p {
                    (lede)
                    " Call "
                    a href={ "tel:" (site.phone_tel) } { (site.phone) }
                    " or request an appointment today."
                }
                a.btn.btn-primary href=(site.contact_url) { "Request Appointment" }
            }
        }
    }
}

pub fn post_list(posts: &[PostCard], heading: &str, lede: &str) -> Markup {
    if posts.is_empty() {
        return html! {};
    }
    html! {
        section.post-list {
            div.container {
                div.section-heading {
                    h2 { (heading) }
                    p { (lede) }
                }
                div.post-grid {
                    @for post in posts {
                        article.post-card {
                            h3 { a href=(post.path) { (post.title) } }
                            p { (post.excerpt) }
                        }
                    }
                }
            }
        }
    }
}

/// Flat archive listing. An empty archive renders an explicit empty state
/// rather than nothing.
pub fn archive_list(posts: &[PostCard]) -> Markup {
    html! {
        section.content-section {
            div.container {
                ul.archive-list {
                    @if posts.is_empty() {
                        li { "No posts yet." }
                    } @else {
                        @for post in posts {
                            li { a href=(post.path) { (post.title) } }
                        }
                    }
                }
            }
        }
    }
}

/// Related-service links for location pages.
pub fn related_services(cards: &[ServiceCard]) -> Markup {
    if cards.is_empty() {
        return html! {};
    }
    html! {
        section.related-services {
            div.container {
                h2 { "Services available here" }
                ul {
                    @for card in cards {
                        li { a href=(card.path) { (card.name) } }
                    }
                }
            }
        }
    }
}
