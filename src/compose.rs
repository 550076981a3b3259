//! Page assembly.
//!
//! One strategy per route kind, each a fixed ordered sequence of sections.
//! The sequences are deliberate: every service page reads hero → content →
//! expectations → FAQ → CTA, every archive reads hero → list, and so on —
//! the layout only stays coherent if the order never drifts.
//!
//! Per-route metadata lives in an explicit path-keyed override table rather
//! than scattered conditionals. Routes without an override derive their
//! description from the record: excerpt first, else the stripped body
//! truncated to 155 characters, else a templated sentence naming the
//! organization.

use crate::config::SiteConfig;
use crate::content::{Category, ContentStore, Page, Post};
use crate::extract::extract_home_sections;
use crate::routes::{self, RouteKind};
use crate::sanitize::{Sanitizer, collapse_whitespace, strip_tags};
use crate::templates::{self, PostCard, ServiceCard};
use maud::{Markup, html};
use serde_json::json;
use std::collections::BTreeMap;

/// Meta description length budget, per the usual SERP display limit.
const DESCRIPTION_LIMIT: usize = 155;

/// Listing-facing display-name overrides: `(route path, slug, shown as)`.
/// The detail page always uses the service's own name.
const SERVICE_NAME_OVERRIDES: &[(&str, &str, &str)] = &[
    ("/", "clinical-services", "Clinical Care"),
    ("/services/", "wellness-programs", "Wellness & Prevention"),
];

/// Explicit per-route metadata.
#[derive(Debug, Clone)]
pub struct MetaOverride {
    pub title: String,
    pub description: String,
    pub schema: Option<serde_json::Value>,
}

/// A fully assembled page body plus its resolved head metadata.
pub struct ComposedPage {
    pub title: String,
    pub description: String,
    pub page_class: &'static str,
    pub schema: Option<serde_json::Value>,
    pub body: Markup,
}

pub struct Composer<'a> {
    store: &'a ContentStore,
    site: &'a SiteConfig,
    sanitizer: &'a Sanitizer,
    meta_overrides: BTreeMap<String, MetaOverride>,
}

impl<'a> Composer<'a> {
    pub fn new(store: &'a ContentStore, site: &'a SiteConfig, sanitizer: &'a Sanitizer) -> Self {
        Self {
            store,
            site,
            sanitizer,
            meta_overrides: meta_overrides(site),
        }
    }

    /// Assemble a page record according to its classified route kind.
    pub fn compose_page(&self, page: &Page, path: &str, kind: RouteKind) -> ComposedPage {
        match kind {
            RouteKind::Home => self.compose_home(page),
            RouteKind::ServicesIndex => self.compose_services_index(),
            RouteKind::ResourcesIndex => self.compose_resources_index(),
            RouteKind::ServiceDetail => self.compose_service_detail(page, path),
            RouteKind::Location => self.compose_location(page, path),
            RouteKind::Contact => self.compose_simple(page, path, "contact", "We're ready to help."),
            _ => self.compose_simple(page, path, "page", "Ready to talk?"),
        }
    }

    fn compose_home(&self, page: &Page) -> ComposedPage {
        let sections = extract_home_sections(&page.content, &self.site.legal_name);
        let lead = sections.lead.as_deref().map(|raw| self.sanitizer.sanitize(raw));
        let cards: Vec<_> = sections
            .cards
            .into_iter()
            .map(|mut card| {
                card.image = self.sanitizer.rewrite_asset_url(&card.image);
                card
            })
            .collect();
        let remaining = self.sanitizer.sanitize(&sections.remaining);
        let recent = self.post_cards(self.store.posts_by_date().into_iter().take(3));

        let body = html! {
            (templates::hero_slider(&self.store.hero_slides, self.site))
            (templates::services_slider(&self.service_cards("/")))
            @if let Some(lead) = &lead {
                (templates::lead_section(lead))
            }
            (templates::feature_cards(&cards))
            @if let Some(highlight) = &sections.highlight {
                (templates::highlight_band(highlight))
            }
            @if !remaining.is_empty() {
                (templates::content_section(&remaining))
            }
            (templates::post_list(
                &recent,
                "Recent Posts",
                &format!("Updates, events, and resources from {}.", self.site.name),
            ))
        };
        let (title, description, schema) =
            self.resolve_meta("/", &page.title, &page.excerpt, &page.content);
        ComposedPage {
            title,
            description,
            page_class: "home",
            schema,
            body,
        }
    }

    pub fn compose_services_index(&self) -> ComposedPage {
        let body = templates::services_grid(&self.service_cards("/services/"));
        let (title, description, schema) = self.resolve_meta(
            "/services/",
            &format!("Services | {}", self.site.name),
            "",
            "",
        );
        ComposedPage {
            title,
            description,
            page_class: "services-index",
            schema,
            body,
        }
    }

    pub fn compose_resources_index(&self) -> ComposedPage {
        let posts = self.post_cards(self.store.posts_by_date().into_iter());
        let body = html! {
            (templates::page_hero("Resources", "Updates, events, and practical guides."))
            (templates::post_list(
                &posts,
                "All Posts",
                "Everything we have published, newest first.",
            ))
            @if posts.is_empty() {
                (templates::archive_list(&[]))
            }
        };
        let (title, description, schema) = self.resolve_meta(
            "/resources/",
            &format!("Resources | {}", self.site.name),
            "",
            "",
        );
        ComposedPage {
            title,
            description,
            page_class: "resources-index",
            schema,
            body,
        }
    }

    fn compose_service_detail(&self, page: &Page, path: &str) -> ComposedPage {
        // Classification guarantees a backing record; degrade to a generic
        // page if the store changed underneath us.
        let Some(service) = self.store.service_by_path(path) else {
            return self.compose_simple(page, path, "page", "Ready to talk?");
        };
        let content = self.sanitizer.sanitize(&page.content);
        let body = html! {
            (templates::service_hero(service, &service.name))
            @if !content.is_empty() {
                (templates::content_section(&content))
            }
            (templates::expectations_section(&service.expectations))
            (templates::faq_section(&service.faqs))
            (templates::cta_band(self.site, "Ready to talk?", ""))
        };
        let (title, description, schema) =
            self.resolve_meta(path, &service.name, &service.summary, &page.content);
        ComposedPage {
            title,
            description,
            page_class: "service-detail",
            schema,
            body,
        }
    }

    fn compose_location(&self, page: &Page, path: &str) -> ComposedPage {
        let content = self.sanitizer.sanitize(&page.content);
        let body = html! {
            (templates::page_hero(&page.title, &page.excerpt))
            @if !content.is_empty() {
                (templates::content_section(&content))
            }
            (templates::related_services(&self.service_cards(path)))
            (templates::cta_band(self.site, "Visit us", ""))
        };
        let (title, description, schema) =
            self.resolve_meta(path, &page.title, &page.excerpt, &page.content);
        ComposedPage {
            title,
            description,
            page_class: "location",
            schema,
            body,
        }
    }

    /// Hero → content → CTA, shared by contact and generic pages.
    fn compose_simple(
        &self,
        page: &Page,
        path: &str,
        page_class: &'static str,
        cta_heading: &str,
    ) -> ComposedPage {
        let content = self.sanitizer.sanitize(&page.content);
        let body = html! {
            (templates::page_hero(&page.title, &page.excerpt))
            @if !content.is_empty() {
                (templates::content_section(&content))
            }
            (templates::cta_band(self.site, cta_heading, ""))
        };
        let (title, description, schema) =
            self.resolve_meta(path, &page.title, &page.excerpt, &page.content);
        ComposedPage {
            title,
            description,
            page_class,
            schema,
            body,
        }
    }

    pub fn compose_post(&self, post: &Post) -> ComposedPage {
        let content = self.sanitizer.sanitize(&post.content);
        let body = html! {
            (templates::page_hero(&post.title, &post.excerpt))
            @if !content.is_empty() {
                (templates::content_section(&content))
            }
            (templates::cta_band(self.site, "Need support?", ""))
        };
        let description = derive_description(&post.excerpt, &post.content, &post.title, self.site);
        ComposedPage {
            title: post.title.clone(),
            description,
            page_class: "post",
            schema: None,
            body,
        }
    }

    pub fn compose_category(&self, category: &Category) -> ComposedPage {
        let posts = self.post_cards(self.store.posts_in_category(category.id).into_iter());
        let body = html! {
            (templates::page_hero(
                &category.name,
                &format!("Posts filed under {}.", category.name),
            ))
            (templates::archive_list(&posts))
        };
        ComposedPage {
            title: format!("{} | {}", category.name, self.site.name),
            description: format!("Posts filed under {}.", category.name),
            page_class: "archive",
            schema: None,
            body,
        }
    }

    /// Resolve listing cards for the allow-list. A slug with no backing
    /// record yields a placeholder card with a `#` link.
    fn service_cards(&self, route_path: &str) -> Vec<ServiceCard> {
        self.site
            .allowed_service_slugs
            .iter()
            .map(|slug| match self.store.service_by_slug(slug) {
                Some(service) => ServiceCard {
                    name: self.display_name(route_path, slug, &service.name),
                    summary: service.summary.clone(),
                    image: service.image.clone(),
                    path: service.path.clone(),
                },
                None => ServiceCard {
                    name: title_from_slug(slug),
                    summary: String::new(),
                    image: String::new(),
                    path: "#".to_string(),
                },
            })
            .collect()
    }

    fn display_name(&self, route_path: &str, slug: &str, default: &str) -> String {
        SERVICE_NAME_OVERRIDES
            .iter()
            .find(|(path, s, _)| *path == route_path && *s == slug)
            .map(|(_, _, name)| name.to_string())
            .unwrap_or_else(|| default.to_string())
    }

    fn post_cards<'p>(&self, posts: impl Iterator<Item = &'p Post>) -> Vec<PostCard> {
        posts
            .map(|post| PostCard {
                title: post.title.clone(),
                path: routes::url_path(&post.link).unwrap_or_else(|_| "#".to_string()),
                excerpt: post.excerpt.clone(),
            })
            .collect()
    }

    fn resolve_meta(
        &self,
        path: &str,
        title: &str,
        excerpt: &str,
        content: &str,
    ) -> (String, String, Option<serde_json::Value>) {
        if let Some(meta) = self.meta_overrides.get(path) {
            return (
                meta.title.clone(),
                meta.description.clone(),
                meta.schema.clone(),
            );
        }
        (
            title.to_string(),
            derive_description(excerpt, content, title, self.site),
            None,
        )
    }
}

/// The explicit route-key → metadata table.
fn meta_overrides(site: &SiteConfig) -> BTreeMap<String, MetaOverride> {
    let mut table = BTreeMap::new();
    table.insert(
        "/".to_string(),
        MetaOverride {
            title: format!("{} | Recovery, Clinical & Wellness Services", site.legal_name),
            description: format!(
                "{} offers recovery, clinical, and wellness services for whole-person care. Call {}.",
                site.legal_name, site.phone
            ),
            schema: Some(json!({
                "@context": "https://schema.org",
                "@type": "LocalBusiness",
                "name": site.legal_name,
                "url": site.base_url,
                "telephone": site.phone_tel,
            })),
        },
    );
    table.insert(
        "/services/".to_string(),
        MetaOverride {
            title: format!("Services | {}", site.legal_name),
            description: format!("Explore {} services and care options.", site.name),
            schema: None,
        },
    );
    table.insert(
        "/resources/".to_string(),
        MetaOverride {
            title: format!("Resources | {}", site.name),
            description: format!(
                "Updates, events, and practical guides from {}.",
                site.name
            ),
            schema: None,
        },
    );
    table.insert(
        site.contact_url.clone(),
        MetaOverride {
            title: format!("Request an Appointment | {}", site.name),
            description: format!(
                "Request an appointment with {} or call {}.",
                site.legal_name, site.phone
            ),
            schema: Some(json!({
                "@context": "https://schema.org",
                "@type": "ContactPage",
                "name": format!("Request an Appointment | {}", site.name),
                "url": format!("{}{}", site.base_url, site.contact_url),
            })),
        },
    );
    table
}

/// Excerpt, else truncated stripped body, else a templated sentence.
fn derive_description(excerpt: &str, content: &str, title: &str, site: &SiteConfig) -> String {
    let excerpt = collapse_whitespace(&strip_tags(excerpt));
    if !excerpt.is_empty() {
        return excerpt;
    }
    let stripped = collapse_whitespace(&strip_tags(content));
    if !stripped.is_empty() {
        return truncate_with_ellipsis(&stripped, DESCRIPTION_LIMIT);
    }
    format!("Learn about {title} from {}.", site.legal_name)
}

/// Cut at the last word boundary before the limit.
fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    let cut = match cut.rfind(' ') {
        Some(i) => &cut[..i],
        None => cut.as_str(),
    };
    format!("{}…", cut.trim_end())
}

fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => format!("{}{}", first.to_ascii_uppercase(), chars.as_str()),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetMap;
    use crate::content::{NavTree, Service};

    fn test_site() -> SiteConfig {
        SiteConfig {
            allowed_service_slugs: vec!["peer-support".to_string(), "ghost-service".to_string()],
            ..SiteConfig::default()
        }
    }

    fn test_store() -> ContentStore {
        ContentStore {
            pages: vec![],
            posts: vec![Post {
                id: 1,
                title: "Open House".to_string(),
                slug: "open-house".to_string(),
                link: "https://steppingstonescri.net/open-house/".to_string(),
                excerpt: "Join us.".to_string(),
                date: "2016-05-12T10:00:00".to_string(),
                categories: vec![5],
                content: "<p>Details</p>".to_string(),
            }],
            categories: vec![
                Category {
                    id: 5,
                    slug: "news".to_string(),
                    name: "News".to_string(),
                },
                Category {
                    id: 9,
                    slug: "events".to_string(),
                    name: "Events".to_string(),
                },
            ],
            services: vec![Service {
                slug: "peer-support".to_string(),
                path: "/services/peer-support/".to_string(),
                name: "Peer Support".to_string(),
                summary: "Walk alongside trained peers.".to_string(),
                image: "/assets/images/peer.jpg".to_string(),
                expectations: vec!["An intake conversation".to_string()],
                faqs: vec![],
                cta_url: "/request-an-appointment/".to_string(),
                cta_text: "Get started".to_string(),
            }],
            nav: NavTree {
                header: vec![],
                footer: vec![],
            },
            hero_slides: vec![],
        }
    }

    fn with_composer<T>(f: impl FnOnce(&Composer) -> T) -> T {
        let site = test_site();
        let store = test_store();
        let sanitizer = Sanitizer::new(&site, &AssetMap::default());
        let composer = Composer::new(&store, &site, &sanitizer);
        f(&composer)
    }

    // =========================================================================
    // Metadata resolution
    // =========================================================================

    #[test]
    fn override_table_wins_for_known_routes() {
        with_composer(|composer| {
            let (title, description, schema) =
                composer.resolve_meta("/", "ignored", "ignored", "ignored");
            assert!(title.contains("Stepping Stones Community Resources"));
            assert!(description.contains("(910) 484-0176"));
            assert!(schema.is_some());
        });
    }

    #[test]
    fn excerpt_preferred_for_description() {
        let site = SiteConfig::default();
        let d = derive_description("A short excerpt.", "<p>Body text</p>", "Title", &site);
        assert_eq!(d, "A short excerpt.");
    }

    #[test]
    fn body_truncated_at_word_boundary_with_ellipsis() {
        let site = SiteConfig::default();
        let body = format!("<p>{}</p>", "word ".repeat(60));
        let d = derive_description("", &body, "Title", &site);
        assert!(d.chars().count() <= DESCRIPTION_LIMIT + 1);
        assert!(d.ends_with('…'));
        assert!(!d.contains("  "));
    }

    #[test]
    fn empty_record_gets_templated_sentence() {
        let site = SiteConfig::default();
        let d = derive_description("", "", "Our Team", &site);
        assert_eq!(
            d,
            "Learn about Our Team from Stepping Stones Community Resources, Inc.."
        );
    }

    // =========================================================================
    // Service cards
    // =========================================================================

    #[test]
    fn allow_list_resolves_against_store() {
        with_composer(|composer| {
            let cards = composer.service_cards("/services/");
            assert_eq!(cards.len(), 2);
            assert_eq!(cards[0].name, "Peer Support");
            assert_eq!(cards[0].path, "/services/peer-support/");
        });
    }

    #[test]
    fn missing_service_yields_placeholder_card() {
        with_composer(|composer| {
            let cards = composer.service_cards("/services/");
            assert_eq!(cards[1].name, "Ghost Service");
            assert_eq!(cards[1].path, "#");
            assert!(cards[1].image.is_empty());
        });
    }

    #[test]
    fn display_name_override_applies_per_route() {
        with_composer(|composer| {
            assert_eq!(
                composer.display_name("/", "clinical-services", "Clinical Services"),
                "Clinical Care"
            );
            // Same slug, different route: no override.
            assert_eq!(
                composer.display_name("/about-us/", "clinical-services", "Clinical Services"),
                "Clinical Services"
            );
        });
    }

    // =========================================================================
    // Route bodies
    // =========================================================================

    #[test]
    fn empty_category_renders_empty_state() {
        with_composer(|composer| {
            let category = Category {
                id: 9,
                slug: "events".to_string(),
                name: "Events".to_string(),
            };
            let composed = composer.compose_category(&category);
            let html = composed.body.into_string();
            assert!(html.contains("No posts yet."));
        });
    }

    #[test]
    fn populated_category_lists_posts() {
        with_composer(|composer| {
            let category = Category {
                id: 5,
                slug: "news".to_string(),
                name: "News".to_string(),
            };
            let composed = composer.compose_category(&category);
            let html = composed.body.into_string();
            assert!(html.contains("Open House"));
            assert!(html.contains(r#"href="/open-house/""#));
            assert!(!html.contains("No posts yet."));
        });
    }

    #[test]
    fn post_body_sections_in_order() {
        with_composer(|composer| {
            let post = &composer.store.posts[0];
            let composed = composer.compose_post(post);
            let html = composed.body.into_string();
            let hero = html.find("page-hero").unwrap();
            let content = html.find("content-section").unwrap();
            let cta = html.find(r#"class="cta""#).unwrap();
            assert!(hero < content && content < cta);
        });
    }

    #[test]
    fn title_from_slug_title_cases() {
        assert_eq!(title_from_slug("ghost-service"), "Ghost Service");
        assert_eq!(title_from_slug("peer"), "Peer");
    }
}
