//! Content entities and the in-memory content store.
//!
//! The CMS export ships as a directory of JSON files, loaded once per build:
//!
//! ```text
//! data/
//! ├── pages.json        # [Page]
//! ├── posts.json        # [Post]
//! ├── categories.json   # [Category]
//! ├── services.json     # [Service]
//! ├── nav.json          # {header, footer}
//! └── hero-slider.json  # [HeroSlide]
//! ```
//!
//! Records are immutable once loaded and are processed in source-array
//! order. Every page and post carries a canonical absolute `link`; its path
//! component becomes the record's output route. A link that does not parse
//! as an absolute URL is a fatal load error naming the offending record —
//! route derivation depends on it, so there is no point continuing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
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
    #[error("{kind} {id} (`{title}`) has a link that is not an absolute URL: `{link}`")]
    InvalidLink {
        kind: &'static str,
        id: u64,
        title: String,
        link: String,
    },
}

/// A static page exported from the CMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: u64,
    pub title: String,
    pub slug: String,
    /// Canonical absolute URL; the path component is the output route key.
    pub link: String,
    #[serde(default)]
    pub excerpt: String,
    /// Raw legacy HTML body, sanitized before rendering.
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<u64>,
}

/// A blog post. Same shape as [`Page`] plus a publish date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: u64,
    pub title: String,
    pub slug: String,
    pub link: String,
    #[serde(default)]
    pub excerpt: String,
    /// ISO-8601 publish date; listings order reverse-chronologically.
    pub date: String,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub content: String,
}

/// Groups posts into `/category/<slug>/` archive routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Faq {
    pub question: String,
    pub answer: String,
}

/// A curated service record.
///
/// Services drive the service-detail route (via `path`) and the
/// navigation-facing listings (via the allow-list in site config).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub slug: String,
    /// Site-relative route of the detail page, e.g. `/services/peer-support/`.
    pub path: String,
    pub name: String,
    pub summary: String,
    pub image: String,
    /// "What to expect" bullet list, in display order.
    #[serde(default)]
    pub expectations: Vec<String>,
    #[serde(default)]
    pub faqs: Vec<Faq>,
    pub cta_url: String,
    pub cta_text: String,
}

/// Header navigation entry. Recursive; two levels used in practice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavItem {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}

/// A footer column: a title plus a flat list of links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooterSection {
    pub title: String,
    pub links: Vec<NavItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavTree {
    #[serde(default)]
    pub header: Vec<NavItem>,
    #[serde(default)]
    pub footer: Vec<FooterSection>,
}

/// Home-page hero slider entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroSlide {
    pub title: String,
    pub summary: String,
    pub image: String,
    pub cta_url: String,
    pub cta_text: String,
}

/// Everything a build reads, loaded once.
#[derive(Debug)]
pub struct ContentStore {
    pub pages: Vec<Page>,
    pub posts: Vec<Post>,
    pub categories: Vec<Category>,
    pub services: Vec<Service>,
    pub nav: NavTree,
    pub hero_slides: Vec<HeroSlide>,
}

impl ContentStore {
    /// Load all content collections from the data directory.
    ///
    /// Fails fast on the first record whose `link` is not an absolute URL,
    /// naming the record so the operator can fix the export.
    pub fn load(data_dir: &Path) -> Result<Self, ContentError> {
        let pages: Vec<Page> = read_json(&data_dir.join("pages.json"))?;
        let posts: Vec<Post> = read_json(&data_dir.join("posts.json"))?;
        let categories: Vec<Category> = read_json(&data_dir.join("categories.json"))?;
        let services: Vec<Service> = read_json(&data_dir.join("services.json"))?;
        let nav: NavTree = read_json(&data_dir.join("nav.json"))?;
        let hero_slides: Vec<HeroSlide> = read_json(&data_dir.join("hero-slider.json"))?;

        for page in &pages {
            if url::Url::parse(&page.link).is_err() {
                return Err(ContentError::InvalidLink {
                    kind: "page",
                    id: page.id,
                    title: page.title.clone(),
                    link: page.link.clone(),
                });
            }
        }
        for post in &posts {
            if url::Url::parse(&post.link).is_err() {
                return Err(ContentError::InvalidLink {
                    kind: "post",
                    id: post.id,
                    title: post.title.clone(),
                    link: post.link.clone(),
                });
            }
        }

        Ok(Self {
            pages,
            posts,
            categories,
            services,
            nav,
            hero_slides,
        })
    }

    pub fn service_by_path(&self, path: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.path == path)
    }

    pub fn service_by_slug(&self, slug: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.slug == slug)
    }

    /// Route paths of every service, for route classification.
    pub fn service_paths(&self) -> BTreeSet<String> {
        self.services.iter().map(|s| s.path.clone()).collect()
    }

    /// Posts carrying the given category id, reverse-chronological.
    pub fn posts_in_category(&self, category_id: u64) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .filter(|p| p.categories.contains(&category_id))
            .collect();
        sort_reverse_chronological(&mut posts);
        posts
    }

    /// All posts, reverse-chronological, for listings.
    pub fn posts_by_date(&self) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self.posts.iter().collect();
        sort_reverse_chronological(&mut posts);
        posts
    }
}

/// Newest first. Records whose date fails to parse sort after all
/// parseable dates, keeping their input order, so one bad record cannot
/// reshuffle a listing.
fn sort_reverse_chronological(posts: &mut [&Post]) {
    posts.sort_by(|a, b| match (parse_date(&a.date), parse_date(&b.date)) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

fn parse_date(date: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(date, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ContentError> {
    let file = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ContentError::Io {
        file: file.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ContentError::Json { file, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_data_dir(dir: &Path, posts: &str) {
        fs::write(
            dir.join("pages.json"),
            r#"[{"id": 1, "title": "Home", "slug": "home",
                 "link": "https://steppingstonescri.net/",
                 "excerpt": "", "content": "<p>Welcome</p>"}]"#,
        )
        .unwrap();
        fs::write(dir.join("posts.json"), posts).unwrap();
        fs::write(
            dir.join("categories.json"),
            r#"[{"id": 5, "slug": "news", "name": "News"}]"#,
        )
        .unwrap();
        fs::write(dir.join("services.json"), "[]").unwrap();
        fs::write(dir.join("nav.json"), r#"{"header": [], "footer": []}"#).unwrap();
        fs::write(dir.join("hero-slider.json"), "[]").unwrap();
    }

    const TWO_POSTS: &str = r#"[
        {"id": 10, "title": "Older", "slug": "older",
         "link": "https://steppingstonescri.net/older/",
         "date": "2016-03-01T09:00:00", "categories": [5], "content": ""},
        {"id": 11, "title": "Newer", "slug": "newer",
         "link": "https://steppingstonescri.net/newer/",
         "date": "2016-05-12T10:30:00", "categories": [], "content": ""}
    ]"#;

    #[test]
    fn load_reads_all_collections() {
        let dir = TempDir::new().unwrap();
        write_data_dir(dir.path(), TWO_POSTS);

        let store = ContentStore::load(dir.path()).unwrap();
        assert_eq!(store.pages.len(), 1);
        assert_eq!(store.posts.len(), 2);
        assert_eq!(store.categories[0].slug, "news");
    }

    #[test]
    fn malformed_page_link_is_fatal_and_names_record() {
        let dir = TempDir::new().unwrap();
        write_data_dir(dir.path(), TWO_POSTS);
        fs::write(
            dir.path().join("pages.json"),
            r#"[{"id": 7, "title": "Broken", "slug": "broken",
                 "link": "/not-absolute/", "content": ""}]"#,
        )
        .unwrap();

        let err = ContentStore::load(dir.path()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("page 7"), "got: {message}");
        assert!(message.contains("/not-absolute/"), "got: {message}");
    }

    #[test]
    fn posts_by_date_is_reverse_chronological() {
        let dir = TempDir::new().unwrap();
        write_data_dir(dir.path(), TWO_POSTS);

        let store = ContentStore::load(dir.path()).unwrap();
        let titles: Vec<&str> = store.posts_by_date().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Newer", "Older"]);
    }

    #[test]
    fn unparseable_dates_sort_last_in_input_order() {
        let dir = TempDir::new().unwrap();
        write_data_dir(
            dir.path(),
            r#"[
                {"id": 1, "title": "Bad A", "slug": "a",
                 "link": "https://steppingstonescri.net/a/", "date": "sometime", "content": ""},
                {"id": 2, "title": "Dated", "slug": "b",
                 "link": "https://steppingstonescri.net/b/", "date": "2016-01-01", "content": ""},
                {"id": 3, "title": "Bad B", "slug": "c",
                 "link": "https://steppingstonescri.net/c/", "date": "", "content": ""}
            ]"#,
        );

        let store = ContentStore::load(dir.path()).unwrap();
        let titles: Vec<&str> = store.posts_by_date().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Dated", "Bad A", "Bad B"]);
    }

    #[test]
    fn posts_in_category_filters_by_id() {
        let dir = TempDir::new().unwrap();
        write_data_dir(dir.path(), TWO_POSTS);

        let store = ContentStore::load(dir.path()).unwrap();
        let in_news = store.posts_in_category(5);
        assert_eq!(in_news.len(), 1);
        assert_eq!(in_news[0].title, "Older");
        assert!(store.posts_in_category(99).is_empty());
    }
}
