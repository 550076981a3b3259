//! Site generation.
//!
//! One synchronous pass over the loaded content store. Every run deletes
//! and regenerates the output trees, so a build is idempotent from scratch
//! — there is no partial-success or resume mode; an I/O failure aborts with
//! a non-zero exit.
//!
//! ## Output Structure
//!
//! ```text
//! dist/                          # public tree
//! ├── index.html                 # home
//! ├── assets/                    # static assets (copied)
//! ├── about-us/index.html        # generic pages
//! ├── services/index.html        # services index (synthetic)
//! ├── services/peer-support/     # service detail pages
//! ├── category/news/index.html   # category archives
//! ├── sitemap.xml
//! └── robots.txt
//! mirror/                        # inspection/versioning tree
//! ├── pages/...                  # pages, archives, indexes + assets
//! └── posts/...                  # posts
//! ```
//!
//! Every document is written to both trees from the identical rendered
//! string. Synthetic indexes (`/services/`, `/resources/`) render after the
//! page records, so a colliding page record is overwritten — last write
//! wins, by design of the legacy export.

use crate::compose::{ComposedPage, Composer};
use crate::config::{AssetMap, ConfigError, SiteConfig};
use crate::content::{ContentError, ContentStore};
use crate::routes::{self, RouteError};
use crate::sanitize::Sanitizer;
use crate::templates::{self, PageShell};
use maud::Markup;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    #[error("Route error: {0}")]
    Route(#[from] RouteError),
}

/// Where a build reads from and writes to.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub data_dir: PathBuf,
    pub assets_dir: PathBuf,
    pub output_dir: PathBuf,
    pub mirror_dir: PathBuf,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            assets_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("dist"),
            mirror_dir: PathBuf::from("mirror"),
        }
    }
}

#[derive(Debug)]
pub struct BuildSummary {
    pub pages: usize,
    pub posts: usize,
    pub categories: usize,
    /// Distinct routes written, including synthetic indexes.
    pub routes: usize,
}

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Run the full pipeline: load, sanitize, compose, write both trees,
/// emit sitemap and robots.
pub fn build(options: &BuildOptions) -> Result<BuildSummary, GenerateError> {
    let site = SiteConfig::load(&options.data_dir)?;
    let asset_map = AssetMap::load(&options.data_dir)?;
    let store = ContentStore::load(&options.data_dir)?;
    let sanitizer = Sanitizer::new(&site, &asset_map);
    let composer = Composer::new(&store, &site, &sanitizer);

    let mirror_pages = options.mirror_dir.join("pages");
    let mirror_posts = options.mirror_dir.join("posts");

    remove_dir_if_exists(&options.output_dir)?;
    remove_dir_if_exists(&mirror_pages)?;
    remove_dir_if_exists(&mirror_posts)?;
    fs::create_dir_all(&options.output_dir)?;
    fs::create_dir_all(&mirror_pages)?;
    fs::create_dir_all(&mirror_posts)?;

    if options.assets_dir.exists() {
        copy_dir_recursive(&options.assets_dir, &options.output_dir.join("assets"))?;
        copy_dir_recursive(&options.assets_dir, &mirror_pages.join("assets"))?;
    }

    let header = templates::site_header(&store.nav.header, &site);
    let footer = templates::site_footer(&store.nav.footer, &site);
    let service_paths = store.service_paths();
    let mut route_paths: BTreeSet<String> = BTreeSet::new();

    for page in &store.pages {
        let path = routes::url_path(&page.link)?;
        let kind = routes::classify(&path, &service_paths);
        let composed = composer.compose_page(page, &path, kind);
        write_route(
            &composed,
            &path,
            &header,
            &footer,
            &site,
            &options.output_dir,
            &mirror_pages,
        )?;
        route_paths.insert(path);
    }
    println!("Rendered {} pages", store.pages.len());

    for post in &store.posts {
        let path = routes::url_path(&post.link)?;
        let composed = composer.compose_post(post);
        write_route(
            &composed,
            &path,
            &header,
            &footer,
            &site,
            &options.output_dir,
            &mirror_posts,
        )?;
        route_paths.insert(path);
    }
    println!("Rendered {} posts", store.posts.len());

    for category in &store.categories {
        let path = format!("/category/{}/", category.slug);
        let composed = composer.compose_category(category);
        write_route(
            &composed,
            &path,
            &header,
            &footer,
            &site,
            &options.output_dir,
            &mirror_pages,
        )?;
        route_paths.insert(path);
    }
    println!("Rendered {} category archives", store.categories.len());

    // Synthetic indexes render last; a colliding page record is overwritten.
    for (path, composed) in [
        ("/services/", composer.compose_services_index()),
        ("/resources/", composer.compose_resources_index()),
    ] {
        write_route(
            &composed,
            path,
            &header,
            &footer,
            &site,
            &options.output_dir,
            &mirror_pages,
        )?;
        route_paths.insert(path.to_string());
    }

    write_sitemap(&options.output_dir, &route_paths, &site)?;
    write_robots(&options.output_dir, &site)?;
    println!("Site generated at {}", options.output_dir.display());

    Ok(BuildSummary {
        pages: store.pages.len(),
        posts: store.posts.len(),
        categories: store.categories.len(),
        routes: route_paths.len(),
    })
}

/// Render one document and write it to both trees from the identical
/// string: public first, then mirror.
#[allow(clippy::too_many_arguments)]
fn write_route(
    composed: &ComposedPage,
    path: &str,
    header: &Markup,
    footer: &Markup,
    site: &SiteConfig,
    output_root: &Path,
    mirror_root: &Path,
) -> Result<(), GenerateError> {
    let canonical = format!("{}{}", site.base_url, path);
    let shell = PageShell {
        title: &composed.title,
        description: &composed.description,
        canonical: &canonical,
        page_class: composed.page_class,
        schema: composed.schema.as_ref(),
    };
    let html =
        templates::document(&shell, header.clone(), composed.body.clone(), footer.clone())
            .into_string();

    write_page(&routes::output_dir(output_root, path), &html)?;
    write_page(&routes::output_dir(mirror_root, path), &html)?;
    Ok(())
}

fn write_page(dir: &Path, html: &str) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("index.html"), html)
}

/// One `<url><loc>` per route, alphabetically sorted (the `BTreeSet`
/// iteration order), absolute URLs, XML-escaped.
fn write_sitemap(
    output_dir: &Path,
    route_paths: &BTreeSet<String>,
    site: &SiteConfig,
) -> std::io::Result<()> {
    let mut xml = String::with_capacity(4096);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<urlset xmlns="{SITEMAP_NS}">"#));
    xml.push('\n');
    for path in route_paths {
        xml.push_str("  <url>\n");
        xml.push_str(&format!(
            "    <loc>{}</loc>\n",
            escape_xml(&format!("{}{}", site.base_url, path))
        ));
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");
    fs::write(output_dir.join("sitemap.xml"), xml)
}

fn write_robots(output_dir: &Path, site: &SiteConfig) -> std::io::Result<()> {
    let robots = format!(
        "User-agent: *\nAllow: /\n\nSitemap: {}/sitemap.xml\n",
        site.base_url
    );
    fs::write(output_dir.join("robots.txt"), robots)
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn remove_dir_if_exists(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}
