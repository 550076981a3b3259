//! Post ingestion.
//!
//! Merges externally-authored posts into `data/posts.json` from one of two
//! sources:
//!
//! - a directory of Markdown files with `---` frontmatter (`title`, `slug`,
//!   `date`, `excerpt`, `link`, `categories`), bodies rendered to HTML
//! - a CSV export with a header row using the same field names
//!
//! Ingestion is all-or-nothing: every incoming record is validated for the
//! required fields first, and a single failure aborts before any merge, so
//! `posts.json` never ends up half-updated. Records merge by slug —
//! insert-if-absent, otherwise overwrite the stored record while keeping
//! its original id (other data files reference posts by id).
//!
//! The caller triggers a full rebuild after a successful merge.

use crate::content::Post;
use crate::sanitize::{collapse_whitespace, strip_tags};
use chrono::Utc;
use pulldown_cmark::{Parser, html as md_html};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error reading {file}: {source}")]
    Io {
        file: String,
        source: std::io::Error,
    },
    #[error("JSON error in {file}: {source}")]
    Json {
        file: String,
        source: serde_json::Error,
    },
    #[error("validation failed:\n{}", .0.join("\n"))]
    Validation(Vec<String>),
}

/// Where incoming posts come from.
#[derive(Debug, Clone)]
pub enum ImportSource {
    MarkdownDir(PathBuf),
    CsvFile(PathBuf),
}

/// A raw incoming record before validation and merge. All fields are
/// strings at this stage, matching both source formats.
#[derive(Debug, Default, Clone)]
struct IncomingPost {
    title: String,
    slug: String,
    date: String,
    excerpt: String,
    link: String,
    /// Comma-separated category ids.
    categories: String,
    content: String,
}

const REQUIRED_FIELDS: [&str; 5] = ["title", "slug", "date", "excerpt", "content"];

static WP_COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--\s*wp:.*?-->").unwrap());
static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]+\]").unwrap());
static CLASS_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sclass="[^"]*""#).unwrap());
static STYLE_ATTR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\sstyle="[^"]*""#).unwrap());

/// Parse, validate, and merge. Returns the total post count after the
/// merge. The posts file is only rewritten when every record validates.
pub fn import_posts(
    source: &ImportSource,
    data_dir: &Path,
    base_url: &str,
) -> Result<usize, IngestError> {
    let posts_path = data_dir.join("posts.json");
    let file = posts_path.display().to_string();
    let text = fs::read_to_string(&posts_path).map_err(|source| IngestError::Io {
        file: file.clone(),
        source,
    })?;
    let mut posts: Vec<Post> = serde_json::from_str(&text).map_err(|source| IngestError::Json {
        file: file.clone(),
        source,
    })?;

    let incoming = match source {
        ImportSource::MarkdownDir(dir) => load_from_markdown(dir)?,
        ImportSource::CsvFile(path) => load_from_csv(path)?,
    };
    validate(&incoming)?;
    upsert(incoming, &mut posts, base_url);

    let json = serde_json::to_string_pretty(&posts).map_err(|source| IngestError::Json {
        file: file.clone(),
        source,
    })?;
    fs::write(&posts_path, json).map_err(|source| IngestError::Io { file, source })?;
    Ok(posts.len())
}

// ============================================================================
// Loaders
// ============================================================================

fn load_from_markdown(dir: &Path) -> Result<Vec<IncomingPost>, IngestError> {
    let read = |p: &Path| {
        fs::read_to_string(p).map_err(|source| IngestError::Io {
            file: p.display().to_string(),
            source,
        })
    };
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|source| IngestError::Io {
            file: dir.display().to_string(),
            source,
        })?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension().is_some_and(|ext| ext == "md")
                && p.file_name().is_some_and(|n| n != "README.md")
        })
        .collect();
    files.sort();

    let mut incoming = Vec::new();
    for path in files {
        let text = read(&path)?;
        let (meta, body) = parse_frontmatter(&text);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let slug = meta.get("slug").cloned().unwrap_or(stem);
        let title = meta
            .get("title")
            .cloned()
            .unwrap_or_else(|| slug.replace('-', " "));
        let date = meta.get("date").cloned().unwrap_or_else(now_iso);
        let content = cleanup_content(&render_markdown(&body));
        let excerpt = meta
            .get("excerpt")
            .cloned()
            .unwrap_or_else(|| derive_excerpt(&content, &title));
        incoming.push(IncomingPost {
            title,
            slug,
            date,
            excerpt,
            link: meta.get("link").cloned().unwrap_or_default(),
            categories: meta.get("categories").cloned().unwrap_or_default(),
            content,
        });
    }
    Ok(incoming)
}

fn load_from_csv(path: &Path) -> Result<Vec<IncomingPost>, IngestError> {
    let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
        file: path.display().to_string(),
        source,
    })?;
    let rows = parse_csv(&text);
    Ok(rows
        .into_iter()
        .map(|row| {
            let field = |name: &str| row.get(name).cloned().unwrap_or_default();
            let content = cleanup_content(&field("content"));
            let excerpt = if field("excerpt").is_empty() {
                derive_excerpt(&content, &field("title"))
            } else {
                field("excerpt")
            };
            IncomingPost {
                title: field("title"),
                slug: field("slug"),
                date: field("date"),
                excerpt,
                link: field("link"),
                categories: field("categories"),
                content,
            }
        })
        .collect())
}

/// `---`-fenced `key: value` frontmatter. A file without an opening fence
/// is all body.
fn parse_frontmatter(text: &str) -> (BTreeMap<String, String>, String) {
    let lines: Vec<&str> = text.lines().collect();
    if lines.first() != Some(&"---") {
        return (BTreeMap::new(), text.trim().to_string());
    }
    let mut meta = BTreeMap::new();
    let mut index = 1;
    while index < lines.len() {
        let line = lines[index];
        if line == "---" {
            index += 1;
            break;
        }
        if let Some((key, value)) = line.split_once(':') {
            if !key.trim().is_empty() {
                meta.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        index += 1;
    }
    let body = lines[index.min(lines.len())..].join("\n").trim().to_string();
    (meta, body)
}

/// Minimal CSV reader handling quoted cells, embedded commas and newlines,
/// and doubled-quote escapes. The first row is the header.
fn parse_csv(text: &str) -> Vec<BTreeMap<String, String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                row.push(std::mem::take(&mut cell));
            }
            '\r' | '\n' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                row.push(std::mem::take(&mut cell));
                if row.len() > 1 || !row[0].is_empty() {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => cell.push(c),
        }
    }
    if !cell.is_empty() || !row.is_empty() {
        row.push(cell);
        rows.push(row);
    }

    if rows.is_empty() {
        return Vec::new();
    }
    let headers: Vec<String> = rows.remove(0).iter().map(|h| h.trim().to_string()).collect();
    rows.into_iter()
        .map(|cells| {
            headers
                .iter()
                .enumerate()
                .map(|(i, key)| {
                    (
                        key.clone(),
                        cells.get(i).map(|c| c.trim().to_string()).unwrap_or_default(),
                    )
                })
                .collect()
        })
        .collect()
}

// ============================================================================
// Validation and merge
// ============================================================================

/// All-or-nothing required-field check. Errors name the record and field.
fn validate(incoming: &[IncomingPost]) -> Result<(), IngestError> {
    let mut errors = Vec::new();
    for (index, post) in incoming.iter().enumerate() {
        for field in REQUIRED_FIELDS {
            let value = match field {
                "title" => &post.title,
                "slug" => &post.slug,
                "date" => &post.date,
                "excerpt" => &post.excerpt,
                _ => &post.content,
            };
            if value.trim().is_empty() {
                errors.push(format!("- Row {}: missing {}", index + 1, field));
            }
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(IngestError::Validation(errors))
    }
}

/// Merge by slug. New slugs append with a fresh id; existing slugs are
/// overwritten in place, keeping the original id.
fn upsert(incoming: Vec<IncomingPost>, posts: &mut Vec<Post>, base_url: &str) {
    let mut next_id = posts.iter().map(|p| p.id).max().unwrap_or(0) + 1;
    for record in incoming {
        let link = if record.link.is_empty() {
            format!("{}/{}/", base_url, record.slug)
        } else {
            record.link.clone()
        };
        let categories: Vec<u64> = record
            .categories
            .split(',')
            .filter_map(|c| c.trim().parse().ok())
            .collect();

        match posts.iter_mut().find(|p| p.slug == record.slug) {
            Some(existing) => {
                existing.title = record.title;
                existing.link = link;
                existing.excerpt = record.excerpt;
                existing.date = record.date;
                existing.categories = categories;
                existing.content = record.content;
            }
            None => {
                posts.push(Post {
                    id: next_id,
                    title: record.title,
                    slug: record.slug,
                    link,
                    excerpt: record.excerpt,
                    date: record.date,
                    categories,
                    content: record.content,
                });
                next_id += 1;
            }
        }
    }
}

// ============================================================================
// Content helpers
// ============================================================================

fn render_markdown(body: &str) -> String {
    let mut html = String::new();
    md_html::push_html(&mut html, Parser::new(body));
    html
}

/// Ingest-side cleanup: WordPress block comments, shortcode tokens, and
/// presentational attributes have no meaning in the new markup.
fn cleanup_content(html: &str) -> String {
    let out = WP_COMMENT_RE.replace_all(html, "");
    let out = SHORTCODE_RE.replace_all(&out, "");
    let out = CLASS_ATTR_RE.replace_all(&out, "");
    let out = STYLE_ATTR_RE.replace_all(&out, "");
    out.trim().to_string()
}

/// First 28 words of the visible text, else the fallback.
fn derive_excerpt(content: &str, fallback: &str) -> String {
    let stripped = collapse_whitespace(&strip_tags(content));
    if stripped.is_empty() {
        return fallback.to_string();
    }
    stripped
        .split(' ')
        .take(28)
        .collect::<Vec<_>>()
        .join(" ")
}

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // Frontmatter
    // =========================================================================

    #[test]
    fn frontmatter_parsed_and_body_trimmed() {
        let (meta, body) = parse_frontmatter(
            "---\ntitle: Open House\nslug: open-house\ndate: 2016-05-12\n---\n\nBody text.",
        );
        assert_eq!(meta.get("title").map(String::as_str), Some("Open House"));
        assert_eq!(meta.get("slug").map(String::as_str), Some("open-house"));
        assert_eq!(body, "Body text.");
    }

    #[test]
    fn frontmatter_value_may_contain_colons() {
        let (meta, _) = parse_frontmatter("---\nlink: https://example.com/x/\n---\nbody");
        assert_eq!(
            meta.get("link").map(String::as_str),
            Some("https://example.com/x/")
        );
    }

    #[test]
    fn missing_fence_means_all_body() {
        let (meta, body) = parse_frontmatter("Just text.");
        assert!(meta.is_empty());
        assert_eq!(body, "Just text.");
    }

    // =========================================================================
    // CSV
    // =========================================================================

    #[test]
    fn csv_handles_quotes_and_embedded_commas() {
        let rows = parse_csv("title,content\n\"Hello, world\",\"She said \"\"hi\"\".\"\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title").unwrap(), "Hello, world");
        assert_eq!(rows[0].get("content").unwrap(), r#"She said "hi"."#);
    }

    #[test]
    fn csv_handles_crlf_and_newlines_in_quotes() {
        let rows = parse_csv("a,b\r\n\"line one\nline two\",x\r\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("a").unwrap(), "line one\nline two");
    }

    #[test]
    fn csv_skips_blank_lines() {
        let rows = parse_csv("a,b\n1,2\n\n3,4\n");
        assert_eq!(rows.len(), 2);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validation_lists_every_missing_field() {
        let incoming = vec![
            IncomingPost {
                title: "ok".into(),
                slug: "ok".into(),
                date: "2016-01-01".into(),
                excerpt: "e".into(),
                content: "c".into(),
                ..Default::default()
            },
            IncomingPost {
                title: "no slug or date".into(),
                excerpt: "e".into(),
                content: "c".into(),
                ..Default::default()
            },
        ];
        let err = validate(&incoming).unwrap_err();
        let IngestError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            errors,
            vec!["- Row 2: missing slug", "- Row 2: missing date"]
        );
    }

    // =========================================================================
    // Upsert
    // =========================================================================

    fn stored_post(id: u64, slug: &str) -> Post {
        Post {
            id,
            title: format!("Stored {slug}"),
            slug: slug.to_string(),
            link: format!("https://steppingstonescri.net/{slug}/"),
            excerpt: "old".to_string(),
            date: "2015-01-01T00:00:00".to_string(),
            categories: vec![1],
            content: "<p>old</p>".to_string(),
        }
    }

    #[test]
    fn upsert_inserts_new_slugs_with_fresh_ids() {
        let mut posts = vec![stored_post(7, "existing")];
        upsert(
            vec![IncomingPost {
                title: "New".into(),
                slug: "brand-new".into(),
                date: "2016-01-01".into(),
                excerpt: "e".into(),
                content: "c".into(),
                ..Default::default()
            }],
            &mut posts,
            "https://steppingstonescri.net",
        );
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].id, 8);
        assert_eq!(posts[1].link, "https://steppingstonescri.net/brand-new/");
    }

    #[test]
    fn upsert_overwrites_existing_slug_keeping_id() {
        let mut posts = vec![stored_post(7, "existing")];
        upsert(
            vec![IncomingPost {
                title: "Updated".into(),
                slug: "existing".into(),
                date: "2016-06-01".into(),
                excerpt: "fresh".into(),
                categories: "3, 4".into(),
                content: "<p>new</p>".into(),
                ..Default::default()
            }],
            &mut posts,
            "https://steppingstonescri.net",
        );
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, 7);
        assert_eq!(posts[0].title, "Updated");
        assert_eq!(posts[0].categories, vec![3, 4]);
    }

    // =========================================================================
    // Content helpers
    // =========================================================================

    #[test]
    fn cleanup_strips_wp_artifacts() {
        let out = cleanup_content(
            "<!-- wp:paragraph --><p class=\"x\" style=\"color:red\">Hi [gallery]</p><!-- wp:end -->",
        );
        assert_eq!(out, "<p>Hi </p>");
    }

    #[test]
    fn excerpt_caps_at_28_words() {
        let content = format!("<p>{}</p>", "word ".repeat(40));
        let excerpt = derive_excerpt(&content, "fallback");
        assert_eq!(excerpt.split(' ').count(), 28);
    }

    #[test]
    fn excerpt_falls_back_when_empty() {
        assert_eq!(derive_excerpt("<p></p>", "Title"), "Title");
    }

    // =========================================================================
    // End to end
    // =========================================================================

    #[test]
    fn markdown_import_merges_into_posts_json() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        let content = dir.path().join("content");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&content).unwrap();
        fs::write(data.join("posts.json"), "[]").unwrap();
        fs::write(
            content.join("open-house.md"),
            "---\ntitle: Open House\ndate: 2016-05-12\ncategories: 5\n---\n\nCome **visit** us.",
        )
        .unwrap();

        let count = import_posts(
            &ImportSource::MarkdownDir(content),
            &data,
            "https://steppingstonescri.net",
        )
        .unwrap();
        assert_eq!(count, 1);

        let saved: Vec<Post> =
            serde_json::from_str(&fs::read_to_string(data.join("posts.json")).unwrap()).unwrap();
        assert_eq!(saved[0].slug, "open-house");
        assert_eq!(saved[0].link, "https://steppingstonescri.net/open-house/");
        assert_eq!(saved[0].categories, vec![5]);
        assert!(saved[0].content.contains("<strong>visit</strong>"));
    }
}
